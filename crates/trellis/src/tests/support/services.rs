//! Sample caller services.

use trellis_config::MaterializedConfig;

use crate::error::ComponentError;
use crate::service::Service;

/// Service reading a relay address and an optional sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailer {
    pub relay: Option<String>,
    pub sender: Option<String>,
    pub keys: Vec<String>,
}

impl Service for Mailer {
    fn from_config(config: &MaterializedConfig) -> Result<Self, ComponentError> {
        let values = config.values();
        Ok(Self {
            relay: values.get_str("relay").map(str::to_owned),
            sender: values.get_str("sender").map(str::to_owned),
            keys: values.keys().map(str::to_owned).collect(),
        })
    }
}

/// Service whose only setting is a time-to-live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cache {
    pub ttl: u64,
}

impl Service for Cache {
    fn from_config(config: &MaterializedConfig) -> Result<Self, ComponentError> {
        let ttl = config
            .values()
            .get_u64("ttl")
            .ok_or_else(|| ComponentError::new(config.component(), "missing 'ttl'"))?;
        Ok(Self { ttl })
    }
}

/// Service whose constructor always fails.
#[derive(Debug)]
pub struct RejectingService;

impl Service for RejectingService {
    fn from_config(config: &MaterializedConfig) -> Result<Self, ComponentError> {
        Err(ComponentError::new(config.component(), "refusing to start"))
    }
}
