use serde_json::Value;
use strum::{Display, EnumString};

/// Serialized-mapping formats accepted in the configuration directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
pub enum ConfigExtension {
    /// YAML documents (`.yaml` or `.yml`).
    #[strum(to_string = "yaml", serialize = "yml")]
    Yaml,
    /// JSON documents.
    #[strum(serialize = "json")]
    Json,
}

impl ConfigExtension {
    /// Parses document text into a JSON value.
    ///
    /// Blank documents parse as `null` so callers can treat them as empty.
    pub(crate) fn parse_document(self, text: &str) -> Result<Value, String> {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        match self {
            Self::Yaml => serde_saphyr::from_str::<Value>(text).map_err(|error| error.to_string()),
            Self::Json => serde_json::from_str::<Value>(text).map_err(|error| error.to_string()),
        }
    }
}
