//! Resolution of one component's configuration for the active environment.

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;
use crate::settings::{Settings, SettingsError, value_kind};
use crate::source::SourceMap;

/// Key under which the root path is injected into every mapping.
pub const ROOT_PATH_KEY: &str = "root_path";

/// Key under which the environment tag is injected when requested.
pub const ENVIRONMENT_KEY: &str = "environment";

/// Errors raised while materializing configuration.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// A known component has no file for the environment and no production
    /// fallback.
    #[error(
        "no configuration for component '{component}' matches environment '{environment}' \
         and no production fallback exists"
    )]
    Unresolved {
        /// Component being materialized.
        component: String,
        /// Environment that was requested.
        environment: Environment,
    },
    /// The selected file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// File that failed to read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
    /// The selected file is not valid for its format.
    #[error("failed to parse configuration '{path}': {message}")]
    Parse {
        /// File that failed to parse.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// The document parsed but its top level is not a mapping.
    #[error("configuration '{path}' must contain a mapping but holds {found}")]
    NotAMapping {
        /// Offending file.
        path: Utf8PathBuf,
        /// Kind of value found at the top level.
        found: &'static str,
    },
    /// The mapping does not fit the shape a component requires.
    #[error("configuration for component '{component}' is malformed: {message}")]
    Malformed {
        /// Component whose configuration was rejected.
        component: String,
        /// Description of the mismatch.
        message: String,
    },
}

impl MaterializeError {
    /// Returns `true` for the missing-environment condition.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved { .. })
    }
}

/// Configuration resolved for one component in one environment.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedConfig {
    component: String,
    root_path: Utf8PathBuf,
    environment: Option<Environment>,
    source: Option<Utf8PathBuf>,
    values: Settings,
}

impl MaterializedConfig {
    /// Component name the configuration belongs to.
    #[must_use]
    pub fn component(&self) -> &str {
        self.component.as_str()
    }

    /// Root path of the project.
    #[must_use]
    pub fn root_path(&self) -> &Utf8Path {
        self.root_path.as_path()
    }

    /// Injected environment tag, when it was requested.
    #[must_use]
    pub const fn environment(&self) -> Option<Environment> {
        self.environment
    }

    /// File the values were read from, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Utf8Path> {
        self.source.as_deref()
    }

    /// Final mapping including injected keys.
    #[must_use]
    pub const fn values(&self) -> &Settings {
        &self.values
    }

    /// Consumes the configuration, returning the final mapping.
    #[must_use]
    pub fn into_values(self) -> Settings {
        self.values
    }

    /// Deserialises the mapping into a component's typed configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializeError::Malformed`] naming the component when the
    /// mapping does not match `T`.
    pub fn typed<T: DeserializeOwned>(&self) -> Result<T, MaterializeError> {
        self.values
            .deserialize()
            .map_err(|error: SettingsError| MaterializeError::Malformed {
                component: self.component.clone(),
                message: error.to_string(),
            })
    }
}

/// Materializes configuration for components of one assembly run.
#[derive(Debug, Clone, Copy)]
pub struct Materializer<'a> {
    sources: &'a SourceMap,
    root_path: &'a Utf8Path,
    environment: Environment,
}

impl<'a> Materializer<'a> {
    /// Creates a materializer over scanned sources.
    #[must_use]
    pub const fn new(sources: &'a SourceMap, root_path: &'a Utf8Path, environment: Environment) -> Self {
        Self {
            sources,
            root_path,
            environment,
        }
    }

    /// Active environment.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Materializes `name`, injecting only the root path.
    ///
    /// # Errors
    ///
    /// See [`Materializer::materialize_tagged`].
    pub fn materialize(
        &self,
        name: &str,
        overrides: Option<&Settings>,
    ) -> Result<MaterializedConfig, MaterializeError> {
        self.resolve(name, overrides, Resolution::default())
    }

    /// Materializes `name`, injecting the root path and environment tag.
    ///
    /// Unknown names resolve to the overrides merged onto an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns [`MaterializeError::Unresolved`] when `name` has files but none
    /// for the active environment or production, and read/parse errors for
    /// the selected file.
    pub fn materialize_tagged(
        &self,
        name: &str,
        overrides: Option<&Settings>,
    ) -> Result<MaterializedConfig, MaterializeError> {
        self.resolve(
            name,
            overrides,
            Resolution {
                inject_environment: true,
                ..Resolution::default()
            },
        )
    }

    /// Materializes `name`, treating a missing environment variant as absent.
    ///
    /// Where [`Materializer::materialize`] reports
    /// [`MaterializeError::Unresolved`], this variant yields the overrides
    /// merged onto an empty mapping. Read and parse failures still propagate.
    ///
    /// # Errors
    ///
    /// Returns read/parse errors for the selected file.
    pub fn materialize_lenient(
        &self,
        name: &str,
        overrides: Option<&Settings>,
    ) -> Result<MaterializedConfig, MaterializeError> {
        self.resolve(
            name,
            overrides,
            Resolution {
                lenient: true,
                ..Resolution::default()
            },
        )
    }

    fn resolve(
        &self,
        name: &str,
        overrides: Option<&Settings>,
        resolution: Resolution,
    ) -> Result<MaterializedConfig, MaterializeError> {
        let selected = match self.sources.get(name) {
            None => None,
            Some(entry) => match entry.select(self.environment) {
                Some((_, file)) => Some(file),
                None if resolution.lenient => None,
                None => {
                    return Err(MaterializeError::Unresolved {
                        component: name.to_owned(),
                        environment: self.environment,
                    });
                }
            },
        };
        let (mut values, source) = match selected {
            None => (Settings::new(), None),
            Some(file) => {
                let values = load_file(file.path(), |text| file.extension().parse_document(text))?;
                (values, Some(file.path().to_path_buf()))
            }
        };

        if let Some(overrides) = overrides {
            values.merge(overrides);
        }
        values.insert(ROOT_PATH_KEY, self.root_path.as_str());
        if resolution.inject_environment {
            values.insert(ENVIRONMENT_KEY, self.environment.to_string());
        }

        Ok(MaterializedConfig {
            component: name.to_owned(),
            root_path: self.root_path.to_path_buf(),
            environment: resolution.inject_environment.then_some(self.environment),
            source,
            values,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Resolution {
    inject_environment: bool,
    lenient: bool,
}

fn load_file(
    path: &Utf8Path,
    parse: impl FnOnce(&str) -> Result<serde_json::Value, String>,
) -> Result<Settings, MaterializeError> {
    let text = fs::read_to_string(path).map_err(|source| MaterializeError::Read {
        path: path.to_path_buf(),
        source: Arc::new(source),
    })?;
    let document = parse(&text).map_err(|message| MaterializeError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    let found = value_kind(&document);
    Settings::from_value(document).map_err(|_| MaterializeError::NotAMapping {
        path: path.to_path_buf(),
        found,
    })
}
