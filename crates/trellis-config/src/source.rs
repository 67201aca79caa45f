//! Discovery of environment-scoped configuration files.
//!
//! The resolver scans a flat directory and groups files by component name and
//! environment tag. Two filename shapes are recognised:
//!
//! - `name.ext` registers `name` under [`Environment::Production`];
//! - `name.tag.ext` registers `name` under the environment `tag`.
//!
//! Anything else is skipped. Files are visited in lexical order so the result
//! does not depend on the directory listing order of the host filesystem. An
//! explicitly tagged file always beats an untagged one for the production
//! slot; between two files of the same specificity the lexically last wins.
//! Displaced paths are kept on the entry as shadowed paths.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::environment::Environment;
use crate::extension::ConfigExtension;

/// Errors raised while scanning the configuration directory.
#[derive(Debug, Error)]
pub enum SourceScanError {
    /// The directory listing could not be read.
    #[error("failed to read configuration directory '{path}': {source}")]
    ReadDirectory {
        /// Directory being scanned.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// A configuration file selected for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: Utf8PathBuf,
    extension: ConfigExtension,
    tagged: bool,
}

impl SourceFile {
    /// Path to the file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }

    /// Serialisation format of the file.
    #[must_use]
    pub const fn extension(&self) -> ConfigExtension {
        self.extension
    }

    /// Returns `true` when the filename carried an explicit environment tag.
    #[must_use]
    pub const fn is_tagged(&self) -> bool {
        self.tagged
    }
}

/// All configuration files discovered for one component name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    name: String,
    files: BTreeMap<Environment, SourceFile>,
    shadowed: Vec<Utf8PathBuf>,
}

impl ConfigSource {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
            shadowed: Vec::new(),
        }
    }

    /// Component name shared by every file of this entry.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// File registered for exactly the given environment.
    #[must_use]
    pub fn file_for(&self, environment: Environment) -> Option<&SourceFile> {
        self.files.get(&environment)
    }

    /// Selects the file for `environment`, falling back to production.
    ///
    /// Returns the environment whose file was chosen alongside the file.
    #[must_use]
    pub fn select(&self, environment: Environment) -> Option<(Environment, &SourceFile)> {
        self.files
            .get(&environment)
            .map(|file| (environment, file))
            .or_else(|| {
                self.files
                    .get(&Environment::Production)
                    .map(|file| (Environment::Production, file))
            })
    }

    /// Paths displaced by a more specific or lexically later file.
    #[must_use]
    pub fn shadowed(&self) -> &[Utf8PathBuf] {
        self.shadowed.as_slice()
    }

    fn offer(&mut self, environment: Environment, candidate: SourceFile) {
        let displaced = match self.files.get(&environment) {
            Some(current) if current.tagged && !candidate.tagged => {
                self.shadowed.push(candidate.path);
                return;
            }
            Some(current) => Some(current.path.clone()),
            None => None,
        };
        if let Some(path) = displaced {
            self.shadowed.push(path);
        }
        self.files.insert(environment, candidate);
    }
}

/// Map from component name to its configuration sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    entries: BTreeMap<String, ConfigSource>,
}

impl SourceMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `directory` for configuration files.
    ///
    /// Only regular files directly inside the directory are considered. A
    /// missing directory yields an empty map because running without any
    /// configuration is supported.
    ///
    /// # Errors
    ///
    /// Returns [`SourceScanError::ReadDirectory`] when the directory exists
    /// but cannot be listed.
    pub fn scan(directory: &Utf8Path) -> Result<Self, SourceScanError> {
        let read_error = |source: io::Error| SourceScanError::ReadDirectory {
            path: directory.to_path_buf(),
            source: Arc::new(source),
        };

        let listing = match fs::read_dir(directory) {
            Ok(listing) => listing,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(error) => return Err(read_error(error)),
        };

        let mut filenames = Vec::new();
        for entry in listing {
            let entry = entry.map_err(read_error)?;
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            let path = directory.join(&filename);
            // Follows symlinks so linked files count as regular files.
            if fs::metadata(&path).is_ok_and(|metadata| metadata.is_file()) {
                filenames.push(filename);
            }
        }
        filenames.sort();

        let mut map = Self::new();
        for filename in filenames {
            if let Some(classified) = ClassifiedFile::parse(&filename) {
                map.insert(classified, directory.join(&filename));
            }
        }
        Ok(map)
    }

    /// Registers a file for a component, applying the specificity rules.
    pub fn insert(&mut self, classified: ClassifiedFile, path: Utf8PathBuf) {
        let (environment, tagged) = match classified.environment {
            Some(environment) => (environment, true),
            None => (Environment::Production, false),
        };
        let file = SourceFile {
            path,
            extension: classified.extension,
            tagged,
        };
        self.entries
            .entry(classified.name.clone())
            .or_insert_with(|| ConfigSource::new(classified.name))
            .offer(environment, file);
    }

    /// Returns the sources registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConfigSource> {
        self.entries.get(name)
    }

    /// Returns `true` when at least one file exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Component names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over all entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigSource> {
        self.entries.values()
    }

    /// Number of component names discovered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no configuration was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A filename broken into component name, optional tag, and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    /// Component name taken from the first segment.
    pub name: String,
    /// Explicit environment tag, when present.
    pub environment: Option<Environment>,
    /// Recognised extension.
    pub extension: ConfigExtension,
}

impl ClassifiedFile {
    /// Applies the filename grammar, returning `None` for ignored files.
    #[must_use]
    pub fn parse(filename: &str) -> Option<Self> {
        let parts: Vec<&str> = filename.split('.').collect();
        let (name, environment, extension): (&str, Option<Environment>, ConfigExtension) =
            match parts.as_slice() {
                [name, extension] => (*name, None, extension.parse().ok()?),
                [name, tag, extension] => {
                    (*name, Some(tag.parse().ok()?), extension.parse().ok()?)
                }
                _ => return None,
            };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            environment,
            extension,
        })
    }
}
