//! Process logger installation for the log phase.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, MakeWriter};

use trellis_config::{LogFormat, LogSettings, Rotation};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to open the log destination.
    #[error("failed to open log destination '{path}': {source}")]
    Destination {
        /// Destination that could not be opened.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the process logger from resolved log settings.
pub trait LogInstaller: Send + Sync {
    /// Installs the logger. `root` resolves relative destinations.
    ///
    /// # Errors
    ///
    /// Returns an error when the filter, destination or subscriber is invalid.
    fn install(&self, settings: &LogSettings, root: &Utf8Path) -> Result<(), TelemetryError>;
}

/// Installer backed by `tracing-subscriber` writing to a rotating file.
///
/// Repeated calls are idempotent: the first successful invocation installs
/// the global subscriber and later ones return without touching global state.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogInstaller;

impl TracingLogInstaller {
    /// Builds a new installer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LogInstaller for TracingLogInstaller {
    fn install(&self, settings: &LogSettings, root: &Utf8Path) -> Result<(), TelemetryError> {
        TELEMETRY_GUARD
            .get_or_try_init(|| install_subscriber(settings, root))
            .map(|_| ())
    }
}

fn install_subscriber(settings: &LogSettings, root: &Utf8Path) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(&settings.level)
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let writer = RotatingFile::open(settings.resolved_path(root), settings.rotation)?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer);

    let subscriber: Box<dyn Subscriber + Send + Sync> = match settings.effective_format() {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
        LogFormat::Full => Box::new(builder.finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

/// Log file that is moved aside once it would exceed its size limit.
///
/// On rotation `system.log` is renamed to `system.log.1`, replacing any
/// earlier rotated file, and a fresh `system.log` is opened.
#[derive(Debug)]
pub struct RotatingFile {
    state: Mutex<RotatingState>,
}

#[derive(Debug)]
struct RotatingState {
    path: Utf8PathBuf,
    file: File,
    written: u64,
    limit: Option<u64>,
}

impl RotatingFile {
    /// Opens `path` for appending, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Destination`] when the file cannot be opened.
    pub fn open(path: Utf8PathBuf, rotation: Rotation) -> Result<Self, TelemetryError> {
        let destination_error = |source: io::Error| TelemetryError::Destination {
            path: path.clone(),
            source: Arc::new(source),
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(destination_error)?;
        }
        let file = open_append(&path).map_err(destination_error)?;
        let written = file.metadata().map_err(destination_error)?.len();
        Ok(Self {
            state: Mutex::new(RotatingState {
                path,
                file,
                written,
                limit: rotation.limit(),
            }),
        })
    }

    /// Path rotated files are moved to.
    #[must_use]
    pub fn rotated_path(path: &Utf8Path) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{path}.1"))
    }

    fn lock(&self) -> MutexGuard<'_, RotatingState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl RotatingState {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        fs::rename(&self.path, RotatingFile::rotated_path(&self.path))?;
        self.file = open_append(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn append(&mut self, buf: &[u8]) -> io::Result<usize> {
        let incoming = u64::try_from(buf.len()).unwrap_or(u64::MAX);
        let exceeds = self
            .limit
            .is_some_and(|limit| self.written.saturating_add(incoming) > limit);
        if exceeds && self.written > 0 {
            self.rotate()?;
        }
        let count = self.file.write(buf)?;
        self.written = self
            .written
            .saturating_add(u64::try_from(count).unwrap_or(u64::MAX));
        Ok(count)
    }
}

fn open_append(path: &Utf8Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Writer handed out per event by [`RotatingFile`].
#[derive(Debug)]
pub struct RotatingWriter<'a> {
    file: &'a RotatingFile,
}

impl Write for RotatingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.lock().append(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = RotatingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriter { file: self }
    }
}
