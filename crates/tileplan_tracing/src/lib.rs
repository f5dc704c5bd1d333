use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str = "tileplan=info";

pub struct TraceOptions {
    log_file: Option<PathBuf>,
    pub env_filter: Option<String>,
}

/// This is a convenience tracing subscriber with some opinionated defaults.
///
/// Events go to stderr unless a log file is set, so stdout stays free for output.
pub fn subscriber() -> TraceOptions {
    TraceOptions {
        log_file: None,
        env_filter: None,
    }
}

impl TraceOptions {
    pub fn log_file(mut self, path: impl AsRef<Path>) -> Self {
        self.log_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn env_filter(mut self, env_filter: impl ToString) -> Self {
        self.env_filter = Some(env_filter.to_string());
        self
    }

    fn filter(&self) -> io::Result<EnvFilter> {
        EnvFilter::builder()
            .parse(self.env_filter.as_deref().unwrap_or(DEFAULT_FILTER))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }

    /// Install as the global tracing subscriber
    pub fn init(self) -> io::Result<TraceSession> {
        let filter = self.filter()?;
        if let Some(path) = self.log_file {
            let file = File::create(&path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init()
                .map_err(io::Error::other)?;
            Ok(TraceSession {
                _guard: Some(guard),
                log_path: Some(path),
            })
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                .try_init()
                .map_err(io::Error::other)?;
            Ok(TraceSession {
                _guard: None,
                log_path: None,
            })
        }
    }
}

/// Keeps the background log writer alive. Buffered events are flushed on drop.
pub struct TraceSession {
    _guard: Option<WorkerGuard>,
    pub log_path: Option<PathBuf>,
}
