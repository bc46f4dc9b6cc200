use crate::settings::{Log, LogFile, LogRotation};
use anyhow::{Result, anyhow};
use std::io;
use std::sync::{Arc, Mutex, RwLock};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::fmt::writer::{EitherWriter, MakeWriter};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

const BOOTSTRAP_FILTER: &str = "info";

/// Target of the file layer. Discards output until settings attach a
/// rolling file.
#[derive(Clone, Default)]
struct FileSink {
    writer: Arc<RwLock<Option<NonBlocking>>>,
}

impl FileSink {
    fn attach(&self, writer: NonBlocking) -> Result<()> {
        let mut slot = self
            .writer
            .write()
            .map_err(|_| anyhow!("log file writer lock poisoned"))?;
        *slot = Some(writer);
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for FileSink {
    type Writer = EitherWriter<NonBlocking, io::Sink>;

    fn make_writer(&'a self) -> Self::Writer {
        match self.writer.read() {
            Ok(slot) => match slot.as_ref() {
                Some(writer) => EitherWriter::A(writer.clone()),
                None => EitherWriter::B(io::sink()),
            },
            Err(_) => EitherWriter::B(io::sink()),
        }
    }
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Open the rolling appender behind a background writer thread. Lines are
/// flushed while the returned guard is alive and once more when it drops.
fn file_writer(file: &LogFile) -> Result<(NonBlocking, WorkerGuard)> {
    let appender = Builder::new()
        .rotation(rotation(file.rotation))
        .filename_prefix(file.filename.as_str())
        .max_log_files(file.max_files)
        .build(&file.directory)
        .map_err(|e| anyhow!("cannot open log directory {}: {}", file.directory, e))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Global subscriber whose filter can be swapped once settings are loaded.
pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
    file_sink: FileSink,
    file_guard: Mutex<Option<WorkerGuard>>,
}

impl Logger {
    /// Install the subscriber before settings exist. `RUST_LOG` wins over
    /// the built-in default.
    pub fn new_bootstrap() -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_FILTER));
        let (filter, reload_handle) = reload::Layer::new(filter);
        let file_sink = FileSink::default();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .with(fmt::layer().with_ansi(false).with_writer(file_sink.clone()))
            .init();

        Self {
            reload_handle,
            file_sink,
            file_guard: Mutex::new(None),
        }
    }

    pub fn reload_from_settings(&self, log: &Log) -> Result<()> {
        let filter = EnvFilter::try_new(&log.filter).map_err(|e| anyhow!(e))?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;

        if let Some(file) = &log.file {
            let (writer, guard) = file_writer(file)?;
            self.file_sink.attach(writer)?;
            // Dropping a previous guard flushes the file it was writing.
            let mut slot = self
                .file_guard
                .lock()
                .map_err(|_| anyhow!("log file guard lock poisoned"))?;
            *slot = Some(guard);
        }
        Ok(())
    }
}
