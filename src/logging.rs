use once_cell::sync::OnceCell;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

fn filter(debug: bool) -> EnvFilter {
    // When debug logging is disabled we force `info` level regardless of
    // `RUST_LOG`, so a stray variable in the host environment stays quiet.
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}

/// Initialise logging. With `debug` the level is `debug` and `RUST_LOG` may
/// override it; otherwise `info`. When `log_file` is set, output goes to that
/// file instead of stdout. Calling this more than once has no effect, and no
/// file is created for the later calls.
pub fn init(debug: bool, log_file: Option<&Path>) {
    let Some(path) = log_file else {
        init_with_writer(debug, std::io::stdout);
        return;
    };

    if FILE_GUARD.get().is_some() {
        return;
    }
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let Some(file_name) = path.file_name() else {
        init_with_writer(debug, std::io::stdout);
        return;
    };
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    if FILE_GUARD.set(guard).is_err() {
        // A file logger is already installed.
        return;
    }
    init_with_writer(debug, writer);
}

/// Installs the global subscriber writing through `writer`.
pub fn init_with_writer<W>(debug: bool, writer: W)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}
