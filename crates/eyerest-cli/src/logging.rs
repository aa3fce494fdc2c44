use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` selects the default level.
/// With `log_dir`, records are also written to a daily rolling file there.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(debug: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "eyerest.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = fmt::layer().with_writer(writer).with_ansi(false);
            if let Err(e) = tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(file)
                .try_init()
            {
                eprintln!("warning: logging not initialized: {e}");
            }
            Some(guard)
        }
        None => {
            if let Err(e) = tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .try_init()
            {
                eprintln!("warning: logging not initialized: {e}");
            }
            None
        }
    }
}
