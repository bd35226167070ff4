//! Telemetry initialization and configuration

use std::path::Path;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize console logging
///
/// Honours `RUST_LOG`, falling back to `info`. Subsequent calls are no-ops.
///
/// # Arguments
/// * `service_name` - Name recorded on the first log line
///
/// # Example
/// ```
/// use aqa_telemetry::init_telemetry;
/// init_telemetry("aqa-runner").expect("Failed to initialize telemetry");
/// ```
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    INIT.call_once(|| {
        let installed = tracing_subscriber::registry()
            .with(env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init();

        if installed.is_ok() {
            tracing::info!(service.name = service_name, "Telemetry initialized");
        }
    });

    Ok(())
}

/// Initialize console logging plus a plain-text log file
///
/// The file is written through a non-blocking worker; keep the returned guard
/// alive until exit so buffered lines are flushed. Returns `None` when
/// telemetry was already initialized.
///
/// # Example
/// ```no_run
/// use aqa_telemetry::init_with_log_file;
/// let _guard = init_with_log_file("aqa-runner", "test_results", "test_execution.log")
///     .expect("Failed to initialize telemetry");
/// ```
pub fn init_with_log_file(
    service_name: &str,
    dir: impl AsRef<Path>,
    file_name: &str,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir.as_ref())?;

    let mut guard = None;
    INIT.call_once(|| {
        let appender = tracing_appender::rolling::never(dir.as_ref(), file_name);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);

        let installed = tracing_subscriber::registry()
            .with(env_filter())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
            .try_init();

        if installed.is_ok() {
            tracing::info!(
                service.name = service_name,
                log.file = %dir.as_ref().join(file_name).display(),
                "Telemetry initialized with log file"
            );
            guard = Some(worker_guard);
        }
    });

    Ok(guard)
}
