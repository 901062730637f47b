use crate::error::IoError;
use std::path::Path;
use tracing_core::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, registry};

/// Sets up logging to `file_path` and to stderr, and adds a panic hook pointing at the log.
///
/// Records emitted through the `log` facade are forwarded to the same subscriber. The file
/// receives everything at INFO and above; stderr only shows warnings and errors so it does
/// not fight with the progress bar.
///
/// Nothing is installed when a global subscriber already exists (e.g. a second run in the
/// same process).
///
/// # Parameters
///
/// - `file_path` - Log file, e.g. `logs/mnist_cm/experiment.log`; parent directories are created
///
/// # Returns
///
/// - `Ok(true)` - The logger was installed
/// - `Ok(false)` - Another subscriber was already installed
/// - `Err(IoError)` - The path has no file name or its directory cannot be created
pub fn install_file_logger<P: AsRef<Path>>(file_path: P) -> Result<bool, IoError> {
    let path = file_path.as_ref();
    let file_name = path.file_name().ok_or_else(|| {
        IoError::InvalidData(format!("The log path '{}' must point to a file", path.display()))
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let writer = tracing_appender::rolling::never(dir, file_name);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(LevelFilter::INFO);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    let installed = registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        update_panic_hook(path);
    }

    Ok(installed)
}

fn update_panic_hook(file_path: &Path) {
    let hook = std::panic::take_hook();
    let file_path = file_path.display().to_string();

    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC => {}", info);
        eprintln!(
            "=== PANIC ===\nA fatal error happened, you can check the experiment logs here => \
             '{file_path}'\n============="
        );
        hook(info);
    }));
}
