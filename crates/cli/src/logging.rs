use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use vaultdex_core::config::{LoggingConfig, ResolvedConfig};

/// Keeps the file writer flushing until the process exits.
static FILE_GUARD: Mutex<Option<WorkerGuard>> = Mutex::new(None);

/// Install the global subscriber: stderr always, plus a log file when
/// `[logging] file` is set. `RUST_LOG` overrides both levels.
pub fn init(cfg: &ResolvedConfig) {
    let logging = &cfg.logging;
    let stderr_level = parse_level(&logging.level).unwrap_or(LevelFilter::INFO);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(stderr_level));

    let registry = tracing_subscriber::registry().with(stderr_layer);

    match file_layer_writer(logging) {
        Some((writer, level)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter(level));
            registry.with(file_layer).try_init().ok();
        }
        None => {
            registry.try_init().ok();
        }
    }
}

fn filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder().with_default_directive(level.into()).from_env_lossy()
}

fn file_layer_writer(
    logging: &LoggingConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, LevelFilter)> {
    let path = logging.file.as_ref()?;
    let level = logging
        .file_level
        .as_deref()
        .and_then(parse_level)
        .or_else(|| parse_level(&logging.level))
        .unwrap_or(LevelFilter::DEBUG);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {e}", parent.display());
        std::process::exit(1);
    }

    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    let (writer, guard) = tracing_appender::non_blocking(file);
    if let Ok(mut slot) = FILE_GUARD.lock() {
        *slot = Some(guard);
    }
    Some((writer, level))
}

fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.to_lowercase().as_str() {
        "off" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("WARN"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("warning"), Some(LevelFilter::WARN));
        assert_eq!(parse_level("Trace"), Some(LevelFilter::TRACE));
        assert_eq!(parse_level("off"), Some(LevelFilter::OFF));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn no_file_layer_without_path() {
        let logging = LoggingConfig { level: "info".into(), file_level: None, file: None };
        assert!(file_layer_writer(&logging).is_none());
    }
}
