pub mod config;
pub mod gemini;
pub mod languages;
pub mod messages;
pub mod mock;
pub mod normalize;
pub mod openai;
pub mod prompt;
pub mod provider;
pub mod result;
pub mod translator;

pub use config::{ProviderKind, Settings};
pub use messages::{CapturedContent, Host, Message, Reply};
pub use normalize::{normalize, NormalizedOutput};
pub use prompt::{
    build_reverse_check_prompt, build_translation_prompt, ProviderFormat, TranslationRequest,
};
pub use provider::Provider;
pub use result::{Mode, ProviderFormatError, TranslationResult};
pub use translator::Translator;

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::info;

const LOG_RETENTION_DAYS: u64 = 14;
const LOG_FILE_PREFIX: &str = "tutor-translate.log";
const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn,hyper=warn";

fn build_log_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_env("TUTOR_TRANSLATE_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn cleanup_old_logs(log_dir: &Path) {
    let cutoff = match SystemTime::now()
        .checked_sub(Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60))
    {
        Some(time) => time,
        None => return,
    };

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let file_name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if !file_name.starts_with(LOG_FILE_PREFIX) {
            continue;
        }
        let modified = match entry.metadata().and_then(|meta| meta.modified()) {
            Ok(time) => time,
            Err(_) => continue,
        };
        if modified < cutoff {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Installs the global subscriber, writing to a daily log file under the app
/// directory. Falls back to stderr when that directory is unusable. Keep the
/// returned guard alive for the life of the process.
pub fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = match config::logs_dir() {
        Ok(dir) if std::fs::create_dir_all(&dir).is_ok() => dir,
        _ => {
            let _ = tracing_subscriber::fmt()
                .with_ansi(false)
                .with_writer(std::io::stderr)
                .with_env_filter(build_log_filter())
                .try_init();
            return None;
        }
    };

    cleanup_old_logs(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let installed = tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(build_log_filter())
        .try_init();
    if installed.is_err() {
        return None;
    }

    info!(
        log_dir = %log_dir.display(),
        retention_days = LOG_RETENTION_DAYS,
        "Logging initialized"
    );
    Some(guard)
}
