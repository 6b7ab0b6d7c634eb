//! Tracing setup and structured run logging.

use tracing::{info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directive applied on top of `RUST_LOG`.
const DEFAULT_DIRECTIVE: &str = "actev=info";

/// Install a global subscriber: JSON when `LOG_FORMAT=json`, human-readable
/// ANSI output otherwise. Returns `false` if a subscriber was already set.
pub fn init_tracing() -> bool {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = DEFAULT_DIRECTIVE.parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
            .is_ok()
    }
}

/// Run logger for consistent lifecycle events.
///
/// Every event carries the run id and protocol so the output of parallel
/// workers can be correlated.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    protocol: String,
}

impl RunLogger {
    /// Create a logger with a fresh run id.
    pub fn new(protocol: &str) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            protocol: protocol.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            protocol = %self.protocol,
            "Scoring started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            protocol = %self.protocol,
            "Scoring progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            protocol = %self.protocol,
            "Scoring warning: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            protocol = %self.protocol,
            "Scoring completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Span wrapping the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "scoring_run",
            run_id = %self.run_id,
            protocol = %self.protocol
        )
    }
}
