use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::{Span, field};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initializes the process-wide tracing subscriber. Safe to call more than
/// once; only the first call takes effect.
pub fn init(service_name: &'static str, json: bool) {
    LOGGER_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let base = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_span_events(fmt::format::FmtSpan::CLOSE);

        if json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(base.json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(base.pretty())
                .init();
        }

        tracing::info!(service = service_name, "logger initialized");
    });
}

/// Root span for a single wizard request (Start/Decide/Confirm/...).
pub fn root_span(op: &'static str) -> Span {
    tracing::info_span!(
        "wizard_op",
        op = op,
        user_id = field::Empty,
        list_id = field::Empty,
        session_id = field::Empty,
    )
}

pub fn annotate_span(list_id: Option<&str>, session_id: Option<&uuid::Uuid>) {
    let span = Span::current();
    if let Some(lid) = list_id {
        span.record("list_id", &field::display(lid));
    }
    if let Some(sid) = session_id {
        span.record("session_id", &field::display(sid));
    }
}

/// Wraps an I/O future and emits a warning if it exceeds `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = std::time::Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
