use std::sync::OnceLock;

use tracing::{field::Visit, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

static IGNORE_PATTERNS: OnceLock<Vec<regex::Regex>> = OnceLock::new();

/// Install the global subscriber: `RUST_LOG` if set, otherwise
/// `default_filter`, formatted to stderr through [`LogIgnoreFilter`].
///
/// Invalid ignore patterns are reported and skipped rather than aborting
/// start-up.  Calling this twice is harmless; the second call is a no-op.
pub fn init(default_filter: &str, ignore: &[String]) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(LogIgnoreFilter),
        )
        .try_init()
        .is_ok();
    if !installed {
        return;
    }
    if let Err(e) = set_ignore_patterns(ignore) {
        tracing::warn!("ignoring [log] ignore patterns: {e}");
    }
}

/// Compile and activate the log-ignore patterns.  The first successful call
/// wins; later calls are silently ignored.
pub fn set_ignore_patterns(patterns: &[String]) -> Result<(), regex::Error> {
    let compiled = patterns
        .iter()
        .map(|p| regex::Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;
    let _ = IGNORE_PATTERNS.set(compiled);
    Ok(())
}

/// Per-layer filter dropping events whose `target: message` matches one of
/// the patterns installed via [`set_ignore_patterns`].
pub struct LogIgnoreFilter;

impl<S: Subscriber> tracing_subscriber::layer::Filter<S> for LogIgnoreFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        true
    }

    fn event_enabled(&self, event: &tracing::Event<'_>, _cx: &Context<'_, S>) -> bool {
        let Some(patterns) = IGNORE_PATTERNS.get() else {
            return true;
        };
        if patterns.is_empty() {
            return true;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        // Events bridged from the `log` crate carry the real target in a field.
        let target = visitor.log_target.as_deref().unwrap_or_else(|| event.metadata().target());
        is_ignored(patterns, target, &visitor.message)
    }
}

fn is_ignored(patterns: &[regex::Regex], target: &str, message: &str) -> bool {
    let candidate = format!("{target}: {message}");
    patterns.iter().any(|p| p.is_match(&candidate))
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    log_target: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "log.target" => self.log_target = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "log.target" => self.log_target = Some(format!("{value:?}")),
            _ => {}
        }
    }
}
