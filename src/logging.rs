//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "smart_summary=info";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `default_filter`. With `json` set, each event is one
/// JSON object per line.
pub fn init_tracing(default_filter: &str, json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_names_only_installed_targets() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        assert!(
            DEFAULT_FILTER
                .split(',')
                .all(|directive| directive.starts_with("smart_summary")),
            "unexpected directive in {DEFAULT_FILTER}"
        );
    }
}
