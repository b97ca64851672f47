use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

use crate::Result;
use crate::error::Error;

const FALLBACK_FILTER: &str = "info";

/// Installs the global subscriber. Logs go to stderr so that `payload` output
/// on stdout stays machine readable.
///
/// # Errors
///
/// Fails when no usable filter can be built, when JSON output is requested
/// from a build without the `json-logs` feature, or when a global subscriber
/// is already installed.
pub fn init_tracing(explicit_filter: Option<&str>, use_json: bool) -> Result<()> {
    let filter = pick_filter(explicit_filter, std::env::var("RUST_LOG").ok())?;

    #[cfg(feature = "json-logs")]
    if use_json {
        let subscriber = Registry::default().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json()
                .flatten_event(true),
        );
        return tracing::subscriber::set_global_default(subscriber)
            .map_err(|err| Error::Telemetry(err.to_string()));
    }

    #[cfg(not(feature = "json-logs"))]
    if use_json {
        return Err(Error::Telemetry(
            "binary was built without the `json-logs` feature".to_string(),
        ));
    }

    let subscriber = Registry::default().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true),
    );
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| Error::Telemetry(err.to_string()))
}

/// First parseable of: the explicit flag, `RUST_LOG`, then `info`.
fn pick_filter(explicit: Option<&str>, from_env: Option<String>) -> Result<EnvFilter> {
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(from_env)
        .chain(std::iter::once(FALLBACK_FILTER.to_string()))
        .find_map(|candidate| EnvFilter::try_new(candidate).ok())
        .ok_or_else(|| Error::Telemetry("invalid log filter".to_string()))
}

#[cfg(test)]
mod tests {
    use super::pick_filter;

    #[test]
    fn explicit_filter_wins_over_environment() {
        let filter = match pick_filter(Some("woo_notify=debug"), Some("warn".into())) {
            Ok(filter) => filter,
            Err(err) => panic!("filter should build: {err}"),
        };
        assert_eq!(filter.to_string(), "woo_notify=debug");
    }

    #[test]
    fn unparsable_candidates_fall_through() {
        let filter = match pick_filter(Some("woo_notify=loud"), None) {
            Ok(filter) => filter,
            Err(err) => panic!("fallback should build: {err}"),
        };
        assert_eq!(filter.to_string(), "info");
    }
}
