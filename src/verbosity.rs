// Global verbosity: 0=quiet, 1=basic, 2=full
use tracing_subscriber::EnvFilter;

/// Map the CLI verbosity level onto a tracing filter for this crate.
pub fn filter_for_level(level: u8) -> &'static str {
    match level {
        0 => "spacetraders_coord=warn",
        1 => "spacetraders_coord=info",
        _ => "spacetraders_coord=debug",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the verbosity level.
pub fn init_tracing(level: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_for_level(level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_levels_are_more_verbose() {
        assert!(filter_for_level(0).ends_with("warn"));
        assert!(filter_for_level(1).ends_with("info"));
        assert!(filter_for_level(2).ends_with("debug"));
        assert_eq!(filter_for_level(9), filter_for_level(2));
    }
}
