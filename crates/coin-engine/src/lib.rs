//! coin-engine: swap calculation, swap execution and vesting claims behind
//! one facade.

pub mod config;
pub mod engine;

pub use config::{apply_overrides, load_config};
pub use engine::Engine;

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: [&str; 2] = ["coin_engine=debug", "info"];

/// Install the global tracing subscriber: `RUST_LOG` plus the default
/// directives. A second call is a no-op.
pub fn init_tracing() {
    let filter = DEFAULT_DIRECTIVES
        .iter()
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive);

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    tracing::info!("Starting coin engine");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }
}
