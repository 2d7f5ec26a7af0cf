pub mod analysis;
pub mod config;
pub mod error;
pub mod gemini;
pub mod normalize;
pub mod server;

/// Process setup helpers
pub mod util {
    use tracing_subscriber::EnvFilter;

    /// Install the global `tracing` subscriber. `RUST_LOG` wins over the
    /// built-in default filter.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(super::config::RUST_LOG));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
