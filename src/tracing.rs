use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber shared by every binary.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies, which keeps
/// sqlx query noise down while the sync loops log at info.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
