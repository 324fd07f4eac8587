use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with console output.
pub fn init_logging() {
    // Create a formatted layer for console logging
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    // Set the global default subscriber
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("sisant_ingest=info".parse().unwrap()))
        .with(console_layer)
        .init();
}
