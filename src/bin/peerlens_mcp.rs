use peerlens::mcp::run_server;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the MCP protocol, logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("peerlens=warn".parse()?)
                .add_directive("peerlens::mcp=info".parse()?),
        )
        .init();

    run_server().await
}
