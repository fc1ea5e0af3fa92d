// ollama-gateway/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use ollama_gateway::{config::Config, run_server};

#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "ollama-gateway", version, about = "HTTP gateway in front of an Ollama server")]
struct Cli {
    /// Interface to bind, overrides API_HOST
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides API_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Upstream base URL, overrides OLLAMA_BASE_URL
    #[arg(long = "ollama-url")]
    ollama_url: Option<String>,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::from_env()?;

    if let Some(host) = cli.host {
        cfg.api_host = host;
    }
    if let Some(port) = cli.port {
        cfg.api_port = port;
    }
    if let Some(url) = cli.ollama_url {
        cfg.ollama_base_url = url.trim_end_matches('/').to_string();
    }

    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
