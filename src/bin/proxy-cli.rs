use axum::http::HeaderMap;
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;

use media_proxy::config::load_config;
use media_proxy::http::ProxyQuery;
use media_proxy::observability::logging;
use media_proxy::transport::{invoke, FunctionEvent};
use media_proxy::ProxyService;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Operator CLI for the media proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "media-proxy.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a function event as JSON on stdin, write the function response to stdout
    Invoke,
    /// Run one URL through the proxy pipeline
    Fetch {
        url: String,
        /// Return a diagnostic snippet if the upstream fails
        #[arg(long)]
        debug: bool,
        /// Write the body here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    logging::init(&config.observability)?;

    let proxy = ProxyService::from_config(&config)?;

    match cli.command {
        Commands::Invoke => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            let event: FunctionEvent = serde_json::from_str(&input)?;

            let response = invoke(&proxy, event).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Fetch { url, debug, output } => {
            let query = ProxyQuery {
                url: Some(url),
                debug: debug.then(|| "1".to_string()),
                ..Default::default()
            };
            let response = proxy.handle(&query, &HeaderMap::new()).await;

            eprintln!("{}", response.status);
            for (name, value) in response.headers.iter() {
                eprintln!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }

            match output {
                Some(path) => {
                    std::fs::write(&path, &response.body)?;
                    eprintln!("Wrote {} bytes to {}", response.body.len(), path.display());
                }
                None => std::io::stdout().write_all(&response.body)?,
            }

            if !response.status.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
