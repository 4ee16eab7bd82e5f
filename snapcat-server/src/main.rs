mod config;
use clap::{Parser, Subcommand};
use crate::config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod server;
use crate::server::{ServerState, run_server};

#[derive(Parser)]
#[command(name = "snapcat")]
#[command(about = "Public catalog of chain snapshots kept in S3-compatible storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Build the catalog once and print it to stdout
    Dump {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,

        /// Pretty-print the JSON document
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snapcat=info,snapcat_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            tracing::info!("Starting Snapcat server with config: {}", config);

            let cfg = load_config(&config);

            tracing::info!(
                "Bind: {}, Store: {}, Filter: {}={}",
                cfg.bind_addr,
                cfg.store.endpoint,
                cfg.selector.tag_name,
                cfg.selector.tag_value
            );

            if let Err(e) = run_server(cfg).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Dump { config, pretty } => {
            let cfg = load_config(&config);

            let store = match cfg.store_builder().build().await {
                Ok(store) => store,
                Err(e) => {
                    tracing::error!("Failed to connect to store: {}", e);
                    std::process::exit(1);
                }
            };

            let state = ServerState::new(store, cfg);
            let catalog = match state.build_catalog().await {
                Ok(catalog) => catalog,
                Err(e) => {
                    tracing::error!("Catalog build failed: {}", e);
                    std::process::exit(1);
                }
            };

            let rendered = if pretty {
                catalog.to_json_pretty()
            } else {
                catalog.to_json()
            };

            match rendered {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    tracing::error!("Catalog serialization failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn load_config(path: &str) -> Config {
    match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}
