use clap::{Parser, Subcommand};
use memos_relay::config::Config;
use memos_relay::{server, telegram};
use reqwest::Url;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "memos-relay",
    about = "Telegram webhook relay that saves messages to Memos"
)]
struct Cli {
    /// Config file (default: ~/.config/memos-relay/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server (default)
    Serve,
    /// Point the bot's webhook at this relay
    Register {
        /// Public origin of the relay, e.g. https://relay.example.com
        #[arg(long)]
        url: Url,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = rt.block_on(server::run(config)) {
                eprintln!("Relay error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Register { url } => {
            let client = reqwest::Client::new();
            match rt.block_on(telegram::webhook::register(&client, &config, &url)) {
                Ok(body) => println!("{body}"),
                Err(e) => {
                    eprintln!("Register error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
