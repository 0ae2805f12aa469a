use std::path::PathBuf;

use clap::Parser;

use mostrador_core::api::CatalogClient;
use mostrador_core::config::Config;
use mostrador_core::logging::{self, LogConfig, LogLevel};
use mostrador_core::ui;

#[derive(Parser, Debug)]
#[command(name = "mostrador", about = "Terminal product-catalog manager")]
struct Cli {
    #[arg(long, help = "Catalog server address (host:port or full URL)")]
    server: Option<String>,

    #[arg(long, help = "Basic-auth username")]
    username: Option<String>,

    #[arg(long, help = "Basic-auth password")]
    password: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[arg(long, help = "Write logs to a file instead of stderr")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(err) = logging::init(&LogConfig {
        level: cli.log_level,
        file: cli.log_file.clone(),
    }) {
        eprintln!("failed to initialize logging: {err}");
        std::process::exit(1);
    }

    let mut config = Config::from_env();
    if let Some(server) = cli.server {
        config.server = server;
    }
    if let Some(username) = cli.username {
        config.username = username;
    }
    if let Some(password) = cli.password {
        config.password = password;
    }

    let api_config = match config.api_config() {
        Ok(api_config) => api_config,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(2);
        }
    };

    let client = match CatalogClient::new(api_config) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("❌ failed to build catalog client: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = ui::run(client).await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
