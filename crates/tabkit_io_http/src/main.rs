// tabkit-serve
//
// Serves files under the configured root directory at /download.

use std::path::PathBuf;

use actix_web::{App, HttpServer, middleware, web};
use anyhow::Result;
use clap::Parser;
use log::info;
use tabkit_io_http::{ServerConfig, configure, logging};

#[derive(Debug, Parser)]
#[command(name = "tabkit-serve", version, about = "Serve files for download over HTTP")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        ServerConfig::from_file(&cli.config)?
    } else {
        eprintln!(
            "Warning: {} not found, using defaults",
            cli.config.display()
        );
        let mut config = ServerConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        config
    };

    logging::init_logging(&config.logging.level, &config.logging.targets)?;

    info!("Starting tabkit-serve v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: host={}, port={}, root_dir={}, chunk_size={}",
        config.server.host, config.server.port, config.download.root_dir, config.download.chunk_size
    );

    let options = web::Data::new(config.to_download_options());
    let bind_addr = (config.server.host.clone(), config.server.port);

    HttpServer::new(move || {
        App::new()
            .app_data(options.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .workers(config.server.workers)
    .bind(bind_addr)?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
