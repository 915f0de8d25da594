use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::{load_world, Server};

/// Main-method of the application.
/// Parses command-line arguments, loads the world and serves it until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();

    let world = load_world(&config)?;
    info!(
        "Loaded {} rooms, starting room '{}'",
        world.rooms().count(),
        world.start_room()
    );

    let server = match Server::bind(config, world).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
