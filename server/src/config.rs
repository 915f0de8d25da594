use clap::{Parser, ValueEnum};
use shared::DEFAULT_PORT;
use std::path::PathBuf;

/// What happens to a character when its connection goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DisconnectPolicy {
    /// Remove the character; anything it carried is left on the floor.
    #[default]
    Remove,
    /// Keep the character asleep in the world so the same name can log back in.
    Linger,
}

/// Command line configuration for the MUD server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "A simple multi-user dungeon", long_about = None)]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// JSON world file to load instead of the built-in world
    #[arg(short, long)]
    pub world: Option<PathBuf>,

    /// Maximum number of simultaneous connections
    #[arg(short, long, default_value = "128")]
    pub max_clients: usize,

    /// Lines queued per connection before a slow client is dropped
    #[arg(long, default_value = "256")]
    pub outbox_capacity: usize,

    /// What to do with a character when its player disconnects
    #[arg(long, value_enum, default_value_t = DisconnectPolicy::Remove)]
    pub on_disconnect: DisconnectPolicy,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::parse_from(["server"])
    }
}
