//! TCP listener and shared server state

use crate::broadcast::Router;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::session;
use crate::world::World;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Everything a session task needs to reach.
///
/// Lock order is always `world` before the router's registry. Socket I/O
/// never happens while `world` is held.
pub struct ServerState {
    pub world: RwLock<World>,
    pub router: Router,
    pub config: ServerConfig,
}

impl ServerState {
    pub fn new(config: ServerConfig, world: World) -> Self {
        Self {
            world: RwLock::new(world),
            router: Router::new(config.max_clients, config.outbox_capacity),
            config,
        }
    }
}

/// Loads the world named by `--world`, or the built-in one when unset.
pub fn load_world(config: &ServerConfig) -> Result<World, ServerError> {
    let world = match &config.world {
        Some(path) => World::load(path)?,
        None => World::default_world()?,
    };
    Ok(world)
}

/// Accepts connections and hands each one to its own session task
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    pub async fn bind(config: ServerConfig, world: World) -> Result<Self, ServerError> {
        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            state: Arc::new(ServerState::new(config, world)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Runs the accept loop until the task is dropped.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        error!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                    }
                    tokio::spawn(session::run(Arc::clone(&self.state), stream, addr));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorldError;

    fn local_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.host = "127.0.0.1".into();
        config.port = 0;
        config
    }

    #[test]
    fn test_load_world_uses_config_path() {
        let mut config = local_config();
        assert!(load_world(&config).is_ok());

        config.world = Some("does/not/exist.json".into());
        match load_world(&config) {
            Err(ServerError::World(WorldError::Io { path, .. })) => {
                assert!(path.ends_with("exist.json"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("missing world file loaded"),
        }
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = Server::bind(local_config(), World::default_world().unwrap())
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert_eq!(server.state().router.connected().await, 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_address() {
        let first = Server::bind(local_config(), World::default_world().unwrap())
            .await
            .unwrap();
        let port = first.local_addr().unwrap().port();
        let mut config = local_config();
        config.port = port;

        match Server::bind(config, World::default_world().unwrap()).await {
            Err(ServerError::Bind { addr, .. }) => {
                assert_eq!(addr, format!("127.0.0.1:{}", port))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("second bind on the same port succeeded"),
        }
    }
}
