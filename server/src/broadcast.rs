//! Fans command notifications out to session output queues.
//!
//! Resolution and delivery are split: [`resolve`] turns world-relative
//! audiences into concrete sessions using the occupancy at the moment it is
//! called, and [`Router::deliver`] pushes the text onto each queue without
//! waiting. A recipient that cannot take more output is kicked; everyone
//! else still gets the line.

use crate::client_manager::{ClientManager, EnqueueError};
use crate::ids::{CharacterId, SessionId};
use crate::interpreter::{Audience, Notification};
use crate::world::World;
use log::{debug, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify, RwLock};

/// One line bound for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub session: SessionId,
    pub text: String,
}

fn session_of(world: &World, who: CharacterId) -> Option<SessionId> {
    world.character(who).and_then(|c| c.session())
}

/// Resolves each notification's audience against the current world.
pub fn resolve(world: &World, actor: CharacterId, notifications: Vec<Notification>) -> Vec<Delivery> {
    let mut deliveries = Vec::new();

    for notification in notifications {
        let targets: Vec<SessionId> = match &notification.audience {
            Audience::Actor => session_of(world, actor).into_iter().collect(),
            Audience::Character(who) => session_of(world, *who).into_iter().collect(),
            Audience::Room { room, except } => world
                .room(room)
                .map(|r| {
                    r.occupants()
                        .filter(|who| !except.contains(who))
                        .filter_map(|who| session_of(world, who))
                        .collect()
                })
                .unwrap_or_default(),
            Audience::Global { except } => world
                .connected_characters()
                .into_iter()
                .filter(|who| !except.contains(who))
                .filter_map(|who| session_of(world, who))
                .collect(),
        };

        for session in targets {
            deliveries.push(Delivery {
                session,
                text: notification.text.clone(),
            });
        }
    }

    deliveries
}

/// What a new connection gets back from [`Router::register`].
#[derive(Debug)]
pub struct Registration {
    pub id: SessionId,
    pub outbox: mpsc::Receiver<String>,
    pub kick: Arc<Notify>,
}

/// Owns the session registry and every output queue.
pub struct Router {
    clients: RwLock<ClientManager>,
    outbox_capacity: usize,
}

impl Router {
    /// Creates a router admitting at most `max_clients` sessions, each with
    /// room for `outbox_capacity` queued lines.
    pub fn new(max_clients: usize, outbox_capacity: usize) -> Self {
        Self {
            clients: RwLock::new(ClientManager::new(max_clients)),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Creates the output queue for a new connection. None when full.
    pub async fn register(&self, addr: SocketAddr) -> Option<Registration> {
        let (sender, outbox) = mpsc::channel(self.outbox_capacity);
        let kick = Arc::new(Notify::new());

        let id = self
            .clients
            .write()
            .await
            .add_client(addr, sender, Arc::clone(&kick))?;

        Some(Registration { id, outbox, kick })
    }

    /// Drops a session's queue sender.
    ///
    /// The writer task finishes once it has drained whatever was already
    /// queued. Returns false if the session was not registered.
    pub async fn unregister(&self, id: SessionId) -> bool {
        self.clients.write().await.remove_client(&id)
    }

    /// Number of registered sessions, named or not.
    pub async fn connected(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Queues a direct reply for one session.
    pub async fn send(&self, session: SessionId, text: impl Into<String>) -> bool {
        let kicked = self
            .deliver(vec![Delivery {
                session,
                text: text.into(),
            }])
            .await;
        kicked.is_empty()
    }

    /// Enqueues every delivery and returns the sessions that had to be
    /// kicked because their queue was full or closed.
    pub async fn deliver(&self, deliveries: Vec<Delivery>) -> Vec<SessionId> {
        let clients = self.clients.read().await;
        let mut kicked = Vec::new();

        for Delivery { session, text } in deliveries {
            match clients.enqueue(&session, text) {
                Ok(()) => {}
                Err(EnqueueError::UnknownSession) => {
                    debug!("Dropping output for departed {}", session);
                }
                Err(err) => {
                    if !kicked.contains(&session) {
                        warn!("Kicking {}: output queue {:?}", session, err);
                        clients.kick(&session);
                        kicked.push(session);
                    }
                }
            }
        }

        kicked
    }
}
