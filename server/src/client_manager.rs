//! Registry of connected sessions.
//!
//! This module tracks every live connection on the server side:
//! - Session id assignment and capacity limits
//! - The bounded output queue feeding each connection's writer task
//! - The kick signal used to ask a session task to disconnect
//!
//! It holds no game state. Which character a session plays lives in the
//! world; this registry only knows how to reach a connection.

use crate::ids::SessionId;
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

/// Why a line could not be queued for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The session's output queue is at capacity.
    Full,
    /// The session's writer has stopped.
    Closed,
    /// No such session is registered.
    UnknownSession,
}

/// A connected client as seen by the rest of the server
#[derive(Debug)]
pub struct Client {
    /// Unique session identifier assigned by the server
    pub id: SessionId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    outbox: mpsc::Sender<String>,
    kick: Arc<Notify>,
}

impl Client {
    pub fn new(id: SessionId, addr: SocketAddr, outbox: mpsc::Sender<String>, kick: Arc<Notify>) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            outbox,
            kick,
        }
    }

    /// Queues a line without waiting. Never blocks on a slow client.
    pub fn enqueue(&self, text: String) -> Result<(), EnqueueError> {
        self.outbox.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Asks the session task to disconnect. Repeated kicks collapse into one.
    pub fn kick(&self) {
        self.kick.notify_one();
    }
}

/// Manages all connected sessions
///
/// Session ids start from 1 and are never reused for the lifetime of the
/// process, so a stale id held by an in-flight command can never reach a
/// newer connection.
pub struct ClientManager {
    /// Connected clients indexed by their session id
    clients: HashMap<SessionId, Client>,
    /// Next available id for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a new connection.
    ///
    /// Returns None when the server is at capacity.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbox: mpsc::Sender<String>,
        kick: Arc<Notify>,
    ) -> Option<SessionId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let id = SessionId(self.next_client_id);
        self.next_client_id += 1;

        info!("{} connected from {}", id, addr);
        self.clients.insert(id, Client::new(id, addr, outbox, kick));

        Some(id)
    }

    /// Removes a connection. Dropping the client drops its queue sender,
    /// which lets the writer task finish once the queue is drained.
    pub fn remove_client(&mut self, id: &SessionId) -> bool {
        if let Some(client) = self.clients.remove(id) {
            info!(
                "{} from {} removed after {:?}",
                client.id,
                client.addr,
                client.connected_at.elapsed()
            );
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn enqueue(&self, id: &SessionId, text: String) -> Result<(), EnqueueError> {
        self.clients
            .get(id)
            .ok_or(EnqueueError::UnknownSession)?
            .enqueue(text)
    }

    /// Signals a session to disconnect. Returns false for unknown ids.
    pub fn kick(&self, id: &SessionId) -> bool {
        match self.clients.get(id) {
            Some(client) => {
                client.kick();
                true
            }
            None => false,
        }
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.clients.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
