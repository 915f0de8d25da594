//! # MUD Server Library
//!
//! A small multi-user dungeon served over plain TCP. Players connect with
//! telnet (or the bundled `mud_client`), pick a name, and then type one
//! command per line: walk between rooms, talk, pick things up, fight.
//!
//! ## Architecture
//!
//! ### One Task Per Connection
//! Each accepted socket gets a session task that reads lines and a writer
//! task that drains a bounded output queue. A slow reader fills its own
//! queue and is disconnected; nobody else waits on it.
//!
//! ### One Authoritative World
//! All rooms, characters and items live in a single [`world::World`]
//! behind one lock. A command is parsed, executed and its output queued
//! while that lock is held, so every player observes commands in one
//! global order and the room contents a message is addressed to are the
//! ones that existed when the command ran.
//!
//! ## Module Organization
//!
//! - `ids`: typed identifiers for rooms, characters, items and sessions
//! - `error`: error enums for commands, logins, world loading and the server
//! - `world`: rooms, characters, items and every mutation on them
//! - `interpreter`: runs a parsed command and describes who hears what
//! - `client_manager`: registry of live connections and their queues
//! - `broadcast`: turns audiences into sessions and enqueues output
//! - `session`: per-connection state machine
//! - `network`: TCP listener and shared server state
//! - `config`: command line options
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::world::World;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default(), World::default_world()?).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod ids;
pub mod interpreter;
pub mod network;
pub mod session;
pub mod world;
