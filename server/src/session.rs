//! Per-connection session handling.
//!
//! Every accepted connection runs [`run`] in its own task:
//! - `Connecting`: register with the router and start the writer task
//! - `Naming`: prompt for a name and bind (or resume) a character
//! - `Active`: parse and execute one command per input line
//! - `Disconnecting`: detach or remove the character, unregister, flush
//! - `Closed`: the socket is gone
//!
//! The world lock is only held while a command executes and its output is
//! queued. Reading from and writing to the socket never happens under it.

use crate::broadcast::{self, Registration};
use crate::error::{GameError, ServerError};
use crate::ids::{CharacterId, SessionId};
use crate::interpreter;
use crate::network::ServerState;
use log::{debug, error, info, warn};
use shared::{Command, LineBuffer, MAX_LINE_LENGTH, NAME_PROMPT};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, WriteHalf};
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

/// How long queued output may take to reach a departing client.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Sent to a connection refused because the registry is at capacity.
pub const SERVER_FULL: &str = "Sorry, the server is full.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Naming,
    Active(CharacterId),
    Disconnecting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Connection-local state. The character itself lives in the world; the
/// session only remembers its id.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    addr: SocketAddr,
    state: SessionState,
    lines: LineBuffer,
}

impl Session {
    pub fn new(id: SessionId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            state: SessionState::Connecting,
            lines: LineBuffer::new(MAX_LINE_LENGTH),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The character this session plays, once it is `Active`
    pub fn character(&self) -> Option<CharacterId> {
        match self.state {
            SessionState::Active(who) => Some(who),
            _ => None,
        }
    }

    /// Moves from `Connecting` to `Naming`. Ignored in any other state.
    pub fn begin_naming(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Naming;
        }
    }

    /// Binds a character after a successful login.
    ///
    /// Only valid while `Naming`; a session never switches characters.
    pub fn activate(&mut self, who: CharacterId) {
        if self.state == SessionState::Naming {
            self.state = SessionState::Active(who);
        }
    }

    /// Moves to `Disconnecting` and hands back the bound character, if any.
    pub fn begin_disconnect(&mut self) -> Option<CharacterId> {
        let who = self.character();
        if self.state != SessionState::Closed {
            self.state = SessionState::Disconnecting;
        }
        who
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Feeds raw socket bytes, returning any completed lines.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.lines.push(bytes)
    }

    async fn handle_line(&mut self, server: &ServerState, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }

        match self.state {
            SessionState::Naming => {
                self.login(server, line).await;
                Flow::Continue
            }
            SessionState::Active(who) => self.dispatch(server, who, line).await,
            SessionState::Connecting | SessionState::Disconnecting | SessionState::Closed => {
                Flow::Quit
            }
        }
    }

    async fn login(&mut self, server: &ServerState, raw: &str) {
        let mut world = server.world.write().await;
        match world.login(raw, self.id) {
            Ok(login) => {
                self.activate(login.character);
                info!(
                    "{} from {} playing '{}' ({})",
                    self.id,
                    self.addr,
                    world.character(login.character).map_or(raw, |c| c.name()),
                    if login.resumed { "resumed" } else { "new" }
                );
                match interpreter::enter_game(&world, login.character, login.resumed) {
                    Ok(outcome) => {
                        let deliveries =
                            broadcast::resolve(&world, login.character, outcome.notifications);
                        server.router.deliver(deliveries).await;
                    }
                    Err(err) => error!("{} could not enter the game: {}", self.id, err),
                }
            }
            Err(err) => {
                drop(world);
                warn!("{} refused name '{}': {}", self.id, raw, err);
                server.router.send(self.id, err.to_string()).await;
                server.router.send(self.id, NAME_PROMPT).await;
            }
        }
    }

    async fn dispatch(&mut self, server: &ServerState, who: CharacterId, line: &str) -> Flow {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(err) => {
                server
                    .router
                    .send(self.id, GameError::from(err).to_string())
                    .await;
                return Flow::Continue;
            }
        };
        debug!("{} -> {:?}", self.id, command);

        let mut world = server.world.write().await;
        match interpreter::execute(&mut world, who, command) {
            Ok(outcome) => {
                let flow = if outcome.disconnect {
                    Flow::Quit
                } else {
                    Flow::Continue
                };
                let deliveries = broadcast::resolve(&world, who, outcome.notifications);
                server.router.deliver(deliveries).await;
                flow
            }
            Err(err) => {
                drop(world);
                debug!("{} command failed: {}", self.id, err);
                server.router.send(self.id, err.to_string()).await;
                Flow::Continue
            }
        }
    }

    /// Releases the character according to the configured policy and
    /// removes this session from the registry.
    async fn disconnect(&mut self, server: &ServerState) {
        if let Some(who) = self.begin_disconnect() {
            let mut world = server.world.write().await;
            let still_bound = world.character(who).and_then(|c| c.session()) == Some(self.id);
            if still_bound {
                match interpreter::leave_game(&mut world, who, server.config.on_disconnect) {
                    Ok(outcome) => {
                        let deliveries = broadcast::resolve(&world, who, outcome.notifications);
                        server.router.deliver(deliveries).await;
                    }
                    Err(err) => error!("{} could not leave the game cleanly: {}", self.id, err),
                }
            }
        }
        server.router.unregister(self.id).await;
    }
}

/// Drains a session's output queue onto the socket, one `\r\n` per line.
async fn write_output<S>(
    id: SessionId,
    mut writer: WriteHalf<S>,
    mut outbox: mpsc::Receiver<String>,
    kick: Arc<Notify>,
) where
    S: AsyncRead + AsyncWrite,
{
    while let Some(text) = outbox.recv().await {
        let mut bytes = Vec::with_capacity(text.len() + 2);
        for line in text.lines() {
            bytes.extend_from_slice(line.as_bytes());
            bytes.extend_from_slice(b"\r\n");
        }

        if let Err(e) = writer.write_all(&bytes).await {
            error!("{} write failed: {}", id, e);
            kick.notify_one();
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("{} shutdown: {}", id, e);
    }
}

/// Runs one connection from accept to close.
pub async fn run<S>(server: Arc<ServerState>, stream: S, addr: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    let Some(Registration { id, outbox, kick }) = server.router.register(addr).await else {
        warn!("Refusing connection from {}: server full", addr);
        let refusal = format!("{}\r\n", SERVER_FULL);
        if let Err(e) = writer.write_all(refusal.as_bytes()).await {
            debug!("Could not notify {}: {}", addr, e);
        }
        let _ = writer.shutdown().await;
        return;
    };

    let mut writer_task = tokio::spawn(write_output(id, writer, outbox, Arc::clone(&kick)));

    let mut session = Session::new(id, addr);
    session.begin_naming();
    server.router.send(id, NAME_PROMPT).await;

    let mut buffer = [0u8; 1024];
    loop {
        tokio::select! {
            _ = kick.notified() => {
                warn!("{} disconnected by the server", id);
                break;
            }
            read = reader.read(&mut buffer) => match read {
                Ok(0) => {
                    info!("{} closed the connection", id);
                    break;
                }
                Ok(n) => {
                    let mut flow = Flow::Continue;
                    for line in session.feed(&buffer[..n]) {
                        flow = session.handle_line(&server, &line).await;
                        if flow == Flow::Quit {
                            break;
                        }
                    }
                    if flow == Flow::Quit {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{}: {}", id, ServerError::Connection(e));
                    break;
                }
            }
        }
    }

    session.disconnect(&server).await;
    drop(reader);

    if timeout(FLUSH_TIMEOUT, &mut writer_task).await.is_err() {
        warn!("{} output flush timed out", id);
        writer_task.abort();
    }

    session.close();
    debug!("{} closed", session.id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisconnectPolicy, ServerConfig};
    use crate::world::World;
    use tokio::io::{AsyncBufReadExt, BufReader, Lines, ReadHalf};
    use tokio_test::assert_ok;

    fn addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn server_with(config: ServerConfig) -> Arc<ServerState> {
        Arc::new(ServerState::new(config, World::default_world().unwrap()))
    }

    async fn next_line(lines: &mut Lines<BufReader<ReadHalf<tokio::io::DuplexStream>>>) -> String {
        let line = timeout(Duration::from_secs(5), lines.next_line()).await;
        assert_ok!(line).unwrap().expect("connection closed early")
    }

    #[test]
    fn test_state_transitions() {
        let mut session = Session::new(SessionId(1), addr());
        assert_eq!(session.state(), SessionState::Connecting);

        // Activation is only valid once naming has started
        session.activate(CharacterId(5));
        assert_eq!(session.state(), SessionState::Connecting);

        session.begin_naming();
        assert_eq!(session.state(), SessionState::Naming);
        session.activate(CharacterId(5));
        assert_eq!(session.character(), Some(CharacterId(5)));

        assert_eq!(session.begin_disconnect(), Some(CharacterId(5)));
        assert_eq!(session.state(), SessionState::Disconnecting);
        assert_eq!(session.character(), None);

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.begin_disconnect(), None);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_feed_reassembles_lines() {
        let mut session = Session::new(SessionId(1), addr());
        assert!(session.feed(b"sa").is_empty());
        assert_eq!(session.feed(b"y hi\r\n"), vec!["say hi".to_string()]);
    }

    #[tokio::test]
    async fn test_full_server_refuses_connection() {
        let mut config = ServerConfig::default();
        config.max_clients = 0;
        let server = server_with(config);

        let mock = tokio_test::io::Builder::new()
            .write(b"Sorry, the server is full.\r\n")
            .build();
        run(Arc::clone(&server), mock, addr()).await;

        assert_eq!(server.router.connected().await, 0);
    }

    #[tokio::test]
    async fn test_immediate_eof_unregisters() {
        let server = server_with(ServerConfig::default());

        let mock = tokio_test::io::Builder::new()
            .write(b"What is your name?\r\n")
            .build();
        run(Arc::clone(&server), mock, addr()).await;

        assert_eq!(server.router.connected().await, 0);
        assert_eq!(server.world.read().await.characters().count(), 0);
    }

    #[tokio::test]
    async fn test_login_command_and_quit() {
        let server = server_with(ServerConfig::default());
        let (client, server_side) = tokio::io::duplex(8192);
        let handle = tokio::spawn(run(Arc::clone(&server), server_side, addr()));

        let (read, mut write) = tokio::io::split(client);
        let mut lines = BufReader::new(read).lines();

        assert_eq!(next_line(&mut lines).await, "What is your name?");

        write.write_all(b"x\r\n").await.unwrap();
        assert_eq!(next_line(&mut lines).await, "Names must be at least 2 letters long.");
        assert_eq!(next_line(&mut lines).await, "What is your name?");

        write.write_all(b"anna\r\n").await.unwrap();
        assert!(next_line(&mut lines)
            .await
            .starts_with("Welcome to the game, Anna."));
        assert_eq!(next_line(&mut lines).await, "Tavern");
        while !next_line(&mut lines).await.starts_with("Exits are:") {}

        write.write_all(b"dance\n").await.unwrap();
        assert_eq!(
            next_line(&mut lines).await,
            "Unknown command 'dance'. Type 'help' for a list of commands."
        );

        write.write_all(b"go west\n").await.unwrap();
        assert_eq!(next_line(&mut lines).await, "Unknown exit 'west'");

        write.write_all(b"quit\n").await.unwrap();
        assert_eq!(next_line(&mut lines).await, "Goodbye!");
        let eof = timeout(Duration::from_secs(5), lines.next_line()).await;
        assert!(assert_ok!(eof).unwrap().is_none());

        handle.await.unwrap();
        assert_eq!(server.router.connected().await, 0);
        assert!(server.world.read().await.find_character("Anna").is_none());
    }

    #[tokio::test]
    async fn test_linger_policy_keeps_character() {
        let mut config = ServerConfig::default();
        config.on_disconnect = DisconnectPolicy::Linger;
        let server = server_with(config);

        let (client, server_side) = tokio::io::duplex(8192);
        let handle = tokio::spawn(run(Arc::clone(&server), server_side, addr()));
        let (read, mut write) = tokio::io::split(client);
        let mut lines = BufReader::new(read).lines();

        assert_eq!(next_line(&mut lines).await, "What is your name?");
        write.write_all(b"Bob\nget mug\n").await.unwrap();
        while next_line(&mut lines).await != "You pick up the mug." {}

        drop(write);
        drop(lines);
        handle.await.unwrap();

        let world = server.world.read().await;
        let bob = world.find_character("bob").unwrap();
        let character = world.character(bob).unwrap();
        assert!(!character.is_connected());
        assert_eq!(world.inventory(bob).unwrap().len(), 1);
    }
}
