use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::{
    session::{PairingRegistry, Participant, SessionContext},
    transport::{
        messages::{ClientMessage, ServerMessage},
        Outbound,
    },
};

/// Longest inbound line accepted, excluding the line terminator
pub const MAX_LINE_BYTES: usize = 1024;

/// Server-wide state shared by every connection
pub struct ServerState {
    pub registry: PairingRegistry,
    pub outbound_buffer: usize,
}

impl ServerState {
    pub fn new(context: Arc<SessionContext>, outbound_buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            registry: PairingRegistry::new(context),
            outbound_buffer,
        })
    }
}

/// Accept connections forever, one task per connection
pub async fn serve(listener: TcpListener, state: Arc<ServerState>) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Could not disable Nagle for {}: {}", peer, e);
        }

        let state = state.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, state).await;
        });
    }
}

/// Drive one client connection until either side hangs up
pub async fn handle_connection<S>(stream: S, peer: SocketAddr, state: Arc<ServerState>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let (tx, mut rx) = mpsc::channel::<Outbound>(state.outbound_buffer);
    let seated: Arc<OnceLock<Arc<Participant>>> = Arc::new(OnceLock::new());

    tracing::info!("Connection established from {}", peer);

    // Spawn a task to send messages to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Line(message) => {
                    let line = format!("{}\n", message);
                    if let Err(e) = writer.write_all(line.as_bytes()).await {
                        tracing::warn!("Failed to write to {}: {}", peer, e);
                        break;
                    }
                }
                Outbound::Close => break,
            }
        }
        let _ = writer.shutdown().await;
    });

    // Handle incoming lines from the client
    let recv_state = state.clone();
    let recv_seated = seated.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(128);
        loop {
            buf.clear();
            // Room for the longest line plus a CRLF terminator.
            let mut limited = (&mut reader).take(MAX_LINE_BYTES as u64 + 2);
            match limited.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    tracing::info!("Client {} disconnected", peer);
                    break;
                }
                Ok(_) => {
                    let content = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                    let content = content.strip_suffix(b"\r").unwrap_or(content);
                    if content.len() > MAX_LINE_BYTES {
                        tracing::warn!(
                            "Client {} sent a line over {} bytes; hanging up",
                            peer,
                            MAX_LINE_BYTES
                        );
                        break;
                    }
                    let line = String::from_utf8_lossy(content);
                    dispatch(&recv_state, &tx, peer, &recv_seated, &line).await;
                }
                Err(e) => {
                    tracing::warn!("Failed to read from {}: {}", peer, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    if let Some(participant) = seated.get() {
        state.registry.withdraw(participant);
        if let Some(session) = participant.session() {
            session.disconnect(participant).await;
        }
    }

    tracing::info!("Connection closed for {}", peer);
}

/// Route one inbound line: join requests before seating, session traffic after
async fn dispatch(
    state: &ServerState,
    tx: &mpsc::Sender<Outbound>,
    peer: SocketAddr,
    seated: &OnceLock<Arc<Participant>>,
    line: &str,
) {
    let message = match ClientMessage::parse(line) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("{} from {}", e, peer);
            ignore(tx, line).await;
            return;
        }
    };

    let Some(participant) = seated.get() else {
        match message {
            ClientMessage::Play { name: Some(name) } | ClientMessage::NewPlayer { name } => {
                let participant = Participant::new(name, peer, tx.clone());
                tracing::info!("{} joined from {}", participant.name(), peer);
                let _ = seated.set(participant.clone());
                if let Some(session) = state.registry.offer(participant) {
                    session.open().await;
                }
            }
            _ => ignore(tx, line).await,
        }
        return;
    };

    match participant.session() {
        Some(session) => session.handle(participant, message).await,
        None => tracing::debug!(
            "{} has no session yet; dropping {:?}",
            participant.name(),
            message
        ),
    }
}

async fn ignore(tx: &mpsc::Sender<Outbound>, line: &str) {
    let echo = ServerMessage::Ignoring {
        line: line.trim_end_matches('\r').to_string(),
    };
    let _ = tx.send(Outbound::Line(echo)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GameConfig,
        dictionary::Dictionary,
        game::WordValidator,
        models::Grid,
        session::{ChannelSink, Outcome, SessionSummary},
    };
    use tokio::io::{DuplexStream, Lines, ReadHalf, WriteHalf};

    struct Client {
        lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Client {
        fn connect(state: &Arc<ServerState>, ip: [u8; 4]) -> Self {
            let (client, server) = tokio::io::duplex(4096);
            let peer = SocketAddr::from((ip, 40000));
            tokio::spawn(handle_connection(server, peer, Arc::clone(state)));

            let (reader, writer) = tokio::io::split(client);
            Self {
                lines: BufReader::new(reader).lines(),
                writer,
            }
        }

        async fn send(&mut self, line: &str) {
            self.writer
                .write_all(format!("{}\r\n", line).as_bytes())
                .await
                .unwrap();
        }

        async fn recv(&mut self) -> Option<String> {
            self.lines.next_line().await.unwrap()
        }
    }

    fn state() -> (Arc<ServerState>, mpsc::UnboundedReceiver<SessionSummary>) {
        let config = GameConfig {
            duration_secs: 2,
            countdown_ticks: 1,
            board_layout: Some(Grid::from_layout("CATSDOGXXXXXXXXX").unwrap()),
            ..GameConfig::default()
        };
        let dictionary = Dictionary::from_words(["CAT", "DOG"]);
        let (sink, summaries) = ChannelSink::new();
        let context = SessionContext::new(
            WordValidator::new(Arc::new(dictionary)),
            config,
            Arc::new(sink),
        );
        (ServerState::new(context, 16), summaries)
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_and_early_lines_are_ignored() {
        let (state, _summaries) = state();
        let mut client = Client::connect(&state, [10, 0, 0, 1]);

        client.send("HELLO there").await;
        assert_eq!(client.recv().await.unwrap(), "IGNORING HELLO there");

        client.send("WORD cat").await;
        assert_eq!(client.recv().await.unwrap(), "IGNORING WORD cat");

        client.send("PLAY").await;
        assert_eq!(client.recv().await.unwrap(), "IGNORING PLAY");
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_clients_play_a_game() {
        let (state, mut summaries) = state();
        let mut alice = Client::connect(&state, [10, 0, 0, 1]);
        let mut bob = Client::connect(&state, [10, 0, 0, 2]);

        alice.send("PLAY alice").await;
        while state.registry.waiting().is_none() {
            tokio::task::yield_now().await;
        }
        bob.send("NEW_PLAYER bob").await;
        assert_eq!(alice.recv().await.unwrap(), "READY bob");
        assert_eq!(bob.recv().await.unwrap(), "READY alice");

        alice.send("READY").await;
        bob.send("READY").await;
        for client in [&mut alice, &mut bob] {
            assert_eq!(client.recv().await.unwrap(), "COUNTDOWN 1");
            assert_eq!(client.recv().await.unwrap(), "BOARD CATSDOGXXXXXXXXX 2");
        }

        bob.send("WORD dog").await;
        assert_eq!(alice.recv().await.unwrap(), "SCORE 0 1");
        assert_eq!(bob.recv().await.unwrap(), "SCORE 1 0");

        for client in [&mut alice, &mut bob] {
            assert_eq!(client.recv().await.unwrap(), "TIME 1");
            assert_eq!(client.recv().await.unwrap(), "TIME 0");
        }
        assert_eq!(alice.recv().await.unwrap(), "STOP 0 1 DOG 0 0 0");
        assert_eq!(bob.recv().await.unwrap(), "STOP 1 DOG 0 0 0 0");
        assert_eq!(alice.recv().await, None);
        assert_eq!(bob.recv().await, None);

        let summary = summaries.recv().await.unwrap();
        assert_eq!(summary.outcome, Outcome::Finished);
        assert_eq!(summary.winner(), Some("bob"));
        assert_eq!(state.registry.context().active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hangup_terminates_the_opponent() {
        let (state, mut summaries) = state();
        let mut alice = Client::connect(&state, [10, 0, 0, 1]);
        let mut bob = Client::connect(&state, [10, 0, 0, 2]);

        alice.send("PLAY alice").await;
        while state.registry.waiting().is_none() {
            tokio::task::yield_now().await;
        }
        bob.send("PLAY bob").await;
        assert_eq!(alice.recv().await.unwrap(), "READY bob");
        assert_eq!(bob.recv().await.unwrap(), "READY alice");

        drop(bob);
        assert_eq!(alice.recv().await.unwrap(), "TERMINATED");
        assert_eq!(alice.recv().await, None);

        let summary = summaries.recv().await.unwrap();
        assert_eq!(summary.outcome, Outcome::Terminated);
    }

    #[tokio::test]
    async fn test_line_at_the_limit_is_read() {
        let (state, _summaries) = state();
        let mut client = Client::connect(&state, [10, 0, 0, 1]);

        let line = "X".repeat(MAX_LINE_BYTES);
        client.send(&line).await;
        assert_eq!(client.recv().await.unwrap(), format!("IGNORING {}", line));
    }

    #[tokio::test]
    async fn test_overlong_line_hangs_up() {
        let (state, _summaries) = state();
        let mut client = Client::connect(&state, [10, 0, 0, 1]);

        client.send(&"X".repeat(MAX_LINE_BYTES * 2)).await;
        assert_eq!(client.recv().await, None);
    }

    #[tokio::test]
    async fn test_waiting_client_hangup_frees_the_slot() {
        let (state, _summaries) = state();
        let mut alice = Client::connect(&state, [10, 0, 0, 1]);

        alice.send("PLAY alice").await;
        while state.registry.waiting().is_none() {
            tokio::task::yield_now().await;
        }
        drop(alice);
        while state.registry.waiting().is_some() {
            tokio::task::yield_now().await;
        }
    }
}
