//! # Client Session
//!
//! Two tasks share one [`GameState`]:
//!
//! 1. **receive task**: owns the socket, feeds every frame to the
//!    [`Dispatcher`] and executes [`TransportCommand`]s (send, reconnect to
//!    the game server)
//! 2. **command task**: reads console lines and issues requests
//!
//! Handlers never touch the socket; they queue commands through the
//! [`ChannelSink`]. One [`CancellationToken`] ends both tasks. Teardown
//! releases the request lock and marks the session `Disconnected`.

use crate::codec::MuFrameCodec;
use crate::commands::{run_console, CommandHandler};
use crate::config::SessionConfig;
use crate::handlers::Dispatcher;
use bytes::BytesMut;
use futures::{SinkExt, StreamExt};
use muclient_core::{ClientError, Result};
use muclient_game::{ConnectionState, GameSettings, GameState, NameOracle, PacketSink};
use socket2::{SockRef, TcpKeepalive};
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

type FramedStream = Framed<TcpStream, MuFrameCodec>;

/// Work for the receive task
#[derive(Debug)]
pub enum TransportCommand {
    Send(BytesMut),
    Connect { host: String, port: u16 },
}

/// [`PacketSink`] that queues onto the receive task
#[derive(Debug, Clone)]
pub struct ChannelSink {
    commands: mpsc::UnboundedSender<TransportCommand>,
}

impl ChannelSink {
    pub fn new(commands: mpsc::UnboundedSender<TransportCommand>) -> Self {
        Self { commands }
    }

    fn push(&self, command: TransportCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::Network("transport is closed".to_string()))
    }
}

impl PacketSink for ChannelSink {
    fn send(&self, packet: BytesMut) -> Result<()> {
        self.push(TransportCommand::Send(packet))
    }

    fn connect_game_server(&self, host: &str, port: u16) -> Result<()> {
        self.push(TransportCommand::Connect {
            host: host.to_string(),
            port,
        })
    }
}

/// One client session from Connect Server to logout
pub struct Session {
    config: SessionConfig,
    state: Arc<GameState>,
    dispatcher: Dispatcher,
    sink: ChannelSink,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(config: SessionConfig, settings: GameSettings, names: Arc<dyn NameOracle>) -> Self {
        let (tx, commands) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(tx);
        let state = Arc::new(GameState::new(settings, Arc::new(sink.clone()), names));
        let dispatcher = Dispatcher::new(state.clone(), config.filter);
        Self {
            config,
            state,
            dispatcher,
            sink,
            commands,
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> Arc<GameState> {
        self.state.clone()
    }

    /// Token that ends the session when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Handle for queueing transport work from outside the session
    pub fn sink(&self) -> ChannelSink {
        self.sink.clone()
    }

    /// Run until the server closes, the connection fails or the session is
    /// cancelled
    ///
    /// # Errors
    /// Connect failures and socket errors; a clean close or cancellation is
    /// `Ok`.
    pub async fn run<R>(mut self, console: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let handler = CommandHandler::new(self.state.clone(), &self.config, self.cancel.clone());
        let console_task = tokio::spawn(run_console(handler, console));

        let result = self.receive_loop().await;
        if let Err(e) = &result {
            tracing::error!("Session ended with error: {}", e);
        }

        self.cancel.cancel();
        if let Err(e) = console_task.await {
            tracing::warn!("Console task failed: {}", e);
        }
        self.state.mark_disconnected();
        tracing::info!("Session closed");
        result
    }

    async fn receive_loop(&mut self) -> Result<()> {
        let connection = self.state.connection();
        connection.transition(ConnectionState::ConnectingToConnectServer);
        let mut stream = connect(&self.config.connect_host, self.config.connect_port, &self.config).await?;
        connection.transition(ConnectionState::ConnectedToConnectServer);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Receive task cancelled");
                    return flush_pending(&mut self.commands, &mut stream).await;
                }
                frame = stream.next() => match frame {
                    Some(Ok(frame)) => {
                        tracing::trace!("Received {} bytes: {:02X?}", frame.len(), &frame[..frame.len().min(16)]);
                        self.dispatcher.route(&frame);
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        tracing::info!("Connection closed by server");
                        return Ok(());
                    }
                },
                command = self.commands.recv() => match command {
                    Some(TransportCommand::Send(packet)) => {
                        tracing::trace!("Sending {} bytes: {:02X?}", packet.len(), &packet[..packet.len().min(16)]);
                        stream.send(packet).await?;
                    }
                    Some(TransportCommand::Connect { host, port }) => {
                        tracing::info!("Switching to game server {}:{}", host, port);
                        stream = connect(&host, port, &self.config).await?;
                        self.dispatcher.switch_to_game_server();
                        connection.transition(ConnectionState::ConnectedToGameServer);
                    }
                    None => {
                        tracing::info!("Closing connection");
                        return Ok(());
                    }
                },
            }
        }
    }
}

/// Write packets queued before cancellation, such as the logout from `quit`
async fn flush_pending(
    commands: &mut mpsc::UnboundedReceiver<TransportCommand>,
    stream: &mut FramedStream,
) -> Result<()> {
    while let Ok(command) = commands.try_recv() {
        match command {
            TransportCommand::Send(packet) => stream.send(packet).await?,
            TransportCommand::Connect { host, port } => {
                tracing::debug!("Dropping reconnect to {}:{} during shutdown", host, port);
            }
        }
    }
    Ok(())
}

/// Open a TCP connection with the session's socket options
async fn connect(host: &str, port: u16, config: &SessionConfig) -> Result<FramedStream> {
    let address = format!("{}:{}", host, port);
    tracing::info!("Connecting to {}", address);

    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&address))
        .await
        .map_err(|_| ClientError::Network(format!("Timed out connecting to {}", address)))?
        .map_err(|e| ClientError::Network(format!("Failed to connect to {}: {}", address, e)))?;

    stream.set_nodelay(true)?;
    let keepalive = TcpKeepalive::new().with_time(config.keepalive_idle);
    SockRef::from(&stream).set_tcp_keepalive(&keepalive)?;

    tracing::info!("Connected to {}", address);
    Ok(Framed::new(stream, MuFrameCodec::new()))
}
