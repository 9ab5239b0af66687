use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use tokio::net::TcpStream;
use tokio::sync::{mpsc::UnboundedSender, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::config::{scoped_ws_url, ReconnectConfig};
use crate::connection::ConnectionStatus;
use crate::models::events::Event;
use crate::models::poll::PollId;
use crate::models::websocket::{Inbound, PING_FRAME};
use crate::normalize::parse_frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Owner of a running push-channel task. Dropping it tears the channel down too.
pub struct WsHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WsHandle {
    /// Closes the channel for good: no reconnect follows, timers are dropped, an
    /// open socket gets a normal-closure frame, and `Disconnected` is announced.
    pub async fn shutdown(self) {
        info!("Shutting down WebSocket");
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("WebSocket task ended abnormally: {}", e);
        }
    }
}

enum SessionEnd {
    Closed,
    Shutdown,
}

/// Starts the push channel for `base_url`, scoped to one poll when `scope` is set.
///
/// Must be called inside a tokio runtime. The task reconnects after
/// `timers.reconnect_delay` whenever the socket closes on its own, until the
/// returned handle is shut down or dropped.
pub fn run_websocket(
    base_url: &str,
    scope: Option<PollId>,
    timers: ReconnectConfig,
    status: ConnectionStatus,
    sender: UnboundedSender<Event>,
) -> WsHandle {
    let url = scoped_ws_url(base_url, scope);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(connection_loop(url, timers, status, sender, shutdown_rx));
    WsHandle { shutdown_tx, task }
}

fn announce_disconnected(status: &ConnectionStatus, sender: &UnboundedSender<Event>) {
    status.set_connected(false);
    let _ = sender.send(Event::Disconnected);
}

async fn connection_loop(
    url: String,
    timers: ReconnectConfig,
    status: ConnectionStatus,
    sender: UnboundedSender<Event>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        debug!("Connecting to WebSocket: {}", url);
        let connected = tokio::select! {
            result = tokio_tungstenite::connect_async(url.as_str()) => result,
            _ = &mut shutdown_rx => {
                announce_disconnected(&status, &sender);
                return;
            }
        };

        match connected {
            Ok((ws_stream, _)) => {
                info!("WebSocket connected: {}", url);
                status.set_connected(true);
                let _ = sender.send(Event::Connected);

                let end = run_session(ws_stream, &timers, &sender, &mut shutdown_rx).await;
                announce_disconnected(&status, &sender);
                if let SessionEnd::Shutdown = end {
                    return;
                }
                info!("WebSocket disconnected");
            }
            Err(e) => error!("WebSocket connection failed: {}", e),
        }

        info!("Reconnecting to WebSocket in {:?}", timers.reconnect_delay);
        tokio::select! {
            _ = tokio::time::sleep(timers.reconnect_delay) => {
                info!("Attempting WebSocket reconnection...");
            }
            _ = &mut shutdown_rx => {
                announce_disconnected(&status, &sender);
                return;
            }
        }
    }
}

async fn run_session(
    ws_stream: WsStream,
    timers: &ReconnectConfig,
    sender: &UnboundedSender<Event>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws_stream.split();

    let mut ping = tokio::time::interval_at(
        Instant::now() + timers.ping_interval,
        timers.ping_interval,
    );
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "Client closing connection".into(),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    debug!("Close frame not delivered: {}", e);
                }
                return SessionEnd::Shutdown;
            }
            _ = ping.tick() => {
                if let Err(e) = sink.send(Message::text(PING_FRAME)).await {
                    error!("Failed to send ping: {}", e);
                }
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => dispatch(text.as_str(), sender),
                Some(Ok(Message::Close(frame))) => {
                    info!("WebSocket close frame received: {:?}", frame);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    return SessionEnd::Closed;
                }
                None => return SessionEnd::Closed,
            }
        }
    }
}

fn dispatch(text: &str, sender: &UnboundedSender<Event>) {
    match parse_frame(text) {
        Ok(Inbound::Pong) => {}
        Ok(Inbound::Push(event)) => {
            if sender.send(Event::Push(event)).is_err() {
                debug!("Push event dropped, no observer");
            }
        }
        Ok(Inbound::Ignored(reason)) => debug!("Ignoring WebSocket message: {}", reason),
        Err(e) => debug!("Dropping malformed WebSocket message: {}", e),
    }
}
