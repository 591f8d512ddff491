use super::packet::{EnginePacket, OpenHandshake, SocketPacket, socket_io_url};
use super::{Connector, OpenRequest, Outbound, TransportEvent, TransportLink};
use crate::infrastructure::Timer;
use crate::types::constants::disconnect_reasons;
use crate::types::{RealtimeError, Result};
use futures::stream::Stream;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Socket.IO v4 transport over a single websocket.
///
/// Each `open` spawns a worker task that owns the socket, answers
/// Engine.IO pings, enforces the server's liveness window and reconnects
/// according to the request's [`ReconnectPolicy`](crate::infrastructure::ReconnectPolicy).
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, request: OpenRequest) -> TransportLink {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(connection_worker(request, outbound_rx, inbound_tx));

        TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        }
    }
}

enum SessionOutcome {
    /// The client asked for the close
    ClientClosed,
    /// The server disconnected the namespace; no reconnect
    ServerDisconnect,
    /// The server refused the namespace connect; no reconnect
    Refused(String),
    /// The connection dropped; reconnect if the policy allows
    Lost,
}

async fn connection_worker(
    request: OpenRequest,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    inbound_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    let url = match socket_io_url(&request.endpoint) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Invalid socket endpoint {}: {}", request.endpoint, e);
            let _ = inbound_tx.send(TransportEvent::Failed(e.to_string()));
            return;
        }
    };

    let mut timer = Timer::new(request.reconnect.clone());

    loop {
        tracing::info!("Connecting to {}", url);
        match run_session(
            &url,
            request.connect_timeout,
            &mut outbound_rx,
            &inbound_tx,
            &mut timer,
        )
        .await
        {
            Ok(SessionOutcome::ClientClosed) | Ok(SessionOutcome::ServerDisconnect) => break,
            Ok(SessionOutcome::Refused(reason)) => {
                let _ = inbound_tx.send(TransportEvent::Failed(reason));
                break;
            }
            Ok(SessionOutcome::Lost) => {}
            Err(e) => {
                tracing::warn!("Connection attempt failed: {}", e);
                let _ = inbound_tx.send(TransportEvent::ConnectError(e.to_string()));
            }
        }

        if outbound_rx.is_closed() {
            break;
        }

        let Some(delay) = timer.next_delay() else {
            let reason = if request.reconnect.enabled {
                format!(
                    "gave up after {} reconnect attempts",
                    request.reconnect.max_attempts
                )
            } else {
                "reconnection disabled".to_string()
            };
            tracing::warn!("Transport failed: {}", reason);
            let _ = inbound_tx.send(TransportEvent::Failed(reason));
            break;
        };

        tracing::info!(
            "Reconnect attempt {} in {:?}",
            timer.attempts(),
            delay
        );
        let _ = inbound_tx.send(TransportEvent::Reconnecting {
            attempt: timer.attempts(),
            delay,
        });

        if !wait_before_retry(delay, &mut outbound_rx).await {
            break;
        }
    }

    tracing::debug!("Transport worker for {} finished", url);
}

/// Sleeps out a reconnect delay. Emits issued meanwhile are dropped.
///
/// Returns `false` when the client closed the transport during the wait.
async fn wait_before_retry(
    delay: Duration,
    outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
) -> bool {
    let sleep = time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Emit(message)) => {
                    tracing::debug!("Dropping '{}' while reconnecting", message.event);
                }
                Some(Outbound::Close) | None => return false,
            },
        }
    }
}

async fn run_session(
    url: &Url,
    connect_timeout: Duration,
    outbound_rx: &mut mpsc::UnboundedReceiver<Outbound>,
    inbound_tx: &mpsc::UnboundedSender<TransportEvent>,
    timer: &mut Timer,
) -> Result<SessionOutcome> {
    let opening = async move {
        let (socket, _) = time::timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| RealtimeError::Connection("connect timeout".to_string()))??;
        let (write, mut read) = socket.split();

        let handshake = time::timeout(connect_timeout, read_handshake(&mut read))
            .await
            .map_err(|_| RealtimeError::Connection("engine.io handshake timeout".to_string()))??;
        Ok::<_, RealtimeError>((write, read, handshake))
    };
    tokio::pin!(opening);

    // A close requested mid-handshake abandons the attempt.
    let (mut write, mut read, handshake) = loop {
        tokio::select! {
            opened = &mut opening => break opened?,
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Emit(message)) => {
                    tracing::debug!("Dropping '{}' while connecting", message.event);
                }
                Some(Outbound::Close) | None => {
                    tracing::info!("Connection attempt to {} cancelled", url);
                    return Ok(SessionOutcome::ClientClosed);
                }
            },
        }
    };
    tracing::debug!(
        "Engine.IO session {} (ping interval {} ms, timeout {} ms)",
        handshake.sid,
        handshake.ping_interval,
        handshake.ping_timeout
    );

    send_packet(
        &mut write,
        &EnginePacket::Message(SocketPacket::Connect(None)),
    )
    .await?;

    let mut liveness = handshake.liveness_window();
    let mut deadline = Instant::now() + liveness;
    let mut connected = false;

    // Reports the end of a session that did not come from the client.
    let lost = |connected: bool, reason: &str| {
        let event = if connected {
            TransportEvent::Disconnected(reason.to_string())
        } else {
            TransportEvent::ConnectError(reason.to_string())
        };
        let _ = inbound_tx.send(event);
        SessionOutcome::Lost
    };

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Emit(message)) => {
                    if !connected {
                        tracing::debug!("Dropping '{}' before namespace connect", message.event);
                        continue;
                    }
                    let packet = EnginePacket::Message(SocketPacket::event(&message));
                    if let Err(e) = send_packet(&mut write, &packet).await {
                        tracing::error!("Failed to send '{}': {}", message.event, e);
                        return Ok(lost(connected, disconnect_reasons::TRANSPORT_ERROR));
                    }
                }
                Some(Outbound::Close) | None => {
                    if connected {
                        let _ = send_packet(
                            &mut write,
                            &EnginePacket::Message(SocketPacket::Disconnect),
                        )
                        .await;
                    }
                    let _ = write.close().await;
                    if connected {
                        let _ = inbound_tx.send(TransportEvent::Disconnected(
                            disconnect_reasons::CLIENT.to_string(),
                        ));
                    }
                    tracing::info!("Closed socket connection");
                    return Ok(SessionOutcome::ClientClosed);
                }
            },
            _ = time::sleep_until(deadline) => {
                tracing::warn!("No traffic from server within {:?}", liveness);
                return Ok(lost(connected, disconnect_reasons::PING_TIMEOUT));
            }
            inbound = read.next() => {
                deadline = Instant::now() + liveness;
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received frame: {}", text.as_str());
                        match EnginePacket::decode(text.as_str()) {
                            Ok(EnginePacket::Ping) => {
                                if let Err(e) = send_packet(&mut write, &EnginePacket::Pong).await {
                                    tracing::error!("Failed to answer ping: {}", e);
                                    return Ok(lost(connected, disconnect_reasons::TRANSPORT_ERROR));
                                }
                            }
                            Ok(EnginePacket::Open(handshake)) => {
                                liveness = handshake.liveness_window();
                                deadline = Instant::now() + liveness;
                            }
                            Ok(EnginePacket::Close) => {
                                return Ok(lost(connected, disconnect_reasons::TRANSPORT_CLOSE));
                            }
                            Ok(EnginePacket::Message(SocketPacket::Connect(_))) => {
                                connected = true;
                                timer.reset();
                                tracing::info!("Socket connected");
                                let _ = inbound_tx.send(TransportEvent::Connected);
                            }
                            Ok(EnginePacket::Message(SocketPacket::ConnectError(data))) => {
                                let reason = data
                                    .get("message")
                                    .and_then(|m| m.as_str())
                                    .map(str::to_string)
                                    .unwrap_or_else(|| data.to_string());
                                tracing::warn!("Server refused connection: {}", reason);
                                let _ = write.close().await;
                                return Ok(SessionOutcome::Refused(reason));
                            }
                            Ok(EnginePacket::Message(SocketPacket::Disconnect)) => {
                                tracing::info!("Server disconnected the socket");
                                let _ = inbound_tx.send(TransportEvent::Disconnected(
                                    disconnect_reasons::SERVER.to_string(),
                                ));
                                let _ = write.close().await;
                                return Ok(SessionOutcome::ServerDisconnect);
                            }
                            Ok(EnginePacket::Message(packet)) => {
                                if let Some(message) = packet.into_message() {
                                    let _ = inbound_tx.send(TransportEvent::Event(message));
                                }
                            }
                            Ok(other) => {
                                tracing::debug!("Ignoring engine.io packet {:?}", other);
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse frame: {} - Raw: {}", e, text.as_str());
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(close_frame) = frame {
                            tracing::warn!(
                                "Server closed connection: code={:?}, reason='{}'",
                                close_frame.code,
                                close_frame.reason
                            );
                        } else {
                            tracing::warn!("Server closed connection without close frame");
                        }
                        return Ok(lost(connected, disconnect_reasons::TRANSPORT_CLOSE));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket read error: {}", e);
                        return Ok(lost(connected, disconnect_reasons::TRANSPORT_ERROR));
                    }
                    None => {
                        return Ok(lost(connected, disconnect_reasons::TRANSPORT_CLOSE));
                    }
                }
            }
        }
    }
}

/// Reads frames until the Engine.IO `open` packet arrives.
async fn read_handshake<S>(read: &mut S) -> Result<OpenHandshake>
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => {
                return match EnginePacket::decode(text.as_str())? {
                    EnginePacket::Open(handshake) => Ok(handshake),
                    other => Err(RealtimeError::Protocol(format!(
                        "expected engine.io open packet, got {:?}",
                        other
                    ))),
                };
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Err(RealtimeError::Connection(
        "connection closed during handshake".to_string(),
    ))
}

async fn send_packet<S>(write: &mut S, packet: &EnginePacket) -> Result<()>
where
    S: futures::Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let frame = packet.encode()?;
    tracing::debug!("Sending frame: {}", frame);
    write.send(Message::Text(frame.into())).await?;
    Ok(())
}
