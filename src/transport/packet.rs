//! Engine.IO v4 / Socket.IO v4 text framing.
//!
//! Only the default namespace and text payloads are supported. Binary
//! attachments are rejected.

use crate::types::constants::{ENGINE_IO_VERSION, SOCKET_IO_PATH};
use crate::types::{RealtimeError, RealtimeMessage, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Handshake sent by the server in the Engine.IO `open` packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    /// How long the connection may stay silent before it is considered dead.
    pub fn liveness_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet on the default namespace
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event {
        id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        id: u64,
        args: Vec<Value>,
    },
    ConnectError(Value),
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| RealtimeError::Protocol("empty engine.io frame".to_string()))?;
        let body = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(body)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '4' => Ok(Self::Message(SocketPacket::decode(body)?)),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(RealtimeError::Protocol(format!(
                "unknown engine.io packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            Self::Open(handshake) => format!("0{}", serde_json::to_string(handshake)?),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Message(packet) => format!("4{}", packet.encode()?),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        })
    }
}

impl SocketPacket {
    /// Builds an event packet from a realtime message.
    ///
    /// A `null` payload is sent as a bare event with no argument.
    pub fn event(message: &RealtimeMessage) -> Self {
        let args = if message.payload.is_null() {
            Vec::new()
        } else {
            vec![message.payload.clone()]
        };
        Self::Event {
            id: None,
            name: message.event.as_str().to_string(),
            args,
        }
    }

    /// Converts an event packet into a realtime message.
    ///
    /// Single-argument events carry that argument as payload; several
    /// arguments are collected into an array.
    pub fn into_message(self) -> Option<RealtimeMessage> {
        let Self::Event { name, mut args, .. } = self else {
            return None;
        };
        let payload = match args.len() {
            0 => Value::Null,
            1 => args.remove(0),
            _ => Value::Array(args),
        };
        Some(RealtimeMessage::new(name, payload))
    }

    pub fn decode(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| RealtimeError::Protocol("empty socket.io packet".to_string()))?;
        let rest = strip_default_namespace(chars.as_str())?;

        match kind {
            '0' => {
                if rest.is_empty() {
                    Ok(Self::Connect(None))
                } else {
                    Ok(Self::Connect(Some(serde_json::from_str(rest)?)))
                }
            }
            '1' => Ok(Self::Disconnect),
            '2' => {
                let (id, data) = split_ack_id(rest)?;
                let mut args = parse_args(data)?;
                if args.is_empty() {
                    return Err(RealtimeError::Protocol(
                        "event packet without a name".to_string(),
                    ));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(RealtimeError::Protocol(format!(
                            "event name must be a string, got {}",
                            other
                        )));
                    }
                };
                Ok(Self::Event { id, name, args })
            }
            '3' => {
                let (id, data) = split_ack_id(rest)?;
                let id = id.ok_or_else(|| {
                    RealtimeError::Protocol("ack packet without an id".to_string())
                })?;
                Ok(Self::Ack {
                    id,
                    args: parse_args(data)?,
                })
            }
            '4' => Ok(Self::ConnectError(if rest.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(rest)?
            })),
            '5' | '6' => Err(RealtimeError::Protocol(
                "binary socket.io packets are not supported".to_string(),
            )),
            other => Err(RealtimeError::Protocol(format!(
                "unknown socket.io packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(match self {
            Self::Connect(None) => "0".to_string(),
            Self::Connect(Some(auth)) => format!("0{}", serde_json::to_string(auth)?),
            Self::Disconnect => "1".to_string(),
            Self::Event { id, name, args } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                let id = id.map(|id| id.to_string()).unwrap_or_default();
                format!("2{}{}", id, serde_json::to_string(&array)?)
            }
            Self::Ack { id, args } => format!("3{}{}", id, serde_json::to_string(args)?),
            Self::ConnectError(data) => format!("4{}", serde_json::to_string(data)?),
        })
    }
}

fn strip_default_namespace(rest: &str) -> Result<&str> {
    if !rest.starts_with('/') {
        return Ok(rest);
    }
    let (namespace, remainder) = rest.split_once(',').unwrap_or((rest, ""));
    if namespace != "/" {
        return Err(RealtimeError::Protocol(format!(
            "unsupported namespace '{}'",
            namespace
        )));
    }
    Ok(remainder)
}

fn split_ack_id(rest: &str) -> Result<(Option<u64>, &str)> {
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return Ok((None, rest));
    }
    let id = rest[..digits]
        .parse()
        .map_err(|_| RealtimeError::Protocol(format!("invalid ack id in '{}'", rest)))?;
    Ok((Some(id), &rest[digits..]))
}

fn parse_args(data: &str) -> Result<Vec<Value>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(data)? {
        Value::Array(args) => Ok(args),
        other => Err(RealtimeError::Protocol(format!(
            "expected a JSON array of arguments, got {}",
            other
        ))),
    }
}

/// Builds the Socket.IO websocket URL for an endpoint.
///
/// `http(s)` schemes are mapped to `ws(s)`. Any path on the endpoint is
/// replaced by the handshake path, since a path would otherwise name a
/// Socket.IO namespace.
pub fn socket_io_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(RealtimeError::Connection(format!(
                "unsupported endpoint scheme '{}'",
                other
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| RealtimeError::Connection(format!("cannot use scheme '{}'", scheme)))?;

    if !matches!(url.path(), "" | "/") {
        tracing::debug!(
            "Ignoring path '{}' of socket endpoint, connecting to the default namespace",
            url.path()
        );
    }
    url.set_path(SOCKET_IO_PATH);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("EIO", ENGINE_IO_VERSION)
        .append_pair("transport", "websocket");

    Ok(url)
}
