//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::events::SessionEvent;
use crate::state::{Action, RecordingState, Session};

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from clients (UI, hotkey helper, provider workers) to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Apply an action to the session
    Dispatch { action: Action },

    /// Ask which states the session may move to next
    NextStates,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to session event notifications
    Subscribe,
}

/// Responses from daemon to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Session after a dispatched action
    Session(Session),

    /// Legal next states for the current session
    NextStates {
        state: RecordingState,
        states: Vec<RecordingState>,
        description: String,
    },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Pushed to subscribed clients after every dispatch
    Notification { event: SessionEvent },

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full daemon status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Current session
    pub session: Session,

    /// UI status text for the current state
    pub description: String,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl DaemonStatus {
    pub fn new(session: Session, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: session.describe().to_string(),
            session,
            uptime_secs,
        }
    }
}

/// Read one length-prefixed frame. Returns `None` on a clean disconnect.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        bail!("message too large: {} bytes", len);
    }

    let mut msg_buf = vec![0u8; len];
    reader.read_exact(&mut msg_buf).await?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    if msg_bytes.len() > MAX_MESSAGE_LEN {
        bail!("message too large: {} bytes", msg_bytes.len());
    }
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AudioHandle;

    #[test]
    fn test_request_serialization() {
        let req = Request::Dispatch {
            action: Action::StopRecording {
                audio: Some(AudioHandle::new("clip")),
                duration_ms: Some(900),
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"dispatch\""));
        assert!(json.contains("STOP_RECORDING"));
        assert!(json.contains("\"durationMs\":900"));
    }

    #[test]
    fn test_request_deserialization() {
        let json = r#"{"type":"dispatch","action":{"type":"START_RECORDING"}}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(
            req,
            Request::Dispatch {
                action: Action::StartRecording
            }
        );
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::new(Session::default(), 3));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["session"]["state"], "idle");
        assert_eq!(json["description"], "Ready to record");
        assert_eq!(json["uptime_secs"], 3);
    }

    #[test]
    fn test_frame_round_trip() {
        tokio_test::block_on(async {
            let mut buf = Vec::new();
            write_message(&mut buf, &Request::Ping).await.unwrap();
            assert_eq!(&buf[..4], &(buf.len() as u32 - 4).to_le_bytes());

            let mut reader = &buf[..];
            let frame = read_frame(&mut reader).await.unwrap().unwrap();
            let req: Request = serde_json::from_slice(&frame).unwrap();
            assert_eq!(req, Request::Ping);

            // Nothing left: clean disconnect.
            assert!(read_frame(&mut reader).await.unwrap().is_none());
        });
    }

    #[test]
    fn test_oversized_frame_rejected() {
        tokio_test::block_on(async {
            let len = (MAX_MESSAGE_LEN as u32 + 1).to_le_bytes();
            let mut reader = &len[..];
            assert!(read_frame(&mut reader).await.is_err());
        });
    }
}
