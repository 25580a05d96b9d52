//! Live delivery to the companion client.
//!
//! Newline-delimited JSON over one connection, strictly one request in
//! flight:
//!
//! ```text
//! → {"type":"template","seq":k,"index":i,"source":"kindling","data":{..}}
//! ← {"status":"success","index":i}  |  {"status":"error","index":i,"error":..}
//!   ... once per template, in packing order ...
//! → {"type":"finish","count":n}
//! ← {"status":"complete"}
//! ```
//!
//! Any failure stops the delivery and closes the session. The returned
//! error carries a [`Progress`]: templates `0..delivered` were confirmed
//! and are never resent by this session.

use std::fmt;
use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, info, warn};

use crate::encode::WIRE_VERSION;
use crate::error::TransmitError;
use crate::payload::TemplateCode;

/// Default companion client address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:31372";

/// How far a delivery got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub delivered: usize,
    pub total: usize,
}

impl Progress {
    /// Indices acknowledged by the client.
    pub fn confirmed(&self) -> Range<usize> {
        0..self.delivered
    }

    /// Indices that still need delivery.
    pub fn unconfirmed(&self) -> Range<usize> {
        self.delivered..self.total
    }

    pub fn is_complete(&self) -> bool {
        self.delivered == self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} templates delivered", self.delivered, self.total)
    }
}

#[derive(Debug, Deserialize)]
struct Ack {
    status: String,
    index: Option<usize>,
    error: Option<String>,
}

struct Connection<S> {
    lines: Lines<BufReader<ReadHalf<S>>>,
    writer: WriteHalf<S>,
}

/// One connection to the companion client.
///
/// Owns the stream exclusively and drops it after the first failure; every
/// later call returns [`TransmitError::SessionClosed`].
pub struct LiveSession<S> {
    conn: Option<Connection<S>>,
    seq: u64,
    ack_timeout: Duration,
}

impl LiveSession<TcpStream> {
    /// Connect to the client at `address`.
    pub async fn connect(address: &str, ack_timeout: Duration) -> Result<Self, TransmitError> {
        let refused = |reason: String| TransmitError::ConnectionRefused {
            address: address.to_string(),
            reason,
        };
        let stream = time::timeout(ack_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| refused("timed out".into()))?
            .map_err(|e| refused(e.to_string()))?;
        debug!(%address, "connected to companion client");
        Ok(Self::new(stream, ack_timeout))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> LiveSession<S> {
    pub fn new(stream: S, ack_timeout: Duration) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            conn: Some(Connection {
                lines: BufReader::new(reader).lines(),
                writer,
            }),
            seq: 0,
            ack_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Templates sent so far over this session; numbers the next `seq`.
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    /// Deliver `templates` in order and finish the batch.
    pub async fn deliver(&mut self, templates: &[TemplateCode]) -> Result<Progress, TransmitError> {
        if self.conn.is_none() {
            return Err(TransmitError::SessionClosed);
        }
        let mut progress = Progress {
            delivered: 0,
            total: templates.len(),
        };
        match self.run(templates, &mut progress).await {
            Ok(()) => {
                info!(count = progress.total, "delivery complete");
                Ok(progress)
            }
            Err(err) => {
                self.conn = None;
                warn!(
                    delivered = progress.delivered,
                    total = progress.total,
                    error = %err,
                    "delivery stopped"
                );
                Err(err)
            }
        }
    }

    async fn run(
        &mut self,
        templates: &[TemplateCode],
        progress: &mut Progress,
    ) -> Result<(), TransmitError> {
        for (index, template) in templates.iter().enumerate() {
            let message = json!({
                "type": "template",
                "seq": self.next_seq(),
                "index": index,
                "source": "kindling",
                "data": {
                    "name": template.name,
                    "code": template.code,
                    "version": WIRE_VERSION,
                }
            });
            self.send(&message, *progress).await?;
            let (ack, raw) = self.receive(&format!("template {index}"), *progress).await?;
            match (ack.status.as_str(), ack.index) {
                ("success", Some(i)) if i == index => {}
                ("error", Some(i)) if i == index => {
                    return Err(TransmitError::DeliveryRejected {
                        index,
                        reason: ack.error.unwrap_or_else(|| "no reason given".into()),
                        progress: *progress,
                    })
                }
                _ => {
                    return Err(TransmitError::UnexpectedResponse {
                        response: raw,
                        progress: *progress,
                    })
                }
            }
            progress.delivered += 1;
            info!(index, name = %template.name, "template delivered");
        }

        let finish = json!({ "type": "finish", "count": templates.len() });
        self.send(&finish, *progress).await?;
        let (ack, raw) = self.receive("finish", *progress).await?;
        if ack.status != "complete" {
            return Err(TransmitError::UnexpectedResponse {
                response: raw,
                progress: *progress,
            });
        }
        Ok(())
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.seq;
        self.seq += 1;
        seq
    }

    fn conn(&mut self) -> Result<&mut Connection<S>, TransmitError> {
        self.conn.as_mut().ok_or(TransmitError::SessionClosed)
    }

    async fn send(&mut self, message: &Json, progress: Progress) -> Result<(), TransmitError> {
        let mut line = message.to_string();
        line.push('\n');
        let conn = self.conn()?;
        let lost = |e: std::io::Error| TransmitError::ConnectionLost {
            reason: e.to_string(),
            progress,
        };
        conn.writer.write_all(line.as_bytes()).await.map_err(lost)?;
        conn.writer.flush().await.map_err(lost)?;
        debug!(bytes = line.len(), "sent message");
        Ok(())
    }

    async fn receive(
        &mut self,
        awaiting: &str,
        progress: Progress,
    ) -> Result<(Ack, String), TransmitError> {
        let timeout = self.ack_timeout;
        let conn = self.conn()?;
        let line = match time::timeout(timeout, conn.lines.next_line()).await {
            Err(_) => {
                return Err(TransmitError::AckTimeout {
                    awaiting: awaiting.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    progress,
                })
            }
            Ok(Err(e)) => {
                return Err(TransmitError::ConnectionLost {
                    reason: e.to_string(),
                    progress,
                })
            }
            Ok(Ok(None)) => {
                return Err(TransmitError::ConnectionLost {
                    reason: "client closed the connection".into(),
                    progress,
                })
            }
            Ok(Ok(Some(line))) => line,
        };
        match serde_json::from_str::<Ack>(&line) {
            Ok(ack) => Ok((ack, line)),
            Err(_) => Err(TransmitError::UnexpectedResponse {
                response: line,
                progress,
            }),
        }
    }
}
