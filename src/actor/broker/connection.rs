//! One requester connection.
//!
//! The reader side forwards requests into the broker loop. Outbound
//! messages (responses and reruns) go through an unbounded queue drained by
//! a writer task, so the broker never waits on a slow peer.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::actor::messages::BrokerMsg;
use crate::protocol::{Message, MessageReader, MessageWriter};

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Outbound side of a requester connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: u64,
    tx: mpsc::UnboundedSender<Message>,
}

impl Connection {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a message. `false` once the peer is gone.
    pub fn send(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Serve one requester until it disconnects.
pub async fn serve_connection<R, W>(reader: R, writer: W, broker_tx: mpsc::Sender<BrokerMsg>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
    let conn = Connection::new(out_tx);
    let id = conn.id();
    crate::debug!("broker"; "connection #{} opened", id);

    tokio::spawn(async move {
        let mut writer = MessageWriter::new(writer);
        while let Some(message) = out_rx.recv().await {
            if let Err(e) = writer.send(&message).await {
                crate::debug!("broker"; "connection #{} write failed: {}", id, e);
                break;
            }
        }
    });

    let mut reader = MessageReader::new(reader);
    loop {
        match reader.next().await {
            Ok(Some(Message::FileRequest(request))) => {
                let msg = BrokerMsg::Request {
                    request,
                    conn: conn.clone(),
                };
                if broker_tx.send(msg).await.is_err() {
                    break;
                }
            }
            Ok(Some(other)) => {
                crate::debug!("broker"; "ignoring {} from connection #{}", other.kind(), id);
            }
            Ok(None) => break,
            Err(e) if e.is_fatal() => {
                crate::log!("broker"; "connection #{} failed: {}", id, e);
                break;
            }
            Err(e) => crate::log!("broker"; "malformed message on connection #{}: {}", id, e),
        }
    }

    crate::debug!("broker"; "connection #{} closed", id);
}
