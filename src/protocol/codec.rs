//! Line framing for [`Message`] envelopes.
//!
//! One JSON document per line. Readers skip blank lines; a malformed line
//! (bad JSON or not UTF-8) surfaces as [`ProtocolError::Decode`] and the
//! stream stays usable.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Split};

use super::error::ProtocolError;
use super::message::Message;

/// Reads envelopes from a byte stream
pub struct MessageReader<R> {
    lines: Split<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).split(b'\n'),
        }
    }

    /// Next envelope, `Ok(None)` once the peer closed the stream.
    pub async fn next(&mut self) -> Result<Option<Message>, ProtocolError> {
        loop {
            let Some(line) = self.lines.next_segment().await? else {
                return Ok(None);
            };

            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            return serde_json::from_slice(line)
                .map(Some)
                .map_err(ProtocolError::Decode);
        }
    }
}

/// Writes envelopes to a byte stream
pub struct MessageWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { inner: writer }
    }

    /// Write one envelope followed by a newline and flush.
    pub async fn send(&mut self, message: &Message) -> Result<(), ProtocolError> {
        let mut line = serde_json::to_vec(message).map_err(ProtocolError::Encode)?;
        line.push(b'\n');

        self.inner.write_all(&line).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Shut down the write half.
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::protocol::message::{CompileResponse, RerunNotification};

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = MessageWriter::new(client);
        let mut reader = MessageReader::new(server);

        let first = Message::FileResponse(CompileResponse::success("s", 1, "/tmp/a.js"));
        let second = Message::Rerun(RerunNotification {
            broker_id: "s".into(),
            file_path: PathBuf::from("/a.js"),
        });

        writer.send(&first).await.unwrap();
        writer.send(&second).await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(reader.next().await.unwrap(), Some(first));
        assert_eq!(reader.next().await.unwrap(), Some(second));
        assert_eq!(reader.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_line_is_recoverable() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut reader = MessageReader::new(server);

        client.write_all(b"{not json}\n\n").await.unwrap();
        let good = Message::FileResponse(CompileResponse::failure("s", 2, "boom"));
        client
            .write_all(format!("{}\n", good.to_json().unwrap()).as_bytes())
            .await
            .unwrap();
        drop(client);

        let err = reader.next().await.unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(reader.next().await.unwrap(), Some(good));
        assert_eq!(reader.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_recoverable() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut reader = MessageReader::new(server);

        client.write_all(b"{\"type\":\"\xff\xfe\"}\n").await.unwrap();
        let good = Message::Rerun(RerunNotification {
            broker_id: "s".into(),
            file_path: PathBuf::from("/a.js"),
        });
        client
            .write_all(format!("{}\n", good.to_json().unwrap()).as_bytes())
            .await
            .unwrap();
        drop(client);

        let err = reader.next().await.unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(!err.is_fatal());
        assert_eq!(reader.next().await.unwrap(), Some(good));
        assert_eq!(reader.next().await.unwrap(), None);
    }
}
