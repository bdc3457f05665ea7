//! Requester side of the broker protocol.
//!
//! A [`Requester`] owns one connection. Any number of `preprocess` calls
//! may be in flight on it; a reader task matches responses to callers by
//! request id and routes rerun notifications to the channel registered for
//! the entry.
//!
//! ```ignore
//! let requester = Requester::connect(&config).await?;
//! let (rerun_tx, mut rerun_rx) = mpsc::unbounded_channel();
//! let file = PreprocessFile::new("tests/my%20spec.js", "/tmp/my spec.js").watch(rerun_tx);
//! let compiled = requester.preprocess(file).await?;
//! ```

mod error;
mod pending;


use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

pub use error::PreprocessError;
pub use pending::RerunSignal;
use pending::{PendingTable, RerunTable};

use crate::config::HotspecConfig;
use crate::protocol::{
    BoxedWriter, CompileRequest, Endpoint, Message, MessageReader, MessageWriter, ProtocolError,
};
use crate::utils::path::decode_file_path;

/// One file to preprocess.
#[derive(Debug)]
pub struct PreprocessFile {
    /// Entry path, possibly percent-encoded
    pub file_path: String,
    /// Where the broker should write the compiled output
    pub output_path: PathBuf,
    /// Rerun channel; `Some` asks the broker to watch the entry
    pub rerun: Option<mpsc::UnboundedSender<RerunSignal>>,
}

impl PreprocessFile {
    pub fn new(file_path: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            output_path: output_path.into(),
            rerun: None,
        }
    }

    /// Be told whenever the entry is recompiled.
    pub fn watch(mut self, rerun: mpsc::UnboundedSender<RerunSignal>) -> Self {
        self.rerun = Some(rerun);
        self
    }
}

#[derive(Default)]
struct Shared {
    pending: PendingTable,
    reruns: RerunTable,
}

/// Client connection to a broker.
pub struct Requester {
    client_id: String,
    next_id: AtomicU64,
    timeout: Option<Duration>,
    shared: Arc<Shared>,
    writer: Mutex<MessageWriter<BoxedWriter>>,
    reader_task: JoinHandle<()>,
}

impl Requester {
    /// Connect to the broker described by `[endpoint]`.
    pub async fn connect(config: &HotspecConfig) -> Result<Self, ProtocolError> {
        let endpoint = Endpoint::from_config(&config.endpoint);
        let (reader, writer) = endpoint.connect().await?;
        crate::debug!("preprocess"; "connected to {}", endpoint);

        Ok(Self::from_stream(
            reader,
            writer,
            config.endpoint.client_id.clone(),
            config.client.request_timeout(),
        ))
    }

    /// Run over an already open byte stream.
    pub fn from_stream<R, W>(
        reader: R,
        writer: W,
        client_id: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared = Arc::new(Shared::default());
        let reader_task = tokio::spawn(read_loop(reader, Arc::clone(&shared)));
        let writer: BoxedWriter = Box::new(writer);

        Self {
            client_id: client_id.into(),
            next_id: AtomicU64::new(0),
            timeout,
            shared,
            writer: Mutex::new(MessageWriter::new(writer)),
            reader_task,
        }
    }

    /// Ask the broker for a compiled entry; resolves to the written path.
    pub async fn preprocess(&self, file: PreprocessFile) -> Result<PathBuf, PreprocessError> {
        let file_path = decode_file_path(&file.file_path)
            .map_err(|_| PreprocessError::InvalidPath(file.file_path.clone()))?;
        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let should_watch = file.rerun.is_some();
        if let Some(rerun) = file.rerun {
            self.shared.reruns.register(file_path.clone(), rerun);
        }

        let rx = self
            .shared
            .pending
            .insert(request_id)
            .ok_or(PreprocessError::Disconnected)?;

        let request = Message::FileRequest(CompileRequest {
            requester_id: self.client_id.clone(),
            request_id,
            file_path,
            output_path: file.output_path,
            should_watch,
        });
        if let Err(e) = self.writer.lock().await.send(&request).await {
            crate::debug!("preprocess"; "request #{} not sent: {}", request_id, e);
            self.shared.pending.remove(request_id);
            return Err(PreprocessError::Disconnected);
        }

        let response = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(response) => response,
                Err(_) => {
                    self.shared.pending.remove(request_id);
                    return Err(PreprocessError::Timeout(limit));
                }
            },
            None => rx.await,
        };

        response
            .map_err(|_| PreprocessError::Disconnected)?
            .into_result()
            .map_err(PreprocessError::Compile)
    }

    /// Requests still waiting for a response.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.shared.pending.len()
    }
}

impl Drop for Requester {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

/// Route broker messages until the connection ends, then fail whatever is
/// still waiting.
async fn read_loop<R: AsyncRead + Unpin>(reader: R, shared: Arc<Shared>) {
    let mut reader = MessageReader::new(reader);
    loop {
        match reader.next().await {
            Ok(Some(Message::FileResponse(response))) => {
                let request_id = response.request_id;
                if !shared.pending.resolve(response) {
                    crate::debug!("preprocess"; "no caller waiting for #{}", request_id);
                }
            }
            Ok(Some(Message::Rerun(rerun))) => shared.reruns.notify(&rerun.file_path),
            Ok(Some(other)) => {
                crate::debug!("preprocess"; "ignoring {} from broker", other.kind());
            }
            Ok(None) => break,
            Err(e) if e.is_fatal() => {
                crate::debug!("preprocess"; "read failed: {}", e);
                break;
            }
            Err(e) => crate::log!("preprocess"; "malformed message from broker: {}", e),
        }
    }

    let failed = shared.pending.close();
    shared.reruns.close();
    if failed > 0 {
        crate::log!("preprocess"; "broker connection closed, {} request(s) failed", failed);
    }
}
