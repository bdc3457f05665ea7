//! Broker Message Protocol
//!
//! Every line on the wire is one envelope:
//!
//! ```json
//! {"type":"onFileRequest","data":{"id":"HotspecPreprocessor","requestId":0,
//!   "filePath":"/app/tests/a.spec.js","outputPath":"/tmp/a.spec.js","shouldWatch":true}}
//! {"type":"onFileResponse","data":{"id":"HotspecServer","requestId":0,"transpiledPath":"/tmp/a.spec.js"}}
//! {"type":"onFileResponse","data":{"id":"HotspecServer","requestId":1,"error":{"message":"..."}}}
//! {"type":"onRerun","data":{"id":"HotspecServer","filePath":"/app/tests/a.spec.js"}}
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Envelope sent over the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    /// Requester asks for a compiled entry
    #[serde(rename = "onFileRequest")]
    FileRequest(CompileRequest),

    /// Broker answers one request
    #[serde(rename = "onFileResponse")]
    FileResponse(CompileResponse),

    /// Broker reports that a watched entry changed
    #[serde(rename = "onRerun")]
    Rerun(RerunNotification),
}

/// One preprocessing call, as seen by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    /// Requester endpoint id
    #[serde(rename = "id")]
    pub requester_id: String,
    /// Unique per requester process, strictly increasing
    pub request_id: u64,
    /// Absolute, decoded entry path
    pub file_path: PathBuf,
    /// Where the requester reads the result from
    pub output_path: PathBuf,
    #[serde(default)]
    pub should_watch: bool,
}

/// Answer to exactly one [`CompileRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResponse {
    /// Broker endpoint id
    #[serde(rename = "id")]
    pub broker_id: String,
    pub request_id: u64,
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

/// Success carries the written path, failure only a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseOutcome {
    Success {
        #[serde(rename = "transpiledPath")]
        transpiled_path: PathBuf,
    },
    Failure {
        error: ErrorPayload,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Unsolicited notice that a watched entry was recompiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerunNotification {
    #[serde(rename = "id")]
    pub broker_id: String,
    pub file_path: PathBuf,
}

impl CompileResponse {
    /// Successful response pointing at the written output.
    pub fn success(
        broker_id: impl Into<String>,
        request_id: u64,
        transpiled_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            broker_id: broker_id.into(),
            request_id,
            outcome: ResponseOutcome::Success {
                transpiled_path: transpiled_path.into(),
            },
        }
    }

    /// Failed response carrying only a message.
    pub fn failure(
        broker_id: impl Into<String>,
        request_id: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            broker_id: broker_id.into(),
            request_id,
            outcome: ResponseOutcome::Failure {
                error: ErrorPayload {
                    message: message.into(),
                },
            },
        }
    }

    /// `Ok(transpiled_path)` or `Err(message)`.
    pub fn into_result(self) -> Result<PathBuf, String> {
        match self.outcome {
            ResponseOutcome::Success { transpiled_path } => Ok(transpiled_path),
            ResponseOutcome::Failure { error } => Err(error.message),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Success { .. })
    }
}

impl Message {
    /// Wire name of the envelope type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileRequest(_) => "onFileRequest",
            Self::FileResponse(_) => "onFileResponse",
            Self::Rerun(_) => "onRerun",
        }
    }

    /// Serialize to a single JSON line (without newline)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
