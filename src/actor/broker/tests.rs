use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};

use super::{BrokerActor, serve_connection};
use crate::actor::messages::BrokerMsg;
use crate::compiler::testing::{PARSE_ERROR, ScriptedCompiler};
use crate::config::FailurePolicy;
use crate::protocol::{
    CompileRequest, CompileResponse, Message, MessageReader, MessageWriter, RerunNotification,
};

const BROKER_ID: &str = "TestServer";

/// Broker plus one raw protocol connection to it.
struct Harness {
    temp: TempDir,
    compiler: Arc<ScriptedCompiler>,
    broker_tx: mpsc::Sender<BrokerMsg>,
    reader: MessageReader<ReadHalf<DuplexStream>>,
    writer: MessageWriter<WriteHalf<DuplexStream>>,
}

impl Harness {
    fn start(compiler: ScriptedCompiler, policy: FailurePolicy) -> Self {
        let compiler = Arc::new(compiler);
        let (actor, broker_tx) = BrokerActor::new(compiler.clone(), policy, BROKER_ID);
        tokio::spawn(actor.run());

        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        tokio::spawn(serve_connection(server_read, server_write, broker_tx.clone()));

        let (client_read, client_write) = tokio::io::split(client);
        Self {
            temp: TempDir::new().unwrap(),
            compiler,
            broker_tx,
            reader: MessageReader::new(client_read),
            writer: MessageWriter::new(client_write),
        }
    }

    fn source(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn output_for(&self, request_id: u64) -> PathBuf {
        self.temp.path().join(format!("out/{request_id}.js"))
    }

    async fn send_request(&mut self, request_id: u64, entry: &Path, watch: bool) {
        let request = CompileRequest {
            requester_id: "TestClient".into(),
            request_id,
            file_path: entry.to_path_buf(),
            output_path: self.output_for(request_id),
            should_watch: watch,
        };
        self.writer
            .send(&Message::FileRequest(request))
            .await
            .unwrap();
    }

    async fn next(&mut self) -> Message {
        tokio::time::timeout(Duration::from_secs(10), self.reader.next())
            .await
            .expect("broker did not answer")
            .unwrap()
            .expect("connection closed")
    }

    async fn next_response(&mut self) -> CompileResponse {
        match self.next().await {
            Message::FileResponse(response) => response,
            other => panic!("expected response, got {other:?}"),
        }
    }

    /// Request an entry and return the served content or error message.
    async fn fetch(&mut self, request_id: u64, entry: &Path, watch: bool) -> Result<String, String> {
        self.send_request(request_id, entry, watch).await;
        let response = self.next_response().await;
        assert_eq!(response.request_id, request_id);
        assert_eq!(response.broker_id, BROKER_ID);
        response
            .into_result()
            .map(|path| std::fs::read_to_string(path).unwrap())
    }

    async fn compile(&self, entry: &Path) {
        let (done, rx) = oneshot::channel();
        self.broker_tx
            .send(BrokerMsg::Compile {
                entry: entry.to_path_buf(),
                done,
            })
            .await
            .unwrap();
        rx.await.unwrap();
    }

    async fn files_changed(&self, paths: &[&Path]) {
        let paths = paths.iter().map(|p| p.to_path_buf()).collect();
        self.broker_tx
            .send(BrokerMsg::FilesChanged(paths))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_request_compiles_and_writes_output() {
    let mut h = Harness::start(ScriptedCompiler::new(), FailurePolicy::Global);
    let entry = h.source("a.spec.js", "it(1)");

    h.send_request(0, &entry, false).await;
    let response = h.next_response().await;
    assert!(response.is_success());
    assert_eq!(response.into_result().unwrap(), h.output_for(0));
    assert_eq!(
        std::fs::read_to_string(h.output_for(0)).unwrap(),
        "compiled:it(1)"
    );
    assert_eq!(h.compiler.calls(), 1);

    // Cached afterwards
    assert_eq!(h.fetch(1, &entry, false).await.unwrap(), "compiled:it(1)");
    assert_eq!(h.compiler.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_compile() {
    let (compiler, gate) = ScriptedCompiler::new().gated();
    let (compiler, mut started) = compiler.observed();
    let mut h = Harness::start(compiler, FailurePolicy::Global);
    let entry = h.source("a.spec.js", "it(1)");

    h.send_request(0, &entry, false).await;
    started.recv().await.unwrap();
    h.send_request(1, &entry, false).await;
    gate.send(()).unwrap();

    let mut ids = vec![
        h.next_response().await.request_id,
        h.next_response().await.request_id,
    ];
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(h.compiler.calls_for(&entry), 1);
}

#[tokio::test]
async fn test_watched_change_fires_one_rerun() {
    let mut h = Harness::start(ScriptedCompiler::new(), FailurePolicy::Global);
    let entry = h.source("a.spec.js", "v1");
    assert_eq!(h.fetch(0, &entry, true).await.unwrap(), "compiled:v1");

    h.source("a.spec.js", "v2");
    h.files_changed(&[&entry]).await;

    assert_eq!(
        h.next().await,
        Message::Rerun(RerunNotification {
            broker_id: BROKER_ID.into(),
            file_path: entry.clone(),
        })
    );
    assert_eq!(h.fetch(1, &entry, true).await.unwrap(), "compiled:v2");
    assert_eq!(h.compiler.calls(), 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_request_matches_watcher_paths() {
    let mut h = Harness::start(ScriptedCompiler::new(), FailurePolicy::Global);
    std::fs::create_dir(h.temp.path().join("real")).unwrap();
    let real = h.source("real/a.spec.js", "v1");
    let link_dir = h.temp.path().join("link");
    std::os::unix::fs::symlink(h.temp.path().join("real"), &link_dir).unwrap();
    let linked = link_dir.join("a.spec.js");

    // warm-up under the canonical path, request through the link
    let canonical = real.canonicalize().unwrap();
    h.compile(&canonical).await;
    assert_eq!(h.fetch(0, &linked, true).await.unwrap(), "compiled:v1");
    assert_eq!(h.compiler.calls(), 1);

    // the watcher reports canonical paths
    h.source("real/a.spec.js", "v2");
    h.files_changed(&[&canonical]).await;

    assert_eq!(
        h.next().await,
        Message::Rerun(RerunNotification {
            broker_id: BROKER_ID.into(),
            file_path: linked.clone(),
        })
    );
    assert_eq!(h.fetch(1, &linked, true).await.unwrap(), "compiled:v2");
    assert_eq!(h.compiler.calls(), 2);
}

#[tokio::test]
async fn test_unwatched_change_recompiles_silently() {
    let mut h = Harness::start(ScriptedCompiler::new(), FailurePolicy::Global);
    let entry = h.source("a.spec.js", "v1");
    let other = h.source("b.spec.js", "b");
    h.fetch(0, &entry, false).await.unwrap();

    h.source("a.spec.js", "v2");
    h.files_changed(&[&entry, &other]).await;
    h.compile(&entry).await;

    // No rerun queued ahead of the response
    assert_eq!(h.fetch(1, &entry, false).await.unwrap(), "compiled:v2");
    // Never requested, so not an entry
    assert_eq!(h.compiler.calls_for(&other), 0);
}

#[tokio::test]
async fn test_global_failure_rejects_every_entry_until_fixed() {
    let mut h = Harness::start(ScriptedCompiler::new(), FailurePolicy::Global);
    let good = h.source("good.spec.js", "ok");
    let bad = h.source("bad.spec.js", "debugger");

    assert_eq!(h.fetch(0, &good, false).await.unwrap(), "compiled:ok");
    assert_eq!(h.fetch(1, &bad, true).await, Err(PARSE_ERROR.to_string()));
    assert_eq!(h.fetch(2, &good, false).await, Err(PARSE_ERROR.to_string()));

    h.source("bad.spec.js", "fixed");
    h.files_changed(&[&bad]).await;
    assert!(matches!(h.next().await, Message::Rerun(_)));

    assert_eq!(h.fetch(3, &bad, true).await.unwrap(), "compiled:fixed");
    assert_eq!(h.fetch(4, &good, false).await.unwrap(), "compiled:ok");
}

#[tokio::test]
async fn test_global_failure_keeps_previous_artifact() {
    let mut h = Harness::start(ScriptedCompiler::new(), FailurePolicy::Global);
    let entry = h.source("a.spec.js", "v1");
    let other = h.source("b.spec.js", "b");
    h.fetch(0, &entry, false).await.unwrap();

    h.source("a.spec.js", "debugger");
    h.files_changed(&[&entry]).await;
    h.compile(&entry).await;
    assert_eq!(h.fetch(1, &entry, false).await, Err(PARSE_ERROR.to_string()));

    // Any success clears the error state
    h.compile(&other).await;
    assert_eq!(h.fetch(2, &entry, false).await.unwrap(), "compiled:v1");
}

#[tokio::test]
async fn test_entry_policy_isolates_failures() {
    let mut h = Harness::start(ScriptedCompiler::new(), FailurePolicy::Entry);
    let good = h.source("good.spec.js", "ok");
    let bad = h.source("bad.spec.js", "debugger");

    assert_eq!(h.fetch(0, &good, false).await.unwrap(), "compiled:ok");
    assert_eq!(h.fetch(1, &bad, false).await, Err(PARSE_ERROR.to_string()));
    assert_eq!(h.fetch(2, &good, false).await.unwrap(), "compiled:ok");

    // A failed entry is retried on the next request
    h.source("bad.spec.js", "fixed");
    assert_eq!(h.fetch(3, &bad, false).await.unwrap(), "compiled:fixed");
    assert_eq!(h.compiler.calls_for(&bad), 2);
}

#[tokio::test]
async fn test_change_during_compile_runs_once_more() {
    let (compiler, gate) = ScriptedCompiler::new().gated();
    let (compiler, mut started) = compiler.observed();
    let h = Harness::start(compiler, FailurePolicy::Global);
    let entry = h.source("a.spec.js", "v1");

    gate.send(()).unwrap();
    h.compile(&entry).await;
    started.recv().await.unwrap();

    h.files_changed(&[&entry]).await;
    started.recv().await.unwrap();
    // Arrives while the recompile is held at the gate
    h.files_changed(&[&entry, &entry]).await;
    gate.send(()).unwrap();

    // Follow-up compile, joined before it is released
    started.recv().await.unwrap();
    let (done, rx) = oneshot::channel();
    h.broker_tx
        .send(BrokerMsg::Compile {
            entry: entry.clone(),
            done,
        })
        .await
        .unwrap();
    gate.send(()).unwrap();
    rx.await.unwrap();

    assert_eq!(h.compiler.calls_for(&entry), 3);
}

#[tokio::test]
async fn test_write_failure_becomes_error_response() {
    let mut h = Harness::start(ScriptedCompiler::new(), FailurePolicy::Global);
    let entry = h.source("a.spec.js", "v1");
    // `out` is a file, so `out/<id>.js` cannot be created
    std::fs::write(h.temp.path().join("out"), "").unwrap();

    let message = h.fetch(0, &entry, false).await.unwrap_err();
    assert!(message.starts_with("cannot write"), "{message}");
}

#[tokio::test]
async fn test_malformed_line_does_not_drop_connection() {
    use tokio::io::AsyncWriteExt;

    let compiler = Arc::new(ScriptedCompiler::new());
    let (actor, broker_tx) = BrokerActor::new(compiler, FailurePolicy::Global, BROKER_ID);
    tokio::spawn(actor.run());

    let (client, server) = tokio::io::duplex(4096);
    let (server_read, server_write) = tokio::io::split(server);
    tokio::spawn(serve_connection(server_read, server_write, broker_tx));

    let (client_read, mut client_write) = tokio::io::split(client);
    client_write.write_all(b"garbage\n").await.unwrap();

    let temp = TempDir::new().unwrap();
    let entry = temp.path().join("a.js");
    std::fs::write(&entry, "x").unwrap();
    let mut writer = MessageWriter::new(client_write);
    writer
        .send(&Message::FileRequest(CompileRequest {
            requester_id: "c".into(),
            request_id: 9,
            file_path: entry,
            output_path: temp.path().join("a.out.js"),
            should_watch: false,
        }))
        .await
        .unwrap();

    let mut reader = MessageReader::new(client_read);
    let Some(Message::FileResponse(response)) = reader.next().await.unwrap() else {
        panic!("expected response");
    };
    assert_eq!(response.request_id, 9);
    assert!(response.is_success());
}
