use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::oneshot;

use super::BrokerActor;
use super::connection::Connection;
use super::state::{InFlight, Waiter, Watch};
use crate::actor::messages::BrokerMsg;
use crate::compiler::{Artifact, CompileFailure};
use crate::logger::{status_error, status_success};
use crate::protocol::{CompileRequest, CompileResponse, Message, RerunNotification};
use crate::utils::path::normalize_path;

impl BrokerActor {
    /// Answer from cache, or park the request behind a compilation.
    pub(super) fn on_request(&mut self, request: CompileRequest, conn: Connection) {
        crate::debug!(
            "broker";
            "request #{} from {}: {}",
            request.request_id,
            request.requester_id,
            request.file_path.display()
        );

        // Keyed like watcher events; the output path stays as given
        let entry = normalize_path(&request.file_path);

        if request.should_watch {
            let watch = Watch {
                conn: conn.clone(),
                file_path: request.file_path.clone(),
            };
            self.state.watch(&entry, watch);
        }

        if self.state.is_ready(&entry) {
            self.respond(&entry, request, conn);
            return;
        }

        self.start_or_join(entry, Waiter::Request { request, conn });
    }

    /// Explicit compile trigger (startup warm-up).
    pub(super) fn on_compile(&mut self, entry: PathBuf, done: oneshot::Sender<()>) {
        self.start_or_join(normalize_path(&entry), Waiter::Signal(done));
    }

    /// Recompile every known entry among the changed paths.
    pub(super) fn on_files_changed(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            let path = normalize_path(&path);
            if !self.state.is_known(&path) {
                crate::debug!("watch"; "not an entry: {}", path.display());
                continue;
            }
            if self.state.mark_dirty(&path) {
                crate::debug!("watch"; "recompile queued: {}", path.display());
                continue;
            }
            crate::debug!("watch"; "recompiling {}", path.display());
            if self.state.begin(&path, None) {
                self.spawn_compile(path);
            }
        }
    }

    /// Store the outcome, fire a rerun if due, then resume waiters.
    pub(super) fn on_compile_done(
        &mut self,
        entry: PathBuf,
        result: Result<Artifact, CompileFailure>,
    ) {
        match &result {
            Ok(artifact) => {
                crate::debug!("compile"; "{} ({} bytes)", entry.display(), artifact.len());
                status_success(&format!("compiled: {}", entry.display()));
            }
            Err(failure) => {
                status_error(&format!("compile failed: {}", entry.display()), &failure.message);
            }
        }

        if self.state.record(&entry, result, self.policy) {
            self.notify_rerun(&entry);
        }

        let InFlight { waiters, dirty } = self.state.finish(&entry);
        for waiter in waiters {
            match waiter {
                Waiter::Request { request, conn } => self.respond(&entry, request, conn),
                Waiter::Signal(done) => {
                    let _ = done.send(());
                }
            }
        }

        if dirty && self.state.begin(&entry, None) {
            crate::debug!("compile"; "changed while compiling, again: {}", entry.display());
            self.spawn_compile(entry);
        }
    }

    fn start_or_join(&mut self, entry: PathBuf, waiter: Waiter) {
        if self.state.begin(&entry, Some(waiter)) {
            self.spawn_compile(entry);
        } else {
            crate::debug!("compile"; "joined in-flight: {}", entry.display());
        }
    }

    /// Compile on the blocking pool and report back into the loop.
    fn spawn_compile(&self, entry: PathBuf) {
        let compiler = Arc::clone(&self.compiler);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let path = entry.clone();
            let result = tokio::task::spawn_blocking(move || compiler.compile(&path))
                .await
                .unwrap_or_else(|e| Err(CompileFailure::new(format!("compiler crashed: {e}"))));

            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(BrokerMsg::CompileDone { entry, result }).await;
            }
        });
    }

    /// Send the single response for a request whose entry is settled.
    fn respond(&self, entry: &Path, request: CompileRequest, conn: Connection) {
        let broker_id = self.broker_id.clone();
        let request_id = request.request_id;

        let artifact = match self.state.lookup(entry) {
            Ok(artifact) => artifact,
            Err(message) => {
                conn.send(Message::FileResponse(CompileResponse::failure(
                    broker_id, request_id, message,
                )));
                return;
            }
        };

        tokio::spawn(async move {
            let output = request.output_path;
            let response = match write_artifact(&output, &artifact).await {
                Ok(()) => CompileResponse::success(broker_id, request_id, output),
                Err(e) => {
                    let message = format!("cannot write {}: {}", output.display(), e);
                    crate::log!("error"; "{}", message);
                    CompileResponse::failure(broker_id, request_id, message)
                }
            };
            conn.send(Message::FileResponse(response));
        });
    }

    fn notify_rerun(&self, entry: &Path) {
        let Some(watch) = self.state.watcher(entry) else {
            return;
        };

        crate::log!("rerun"; "{}", entry.display());
        let rerun = Message::Rerun(RerunNotification {
            broker_id: self.broker_id.clone(),
            file_path: watch.file_path.clone(),
        });
        if !watch.conn.send(rerun) {
            crate::debug!("rerun"; "connection #{} is gone", watch.conn.id());
        }
    }
}

/// Write an artifact, creating missing parent directories.
async fn write_artifact(path: &Path, artifact: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, artifact).await
}
