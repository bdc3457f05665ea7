use super::BrokerActor;
use crate::actor::messages::BrokerMsg;

impl BrokerActor {
    /// Main event loop. Ends on `Shutdown` or once every sender is gone.
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                BrokerMsg::Request { request, conn } => self.on_request(request, conn),
                BrokerMsg::Compile { entry, done } => self.on_compile(entry, done),
                BrokerMsg::FilesChanged(paths) => self.on_files_changed(paths),
                BrokerMsg::CompileDone { entry, result } => self.on_compile_done(entry, result),
                BrokerMsg::Shutdown => {
                    crate::debug!("broker"; "shutting down");
                    break;
                }
            }
        }
    }
}
