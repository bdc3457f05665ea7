//! Configuration section definitions.
//!
//! Each module corresponds to a section in `hotspec.toml`:
//!
//! | Module     | TOML Section   | Purpose                                 |
//! |------------|----------------|-----------------------------------------|
//! | `client`   | `[client]`     | Requester side settings (timeout)       |
//! | `compiler` | `[compiler]`   | Compile command and failure policy      |
//! | `endpoint` | `[endpoint]`   | Socket location and endpoint ids        |
//! | `startup`  | `[startup]`    | Eager compilation at broker start       |
//! | `watch`    | `[watch]`      | Filesystem watcher roots                |

mod client;
mod compiler;
mod endpoint;
mod startup;
mod watch;

pub use client::ClientConfig;
pub use compiler::{CompilerConfig, ENTRY_PLACEHOLDER, FailurePolicy};
pub use endpoint::{EndpointConfig, Transport};
pub use startup::StartupConfig;
pub use watch::WatchConfig;
