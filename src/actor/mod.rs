//! Actor System for the Compile Broker
//!
//! Message-passing concurrency around one broker loop:
//!
//! ```text
//! requester connections ─┐
//! FsActor (watch) ───────┼──> BrokerActor ──> blocking pool (compile)
//! startup warm-up ───────┘         └────────> responses / reruns
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `broker` - Artifact cache, in-flight guard, watch registry
//! - `fs` - File system watcher with debouncing
//! - `coordinator` - Wires up and runs actors

pub mod broker;
pub mod coordinator;
pub mod fs;
pub mod messages;

pub use coordinator::Coordinator;
