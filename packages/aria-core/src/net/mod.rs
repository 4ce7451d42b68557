//! Socket tasks: the downstream accept loop and the upstream connector.
//!
//! These tasks own the sockets and nothing else; every byte they frame is
//! handed to the engine as an [`crate::engine::EngineEvent`], and every
//! outbound buffer reaches them through a per-link mpsc channel drained
//! into the socket.

pub mod listener;
pub mod upstream;

pub use listener::run_listener;
pub use upstream::run_upstream;
