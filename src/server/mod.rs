//! TCP accept loop.

pub mod listener;

pub use listener::Listener;
