//! IPC module for the front-end bridge

mod protocol;
mod server;

pub use server::Server;
