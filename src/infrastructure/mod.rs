pub mod server;

pub use server::{start_server, ServerConfig, DEFAULT_ADDRESS};
