mod commands;
mod handlers;
mod server;

pub use commands::Command;
pub use handlers::{GREETING, Reply, execute};
pub use server::{IpcHandles, start};
