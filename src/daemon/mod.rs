pub mod ipc;
pub mod run;
pub mod state;
pub mod tracker;
