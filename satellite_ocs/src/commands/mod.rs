pub mod handler;

pub use handler::{run_receiver, spawn_receiver};
