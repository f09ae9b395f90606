mod client;
mod generate;
mod handlers;
mod models;
mod state;

pub use handlers::{router, run_server};
pub use state::ServerState;
