pub mod address;
pub mod challenge;
pub mod config;
pub mod credential;
pub mod messages;
pub mod models;
pub mod utils;

pub use config::*;
pub use messages::*;
pub use utils::*;
