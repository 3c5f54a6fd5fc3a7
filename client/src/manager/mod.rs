pub mod cache;
pub mod events;
pub mod http;
pub mod state;
