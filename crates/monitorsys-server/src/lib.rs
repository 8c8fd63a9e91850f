pub mod api;
pub mod collector;
pub mod config;
pub mod gpu;
pub mod hub;
pub mod source;
pub mod state;
pub mod ticker;
pub mod websocket;
