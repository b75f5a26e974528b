pub mod cache;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod view;
