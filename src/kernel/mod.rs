pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod poller;
pub mod sample;
pub mod session;
pub mod state;
