pub mod kernel;
pub mod services;
pub mod settings;

pub use kernel::dashboard::Dashboard;
