pub mod access;
pub mod attendance;
pub mod clock;
pub mod companies;
pub mod config;
pub mod directory;
pub mod lifecycle;
pub mod store;
pub mod terminal;
