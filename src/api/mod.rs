pub mod attendance;
pub mod journal;
pub mod placement;
pub mod settings;
pub mod user;
