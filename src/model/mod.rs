pub mod attendance;
pub mod journal;
pub mod placement;
pub mod role;
pub mod settings;
