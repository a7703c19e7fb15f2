pub mod build;
pub mod clean;
pub mod order;
pub mod setup;
pub mod status;
pub mod test;
pub mod update;
pub mod watch;
