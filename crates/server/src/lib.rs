pub mod api;
pub mod maintenance;
pub mod metrics;
pub mod state;
