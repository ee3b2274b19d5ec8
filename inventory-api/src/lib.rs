pub mod api;
pub mod config;
pub mod items;
pub mod metrics_consts;
pub mod metrics_utils;
pub mod router;
pub mod server;
pub mod test_utils;
