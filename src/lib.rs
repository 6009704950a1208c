pub mod canon;
pub mod config;
pub mod http_cache;
pub mod http_client;
pub mod join;
pub mod lines;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod ratings;
pub mod report;
pub mod sources;
