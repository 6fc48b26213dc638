pub mod common;
pub mod config;
pub mod logging;
pub mod telemetry;

// Domain data shapes and the text/date rules that produce them
pub mod dates;
pub mod domain;
pub mod normalize;
pub mod url_guard;

// Ports and their adapters
pub mod app;
pub mod infra;
pub mod storage;

pub mod reconcile;
pub mod resolver;
pub mod scheduler;
pub mod scrapers;
pub mod server;
