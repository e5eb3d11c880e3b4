pub mod batch;
pub mod config;
pub mod extract;
pub mod grammar;
pub mod log_io;
pub mod model;
pub mod pipeline;
pub mod resolve;
pub mod sink;
pub mod tracker;
