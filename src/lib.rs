pub mod batch;
pub mod config;
pub mod context;
pub mod input;
pub mod provider;
pub mod table;
