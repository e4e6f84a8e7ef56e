pub mod attach;
pub mod cache;
pub mod cli;
pub mod core;
pub mod gateway;
pub mod sync;
pub mod trash;
