pub mod flight;
pub mod store;
