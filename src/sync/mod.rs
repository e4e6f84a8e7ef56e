pub mod optimistic;
pub mod session;
