pub mod commands;
pub mod display;
pub mod parser;
pub mod prompts;
