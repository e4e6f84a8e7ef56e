pub mod sqlite;
pub mod r#trait;
