pub mod files;
pub mod system;
pub mod tasks;
pub mod users;
