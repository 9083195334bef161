pub mod auth;
pub mod tasks;

pub use auth::whoami;
pub use tasks::{complete_task, create_task, list_tasks};
