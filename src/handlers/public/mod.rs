pub mod auth;
pub mod system;

pub use auth::{login, register};
pub use system::{health, root};
