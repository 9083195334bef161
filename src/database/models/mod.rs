pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskBuckets};
pub use user::{NewUser, User, UserProfile};
