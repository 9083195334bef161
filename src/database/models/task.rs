use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub user_id: i32,
    pub due_date: DateTime<Utc>,
}

/// Tasks split by completion state, each half in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskBuckets {
    pub completed_tasks: Vec<Task>,
    pub pending_tasks: Vec<Task>,
}

impl TaskBuckets {
    pub fn split(tasks: Vec<Task>) -> Self {
        let (completed_tasks, pending_tasks) = tasks.into_iter().partition(|t| t.is_completed);
        Self {
            completed_tasks,
            pending_tasks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i32, done: bool) -> Task {
        Task {
            id,
            title: format!("task {}", id),
            description: "something".to_string(),
            is_completed: done,
            user_id: 1,
            created_at: Utc::now(),
            due_date: None,
            completed_at: None,
        }
    }

    #[test]
    fn split_partitions_and_keeps_order() {
        let buckets = TaskBuckets::split(vec![task(1, false), task(2, true), task(3, false)]);
        let pending: Vec<_> = buckets.pending_tasks.iter().map(|t| t.id).collect();
        let completed: Vec<_> = buckets.completed_tasks.iter().map(|t| t.id).collect();
        assert_eq!(pending, vec![1, 3]);
        assert_eq!(completed, vec![2]);
    }
}
