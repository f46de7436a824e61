use serde::Serialize;
use time::{Date, Duration, OffsetDateTime};

use crate::tasks::model::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Today,
    Week,
    High,
    Medium,
    Low,
    Pending,
    Completed,
}

impl TaskFilter {
    /// Dashboard filters, in button order.
    pub const DASHBOARD: [TaskFilter; 6] = [
        TaskFilter::All,
        TaskFilter::Today,
        TaskFilter::Week,
        TaskFilter::High,
        TaskFilter::Medium,
        TaskFilter::Low,
    ];

    /// Unknown keys fall back to `All`.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "today" => TaskFilter::Today,
            "week" => TaskFilter::Week,
            "high" => TaskFilter::High,
            "medium" => TaskFilter::Medium,
            "low" => TaskFilter::Low,
            "pending" => TaskFilter::Pending,
            "completed" | "complete" => TaskFilter::Completed,
            _ => TaskFilter::All,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Today => "today",
            TaskFilter::Week => "week",
            TaskFilter::High => "high",
            TaskFilter::Medium => "medium",
            TaskFilter::Low => "low",
            TaskFilter::Pending => "pending",
            TaskFilter::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskFilter::All => "All Tasks",
            TaskFilter::Today => "Today",
            TaskFilter::Week => "This Week",
            TaskFilter::High => "High Priority",
            TaskFilter::Medium => "Medium Priority",
            TaskFilter::Low => "Low Priority",
            TaskFilter::Pending => "Pending Tasks",
            TaskFilter::Completed => "Completed Tasks",
        }
    }

    pub fn matches(self, task: &Task, today: Date) -> bool {
        match self {
            TaskFilter::All => true,
            TaskFilter::Today => task.due_date == today,
            TaskFilter::Week => {
                task.due_date >= today && task.due_date <= today.saturating_add(Duration::days(7))
            }
            TaskFilter::High => task.priority == Priority::High,
            TaskFilter::Medium => task.priority == Priority::Medium,
            TaskFilter::Low => task.priority == Priority::Low,
            TaskFilter::Pending => !task.completed,
            TaskFilter::Completed => task.completed,
        }
    }

    pub fn apply<'a>(self, tasks: &'a [Task], today: Date) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t, today)).collect()
    }
}

/// Today's date in the local timezone, or UTC when the offset cannot be determined.
pub fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub low_priority: usize,
    pub medium_priority: usize,
    pub high_priority: usize,
    pub completed: usize,
}

impl TaskStats {
    /// Full scan; the list is small enough that nothing is cached.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut s, t| {
            s.total += 1;
            match t.priority {
                Priority::Low => s.low_priority += 1,
                Priority::Medium => s.medium_priority += 1,
                Priority::High => s.high_priority += 1,
            }
            if t.completed {
                s.completed += 1;
            }
            s
        })
    }
}
