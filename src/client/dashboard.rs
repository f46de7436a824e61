use time::Date;
use tracing::warn;
use uuid::Uuid;

use super::{
    api::ApiClient,
    filter::{TaskFilter, TaskStats},
    ClientError,
};
use crate::tasks::{dto::TaskFields, model::Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modal {
    #[default]
    Closed,
    Creating,
    Editing(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// One-shot, user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Raises the loading flag for its lifetime. Lowered on drop, including when the save
/// future is cancelled mid-request.
struct LoadingGuard<'a>(&'a mut bool);

impl<'a> LoadingGuard<'a> {
    fn set(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// State behind the task overview: the last fetched list, the active filter, the
/// add/edit modal and pending notifications.
///
/// Every mutation is followed by a full refresh of the list. A failed call leaves the
/// previous list in place and queues an error notice.
#[derive(Debug, Default)]
pub struct Dashboard {
    tasks: Vec<Task>,
    filter: TaskFilter,
    modal: Modal,
    loading: bool,
    notices: Vec<Notice>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn visible(&self, today: Date) -> Vec<&Task> {
        self.filter.apply(&self.tasks, today)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// True while a save request is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn modal(&self) -> Modal {
        self.modal
    }

    pub fn open_create(&mut self) {
        self.modal = Modal::Creating;
    }

    /// Opens the editor for a task in the current list. Returns false if it is not there.
    pub fn open_edit(&mut self, id: Uuid) -> bool {
        if self.tasks.iter().any(|t| t.id == id) {
            self.modal = Modal::Editing(id);
            true
        } else {
            false
        }
    }

    pub fn close_modal(&mut self) {
        self.modal = Modal::Closed;
    }

    /// The task being edited, if the modal is in edit mode.
    pub fn editing(&self) -> Option<&Task> {
        match self.modal {
            Modal::Editing(id) => self.tasks.iter().find(|t| t.id == id),
            _ => None,
        }
    }

    /// Resolves a full id or a unique id prefix against the current list.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<Uuid> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return None;
        }
        let mut hits = self
            .tasks
            .iter()
            .filter(|t| t.id.to_string().starts_with(&prefix));
        match (hits.next(), hits.next()) {
            (Some(t), None) => Some(t.id),
            _ => None,
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notices.push(Notice {
            kind,
            message: message.into(),
        });
    }

    fn fail(&mut self, action: &str, err: ClientError) {
        warn!(error = %err, action, "request failed");
        self.notify(NoticeKind::Error, format!("{action}: {err}"));
    }

    /// Replaces the list with the server's. Returns false (and keeps the old list) on error.
    pub async fn refresh(&mut self, api: &ApiClient) -> bool {
        match api.list_tasks().await {
            Ok(tasks) => {
                self.tasks = tasks;
                true
            }
            Err(e) => {
                self.fail("Could not load tasks", e);
                false
            }
        }
    }

    /// Submits the modal: creates when adding, updates when editing. Ignored when no modal
    /// is open. The exclusive borrow keeps a second save from starting while one is in
    /// flight. On success the modal closes and the list is refetched; on failure the modal
    /// stays open.
    pub async fn save(&mut self, api: &ApiClient, fields: TaskFields) -> bool {
        let mode = self.modal;
        if mode == Modal::Closed {
            return false;
        }

        let result = {
            let _loading = LoadingGuard::set(&mut self.loading);
            match mode {
                Modal::Editing(id) => api.update_task(id, &fields).await,
                _ => api.create_task(&fields).await,
            }
        };

        match result {
            Ok(_) => {
                self.modal = Modal::Closed;
                self.notify(NoticeKind::Success, "Task saved");
                self.refresh(api).await;
                true
            }
            Err(e) => {
                self.fail("Error saving task", e);
                false
            }
        }
    }

    pub async fn toggle(&mut self, api: &ApiClient, id: Uuid) -> bool {
        match api.toggle_task(id).await {
            Ok(task) => {
                let state = if task.completed { "completed" } else { "pending" };
                self.notify(NoticeKind::Success, format!("Task marked {state}"));
                self.refresh(api).await;
                true
            }
            Err(e) => {
                self.fail("Error updating task", e);
                false
            }
        }
    }

    pub async fn delete(&mut self, api: &ApiClient, id: Uuid) -> bool {
        match api.delete_task(id).await {
            Ok(()) => {
                self.notify(NoticeKind::Success, "Task deleted");
                self.refresh(api).await;
                true
            }
            Err(e) => {
                self.fail("Error deleting task", e);
                false
            }
        }
    }
}
