use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::TaskFields,
    model::{parse_due_date, Priority, Task},
};
use crate::{error::AppError, store::TaskStore};

fn parse_priority(raw: &str) -> Result<Priority, AppError> {
    raw.parse().map_err(AppError::Validation)
}

fn parse_title(raw: String) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    Ok(title.to_string())
}

fn normalize_description(raw: String) -> Option<String> {
    let d = raw.trim();
    (!d.is_empty()).then(|| d.to_string())
}

pub async fn list_tasks(tasks: &dyn TaskStore, user_id: Uuid) -> Result<Vec<Task>, AppError> {
    Ok(tasks.list_tasks(user_id).await?)
}

pub async fn create_task(
    tasks: &dyn TaskStore,
    user_id: Uuid,
    fields: TaskFields,
) -> Result<Task, AppError> {
    let title = parse_title(fields.title.unwrap_or_default())?;
    let priority = fields
        .priority
        .as_deref()
        .ok_or_else(|| AppError::validation("Priority is required"))
        .and_then(parse_priority)?;
    let due_date = fields
        .due_date
        .as_deref()
        .ok_or_else(|| AppError::validation("Due date is required"))
        .and_then(|d| parse_due_date(d).map_err(AppError::Validation))?;

    let now = OffsetDateTime::now_utc();
    let task = Task {
        id: Uuid::new_v4(),
        owner: user_id,
        title,
        description: fields.description.flatten().and_then(normalize_description),
        priority,
        due_date,
        completed: fields.completed.unwrap_or(false),
        created_at: now,
        updated_at: now,
    };
    tasks.insert_task(&task).await?;
    info!(task_id = %task.id, user_id = %user_id, "task created");
    Ok(task)
}

/// Loads a task and checks the caller owns it.
async fn owned_task(tasks: &dyn TaskStore, user_id: Uuid, task_id: Uuid) -> Result<Task, AppError> {
    let task = tasks
        .find_task(task_id)
        .await?
        .ok_or(AppError::NotFound("Task"))?;
    if task.owner != user_id {
        warn!(task_id = %task_id, user_id = %user_id, "access to foreign task");
        return Err(AppError::Forbidden("Task"));
    }
    Ok(task)
}

async fn save(tasks: &dyn TaskStore, task: &Task) -> Result<(), AppError> {
    if !tasks.update_task(task).await? {
        // deleted between read and write
        return Err(AppError::NotFound("Task"));
    }
    Ok(())
}

pub async fn update_task(
    tasks: &dyn TaskStore,
    user_id: Uuid,
    task_id: Uuid,
    fields: TaskFields,
) -> Result<Task, AppError> {
    let mut task = owned_task(tasks, user_id, task_id).await?;

    if let Some(title) = fields.title {
        task.title = parse_title(title)?;
    }
    if let Some(description) = fields.description {
        task.description = description.and_then(normalize_description);
    }
    if let Some(priority) = fields.priority.as_deref() {
        task.priority = parse_priority(priority)?;
    }
    if let Some(due) = fields.due_date.as_deref() {
        task.due_date = parse_due_date(due).map_err(AppError::Validation)?;
    }
    if let Some(completed) = fields.completed {
        task.completed = completed;
    }
    task.updated_at = OffsetDateTime::now_utc();

    save(tasks, &task).await?;
    info!(task_id = %task.id, user_id = %user_id, "task updated");
    Ok(task)
}

pub async fn delete_task(tasks: &dyn TaskStore, user_id: Uuid, task_id: Uuid) -> Result<(), AppError> {
    owned_task(tasks, user_id, task_id).await?;
    if !tasks.delete_task(task_id, user_id).await? {
        return Err(AppError::NotFound("Task"));
    }
    info!(task_id = %task_id, user_id = %user_id, "task deleted");
    Ok(())
}

pub async fn toggle_complete(
    tasks: &dyn TaskStore,
    user_id: Uuid,
    task_id: Uuid,
) -> Result<Task, AppError> {
    let mut task = owned_task(tasks, user_id, task_id).await?;
    task.completed = !task.completed;
    task.updated_at = OffsetDateTime::now_utc();
    save(tasks, &task).await?;
    info!(task_id = %task.id, completed = task.completed, "task toggled");
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::MemoryStore, tasks::dto::TaskFields};
    use serde_json::json;

    fn fields(v: serde_json::Value) -> TaskFields {
        serde_json::from_value(v).unwrap()
    }

    fn milk() -> TaskFields {
        fields(json!({ "title": "Buy milk", "priority": "low", "dueDate": "2026-10-18" }))
    }

    #[tokio::test]
    async fn created_task_is_listed_only_for_its_owner() {
        let store = MemoryStore::new();
        let (ann, bob) = (Uuid::new_v4(), Uuid::new_v4());

        let task = create_task(&store, ann, milk()).await.unwrap();
        assert_eq!(task.created_at, task.updated_at);
        assert!(!task.completed);

        assert_eq!(list_tasks(&store, ann).await.unwrap(), vec![task]);
        assert!(list_tasks(&store, bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_validates_required_fields() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        for body in [
            json!({ "priority": "low", "dueDate": "2026-10-18" }),
            json!({ "title": "  ", "priority": "low", "dueDate": "2026-10-18" }),
            json!({ "title": "x", "dueDate": "2026-10-18" }),
            json!({ "title": "x", "priority": "urgent", "dueDate": "2026-10-18" }),
            json!({ "title": "x", "priority": "low" }),
            json!({ "title": "x", "priority": "low", "dueDate": "18/10/2026" }),
        ] {
            let err = create_task(&store, user, fields(body.clone())).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{body} should be rejected");
        }
        assert!(list_tasks(&store, user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_task_cannot_be_updated_or_deleted() {
        let store = MemoryStore::new();
        let (ann, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let task = create_task(&store, ann, milk()).await.unwrap();
        create_task(&store, bob, milk()).await.unwrap();

        let err = update_task(&store, bob, task.id, fields(json!({ "title": "mine now" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = delete_task(&store, bob, task.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = delete_task(&store, bob, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(list_tasks(&store, ann).await.unwrap()[0].title, "Buy milk");
    }

    #[tokio::test]
    async fn update_merges_present_fields() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let task = create_task(&store, user, milk()).await.unwrap();

        let updated = update_task(
            &store,
            user,
            task.id,
            fields(json!({ "priority": "HIGH", "description": "2 litres", "completed": 1 })),
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Buy milk");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.description.as_deref(), Some("2 litres"));
        assert!(updated.completed);
        assert!(updated.updated_at >= task.updated_at);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn null_description_clears_it() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut body = json!({ "title": "Buy milk", "priority": "low", "dueDate": "2026-10-18" });
        body["description"] = json!("2 litres");
        let task = create_task(&store, user, fields(body)).await.unwrap();
        assert_eq!(task.description.as_deref(), Some("2 litres"));

        let kept = update_task(&store, user, task.id, fields(json!({ "title": "Milk" })))
            .await
            .unwrap();
        assert_eq!(kept.description.as_deref(), Some("2 litres"));

        let cleared = update_task(&store, user, task.id, fields(json!({ "description": null })))
            .await
            .unwrap();
        assert_eq!(cleared.description, None);
    }

    #[tokio::test]
    async fn delete_removes_permanently() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let task = create_task(&store, user, milk()).await.unwrap();
        delete_task(&store, user, task.id).await.unwrap();
        assert!(list_tasks(&store, user).await.unwrap().is_empty());
        let err = delete_task(&store, user, task.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn toggling_twice_restores_original_state() {
        for (legacy, expected) in [(json!(true), true), (json!(1), true), (json!("yes"), true), (json!(false), false)] {
            let store = MemoryStore::new();
            let user = Uuid::new_v4();
            let mut body = json!({ "title": "t", "priority": "medium", "dueDate": "2026-10-18" });
            body["completed"] = legacy.clone();
            let task = create_task(&store, user, fields(body)).await.unwrap();
            assert_eq!(task.completed, expected, "{legacy}");

            let once = toggle_complete(&store, user, task.id).await.unwrap();
            assert_eq!(once.completed, !expected);
            let twice = toggle_complete(&store, user, task.id).await.unwrap();
            assert_eq!(twice.completed, expected);
        }
    }
}
