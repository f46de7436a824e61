use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{StoreError, TaskStore, UserStore};
use crate::{auth::repo_types::User, tasks::model::Task};

/// In-process store. Vectors keep insertion order, matching the natural order of the
/// database tables.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    tasks: RwLock<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> Result<usize, StoreError> {
        Ok(read(&self.users)?.len())
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read()
        .map_err(|_| StoreError::Other(anyhow::anyhow!("memory store lock poisoned")))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write()
        .map_err(|_| StoreError::Other(anyhow::anyhow!("memory store lock poisoned")))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = write(&self.users)?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(read(&self.users)?.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(read(&self.users)?.iter().find(|u| u.id == id).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = write(&self.users)?;
        if users.iter().any(|u| u.email == user.email && u.id != user.id) {
            return Err(StoreError::Duplicate);
        }
        if let Some(existing) = users.iter_mut().find(|u| u.id == user.id) {
            existing.name = user.name.clone();
            existing.email = user.email.clone();
            existing.password_hash = user.password_hash.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self, owner: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(read(&self.tasks)?
            .iter()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect())
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(read(&self.tasks)?.iter().find(|t| t.id == id).cloned())
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        write(&self.tasks)?.push(task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> Result<bool, StoreError> {
        let mut tasks = write(&self.tasks)?;
        match tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.owner == task.owner)
        {
            Some(slot) => {
                *slot = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError> {
        let mut tasks = write(&self.tasks)?;
        let before = tasks.len();
        tasks.retain(|t| !(t.id == id && t.owner == owner));
        Ok(tasks.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::model::Priority;
    use time::{macros::date, OffsetDateTime};

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: email.into(),
            password_hash: "hash".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn task(owner: Uuid, title: &str) -> Task {
        let now = OffsetDateTime::now_utc();
        Task {
            id: Uuid::new_v4(),
            owner,
            title: title.into(),
            description: None,
            priority: Priority::Low,
            due_date: date!(2026 - 01 - 01),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(&user("a@example.com")).await.unwrap();
        let err = store.insert_user(&user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn tasks_keep_insertion_order_per_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.insert_task(&task(owner, "first")).await.unwrap();
        store.insert_task(&task(other, "foreign")).await.unwrap();
        store.insert_task(&task(owner, "second")).await.unwrap();

        let titles: Vec<_> = store
            .list_tasks(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn poisoned_lock_is_an_error() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.users.write().unwrap();
            panic!("poison the user lock");
        })
        .join();
        assert!(matches!(store.user_count(), Err(StoreError::Other(_))));
    }

    #[tokio::test]
    async fn delete_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let t = task(owner, "mine");
        store.insert_task(&t).await.unwrap();

        assert!(!store.delete_task(t.id, Uuid::new_v4()).await.unwrap());
        assert!(store.delete_task(t.id, owner).await.unwrap());
        assert!(store.find_task(t.id).await.unwrap().is_none());
    }
}
