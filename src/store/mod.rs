//! Persistence seam. Handlers and services only see these traits; `postgres` backs the
//! server binary and `memory` backs tests and local tooling.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{auth::repo_types::User, tasks::model::Task};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint (user email) rejected the write.
    #[error("duplicate key")]
    Duplicate,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Overwrites name, email and password hash of an existing user.
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self, owner: Uuid) -> Result<Vec<Task>, StoreError>;
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;
    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;
    /// Replaces the stored task matching `task.id` and `task.owner`. Returns false when no
    /// such row exists anymore.
    async fn update_task(&self, task: &Task) -> Result<bool, StoreError>;
    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<bool, StoreError>;
}
