use crate::{domain::notification::NotificationPage, repository::errors::RepositoryError};

#[cfg_attr(test, mockall::automock)]
pub trait NotificationRepository: Send + Sync {
    async fn list(
        &self,
        user_id: &str,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<NotificationPage, RepositoryError>;
    async fn mark_as_read(&self, user_id: &str, id: &str) -> Result<(), RepositoryError>;
    async fn mark_all_as_read(&self, user_id: &str) -> Result<(), RepositoryError>;
}
