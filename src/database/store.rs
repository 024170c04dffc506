use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    AuthProvider, AuthProviderType, Comment, NewAuthProvider, NewComment, NewPost, NewUser, Post,
    User,
};

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Window into an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentFilter {
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// Persistence seam shared by the Postgres and in-memory backends.
///
/// Every read skips soft-deleted rows. Listings are ordered newest first
/// (`created_at` descending, then `id`) and return the total number of
/// matching rows alongside the requested page.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    // Posts
    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: Page,
    ) -> Result<(Vec<Post>, i64), DatabaseError>;
    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError>;
    async fn create_post(&self, post: NewPost) -> Result<Post, DatabaseError>;
    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Option<Post>, DatabaseError>;
    /// Soft-deletes the post and its comments. Returns false if no live post matched.
    async fn delete_post(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Comments
    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> Result<(Vec<Comment>, i64), DatabaseError>;
    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, DatabaseError>;
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, DatabaseError>;
    async fn update_comment(
        &self,
        id: Uuid,
        name: &str,
        body: &str,
    ) -> Result<Option<Comment>, DatabaseError>;
    async fn delete_comment(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // Users and provider links
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn find_auth_provider(
        &self,
        user_id: Uuid,
        provider_uid: &str,
        kind: AuthProviderType,
    ) -> Result<Option<AuthProvider>, DatabaseError>;
    async fn create_auth_provider(
        &self,
        link: NewAuthProvider,
    ) -> Result<AuthProvider, DatabaseError>;
    async fn update_auth_provider_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<(), DatabaseError>;
}
