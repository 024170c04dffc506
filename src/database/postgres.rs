use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::models::{
    AuthProvider, AuthProviderType, Comment, NewAuthProvider, NewComment, NewPost, NewUser, Post,
    User,
};
use super::store::{CommentFilter, DatabaseError, Page, PostFilter, Store};
use crate::config::DatabaseConfig;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id          UUID PRIMARY KEY,
        username    TEXT NOT NULL DEFAULT '',
        email       TEXT NOT NULL,
        avatar_url  TEXT NOT NULL DEFAULT '',
        user_role   TEXT NOT NULL DEFAULT 'user',
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        deleted_at  TIMESTAMPTZ
    )"#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_live_idx ON users (email) WHERE deleted_at IS NULL",
    r#"CREATE TABLE IF NOT EXISTS auth_providers (
        id                  UUID PRIMARY KEY,
        user_id             UUID NOT NULL REFERENCES users (id),
        provider_uid        TEXT NOT NULL,
        auth_provider_type  TEXT NOT NULL,
        refresh_token       TEXT NOT NULL DEFAULT '',
        created_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
        deleted_at          TIMESTAMPTZ
    )"#,
    "CREATE INDEX IF NOT EXISTS auth_providers_lookup_idx ON auth_providers (user_id, provider_uid, auth_provider_type)",
    r#"CREATE TABLE IF NOT EXISTS posts (
        id          UUID PRIMARY KEY,
        user_id     UUID NOT NULL,
        title       TEXT NOT NULL,
        body        TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        deleted_at  TIMESTAMPTZ
    )"#,
    "CREATE INDEX IF NOT EXISTS posts_user_id_idx ON posts (user_id)",
    "CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at)",
    r#"CREATE TABLE IF NOT EXISTS comments (
        id          UUID PRIMARY KEY,
        post_id     UUID NOT NULL REFERENCES posts (id) ON UPDATE CASCADE ON DELETE CASCADE,
        user_id     UUID NOT NULL,
        name        TEXT NOT NULL,
        body        TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        deleted_at  TIMESTAMPTZ
    )"#,
    "CREATE INDEX IF NOT EXISTS comments_post_id_idx ON comments (post_id)",
    "CREATE INDEX IF NOT EXISTS comments_user_id_idx ON comments (user_id)",
];

const USER_COLUMNS: &str =
    "id, username, email, avatar_url, user_role, created_at, updated_at, deleted_at";
const PROVIDER_COLUMNS: &str = "id, user_id, provider_uid, auth_provider_type, refresh_token, created_at, updated_at, deleted_at";
const POST_COLUMNS: &str = "id, user_id, title, body, created_at, updated_at, deleted_at";
const COMMENT_COLUMNS: &str =
    "id, post_id, user_id, name, body, created_at, updated_at, deleted_at";

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!(max_connections = config.max_connections, "Created database pool");
        Ok(Self { pool })
    }

    /// Creates tables and indexes if they are missing
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!(statements = SCHEMA.len(), "Applied database schema");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn conflict_on_unique(err: sqlx::Error, what: &str) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DatabaseError::Conflict(what.to_string())
        }
        _ => DatabaseError::Sqlx(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: Page,
    ) -> Result<(Vec<Post>, i64), DatabaseError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR user_id = $1)",
        )
        .bind(filter.user_id)
        .fetch_one(&self.pool)
        .await?;

        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3"
        ))
        .bind(filter.user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((posts, total))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, DatabaseError> {
        let created = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (id, user_id, title, body) VALUES ($1, $2, $3, $4) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(post.user_id)
        .bind(&post.title)
        .bind(&post.body)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Option<Post>, DatabaseError> {
        let updated = sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts SET title = $2, body = $3, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(title)
        .bind(body)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "UPDATE posts SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE comments SET deleted_at = now() WHERE post_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> Result<(Vec<Comment>, i64), DatabaseError> {
        const WHERE: &str = "deleted_at IS NULL \
            AND ($1::uuid IS NULL OR post_id = $1) \
            AND ($2::uuid IS NULL OR user_id = $2)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM comments WHERE {WHERE}"))
            .bind(filter.post_id)
            .bind(filter.user_id)
            .fetch_one(&self.pool)
            .await?;

        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE {WHERE} \
             ORDER BY created_at DESC, id LIMIT $3 OFFSET $4"
        ))
        .bind(filter.post_id)
        .bind(filter.user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((comments, total))
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, DatabaseError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, DatabaseError> {
        let created = sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments (id, post_id, user_id, name, body) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(&comment.name)
        .bind(&comment.body)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_comment(
        &self,
        id: Uuid,
        name: &str,
        body: &str,
    ) -> Result<Option<Comment>, DatabaseError> {
        let updated = sqlx::query_as::<_, Comment>(&format!(
            "UPDATE comments SET name = $2, body = $3, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(body)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let deleted = sqlx::query(
            "UPDATE comments SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(deleted > 0)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, avatar_url, user_role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.avatar_url)
        .bind(user.user_role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email already registered"))
    }

    async fn find_auth_provider(
        &self,
        user_id: Uuid,
        provider_uid: &str,
        kind: AuthProviderType,
    ) -> Result<Option<AuthProvider>, DatabaseError> {
        let link = sqlx::query_as::<_, AuthProvider>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM auth_providers \
             WHERE user_id = $1 AND provider_uid = $2 AND auth_provider_type = $3 \
             AND deleted_at IS NULL"
        ))
        .bind(user_id)
        .bind(provider_uid)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn create_auth_provider(
        &self,
        link: NewAuthProvider,
    ) -> Result<AuthProvider, DatabaseError> {
        let created = sqlx::query_as::<_, AuthProvider>(&format!(
            "INSERT INTO auth_providers (id, user_id, provider_uid, auth_provider_type, refresh_token) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PROVIDER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(link.user_id)
        .bind(&link.provider_uid)
        .bind(link.auth_provider_type.as_str())
        .bind(&link.refresh_token)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_auth_provider_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE auth_providers SET refresh_token = $2, updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, StorageBackend};

    #[tokio::test]
    async fn connect_requires_database_url() {
        let mut config = AppConfig::development().database;
        config.backend = StorageBackend::Postgres;
        config.url = None;
        let err = PgStore::connect(&config).await.err().unwrap();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[test]
    fn schema_statements_are_idempotent() {
        for statement in SCHEMA {
            assert!(
                statement.contains("IF NOT EXISTS"),
                "statement is not idempotent: {}",
                statement
            );
        }
    }
}
