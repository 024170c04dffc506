use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    AuthProvider, AuthProviderType, Comment, NewAuthProvider, NewComment, NewPost, NewUser, Post,
    User,
};
use super::store::{CommentFilter, DatabaseError, Page, PostFilter, Store};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    auth_providers: HashMap<Uuid, AuthProvider>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    clock: Option<DateTime<Utc>>,
}

impl Tables {
    // Strictly increasing so creation order is always recoverable
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }
}

/// In-process store with the same semantics as the Postgres backend
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(
    mut rows: Vec<&T>,
    page: Page,
    key: impl Fn(&T) -> (DateTime<Utc>, Uuid),
) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    rows.sort_by(|a, b| {
        let (a_at, a_id) = key(*a);
        let (b_at, b_id) = key(*b);
        b_at.cmp(&a_at).then(a_id.cmp(&b_id))
    });
    let page = rows
        .into_iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .cloned()
        .collect();
    (page, total)
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        page: Page,
    ) -> Result<(Vec<Post>, i64), DatabaseError> {
        let tables = self.tables.read().await;
        let rows = tables
            .posts
            .values()
            .filter(|p| p.deleted_at.is_none())
            .filter(|p| filter.user_id.map_or(true, |u| p.user_id == u))
            .collect();
        Ok(paginate(rows, page, |p: &Post| (p.created_at, p.id)))
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .get(&id)
            .filter(|p| p.deleted_at.is_none())
            .cloned())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let created = Post {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            title: post.title,
            body: post.body,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<Option<Post>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        Ok(tables
            .posts
            .get_mut(&id)
            .filter(|p| p.deleted_at.is_none())
            .map(|p| {
                p.title = title.to_string();
                p.body = body.to_string();
                p.updated_at = now;
                p.clone()
            }))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        match tables.posts.get_mut(&id) {
            Some(post) if post.deleted_at.is_none() => post.deleted_at = Some(now),
            _ => return Ok(false),
        }
        for comment in tables.comments.values_mut() {
            if comment.post_id == id && comment.deleted_at.is_none() {
                comment.deleted_at = Some(now);
            }
        }
        Ok(true)
    }

    async fn list_comments(
        &self,
        filter: &CommentFilter,
        page: Page,
    ) -> Result<(Vec<Comment>, i64), DatabaseError> {
        let tables = self.tables.read().await;
        let rows = tables
            .comments
            .values()
            .filter(|c| c.deleted_at.is_none())
            .filter(|c| filter.post_id.map_or(true, |p| c.post_id == p))
            .filter(|c| filter.user_id.map_or(true, |u| c.user_id == u))
            .collect();
        Ok(paginate(rows, page, |c: &Comment| (c.created_at, c.id)))
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .get(&id)
            .filter(|c| c.deleted_at.is_none())
            .cloned())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let created = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            name: comment.name,
            body: comment.body,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.comments.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_comment(
        &self,
        id: Uuid,
        name: &str,
        body: &str,
    ) -> Result<Option<Comment>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        Ok(tables
            .comments
            .get_mut(&id)
            .filter(|c| c.deleted_at.is_none())
            .map(|c| {
                c.name = name.to_string();
                c.body = body.to_string();
                c.updated_at = now;
                c.clone()
            }))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        match tables.comments.get_mut(&id) {
            Some(comment) if comment.deleted_at.is_none() => {
                comment.deleted_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .get(&id)
            .filter(|u| u.deleted_at.is_none())
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email == email)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email == user.email)
        {
            return Err(DatabaseError::Conflict("email already registered".to_string()));
        }
        let now = tables.tick();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            avatar_url: user.avatar_url,
            user_role: user.user_role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_auth_provider(
        &self,
        user_id: Uuid,
        provider_uid: &str,
        kind: AuthProviderType,
    ) -> Result<Option<AuthProvider>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .auth_providers
            .values()
            .find(|l| {
                l.deleted_at.is_none()
                    && l.user_id == user_id
                    && l.provider_uid == provider_uid
                    && l.auth_provider_type == kind
            })
            .cloned())
    }

    async fn create_auth_provider(
        &self,
        link: NewAuthProvider,
    ) -> Result<AuthProvider, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        let created = AuthProvider {
            id: Uuid::new_v4(),
            user_id: link.user_id,
            provider_uid: link.provider_uid,
            auth_provider_type: link.auth_provider_type,
            refresh_token: link.refresh_token,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.auth_providers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_auth_provider_token(
        &self,
        id: Uuid,
        token: &str,
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = tables.tick();
        if let Some(link) = tables
            .auth_providers
            .get_mut(&id)
            .filter(|l| l.deleted_at.is_none())
        {
            link.refresh_token = token.to_string();
            link.updated_at = now;
        }
        Ok(())
    }
}
