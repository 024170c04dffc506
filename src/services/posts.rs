use axum::http::HeaderMap;
use serde::Deserialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{parse_id, parse_optional_id, require_fields, resolve_page, storage_failure, ListParams};
use crate::api::decode_body;
use crate::api::responses::{PostResponse, PostsResponse};
use crate::api::MessageResponse;
use crate::auth::AccessToken;
use crate::database::models::{NewPost, Post};
use crate::database::PostFilter;
use crate::error::ApiError;
use crate::state::AppState;

/// Body accepted by create and update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl PostInput {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_fields(&[("title", self.title.as_str()), ("body", self.body.as_str())])
    }
}

fn parse_input(headers: &HeaderMap, body: &[u8]) -> Result<PostInput, ApiError> {
    info!("parsing request body");
    let input: PostInput = decode_body(headers, body).map_err(|e| {
        error!(error = %e, "failed to parse request body");
        ApiError::bad_request("failed to parse request body")
    })?;

    info!("validating request body");
    input.validate()?;
    Ok(input)
}

async fn load_post(state: &AppState, post_id: Uuid) -> Result<Post, ApiError> {
    info!(%post_id, "getting post from database");
    state
        .store
        .find_post(post_id)
        .await
        .map_err(|e| storage_failure(e, "failed to get post"))?
        .ok_or_else(|| {
            error!(%post_id, "failed to find post record in database with provided id");
            ApiError::not_found("failed to find record with provided id")
        })
}

#[instrument(name = "get_posts", skip_all)]
pub async fn list_posts(state: &AppState, params: &ListParams) -> Result<PostsResponse, ApiError> {
    info!("parsing request query params");
    let page = resolve_page(params, &state.config.api)?;
    let filter = PostFilter {
        user_id: parse_optional_id(params.user_id.as_deref())?,
    };

    info!(limit = page.limit, offset = page.offset, "getting posts from database");
    let (posts, total) = state
        .store
        .list_posts(&filter, page)
        .await
        .map_err(|e| storage_failure(e, "failed to get posts"))?;

    info!(total, returned = posts.len(), "successfully retrieved posts");
    Ok(PostsResponse {
        posts,
        total,
        message: "successfully retrieved posts".to_string(),
    })
}

#[instrument(name = "get_post", skip(state))]
pub async fn get_post(state: &AppState, id: &str) -> Result<PostResponse, ApiError> {
    let post = load_post(state, parse_id(id)?).await?;

    info!("successfully retrieved post");
    Ok(PostResponse {
        post,
        message: "successfully retrieved post".to_string(),
    })
}

#[instrument(name = "create_post", skip_all, fields(user_id = %token.user_id))]
pub async fn create_post(
    state: &AppState,
    token: &AccessToken,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<PostResponse, ApiError> {
    let input = parse_input(headers, body)?;

    info!("saving post to database");
    let post = state
        .store
        .create_post(NewPost {
            user_id: token.user_id,
            title: input.title,
            body: input.body,
        })
        .await
        .map_err(|e| storage_failure(e, "failed to create post"))?;

    info!(post_id = %post.id, "successfully created post");
    Ok(PostResponse {
        post,
        message: "successfully created post".to_string(),
    })
}

#[instrument(name = "update_post", skip(state, token, headers, body), fields(user_id = %token.user_id))]
pub async fn update_post(
    state: &AppState,
    token: &AccessToken,
    id: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<PostResponse, ApiError> {
    let post_id = parse_id(id)?;
    let input = parse_input(headers, body)?;
    let post = load_post(state, post_id).await?;

    info!("checking if user is author of post");
    if post.user_id != token.user_id {
        error!(author = %post.user_id, "user is not author of current post");
        return Err(ApiError::forbidden("only author can change post content"));
    }

    info!("updating post in database");
    let post = state
        .store
        .update_post(post.id, &input.title, &input.body)
        .await
        .map_err(|e| storage_failure(e, "failed to update post"))?
        .ok_or_else(|| ApiError::not_found("failed to find record with provided id"))?;

    info!("successfully updated post");
    Ok(PostResponse {
        post,
        message: "successfully updated post".to_string(),
    })
}

#[instrument(name = "delete_post", skip(state, token), fields(user_id = %token.user_id))]
pub async fn delete_post(
    state: &AppState,
    token: &AccessToken,
    id: &str,
) -> Result<MessageResponse, ApiError> {
    let post = load_post(state, parse_id(id)?).await?;

    info!("checking if user is author of post");
    if post.user_id != token.user_id {
        error!(author = %post.user_id, "user is not author of current post");
        return Err(ApiError::forbidden("only author can delete post"));
    }

    info!("deleting post from database");
    let deleted = state
        .store
        .delete_post(post.id)
        .await
        .map_err(|e| storage_failure(e, "failed to delete post"))?;
    if !deleted {
        return Err(ApiError::not_found("failed to find record with provided id"));
    }

    info!("successfully deleted post");
    Ok(MessageResponse::new("successfully deleted post"))
}
