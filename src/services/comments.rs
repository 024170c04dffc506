use axum::http::HeaderMap;
use serde::Deserialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{parse_id, parse_optional_id, require_fields, resolve_page, storage_failure, ListParams};
use crate::api::decode_body;
use crate::api::responses::{CommentResponse, CommentsResponse};
use crate::api::MessageResponse;
use crate::auth::AccessToken;
use crate::database::models::{Comment, NewComment};
use crate::database::CommentFilter;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCommentInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
}

fn parse_body<T: serde::de::DeserializeOwned>(headers: &HeaderMap, body: &[u8]) -> Result<T, ApiError> {
    info!("parsing request body");
    decode_body(headers, body).map_err(|e| {
        error!(error = %e, "failed to parse request body");
        ApiError::bad_request("failed to parse request body")
    })
}

async fn load_comment(state: &AppState, comment_id: Uuid) -> Result<Comment, ApiError> {
    info!(%comment_id, "getting comment from database");
    state
        .store
        .find_comment(comment_id)
        .await
        .map_err(|e| storage_failure(e, "failed to get comment"))?
        .ok_or_else(|| {
            error!(%comment_id, "failed to find comment record in database with provided id");
            ApiError::not_found("failed to find record with provided id")
        })
}

#[instrument(name = "get_comments", skip_all)]
pub async fn list_comments(
    state: &AppState,
    params: &ListParams,
) -> Result<CommentsResponse, ApiError> {
    info!("parsing request query params");
    let page = resolve_page(params, &state.config.api)?;
    let filter = CommentFilter {
        post_id: parse_optional_id(params.post_id.as_deref())?,
        user_id: parse_optional_id(params.user_id.as_deref())?,
    };

    info!(limit = page.limit, offset = page.offset, "getting comments from database");
    let (comments, total) = state
        .store
        .list_comments(&filter, page)
        .await
        .map_err(|e| storage_failure(e, "failed to get comments"))?;

    info!(total, returned = comments.len(), "successfully retrieved comments");
    Ok(CommentsResponse {
        comments,
        total,
        message: "successfully retrieved comments".to_string(),
    })
}

#[instrument(name = "get_comment", skip(state))]
pub async fn get_comment(state: &AppState, id: &str) -> Result<CommentResponse, ApiError> {
    let comment = load_comment(state, parse_id(id)?).await?;

    info!("successfully retrieved comment");
    Ok(CommentResponse {
        comment,
        message: "successfully retrieved comment".to_string(),
    })
}

#[instrument(name = "create_comment", skip_all, fields(user_id = %token.user_id))]
pub async fn create_comment(
    state: &AppState,
    token: &AccessToken,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<CommentResponse, ApiError> {
    let input: CreateCommentInput = parse_body(headers, body)?;

    info!("validating request body");
    require_fields(&[
        ("postId", input.post_id.as_str()),
        ("name", input.name.as_str()),
        ("body", input.body.as_str()),
    ])?;

    info!("parsing uuids from body");
    let post_id = Uuid::parse_str(input.post_id.trim()).map_err(|e| {
        error!(error = %e, "failed to parse uuids from body");
        ApiError::bad_request("failed to parse uuids from body")
    })?;

    info!(%post_id, "getting post from database");
    state
        .store
        .find_post(post_id)
        .await
        .map_err(|e| storage_failure(e, "failed to save comment"))?
        .ok_or_else(|| {
            error!(%post_id, "comment references a missing post");
            ApiError::not_found("failed to find post with provided id")
        })?;

    info!("saving comment to database");
    let comment = state
        .store
        .create_comment(NewComment {
            post_id,
            user_id: token.user_id,
            name: input.name,
            body: input.body,
        })
        .await
        .map_err(|e| storage_failure(e, "failed to save comment"))?;

    info!(comment_id = %comment.id, "successfully created comment");
    Ok(CommentResponse {
        comment,
        message: "successfully created comment".to_string(),
    })
}

#[instrument(name = "update_comment", skip(state, token, headers, body), fields(user_id = %token.user_id))]
pub async fn update_comment(
    state: &AppState,
    token: &AccessToken,
    id: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<CommentResponse, ApiError> {
    let comment_id = parse_id(id)?;
    let input: UpdateCommentInput = parse_body(headers, body)?;

    info!("validating request body");
    require_fields(&[("name", input.name.as_str()), ("body", input.body.as_str())])?;

    let comment = load_comment(state, comment_id).await?;

    info!("checking if user is author of comment");
    if comment.user_id != token.user_id {
        error!(author = %comment.user_id, "user is not author of current comment");
        return Err(ApiError::forbidden("only author can change comment content"));
    }

    info!("updating comment in database");
    let comment = state
        .store
        .update_comment(comment.id, &input.name, &input.body)
        .await
        .map_err(|e| storage_failure(e, "failed to update comment"))?
        .ok_or_else(|| ApiError::not_found("failed to find record with provided id"))?;

    info!("successfully updated comment");
    Ok(CommentResponse {
        comment,
        message: "successfully updated comment".to_string(),
    })
}

#[instrument(name = "delete_comment", skip(state, token), fields(user_id = %token.user_id))]
pub async fn delete_comment(
    state: &AppState,
    token: &AccessToken,
    id: &str,
) -> Result<MessageResponse, ApiError> {
    let comment = load_comment(state, parse_id(id)?).await?;

    info!("checking if user is author of comment");
    if comment.user_id != token.user_id {
        error!(author = %comment.user_id, "user is not author of current comment");
        return Err(ApiError::forbidden("only author can delete comment"));
    }

    info!("deleting comment from database");
    let deleted = state
        .store
        .delete_comment(comment.id)
        .await
        .map_err(|e| storage_failure(e, "failed to delete comment"))?;
    if !deleted {
        return Err(ApiError::not_found("failed to find record with provided id"));
    }

    info!("successfully deleted comment");
    Ok(MessageResponse::new("successfully deleted comment"))
}
