use serde::Serialize;

use super::format::ResponseBody;
use crate::database::models::{Comment, Post, User};

#[derive(Debug, Clone, Serialize)]
pub struct PostsResponse {
    pub posts: Vec<Post>,
    pub total: i64,
    pub message: String,
}

impl ResponseBody for PostsResponse {
    const ROOT: &'static str = "PostsResponse";
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub post: Post,
    pub message: String,
}

impl ResponseBody for PostResponse {
    const ROOT: &'static str = "PostResponse";
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsResponse {
    pub comments: Vec<Comment>,
    pub total: i64,
    pub message: String,
}

impl ResponseBody for CommentsResponse {
    const ROOT: &'static str = "CommentsResponse";
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub comment: Comment,
    pub message: String,
}

impl ResponseBody for CommentResponse {
    const ROOT: &'static str = "CommentResponse";
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub message: String,
}

impl ResponseBody for TokenResponse {
    const ROOT: &'static str = "TokenResponse";
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub user: User,
    pub message: String,
}

impl ResponseBody for UserResponse {
    const ROOT: &'static str = "UserResponse";
}
