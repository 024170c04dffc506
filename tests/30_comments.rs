mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn comment_lifecycle_v2() -> Result<()> {
    let app = common::TestApp::new();
    let author = Uuid::new_v4();
    let token = app.token(author);
    let post_id = app.create_post("v2", &token, "discussed").await?;

    let res = app
        .call(
            Method::POST,
            "/api/v2/comments",
            Some(&token),
            Some(json!({ "postId": post_id, "name": "first", "body": "hello" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.text());
    let created = res.json()?;
    assert_eq!(created["message"], "successfully created comment");
    assert_eq!(created["comment"]["postId"], post_id);
    assert_eq!(created["comment"]["userId"], author.to_string());
    let uri = format!(
        "/api/v2/comments/{}",
        created["comment"]["id"].as_str().unwrap_or_default()
    );

    let res = app.get(&uri).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["message"], "successfully retrieved comment");

    let res = app
        .call(Method::PUT, &uri, Some(&token), Some(json!({ "name": "edited", "body": "changed" })))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let updated = res.json()?;
    assert_eq!(updated["comment"]["name"], "edited");
    assert_eq!(updated["message"], "successfully updated comment");

    let res = app.call(Method::DELETE, &uri, Some(&token), None).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.get(&uri).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn create_checks_the_post() -> Result<()> {
    let app = common::TestApp::new();
    let token = app.token(Uuid::new_v4());

    let res = app
        .call(
            Method::POST,
            "/api/v2/comments",
            Some(&token),
            Some(json!({ "postId": "12345", "name": "n", "body": "b" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()?["message"], "failed to parse uuids from body");

    let res = app
        .call(
            Method::POST,
            "/api/v2/comments",
            Some(&token),
            Some(json!({ "postId": Uuid::new_v4(), "name": "n", "body": "b" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()?["message"], "failed to find post with provided id");

    let res = app
        .call(Method::POST, "/api/v2/comments", Some(&token), Some(json!({ "name": "n" })))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body = res.json()?;
    assert_eq!(body["fieldErrors"]["postId"], "postId is required");
    assert_eq!(body["fieldErrors"]["body"], "body is required");
    Ok(())
}

#[tokio::test]
async fn only_author_may_touch_comment() -> Result<()> {
    let app = common::TestApp::new();
    let author = app.token(Uuid::new_v4());
    let stranger = app.token(Uuid::new_v4());
    let post_id = app.create_post("v1", &author, "open thread").await?;
    let comment_id = app.create_comment("v1", &author, &post_id, "mine").await?;
    let uri = format!("/api/v1/comments/{}", comment_id);

    let res = app
        .call(Method::PUT, &uri, Some(&stranger), Some(json!({ "name": "x", "body": "y" })))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.text(), "only author can change comment content\n");

    let res = app.call(Method::DELETE, &uri, Some(&stranger), None).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.text(), "only author can delete comment\n");

    let res = app.call(Method::DELETE, &uri, Some(&author), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["message"], "successfully deleted comment");
    Ok(())
}

#[tokio::test]
async fn list_filters_by_post_and_author() -> Result<()> {
    let app = common::TestApp::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let alice_token = app.token(alice);
    let bob_token = app.token(bob);

    let first = app.create_post("v2", &alice_token, "first").await?;
    let second = app.create_post("v2", &alice_token, "second").await?;
    app.create_comment("v2", &alice_token, &first, "a1").await?;
    app.create_comment("v2", &bob_token, &first, "b1").await?;
    app.create_comment("v2", &bob_token, &second, "b2").await?;

    let res = app.get(&format!("/api/v2/comments?postId={}", first)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["total"], 2);

    let res = app.get(&format!("/api/v2/comments?userId={}", bob)).await?;
    assert_eq!(res.json()?["total"], 2);

    let res = app
        .get(&format!("/api/v2/comments?postId={}&userId={}", first, bob))
        .await?;
    let page = res.json()?;
    assert_eq!(page["total"], 1);
    assert_eq!(page["comments"][0]["name"], "b1");

    let res = app.get("/api/v2/comments").await?;
    let page = res.json()?;
    assert_eq!(page["total"], 3);
    assert_eq!(page["comments"][0]["name"], "b2");
    assert_eq!(page["message"], "successfully retrieved comments");
    Ok(())
}

#[tokio::test]
async fn deleting_post_hides_its_comments() -> Result<()> {
    let app = common::TestApp::new();
    let token = app.token(Uuid::new_v4());
    let post_id = app.create_post("v2", &token, "temporary").await?;
    let comment_id = app.create_comment("v2", &token, &post_id, "orphan").await?;

    let res = app
        .call(Method::DELETE, &format!("/api/v2/posts/{}", post_id), Some(&token), None)
        .await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.get(&format!("/api/v2/comments/{}", comment_id)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get(&format!("/api/v2/comments?postId={}", post_id)).await?;
    assert_eq!(res.json()?["total"], 0);
    Ok(())
}
