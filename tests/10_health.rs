mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;

#[tokio::test]
async fn health_endpoint_reports_storage() -> Result<()> {
    let app = common::TestApp::new();

    let res = app.get("/health").await?;

    assert_eq!(res.status, StatusCode::OK, "unexpected status: {}", res.status);
    let body = res.json()?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn health_degrades_when_storage_is_down() -> Result<()> {
    let app = common::TestApp::with_store(common::test_config(), Arc::new(common::UnavailableStore));

    let res = app.get("/health").await?;

    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    let body = res.json()?;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "unavailable");

    let res = app.get("/api/v2/posts").await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.json()?["message"], "failed to get posts");
    Ok(())
}

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let app = common::TestApp::new();

    let res = app.get("/").await?;

    assert_eq!(res.status, StatusCode::OK);
    let body = res.json()?;
    assert_eq!(body["name"], "blogrest");
    assert!(body["endpoints"]["v2_posts"].is_string(), "missing endpoints: {}", body);
    Ok(())
}

#[tokio::test]
async fn unknown_route_is_not_found() -> Result<()> {
    let app = common::TestApp::new();

    let res = app.get("/api/v3/posts").await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}
