mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

async fn seed(app: &common::TestApp, user: &str) -> Result<Value> {
    let (_, created) = app
        .send(Method::POST, "/habits/habit", Some(user), Some(json!({ "title": "Stretch" })))
        .await?;
    let (_, habit) = app
        .send(Method::GET, &format!("/habits/habit/{}", created["id"]), Some(user), None)
        .await?;
    Ok(habit["tracker"][0].clone())
}

#[tokio::test]
async fn owner_can_toggle_status() -> Result<()> {
    let app = common::TestApp::new().await?;
    let tracker = seed(&app, "user-1").await?;

    let (status, updated) = app
        .send(Method::PUT, &format!("/habits/tracker/{}/true", tracker["id"]), Some("user-1"), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], tracker["id"]);
    assert_eq!(updated["status"], 1);
    assert_eq!(updated["date"], tracker["date"]);

    let (_, habit) = app
        .send(Method::GET, &format!("/habits/habit/{}", tracker["habit_id"]), Some("user-1"), None)
        .await?;
    assert_eq!(habit["tracker"][0]["status"], 1);

    let (status, updated) = app
        .send(Method::PUT, &format!("/habits/tracker/{}/false", tracker["id"]), Some("user-1"), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], 0);
    Ok(())
}

#[tokio::test]
async fn other_user_gets_conflict_and_row_is_unchanged() -> Result<()> {
    let app = common::TestApp::new().await?;
    let tracker = seed(&app, "user-1").await?;

    let (status, error) = app
        .send(Method::PUT, &format!("/habits/tracker/{}/true", tracker["id"]), Some("user-2"), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["message"], "Wrong tracker id");

    let (_, habit) = app
        .send(Method::GET, &format!("/habits/habit/{}", tracker["habit_id"]), Some("user-1"), None)
        .await?;
    assert_eq!(habit["tracker"][0]["status"], 0);
    Ok(())
}

#[tokio::test]
async fn unknown_tracker_is_404() -> Result<()> {
    let app = common::TestApp::new().await?;
    let (status, _) = app
        .send(Method::PUT, "/habits/tracker/4242/true", Some("user-1"), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn non_boolean_status_is_rejected() -> Result<()> {
    let app = common::TestApp::new().await?;
    let tracker = seed(&app, "user-1").await?;
    let (status, _) = app
        .send(Method::PUT, &format!("/habits/tracker/{}/maybe", tracker["id"]), Some("user-1"), None)
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn non_integer_tracker_id_is_json_422() -> Result<()> {
    let app = common::TestApp::new().await?;
    let (status, error) = app
        .send(Method::PUT, "/habits/tracker/abc/true", Some("user-1"), None)
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "UNPROCESSABLE_ENTITY");
    Ok(())
}
