mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::TestApp;

fn usernames(list: &Value) -> Vec<&str> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn follow_and_unfollow_status_codes() {
    let app = TestApp::new();
    let one = app.user("user1");
    let two = app.user("user2");
    let follow = format!("/follow-graph/{}/follow", two.id);
    let unfollow = format!("/follow-graph/{}/unfollow", two.id);

    let (status, body) = app.post(&follow, &one, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Followed successfully.");

    let (status, body) = app.post(&follow, &one, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "You are already following this user.");

    let (status, _) = app
        .post(&format!("/follow-graph/{}/follow", one.id), &one, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/follow-graph/9999/follow", &one, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("DELETE", &unfollow, Some(&one.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send("DELETE", &unfollow, Some(&one.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You were not following this user.");
}

#[tokio::test]
async fn following_requires_a_token() {
    let app = TestApp::new();
    let two = app.user("user2");

    let (status, _) = app
        .send("POST", &format!("/follow-graph/{}/follow", two.id), None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn lists_are_public_and_directional() {
    let app = TestApp::new();
    let one = app.user("user1");
    let two = app.user("user2");
    let three = app.user("user3");
    app.db().follow(one.id, three.id).unwrap();
    app.db().follow(two.id, three.id).unwrap();

    let (status, followers) = app
        .send("GET", &format!("/follow-graph/{}/followers", three.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(usernames(&followers), ["user1", "user2"]);
    assert_eq!(followers[0]["email"], "user1@example.com");
    assert_eq!(followers[0]["id"], one.id);

    let (_, following) = app
        .send("GET", &format!("/follow-graph/{}/following", one.id), None, None)
        .await;
    assert_eq!(usernames(&following), ["user3"]);

    let (_, following) = app
        .send("GET", &format!("/follow-graph/{}/following", three.id), None, None)
        .await;
    assert!(following.as_array().unwrap().is_empty());
}
