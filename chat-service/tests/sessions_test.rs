mod common;

use common::{TestApp, OTHER_USER_ID, TEST_USER_ID};
use mongodb::bson::doc;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn start_conversation(app: &TestApp, uid: &str, message: &str) -> String {
    let body: Value = app
        .post_chat(uid, json!({ "message": message }))
        .await
        .json()
        .await
        .unwrap();
    body["conversationId"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore = "requires MongoDB at localhost:27017"]
async fn listing_shows_only_own_sessions() {
    let app = TestApp::spawn().await;
    app.upstreams
        .router_replies(json!({ "intent": "chat", "response": "Sure." }))
        .await;

    let mine = start_conversation(&app, TEST_USER_ID, "plan a picnic").await;
    start_conversation(&app, OTHER_USER_ID, "not yours").await;

    let response = app.get_as(TEST_USER_ID, "/sessions").await;

    assert_eq!(response.status(), StatusCode::OK);
    let sessions: Vec<Value> = response.json().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["conversationId"], mine);
    assert_eq!(sessions[0]["title"], "plan a picnic");
    assert_eq!(sessions[0]["messageCount"], 2);
    assert!(sessions[0]["createdAt"].is_string());
    assert!(sessions[0]["updatedAt"].is_string());

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires MongoDB at localhost:27017"]
async fn listing_is_empty_for_new_user() {
    let app = TestApp::spawn().await;

    let response = app.get_as(TEST_USER_ID, "/sessions").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().await.unwrap(), json!([]));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires MongoDB at localhost:27017"]
async fn long_first_message_is_truncated_in_title() {
    let app = TestApp::spawn().await;
    app.upstreams
        .router_replies(json!({ "intent": "chat", "response": "ok" }))
        .await;

    let message = "x".repeat(80);
    start_conversation(&app, TEST_USER_ID, &message).await;

    let sessions: Vec<Value> = app
        .get_as(TEST_USER_ID, "/sessions")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(sessions[0]["title"], format!("{}...", "x".repeat(50)));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires MongoDB at localhost:27017"]
async fn most_recently_updated_session_is_listed_first() {
    let app = TestApp::spawn().await;
    app.upstreams
        .router_replies(json!({ "intent": "chat", "response": "ok" }))
        .await;

    let older = start_conversation(&app, TEST_USER_ID, "older").await;
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let newer = start_conversation(&app, TEST_USER_ID, "newer").await;

    let sessions: Vec<Value> = app
        .get_as(TEST_USER_ID, "/sessions")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(sessions[0]["conversationId"], newer);
    assert_eq!(sessions[1]["conversationId"], older);

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    app.post_chat(
        TEST_USER_ID,
        json!({ "message": "bump", "conversationId": older }),
    )
    .await;

    let sessions: Vec<Value> = app
        .get_as(TEST_USER_ID, "/sessions")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(sessions[0]["conversationId"], older);
    assert_eq!(sessions[0]["messageCount"], 4);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires MongoDB at localhost:27017"]
async fn session_history_is_returned_in_order() {
    let app = TestApp::spawn().await;
    app.upstreams
        .router_replies(json!({ "intent": "chat", "response": "Hello!" }))
        .await;

    let conversation_id = start_conversation(&app, TEST_USER_ID, "hi").await;
    app.post_chat(
        TEST_USER_ID,
        json!({ "message": "again", "conversationId": conversation_id }),
    )
    .await;

    let response = app
        .get_as(TEST_USER_ID, &format!("/sessions/{}", conversation_id))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["conversationId"], conversation_id);
    assert_eq!(
        body["messages"],
        json!([
            { "role": "user", "type": "text", "content": "hi" },
            { "role": "assistant", "type": "text", "content": "Hello!" },
            { "role": "user", "type": "text", "content": "again" },
            { "role": "assistant", "type": "text", "content": "Hello!" }
        ])
    );

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires MongoDB at localhost:27017"]
async fn foreign_or_missing_session_is_not_found() {
    let app = TestApp::spawn().await;
    app.upstreams
        .router_replies(json!({ "intent": "chat", "response": "ok" }))
        .await;

    let theirs = start_conversation(&app, OTHER_USER_ID, "private").await;

    for conversation_id in [theirs.as_str(), "conv_missing"] {
        let response = app
            .get_as(TEST_USER_ID, &format!("/sessions/{}", conversation_id))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Conversation not found or access denied");
    }

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires MongoDB at localhost:27017"]
async fn delete_removes_conversation_and_messages() {
    let app = TestApp::spawn().await;
    app.upstreams
        .router_replies(json!({ "intent": "chat", "response": "ok" }))
        .await;

    let conversation_id = start_conversation(&app, TEST_USER_ID, "short-lived").await;
    let path = format!("/sessions/{}", conversation_id);

    let response = app.delete_as(TEST_USER_ID, &path).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get_as(TEST_USER_ID, &path).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let remaining = app
        .db
        .messages()
        .count_documents(doc! { "conversation_id": &conversation_id }, None)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let response = app.delete_as(TEST_USER_ID, &path).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires MongoDB at localhost:27017"]
async fn deleting_foreign_session_leaves_it_intact() {
    let app = TestApp::spawn().await;
    app.upstreams
        .router_replies(json!({ "intent": "chat", "response": "ok" }))
        .await;

    let theirs = start_conversation(&app, OTHER_USER_ID, "keep me").await;

    let response = app
        .delete_as(TEST_USER_ID, &format!("/sessions/{}", theirs))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stored = app
        .db
        .messages()
        .count_documents(doc! { "conversation_id": &theirs }, None)
        .await
        .unwrap();
    assert_eq!(stored, 2);

    let response = app
        .get_as(OTHER_USER_ID, &format!("/sessions/{}", theirs))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);

    app.cleanup().await;
}
