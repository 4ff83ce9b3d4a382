mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use common::{TestServer, TestUser};

async fn board_with_member(server: &TestServer, owner: &TestUser, member: &TestUser, role: &str) -> Result<String> {
    let (status, body) = server.post("/boards", &owner.token, json!({"title": "BRD1"})).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let board_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, body) = server
        .post(
            &format!("/boards/{}/members", board_id),
            &owner.token,
            json!({"userId": member.id, "role": role}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    Ok(board_id)
}

async fn create_card(server: &TestServer, user: &TestUser, board_id: &str, body: Value) -> Result<Value> {
    let (status, body) = server.post(&format!("/boards/{}/cards", board_id), &user.token, body).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    Ok(body["data"].clone())
}

#[tokio::test]
async fn assigning_a_card_notifies_the_assignee() -> Result<()> {
    let server = TestServer::start().await?;
    let alice = server.signup("alice").await?;
    let bob = server.signup("bob").await?;
    let board_id = board_with_member(&server, &alice, &bob, "editor").await?;
    let card = create_card(&server, &alice, &board_id, json!({"title": "C1"})).await?;
    let card_id = card["id"].as_str().unwrap_or_default();

    let (status, body) = server
        .post(&format!("/cards/{}/assignees/{}", card_id, bob.id), &alice.token, json!({}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assignees"], json!([bob.id]));

    let (_, body) = server.get("/notifications", &bob.token).await?;
    let inbox = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["type"], "assigned");
    assert_eq!(inbox[0]["cardId"], card_id);
    assert_eq!(inbox[0]["boardId"], board_id.as_str());
    assert_eq!(inbox[0]["actorUserId"], alice.id.as_str());
    assert_eq!(inbox[0]["read"], false);

    server.post("/notifications/read-all", &bob.token, json!({})).await?;
    let (_, body) = server.get("/notifications/unread-count", &bob.token).await?;
    assert_eq!(body["data"]["count"], 0);
    Ok(())
}

#[tokio::test]
async fn unassign_notifies_and_repeat_is_quiet() -> Result<()> {
    let server = TestServer::start().await?;
    let alice = server.signup("alice").await?;
    let bob = server.signup("bob").await?;
    let board_id = board_with_member(&server, &alice, &bob, "viewer").await?;
    let card = create_card(&server, &alice, &board_id, json!({"title": "C1"})).await?;
    let path = format!("/cards/{}/assignees/{}", card["id"].as_str().unwrap_or_default(), bob.id);

    server.post(&path, &alice.token, json!({})).await?;
    server.post(&path, &alice.token, json!({})).await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    server.delete(&path, &alice.token).await?;
    server.delete(&path, &alice.token).await?;

    let (_, body) = server.get("/notifications", &bob.token).await?;
    let kinds: Vec<Value> = body["data"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|n| n["type"].clone())
        .collect();
    assert_eq!(kinds, vec![json!("unassigned"), json!("assigned")]);
    Ok(())
}

#[tokio::test]
async fn assignee_must_be_a_board_member() -> Result<()> {
    let server = TestServer::start().await?;
    let alice = server.signup("alice").await?;
    let bob = server.signup("bob").await?;
    let carol = server.signup("carol").await?;
    let board_id = board_with_member(&server, &alice, &bob, "editor").await?;
    let card = create_card(&server, &alice, &board_id, json!({"title": "C1"})).await?;

    let (status, _) = server
        .post(
            &format!("/cards/{}/assignees/{}", card["id"].as_str().unwrap_or_default(), carol.id),
            &alice.token,
            json!({}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn board_capabilities_follow_roles() -> Result<()> {
    let server = TestServer::start().await?;
    let alice = server.signup("alice").await?;
    let bob = server.signup("bob").await?;
    let carol = server.signup("carol").await?;
    let board_id = board_with_member(&server, &alice, &bob, "viewer").await?;

    // Viewer can read but not write
    let (status, _) = server.get(&format!("/boards/{}/cards", board_id), &bob.token).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server
        .post(&format!("/boards/{}/cards", board_id), &bob.token, json!({"title": "nope"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Non-members see nothing
    let (status, _) = server.get(&format!("/boards/{}", board_id), &carol.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = server.get("/boards", &carol.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    // Only admins delete boards
    let (status, _) = server.delete(&format!("/boards/{}", board_id), &bob.token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = server.delete(&format!("/boards/{}", board_id), &alice.token).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn last_admin_cannot_leave() -> Result<()> {
    let server = TestServer::start().await?;
    let alice = server.signup("alice").await?;
    let bob = server.signup("bob").await?;
    let board_id = board_with_member(&server, &alice, &bob, "editor").await?;

    let (status, _) = server
        .delete(&format!("/boards/{}/members/{}", board_id, alice.id), &alice.token)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .delete(&format!("/boards/{}/members/{}", board_id, bob.id), &alice.token)
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn mentions_notify_board_members_once() -> Result<()> {
    let server = TestServer::start().await?;
    let alice = server.signup("alice").await?;
    let bob = server.signup("bob").await?;
    let carol = server.signup("carol").await?;
    let board_id = board_with_member(&server, &alice, &bob, "commenter").await?;

    let card = create_card(
        &server,
        &alice,
        &board_id,
        json!({"title": "Review", "description": "@bob and @carol please look, @alice too"}),
    )
    .await?;

    // Patch keeping the same mention does not re-notify
    let (status, _) = server
        .call(
            Method::PATCH,
            &format!("/cards/{}", card["id"].as_str().unwrap_or_default()),
            Some(&alice.token),
            Some(json!({"description": "@bob still on it", "properties": {"status": "doing"}})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server.get("/notifications", &bob.token).await?;
    let inbox = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["type"], "mentioned");

    // Carol is not a member, Alice is the actor
    for user in [&carol, &alice] {
        let (_, body) = server.get("/notifications", &user.token).await?;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    }
    Ok(())
}
