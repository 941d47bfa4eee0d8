mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use common::{Session, TestServer, PASSWORD};

async fn open_topic(server: &TestServer, author: &Session, title: &str) -> Result<Value> {
    let (status, body) = server
        .call(
            Method::POST,
            "/discussionBoard/member/topics",
            Some(&author.access),
            Some(json!({ "title": title, "body": "Opening post", "category": "general" })),
        )
        .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "create topic failed with {}: {}", status, body);
    Ok(body)
}

#[tokio::test]
async fn topic_lifecycle_and_ownership() -> Result<()> {
    let server = TestServer::spawn().await?;
    let author = server.join("member", "author").await?;
    let other = server.join("member", "other").await?;
    let topic = open_topic(&server, &author, "Welcome thread").await?;
    let topic_path = format!("/discussionBoard/member/topics/{}", topic["id"].as_str().unwrap_or_default());

    let (status, _) = server
        .call(Method::PUT, &topic_path, Some(&other.access), Some(json!({ "title": "Hijacked" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .call(Method::PUT, &topic_path, Some(&author.access), Some(json!({ "title": "Welcome, everyone" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Welcome, everyone");

    let (status, body) = server
        .call(Method::PATCH, "/discussionBoard/topics", None, Some(json!({ "search": "everyone" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["records"], 1);

    let (status, body) = server.call(Method::DELETE, &topic_path, Some(&author.access), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = server
        .call(Method::GET, &format!("/discussionBoard/topics/{}", topic["id"].as_str().unwrap_or_default()), None, None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn closed_topics_refuse_replies() -> Result<()> {
    let server = TestServer::spawn().await?;
    let author = server.join("member", "author").await?;
    let moderator = server.join("moderator", "mod").await?;
    let topic = open_topic(&server, &author, "Short lived").await?;
    let id = topic["id"].as_str().unwrap_or_default().to_string();
    let replies = format!("/discussionBoard/member/topics/{}/replies", id);

    let (status, reply) = server
        .call(Method::POST, &replies, Some(&author.access), Some(json!({ "body": "First!" })))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    // members cannot change status
    let status_path = format!("/discussionBoard/moderator/topics/{}/status", id);
    let (status, _) = server
        .call(Method::PUT, &status_path, Some(&author.access), Some(json!({ "status": "closed" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .call(Method::PUT, &status_path, Some(&moderator.access), Some(json!({ "status": "closed" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "closed");

    let (status, _) = server
        .call(
            Method::POST,
            &replies,
            Some(&author.access),
            Some(json!({ "body": "Too late", "parent_id": reply["id"] })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .call(Method::PATCH, &format!("/discussionBoard/topics/{}/replies", id), None, Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["records"], 1);
    Ok(())
}

#[tokio::test]
async fn report_moderate_appeal_and_restore() -> Result<()> {
    let server = TestServer::spawn().await?;
    let author = server.join("member", "author").await?;
    let reporter = server.join("member", "reporter").await?;
    let moderator = server.join("moderator", "mod").await?;
    let topic = open_topic(&server, &author, "Questionable").await?;

    let (status, report) = server
        .call(
            Method::POST,
            "/discussionBoard/member/reports",
            Some(&reporter.access),
            Some(json!({ "target_type": "topic", "target_id": topic["id"], "reason": "off topic" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["status"], "pending");

    let (status, action) = server
        .call(
            Method::POST,
            "/discussionBoard/moderator/moderationActions",
            Some(&moderator.access),
            Some(json!({
                "report_id": report["id"],
                "target_type": "topic",
                "target_id": topic["id"],
                "action": "remove_content",
                "reason": "off topic",
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{}", action);

    let topic_url = format!("/discussionBoard/topics/{}", topic["id"].as_str().unwrap_or_default());
    let (status, _) = server.call(Method::GET, &topic_url, None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let report_url = format!("/discussionBoard/moderator/reports/{}", report["id"].as_str().unwrap_or_default());
    let (_, body) = server.call(Method::GET, &report_url, Some(&moderator.access), None).await?;
    assert_eq!(body["status"], "resolved");

    // only the affected member may appeal, once at a time
    let appeal_body = json!({ "action_id": action["id"], "body": "It was on topic" });
    let (status, _) = server
        .call(Method::POST, "/discussionBoard/member/appeals", Some(&reporter.access), Some(appeal_body.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, appeal) = server
        .call(Method::POST, "/discussionBoard/member/appeals", Some(&author.access), Some(appeal_body.clone()))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = server
        .call(Method::POST, "/discussionBoard/member/appeals", Some(&author.access), Some(appeal_body))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = server
        .call(Method::PATCH, "/discussionBoard/member/appeals", Some(&author.access), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["records"], 1);

    let decide_url = format!("/discussionBoard/moderator/appeals/{}", appeal["id"].as_str().unwrap_or_default());
    let (status, body) = server
        .call(Method::PUT, &decide_url, Some(&moderator.access), Some(json!({ "status": "accepted" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (status, _) = server.call(Method::GET, &topic_url, None, None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .call(Method::PUT, &decide_url, Some(&moderator.access), Some(json!({ "status": "rejected" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn suspended_member_can_only_appeal() -> Result<()> {
    let server = TestServer::spawn().await?;
    let troll = server.join("member", "troll").await?;
    let admin = server.join("admin", "admin").await?;

    let (status, action) = server
        .call(
            Method::POST,
            "/discussionBoard/moderator/moderationActions",
            Some(&admin.access),
            Some(json!({
                "target_type": "member",
                "target_id": troll.id,
                "action": "suspend_member",
                "reason": "spam",
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let topic = json!({ "title": "Buy now", "body": "spam", "category": "ads" });
    let (status, _) = server
        .call(Method::POST, "/discussionBoard/member/topics", Some(&troll.access), Some(topic.clone()))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let login = json!({ "email": format!("{}@example.com", troll.username), "password": PASSWORD });
    let (status, _) = server.call(Method::POST, "/auth/member/login", None, Some(login)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // the token held at suspension still reaches the appeal routes
    let (status, appeal) = server
        .call(
            Method::POST,
            "/discussionBoard/member/appeals",
            Some(&troll.access),
            Some(json!({ "action_id": action["id"], "body": "I was advertising my own club" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = server
        .call(Method::PATCH, "/discussionBoard/member/appeals", Some(&troll.access), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["records"], 1);

    let decide_url = format!("/discussionBoard/moderator/appeals/{}", appeal["id"].as_str().unwrap_or_default());
    let (status, _) = server
        .call(Method::PUT, &decide_url, Some(&admin.access), Some(json!({ "status": "accepted" })))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .call(Method::POST, "/discussionBoard/member/topics", Some(&troll.access), Some(topic))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}
