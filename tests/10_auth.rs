mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

use common::{TestServer, PASSWORD};

#[tokio::test]
async fn health_and_root_respond() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.call(Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");

    let (status, body) = server.call(Method::GET, "/", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Agora API");
    Ok(())
}

#[tokio::test]
async fn join_login_and_me() -> Result<()> {
    let server = TestServer::spawn().await?;
    let member = server.join("member", "alice").await?;

    let (status, body) = server.call(Method::GET, "/auth/member/me", Some(&member.access), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "member");
    assert!(body.get("password_hash").is_none(), "hash leaked: {}", body);

    let (status, body) = server
        .call(
            Method::POST,
            "/auth/member/login",
            None,
            Some(json!({ "email": "ALICE@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["token"]["access"].is_string());
    assert!(body["token"]["expired_at"].is_string());

    let (status, body) = server
        .call(
            Method::POST,
            "/auth/member/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn accounts_are_scoped_by_role() -> Result<()> {
    let server = TestServer::spawn().await?;
    let member = server.join("member", "bob").await?;

    // the same email may join again under a different role
    let seller = server.join("seller", "bob").await?;
    assert_ne!(member.id, seller.id);

    // but not twice under the same one
    let (status, _) = server
        .call(
            Method::POST,
            "/auth/member/join",
            None,
            Some(json!({ "username": "bob2", "email": "bob@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // a member token is not a seller token
    let (status, _) = server.call(Method::GET, "/auth/seller/me", Some(&member.access), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server.call(Method::GET, "/auth/member/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server.call(Method::GET, "/auth/member/me", Some("not-a-jwt"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_requires_a_refresh_token() -> Result<()> {
    let server = TestServer::spawn().await?;
    let user = server.join("user", "carol").await?;

    let (status, body) = server
        .call(Method::POST, "/auth/user/refresh", None, Some(json!({ "refresh": user.refresh })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["token"]["access"].is_string());

    let (status, _) = server
        .call(Method::POST, "/auth/user/refresh", None, Some(json!({ "refresh": user.access })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // the refresh token belongs to a user account
    let (status, _) = server
        .call(Method::POST, "/auth/member/refresh", None, Some(json!({ "refresh": user.refresh })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // access tokens are rejected where refresh is required and vice versa
    let (status, _) = server.call(Method::GET, "/auth/user/me", Some(&user.refresh), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn password_change_and_mfa() -> Result<()> {
    let server = TestServer::spawn().await?;
    let customer = server.join("customer", "dave").await?;

    let (status, body) = server
        .call(
            Method::PUT,
            "/auth/customer/password",
            Some(&customer.access),
            Some(json!({ "current_password": "nope-nope-nope", "new_password": "another-long-one" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = server
        .call(
            Method::PUT,
            "/auth/customer/password",
            Some(&customer.access),
            Some(json!({ "current_password": PASSWORD, "new_password": "another-long-one" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = server
        .call(
            Method::POST,
            "/auth/customer/login",
            None,
            Some(json!({ "email": "dave@example.com", "password": "another-long-one" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .call(Method::PUT, "/auth/customer/mfa", Some(&customer.access), Some(json!({ "enabled": true })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mfa_enabled"], true);
    Ok(())
}

#[tokio::test]
async fn admin_deactivation_locks_the_account_out() -> Result<()> {
    let server = TestServer::spawn().await?;
    let admin = server.join("admin", "root").await?;
    let member = server.join("member", "erin").await?;

    let (status, _) = server
        .call(Method::PATCH, "/admin/accounts", Some(&member.access), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .call(
            Method::PATCH,
            "/admin/accounts",
            Some(&admin.access),
            Some(json!({ "role": "member", "search": "eri" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["records"], 1);
    assert_eq!(body["data"][0]["id"], member.id.as_str());

    let (status, body) = server
        .call(
            Method::PUT,
            &format!("/admin/accounts/{}", member.id),
            Some(&admin.access),
            Some(json!({ "is_active": false })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    // the still-valid token no longer authorizes
    let (status, _) = server.call(Method::GET, "/auth/member/me", Some(&member.access), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .call(
            Method::POST,
            "/auth/member/login",
            None,
            Some(json!({ "email": "erin@example.com", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
