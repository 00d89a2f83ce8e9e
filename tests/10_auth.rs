mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};
use serde_json::json;
use std::sync::atomic::Ordering;

use common::PASSWORD;

#[tokio::test]
async fn health_and_root_respond() -> Result<()> {
    let server = common::spawn().await?;

    let (status, body) = server.send(server.client.get(server.url("/health"))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");

    let res = server.client.get(server.url("/")).send().await?;
    assert_eq!(res.headers().get("x-content-type-options").map(|v| v.as_bytes()), Some(&b"nosniff"[..]));
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert!(body["data"]["endpoints"].is_object(), "missing endpoints: {}", body);
    Ok(())
}

#[tokio::test]
async fn register_sets_cookie_and_me_returns_user() -> Result<()> {
    let server = common::spawn().await?;

    let res = server
        .client
        .post(server.url("/api/v1/auth/register"))
        .json(&json!({ "name": "John Doe", "email": "John@Gmail.com", "password": PASSWORD, "role": "publisher" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_default();
    assert!(cookie.starts_with("token=") && cookie.contains("HttpOnly"), "cookie: {}", cookie);
    let token = common::token_of(res).await?;

    let (status, body) = server.send(server.client.get(server.url("/api/v1/auth/me")).bearer_auth(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "john@gmail.com");
    assert_eq!(body["data"]["role"], "publisher");
    assert!(body["data"].get("passwordHash").is_none(), "hash leaked: {}", body);

    // The cookie alone authenticates too
    let (status, _) = server
        .send(server.client.get(server.url("/api/v1/auth/me")).header(header::COOKIE, format!("token={}", token)))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn register_rejects_admin_role_and_duplicate_email() -> Result<()> {
    let server = common::spawn().await?;

    let (status, body) = server
        .send(server.client.post(server.url("/api/v1/auth/register")).json(&json!({
            "name": "Sneaky", "email": "sneaky@gmail.com", "password": PASSWORD, "role": "admin"
        })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    server.register("Jane", "jane@gmail.com", "user").await?;
    let (status, body) = server
        .send(server.client.post(server.url("/api/v1/auth/register")).json(&json!({
            "name": "Jane Again", "email": "jane@gmail.com", "password": PASSWORD
        })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Duplicate field value entered");
    Ok(())
}

#[tokio::test]
async fn login_failures() -> Result<()> {
    let server = common::spawn().await?;
    server.register("Jane", "jane@gmail.com", "user").await?;

    let (status, body) = server
        .send(server.client.post(server.url("/api/v1/auth/login")).json(&json!({ "email": "jane@gmail.com" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please provide an email and password");

    for (email, password) in [("jane@gmail.com", "wrong-password"), ("nobody@gmail.com", PASSWORD)] {
        let (status, body) = server
            .send(server.client.post(server.url("/api/v1/auth/login")).json(&json!({ "email": email, "password": password })))
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }

    server.login("jane@gmail.com", PASSWORD).await?;
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() -> Result<()> {
    let server = common::spawn().await?;

    let (status, body) = server.send(server.client.get(server.url("/api/v1/auth/me"))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authorized to access this route");

    let (status, _) = server
        .send(server.client.get(server.url("/api/v1/auth/me")).bearer_auth("not.a.jwt"))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Deleted users lose access even with an unexpired token
    let token = server.register("Gone", "gone@gmail.com", "user").await?;
    let (_, me) = server.send(server.client.get(server.url("/api/v1/auth/me")).bearer_auth(&token)).await?;
    let admin = server.admin("admin@gmail.com").await?;
    let id = me["data"]["id"].as_str().unwrap_or_default().to_string();
    let (status, _) = server
        .send(server.client.delete(server.url(&format!("/api/v1/users/{}", id))).bearer_auth(&admin))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.send(server.client.get(server.url("/api/v1/auth/me")).bearer_auth(&token)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn logout_clears_cookie() -> Result<()> {
    let server = common::spawn().await?;
    let token = server.register("Jane", "jane@gmail.com", "user").await?;

    let res = server.client.get(server.url("/api/v1/auth/logout")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(cookie.starts_with("token=logout;") && cookie.contains("Max-Age=0"), "cookie: {}", cookie);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"], json!({}));
    Ok(())
}

#[tokio::test]
async fn update_details_and_password() -> Result<()> {
    let server = common::spawn().await?;
    let token = server.register("Jane", "jane@gmail.com", "user").await?;

    let (status, _) = server
        .send(server.client.put(server.url("/api/v1/auth/updateDetails")).bearer_auth(&token).json(&json!({ "name": "Jane Roe" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .send(
            server
                .client
                .put(server.url("/api/v1/auth/updateDetails"))
                .bearer_auth(&token)
                .json(&json!({ "name": "Jane Roe", "email": "roe@gmail.com" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Jane Roe");
    assert_eq!(body["data"]["email"], "roe@gmail.com");

    let (status, body) = server
        .send(
            server
                .client
                .put(server.url("/api/v1/auth/updatePassword"))
                .bearer_auth(&token)
                .json(&json!({ "oldPassword": "nope", "newPassword": "abcdef" })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Password is incorrect");

    let (status, body) = server
        .send(
            server
                .client
                .put(server.url("/api/v1/auth/updatePassword"))
                .bearer_auth(&token)
                .json(&json!({ "oldPassword": PASSWORD, "newPassword": "abcdef" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    server.login("roe@gmail.com", "abcdef").await?;
    Ok(())
}

#[tokio::test]
async fn forgot_and_reset_password() -> Result<()> {
    let server = common::spawn().await?;
    server.register("Jane", "jane@gmail.com", "user").await?;

    let (status, body) = server
        .send(server.client.post(server.url("/api/v1/auth/forgotPassword")).json(&json!({ "email": "who@gmail.com" })))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "There is no user with that email");

    let (status, body) = server
        .send(server.client.post(server.url("/api/v1/auth/forgotPassword")).json(&json!({ "email": "jane@gmail.com" })))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"], "Email sent");

    let message = server.mailer.last().expect("reset email recorded");
    assert_eq!(message.to, "jane@gmail.com");
    assert_eq!(message.subject, "Password reset token");
    let token = message
        .text
        .rsplit("/api/v1/auth/resetPassword/")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    assert_eq!(token.len(), 40, "unexpected token in {:?}", message.text);

    let (status, body) = server
        .send(
            server
                .client
                .put(server.url("/api/v1/auth/resetPassword/0000000000000000000000000000000000000000"))
                .json(&json!({ "password": "newpass" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Token is invalid or has expired");

    let (status, body) = server
        .send(
            server
                .client
                .put(server.url(&format!("/api/v1/auth/resetPassword/{}", token)))
                .json(&json!({ "password": "newpass" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    server.login("jane@gmail.com", "newpass").await?;

    // Tokens are single use
    let (status, _) = server
        .send(
            server
                .client
                .put(server.url(&format!("/api/v1/auth/resetPassword/{}", token)))
                .json(&json!({ "password": "another" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn failed_reset_email_clears_token() -> Result<()> {
    let server = common::spawn().await?;
    server.register("Jane", "jane@gmail.com", "user").await?;
    server.mailer.fail.store(true, Ordering::SeqCst);

    let (status, body) = server
        .send(server.client.post(server.url("/api/v1/auth/forgotPassword")).json(&json!({ "email": "jane@gmail.com" })))
        .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Email could not be sent");

    let user = server.ctx.stores.users.find_user_by_email("jane@gmail.com").await?.expect("user exists");
    assert!(user.reset_password_token.is_none());
    assert!(user.reset_password_expire.is_none());
    Ok(())
}

#[tokio::test]
async fn oversized_bodies_are_rejected() -> Result<()> {
    let server = common::spawn().await?;

    let name = "x".repeat(20 * 1024);
    let (status, body) = server
        .send(
            server
                .client
                .post(server.url("/api/v1/auth/register"))
                .json(&json!({ "name": name, "email": "big@gmail.com", "password": PASSWORD, "role": "user" })),
        )
        .await?;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Request body is too large");

    let (status, _) = server
        .send(server.client.post(server.url("/api/v1/auth/login")).json(&json!({ "email": "big@gmail.com", "password": PASSWORD })))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn requests_over_the_rate_limit_get_429() -> Result<()> {
    let server = common::spawn_with(|config| {
        config.api.rate_limit_requests = 3;
        config.api.rate_limit_window_secs = 60 * 60;
    })
    .await?;

    for _ in 0..3 {
        let (status, _) = server.send(server.client.get(server.url("/api/v1/bootcamps"))).await?;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = server.send(server.client.get(server.url("/api/v1/bootcamps"))).await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Too many requests from this IP, please try again later");

    let (status, _) = server.send(server.client.get(server.url("/health"))).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
