mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{bootcamp_body, course_body, id_of, review_body};

#[tokio::test]
async fn create_requires_auth_and_publisher_role() -> Result<()> {
    let server = common::spawn().await?;

    let (status, _) = server
        .send(server.client.post(server.url("/api/v1/bootcamps")).json(&bootcamp_body("Devworks", "Boston MA")))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = server.register("Reader", "reader@gmail.com", "user").await?;
    let (status, body) = server.create_bootcamp(&user, "Devworks", "Boston MA").await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User role user is not authorized to access this route");
    Ok(())
}

#[tokio::test]
async fn publisher_creates_one_bootcamp_with_slug_and_location() -> Result<()> {
    let server = common::spawn().await?;
    let publisher = server.register("Pub", "pub@gmail.com", "publisher").await?;

    let (status, body) = server.create_bootcamp(&publisher, "Devworks Bootcamp", "233 Bay State Rd Boston MA 02215").await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let data = &body["data"];
    assert_eq!(data["slug"], "devworks-bootcamp");
    assert_eq!(data["photo"], "no-photo.jpg");
    assert_eq!(data["location"]["type"], "Point");
    assert_eq!(data["location"]["city"], "Boston");
    assert_eq!(data["careers"], json!(["Web Development", "UI/UX"]));
    assert!(data["averageCost"].is_null());

    let (status, body) = server.create_bootcamp(&publisher, "Second Camp", "Worcester MA").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let me = server.client.get(server.url("/api/v1/auth/me")).bearer_auth(&publisher).send().await?;
    let me = me.json::<serde_json::Value>().await?;
    assert_eq!(
        body["error"],
        format!("The user with ID {} has already published a bootcamp", me["data"]["id"].as_str().unwrap_or_default())
    );
    Ok(())
}

#[tokio::test]
async fn admins_may_publish_many() -> Result<()> {
    let server = common::spawn().await?;
    let admin = server.admin("admin@gmail.com").await?;

    for name in ["Camp One", "Camp Two", "Camp Three"] {
        let (status, body) = server.create_bootcamp(&admin, name, "Boston MA").await?;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
    }
    Ok(())
}

#[tokio::test]
async fn validation_and_duplicate_names() -> Result<()> {
    let server = common::spawn().await?;
    let admin = server.admin("admin@gmail.com").await?;

    let (status, body) = server
        .send(
            server
                .client
                .post(server.url("/api/v1/bootcamps"))
                .bearer_auth(&admin)
                .json(&json!({ "name": "No Careers", "description": "x", "address": "Boston MA", "careers": [] })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fields"]["careers"].is_string(), "{}", body);

    server.create_bootcamp(&admin, "Devworks", "Boston MA").await?;
    let (status, body) = server.create_bootcamp(&admin, "Devworks", "Boston MA").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Duplicate field value entered");

    let (status, _) = server
        .send(server.client.post(server.url("/api/v1/bootcamps")).bearer_auth(&admin).body("{not json"))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn only_owner_or_admin_may_mutate() -> Result<()> {
    let server = common::spawn().await?;
    let owner = server.register("Owner", "owner@gmail.com", "publisher").await?;
    let other = server.register("Other", "other@gmail.com", "publisher").await?;
    let admin = server.admin("admin@gmail.com").await?;

    let (_, body) = server.create_bootcamp(&owner, "Devworks", "Boston MA").await?;
    let id = id_of(&body)?;
    let path = server.url(&format!("/api/v1/bootcamps/{}", id));

    let (status, body) = server
        .send(server.client.put(&path).bearer_auth(&other).json(&json!({ "housing": false })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap_or_default().ends_with("is not authorized to update this bootcamp"));

    let (status, body) = server
        .send(server.client.put(&path).bearer_auth(&owner).json(&json!({ "name": "Devworks Pro", "address": "Worcester MA" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "devworks-pro");
    assert_eq!(body["data"]["location"]["city"], "Worcester");

    let (status, body) = server
        .send(server.client.put(&path).bearer_auth(&admin).json(&json!({ "jobGuarantee": true })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["jobGuarantee"], true);

    let (status, _) = server.send(server.client.delete(&path).bearer_auth(&other)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn get_missing_or_malformed_id_is_not_found() -> Result<()> {
    let server = common::spawn().await?;

    let missing = uuid::Uuid::new_v4();
    let (status, body) = server
        .send(server.client.get(server.url(&format!("/api/v1/bootcamps/{}", missing))))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Bootcamp not found with id of {}", missing));

    let (status, body) = server.send(server.client.get(server.url("/api/v1/bootcamps/not-an-id"))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn delete_cascades_to_courses_and_reviews() -> Result<()> {
    let server = common::spawn().await?;
    let publisher = server.register("Pub", "pub@gmail.com", "publisher").await?;
    let reviewer = server.register("Rev", "rev@gmail.com", "user").await?;

    let (_, body) = server.create_bootcamp(&publisher, "Devworks", "Boston MA").await?;
    let id = id_of(&body)?;

    for (title, tuition) in [("Front End", 8000.0), ("Back End", 9000.0)] {
        let (status, _) = server
            .send(
                server
                    .client
                    .post(server.url(&format!("/api/v1/bootcamps/{}/courses", id)))
                    .bearer_auth(&publisher)
                    .json(&course_body(title, tuition)),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = server
        .send(
            server
                .client
                .post(server.url(&format!("/api/v1/bootcamps/{}/reviews", id)))
                .bearer_auth(&reviewer)
                .json(&review_body("Great", 9)),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = server
        .send(server.client.delete(server.url(&format!("/api/v1/bootcamps/{}", id))).bearer_auth(&publisher))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({}));

    let (_, courses) = server.send(server.client.get(server.url("/api/v1/courses"))).await?;
    assert_eq!(courses["count"], 0);
    let (_, reviews) = server.send(server.client.get(server.url("/api/v1/reviews"))).await?;
    assert_eq!(reviews["count"], 0);

    let (status, _) = server
        .send(server.client.get(server.url(&format!("/api/v1/bootcamps/{}/courses", id))))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_supports_filter_select_sort_and_paging() -> Result<()> {
    let server = common::spawn().await?;
    let admin = server.admin("admin@gmail.com").await?;

    for (name, housing) in [("Alpha Camp", true), ("Beta Camp", false), ("Gamma Camp", true)] {
        let mut body = bootcamp_body(name, "Boston MA");
        body["housing"] = json!(housing);
        let (status, _) = server
            .send(server.client.post(server.url("/api/v1/bootcamps")).bearer_auth(&admin).json(&body))
            .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = server
        .send(server.client.get(server.url("/api/v1/bootcamps?housing=true&select=name,housing&sort=name")))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let data = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(data[0]["name"], "Alpha Camp");
    assert_eq!(data[1]["name"], "Gamma Camp");
    assert!(data[0].get("description").is_none(), "select not applied: {}", data[0]);
    assert!(data[0]["id"].is_string());
    assert!(data[0]["courses"].is_array());

    let (_, body) = server
        .send(server.client.get(server.url("/api/v1/bootcamps?sort=-name&limit=2&page=1")))
        .await?;
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["name"], "Gamma Camp");
    assert_eq!(body["pagination"]["next"], json!({ "page": 2, "limit": 2 }));
    assert!(body["pagination"].get("prev").is_none());

    let (_, body) = server
        .send(server.client.get(server.url("/api/v1/bootcamps?sort=-name&limit=2&page=2")))
        .await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Alpha Camp");
    assert_eq!(body["pagination"]["prev"], json!({ "page": 1, "limit": 2 }));

    let (status, _) = server.send(server.client.get(server.url("/api/v1/bootcamps?secret[gt]=1"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn page_beyond_the_row_range_is_a_bad_request() -> Result<()> {
    let server = common::spawn().await?;

    let (status, body) = server
        .send(server.client.get(server.url("/api/v1/bootcamps?page=18446744073709551615")))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid page parameter");

    let (status, _) = server
        .send(server.client.get(server.url("/api/v1/courses?page=9223372036854775807&limit=100")))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn radius_search() -> Result<()> {
    let server = common::spawn().await?;
    let admin = server.admin("admin@gmail.com").await?;
    server.create_bootcamp(&admin, "Boston Camp", "Boston MA 02215").await?;
    server.create_bootcamp(&admin, "Worcester Camp", "Worcester MA 01609").await?;

    // Boston to Worcester is roughly 36 miles
    let (status, body) = server.send(server.client.get(server.url("/api/v1/bootcamps/radius/02215/10"))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Boston Camp");

    let (_, body) = server.send(server.client.get(server.url("/api/v1/bootcamps/radius/02215/50"))).await?;
    assert_eq!(body["count"], 2);

    let (status, body) = server.send(server.client.get(server.url("/api/v1/bootcamps/radius/99999/50"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not locate zipcode 99999");

    let (status, _) = server.send(server.client.get(server.url("/api/v1/bootcamps/radius/02215/far"))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
