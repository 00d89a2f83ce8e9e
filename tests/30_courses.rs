mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

use common::{course_body, id_of, TestServer};

async fn add_course(server: &TestServer, token: &str, bootcamp: &str, title: &str, tuition: f64) -> Result<(StatusCode, serde_json::Value)> {
    server
        .send(
            server
                .client
                .post(server.url(&format!("/api/v1/bootcamps/{}/courses", bootcamp)))
                .bearer_auth(token)
                .json(&course_body(title, tuition)),
        )
        .await
}

async fn average_cost(server: &TestServer, bootcamp: &str) -> Result<serde_json::Value> {
    let (_, body) = server
        .send(server.client.get(server.url(&format!("/api/v1/bootcamps/{}", bootcamp))))
        .await?;
    Ok(body["data"]["averageCost"].clone())
}

#[tokio::test]
async fn average_cost_tracks_course_writes() -> Result<()> {
    let server = common::spawn().await?;
    let publisher = server.register("Pub", "pub@gmail.com", "publisher").await?;
    let (_, body) = server.create_bootcamp(&publisher, "Devworks", "Boston MA").await?;
    let bootcamp = id_of(&body)?;

    let mut ids = Vec::new();
    for (title, tuition) in [("One", 100.0), ("Two", 200.0), ("Three", 300.0)] {
        let (status, body) = add_course(&server, &publisher, &bootcamp, title, tuition).await?;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["data"]["bootcamp"], bootcamp.as_str());
        ids.push(id_of(&body)?);
    }
    assert_eq!(average_cost(&server, &bootcamp).await?, json!(200));

    // [101, 0] averages 50.5, rounded up to the next ten
    let (status, _) = server
        .send(server.client.delete(server.url(&format!("/api/v1/courses/{}", ids[2]))).bearer_auth(&publisher))
        .await?;
    assert_eq!(status, StatusCode::OK);
    for (id, tuition) in [(&ids[0], 101.0), (&ids[1], 0.0)] {
        let (status, _) = server
            .send(
                server
                    .client
                    .put(server.url(&format!("/api/v1/courses/{}", id)))
                    .bearer_auth(&publisher)
                    .json(&json!({ "tuition": tuition })),
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(average_cost(&server, &bootcamp).await?, json!(60));

    for id in &ids[..2] {
        server
            .send(server.client.delete(server.url(&format!("/api/v1/courses/{}", id))).bearer_auth(&publisher))
            .await?;
    }
    assert!(average_cost(&server, &bootcamp).await?.is_null());
    Ok(())
}

#[tokio::test]
async fn adding_a_course_requires_bootcamp_ownership() -> Result<()> {
    let server = common::spawn().await?;
    let owner = server.register("Owner", "owner@gmail.com", "publisher").await?;
    let other = server.register("Other", "other@gmail.com", "publisher").await?;
    let user = server.register("User", "user@gmail.com", "user").await?;
    let admin = server.admin("admin@gmail.com").await?;

    let (_, body) = server.create_bootcamp(&owner, "Devworks", "Boston MA").await?;
    let bootcamp = id_of(&body)?;

    let (status, body) = add_course(&server, &other, &bootcamp, "Sneaky", 100.0).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap_or_default().contains(&format!("add a course to bootcamp {}", bootcamp)));

    let (status, _) = add_course(&server, &user, &bootcamp, "Wrong role", 100.0).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = add_course(&server, &admin, &bootcamp, "Admin course", 100.0).await?;
    assert_eq!(status, StatusCode::CREATED);

    let missing = uuid::Uuid::new_v4().to_string();
    let (status, body) = add_course(&server, &owner, &missing, "Orphan", 100.0).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Bootcamp not found with id of {}", missing));

    let (status, _) = server
        .send(server.client.post(server.url(&format!("/api/v1/bootcamps/{}/courses", bootcamp))).json(&course_body("Anon", 1.0)))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn course_mutation_is_owner_or_admin() -> Result<()> {
    let server = common::spawn().await?;
    let owner = server.register("Owner", "owner@gmail.com", "publisher").await?;
    let other = server.register("Other", "other@gmail.com", "publisher").await?;
    let admin = server.admin("admin@gmail.com").await?;

    let (_, body) = server.create_bootcamp(&owner, "Devworks", "Boston MA").await?;
    let bootcamp = id_of(&body)?;
    let (_, body) = add_course(&server, &owner, &bootcamp, "Front End", 1000.0).await?;
    let course = server.url(&format!("/api/v1/courses/{}", id_of(&body)?));

    let (status, _) = server
        .send(server.client.put(&course).bearer_auth(&other).json(&json!({ "title": "Mine now" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = server.send(server.client.delete(&course).bearer_auth(&other)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .send(server.client.put(&course).bearer_auth(&admin).json(&json!({ "minimumSkill": "advanced" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["minimumSkill"], "advanced");

    let (status, _) = server
        .send(server.client.put(&course).bearer_auth(&owner).json(&json!({ "tuition": -5 })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.send(server.client.delete(&course).bearer_auth(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.send(server.client.get(&course)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn listings_populate_bootcamp_summary() -> Result<()> {
    let server = common::spawn().await?;
    let publisher = server.register("Pub", "pub@gmail.com", "publisher").await?;
    let (_, body) = server.create_bootcamp(&publisher, "Devworks", "Boston MA").await?;
    let bootcamp = id_of(&body)?;
    let (_, body) = add_course(&server, &publisher, &bootcamp, "Front End", 1000.0).await?;
    let course = id_of(&body)?;
    add_course(&server, &publisher, &bootcamp, "Back End", 3000.0).await?;

    let (status, body) = server.send(server.client.get(server.url("/api/v1/courses?tuition[gte]=2000"))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["title"], "Back End");
    assert_eq!(
        body["data"][0]["bootcamp"],
        json!({ "id": bootcamp, "name": "Devworks", "description": "Devworks is a full stack bootcamp" })
    );

    let (_, body) = server.send(server.client.get(server.url(&format!("/api/v1/courses/{}", course)))).await?;
    assert_eq!(body["data"]["bootcamp"]["name"], "Devworks");

    let (status, body) = server
        .send(server.client.get(server.url(&format!("/api/v1/bootcamps/{}/courses", bootcamp))))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert!(body.get("pagination").is_none());

    let (_, body) = server.send(server.client.get(server.url("/api/v1/bootcamps"))).await?;
    assert_eq!(body["data"][0]["courses"].as_array().map(Vec::len), Some(2));
    Ok(())
}
