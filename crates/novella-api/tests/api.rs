//! Router-level tests: requests go through the full axum stack against an
//! in-memory database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use novella_api::access::PREVIEW_CHARS;
use novella_api::auth::{AppState, AppStateInner};
use novella_api::router;
use novella_api::uploads::Storage;
use novella_db::Database;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("novella-api-test-{}", uuid::Uuid::new_v4()));
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: SECRET.to_string(),
            storage: Storage::new(dir).await.unwrap(),
        });
        Self {
            router: router(state.clone()),
            state,
        }
    }

    async fn request(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.request(req).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Register a user and return their token and id.
    async fn register(&self, name: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "email": format!("{}@example.com", name),
                    "password": "correct horse battery",
                    "name": name,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["token"].as_str().unwrap().to_string(),
            body["user_id"].as_str().unwrap().to_string(),
        )
    }

    async fn genre_id(&self, name: &str) -> i64 {
        let (_, body) = self.get("/genres", None).await;
        body["genres"]
            .as_array()
            .unwrap()
            .iter()
            .find(|g| g["name"] == name)
            .and_then(|g| g["id"].as_i64())
            .unwrap()
    }

    async fn create_novel(&self, token: &str, title: &str) -> String {
        let fantasy = self.genre_id("Fantasy").await;
        let (status, body) = self
            .post(
                "/author/novels",
                token,
                json!({
                    "title": title,
                    "description": "A tale",
                    "status": "ONGOING",
                    "genres": [fantasy],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_chapter(&self, token: &str, novel_id: &str, number: i64, extra: Value) -> String {
        let mut body = json!({
            "title": format!("Chapter {}", number),
            "content": "It was a dark and stormy night.",
            "chapter_number": number,
            "status": "PUBLISHED",
        });
        if let (Some(target), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                target.insert(k.clone(), v.clone());
            }
        }
        let (status, body) = self
            .post(&format!("/author/novels/{}/chapters", novel_id), token, body)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn register_login_and_profile() {
    let app = TestApp::new().await;
    let (token, user_id) = app.register("ada").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "correct horse battery" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "READER");

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/users/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["wallet_coins"], 0);

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "ada@example.com", "password": "another password", "name": "Ada" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/users/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.get("/users/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn novel_without_genres_is_rejected() {
    let app = TestApp::new().await;
    let (token, _) = app.register("writer").await;

    let (status, body) = app
        .post(
            "/author/novels",
            &token,
            json!({ "title": "Empty", "description": "No genres", "status": "ONGOING", "genres": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("genre"));

    let (status, _) = app
        .post(
            "/author/novels",
            &token,
            json!({ "title": "Bad", "description": "Unknown genre", "status": "ONGOING", "genres": [9999] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn first_novel_promotes_reader_to_author() {
    let app = TestApp::new().await;
    let (token, _) = app.register("writer").await;
    app.create_novel(&token, "Debut").await;

    let (_, body) = app.get("/users/me", Some(&token)).await;
    assert_eq!(body["role"], "AUTHOR");
}

#[tokio::test]
async fn other_authors_novels_are_not_found() {
    let app = TestApp::new().await;
    let (owner, _) = app.register("owner").await;
    let (intruder, _) = app.register("intruder").await;
    let novel_id = app.create_novel(&owner, "Mine").await;
    let uri = format!("/author/novels/{}", novel_id);

    let (status, _) = app.get(&uri, Some(&intruder)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            &format!("{}/chapters", uri),
            &intruder,
            json!({ "title": "Hijack", "content": "x", "chapter_number": 1, "status": "PUBLISHED" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&uri, Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Mine");
}

#[tokio::test]
async fn draft_chapters_are_hidden_from_readers() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (reader, _) = app.register("reader").await;
    let novel_id = app.create_novel(&author, "Drafts").await;
    let chapter_id = app
        .create_chapter(&author, &novel_id, 1, json!({ "status": "DRAFT" }))
        .await;
    let uri = format!("/chapters/{}", chapter_id);

    let (status, _) = app.get(&uri, Some(&reader)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&uri, Some(&author)).await;
    assert_eq!(status, StatusCode::OK);

    // Drafts are left out of the public table of contents.
    let (_, body) = app.get(&format!("/novels/{}", novel_id), None).await;
    assert_eq!(body["chapters"].as_array().unwrap().len(), 0);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/author/novels/{}/chapters/{}/status", novel_id, chapter_id),
            Some(&author),
            Some(json!({ "status": "PUBLISHED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, Some(&reader)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/author/novels/{}/chapters/{}/status", novel_id, chapter_id),
            Some(&author),
            Some(json!({ "status": "ARCHIVED" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn premium_content_is_previewed_until_purchased() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (reader, _) = app.register("reader").await;
    let novel_id = app.create_novel(&author, "Paid").await;
    let content = "word ".repeat(PREVIEW_CHARS);
    let chapter_id = app
        .create_chapter(
            &author,
            &novel_id,
            1,
            json!({ "content": content, "is_premium": true, "coins_cost": 30 }),
        )
        .await;
    let uri = format!("/chapters/{}", chapter_id);

    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_access_premium"], false);
    let shown = body["chapter"]["content"].as_str().unwrap();
    assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
    assert!(shown.ends_with("..."));

    let (_, body) = app.get(&uri, Some(&author)).await;
    assert_eq!(body["can_access_premium"], true);
    assert_eq!(body["chapter"]["content"].as_str().unwrap().chars().count(), content.chars().count());

    // Empty wallet
    let (status, _) = app.post(&format!("{}/purchase", uri), &reader, json!({})).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (status, body) = app
        .post("/payments", &reader, json!({ "amount": 50, "payment_type": "COIN_PURCHASE" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["wallet_coins"], 50);

    let (status, body) = app.post(&format!("{}/purchase", uri), &reader, json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["wallet_coins"], 20);

    let (status, _) = app.post(&format!("{}/purchase", uri), &reader, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get(&uri, Some(&reader)).await;
    assert_eq!(body["can_access_premium"], true);
    assert!(!body["chapter"]["content"].as_str().unwrap().ends_with("..."));

    let (_, body) = app.get("/payments", Some(&reader)).await;
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0]["type"], "CHAPTER_PURCHASE");
}

#[tokio::test]
async fn subscription_unlocks_premium_chapters() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (reader, _) = app.register("reader").await;
    let novel_id = app.create_novel(&author, "Members only").await;
    let chapter_id = app
        .create_chapter(&author, &novel_id, 1, json!({ "is_premium": true, "coins_cost": 5 }))
        .await;

    let (status, body) = app
        .post("/payments", &reader, json!({ "amount": 10, "payment_type": "PREMIUM_SUBSCRIPTION" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["premium_until"].is_string());

    let (_, body) = app.get(&format!("/chapters/{}", chapter_id), Some(&reader)).await;
    assert_eq!(body["can_access_premium"], true);

    let (status, _) = app
        .post("/payments", &reader, json!({ "amount": 5, "payment_type": "CHAPTER_PURCHASE" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn second_review_replaces_the_first() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (critic, _) = app.register("critic").await;
    let (fan, _) = app.register("fan").await;
    let novel_id = app.create_novel(&author, "Rated").await;
    let uri = format!("/novels/{}/reviews", novel_id);

    let (status, _) = app.post(&uri, &critic, json!({ "rating": 2, "content": "meh" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = app.post(&uri, &fan, json!({ "rating": 5 })).await;
    assert_eq!(body["average_rating"], 3.5);

    let (status, body) = app.post(&uri, &critic, json!({ "rating": 4, "content": "grew on me" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);
    assert_eq!(body["total_ratings"], 2);
    assert_eq!(body["average_rating"], 4.5);

    let (_, body) = app.get(&uri, None).await;
    assert_eq!(body["total_reviews"], 2);
    assert_eq!(body["reviews"].as_array().unwrap().len(), 2);

    let (status, _) = app.post(&uri, &fan, json!({ "rating": 6 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Only the writer may delete a review.
    let review_id = body["reviews"][0]["id"].as_str().unwrap().to_string();
    let writer = if body["reviews"][0]["user"]["name"] == "critic" { &critic } else { &fan };
    let other = if writer == &critic { &fan } else { &critic };
    let (status, _) = app
        .send(Method::DELETE, &format!("{}/{}", uri, review_id), Some(other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app
        .send(Method::DELETE, &format!("{}/{}", uri, review_id), Some(writer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_ratings"], 1);
}

#[tokio::test]
async fn deleting_a_comment_removes_its_replies() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (reader, _) = app.register("reader").await;
    let (bystander, _) = app.register("bystander").await;
    let novel_id = app.create_novel(&author, "Talked about").await;
    let chapter_id = app.create_chapter(&author, &novel_id, 1, json!({})).await;
    let uri = format!("/chapters/{}/comments", chapter_id);

    let (status, root) = app.post(&uri, &reader, json!({ "content": "First!" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let root_id = root["id"].as_str().unwrap().to_string();

    let (status, reply) = app
        .post(&uri, &bystander, json!({ "content": "Welcome", "parent_id": root_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(&uri, &reader, json!({ "content": "Nested", "parent_id": reply["id"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post(&uri, &reader, json!({ "content": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&uri, None).await;
    assert_eq!(body["total_comments"], 1);
    assert_eq!(body["comments"][0]["replies"].as_array().unwrap().len(), 1);

    let delete_uri = format!("{}/{}", uri, root_id);
    let (status, _) = app.send(Method::DELETE, &delete_uri, Some(&bystander), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The novel's author may moderate.
    let (status, body) = app.send(Method::DELETE, &delete_uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    let (_, body) = app.get(&uri, None).await;
    assert_eq!(body["total_comments"], 0);
}

#[tokio::test]
async fn bookshelf_is_idempotent() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (reader, _) = app.register("reader").await;
    let novel_id = app.create_novel(&author, "Keeper").await;

    let (status, _) = app.post("/users/bookshelf", &reader, json!({ "novel_id": novel_id })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.post("/users/bookshelf", &reader, json!({ "novel_id": novel_id })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/users/bookshelf", Some(&reader)).await;
    assert_eq!(body["novels"].as_array().unwrap().len(), 1);

    let status_uri = format!("/users/bookshelf/{}", novel_id);
    let (_, body) = app.get(&status_uri, Some(&reader)).await;
    assert_eq!(body["in_bookshelf"], true);

    for _ in 0..2 {
        let (status, _) = app.send(Method::DELETE, &status_uri, Some(&reader), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (_, body) = app.get(&status_uri, Some(&reader)).await;
    assert_eq!(body["in_bookshelf"], false);

    let (status, _) = app
        .post("/users/bookshelf", &reader, json!({ "novel_id": uuid::Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn novel_listing_filters_and_sorts() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let first = app.create_novel(&author, "Alpha").await;
    app.create_novel(&author, "Beta").await;

    // Viewing bumps the counter used by the views ranking.
    let (status, body) = app.get(&format!("/novels/{}", first), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view_count"], 1);

    let (status, body) = app.get("/novels?sort=view_count&order=desc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_novels"], 2);
    assert_eq!(body["novels"][0]["title"], "Alpha");

    let (_, body) = app.get("/novels?sort=title&order=asc&limit=1&page=2", None).await;
    assert_eq!(body["novels"][0]["title"], "Beta");
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["current_page"], 2);

    let (_, body) = app.get("/novels?search=alp&genre=Fantasy&timeframe=week", None).await;
    assert_eq!(body["total_novels"], 1);

    let (_, body) = app.get("/novels?genre=Horror", None).await;
    assert_eq!(body["total_novels"], 0);

    let (status, _) = app.get("/novels?sort=password", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_chapter_numbers_conflict() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let novel_id = app.create_novel(&author, "Numbered").await;
    app.create_chapter(&author, &novel_id, 1, json!({})).await;

    let (status, _) = app
        .post(
            &format!("/author/novels/{}/chapters", novel_id),
            &author,
            json!({ "title": "Again", "content": "x", "chapter_number": 1, "status": "DRAFT" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn cover_upload_is_validated_and_served() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let novel_id = app.create_novel(&author, "Pretty").await;
    let uri = format!("/author/novels/{}/cover", novel_id);

    let upload = |bytes: Vec<u8>| {
        Request::builder()
            .method(Method::PUT)
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", author))
            .body(Body::from(bytes))
            .unwrap()
    };

    let (status, _) = app.request(upload(Vec::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.request(upload(b"plain text".to_vec())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png.extend_from_slice(&[0u8; 64]);
    let (status, body) = app.request(upload(png.clone())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["cover_image"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/novels/"));

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(served.as_ref(), png.as_slice());

    let mut too_big = b"\xFF\xD8\xFF".to_vec();
    too_big.resize(novella_api::uploads::MAX_COVER_SIZE + 1, 0);
    let (status, _) = app.request(upload(too_big)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let _ = std::fs::remove_dir_all(app.state.storage.dir());
}

#[tokio::test]
async fn draft_chapter_comments_are_hidden_from_readers() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (reader, _) = app.register("reader").await;
    let novel_id = app.create_novel(&author, "Unfinished").await;
    let chapter_id = app
        .create_chapter(&author, &novel_id, 1, json!({ "status": "DRAFT" }))
        .await;
    let uri = format!("/chapters/{}/comments", chapter_id);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&uri, Some(&reader)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post(&uri, &reader, json!({ "content": "Early!" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.post(&uri, &author, json!({ "content": "Note to self" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.get(&uri, Some(&author)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_comments"], 1);
}

#[tokio::test]
async fn author_listing_counts_draft_chapters() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let novel_id = app.create_novel(&author, "Work in progress").await;
    app.create_chapter(&author, &novel_id, 1, json!({ "status": "DRAFT" }))
        .await;

    let (status, body) = app.get("/author/novels", Some(&author)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["novels"][0]["total_chapters"], 1);
    assert_eq!(body["novels"][0]["chapters_count"], 0);

    let (_, body) = app.get(&format!("/author/novels/{}", novel_id), Some(&author)).await;
    assert_eq!(body["total_chapters"], 1);
}

#[tokio::test]
async fn malformed_token_on_public_route_reads_as_anonymous() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let novel_id = app.create_novel(&author, "Open book").await;
    let chapter_id = app
        .create_chapter(&author, &novel_id, 1, json!({ "is_premium": true, "coins_cost": 3 }))
        .await;

    let (status, body) = app.get("/novels", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_novels"], 1);

    let (status, body) = app.get(&format!("/chapters/{}", chapter_id), Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_access_premium"], false);
}

#[tokio::test]
async fn admin_can_delete_any_comment() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (reader, _) = app.register("reader").await;
    let (admin, admin_id) = app.register("admin").await;
    app.state.db.set_user_role(&admin_id, "ADMIN").unwrap();

    let novel_id = app.create_novel(&author, "Moderated").await;
    let chapter_id = app.create_chapter(&author, &novel_id, 1, json!({})).await;
    let uri = format!("/chapters/{}/comments", chapter_id);
    let (_, comment) = app.post(&uri, &reader, json!({ "content": "Spam" })).await;

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("{}/{}", uri, comment["id"].as_str().unwrap()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 1);
}

#[tokio::test]
async fn purchase_rejects_own_and_free_chapters() {
    let app = TestApp::new().await;
    let (author, _) = app.register("author").await;
    let (reader, _) = app.register("reader").await;
    let novel_id = app.create_novel(&author, "Shop").await;
    let premium = app
        .create_chapter(&author, &novel_id, 1, json!({ "is_premium": true, "coins_cost": 3 }))
        .await;
    let free = app.create_chapter(&author, &novel_id, 2, json!({})).await;

    let (status, _) = app
        .post(&format!("/chapters/{}/purchase", premium), &author, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post(&format!("/chapters/{}/purchase", free), &reader, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
