use actix_web::{test, web, App};
use serde_json::json;
use std::sync::Arc;

use campus_hub::api::{self, AppState};
use campus_hub::auth::AuthService;
use campus_hub::store::Store;

macro_rules! make_app {
    ($store:expr, $auth:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from($auth.clone()))
                .app_data(web::Data::new(AppState {
                    store: $store.clone(),
                    auth_service: $auth.clone(),
                    geocoder: None,
                }))
                .configure(api::configure_routes),
        )
        .await
    };
}

macro_rules! register_with_profile {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": $username,
                "email": format!("{}@example.com", $username),
                "password": "password123"
            }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        let token = resp["data"]["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/profiles")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({ "display_name": $username }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        let profile_id = resp["data"]["id"].as_str().unwrap().to_string();

        (token, profile_id)
    }};
}

fn setup() -> (Arc<Store>, Arc<AuthService>) {
    let store = Arc::new(Store::new(":memory:").unwrap());
    let auth_service = Arc::new(AuthService::new("test_secret".to_string()));
    (store, auth_service)
}

// ==================== Post CRUD Tests ====================

#[actix_web::test]
async fn test_create_post_with_photos() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token, profile_id) = register_with_profile!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "caption": "Sunset on the esplanade",
            "photo_urls": ["https://img.example.com/1.jpg", "https://img.example.com/2.jpg"]
        }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["success"], true);
    assert_eq!(resp["data"]["caption"], "Sunset on the esplanade");
    assert_eq!(resp["data"]["profile_id"], profile_id.as_str());
    let photos = resp["data"]["photos"].as_array().unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0]["order_index"], 0);
    assert_eq!(photos[1]["order_index"], 1);
}

#[actix_web::test]
async fn test_create_post_empty_caption_fails() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token, _) = register_with_profile!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "caption": "   " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_create_post_without_profile_fails() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    // Registered user with no profile yet
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "password123"
        }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let token = resp["data"]["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "caption": "hello" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_get_post_includes_likes_and_comments() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token_a, _) = register_with_profile!(app, "alice");
    let (token_b, _) = register_with_profile!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token_a)))
        .set_json(json!({ "caption": "first post" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let post_id = resp["data"]["id"].as_str().unwrap().to_string();

    // bob likes and comments
    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/like", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/comments", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .set_json(json!({ "text": "nice!" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{}", post_id))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["data"]["post"]["caption"], "first post");
    assert_eq!(resp["data"]["like_count"], 1);
    let comments = resp["data"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "nice!");
}

#[actix_web::test]
async fn test_update_post_owner_only() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token_a, _) = register_with_profile!(app, "alice");
    let (token_b, _) = register_with_profile!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token_a)))
        .set_json(json!({ "caption": "original" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let post_id = resp["data"]["id"].as_str().unwrap().to_string();

    // bob cannot edit alice's post
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .set_json(json!({ "caption": "hijacked" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    // alice can
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_a)))
        .set_json(json!({ "caption": "edited" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["caption"], "edited");
}

#[actix_web::test]
async fn test_delete_post_removes_likes_and_comments() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token_a, _) = register_with_profile!(app, "alice");
    let (token_b, _) = register_with_profile!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token_a)))
        .set_json(json!({ "caption": "ephemeral" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let post_id = resp["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/like", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{}", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_a)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{}", post_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

// ==================== Like Tests ====================

#[actix_web::test]
async fn test_like_is_idempotent() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token_a, _) = register_with_profile!(app, "alice");
    let (token_b, _) = register_with_profile!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token_a)))
        .set_json(json!({ "caption": "like me" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let post_id = resp["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/like", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    // A repeated like succeeds and the count stays at one
    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/like", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["success"], true);
    assert_eq!(resp["data"]["like_count"], 1);
}

#[actix_web::test]
async fn test_unlike_post() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token_a, _) = register_with_profile!(app, "alice");
    let (token_b, _) = register_with_profile!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token_a)))
        .set_json(json!({ "caption": "like then unlike" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let post_id = resp["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/like", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{}/like", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    // Unliking a post that isn't liked is a 404
    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{}/like", post_id))
        .insert_header(("Authorization", format!("Bearer {}", token_b)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

// ==================== Comment Tests ====================

#[actix_web::test]
async fn test_comments_in_order() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token_a, _) = register_with_profile!(app, "alice");
    let (token_b, _) = register_with_profile!(app, "bob");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(("Authorization", format!("Bearer {}", token_a)))
        .set_json(json!({ "caption": "discuss" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let post_id = resp["data"]["id"].as_str().unwrap().to_string();

    for text in ["first", "second", "third"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/posts/{}/comments", post_id))
            .insert_header(("Authorization", format!("Bearer {}", token_b)))
            .set_json(json!({ "text": text }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{}/comments", post_id))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let comments = resp["data"].as_array().unwrap();
    assert_eq!(comments.len(), 3);
    assert_eq!(comments[0]["text"], "first");
    assert_eq!(comments[2]["text"], "third");
}

#[actix_web::test]
async fn test_comment_on_missing_post_fails() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token, _) = register_with_profile!(app, "alice");

    let req = test::TestRequest::post()
        .uri("/api/posts/no-such-post/comments")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "text": "hello?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_list_profile_posts() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (token, profile_id) = register_with_profile!(app, "alice");

    for i in 0..3 {
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({ "caption": format!("post {}", i) }))
            .to_request();
        test::call_service(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/profiles/{}/posts", profile_id))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["data"].as_array().unwrap().len(), 3);
}
