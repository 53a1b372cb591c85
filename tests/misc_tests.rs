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

macro_rules! register {
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
        resp["data"]["token"].as_str().unwrap().to_string()
    }};
}

fn setup() -> (Arc<Store>, Arc<AuthService>) {
    let store = Arc::new(Store::new(":memory:").unwrap());
    let auth_service = Arc::new(AuthService::new("test_secret".to_string()));
    (store, auth_service)
}

// ==================== Health Check ====================

#[actix_web::test]
async fn test_health() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["status"], "ok");
}

// ==================== Joke Tests ====================

#[actix_web::test]
async fn test_joke_crud_and_random() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);
    let token = register!(app, "funnyguy");

    let req = test::TestRequest::post()
        .uri("/api/jokes")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "joke": "I used to hate facial hair, but then it grew on me.",
            "author": "funnyguy"
        }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["success"], true);
    let joke_id = resp["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/jokes/{}", joke_id))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["author"], "funnyguy");

    let req = test::TestRequest::get().uri("/api/jokes").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);

    // With one joke, random always returns it
    let req = test::TestRequest::get().uri("/api/jokes/random").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["joke"]["id"], joke_id.as_str());
}

#[actix_web::test]
async fn test_random_joke_empty_store() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let req = test::TestRequest::get().uri("/api/jokes/random").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_random_joke_includes_picture() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);
    let token = register!(app, "funnyguy");

    let req = test::TestRequest::post()
        .uri("/api/jokes")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "joke": "A dad joke", "author": "funnyguy" }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/pictures")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "image_url": "https://img.example.com/groan.jpg",
            "author": "funnyguy"
        }))
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::get().uri("/api/jokes/random").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(resp["data"]["joke"]["joke"].is_string());
    assert_eq!(
        resp["data"]["picture"]["image_url"],
        "https://img.example.com/groan.jpg"
    );
}

#[actix_web::test]
async fn test_create_joke_requires_auth() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let req = test::TestRequest::post()
        .uri("/api/jokes")
        .set_json(json!({ "joke": "anonymous joke", "author": "nobody" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

// ==================== Quote Tests ====================

#[actix_web::test]
async fn test_quote_of_the_day() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let req = test::TestRequest::get().uri("/api/quote").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["success"], true);
    assert!(resp["data"]["quote"].is_string());
    assert!(resp["data"]["image"].is_string());
}

// ==================== Restaurant Tests ====================

#[actix_web::test]
async fn test_get_menu() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let req = test::TestRequest::get().uri("/api/menu").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let items = resp["data"]["items"].as_array().unwrap();
    assert!(!items.is_empty());
    assert!(resp["data"]["daily_special"]["name"].is_string());
    assert!(resp["data"]["daily_special"]["price"].as_f64().unwrap() > 0.0);
}

#[actix_web::test]
async fn test_submit_order() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer_name": "Dana",
            "items": ["Margherita Pizza", "Greek Salad"]
        }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["data"]["customer_name"], "Dana");
    assert_eq!(resp["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(resp["data"]["total"], 21.0);
    assert!(resp["data"]["ready_at"].is_string());
}

#[actix_web::test]
async fn test_submit_order_unknown_item_fails() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer_name": "Dana",
            "items": ["Unicorn Burger"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_submit_empty_order_fails() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({
            "customer_name": "Dana",
            "items": []
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
