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
    ($app:expr, $username:expr, $role:expr) => {{
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
            .set_json(json!({ "display_name": $username, "role": $role }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        let profile_id = resp["data"]["id"].as_str().unwrap().to_string();

        (token, profile_id)
    }};
}

macro_rules! create_listing {
    ($app:expr, $token:expr, $title:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/listings")
            .insert_header(("Authorization", format!("Bearer {}", $token)))
            .set_json(json!({
                "title": $title,
                "description": "Room for the summer",
                "price_per_month": 1000.0,
                "address": "44 River Rd, Boston MA",
                "area": "allston",
                "start_date": "2026-06-01",
                "end_date": "2026-08-31"
            }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        resp["data"]["id"].as_str().unwrap().to_string()
    }};
}

macro_rules! express_interest {
    ($app:expr, $token:expr, $listing_id:expr) => {{
        let req = test::TestRequest::post()
            .uri(&format!("/api/listings/{}/interest", $listing_id))
            .insert_header(("Authorization", format!("Bearer {}", $token)))
            .set_json(json!({ "message": "Is this still available?" }))
            .to_request();
        let resp: serde_json::Value = test::call_and_read_body_json(&$app, req).await;
        assert_eq!(resp["success"], true, "interest request failed: {:?}", resp);
        resp["data"]["id"].as_str().unwrap().to_string()
    }};
}

fn setup() -> (Arc<Store>, Arc<AuthService>) {
    let store = Arc::new(Store::new(":memory:").unwrap());
    let auth_service = Arc::new(AuthService::new("test_secret".to_string()));
    (store, auth_service)
}

// ==================== Creation Tests ====================

#[actix_web::test]
async fn test_express_interest() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (host_token, _) = register_with_profile!(app, "hosta", "host");
    let (sub_token, sub_profile) = register_with_profile!(app, "suba", "subletter");
    let listing_id = create_listing!(app, host_token, "Summer room");

    let req = test::TestRequest::post()
        .uri(&format!("/api/listings/{}/interest", listing_id))
        .insert_header(("Authorization", format!("Bearer {}", sub_token)))
        .set_json(json!({ "message": "Very interested!" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["success"], true);
    assert_eq!(resp["data"]["status"], "pending");
    assert_eq!(resp["data"]["requester_id"], sub_profile.as_str());
    assert_eq!(resp["data"]["listing_id"], listing_id.as_str());
}

#[actix_web::test]
async fn test_host_cannot_request_own_listing() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (host_token, _) = register_with_profile!(app, "hosta", "host");
    let listing_id = create_listing!(app, host_token, "My own room");

    let req = test::TestRequest::post()
        .uri(&format!("/api/listings/{}/interest", listing_id))
        .insert_header(("Authorization", format!("Bearer {}", host_token)))
        .set_json(json!({ "message": "me me me" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}

#[actix_web::test]
async fn test_interest_in_missing_listing_fails() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (sub_token, _) = register_with_profile!(app, "suba", "subletter");

    let req = test::TestRequest::post()
        .uri("/api/listings/no-such-listing/interest")
        .insert_header(("Authorization", format!("Bearer {}", sub_token)))
        .set_json(json!({ "message": "hello?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

// ==================== Listing-side Views ====================

#[actix_web::test]
async fn test_my_and_manage_views() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (host_token, _) = register_with_profile!(app, "hosta", "host");
    let (sub_token, _) = register_with_profile!(app, "suba", "subletter");
    let listing_id = create_listing!(app, host_token, "Summer room");
    express_interest!(app, sub_token, listing_id);

    // Requester sees it under /my
    let req = test::TestRequest::get()
        .uri("/api/my/interest-requests")
        .insert_header(("Authorization", format!("Bearer {}", sub_token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);

    // Host sees it under /manage
    let req = test::TestRequest::get()
        .uri("/api/manage/interest-requests")
        .insert_header(("Authorization", format!("Bearer {}", host_token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);

    // The requester's manage view is empty
    let req = test::TestRequest::get()
        .uri("/api/manage/interest-requests")
        .insert_header(("Authorization", format!("Bearer {}", sub_token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 0);
}

// ==================== Decision Tests ====================

#[actix_web::test]
async fn test_accept_requires_confirmation() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (host_token, _) = register_with_profile!(app, "hosta", "host");
    let (sub_token, _) = register_with_profile!(app, "suba", "subletter");
    let listing_id = create_listing!(app, host_token, "Summer room");
    let request_id = express_interest!(app, sub_token, listing_id);

    // Accept without confirm is refused and nothing is deleted
    let req = test::TestRequest::post()
        .uri(&format!("/api/interest-requests/{}/decision", request_id))
        .insert_header(("Authorization", format!("Bearer {}", host_token)))
        .set_json(json!({ "status": "accepted" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let req = test::TestRequest::get()
        .uri(&format!("/api/listings/{}", listing_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success(), "Listing should survive an unconfirmed accept");
}

#[actix_web::test]
async fn test_accept_cascades() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (host_token, _) = register_with_profile!(app, "hosta", "host");
    let (sub_a_token, _) = register_with_profile!(app, "suba", "subletter");
    let (sub_b_token, _) = register_with_profile!(app, "subb", "subletter");
    let listing_id = create_listing!(app, host_token, "Contested room");

    let request_a = express_interest!(app, sub_a_token, listing_id);
    let _request_b = express_interest!(app, sub_b_token, listing_id);

    let req = test::TestRequest::post()
        .uri(&format!("/api/interest-requests/{}/decision", request_a))
        .insert_header(("Authorization", format!("Bearer {}", host_token)))
        .set_json(json!({ "status": "accepted", "confirm": true }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["status"], "accepted");
    assert_eq!(resp["data"]["listing_deleted"], true);

    // The listing is gone
    let req = test::TestRequest::get()
        .uri(&format!("/api/listings/{}", listing_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    // Both requests are gone, including the losing sibling
    let req = test::TestRequest::get()
        .uri("/api/my/interest-requests")
        .insert_header(("Authorization", format!("Bearer {}", sub_b_token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_decline_deletes_only_that_request() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (host_token, _) = register_with_profile!(app, "hosta", "host");
    let (sub_a_token, _) = register_with_profile!(app, "suba", "subletter");
    let (sub_b_token, _) = register_with_profile!(app, "subb", "subletter");
    let listing_id = create_listing!(app, host_token, "Contested room");

    let request_a = express_interest!(app, sub_a_token, listing_id);
    express_interest!(app, sub_b_token, listing_id);

    let req = test::TestRequest::post()
        .uri(&format!("/api/interest-requests/{}/decision", request_a))
        .insert_header(("Authorization", format!("Bearer {}", host_token)))
        .set_json(json!({ "status": "declined" }))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"]["status"], "declined");

    // The listing and the other request survive
    let req = test::TestRequest::get()
        .uri(&format!("/api/listings/{}", listing_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::get()
        .uri("/api/my/interest-requests")
        .insert_header(("Authorization", format!("Bearer {}", sub_b_token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);

    // The declined one is gone
    let req = test::TestRequest::get()
        .uri("/api/my/interest-requests")
        .insert_header(("Authorization", format!("Bearer {}", sub_a_token)))
        .to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_only_host_can_decide() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (host_token, _) = register_with_profile!(app, "hosta", "host");
    let (sub_token, _) = register_with_profile!(app, "suba", "subletter");
    let (other_token, _) = register_with_profile!(app, "nosy", "member");
    let listing_id = create_listing!(app, host_token, "Summer room");
    let request_id = express_interest!(app, sub_token, listing_id);

    let req = test::TestRequest::post()
        .uri(&format!("/api/interest-requests/{}/decision", request_id))
        .insert_header(("Authorization", format!("Bearer {}", other_token)))
        .set_json(json!({ "status": "declined" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404, "Non-hosts should not see the request at all");
}

#[actix_web::test]
async fn test_invalid_decision_status_fails() {
    let (store, auth_service) = setup();
    let app = make_app!(store, auth_service);

    let (host_token, _) = register_with_profile!(app, "hosta", "host");
    let (sub_token, _) = register_with_profile!(app, "suba", "subletter");
    let listing_id = create_listing!(app, host_token, "Summer room");
    let request_id = express_interest!(app, sub_token, listing_id);

    let req = test::TestRequest::post()
        .uri(&format!("/api/interest-requests/{}/decision", request_id))
        .insert_header(("Authorization", format!("Bearer {}", host_token)))
        .set_json(json!({ "status": "maybe" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}
