use actix_web::{web, HttpResponse, Responder};
use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{AuthService, AuthUser};
use crate::geocode::Geocoder;
use crate::models::*;
use crate::store::{ListingFilter, Store, StoreError, VoterFilter};

pub struct AppState {
    pub store: Arc<Store>,
    pub auth_service: Arc<AuthService>,
    pub geocoder: Option<Geocoder>,
}

/// Map a store error to an HTTP response
fn store_error(e: StoreError) -> HttpResponse {
    match e {
        StoreError::NotFound(what) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error(format!("{} not found", what)))
        }
        StoreError::Conflict(msg) => HttpResponse::Conflict().json(ApiResponse::<()>::error(msg)),
        StoreError::Database(e) => HttpResponse::InternalServerError()
            .json(ApiResponse::<()>::error(format!("Database error: {}", e))),
    }
}

/// The profile of the logged-in user, or an error response if none exists
fn current_profile(state: &AppState, auth: &AuthUser) -> Result<Profile, HttpResponse> {
    match state.store.get_profile_by_user(&auth.user_id) {
        Ok(p) => Ok(p),
        Err(StoreError::NotFound(_)) => Err(HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("Create a profile first"))),
        Err(e) => Err(store_error(e)),
    }
}

// ==================== Health Check ====================

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

// ==================== Auth Endpoints ====================

pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> impl Responder {
    let password_hash = match state.auth_service.hash_password(&body.password) {
        Ok(hash) => hash,
        Err(_) => {
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to hash password"))
        }
    };

    let mut user = User {
        id: String::new(),
        username: body.username.clone(),
        email: body.email.clone(),
        password_hash,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    if let Err(e) = state.store.create_user(&mut user) {
        return store_error(e);
    }

    let token = match state.auth_service.generate_token(&user.id) {
        Ok(t) => t,
        Err(_) => {
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to generate token"))
        }
    };

    HttpResponse::Created().json(ApiResponse::success(LoginResponse { token, user }))
}

pub async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> impl Responder {
    let user = match state.store.get_user_by_username(&body.username) {
        Ok(u) => u,
        Err(StoreError::NotFound(_)) => {
            return HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("Invalid credentials"));
        }
        Err(e) => return store_error(e),
    };

    let valid = state
        .auth_service
        .verify_password(&body.password, &user.password_hash)
        .unwrap_or(false);

    if !valid {
        return HttpResponse::Unauthorized().json(ApiResponse::<()>::error("Invalid credentials"));
    }

    let token = match state.auth_service.generate_token(&user.id) {
        Ok(t) => t,
        Err(_) => {
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to generate token"))
        }
    };

    HttpResponse::Ok().json(ApiResponse::success(LoginResponse { token, user }))
}

pub async fn get_current_user(state: web::Data<AppState>, auth: AuthUser) -> impl Responder {
    match state.store.get_user(&auth.user_id) {
        Ok(user) => HttpResponse::Ok().json(ApiResponse::success(user)),
        Err(e) => store_error(e),
    }
}

// ==================== Profile Endpoints ====================

#[derive(Deserialize)]
pub struct ListProfilesQuery {
    role: Option<String>,
    q: Option<String>,
}

pub async fn list_profiles(
    state: web::Data<AppState>,
    query: web::Query<ListProfilesQuery>,
) -> impl Responder {
    if let Some(ref q) = query.q {
        return match state.store.search_profiles(q) {
            Ok(profiles) => HttpResponse::Ok().json(ApiResponse::success(profiles)),
            Err(e) => store_error(e),
        };
    }

    match state.store.list_profiles(query.role.as_deref()) {
        Ok(profiles) => HttpResponse::Ok().json(ApiResponse::success(profiles)),
        Err(e) => store_error(e),
    }
}

pub async fn create_profile(
    state: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<CreateProfileRequest>,
) -> impl Responder {
    if !PROFILE_ROLES.contains(&body.role.as_str()) {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Invalid role: {}", body.role)));
    }

    let mut profile = Profile {
        id: String::new(),
        user_id: auth.user_id.clone(),
        display_name: body.display_name.clone(),
        role: body.role.clone(),
        bio: body.bio.clone(),
        image_url: body.image_url.clone(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    match state.store.create_profile(&mut profile) {
        Ok(_) => HttpResponse::Created().json(ApiResponse::success(profile)),
        Err(e) => store_error(e),
    }
}

pub async fn get_my_profile(state: web::Data<AppState>, auth: AuthUser) -> impl Responder {
    match current_profile(&state, &auth) {
        Ok(profile) => HttpResponse::Ok().json(ApiResponse::success(profile)),
        Err(resp) => resp,
    }
}

pub async fn update_my_profile(
    state: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<UpdateProfileRequest>,
) -> impl Responder {
    let mut profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    if let Some(ref role) = body.role {
        if !PROFILE_ROLES.contains(&role.as_str()) {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error(format!("Invalid role: {}", role)));
        }
        profile.role = role.clone();
    }
    if let Some(ref name) = body.display_name {
        profile.display_name = name.clone();
    }
    if let Some(ref bio) = body.bio {
        profile.bio = bio.clone();
    }
    if let Some(ref url) = body.image_url {
        profile.image_url = url.clone();
    }

    match state.store.update_profile(&mut profile) {
        Ok(_) => HttpResponse::Ok().json(ApiResponse::success(profile)),
        Err(e) => store_error(e),
    }
}

pub async fn get_profile(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    let profile = match state.store.get_profile(&id) {
        Ok(p) => p,
        Err(e) => return store_error(e),
    };

    let followers = state.store.count_followers(&id).unwrap_or(0);
    let following = state.store.count_following(&id).unwrap_or(0);

    HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "profile": profile,
        "follower_count": followers,
        "following_count": following,
    })))
}

pub async fn get_followers(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    if let Err(e) = state.store.get_profile(&id) {
        return store_error(e);
    }
    match state.store.get_followers(&id) {
        Ok(profiles) => HttpResponse::Ok().json(ApiResponse::success(profiles)),
        Err(e) => store_error(e),
    }
}

pub async fn get_following(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    if let Err(e) = state.store.get_profile(&id) {
        return store_error(e);
    }
    match state.store.get_following(&id) {
        Ok(profiles) => HttpResponse::Ok().json(ApiResponse::success(profiles)),
        Err(e) => store_error(e),
    }
}

pub async fn follow_profile(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let follower = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let id = path.into_inner();
    if let Err(e) = state.store.get_profile(&id) {
        return store_error(e);
    }

    match state.store.follow(&id, &follower.id) {
        Ok(follow) => HttpResponse::Created().json(ApiResponse::success(follow)),
        Err(e) => store_error(e),
    }
}

pub async fn unfollow_profile(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let follower = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match state.store.unfollow(&path.into_inner(), &follower.id) {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => store_error(e),
    }
}

pub async fn list_profile_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    if let Err(e) = state.store.get_profile(&id) {
        return store_error(e);
    }
    match state.store.list_posts_by_profile(&id) {
        Ok(posts) => HttpResponse::Ok().json(ApiResponse::success(posts)),
        Err(e) => store_error(e),
    }
}

#[derive(Deserialize)]
pub struct FeedQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Posts from profiles the logged-in user follows, newest first
pub async fn get_feed(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<FeedQuery>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let limit = query.limit.unwrap_or(50).min(100);
    let offset = query.offset.unwrap_or(0);

    match state.store.get_feed(&profile.id, limit, offset) {
        Ok(posts) => HttpResponse::Ok().json(ApiResponse::success(posts)),
        Err(e) => store_error(e),
    }
}

// ==================== Post Endpoints ====================

pub async fn create_post(
    state: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<CreatePostRequest>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    if body.caption.trim().is_empty() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error("Caption is required"));
    }

    let mut post = Post {
        id: String::new(),
        profile_id: profile.id.clone(),
        caption: body.caption.clone(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        photos: Vec::new(),
    };

    match state.store.create_post(&mut post, &body.photo_urls) {
        Ok(_) => HttpResponse::Created().json(ApiResponse::success(post)),
        Err(e) => store_error(e),
    }
}

pub async fn get_post(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let id = path.into_inner();
    let post = match state.store.get_post(&id) {
        Ok(p) => p,
        Err(e) => return store_error(e),
    };

    let like_count = state.store.count_likes(&id).unwrap_or(0);
    let comments = state.store.list_comments(&id).unwrap_or_default();

    HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "post": post,
        "like_count": like_count,
        "comments": comments,
    })))
}

pub async fn update_post(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdatePostRequest>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let id = path.into_inner();
    let mut post = match state.store.get_post(&id) {
        Ok(p) => p,
        Err(e) => return store_error(e),
    };

    if post.profile_id != profile.id {
        return HttpResponse::NotFound().json(ApiResponse::<()>::error("Post not found"));
    }

    post.caption = body.caption.clone();
    match state.store.update_post(&mut post) {
        Ok(_) => HttpResponse::Ok().json(ApiResponse::success(post)),
        Err(e) => store_error(e),
    }
}

pub async fn delete_post(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let id = path.into_inner();
    match state.store.get_post(&id) {
        Ok(post) => {
            if post.profile_id != profile.id {
                return HttpResponse::NotFound().json(ApiResponse::<()>::error("Post not found"));
            }
        }
        Err(e) => return store_error(e),
    }

    match state.store.delete_post(&id) {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => store_error(e),
    }
}

pub async fn create_comment(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<CreateCommentRequest>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let post_id = path.into_inner();
    if let Err(e) = state.store.get_post(&post_id) {
        return store_error(e);
    }

    let mut comment = Comment {
        id: String::new(),
        post_id,
        profile_id: profile.id.clone(),
        text: body.text.clone(),
        created_at: Utc::now(),
    };

    match state.store.create_comment(&mut comment) {
        Ok(_) => HttpResponse::Created().json(ApiResponse::success(comment)),
        Err(e) => store_error(e),
    }
}

pub async fn list_comments(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let post_id = path.into_inner();
    if let Err(e) = state.store.get_post(&post_id) {
        return store_error(e);
    }
    match state.store.list_comments(&post_id) {
        Ok(comments) => HttpResponse::Ok().json(ApiResponse::success(comments)),
        Err(e) => store_error(e),
    }
}

/// Like a post. Liking an already-liked post is a no-op.
pub async fn like_post(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let post_id = path.into_inner();
    if let Err(e) = state.store.get_post(&post_id) {
        return store_error(e);
    }

    match state.store.like_post(&post_id, &profile.id) {
        Ok(like) => HttpResponse::Created().json(ApiResponse::success(like)),
        Err(StoreError::Conflict(_)) => {
            // Already liked, report current state
            let count = state.store.count_likes(&post_id).unwrap_or(0);
            HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
                "liked": true,
                "like_count": count,
            })))
        }
        Err(e) => store_error(e),
    }
}

pub async fn unlike_post(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match state.store.unlike_post(&path.into_inner(), &profile.id) {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => store_error(e),
    }
}

// ==================== Listing Endpoints ====================

#[derive(Deserialize)]
pub struct ListListingsQuery {
    min_price: Option<f64>,
    max_price: Option<f64>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    area: Option<String>,
}

pub async fn list_listings(
    state: web::Data<AppState>,
    query: web::Query<ListListingsQuery>,
) -> impl Responder {
    let filter = ListingFilter {
        min_price: query.min_price,
        max_price: query.max_price,
        start_date: query.start_date,
        end_date: query.end_date,
        area: query.area.clone(),
    };

    match state.store.list_listings(&filter) {
        Ok(listings) => HttpResponse::Ok().json(ApiResponse::success(listings)),
        Err(e) => store_error(e),
    }
}

pub async fn create_listing(
    state: web::Data<AppState>,
    auth: AuthUser,
    body: web::Json<CreateListingRequest>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    if !LISTING_AREAS.contains(&body.area.as_str()) {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Invalid area: {}", body.area)));
    }

    // Fail-soft geocoding: a listing without coordinates is still a listing
    let (latitude, longitude) = match &state.geocoder {
        Some(geocoder) => geocoder.geocode(&body.address).await,
        None => (None, None),
    };

    let mut listing = Listing {
        id: String::new(),
        host_id: profile.id.clone(),
        title: body.title.clone(),
        description: body.description.clone(),
        price_per_month: body.price_per_month,
        address: body.address.clone(),
        area: body.area.clone(),
        start_date: body.start_date,
        end_date: body.end_date,
        number_of_roommates: body.number_of_roommates,
        latitude,
        longitude,
        is_available: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        photos: Vec::new(),
    };

    match state.store.create_listing(&mut listing, &body.photo_urls) {
        Ok(_) => HttpResponse::Created().json(ApiResponse::success(listing)),
        Err(e) => store_error(e),
    }
}

pub async fn get_listing(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.store.get_listing(&path.into_inner()) {
        Ok(listing) => HttpResponse::Ok().json(ApiResponse::success(listing)),
        Err(e) => store_error(e),
    }
}

pub async fn update_listing(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<UpdateListingRequest>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let id = path.into_inner();
    let mut listing = match state.store.get_listing(&id) {
        Ok(l) => l,
        Err(e) => return store_error(e),
    };

    if listing.host_id != profile.id {
        return HttpResponse::NotFound().json(ApiResponse::<()>::error("Listing not found"));
    }

    if let Some(ref area) = body.area {
        if !LISTING_AREAS.contains(&area.as_str()) {
            return HttpResponse::BadRequest()
                .json(ApiResponse::<()>::error(format!("Invalid area: {}", area)));
        }
        listing.area = area.clone();
    }
    if let Some(ref title) = body.title {
        listing.title = title.clone();
    }
    if let Some(ref description) = body.description {
        listing.description = description.clone();
    }
    if let Some(price) = body.price_per_month {
        listing.price_per_month = price;
    }
    if let Some(start_date) = body.start_date {
        listing.start_date = start_date;
    }
    if let Some(end_date) = body.end_date {
        listing.end_date = end_date;
    }
    if let Some(roommates) = body.number_of_roommates {
        listing.number_of_roommates = roommates;
    }
    if let Some(ref address) = body.address {
        if *address != listing.address {
            listing.address = address.clone();
            let (latitude, longitude) = match &state.geocoder {
                Some(geocoder) => geocoder.geocode(address).await,
                None => (None, None),
            };
            listing.latitude = latitude;
            listing.longitude = longitude;
        }
    }

    match state.store.update_listing(&mut listing) {
        Ok(_) => HttpResponse::Ok().json(ApiResponse::success(listing)),
        Err(e) => store_error(e),
    }
}

pub async fn delete_listing(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let id = path.into_inner();
    match state.store.get_listing(&id) {
        Ok(listing) => {
            if listing.host_id != profile.id {
                return HttpResponse::NotFound()
                    .json(ApiResponse::<()>::error("Listing not found"));
            }
        }
        Err(e) => return store_error(e),
    }

    match state.store.delete_listing(&id) {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => store_error(e),
    }
}

pub async fn my_listings(state: web::Data<AppState>, auth: AuthUser) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match state.store.list_listings_by_host(&profile.id) {
        Ok(listings) => HttpResponse::Ok().json(ApiResponse::success(listings)),
        Err(e) => store_error(e),
    }
}

// ==================== Interest Request Endpoints ====================

pub async fn create_interest_request(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<CreateInterestRequestBody>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let mut request = InterestRequest {
        id: String::new(),
        listing_id: path.into_inner(),
        requester_id: profile.id.clone(),
        message: body.message.clone(),
        status: InterestStatus::Pending,
        created_at: Utc::now(),
    };

    match state.store.create_interest_request(&mut request) {
        Ok(_) => HttpResponse::Created().json(ApiResponse::success(request)),
        Err(e) => store_error(e),
    }
}

/// Interest requests the logged-in user has sent
pub async fn my_interest_requests(state: web::Data<AppState>, auth: AuthUser) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match state.store.list_interest_requests_by_requester(&profile.id) {
        Ok(requests) => HttpResponse::Ok().json(ApiResponse::success(requests)),
        Err(e) => store_error(e),
    }
}

/// Interest requests against the logged-in host's listings
pub async fn manage_interest_requests(
    state: web::Data<AppState>,
    auth: AuthUser,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match state.store.list_interest_requests_for_host(&profile.id) {
        Ok(requests) => HttpResponse::Ok().json(ApiResponse::success(requests)),
        Err(e) => store_error(e),
    }
}

/// Host decision on a pending interest request.
///
/// Accepting is destructive and final: the listing, its photos, and every
/// interest request against it are deleted. The caller must acknowledge
/// this by sending confirm=true. Declining deletes only this request.
pub async fn decide_interest_request(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<String>,
    body: web::Json<DecideInterestRequest>,
) -> impl Responder {
    let profile = match current_profile(&state, &auth) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let id = path.into_inner();
    let request = match state.store.get_interest_request(&id) {
        Ok(r) => r,
        Err(e) => return store_error(e),
    };

    let listing = match state.store.get_listing(&request.listing_id) {
        Ok(l) => l,
        Err(e) => return store_error(e),
    };

    if listing.host_id != profile.id {
        return HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("Interest request not found"));
    }

    match body.status.as_str() {
        "accepted" => {
            if !body.confirm {
                return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
                    "Accepting deletes the listing and all its interest requests; set confirm=true to proceed",
                ));
            }
            match state.store.accept_interest_request(&id) {
                Ok(_) => HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
                    "status": "accepted",
                    "listing_deleted": true,
                }))),
                Err(e) => store_error(e),
            }
        }
        "declined" => match state.store.decline_interest_request(&id) {
            Ok(_) => HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
                "status": "declined",
            }))),
            Err(e) => store_error(e),
        },
        other => HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Invalid status: {}", other))),
    }
}

// ==================== Voter Endpoints ====================

/// Import voter records from a CSV payload. Best-effort: bad rows are
/// logged and skipped, the rest are imported.
pub async fn import_voters(
    state: web::Data<AppState>,
    _auth: AuthUser,
    body: web::Bytes,
) -> impl Responder {
    let csv_text = String::from_utf8_lossy(&body);

    match state.store.import_voters(&csv_text) {
        Ok(summary) => HttpResponse::Ok().json(ApiResponse::success(summary)),
        Err(e) => store_error(e),
    }
}

#[derive(Deserialize)]
pub struct ListVotersQuery {
    party: Option<String>,
    min_year: Option<i32>,
    max_year: Option<i32>,
    voter_score: Option<i32>,
    /// Comma-separated election flags, e.g. "20state,22general"
    elections: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

pub async fn list_voters(
    state: web::Data<AppState>,
    query: web::Query<ListVotersQuery>,
) -> impl Responder {
    let elections = query
        .elections
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    let filter = VoterFilter {
        party: query.party.clone(),
        min_year: query.min_year,
        max_year: query.max_year,
        voter_score: query.voter_score,
        elections,
    };

    let limit = query.limit.unwrap_or(100).min(500);
    let offset = query.offset.unwrap_or(0);

    match state.store.list_voters(&filter, limit, offset) {
        Ok((voters, total)) => HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse {
            items: voters,
            total,
            limit,
            offset,
        })),
        Err(e) => store_error(e),
    }
}

pub async fn voter_stats(state: web::Data<AppState>) -> impl Responder {
    match state.store.voter_stats() {
        Ok(stats) => HttpResponse::Ok().json(ApiResponse::success(stats)),
        Err(e) => store_error(e),
    }
}

pub async fn get_voter(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.store.get_voter(&path.into_inner()) {
        Ok(voter) => HttpResponse::Ok().json(ApiResponse::success(voter)),
        Err(e) => store_error(e),
    }
}

// ==================== Race Result Endpoints ====================

pub async fn create_race_result(
    state: web::Data<AppState>,
    _auth: AuthUser,
    body: web::Json<CreateRaceResultRequest>,
) -> impl Responder {
    let mut result = RaceResult {
        id: String::new(),
        bib_number: body.bib_number,
        first_name: body.first_name.clone(),
        last_name: body.last_name.clone(),
        city: body.city.clone(),
        finish_time: body.finish_time.clone(),
    };

    match state.store.create_race_result(&mut result) {
        Ok(_) => HttpResponse::Created().json(ApiResponse::success(result)),
        Err(e) => store_error(e),
    }
}

#[derive(Deserialize)]
pub struct ListRaceResultsQuery {
    city: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Marathon results, 25 per page by default, optionally filtered by city
pub async fn list_race_results(
    state: web::Data<AppState>,
    query: web::Query<ListRaceResultsQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(25).min(100);
    let offset = query.offset.unwrap_or(0);

    match state
        .store
        .list_race_results(query.city.as_deref(), limit, offset)
    {
        Ok((results, total)) => HttpResponse::Ok().json(ApiResponse::success(PaginatedResponse {
            items: results,
            total,
            limit,
            offset,
        })),
        Err(e) => store_error(e),
    }
}

// ==================== Joke Endpoints ====================

pub async fn create_joke(
    state: web::Data<AppState>,
    _auth: AuthUser,
    body: web::Json<CreateJokeRequest>,
) -> impl Responder {
    let mut joke = Joke {
        id: String::new(),
        joke: body.joke.clone(),
        author: body.author.clone(),
        published: Utc::now(),
    };

    match state.store.create_joke(&mut joke) {
        Ok(_) => HttpResponse::Created().json(ApiResponse::success(joke)),
        Err(e) => store_error(e),
    }
}

pub async fn list_jokes(state: web::Data<AppState>) -> impl Responder {
    match state.store.list_jokes() {
        Ok(jokes) => HttpResponse::Ok().json(ApiResponse::success(jokes)),
        Err(e) => store_error(e),
    }
}

pub async fn get_joke(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.store.get_joke(&path.into_inner()) {
        Ok(joke) => HttpResponse::Ok().json(ApiResponse::success(joke)),
        Err(e) => store_error(e),
    }
}

pub async fn create_picture(
    state: web::Data<AppState>,
    _auth: AuthUser,
    body: web::Json<CreatePictureRequest>,
) -> impl Responder {
    let mut picture = Picture {
        id: String::new(),
        image_url: body.image_url.clone(),
        author: body.author.clone(),
        published: Utc::now(),
    };

    match state.store.create_picture(&mut picture) {
        Ok(_) => HttpResponse::Created().json(ApiResponse::success(picture)),
        Err(e) => store_error(e),
    }
}

pub async fn list_pictures(state: web::Data<AppState>) -> impl Responder {
    match state.store.list_pictures() {
        Ok(pictures) => HttpResponse::Ok().json(ApiResponse::success(pictures)),
        Err(e) => store_error(e),
    }
}

pub async fn get_picture(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.store.get_picture(&path.into_inner()) {
        Ok(picture) => HttpResponse::Ok().json(ApiResponse::success(picture)),
        Err(e) => store_error(e),
    }
}

/// A random joke and picture pair
pub async fn random_joke(state: web::Data<AppState>) -> impl Responder {
    let joke = match state.store.random_joke() {
        Ok(j) => j,
        Err(e) => return store_error(e),
    };
    let picture = state.store.random_picture().ok();

    HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "joke": joke,
        "picture": picture,
    })))
}

// ==================== Quote Endpoints ====================

const QUOTES: &[&str] = &[
    "The best way out is always through.",
    "Simplicity is the ultimate sophistication.",
    "Well done is better than well said.",
    "What we think, we become.",
];

const QUOTE_IMAGES: &[&str] = &[
    "https://images.example.com/quotes/frost.jpg",
    "https://images.example.com/quotes/davinci.jpg",
    "https://images.example.com/quotes/franklin.jpg",
];

/// A random quote of the day with a random image
pub async fn quote_of_the_day() -> impl Responder {
    let mut rng = rand::thread_rng();
    let quote = QUOTES[rng.gen_range(0..QUOTES.len())];
    let image = QUOTE_IMAGES[rng.gen_range(0..QUOTE_IMAGES.len())];

    HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "quote": quote,
        "image": image,
    })))
}

// ==================== Restaurant Endpoints ====================

const MENU: &[(&str, f64)] = &[
    ("Margherita Pizza", 12.50),
    ("Chicken Shawarma", 10.00),
    ("Falafel Plate", 9.00),
    ("Greek Salad", 8.50),
];

const DAILY_SPECIALS: &[(&str, f64)] = &[
    ("Lobster Roll", 18.00),
    ("Lamb Kebab", 14.50),
    ("Stuffed Grape Leaves", 11.00),
];

fn menu_items() -> Vec<MenuItem> {
    MENU.iter()
        .map(|(name, price)| MenuItem {
            name: name.to_string(),
            price: *price,
        })
        .collect()
}

/// The menu plus a randomly selected daily special
pub async fn get_menu() -> impl Responder {
    let mut rng = rand::thread_rng();
    let (name, price) = DAILY_SPECIALS[rng.gen_range(0..DAILY_SPECIALS.len())];

    HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "items": menu_items(),
        "daily_special": MenuItem {
            name: name.to_string(),
            price,
        },
    })))
}

/// Submit an order: totals the selected items and picks a ready time
/// 30 to 60 minutes out
pub async fn submit_order(body: web::Json<OrderRequest>) -> impl Responder {
    let all_items: Vec<MenuItem> = MENU
        .iter()
        .chain(DAILY_SPECIALS.iter())
        .map(|(name, price)| MenuItem {
            name: name.to_string(),
            price: *price,
        })
        .collect();

    let mut ordered = Vec::new();
    for wanted in &body.items {
        match all_items.iter().find(|item| item.name == *wanted) {
            Some(item) => ordered.push(item.clone()),
            None => {
                return HttpResponse::BadRequest()
                    .json(ApiResponse::<()>::error(format!("Unknown item: {}", wanted)))
            }
        }
    }

    if ordered.is_empty() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("Order must contain at least one item"));
    }

    let total = ordered.iter().map(|item| item.price).sum();
    let minutes = rand::thread_rng().gen_range(30..=60);

    HttpResponse::Ok().json(ApiResponse::success(OrderReceipt {
        customer_name: body.customer_name.clone(),
        items: ordered,
        total,
        ready_at: Utc::now() + Duration::minutes(minutes),
    }))
}

// ==================== Route Configuration ====================

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(health))
        // Auth
        .route("/api/auth/register", web::post().to(register))
        .route("/api/auth/login", web::post().to(login))
        .route("/api/auth/me", web::get().to(get_current_user))
        // Profiles & social graph
        .route("/api/profiles", web::get().to(list_profiles))
        .route("/api/profiles", web::post().to(create_profile))
        .route("/api/profiles/me", web::get().to(get_my_profile))
        .route("/api/profiles/me", web::put().to(update_my_profile))
        .route("/api/profiles/{id}", web::get().to(get_profile))
        .route("/api/profiles/{id}/followers", web::get().to(get_followers))
        .route("/api/profiles/{id}/following", web::get().to(get_following))
        .route("/api/profiles/{id}/follow", web::post().to(follow_profile))
        .route("/api/profiles/{id}/follow", web::delete().to(unfollow_profile))
        .route("/api/profiles/{id}/posts", web::get().to(list_profile_posts))
        .route("/api/feed", web::get().to(get_feed))
        // Posts
        .route("/api/posts", web::post().to(create_post))
        .route("/api/posts/{id}", web::get().to(get_post))
        .route("/api/posts/{id}", web::put().to(update_post))
        .route("/api/posts/{id}", web::delete().to(delete_post))
        .route("/api/posts/{id}/comments", web::post().to(create_comment))
        .route("/api/posts/{id}/comments", web::get().to(list_comments))
        .route("/api/posts/{id}/like", web::post().to(like_post))
        .route("/api/posts/{id}/like", web::delete().to(unlike_post))
        // Listings
        .route("/api/listings", web::get().to(list_listings))
        .route("/api/listings", web::post().to(create_listing))
        .route("/api/listings/{id}", web::get().to(get_listing))
        .route("/api/listings/{id}", web::put().to(update_listing))
        .route("/api/listings/{id}", web::delete().to(delete_listing))
        .route("/api/my/listings", web::get().to(my_listings))
        // Interest requests
        .route(
            "/api/listings/{id}/interest",
            web::post().to(create_interest_request),
        )
        .route(
            "/api/my/interest-requests",
            web::get().to(my_interest_requests),
        )
        .route(
            "/api/manage/interest-requests",
            web::get().to(manage_interest_requests),
        )
        .route(
            "/api/interest-requests/{id}/decision",
            web::post().to(decide_interest_request),
        )
        // Voters
        .route("/api/voters/import", web::post().to(import_voters))
        .route("/api/voters/stats", web::get().to(voter_stats))
        .route("/api/voters", web::get().to(list_voters))
        .route("/api/voters/{id}", web::get().to(get_voter))
        // Race results
        .route("/api/results", web::get().to(list_race_results))
        .route("/api/results", web::post().to(create_race_result))
        // Jokes
        .route("/api/jokes/random", web::get().to(random_joke))
        .route("/api/jokes", web::get().to(list_jokes))
        .route("/api/jokes", web::post().to(create_joke))
        .route("/api/jokes/{id}", web::get().to(get_joke))
        .route("/api/pictures", web::get().to(list_pictures))
        .route("/api/pictures", web::post().to(create_picture))
        .route("/api/pictures/{id}", web::get().to(get_picture))
        // Quotes
        .route("/api/quote", web::get().to(quote_of_the_day))
        // Restaurant
        .route("/api/menu", web::get().to(get_menu))
        .route("/api/orders", web::post().to(submit_order));
}
