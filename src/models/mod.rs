use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User is the authentication account. Application identity lives on Profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile is the public identity a User acts through.
/// Posts, follows, listings, and interest requests all hang off Profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub display_name: String,
    pub role: String,
    pub bio: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile roles in the marketplace
pub const PROFILE_ROLES: &[&str] = &["member", "host", "subletter"];

/// Post belongs to one Profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub profile_id: String,
    pub caption: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub photos: Vec<PostPhoto>,
}

/// PostPhoto stores an image URL attached to a Post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPhoto {
    pub id: String,
    pub post_id: String,
    pub image_url: String,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

/// Comment is a Profile's remark on a Post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub profile_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Like is an edge between a Profile and a Post.
/// At most one per pair, enforced by a UNIQUE constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: String,
    pub post_id: String,
    pub profile_id: String,
    pub created_at: DateTime<Utc>,
}

/// Follow is a directed edge: follower_id follows profile_id.
/// At most one per ordered pair, and a Profile cannot follow itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: String,
    pub profile_id: String,
    pub follower_id: String,
    pub created_at: DateTime<Utc>,
}

/// Listing is a sublet posted by a host Profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub host_id: String,
    pub title: String,
    pub description: String,
    pub price_per_month: f64,
    pub address: String,
    pub area: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_roommates: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub photos: Vec<ListingPhoto>,
}

/// Valid listing areas (used for filtering)
pub const LISTING_AREAS: &[&str] = &[
    "west", "mid", "east", "south", "fenway", "kenmore", "backbay", "brookline",
    "cambridge", "allston", "brighton", "somerville", "medford", "seaport",
    "downtown",
];

/// ListingPhoto stores an image URL for a Listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPhoto {
    pub id: String,
    pub listing_id: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// InterestRequest is a subletter's message to a host about a Listing.
/// Lifecycle: pending -> accepted | declined, both terminal.
/// Accepting removes the listing and every sibling request in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestRequest {
    pub id: String,
    pub listing_id: String,
    pub requester_id: String,
    pub message: String,
    pub status: InterestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterestStatus {
    Pending,
    Accepted,
    Declined,
}

impl InterestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestStatus::Pending => "pending",
            InterestStatus::Accepted => "accepted",
            InterestStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InterestStatus::Pending),
            "accepted" => Some(InterestStatus::Accepted),
            "declined" => Some(InterestStatus::Declined),
            _ => None,
        }
    }
}

/// Voter is one row of the imported voter records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub address_street_number: String,
    pub address_street_name: String,
    pub address_apartment_number: Option<String>,
    pub address_zip_code: String,
    pub date_birth: NaiveDate,
    pub date_registration: Option<NaiveDate>,
    pub party: Option<String>,
    pub precinct_number: Option<String>,
    pub v20state: bool,
    pub v21town: bool,
    pub v21primary: bool,
    pub v22general: bool,
    pub v23town: bool,
    pub voter_score: i32,
}

/// Election flags voters can be filtered by
pub const ELECTIONS: &[&str] = &["20state", "21town", "21primary", "22general", "23town"];

/// Result is one finisher's record in the marathon results table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceResult {
    pub id: String,
    pub bib_number: i32,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub finish_time: String,
}

/// Joke for the dadjokes app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Joke {
    pub id: String,
    pub joke: String,
    pub author: String,
    pub published: DateTime<Utc>,
}

/// Picture for the dadjokes app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Picture {
    pub id: String,
    pub image_url: String,
    pub author: String,
    pub published: DateTime<Utc>,
}

// Request/Response types for API

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub display_name: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub image_url: String,
}

fn default_role() -> String {
    "member".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub caption: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub caption: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub price_per_month: f64,
    pub address: String,
    pub area: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub number_of_roommates: i32,
    #[serde(default)]
    pub photo_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_per_month: Option<f64>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub number_of_roommates: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInterestRequestBody {
    pub message: String,
}

/// Host decision on an interest request. Accepting deletes the listing and
/// every request against it, so it must be confirmed explicitly.
#[derive(Debug, Deserialize)]
pub struct DecideInterestRequest {
    pub status: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct VoterStats {
    pub total: i64,
    pub by_birth_year: Vec<YearCount>,
    pub by_party: Vec<LabelCount>,
    pub by_score: Vec<LabelCount>,
    pub by_election: Vec<LabelCount>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRaceResultRequest {
    pub bib_number: i32,
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub finish_time: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateJokeRequest {
    pub joke: String,
    pub author: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePictureRequest {
    pub image_url: String,
    pub author: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub customer_name: String,
    pub items: Vec<String>,
    #[serde(default)]
    pub special_instructions: String,
}

#[derive(Debug, Serialize)]
pub struct OrderReceipt {
    pub customer_name: String,
    pub items: Vec<MenuItem>,
    pub total: f64,
    pub ready_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
