use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, Connection, ToSql};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Thread-safe SQLite store
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                user_id TEXT UNIQUE NOT NULL,
                display_name TEXT NOT NULL,
                role TEXT DEFAULT 'member',
                bio TEXT DEFAULT '',
                image_url TEXT DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            );

            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                profile_id TEXT NOT NULL,
                caption TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (profile_id) REFERENCES profiles(id)
            );

            CREATE TABLE IF NOT EXISTS post_photos (
                id TEXT PRIMARY KEY,
                post_id TEXT NOT NULL,
                image_url TEXT NOT NULL,
                order_index INTEGER DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (post_id) REFERENCES posts(id)
            );

            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY,
                post_id TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (post_id) REFERENCES posts(id),
                FOREIGN KEY (profile_id) REFERENCES profiles(id)
            );

            CREATE TABLE IF NOT EXISTS likes (
                id TEXT PRIMARY KEY,
                post_id TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (post_id) REFERENCES posts(id),
                FOREIGN KEY (profile_id) REFERENCES profiles(id),
                UNIQUE(post_id, profile_id)
            );

            CREATE TABLE IF NOT EXISTS follows (
                id TEXT PRIMARY KEY,
                profile_id TEXT NOT NULL,
                follower_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (profile_id) REFERENCES profiles(id),
                FOREIGN KEY (follower_id) REFERENCES profiles(id),
                UNIQUE(profile_id, follower_id)
            );

            CREATE TABLE IF NOT EXISTS listings (
                id TEXT PRIMARY KEY,
                host_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT DEFAULT '',
                price_per_month REAL NOT NULL,
                address TEXT NOT NULL,
                area TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                number_of_roommates INTEGER DEFAULT 0,
                latitude REAL,
                longitude REAL,
                is_available INTEGER DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (host_id) REFERENCES profiles(id)
            );

            CREATE TABLE IF NOT EXISTS listing_photos (
                id TEXT PRIMARY KEY,
                listing_id TEXT NOT NULL,
                image_url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (listing_id) REFERENCES listings(id)
            );

            CREATE TABLE IF NOT EXISTS interest_requests (
                id TEXT PRIMARY KEY,
                listing_id TEXT NOT NULL,
                requester_id TEXT NOT NULL,
                message TEXT NOT NULL,
                status TEXT DEFAULT 'pending',
                created_at TEXT NOT NULL,
                FOREIGN KEY (listing_id) REFERENCES listings(id),
                FOREIGN KEY (requester_id) REFERENCES profiles(id)
            );

            CREATE TABLE IF NOT EXISTS voters (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                address_street_number TEXT DEFAULT '',
                address_street_name TEXT DEFAULT '',
                address_apartment_number TEXT,
                address_zip_code TEXT DEFAULT '',
                date_birth TEXT NOT NULL,
                date_registration TEXT,
                party TEXT,
                precinct_number TEXT,
                v20state INTEGER DEFAULT 0,
                v21town INTEGER DEFAULT 0,
                v21primary INTEGER DEFAULT 0,
                v22general INTEGER DEFAULT 0,
                v23town INTEGER DEFAULT 0,
                voter_score INTEGER DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS race_results (
                id TEXT PRIMARY KEY,
                bib_number INTEGER NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                city TEXT DEFAULT '',
                finish_time TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS jokes (
                id TEXT PRIMARY KEY,
                joke TEXT NOT NULL,
                author TEXT NOT NULL,
                published TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS pictures (
                id TEXT PRIMARY KEY,
                image_url TEXT NOT NULL,
                author TEXT NOT NULL,
                published TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_posts_profile_id ON posts(profile_id);
            CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);
            CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id);
            CREATE INDEX IF NOT EXISTS idx_likes_post_id ON likes(post_id);
            CREATE INDEX IF NOT EXISTS idx_follows_profile_id ON follows(profile_id);
            CREATE INDEX IF NOT EXISTS idx_follows_follower_id ON follows(follower_id);
            CREATE INDEX IF NOT EXISTS idx_listings_host_id ON listings(host_id);
            CREATE INDEX IF NOT EXISTS idx_listings_area ON listings(area);
            CREATE INDEX IF NOT EXISTS idx_interest_requests_listing_id ON interest_requests(listing_id);
            CREATE INDEX IF NOT EXISTS idx_interest_requests_requester_id ON interest_requests(requester_id);
            CREATE INDEX IF NOT EXISTS idx_voters_party ON voters(party);
            CREATE INDEX IF NOT EXISTS idx_race_results_city ON race_results(city);
            "#,
        )?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub fn create_user(&self, user: &mut User) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        user.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        user.created_at = now;
        user.updated_at = now;

        conn.execute(
            r#"INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                &user.id,
                &user.username,
                &user.email,
                &user.password_hash,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| conflict_on_constraint(e, "Username or email already taken"))?;
        Ok(())
    }

    pub fn get_user(&self, id: &str) -> StoreResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], |row| {
            row_to_user(row)
        })
        .map_err(|e| not_found(e, format!("User {}", id)))
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM users WHERE username = ?1",
            params![username],
            |row| row_to_user(row),
        )
        .map_err(|e| not_found(e, format!("User {}", username)))
    }

    // ==================== Profile Operations ====================

    pub fn create_profile(&self, profile: &mut Profile) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        profile.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        profile.created_at = now;
        profile.updated_at = now;
        if profile.role.is_empty() {
            profile.role = "member".to_string();
        }

        conn.execute(
            r#"INSERT INTO profiles (id, user_id, display_name, role, bio, image_url, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                &profile.id,
                &profile.user_id,
                &profile.display_name,
                &profile.role,
                &profile.bio,
                &profile.image_url,
                profile.created_at.to_rfc3339(),
                profile.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| conflict_on_constraint(e, "Profile already exists for this user"))?;
        Ok(())
    }

    pub fn get_profile(&self, id: &str) -> StoreResult<Profile> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM profiles WHERE id = ?1",
            params![id],
            |row| row_to_profile(row),
        )
        .map_err(|e| not_found(e, format!("Profile {}", id)))
    }

    pub fn get_profile_by_user(&self, user_id: &str) -> StoreResult<Profile> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM profiles WHERE user_id = ?1",
            params![user_id],
            |row| row_to_profile(row),
        )
        .map_err(|e| not_found(e, format!("Profile for user {}", user_id)))
    }

    pub fn update_profile(&self, profile: &mut Profile) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        profile.updated_at = Utc::now();

        let rows = conn.execute(
            r#"UPDATE profiles SET display_name = ?1, role = ?2, bio = ?3, image_url = ?4, updated_at = ?5
               WHERE id = ?6"#,
            params![
                &profile.display_name,
                &profile.role,
                &profile.bio,
                &profile.image_url,
                profile.updated_at.to_rfc3339(),
                &profile.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("Profile {}", profile.id)));
        }
        Ok(())
    }

    pub fn list_profiles(&self, role: Option<&str>) -> StoreResult<Vec<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut profiles = Vec::new();

        if let Some(r) = role {
            let mut stmt = conn.prepare(
                "SELECT * FROM profiles WHERE role = ?1 ORDER BY display_name ASC",
            )?;
            let rows = stmt.query_map(params![r], |row| row_to_profile(row))?;
            for row in rows {
                profiles.push(row?);
            }
        } else {
            let mut stmt = conn.prepare("SELECT * FROM profiles ORDER BY display_name ASC")?;
            let rows = stmt.query_map([], |row| row_to_profile(row))?;
            for row in rows {
                profiles.push(row?);
            }
        }

        Ok(profiles)
    }

    pub fn search_profiles(&self, query: &str) -> StoreResult<Vec<Profile>> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            "SELECT * FROM profiles WHERE display_name LIKE ?1 ORDER BY display_name ASC",
        )?;
        let rows = stmt.query_map(params![pattern], |row| row_to_profile(row))?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    // ==================== Post Operations ====================

    pub fn create_post(&self, post: &mut Post, photo_urls: &[String]) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        post.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        post.created_at = now;
        post.updated_at = now;

        let tx = conn.transaction()?;
        tx.execute(
            r#"INSERT INTO posts (id, profile_id, caption, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                &post.id,
                &post.profile_id,
                &post.caption,
                post.created_at.to_rfc3339(),
                post.updated_at.to_rfc3339(),
            ],
        )?;

        for (i, url) in photo_urls.iter().enumerate() {
            let photo = PostPhoto {
                id: Uuid::new_v4().to_string(),
                post_id: post.id.clone(),
                image_url: url.clone(),
                order_index: i as i32,
                created_at: now,
            };
            tx.execute(
                r#"INSERT INTO post_photos (id, post_id, image_url, order_index, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5)"#,
                params![
                    &photo.id,
                    &photo.post_id,
                    &photo.image_url,
                    photo.order_index,
                    photo.created_at.to_rfc3339(),
                ],
            )?;
            post.photos.push(photo);
        }

        tx.commit()?;
        Ok(())
    }

    pub fn get_post(&self, id: &str) -> StoreResult<Post> {
        let conn = self.conn.lock().unwrap();
        let post = conn
            .query_row("SELECT * FROM posts WHERE id = ?1", params![id], |row| {
                row_to_post(row)
            })
            .map_err(|e| not_found(e, format!("Post {}", id)))?;

        drop(conn);
        let mut post = post;
        post.photos = self.get_post_photos(&post.id)?;
        Ok(post)
    }

    pub fn list_posts_by_profile(&self, profile_id: &str) -> StoreResult<Vec<Post>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM posts WHERE profile_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![profile_id], |row| row_to_post(row))?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }

        drop(stmt);
        drop(conn);
        for post in &mut posts {
            post.photos = self.get_post_photos(&post.id)?;
        }
        Ok(posts)
    }

    pub fn update_post(&self, post: &mut Post) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        post.updated_at = Utc::now();

        let rows = conn.execute(
            "UPDATE posts SET caption = ?1, updated_at = ?2 WHERE id = ?3",
            params![&post.caption, post.updated_at.to_rfc3339(), &post.id],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("Post {}", post.id)));
        }
        Ok(())
    }

    /// Delete a post along with its photos, comments, and likes
    pub fn delete_post(&self, id: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM likes WHERE post_id = ?1", params![id])?;
        tx.execute("DELETE FROM comments WHERE post_id = ?1", params![id])?;
        tx.execute("DELETE FROM post_photos WHERE post_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM posts WHERE id = ?1", params![id])?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("Post {}", id)));
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_post_photos(&self, post_id: &str) -> StoreResult<Vec<PostPhoto>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM post_photos WHERE post_id = ?1 ORDER BY order_index ASC",
        )?;
        let rows = stmt.query_map(params![post_id], |row| {
            Ok(PostPhoto {
                id: row.get("id")?,
                post_id: row.get("post_id")?,
                image_url: row.get("image_url")?,
                order_index: row.get("order_index")?,
                created_at: parse_datetime(row.get::<_, String>("created_at")?),
            })
        })?;

        let mut photos = Vec::new();
        for row in rows {
            photos.push(row?);
        }
        Ok(photos)
    }

    // ==================== Comment Operations ====================

    pub fn create_comment(&self, comment: &mut Comment) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        comment.id = Uuid::new_v4().to_string();
        comment.created_at = Utc::now();

        conn.execute(
            r#"INSERT INTO comments (id, post_id, profile_id, text, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                &comment.id,
                &comment.post_id,
                &comment.profile_id,
                &comment.text,
                comment.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_comments(&self, post_id: &str) -> StoreResult<Vec<Comment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM comments WHERE post_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![post_id], |row| {
            Ok(Comment {
                id: row.get("id")?,
                post_id: row.get("post_id")?,
                profile_id: row.get("profile_id")?,
                text: row.get("text")?,
                created_at: parse_datetime(row.get::<_, String>("created_at")?),
            })
        })?;

        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    // ==================== Like Operations ====================

    /// Record a like. The UNIQUE(post_id, profile_id) constraint makes the
    /// duplicate-insert race a Conflict instead of a second row.
    pub fn like_post(&self, post_id: &str, profile_id: &str) -> StoreResult<Like> {
        let conn = self.conn.lock().unwrap();
        let like = Like {
            id: Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            profile_id: profile_id.to_string(),
            created_at: Utc::now(),
        };

        conn.execute(
            r#"INSERT INTO likes (id, post_id, profile_id, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                &like.id,
                &like.post_id,
                &like.profile_id,
                like.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| conflict_on_constraint(e, "Post already liked"))?;
        Ok(like)
    }

    pub fn unlike_post(&self, post_id: &str, profile_id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM likes WHERE post_id = ?1 AND profile_id = ?2",
            params![post_id, profile_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("Like".to_string()));
        }
        Ok(())
    }

    pub fn count_likes(&self, post_id: &str) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn is_liked_by(&self, post_id: &str, profile_id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND profile_id = ?2",
            params![post_id, profile_id],
            |row| row.get(0),
        )?;
        Ok(exists > 0)
    }

    // ==================== Follow Operations ====================

    /// Create a follow edge. Self-follows are rejected, and the
    /// UNIQUE(profile_id, follower_id) constraint rejects duplicates.
    pub fn follow(&self, profile_id: &str, follower_id: &str) -> StoreResult<Follow> {
        if profile_id == follower_id {
            return Err(StoreError::Conflict(
                "A profile cannot follow itself".to_string(),
            ));
        }

        let conn = self.conn.lock().unwrap();
        let follow = Follow {
            id: Uuid::new_v4().to_string(),
            profile_id: profile_id.to_string(),
            follower_id: follower_id.to_string(),
            created_at: Utc::now(),
        };

        conn.execute(
            r#"INSERT INTO follows (id, profile_id, follower_id, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                &follow.id,
                &follow.profile_id,
                &follow.follower_id,
                follow.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| conflict_on_constraint(e, "Already following this profile"))?;
        Ok(follow)
    }

    pub fn unfollow(&self, profile_id: &str, follower_id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM follows WHERE profile_id = ?1 AND follower_id = ?2",
            params![profile_id, follower_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound("Follow".to_string()));
        }
        Ok(())
    }

    /// Profiles that follow the given profile
    pub fn get_followers(&self, profile_id: &str) -> StoreResult<Vec<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"SELECT p.* FROM profiles p
               JOIN follows f ON f.follower_id = p.id
               WHERE f.profile_id = ?1
               ORDER BY f.created_at DESC"#,
        )?;
        let rows = stmt.query_map(params![profile_id], |row| row_to_profile(row))?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    /// Profiles the given profile follows
    pub fn get_following(&self, profile_id: &str) -> StoreResult<Vec<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"SELECT p.* FROM profiles p
               JOIN follows f ON f.profile_id = p.id
               WHERE f.follower_id = ?1
               ORDER BY f.created_at DESC"#,
        )?;
        let rows = stmt.query_map(params![profile_id], |row| row_to_profile(row))?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    pub fn count_followers(&self, profile_id: &str) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE profile_id = ?1",
            params![profile_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_following(&self, profile_id: &str) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
            params![profile_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn is_followed_by(&self, profile_id: &str, follower_id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE profile_id = ?1 AND follower_id = ?2",
            params![profile_id, follower_id],
            |row| row.get(0),
        )?;
        Ok(exists > 0)
    }

    /// Posts authored by profiles the given profile follows, newest first
    pub fn get_feed(&self, profile_id: &str, limit: i64, offset: i64) -> StoreResult<Vec<Post>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"SELECT po.* FROM posts po
               JOIN follows f ON po.profile_id = f.profile_id
               WHERE f.follower_id = ?1
               ORDER BY po.created_at DESC
               LIMIT ?2 OFFSET ?3"#,
        )?;
        let rows = stmt.query_map(params![profile_id, limit, offset], |row| row_to_post(row))?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }

        drop(stmt);
        drop(conn);
        for post in &mut posts {
            post.photos = self.get_post_photos(&post.id)?;
        }
        Ok(posts)
    }

    // ==================== Listing Operations ====================

    pub fn create_listing(&self, listing: &mut Listing, photo_urls: &[String]) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        listing.id = Uuid::new_v4().to_string();
        let now = Utc::now();
        listing.created_at = now;
        listing.updated_at = now;
        listing.is_available = true;

        let tx = conn.transaction()?;
        tx.execute(
            r#"INSERT INTO listings (id, host_id, title, description, price_per_month, address,
                area, start_date, end_date, number_of_roommates, latitude, longitude,
                is_available, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
            params![
                &listing.id,
                &listing.host_id,
                &listing.title,
                &listing.description,
                listing.price_per_month,
                &listing.address,
                &listing.area,
                listing.start_date.to_string(),
                listing.end_date.to_string(),
                listing.number_of_roommates,
                listing.latitude,
                listing.longitude,
                listing.is_available,
                listing.created_at.to_rfc3339(),
                listing.updated_at.to_rfc3339(),
            ],
        )?;

        for url in photo_urls {
            let photo = ListingPhoto {
                id: Uuid::new_v4().to_string(),
                listing_id: listing.id.clone(),
                image_url: url.clone(),
                created_at: now,
            };
            tx.execute(
                r#"INSERT INTO listing_photos (id, listing_id, image_url, created_at)
                   VALUES (?1, ?2, ?3, ?4)"#,
                params![
                    &photo.id,
                    &photo.listing_id,
                    &photo.image_url,
                    photo.created_at.to_rfc3339(),
                ],
            )?;
            listing.photos.push(photo);
        }

        tx.commit()?;
        Ok(())
    }

    pub fn get_listing(&self, id: &str) -> StoreResult<Listing> {
        let conn = self.conn.lock().unwrap();
        let listing = conn
            .query_row("SELECT * FROM listings WHERE id = ?1", params![id], |row| {
                row_to_listing(row)
            })
            .map_err(|e| not_found(e, format!("Listing {}", id)))?;

        drop(conn);
        let mut listing = listing;
        listing.photos = self.get_listing_photos(&listing.id)?;
        Ok(listing)
    }

    pub fn update_listing(&self, listing: &mut Listing) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        listing.updated_at = Utc::now();

        let rows = conn.execute(
            r#"UPDATE listings SET title = ?1, description = ?2, price_per_month = ?3,
               address = ?4, area = ?5, start_date = ?6, end_date = ?7,
               number_of_roommates = ?8, latitude = ?9, longitude = ?10,
               is_available = ?11, updated_at = ?12
               WHERE id = ?13"#,
            params![
                &listing.title,
                &listing.description,
                listing.price_per_month,
                &listing.address,
                &listing.area,
                listing.start_date.to_string(),
                listing.end_date.to_string(),
                listing.number_of_roommates,
                listing.latitude,
                listing.longitude,
                listing.is_available,
                listing.updated_at.to_rfc3339(),
                &listing.id,
            ],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("Listing {}", listing.id)));
        }
        Ok(())
    }

    /// Delete a listing along with its photos and interest requests
    pub fn delete_listing(&self, id: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM interest_requests WHERE listing_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM listing_photos WHERE listing_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM listings WHERE id = ?1", params![id])?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("Listing {}", id)));
        }
        tx.commit()?;
        Ok(())
    }

    /// List listings matching the given filters, newest first
    pub fn list_listings(&self, filter: &ListingFilter) -> StoreResult<Vec<Listing>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from("SELECT * FROM listings WHERE 1=1");
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(min_price) = filter.min_price {
            sql.push_str(" AND price_per_month >= ?");
            args.push(Box::new(min_price));
        }
        if let Some(max_price) = filter.max_price {
            sql.push_str(" AND price_per_month <= ?");
            args.push(Box::new(max_price));
        }
        if let Some(start_date) = filter.start_date {
            sql.push_str(" AND start_date <= ?");
            args.push(Box::new(start_date.to_string()));
        }
        if let Some(end_date) = filter.end_date {
            sql.push_str(" AND end_date >= ?");
            args.push(Box::new(end_date.to_string()));
        }
        if let Some(ref area) = filter.area {
            sql.push_str(" AND area = ?");
            args.push(Box::new(area.clone()));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| row_to_listing(row),
        )?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }

        drop(stmt);
        drop(conn);
        for listing in &mut listings {
            listing.photos = self.get_listing_photos(&listing.id)?;
        }
        Ok(listings)
    }

    pub fn list_listings_by_host(&self, host_id: &str) -> StoreResult<Vec<Listing>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM listings WHERE host_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![host_id], |row| row_to_listing(row))?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }

        drop(stmt);
        drop(conn);
        for listing in &mut listings {
            listing.photos = self.get_listing_photos(&listing.id)?;
        }
        Ok(listings)
    }

    pub fn get_listing_photos(&self, listing_id: &str) -> StoreResult<Vec<ListingPhoto>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM listing_photos WHERE listing_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![listing_id], |row| {
            Ok(ListingPhoto {
                id: row.get("id")?,
                listing_id: row.get("listing_id")?,
                image_url: row.get("image_url")?,
                created_at: parse_datetime(row.get::<_, String>("created_at")?),
            })
        })?;

        let mut photos = Vec::new();
        for row in rows {
            photos.push(row?);
        }
        Ok(photos)
    }

    // ==================== Interest Request Operations ====================

    pub fn create_interest_request(&self, request: &mut InterestRequest) -> StoreResult<()> {
        let listing = self.get_listing(&request.listing_id)?;
        if listing.host_id == request.requester_id {
            return Err(StoreError::Conflict(
                "Cannot request interest in your own listing".to_string(),
            ));
        }

        let conn = self.conn.lock().unwrap();
        request.id = Uuid::new_v4().to_string();
        request.status = InterestStatus::Pending;
        request.created_at = Utc::now();

        conn.execute(
            r#"INSERT INTO interest_requests (id, listing_id, requester_id, message, status, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                &request.id,
                &request.listing_id,
                &request.requester_id,
                &request.message,
                request.status.as_str(),
                request.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_interest_request(&self, id: &str) -> StoreResult<InterestRequest> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM interest_requests WHERE id = ?1",
            params![id],
            |row| row_to_interest_request(row),
        )
        .map_err(|e| not_found(e, format!("Interest request {}", id)))
    }

    pub fn list_interest_requests_by_requester(
        &self,
        requester_id: &str,
    ) -> StoreResult<Vec<InterestRequest>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM interest_requests WHERE requester_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![requester_id], |row| row_to_interest_request(row))?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }

    /// Interest requests against all listings owned by the given host
    pub fn list_interest_requests_for_host(
        &self,
        host_id: &str,
    ) -> StoreResult<Vec<InterestRequest>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"SELECT ir.* FROM interest_requests ir
               JOIN listings l ON ir.listing_id = l.id
               WHERE l.host_id = ?1
               ORDER BY ir.created_at DESC"#,
        )?;
        let rows = stmt.query_map(params![host_id], |row| row_to_interest_request(row))?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }

    /// Accept a pending interest request. This is destructive and final:
    /// the listing, its photos, and every interest request against it
    /// (including other pending ones) are deleted in one transaction.
    pub fn accept_interest_request(&self, id: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let (listing_id, status): (String, String) = tx
            .query_row(
                "SELECT listing_id, status FROM interest_requests WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| not_found(e, format!("Interest request {}", id)))?;

        if status != "pending" {
            return Err(StoreError::Conflict(format!(
                "Interest request is already {}",
                status
            )));
        }

        tx.execute(
            "DELETE FROM interest_requests WHERE listing_id = ?1",
            params![&listing_id],
        )?;
        tx.execute(
            "DELETE FROM listing_photos WHERE listing_id = ?1",
            params![&listing_id],
        )?;
        tx.execute("DELETE FROM listings WHERE id = ?1", params![&listing_id])?;

        tx.commit()?;
        Ok(())
    }

    /// Decline a pending interest request. Only this request is deleted.
    pub fn decline_interest_request(&self, id: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let status: String = conn
            .query_row(
                "SELECT status FROM interest_requests WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| not_found(e, format!("Interest request {}", id)))?;

        if status != "pending" {
            return Err(StoreError::Conflict(format!(
                "Interest request is already {}",
                status
            )));
        }

        conn.execute("DELETE FROM interest_requests WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ==================== Voter Operations ====================

    /// Best-effort CSV import: header row discarded, bad rows logged and
    /// skipped, everything else committed. No rollback on partial failure.
    pub fn import_voters(&self, csv_text: &str) -> StoreResult<ImportSummary> {
        let conn = self.conn.lock().unwrap();
        let mut summary = ImportSummary {
            imported: 0,
            skipped: 0,
        };

        for line in csv_text.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }

            match parse_voter_line(line) {
                Ok(mut voter) => {
                    voter.id = Uuid::new_v4().to_string();
                    match insert_voter(&conn, &voter) {
                        Ok(_) => summary.imported += 1,
                        Err(e) => {
                            log::warn!("Skipping voter row: {} (line={})", e, line);
                            summary.skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Skipping voter row: {} (line={})", e, line);
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    pub fn get_voter(&self, id: &str) -> StoreResult<Voter> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM voters WHERE id = ?1", params![id], |row| {
            row_to_voter(row)
        })
        .map_err(|e| not_found(e, format!("Voter {}", id)))
    }

    /// List voters matching the filters, ordered by name, with a total count
    pub fn list_voters(
        &self,
        filter: &VoterFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Voter>, i64)> {
        let conn = self.conn.lock().unwrap();

        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref party) = filter.party {
            where_sql.push_str(" AND party = ? COLLATE NOCASE");
            args.push(Box::new(party.clone()));
        }
        if let Some(min_year) = filter.min_year {
            where_sql.push_str(" AND CAST(strftime('%Y', date_birth) AS INTEGER) >= ?");
            args.push(Box::new(min_year));
        }
        if let Some(max_year) = filter.max_year {
            where_sql.push_str(" AND CAST(strftime('%Y', date_birth) AS INTEGER) <= ?");
            args.push(Box::new(max_year));
        }
        if let Some(score) = filter.voter_score {
            where_sql.push_str(" AND voter_score = ?");
            args.push(Box::new(score));
        }
        for election in &filter.elections {
            // Only whitelisted flags become column names
            if ELECTIONS.contains(&election.as_str()) {
                where_sql.push_str(&format!(" AND v{} = 1", election));
            }
        }

        let count_sql = format!("SELECT COUNT(*) FROM voters{}", where_sql);
        let total: i64 = conn.query_row(
            &count_sql,
            params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| row.get(0),
        )?;

        let list_sql = format!(
            "SELECT * FROM voters{} ORDER BY last_name ASC, first_name ASC LIMIT ? OFFSET ?",
            where_sql
        );
        args.push(Box::new(limit));
        args.push(Box::new(offset));

        let mut stmt = conn.prepare(&list_sql)?;
        let rows = stmt.query_map(
            params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| row_to_voter(row),
        )?;

        let mut voters = Vec::new();
        for row in rows {
            voters.push(row?);
        }
        Ok((voters, total))
    }

    /// Aggregate counts behind the voter dashboards
    pub fn voter_stats(&self) -> StoreResult<VoterStats> {
        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM voters", [], |row| row.get(0))?;

        let mut by_birth_year = Vec::new();
        let mut stmt = conn.prepare(
            r#"SELECT CAST(strftime('%Y', date_birth) AS INTEGER) AS year, COUNT(*)
               FROM voters GROUP BY year ORDER BY year ASC"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(YearCount {
                year: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        for row in rows {
            by_birth_year.push(row?);
        }

        let mut by_party = Vec::new();
        let mut stmt = conn.prepare(
            r#"SELECT party, COUNT(*) FROM voters
               WHERE party IS NOT NULL GROUP BY party ORDER BY party ASC"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LabelCount {
                label: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        for row in rows {
            by_party.push(row?);
        }

        let mut by_score = Vec::new();
        let mut stmt = conn.prepare(
            "SELECT voter_score, COUNT(*) FROM voters GROUP BY voter_score ORDER BY voter_score ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let score: i64 = row.get(0)?;
            Ok(LabelCount {
                label: score.to_string(),
                count: row.get(1)?,
            })
        })?;
        for row in rows {
            by_score.push(row?);
        }

        let mut by_election = Vec::new();
        for election in ELECTIONS {
            let count: i64 = conn.query_row(
                &format!("SELECT COALESCE(SUM(v{}), 0) FROM voters", election),
                [],
                |row| row.get(0),
            )?;
            by_election.push(LabelCount {
                label: election.to_string(),
                count,
            });
        }

        Ok(VoterStats {
            total,
            by_birth_year,
            by_party,
            by_score,
            by_election,
        })
    }

    // ==================== Race Result Operations ====================

    pub fn create_race_result(&self, result: &mut RaceResult) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        result.id = Uuid::new_v4().to_string();

        conn.execute(
            r#"INSERT INTO race_results (id, bib_number, first_name, last_name, city, finish_time)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                &result.id,
                result.bib_number,
                &result.first_name,
                &result.last_name,
                &result.city,
                &result.finish_time,
            ],
        )?;
        Ok(())
    }

    /// List race results in bib order, optionally filtered by city,
    /// with a total count for pagination
    pub fn list_race_results(
        &self,
        city: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<RaceResult>, i64)> {
        let conn = self.conn.lock().unwrap();

        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(city) = city {
            where_sql.push_str(" AND city = ? COLLATE NOCASE");
            args.push(Box::new(city.to_string()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM race_results{}", where_sql);
        let total: i64 = conn.query_row(
            &count_sql,
            params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| row.get(0),
        )?;

        let list_sql = format!(
            "SELECT * FROM race_results{} ORDER BY bib_number ASC LIMIT ? OFFSET ?",
            where_sql
        );
        args.push(Box::new(limit));
        args.push(Box::new(offset));

        let mut stmt = conn.prepare(&list_sql)?;
        let rows = stmt.query_map(
            params_from_iter(args.iter().map(|a| a.as_ref())),
            |row| row_to_race_result(row),
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok((results, total))
    }

    // ==================== Joke Operations ====================

    pub fn create_joke(&self, joke: &mut Joke) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        joke.id = Uuid::new_v4().to_string();
        joke.published = Utc::now();

        conn.execute(
            "INSERT INTO jokes (id, joke, author, published) VALUES (?1, ?2, ?3, ?4)",
            params![
                &joke.id,
                &joke.joke,
                &joke.author,
                joke.published.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_joke(&self, id: &str) -> StoreResult<Joke> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM jokes WHERE id = ?1", params![id], |row| {
            row_to_joke(row)
        })
        .map_err(|e| not_found(e, format!("Joke {}", id)))
    }

    pub fn list_jokes(&self) -> StoreResult<Vec<Joke>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM jokes ORDER BY published DESC")?;
        let rows = stmt.query_map([], |row| row_to_joke(row))?;

        let mut jokes = Vec::new();
        for row in rows {
            jokes.push(row?);
        }
        Ok(jokes)
    }

    pub fn random_joke(&self) -> StoreResult<Joke> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM jokes ORDER BY RANDOM() LIMIT 1", [], |row| {
            row_to_joke(row)
        })
        .map_err(|e| not_found(e, "Joke".to_string()))
    }

    pub fn create_picture(&self, picture: &mut Picture) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        picture.id = Uuid::new_v4().to_string();
        picture.published = Utc::now();

        conn.execute(
            "INSERT INTO pictures (id, image_url, author, published) VALUES (?1, ?2, ?3, ?4)",
            params![
                &picture.id,
                &picture.image_url,
                &picture.author,
                picture.published.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_picture(&self, id: &str) -> StoreResult<Picture> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT * FROM pictures WHERE id = ?1", params![id], |row| {
            row_to_picture(row)
        })
        .map_err(|e| not_found(e, format!("Picture {}", id)))
    }

    pub fn list_pictures(&self) -> StoreResult<Vec<Picture>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM pictures ORDER BY published DESC")?;
        let rows = stmt.query_map([], |row| row_to_picture(row))?;

        let mut pictures = Vec::new();
        for row in rows {
            pictures.push(row?);
        }
        Ok(pictures)
    }

    pub fn random_picture(&self) -> StoreResult<Picture> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT * FROM pictures ORDER BY RANDOM() LIMIT 1",
            [],
            |row| row_to_picture(row),
        )
        .map_err(|e| not_found(e, "Picture".to_string()))
    }
}

/// Filters for the marketplace listing index
#[derive(Debug, Default)]
pub struct ListingFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub area: Option<String>,
}

/// Filters for the voter list
#[derive(Debug, Default)]
pub struct VoterFilter {
    pub party: Option<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub voter_score: Option<i32>,
    pub elections: Vec<String>,
}

// ==================== Row Mappers & Helpers ====================

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}

fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        display_name: row.get("display_name")?,
        role: row.get("role")?,
        bio: row.get("bio")?,
        image_url: row.get("image_url")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
    })
}

fn row_to_post(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get("id")?,
        profile_id: row.get("profile_id")?,
        caption: row.get("caption")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
        photos: Vec::new(),
    })
}

fn row_to_listing(row: &rusqlite::Row) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get("id")?,
        host_id: row.get("host_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        price_per_month: row.get("price_per_month")?,
        address: row.get("address")?,
        area: row.get("area")?,
        start_date: parse_date(row.get::<_, String>("start_date")?),
        end_date: parse_date(row.get::<_, String>("end_date")?),
        number_of_roommates: row.get("number_of_roommates")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        is_available: row.get("is_available")?,
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
        photos: Vec::new(),
    })
}

fn row_to_interest_request(row: &rusqlite::Row) -> rusqlite::Result<InterestRequest> {
    let status_str: String = row.get("status")?;
    Ok(InterestRequest {
        id: row.get("id")?,
        listing_id: row.get("listing_id")?,
        requester_id: row.get("requester_id")?,
        message: row.get("message")?,
        status: InterestStatus::parse(&status_str).unwrap_or(InterestStatus::Pending),
        created_at: parse_datetime(row.get::<_, String>("created_at")?),
    })
}

fn row_to_voter(row: &rusqlite::Row) -> rusqlite::Result<Voter> {
    let date_registration: Option<String> = row.get("date_registration")?;
    Ok(Voter {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        address_street_number: row.get("address_street_number")?,
        address_street_name: row.get("address_street_name")?,
        address_apartment_number: row.get("address_apartment_number")?,
        address_zip_code: row.get("address_zip_code")?,
        date_birth: parse_date(row.get::<_, String>("date_birth")?),
        date_registration: date_registration.map(parse_date),
        party: row.get("party")?,
        precinct_number: row.get("precinct_number")?,
        v20state: row.get::<_, i64>("v20state")? != 0,
        v21town: row.get::<_, i64>("v21town")? != 0,
        v21primary: row.get::<_, i64>("v21primary")? != 0,
        v22general: row.get::<_, i64>("v22general")? != 0,
        v23town: row.get::<_, i64>("v23town")? != 0,
        voter_score: row.get("voter_score")?,
    })
}

fn row_to_race_result(row: &rusqlite::Row) -> rusqlite::Result<RaceResult> {
    Ok(RaceResult {
        id: row.get("id")?,
        bib_number: row.get("bib_number")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        city: row.get("city")?,
        finish_time: row.get("finish_time")?,
    })
}

fn row_to_joke(row: &rusqlite::Row) -> rusqlite::Result<Joke> {
    Ok(Joke {
        id: row.get("id")?,
        joke: row.get("joke")?,
        author: row.get("author")?,
        published: parse_datetime(row.get::<_, String>("published")?),
    })
}

fn row_to_picture(row: &rusqlite::Row) -> rusqlite::Result<Picture> {
    Ok(Picture {
        id: row.get("id")?,
        image_url: row.get("image_url")?,
        author: row.get("author")?,
        published: parse_datetime(row.get::<_, String>("published")?),
    })
}

fn insert_voter(conn: &Connection, voter: &Voter) -> StoreResult<()> {
    conn.execute(
        r#"INSERT INTO voters (id, first_name, last_name, address_street_number,
            address_street_name, address_apartment_number, address_zip_code,
            date_birth, date_registration, party, precinct_number,
            v20state, v21town, v21primary, v22general, v23town, voter_score)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"#,
        params![
            &voter.id,
            &voter.first_name,
            &voter.last_name,
            &voter.address_street_number,
            &voter.address_street_name,
            &voter.address_apartment_number,
            &voter.address_zip_code,
            voter.date_birth.to_string(),
            voter.date_registration.map(|d| d.to_string()),
            &voter.party,
            &voter.precinct_number,
            voter.v20state as i64,
            voter.v21town as i64,
            voter.v21primary as i64,
            voter.v22general as i64,
            voter.v23town as i64,
            voter.voter_score,
        ],
    )?;
    Ok(())
}

/// Parse one CSV line in the exported voter-records layout.
/// Field 0 is the source row id and is ignored.
fn parse_voter_line(line: &str) -> Result<Voter, String> {
    let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
    if fields.len() < 17 {
        return Err(format!("expected 17 fields, got {}", fields.len()));
    }

    let date_birth = NaiveDate::parse_from_str(fields[7], "%Y-%m-%d")
        .map_err(|e| format!("bad birth date '{}': {}", fields[7], e))?;
    let date_registration = if fields[8].is_empty() {
        None
    } else {
        Some(
            NaiveDate::parse_from_str(fields[8], "%Y-%m-%d")
                .map_err(|e| format!("bad registration date '{}': {}", fields[8], e))?,
        )
    };
    let voter_score: i32 = fields[16]
        .parse()
        .map_err(|e| format!("bad voter score '{}': {}", fields[16], e))?;

    let optional = |s: &str| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    };
    let flag = |s: &str| s.eq_ignore_ascii_case("true") || s == "1";

    Ok(Voter {
        id: String::new(),
        last_name: fields[1].to_string(),
        first_name: fields[2].to_string(),
        address_street_number: fields[3].to_string(),
        address_street_name: fields[4].to_string(),
        address_apartment_number: optional(fields[5]),
        address_zip_code: fields[6].to_string(),
        date_birth,
        date_registration,
        party: optional(fields[9]),
        precinct_number: optional(fields[10]),
        v20state: flag(fields[11]),
        v21town: flag(fields[12]),
        v21primary: flag(fields[13]),
        v22general: flag(fields[14]),
        v23town: flag(fields[15]),
        voter_score,
    })
}

fn conflict_on_constraint(e: rusqlite::Error, msg: &str) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(msg.to_string())
        }
        other => StoreError::Database(other),
    }
}

fn not_found(e: rusqlite::Error, what: String) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(what),
        other => StoreError::Database(other),
    }
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: String) -> NaiveDate {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").unwrap_or_default()
}
