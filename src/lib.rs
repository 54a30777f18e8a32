//! DevSocial - caching API client for the DevSocial backend
//!
//! This crate wraps the DevSocial REST API behind a [`SocialApi`] trait and a
//! [`CachedClient`] that serves GET requests from a per-endpoint TTL cache,
//! collapses concurrent identical GETs into a single network call, refreshes
//! stale-while-revalidate endpoints in the background and purges affected
//! cache entries after every successful mutation.
//!
//! # Example
//!
//! ```rust,no_run
//! use devsocial::{DevSocial, Period, PostQuery, SocialApi};
//!
//! #[tokio::main]
//! async fn main() -> devsocial::Result<()> {
//!     let client = DevSocial::builder()
//!         .base_url("https://devsocial.app/api")
//!         .bearer_token("your-token")
//!         .build()?;
//!
//!     let trending = client.get_trending_data(Period::Today).await?.into_result()?;
//!     println!("{} trending posts", trending.posts.len());
//!
//!     // Served from the cache for the next 30 seconds
//!     let feed = client.get_posts(&PostQuery::new().limit(20)).await?;
//!     println!("{:?}", feed.data.map(|page| page.posts.len()));
//!     Ok(())
//! }
//! ```
//!
//! # Raw requests
//!
//! ```rust,no_run
//! use devsocial::{DevSocial, RequestOptions};
//! use serde_json::json;
//!
//! # async fn run() -> devsocial::Result<()> {
//! let client = DevSocial::builder().build()?;
//! let posts = client.request("/posts?page=1&limit=10", RequestOptions::get()).await?;
//! client
//!     .request("/posts", RequestOptions::post().json(json!({ "content": "hi" })))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod telemetry;
pub mod traits;
pub mod transport;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CachePolicy, PolicyTable};
pub use client::{
    CachedClient, DevSocial, DevSocialBuilder, InvalidationRule, InvalidationTable,
};
pub use config::{ClientConfig, Secrets};
pub use error::{DevSocialError, Result};
pub use session::{NoSession, SessionProvider, StaticSession, UnauthorizedHook};
pub use traits::SocialApi;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Transport};
pub use version::{PKG_NAME, PKG_VERSION};

// Re-export all types
pub use types::{
    ApiResponse, Comment, Dashboard, DashboardStats, ErrorBody, FollowStatus, FormPart, FormValue,
    ImageUpload, Leaderboard, LeaderboardEntry, LeaderboardQuery, LikeStatus, Method, NewPost,
    Pagination, Period, Post, PostPage, PostQuery, ProfileUpdate, RequestBody, RequestOptions,
    TrendingData, TrendingTag, UploadedFile, UserProfile, UserSummary,
};
