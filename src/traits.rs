//! Core SocialApi trait

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{
    ApiResponse, Comment, Dashboard, FollowStatus, FormPart, ImageUpload, Leaderboard,
    LeaderboardQuery, LikeStatus, NewPost, Period, Post, PostPage, PostQuery, ProfileUpdate,
    RequestOptions, TrendingData, UploadedFile, UserProfile,
};
use crate::{DevSocialError, Result};

/// Typed access to the DevSocial backend.
///
/// Only [`request`](SocialApi::request) must be implemented; every resource
/// method binds its parameters to an endpoint, sends it through `request`
/// and checks the payload shape. Caching and deduplication therefore apply
/// to the wrappers exactly as they do to raw calls.
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// Send a raw request to `endpoint` (relative to the API base URL).
    async fn request(&self, endpoint: &str, options: RequestOptions) -> Result<ApiResponse<Value>>;

    // ===== Users =====

    /// The signed-in user's profile.
    async fn get_profile(&self) -> Result<ApiResponse<UserProfile>> {
        self.request("/users/profile", RequestOptions::get())
            .await?
            .into_typed()
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<ApiResponse<UserProfile>> {
        if update.is_empty() {
            return Err(DevSocialError::InvalidInput(
                "profile update carries no changes".to_string(),
            ));
        }
        self.request("/users/profile", RequestOptions::put().try_json(update)?)
            .await?
            .into_typed()
    }

    /// Public profile of another user.
    async fn get_user(&self, username: &str) -> Result<ApiResponse<UserProfile>> {
        let endpoint = format!("/users/{}", path_segment(username)?);
        self.request(&endpoint, RequestOptions::get())
            .await?
            .into_typed()
    }

    async fn follow_user(&self, user_id: &str) -> Result<ApiResponse<FollowStatus>> {
        let endpoint = format!("/users/{}/follow", path_segment(user_id)?);
        self.request(&endpoint, RequestOptions::post())
            .await?
            .into_typed()
    }

    async fn unfollow_user(&self, user_id: &str) -> Result<ApiResponse<FollowStatus>> {
        let endpoint = format!("/users/{}/follow", path_segment(user_id)?);
        self.request(&endpoint, RequestOptions::delete())
            .await?
            .into_typed()
    }

    // ===== Posts =====

    /// One page of the feed.
    async fn get_posts(&self, query: &PostQuery) -> Result<ApiResponse<PostPage>> {
        let endpoint = with_query("/posts", &query.pairs())?;
        self.request(&endpoint, RequestOptions::get())
            .await?
            .into_typed()
    }

    async fn get_post(&self, post_id: &str) -> Result<ApiResponse<Post>> {
        let endpoint = format!("/posts/{}", path_segment(post_id)?);
        self.request(&endpoint, RequestOptions::get())
            .await?
            .into_typed()
    }

    async fn create_post(&self, post: &NewPost) -> Result<ApiResponse<Post>> {
        if post.content.trim().is_empty() {
            return Err(DevSocialError::InvalidInput(
                "post content must not be empty".to_string(),
            ));
        }
        self.request("/posts", RequestOptions::post().try_json(post)?)
            .await?
            .into_typed()
    }

    async fn delete_post(&self, post_id: &str) -> Result<ApiResponse<Value>> {
        let endpoint = format!("/posts/{}", path_segment(post_id)?);
        self.request(&endpoint, RequestOptions::delete()).await
    }

    /// Like the post, or remove the like if already liked.
    async fn toggle_post_like(&self, post_id: &str) -> Result<ApiResponse<LikeStatus>> {
        let endpoint = format!("/posts/{}/like", path_segment(post_id)?);
        self.request(&endpoint, RequestOptions::post())
            .await?
            .into_typed()
    }

    async fn get_comments(&self, post_id: &str) -> Result<ApiResponse<Vec<Comment>>> {
        let endpoint = format!("/posts/{}/comments", path_segment(post_id)?);
        self.request(&endpoint, RequestOptions::get())
            .await?
            .into_typed()
    }

    async fn add_comment(&self, post_id: &str, content: &str) -> Result<ApiResponse<Comment>> {
        if content.trim().is_empty() {
            return Err(DevSocialError::InvalidInput(
                "comment must not be empty".to_string(),
            ));
        }
        let endpoint = format!("/posts/{}/comments", path_segment(post_id)?);
        let body = serde_json::json!({ "content": content });
        self.request(&endpoint, RequestOptions::post().json(body))
            .await?
            .into_typed()
    }

    // ===== Discovery =====

    /// Trending posts, tags and users. Reachable without signing in.
    async fn get_trending_data(&self, period: Period) -> Result<ApiResponse<TrendingData>> {
        let endpoint = with_query("/trending", &[("period", period.to_string())])?;
        self.request(&endpoint, RequestOptions::get())
            .await?
            .into_typed()
    }

    async fn get_leaderboard(&self, query: &LeaderboardQuery) -> Result<ApiResponse<Leaderboard>> {
        let endpoint = with_query(
            "/leaderboard",
            &[
                ("period", query.period.to_string()),
                ("limit", query.limit.to_string()),
            ],
        )?;
        self.request(&endpoint, RequestOptions::get())
            .await?
            .into_typed()
    }

    async fn get_dashboard(&self) -> Result<ApiResponse<Dashboard>> {
        self.request("/dashboard", RequestOptions::get())
            .await?
            .into_typed()
    }

    // ===== Uploads =====

    /// Upload an image as multipart form field `image`.
    async fn upload_image(&self, file: ImageUpload) -> Result<ApiResponse<UploadedFile>> {
        if file.bytes.is_empty() {
            return Err(DevSocialError::InvalidInput("image is empty".to_string()));
        }
        let part = FormPart::file("image", file.file_name, file.mime_type, file.bytes);
        self.request("/upload", RequestOptions::post().multipart(vec![part]))
            .await?
            .into_typed()
    }
}

/// Validate an identifier used as a single path segment.
fn path_segment(value: &str) -> Result<&str> {
    let bad = value.is_empty()
        || value == "."
        || value == ".."
        || value
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control());
    if bad {
        return Err(DevSocialError::InvalidInput(format!(
            "invalid path segment: {value:?}"
        )));
    }
    Ok(value)
}

/// Append URL-encoded query parameters to `path`.
fn with_query(path: &str, pairs: &[(&str, String)]) -> Result<String> {
    let url = reqwest::Url::parse_with_params(&format!("http://localhost{path}"), pairs)
        .map_err(|e| DevSocialError::InvalidInput(format!("invalid endpoint {path}: {e}")))?;
    Ok(match url.query() {
        Some(query) if !query.is_empty() => format!("{}?{}", url.path(), query),
        _ => url.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_are_encoded() {
        let endpoint = with_query(
            "/posts",
            &[("page", "1".to_string()), ("tag", "c++ & rust".to_string())],
        )
        .unwrap();
        assert_eq!(endpoint, "/posts?page=1&tag=c%2B%2B+%26+rust");
    }

    #[test]
    fn empty_query_keeps_bare_path() {
        assert_eq!(with_query("/dashboard", &[]).unwrap(), "/dashboard");
    }

    #[test]
    fn path_segments_are_validated() {
        assert_eq!(path_segment("ada_lovelace").unwrap(), "ada_lovelace");
        assert!(path_segment("").is_err());
        assert!(path_segment("..").is_err());
        assert!(path_segment("a/b").is_err());
        assert!(path_segment("a?b").is_err());
        assert!(path_segment("a b").is_err());
    }
}
