//! Public types for the DevSocial API.

mod post;
mod request;
mod response;
mod social;
mod user;

pub use post::{Comment, LikeStatus, NewPost, Pagination, Post, PostPage, PostQuery};
pub use request::{FormPart, FormValue, Method, RequestBody, RequestOptions};
pub use response::{ApiResponse, ErrorBody};
pub use social::{
    Dashboard, DashboardStats, ImageUpload, Leaderboard, LeaderboardEntry, LeaderboardQuery,
    Period, TrendingData, TrendingTag, UploadedFile,
};
pub use user::{FollowStatus, ProfileUpdate, UserProfile, UserSummary};
