//! End-to-end behaviour of the typed [`SocialApi`] wrappers over an in-memory
//! backend: caching scenarios, session handling and status mapping.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use common::{MockTransport, client, settle};
use devsocial::{
    DevSocial, DevSocialError, HttpRequest, HttpResponse, ImageUpload, LeaderboardQuery, Method,
    NewPost, Period, PostQuery, ProfileUpdate, RequestBody, SocialApi, StaticSession,
};

fn profile(n: u32) -> Value {
    json!({ "_id": "u1", "username": "ada", "xp": n * 10, "level": n })
}

/// Backend answering each route with a plausible payload.
fn backend(req: &HttpRequest, n: u32) -> devsocial::Result<HttpResponse> {
    let path = req.endpoint.split('?').next().unwrap_or_default();
    let data = match (req.method.as_str(), path) {
        ("GET", "/users/profile") => profile(n),
        ("PUT", "/users/profile") => profile(n),
        ("GET", "/posts") => json!({
            "posts": [{ "_id": "p1", "author": { "_id": "u1", "username": "ada" }, "content": "hello", "likesCount": n }],
            "pagination": { "page": 1, "limit": 10, "total": 1, "hasMore": false }
        }),
        ("POST", "/posts/p1/like") => json!({ "liked": true, "likesCount": 1 }),
        ("GET", "/trending") => json!({ "tags": [{ "tag": "rust", "count": n }] }),
        ("GET", "/leaderboard") => json!({ "entries": [], "yourRank": n }),
        ("POST", "/upload") => json!({ "url": "https://cdn.example/a.png", "publicId": "a" }),
        _ => json!(null),
    };
    Ok(HttpResponse::json(200, &json!({ "success": true, "data": data })))
}

// =========================================================================
// Caching scenarios
// =========================================================================

#[tokio::test(start_paused = true)]
async fn profile_is_cached_for_two_minutes() {
    let transport = Arc::new(MockTransport::new(backend));
    let client = client(transport.clone());

    let first = client.get_profile().await.unwrap().into_result().unwrap();
    assert_eq!(first.username, "ada");
    assert_eq!(first.level, 1);

    tokio::time::advance(Duration::from_secs(60)).await;
    let cached = client.get_profile().await.unwrap().into_result().unwrap();
    assert_eq!(cached, first);
    assert_eq!(transport.calls(), 1);

    tokio::time::advance(Duration::from_secs(65)).await;
    let refreshed = client.get_profile().await.unwrap().into_result().unwrap();
    assert_eq!(refreshed.level, 2);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn toggling_a_like_invalidates_the_feed() {
    let transport = Arc::new(MockTransport::new(backend));
    let client = client(transport.clone());
    let query = PostQuery::new();

    let before = client.get_posts(&query).await.unwrap().into_result().unwrap();
    assert_eq!(before.posts[0].likes_count, 1);

    let like = client.toggle_post_like("p1").await.unwrap().into_result().unwrap();
    assert!(like.liked);

    let after = client.get_posts(&query).await.unwrap().into_result().unwrap();
    assert_eq!(after.posts[0].likes_count, 3);
    assert_eq!(transport.calls_to(&Method::GET, "/posts"), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_trending_requests_hit_the_network_once() {
    let transport = Arc::new(MockTransport::new(backend).with_get_delay(Duration::from_millis(200)));
    let client = client(transport.clone());

    let calls = (0..5).map(|_| client.get_trending_data(Period::Today));
    let results = futures_util::future::join_all(calls).await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.requests()[0].endpoint, "/trending?period=today");
    for result in results {
        let trending = result.unwrap().into_result().unwrap();
        assert_eq!(trending.tags[0].tag, "rust");
    }
}

#[tokio::test(start_paused = true)]
async fn leaderboard_serves_stale_while_refreshing() {
    let transport = Arc::new(MockTransport::new(backend));
    let client = client(transport.clone());
    let query = LeaderboardQuery::new().period(Period::Month).limit(5);

    let first = client.get_leaderboard(&query).await.unwrap().into_result().unwrap();
    assert_eq!(first.your_rank, Some(1));
    assert_eq!(
        transport.requests()[0].endpoint,
        "/leaderboard?period=month&limit=5"
    );

    tokio::time::advance(Duration::from_secs(181)).await;
    let stale = client.get_leaderboard(&query).await.unwrap().into_result().unwrap();
    assert_eq!(stale.your_rank, Some(1));

    settle(&client).await;
    let fresh = client.get_leaderboard(&query).await.unwrap().into_result().unwrap();
    assert_eq!(fresh.your_rank, Some(2));
}

#[tokio::test(start_paused = true)]
async fn profile_update_invalidates_user_entries() {
    let transport = Arc::new(MockTransport::new(backend));
    let client = client(transport.clone());

    client.get_profile().await.unwrap();
    client
        .update_profile(&ProfileUpdate::new().bio("compilers"))
        .await
        .unwrap();
    let body = transport.requests()[1].body.clone();
    assert_eq!(body, Some(RequestBody::Json(json!({ "bio": "compilers" }))));

    client.get_profile().await.unwrap();
    assert_eq!(transport.calls_to(&Method::GET, "/users/profile"), 2);
}

// =========================================================================
// Input validation
// =========================================================================

#[tokio::test]
async fn wrappers_validate_input_before_sending() {
    let transport = Arc::new(MockTransport::new(backend));
    let client = client(transport.clone());

    assert!(matches!(
        client.get_post("../admin").await,
        Err(DevSocialError::InvalidInput(_))
    ));
    assert!(matches!(
        client.add_comment("p1", "   ").await,
        Err(DevSocialError::InvalidInput(_))
    ));
    assert!(matches!(
        client.create_post(&NewPost::new("")).await,
        Err(DevSocialError::InvalidInput(_))
    ));
    assert!(matches!(
        client.update_profile(&ProfileUpdate::new()).await,
        Err(DevSocialError::InvalidInput(_))
    ));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn unexpected_payload_shape_is_invalid_response() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(HttpResponse::json(200, &json!({ "success": true, "data": { "username": 42 } })))
    }));
    let client = client(transport);

    let err = client.get_user("ada").await.unwrap_err();
    assert!(matches!(err, DevSocialError::InvalidResponse(_)));
}

#[tokio::test]
async fn upload_sends_multipart_image() {
    let transport = Arc::new(MockTransport::new(backend));
    let client = client(transport.clone());

    let uploaded = client
        .upload_image(ImageUpload::new("a.png", "image/png", vec![1, 2, 3]))
        .await
        .unwrap()
        .into_result()
        .unwrap();
    assert_eq!(uploaded.url, "https://cdn.example/a.png");

    let requests = transport.requests();
    let request = &requests[0];
    assert_eq!(request.method, Method::POST);
    match request.body {
        Some(RequestBody::Multipart(ref parts)) => assert_eq!(parts[0].name, "image"),
        ref other => panic!("expected multipart body, got {other:?}"),
    }
}

// =========================================================================
// Session handling
// =========================================================================

#[tokio::test]
async fn bearer_token_is_attached() {
    let transport = Arc::new(MockTransport::new(backend));
    let client = DevSocial::builder()
        .transport(transport.clone())
        .bearer_token("tok-1")
        .build()
        .unwrap();

    client.get_dashboard().await.unwrap();
    assert_eq!(
        transport.requests()[0].header("authorization"),
        Some("Bearer tok-1")
    );
}

#[tokio::test]
async fn anonymous_client_sends_no_authorization() {
    let transport = Arc::new(MockTransport::new(backend));
    let client = client(transport.clone());

    client.get_trending_data(Period::Week).await.unwrap();
    assert!(transport.requests()[0].header("authorization").is_none());
}

#[tokio::test]
async fn unauthorized_protected_endpoint_clears_session() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(HttpResponse::json(401, &json!({ "error": "token expired" })))
    }));
    let session = Arc::new(StaticSession::new("old"));
    let redirects = Arc::new(Mutex::new(Vec::new()));
    let client = {
        let redirects = redirects.clone();
        DevSocial::builder()
            .transport(transport.clone())
            .session(session.clone())
            .on_unauthorized(move |endpoint| redirects.lock().unwrap().push(endpoint.to_string()))
            .build()
            .unwrap()
    };

    let err = client.get_dashboard().await.unwrap_err();
    assert!(matches!(err, DevSocialError::SessionExpired));
    assert!(!session.is_signed_in());
    assert_eq!(*redirects.lock().unwrap(), vec!["/dashboard".to_string()]);
}

#[tokio::test]
async fn unauthorized_public_endpoint_is_an_ordinary_error() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(HttpResponse::json(401, &json!({ "error": "sign in for more" })))
    }));
    let session = Arc::new(StaticSession::new("still-valid"));
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let client = {
        let hook_calls = hook_calls.clone();
        DevSocial::builder()
            .transport(transport.clone())
            .session(session.clone())
            .on_unauthorized(move |_| {
                hook_calls.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap()
    };

    let err = client.get_trending_data(Period::Today).await.unwrap_err();
    match err {
        DevSocialError::Api { status, message, .. } => {
            assert_eq!(status, 401);
            assert_eq!(message, "sign in for more");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(session.is_signed_in());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
}

// =========================================================================
// Status mapping
// =========================================================================

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(
            HttpResponse::json(429, &json!({ "success": false, "message": "slow down" }))
                .with_header("Retry-After", "30"),
        )
    }));
    let client = client(transport);

    let err = client.follow_user("u2").await.unwrap_err();
    match err {
        DevSocialError::RateLimited {
            message,
            retry_after,
        } => {
            assert_eq!(message, "slow down");
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_success_body_is_invalid_response() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(HttpResponse::new(200, "<html>maintenance</html>"))
    }));
    let client = client(transport.clone());

    let err = client.get_dashboard().await.unwrap_err();
    assert!(matches!(err, DevSocialError::InvalidResponse(_)));
    assert_eq!(client.cache_len(), 0);
}

#[tokio::test]
async fn error_details_are_preserved() {
    let transport = Arc::new(MockTransport::new(|_, _| {
        Ok(HttpResponse::json(
            422,
            &json!({ "success": false, "error": { "message": "validation failed", "details": { "content": "required" } } }),
        ))
    }));
    let client = client(transport);

    let err = client.create_post(&NewPost::new("hi")).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert!(err.is_client_error());
    assert_eq!(err.details(), Some(&json!({ "content": "required" })));
}

#[tokio::test]
async fn delete_with_empty_body_succeeds() {
    let transport = Arc::new(MockTransport::new(|_, _| Ok(HttpResponse::new(204, ""))));
    let client = client(transport);

    let resp = client.delete_post("p1").await.unwrap();
    assert!(resp.success);
    assert!(resp.data.is_none());
}
