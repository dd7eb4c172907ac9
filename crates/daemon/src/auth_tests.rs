use super::*;
use axum::http::HeaderValue;

fn headers(user: Option<&str>, email: Option<&str>) -> HeaderMap {
    let mut h = HeaderMap::new();
    if let Some(u) = user {
        h.insert("x-user-id", HeaderValue::from_str(u).unwrap());
    }
    if let Some(e) = email {
        h.insert("x-user-email", HeaderValue::from_str(e).unwrap());
    }
    h
}

#[tokio::test]
async fn authenticates_from_headers() {
    let provider = HeaderAuthProvider;
    let principal = provider
        .authenticate(&headers(Some("u1"), Some("u1@example.com")))
        .await
        .unwrap();
    assert_eq!(principal.user_id, "u1");
    assert_eq!(principal.email, "u1@example.com");
}

#[tokio::test]
async fn missing_user_header_is_unauthenticated() {
    let provider = HeaderAuthProvider;
    let err = provider.authenticate(&headers(None, None)).await.unwrap_err();
    assert_eq!(err, HostError::Unauthenticated);
}
