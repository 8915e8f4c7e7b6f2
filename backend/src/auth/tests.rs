use super::*;
use axum::http::Request;
use jsonwebtoken::{EncodingKey, Header, encode};

const SECRET: &str = "supersecretjwtsecretforunittesting123";
const USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

fn claims(sub: &str, aud: Option<&str>, exp: usize) -> SupabaseClaims {
    SupabaseClaims {
        sub: sub.to_string(),
        role: "authenticated".to_string(),
        email: Some("test@example.com".to_string()),
        aud: aud.map(str::to_string),
        exp,
    }
}

fn token(claims: &SupabaseClaims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn parts_with(authorization: Option<&str>, secret: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/api/v1/billing/plans");
    if let Some(value) = authorization {
        builder = builder.header(axum::http::header::AUTHORIZATION, value);
    }
    let mut request = builder.body(()).unwrap();
    if let Some(secret) = secret {
        request
            .extensions_mut()
            .insert(SupabaseJwtSecret::new(secret));
    }
    request.into_parts().0
}

#[test]
fn test_validate_supabase_jwt_success() {
    let my_claims = claims(USER_ID, Some("authenticated"), 9999999999);

    let claims = validate_supabase_jwt(&token(&my_claims, SECRET), SECRET)
        .expect("Valid token should pass");
    assert_eq!(claims.sub, my_claims.sub);
    assert_eq!(claims.email, my_claims.email);
}

#[test]
fn test_validate_supabase_jwt_expired() {
    let my_claims = claims(USER_ID, Some("authenticated"), 1);

    let result = validate_supabase_jwt(&token(&my_claims, SECRET), SECRET);
    assert!(result.is_err());
}

#[test]
fn test_validate_supabase_jwt_invalid_signature() {
    let my_claims = claims(USER_ID, Some("authenticated"), 9999999999);

    let result = validate_supabase_jwt(&token(&my_claims, "wrongsecret"), SECRET);
    assert!(result.is_err());
}

#[test]
fn test_validate_supabase_jwt_wrong_audience() {
    let my_claims = claims(USER_ID, Some("service_role"), 9999999999);

    let result = validate_supabase_jwt(&token(&my_claims, SECRET), SECRET);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_auth_user_extracted_from_bearer_token() {
    let my_claims = claims(USER_ID, Some("authenticated"), 9999999999);
    let header = format!("Bearer {}", token(&my_claims, SECRET));
    let mut parts = parts_with(Some(&header), Some(SECRET));

    let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();

    assert_eq!(user.user_id, Uuid::parse_str(USER_ID).unwrap());
    assert_eq!(user.email.as_deref(), Some("test@example.com"));
    assert_eq!(user.role, "authenticated");
}

#[tokio::test]
async fn test_auth_user_rejects_missing_or_malformed_header() {
    let mut missing = parts_with(None, Some(SECRET));
    let (status, _) = AuthUser::from_request_parts(&mut missing, &())
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut basic = parts_with(Some("Basic abc"), Some(SECRET));
    let (status, _) = AuthUser::from_request_parts(&mut basic, &())
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_user_rejects_non_uuid_subject() {
    let my_claims = claims("not-a-uuid", Some("authenticated"), 9999999999);
    let header = format!("Bearer {}", token(&my_claims, SECRET));
    let mut parts = parts_with(Some(&header), Some(SECRET));

    let (status, message) = AuthUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message, "Invalid user ID in token");
}

#[tokio::test]
async fn test_auth_user_requires_configured_secret() {
    let my_claims = claims(USER_ID, Some("authenticated"), 9999999999);
    let header = format!("Bearer {}", token(&my_claims, SECRET));
    let mut parts = parts_with(Some(&header), None);

    let (status, _) = AuthUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
