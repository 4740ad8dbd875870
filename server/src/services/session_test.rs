use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
}

#[test]
fn generate_token_all_valid_hex() {
    let token = generate_token();
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
}

// =============================================================================
// SessionUser
// =============================================================================

#[test]
fn session_user_serialize() {
    let user = SessionUser { id: Uuid::nil(), name: "alice".into() };
    let json = serde_json::to_string(&user).unwrap();
    let restored: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(restored["name"], "alice");
    assert_eq!(restored["id"], "00000000-0000-0000-0000-000000000000");
}

// =============================================================================
// Live database tests (require TEST_DATABASE_URL)
// =============================================================================

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn test_pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required");
        let pool = PgPoolOptions::new().connect(&url).await.expect("connect failed");
        sqlx::migrate!("src/db/migrations").run(&pool).await.expect("migrations failed");
        pool
    }

    #[tokio::test]
    #[ignore = "requires live database"]
    async fn session_round_trip() {
        let pool = test_pool().await;
        let user_id = create_user(&pool, "round-trip").await.unwrap();
        let token = create_session(&pool, user_id).await.unwrap();

        let user = validate_session(&pool, &token).await.unwrap().expect("valid session");
        assert_eq!(user.id, user_id);
        assert_eq!(user.name, "round-trip");

        delete_session(&pool, &token).await.unwrap();
        assert!(validate_session(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires live database"]
    async fn unknown_token_is_rejected() {
        let pool = test_pool().await;
        assert!(validate_session(&pool, "not-a-token").await.unwrap().is_none());
    }
}
