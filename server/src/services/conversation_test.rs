use super::*;
use protocol::{ContentPart, ImageRef};

// =============================================================================
// derive_title
// =============================================================================

#[test]
fn short_flat_string_is_used_verbatim() {
    let content = Content::from("What is 2+2?");
    assert_eq!(derive_title(&content), "What is 2+2?");
}

#[test]
fn long_flat_string_is_truncated_with_ellipsis() {
    let content = Content::from("Hello world this is a very long first message indeed");
    let title = derive_title(&content);
    assert_eq!(title, "Hello world this is a very lon...");
    assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
}

#[test]
fn exactly_thirty_chars_gets_no_ellipsis() {
    let text: String = "a".repeat(TITLE_MAX_CHARS);
    let title = derive_title(&Content::from(text.clone()));
    assert_eq!(title, text);
}

#[test]
fn multimodal_title_uses_first_text_part_never_the_image() {
    let content = Content::Parts(vec![
        ContentPart::Text { text: "Hello world this is long enough to truncate".into() },
        ContentPart::ImageUrl { image_url: ImageRef { url: "user-1/photo.png".into() } },
    ]);
    let title = derive_title(&content);
    assert_eq!(title, "Hello world this is long enoug...");
    assert!(!title.contains("photo.png"));
}

#[test]
fn image_first_multimodal_still_finds_text() {
    let content = Content::Parts(vec![
        ContentPart::ImageUrl { image_url: ImageRef { url: "user-1/photo.png".into() } },
        ContentPart::Text { text: "describe".into() },
    ]);
    assert_eq!(derive_title(&content), "describe");
}

#[test]
fn image_only_content_falls_back_to_default() {
    let content = Content::Parts(vec![ContentPart::ImageUrl { image_url: ImageRef { url: "a/b.png".into() } }]);
    assert_eq!(derive_title(&content), "New Conversation");
}

#[test]
fn empty_and_whitespace_content_falls_back_to_default() {
    assert_eq!(derive_title(&Content::from("")), "New Conversation");
    assert_eq!(derive_title(&Content::from("   ")), "New Conversation");
}

#[test]
fn multibyte_text_truncates_on_character_boundary() {
    let text = "ñ".repeat(40);
    let title = derive_title(&Content::from(text));
    assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
    assert!(title.ends_with("..."));
}

#[test]
fn derivation_is_deterministic() {
    let content = Content::from("same input, same title, always and forever");
    assert_eq!(derive_title(&content), derive_title(&content));
}

// =============================================================================
// Live database tests (require TEST_DATABASE_URL)
// =============================================================================

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::services::session;
    use sqlx::postgres::PgPoolOptions;

    async fn test_pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required");
        let pool = PgPoolOptions::new().connect(&url).await.expect("connect failed");
        sqlx::migrate!("src/db/migrations").run(&pool).await.expect("migrations failed");
        pool
    }

    #[tokio::test]
    #[ignore = "requires live database"]
    async fn create_stores_first_turn_and_derived_title() {
        let pool = test_pool().await;
        let user_id = session::create_user(&pool, "creator").await.unwrap();

        let summary = create_with_first_turn(&pool, user_id, Content::from("What is 2+2?"))
            .await
            .unwrap();
        assert_eq!(summary.title, "What is 2+2?");

        let turns = history(&pool, user_id, summary.id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].index, 0);
    }

    #[tokio::test]
    #[ignore = "requires live database"]
    async fn appended_turns_come_back_in_order() {
        let pool = test_pool().await;
        let user_id = session::create_user(&pool, "appender").await.unwrap();
        let summary = create_with_first_turn(&pool, user_id, Content::from("first")).await.unwrap();

        append_turn(&pool, user_id, summary.id, Role::Assistant, Content::from("second"), false)
            .await
            .unwrap();
        append_turn(&pool, user_id, summary.id, Role::User, Content::from("third"), false)
            .await
            .unwrap();

        let loaded = detail(&pool, user_id, summary.id).await.unwrap();
        let roles: Vec<Role> = loaded.turns.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        let indices: Vec<u64> = loaded.turns.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    #[ignore = "requires live database"]
    async fn other_users_conversations_are_invisible() {
        let pool = test_pool().await;
        let owner = session::create_user(&pool, "owner").await.unwrap();
        let stranger = session::create_user(&pool, "stranger").await.unwrap();
        let summary = create_with_first_turn(&pool, owner, Content::from("private")).await.unwrap();

        let err = detail(&pool, stranger, summary.id).await.unwrap_err();
        assert!(matches!(err, ConversationError::NotFound(_)));
    }

    #[tokio::test]
    #[ignore = "requires live database"]
    async fn delete_removes_record() {
        let pool = test_pool().await;
        let user_id = session::create_user(&pool, "deleter").await.unwrap();
        let summary = create_with_first_turn(&pool, user_id, Content::from("bye")).await.unwrap();

        delete(&pool, user_id, summary.id).await.unwrap();
        let err = history(&pool, user_id, summary.id).await.unwrap_err();
        assert!(matches!(err, ConversationError::NotFound(_)));
    }
}
