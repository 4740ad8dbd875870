#![cfg(feature = "live-db-tests")]

use super::*;
use crate::services::{conversation, session};
use protocol::Content;
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;

async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required");
    let pool = PgPoolOptions::new().connect(&url).await.expect("connect failed");
    sqlx::migrate!("src/db/migrations").run(&pool).await.expect("migrations failed");
    pool
}

fn request(text: &str) -> VoiceAppendRequest {
    VoiceAppendRequest {
        text: text.into(),
        audio_url: Some("user-1/tts/clip.mp3".into()),
        timestamp: OffsetDateTime::now_utc(),
        voice_id: Some("voice-7".into()),
        voice_name: Some("Clara".into()),
    }
}

#[tokio::test]
#[ignore = "requires live database"]
async fn append_stores_session_and_bumps_recency() {
    let pool = test_pool().await;
    let user_id = session::create_user(&pool, "voice-user").await.unwrap();
    let summary = conversation::create_with_first_turn(&pool, user_id, Content::from("hola"))
        .await
        .unwrap();

    let stored = append(&pool, user_id, summary.id, request("bienvenido")).await.unwrap();
    assert_eq!(stored.conversation_id, summary.id);
    assert_eq!(stored.transcript.len(), 1);
    assert_eq!(stored.transcript[0].text, "bienvenido");
    assert_eq!(stored.transcript[0].voice_name.as_deref(), Some("Clara"));

    let loaded = conversation::detail(&pool, user_id, summary.id).await.unwrap();
    assert_eq!(loaded.voice_sessions.len(), 1);
    assert!(loaded.updated_at >= summary.updated_at);
}

#[tokio::test]
#[ignore = "requires live database"]
async fn sessions_come_back_in_creation_order() {
    let pool = test_pool().await;
    let user_id = session::create_user(&pool, "voice-order").await.unwrap();
    let summary = conversation::create_with_first_turn(&pool, user_id, Content::from("hola"))
        .await
        .unwrap();

    let first = append(&pool, user_id, summary.id, request("uno")).await.unwrap();
    let second = append(&pool, user_id, summary.id, request("dos")).await.unwrap();

    let loaded = conversation::detail(&pool, user_id, summary.id).await.unwrap();
    let ids: Vec<Uuid> = loaded.voice_sessions.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
#[ignore = "requires live database"]
async fn append_to_foreign_conversation_is_rejected() {
    let pool = test_pool().await;
    let owner = session::create_user(&pool, "voice-owner").await.unwrap();
    let stranger = session::create_user(&pool, "voice-stranger").await.unwrap();
    let summary = conversation::create_with_first_turn(&pool, owner, Content::from("hola"))
        .await
        .unwrap();

    let err = append(&pool, stranger, summary.id, request("intruso")).await.unwrap_err();
    assert!(matches!(err, VoiceError::ConversationNotFound(_)));
}

#[tokio::test]
#[ignore = "requires live database"]
async fn delete_leaves_text_transcript_untouched() {
    let pool = test_pool().await;
    let user_id = session::create_user(&pool, "voice-delete").await.unwrap();
    let summary = conversation::create_with_first_turn(&pool, user_id, Content::from("hola"))
        .await
        .unwrap();
    let stored = append(&pool, user_id, summary.id, request("efímero")).await.unwrap();

    delete(&pool, user_id, stored.id).await.unwrap();

    let loaded = conversation::detail(&pool, user_id, summary.id).await.unwrap();
    assert!(loaded.voice_sessions.is_empty());
    assert_eq!(loaded.turns.len(), 1);
}
