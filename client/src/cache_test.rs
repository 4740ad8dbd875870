use super::*;
use protocol::{ContentPart, ImageRef};
use time::Duration;
use time::macros::datetime;

fn summary(id: Uuid, title: &str, updated: OffsetDateTime) -> ConversationSummary {
    ConversationSummary {
        id,
        title: title.to_owned(),
        created_at: updated - Duration::hours(1),
        updated_at: updated,
    }
}

// =============================================================================
// DRAFT CREATION
// =============================================================================

#[test]
fn create_inserts_local_draft_and_selects_it() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);

    assert_eq!(cache.current_id(), Some(id));
    let conv = cache.get(id).unwrap();
    assert!(conv.is_local);
    assert!(conv.loaded);
    assert!(!conv.is_temporary);
    assert_eq!(conv.title, "New Conversation");
    assert!(conv.turns.is_empty());
}

#[test]
fn create_is_idempotent_on_current_empty_draft() {
    let mut cache = ConversationCache::new();
    let first = cache.create(false);
    let second = cache.create(false);

    assert_eq!(first, second);
    assert_eq!(cache.conversations().len(), 1);
}

#[test]
fn create_with_different_temporariness_makes_a_new_draft() {
    let mut cache = ConversationCache::new();
    let durable = cache.create(false);
    let temporary = cache.create(true);

    assert_ne!(durable, temporary);
    assert_eq!(cache.current_id(), Some(temporary));
    assert!(cache.get(temporary).unwrap().is_temporary);
}

#[test]
fn create_after_draft_gains_turns_makes_a_new_draft() {
    let mut cache = ConversationCache::new();
    let first = cache.create(false);
    cache.push_turn(first, Role::User, "hi".into());

    let second = cache.create(false);
    assert_ne!(first, second);
    assert_eq!(cache.conversations().len(), 2);
}

// =============================================================================
// TRANSCRIPT MUTATION
// =============================================================================

#[test]
fn push_turn_assigns_sequential_indexes() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);

    assert_eq!(cache.push_turn(id, Role::User, "one".into()), Some(0));
    assert_eq!(cache.push_turn(id, Role::Assistant, "two".into()), Some(1));
    assert_eq!(cache.push_turn(id, Role::User, "three".into()), Some(2));
    assert_eq!(cache.push_turn(Uuid::new_v4(), Role::User, "lost".into()), None);
}

#[test]
fn append_assistant_text_accumulates_on_trailing_assistant_turn() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);
    cache.push_turn(id, Role::User, "question".into());
    cache.push_turn(id, Role::Assistant, Content::Text(String::new()));

    cache.append_assistant_text(id, "Hel");
    cache.append_assistant_text(id, "lo");

    let conv = cache.get(id).unwrap();
    assert_eq!(conv.turns[1].content, Content::Text("Hello".to_owned()));
}

#[test]
fn append_assistant_text_ignores_trailing_user_turn() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);
    cache.push_turn(id, Role::User, "question".into());

    cache.append_assistant_text(id, "stray");

    assert_eq!(cache.get(id).unwrap().turns[0].content, Content::Text("question".to_owned()));
}

#[test]
fn set_assistant_text_replaces_partial_content() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);
    cache.push_turn(id, Role::User, "question".into());
    cache.push_turn(id, Role::Assistant, Content::Text(String::new()));
    cache.append_assistant_text(id, "partial answ");

    cache.set_assistant_text(id, "Sorry, something went wrong.");

    let conv = cache.get(id).unwrap();
    assert_eq!(conv.turns[1].content, Content::Text("Sorry, something went wrong.".to_owned()));
}

#[test]
fn mark_tool_used_flags_trailing_assistant_turn() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);
    cache.push_turn(id, Role::User, "question".into());
    cache.push_turn(id, Role::Assistant, Content::Text(String::new()));

    cache.mark_tool_used(id);

    assert!(cache.get(id).unwrap().turns[1].tool_used);
}

// =============================================================================
// PROMOTION
// =============================================================================

#[test]
fn promote_swaps_identity_and_keeps_turns() {
    let mut cache = ConversationCache::new();
    let draft = cache.create(false);
    cache.push_turn(draft, Role::User, "first message".into());
    cache.push_turn(draft, Role::Assistant, "streamed reply".into());

    let server = summary(Uuid::new_v4(), "First message", datetime!(2026-02-01 10:00 UTC));
    assert!(cache.promote(draft, &server));

    assert!(cache.get(draft).is_none());
    let conv = cache.get(server.id).unwrap();
    assert!(!conv.is_local);
    assert_eq!(conv.title, "First message");
    assert_eq!(conv.turns.len(), 2);
    assert_eq!(cache.current_id(), Some(server.id));
}

#[test]
fn promote_unknown_id_is_a_noop() {
    let mut cache = ConversationCache::new();
    let server = summary(Uuid::new_v4(), "ghost", datetime!(2026-02-01 10:00 UTC));
    assert!(!cache.promote(Uuid::new_v4(), &server));
    assert!(cache.conversations().is_empty());
}

// =============================================================================
// DETAIL AND LISTING RECONCILIATION
// =============================================================================

#[test]
fn apply_detail_fills_transcript_and_marks_loaded() {
    let mut cache = ConversationCache::new();
    let id = Uuid::new_v4();
    cache.merge_summaries(&[summary(id, "from list", datetime!(2026-02-01 10:00 UTC))]);
    assert!(!cache.get(id).unwrap().loaded);

    cache.apply_detail(ConversationDetail {
        id,
        title: "from list".to_owned(),
        created_at: datetime!(2026-02-01 09:00 UTC),
        updated_at: datetime!(2026-02-01 10:00 UTC),
        turns: vec![Turn::new(0, Role::User, "hello".into())],
        voice_sessions: Vec::new(),
    });

    let conv = cache.get(id).unwrap();
    assert!(conv.loaded);
    assert_eq!(conv.turns.len(), 1);
}

#[test]
fn merge_summaries_preserves_local_drafts_and_cached_turns() {
    let mut cache = ConversationCache::new();
    let draft = cache.create(true);
    cache.push_turn(draft, Role::User, "off the record".into());

    let known = Uuid::new_v4();
    cache.apply_detail(ConversationDetail {
        id: known,
        title: "old title".to_owned(),
        created_at: datetime!(2026-02-01 09:00 UTC),
        updated_at: datetime!(2026-02-01 10:00 UTC),
        turns: vec![Turn::new(0, Role::User, "kept".into())],
        voice_sessions: Vec::new(),
    });

    cache.merge_summaries(&[summary(known, "renamed elsewhere", datetime!(2026-02-02 10:00 UTC))]);

    let conv = cache.get(known).unwrap();
    assert_eq!(conv.title, "renamed elsewhere");
    assert_eq!(conv.turns.len(), 1);
    assert!(cache.get(draft).is_some());
}

#[test]
fn merge_summaries_drops_durable_entries_deleted_elsewhere() {
    let mut cache = ConversationCache::new();
    let gone = Uuid::new_v4();
    cache.merge_summaries(&[summary(gone, "doomed", datetime!(2026-02-01 10:00 UTC))]);
    cache.set_current(gone);

    cache.merge_summaries(&[]);

    assert!(cache.get(gone).is_none());
    assert_eq!(cache.current_id(), None);
}

#[test]
fn listing_orders_by_recency() {
    let mut cache = ConversationCache::new();
    let older = Uuid::new_v4();
    let newer = Uuid::new_v4();
    cache.merge_summaries(&[
        summary(older, "older", datetime!(2026-02-01 10:00 UTC)),
        summary(newer, "newer", datetime!(2026-02-03 10:00 UTC)),
    ]);

    let ids: Vec<Uuid> = cache.conversations().iter().map(|conv| conv.id).collect();
    assert_eq!(ids, vec![newer, older]);
}

#[test]
fn touch_moves_conversation_to_front() {
    let mut cache = ConversationCache::new();
    let older = Uuid::new_v4();
    let newer = Uuid::new_v4();
    cache.merge_summaries(&[
        summary(older, "older", datetime!(2026-02-01 10:00 UTC)),
        summary(newer, "newer", datetime!(2026-02-03 10:00 UTC)),
    ]);

    cache.touch(older);

    assert_eq!(cache.conversations()[0].id, older);
}

// =============================================================================
// RENAME AND REMOVE
// =============================================================================

#[test]
fn rename_updates_title_in_place() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);
    cache.rename(id, "Better title");
    assert_eq!(cache.get(id).unwrap().title, "Better title");
}

#[test]
fn remove_clears_current_selection() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);
    cache.remove(id);
    assert!(cache.get(id).is_none());
    assert_eq!(cache.current_id(), None);
}

// =============================================================================
// MULTIMODAL CONTENT
// =============================================================================

#[test]
fn multimodal_turn_round_trips_through_cache() {
    let mut cache = ConversationCache::new();
    let id = cache.create(false);
    let content = Content::Parts(vec![
        ContentPart::Text { text: "look at this".to_owned() },
        ContentPart::ImageUrl {
            image_url: ImageRef { url: "user-1/abc-photo.png".to_owned() },
        },
    ]);
    cache.push_turn(id, Role::User, content.clone());

    assert_eq!(cache.get(id).unwrap().turns[0].content, content);
}
