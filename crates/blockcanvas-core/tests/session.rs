//! End-to-end editing sessions against in-memory persistence.

use blockcanvas_core::storage::{LAST_DOCUMENT_KEY, restore_last};
use blockcanvas_core::{
    BlockKind, BlockPatch, CanvasDocument, EditorConfig, EditorSession, FocusTarget, KeyEvent, MemoryRemote,
    MemoryStorage, Modifiers, Point, PointerEvent, Position, SaveStatus, Storage, Vec2,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn open(storage: &Arc<MemoryStorage>) -> EditorSession {
    EditorSession::open("site", EditorConfig::default(), storage.clone(), None, None)
        .await
        .unwrap()
}

fn add(session: &mut EditorSession, kind: BlockKind, x: f64, y: f64) -> String {
    session
        .mutate(|s| s.add_block(kind, Position::new(x, y), json!({}), None))
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn first_block_marks_document_unsaved() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage).await;
    let mut status = session.autosave().unwrap().subscribe();
    assert_eq!(status.borrow_and_update().status, SaveStatus::Saved);

    let first = session
        .mutate(|s| {
            s.add_block(
                BlockKind::Text,
                Position::new(24.0, 80.0),
                json!({ "text": "Hi" }),
                None,
            )
        })
        .unwrap();
    assert!(status.has_changed().unwrap());
    assert_eq!(status.borrow_and_update().status, SaveStatus::Unsaved);
    assert_eq!(session.document().len(), 1);

    let second = add(&mut session, BlockKind::Divider, 24.0, 200.0);
    let doc = session.document();
    assert!(doc.get_block(&second).unwrap().z_index > doc.get_block(&first).unwrap().z_index);

    let state = session.flush().await.unwrap();
    assert_eq!(state.status, SaveStatus::Saved);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_produce_one_save() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage).await;
    let id = add(&mut session, BlockKind::Heading, 0.0, 0.0);
    session.flush().await;

    for i in 1..=5 {
        session.mutate(|s| s.move_block(&id, Position::new(10.0 * i as f64, 0.0)));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(session.save_state().unwrap().status, SaveStatus::Unsaved);
    let stored = storage.load("site").await.unwrap();
    assert_eq!(stored.get_block(&id).unwrap().position, Point::new(0.0, 0.0));

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(session.save_state().unwrap().status, SaveStatus::Saved);
    let stored = storage.load("site").await.unwrap();
    assert_eq!(stored.get_block(&id).unwrap().position, Point::new(50.0, 0.0));
}

#[tokio::test(start_paused = true)]
async fn arrow_keys_nudge_selection() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage).await;
    let a = add(&mut session, BlockKind::Image, 100.0, 100.0);
    let b = add(&mut session, BlockKind::Image, 400.0, 100.0);
    session.click_block(&a, Modifiers::NONE);
    session.click_block(&b, Modifiers::shift());

    assert!(session.handle_key(&KeyEvent::from("ArrowRight"), FocusTarget::Canvas));
    let x = |session: &EditorSession, id: &str| session.document().get_block(id).unwrap().position.x;
    assert_eq!((x(&session, &a), x(&session, &b)), (108.0, 408.0));

    let fine = KeyEvent::new("ArrowRight", Modifiers::shift());
    assert!(session.handle_key(&fine, FocusTarget::Canvas));
    assert_eq!((x(&session, &a), x(&session, &b)), (109.0, 409.0));

    // Both nudges undo as single steps.
    let undo = KeyEvent::new("z", Modifiers::ctrl());
    assert!(session.handle_key(&undo, FocusTarget::Canvas));
    assert_eq!((x(&session, &a), x(&session, &b)), (108.0, 408.0));

    // A focused text field keeps the arrows.
    assert!(!session.handle_key(&KeyEvent::from("ArrowRight"), FocusTarget::TextInput));
    assert_eq!(x(&session, &a), 108.0);
}

#[tokio::test(start_paused = true)]
async fn removing_edited_block_clears_editing() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage).await;
    let id = add(&mut session, BlockKind::Text, 0.0, 0.0);
    session.double_click_block(&id);
    assert_eq!(session.selection().editing(), Some(id.as_str()));

    session.mutate(|s| s.remove_block(&id));
    assert_eq!(session.selection().editing(), None);
    assert!(!session.selection().is_selected(&id));

    // Undo brings the block back but not the editing state.
    session.mutate(|s| s.undo());
    assert!(session.document().contains(&id));
    assert_eq!(session.selection().editing(), None);
}

#[tokio::test(start_paused = true)]
async fn drag_snaps_to_sibling_unless_shift_held() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage).await;
    let anchor = session
        .mutate(|s| {
            let patch: BlockPatch = serde_json::from_value(json!({ "size": { "width": 100.0, "height": 40.0 } })).unwrap();
            s.add_block(BlockKind::Button, Position::new(0.0, 0.0), json!({}), Some(&patch))
        })
        .unwrap();
    let moving = session
        .mutate(|s| {
            let patch: BlockPatch = serde_json::from_value(json!({ "size": { "width": 100.0, "height": 40.0 } })).unwrap();
            s.add_block(BlockKind::Button, Position::new(0.0, 300.0), json!({}), Some(&patch))
        })
        .unwrap();
    assert_eq!(session.document().get_block(&anchor).unwrap().bounds().x1, 100.0);

    // Candidate x = 3: right edge 103 is within 6px of the anchor's 100.
    let start = Point::new(50.0, 320.0);
    session.pointer_down(&moving, &PointerEvent::mouse(start));
    session.pointer_move(&moving, &PointerEvent::mouse(start + Vec2::new(3.0, 101.0)), None);
    let frame = session.animation_frame();
    assert_eq!(frame[0].1.position.x, 0.0);
    assert!(!session.guides().is_empty());
    let up = session.pointer_up(&moving, &PointerEvent::mouse(start + Vec2::new(3.0, 101.0)));
    assert!(up.committed);
    assert_eq!(session.document().get_block(&moving).unwrap().position.x, 0.0);
    assert!(session.guides().is_empty());

    // With shift the commit is exactly origin + delta, even though x = 3 is
    // within the threshold of the anchor's left edge.
    let origin = session.document().get_block(&moving).unwrap().position;
    let press = PointerEvent::mouse(start).with_modifiers(Modifiers::shift());
    session.pointer_down(&moving, &press);
    session.pointer_move(&moving, &press.at(start + Vec2::new(3.0, 7.0)), None);
    let frame = session.animation_frame();
    assert_eq!(frame[0].1.position, origin + Vec2::new(3.0, 7.0));
    assert!(frame[0].1.guides.is_empty());
    assert!(session.guides().is_empty());
    session.pointer_up(&moving, &press.at(start + Vec2::new(3.0, 7.0)));
    assert_eq!(
        session.document().get_block(&moving).unwrap().position,
        origin + Vec2::new(3.0, 7.0)
    );
}

#[tokio::test(start_paused = true)]
async fn remote_tier_and_last_document_snapshot() {
    let storage = Arc::new(MemoryStorage::new());
    let remote = Arc::new(MemoryRemote::new());
    let mut session = EditorSession::open(
        "site",
        EditorConfig::default(),
        storage.clone(),
        Some(remote.clone()),
        Some("token".into()),
    )
    .await
    .unwrap();

    add(&mut session, BlockKind::Countdown, 0.0, 0.0);
    session.save_now();
    let state = session.flush().await.unwrap();
    assert_eq!(state.status, SaveStatus::Saved);
    assert_eq!(remote.writes().len(), 1);
    assert!(storage.exists(LAST_DOCUMENT_KEY).await.unwrap());

    remote.set_failing(true);
    add(&mut session, BlockKind::Map, 0.0, 100.0);
    let state = session.flush().await.unwrap();
    assert_eq!(state.status, SaveStatus::Error);
    assert!(state.error.is_some());

    // The local tier still has the newest document.
    let (document, _) = session.close().await;
    let last: CanvasDocument = restore_last(storage.as_ref()).await.unwrap().unwrap();
    assert_eq!(last, document);
    assert_eq!(last.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn dragging_group_ignores_its_own_children() {
    let storage = Arc::new(MemoryStorage::new());
    let mut session = open(&storage).await;
    let a = add(&mut session, BlockKind::Text, 16.0, 16.0);
    let b = add(&mut session, BlockKind::Text, 16.0, 400.0);
    let group = session.mutate(|s| s.group_blocks(&[a.clone(), b.clone()])).unwrap();
    assert_eq!(session.document().get_block(&group).unwrap().position, Point::new(16.0, 16.0));

    // x = 21 would align with both children's left edges if they counted.
    let start = Point::new(100.0, 200.0);
    session.pointer_down(&group, &PointerEvent::mouse(start));
    session.pointer_move(&group, &PointerEvent::mouse(start + Vec2::new(5.0, 40.0)), None);
    let frame = session.animation_frame();
    assert_eq!(frame[0].1.position, Point::new(24.0, 56.0));
    assert!(frame[0].1.guides.is_empty());

    let up = session.pointer_up(&group, &PointerEvent::mouse(start + Vec2::new(5.0, 40.0)));
    assert!(up.committed);
    let doc = session.document();
    assert_eq!(doc.get_block(&group).unwrap().position, Point::new(24.0, 56.0));
    assert_eq!(doc.get_block(&a).unwrap().position, Point::new(24.0, 56.0));
    assert_eq!(doc.get_block(&b).unwrap().position, Point::new(24.0, 440.0));
}
