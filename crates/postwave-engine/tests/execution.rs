//! End-to-end runs against an in-memory queue with fake collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::Connection;

use postwave_catalog::{Catalog, CatalogSource, Product};
use postwave_channels::{Ack, Channel, ChannelError, WirePayload};
use postwave_content::{ContentRecord, ContentResolver, ContentStore};
use postwave_core::config::{CompositorConfig, PostingConfig};
use postwave_engine::{Assembler, Engine};
use postwave_media::{Compose, ComposeRequest};
use postwave_queue::{init_db, JobStatus, QueueStore, RowState, SqliteQueueStore};
use postwave_registry::Registry;

struct FakeCatalog {
    catalog: Catalog,
}

impl CatalogSource for FakeCatalog {
    fn load(&self) -> postwave_catalog::Result<Catalog> {
        Ok(self.catalog.clone())
    }
}

struct FakeCompositor {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Compose for FakeCompositor {
    async fn compose(&self, req: &ComposeRequest) -> postwave_media::Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push(req.base_image_url.clone());
        Ok(format!("https://img.test/composed?src={}", req.base_image_url))
    }
}

struct FakeChannel {
    delivered: Mutex<Vec<WirePayload>>,
    reject: bool,
}

#[async_trait]
impl Channel for FakeChannel {
    async fn deliver(&self, payload: &WirePayload) -> postwave_channels::Result<Ack> {
        if self.reject {
            return Err(ChannelError::Rejected {
                response: r#"{"status":"error","reason":"quota exceeded"}"#.into(),
            });
        }
        self.delivered.lock().unwrap().push(payload.clone());
        Ok(Ack::success())
    }
}

struct FakeContent {
    rows: Vec<ContentRecord>,
}

impl ContentStore for FakeContent {
    fn find_active(
        &self,
        key_type: &str,
        key: &str,
    ) -> postwave_content::Result<Option<ContentRecord>> {
        Ok(self
            .rows
            .iter()
            .find(|r| {
                r.active && r.key_type == key_type && r.key.eq_ignore_ascii_case(key)
            })
            .cloned())
    }
}

fn product(id: &str, title: &str, days_ago: i64, images: &[&str]) -> Product {
    Product {
        id: id.into(),
        title: title.into(),
        description: "A fine product".into(),
        image_urls: images.iter().map(|s| s.to_string()).collect(),
        keywords: "skincare".into(),
        created_at: Some(Utc::now() - Duration::days(days_ago)),
        ..Default::default()
    }
}

fn content_rows() -> Vec<ContentRecord> {
    vec![
        ContentRecord {
            key_type: "function".into(),
            key: "latest".into(),
            promotional_paragraph: "Fresh picks".into(),
            footer: "Shop now".into(),
            active: true,
            ..Default::default()
        },
        ContentRecord {
            key_type: "manual".into(),
            key: "promo".into(),
            promotional_paragraph: "Promo!".into(),
            collection_cover_override: "https://img.test/m1.png, https://img.test/m2.png"
                .into(),
            active: true,
            ..Default::default()
        },
        ContentRecord {
            key_type: "manual".into(),
            key: "bare".into(),
            promotional_paragraph: "Bare promo!".into(),
            active: true,
            ..Default::default()
        },
        ContentRecord {
            key_type: "product".into(),
            key: "Toner CT456".into(),
            product_cover_override: "https://cdn.test/override-toner.png".into(),
            active: true,
            ..Default::default()
        },
    ]
}

struct Harness {
    engine: Engine,
    queue: Arc<SqliteQueueStore>,
    channel: Arc<FakeChannel>,
    compositor: Arc<FakeCompositor>,
}

fn harness(reject: bool, send_single: bool) -> Harness {
    harness_with_content(reject, send_single, content_rows())
}

fn harness_with_content(reject: bool, send_single: bool, rows: Vec<ContentRecord>) -> Harness {
    let conn = Connection::open_in_memory().unwrap();
    init_db(&conn).unwrap();
    let queue = Arc::new(SqliteQueueStore::new(Arc::new(Mutex::new(conn))));

    let catalog = Catalog::build(vec![
        product(
            "p1",
            "Foam Cleanser AB123",
            1,
            &["https://cdn.test/p1-a.jpg", "https://cdn.test/p1-b.jpg"],
        ),
        product("p2", "Toner CT456", 2, &["https://cdn.test/p2-a.jpg"]),
        product("p3", "Ghost Serum NO999", 100, &[]),
    ]);

    let compositor = Arc::new(FakeCompositor {
        calls: Mutex::new(Vec::new()),
    });
    let channel = Arc::new(FakeChannel {
        delivered: Mutex::new(Vec::new()),
        reject,
    });
    let content: Arc<dyn ContentStore> = Arc::new(FakeContent { rows });

    let compositor_cfg = CompositorConfig {
        endpoint: "http://compose.test".into(),
        api_key: None,
        product_overlay_url: "https://overlay.test/product.png".into(),
        collection_overlay_url: "https://overlay.test/collection.png".into(),
        cover_width: 1080,
        cover_height: 1080,
    };
    let posting = PostingConfig {
        footer_message: "\n\nFollow our page!".into(),
        closing_image_urls: vec!["https://img.test/closing.png".into()],
        video_base_url: "https://video.test".into(),
    };

    let assembler = Assembler::new(
        compositor.clone(),
        content.clone(),
        compositor_cfg,
        posting,
    );
    let engine = Engine::new(
        Arc::new(FakeCatalog { catalog }),
        queue.clone(),
        Registry::with_builtins(),
        ContentResolver::new(content),
        assembler,
        channel.clone(),
        send_single,
    );

    Harness {
        engine,
        queue,
        channel,
        compositor,
    }
}

fn past() -> String {
    (Utc::now() - Duration::hours(1)).to_rfc3339()
}

fn row_status(h: &Harness, id: i64) -> Option<String> {
    h.queue
        .list_rows()
        .unwrap()
        .into_iter()
        .find(|r| r.id == id)
        .and_then(|r| r.status)
}

fn row_state(h: &Harness, id: i64) -> RowState {
    let notes = h
        .queue
        .list_rows()
        .unwrap()
        .into_iter()
        .find(|r| r.id == id)
        .and_then(|r| r.notes);
    RowState::parse(notes.as_deref()).unwrap()
}

#[tokio::test]
async fn future_row_is_marked_pending_and_untouched() {
    let h = harness(false, true);
    let due = (Utc::now() + Duration::hours(2)).to_rfc3339();
    let id = h.queue.insert(&due, "latest(days=7)").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.rows_pending, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("Scheduled (pending)"));
    assert!(row_state(&h, id).per_key.is_empty());
    assert!(h.channel.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rows_missing_due_or_keys_are_silently_skipped() {
    let h = harness(false, true);
    let a = h.queue.insert("", "latest(days=7)").unwrap();
    let b = h.queue.insert(&past(), "   ").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.rows_skipped, 2);
    assert!(row_status(&h, a).is_none());
    assert!(row_status(&h, b).is_none());
}

#[tokio::test]
async fn unparseable_due_time_fails_the_row() {
    let h = harness(false, true);
    let id = h.queue.insert("next tuesday", "latest(days=7)").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.rows_failed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("Row Failed"));
}

#[tokio::test]
async fn corrupt_notes_fail_the_row_without_executing_keys() {
    let h = harness(false, true);
    let id = h.queue.insert(&past(), "latest(days=7)").unwrap();
    h.queue.write_notes(id, "{this is not json").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.rows_failed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("Row Failed"));
    assert!(h.channel.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn successful_multi_post_composes_covers_and_appends_closing_image() {
    let h = harness(false, true);
    let id = h.queue.insert(&past(), "latest(days=7)").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.keys_completed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("1/1 Completed"));

    let delivered = h.channel.delivered.lock().unwrap();
    let images = delivered[0].product_image.clone().unwrap();
    let urls: Vec<&str> = images.split(',').collect();
    // One composed cover per product, newest first, then the closing
    // image. The second product's authored cover override is used as
    // the composition base instead of its gallery image.
    assert_eq!(urls.len(), 3);
    assert!(urls[0].contains("p1-a.jpg"));
    assert!(urls[1].contains("override-toner.png"));
    assert_eq!(urls[2], "https://img.test/closing.png");
    assert_eq!(delivered[0].promotional_paragraph, "Fresh picks\n\nFollow our page!");
    assert_eq!(delivered[0].footer, "Shop now\n\nFollow our page!");
}

#[tokio::test]
async fn failed_key_is_isolated_and_counted() {
    let h = harness(false, true);
    let id = h
        .queue
        .insert(&past(), "latest(days=7), bogus(x=1), latest(days=7, limit=1)")
        .unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.keys_completed, 2);
    assert_eq!(report.keys_failed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("2/3 Completed"));

    let state = row_state(&h, id);
    // Records stay in original key order.
    assert_eq!(state.per_key.len(), 3);
    assert_eq!(state.per_key[0].key_raw, "latest(days=7)");
    assert_eq!(state.per_key[0].status, JobStatus::Completed);
    assert_eq!(state.per_key[1].key_raw, "bogus(x=1)");
    assert_eq!(state.per_key[1].status, JobStatus::Failed);
    assert!(state.per_key[1].error.as_deref().unwrap().contains("bogus"));
    assert_eq!(state.per_key[2].status, JobStatus::Completed);
}

#[tokio::test]
async fn rerun_skips_completed_keys() {
    let h = harness(false, true);
    let id = h.queue.insert(&past(), "latest(days=7)").unwrap();

    h.engine.run(Utc::now()).await.unwrap();
    assert_eq!(h.channel.delivered.lock().unwrap().len(), 1);
    assert_eq!(h.compositor.calls.lock().unwrap().len(), 2);

    h.engine.run(Utc::now()).await.unwrap();

    // No new composition or delivery on the second run.
    assert_eq!(h.channel.delivered.lock().unwrap().len(), 1);
    assert_eq!(h.compositor.calls.lock().unwrap().len(), 2);
    assert_eq!(row_status(&h, id).as_deref(), Some("1/1 Completed"));
}

#[tokio::test]
async fn webhook_rejection_fails_the_key() {
    let h = harness(true, true);
    let id = h.queue.insert(&past(), "latest(days=7)").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.keys_failed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("0/1 Completed"));
    let state = row_state(&h, id);
    assert_eq!(state.per_key[0].status, JobStatus::Failed);
    let error = state.per_key[0].error.as_deref().unwrap();
    assert!(error.contains("rejected"));
    // The webhook's raw response survives into the recorded error.
    assert!(error.contains("quota exceeded"));
}

#[tokio::test]
async fn failed_key_is_retried_on_the_next_run() {
    let rejecting = harness(true, true);
    let id = rejecting.queue.insert(&past(), "latest(days=7)").unwrap();
    rejecting.engine.run(Utc::now()).await.unwrap();
    assert_eq!(row_status(&rejecting, id).as_deref(), Some("0/1 Completed"));

    // Rebuild the engine against the same queue with a healthy channel.
    let notes = row_state(&rejecting, id).to_notes().unwrap();
    let healthy = harness(false, true);
    let id2 = healthy.queue.insert(&past(), "latest(days=7)").unwrap();
    healthy.queue.write_notes(id2, &notes).unwrap();

    healthy.engine.run(Utc::now()).await.unwrap();

    assert_eq!(row_status(&healthy, id2).as_deref(), Some("1/1 Completed"));
    assert_eq!(
        row_state(&healthy, id2).per_key[0].status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn registry_key_without_content_posts_footer_message_alone() {
    let h = harness_with_content(false, true, Vec::new());
    let id = h.queue.insert(&past(), "latest(days=7)").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.keys_completed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("1/1 Completed"));

    let delivered = h.channel.delivered.lock().unwrap();
    // Covers still go out; the footer message stands in for the text.
    assert!(delivered[0].product_image.is_some());
    assert_eq!(delivered[0].promotional_paragraph, "Follow our page!");
    assert_eq!(delivered[0].footer, "Follow our page!");
}

#[tokio::test]
async fn manual_key_without_content_row_fails() {
    let h = harness_with_content(false, true, Vec::new());
    let id = h.queue.insert(&past(), "manual(key=ghost)").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.keys_failed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("0/1 Completed"));
    let state = row_state(&h, id);
    assert!(state.per_key[0]
        .error
        .as_deref()
        .unwrap()
        .contains("No content"));
    assert!(h.channel.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn manual_post_without_cover_override_fails() {
    let h = harness(false, true);
    let id = h.queue.insert(&past(), "manual(key=bare)").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.keys_failed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("0/1 Completed"));
    let state = row_state(&h, id);
    assert!(state.per_key[0]
        .error
        .as_deref()
        .unwrap()
        .contains("cover"));
    assert!(h.channel.delivered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn lone_product_resolution_dispatches_as_single() {
    // No `single` flag, but the directive resolves exactly one product.
    // With single dispatch disabled the payload is assembled and then
    // swallowed, which only the single branch does.
    let h = harness(false, false);
    let id = h.queue.insert(&past(), "latest(days=7, limit=1)").unwrap();

    h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(row_status(&h, id).as_deref(), Some("1/1 Completed"));
    assert_eq!(h.compositor.calls.lock().unwrap().len(), 1);
    assert!(h.channel.delivered.lock().unwrap().is_empty());
    let state = row_state(&h, id);
    assert_eq!(
        state.per_key[0].response.as_ref().unwrap()["status"],
        "success"
    );
}

#[tokio::test]
async fn imageless_product_is_skipped_in_a_multi_post() {
    let h = harness(false, true);
    let id = h.queue.insert(&past(), "latest(days=120)").unwrap();

    let report = h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(report.keys_completed, 1);
    assert_eq!(row_status(&h, id).as_deref(), Some("1/1 Completed"));

    let delivered = h.channel.delivered.lock().unwrap();
    let images = delivered[0].product_image.clone().unwrap();
    let urls: Vec<&str> = images.split(',').collect();
    // Two covers plus the closing image; the imageless product is left out.
    assert_eq!(urls.len(), 3);
    assert!(!images.contains("Ghost"));
}

#[tokio::test]
async fn manual_post_uses_override_covers_without_composition() {
    let h = harness(false, true);
    h.queue.insert(&past(), "manual(key=promo)").unwrap();

    h.engine.run(Utc::now()).await.unwrap();

    assert!(h.compositor.calls.lock().unwrap().is_empty());
    let delivered = h.channel.delivered.lock().unwrap();
    assert_eq!(
        delivered[0].product_image.as_deref(),
        Some("https://img.test/m1.png,https://img.test/m2.png")
    );
}

#[tokio::test]
async fn video_post_goes_out_with_a_derived_video_url() {
    let h = harness(false, true);
    let id = h.queue.insert(&past(), "latest(days=7, video)").unwrap();

    h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(row_status(&h, id).as_deref(), Some("1/1 Completed"));
    let delivered = h.channel.delivered.lock().unwrap();
    assert!(delivered[0].is_video());
    // Code extracted from the newest product's title.
    assert_eq!(
        delivered[0].video_urls.as_deref(),
        Some("https://video.test/AB123.mp4")
    );
    assert!(h.compositor.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn disabled_single_dispatch_records_a_synthetic_success() {
    let h = harness(false, false);
    let id = h.queue.insert(&past(), "latest(days=7, single)").unwrap();

    h.engine.run(Utc::now()).await.unwrap();

    assert_eq!(row_status(&h, id).as_deref(), Some("1/1 Completed"));
    // Assembled (covers composed) but never delivered.
    assert_eq!(h.compositor.calls.lock().unwrap().len(), 1);
    assert!(h.channel.delivered.lock().unwrap().is_empty());

    let state = row_state(&h, id);
    assert_eq!(state.per_key[0].status, JobStatus::Completed);
    assert_eq!(
        state.per_key[0].response.as_ref().unwrap()["status"],
        "success"
    );
}

#[tokio::test]
async fn empty_queue_run_reports_nothing() {
    let h = harness(false, true);
    let report = h.engine.run(Utc::now()).await.unwrap();
    assert_eq!(report.rows_scanned, 0);
    assert_eq!(report.rows_processed, 0);
}
