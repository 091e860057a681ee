use super::fake_page::{
    feed_response, item_body, item_response, test_config, Click, FakeItem, FakePage, FakeSection,
};
use crate::config::{HarvestConfig, KeyScope};
use crate::engine::{CaptureStatus, Orchestrator, RunState};
use crate::error::{CaptureError, HarvestError, PageError};
use std::collections::HashSet;
use std::time::{Duration, Instant};

fn run_with(page: FakePage, config: &HarvestConfig) -> Orchestrator<FakePage> {
    Orchestrator::new(page, config).unwrap()
}

#[tokio::test]
async fn test_full_traversal_with_one_stuck_item() {
    let page = FakePage::new(vec![
        FakeSection::new(
            "Entrees",
            vec![
                FakeItem::new("Orange Chicken"),
                FakeItem::new("Kung Pao Chicken"),
                FakeItem::new("Beijing Beef"),
            ],
        ),
        FakeSection::new(
            "Sides",
            vec![
                FakeItem::new("Chow Mein").script([Click::Silent, Click::Silent, Click::Silent]),
                FakeItem::new("Fried Rice"),
            ],
        ),
    ]);
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    let keys: Vec<_> = output.items.keys().collect();
    assert_eq!(
        keys,
        vec![
            "entrees/orange chicken",
            "entrees/kung pao chicken",
            "entrees/beijing beef",
            "sides/fried rice"
        ]
    );
    let report = &output.report;
    assert_eq!(report.captured, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.pending, 0);
    assert!(!report.complete);
    assert_eq!(report.failed_keys[0].key, "sides/chow mein");
    assert_eq!(report.failed_keys[0].segment, "sides");
    assert_eq!(report.failed_keys[0].attempts, 3);
    assert!(report.failed_keys[0].reason.contains("gave up after 3 attempts"));

    assert_eq!(orchestrator.page().clicks_on("Chow Mein"), 3);
    assert_eq!(*orchestrator.state(), RunState::Done);

    let item = output.items.get("entrees/beijing beef").unwrap();
    assert_eq!(item.name, "Beijing Beef");
    assert_eq!(item.segment, "entrees");
    assert_eq!(item.price.as_deref(), Some("$9.99"));
    assert_eq!(item.price_cents, Some(999));
}

#[tokio::test]
async fn test_capture_on_last_allowed_attempt() {
    let page = FakePage::new(vec![FakeSection::new(
        "Entrees",
        vec![FakeItem::new("Orange Chicken").script([Click::Silent, Click::Silent])],
    )]);
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    assert_eq!(output.items.len(), 1);
    assert!(output.report.complete);
    let ledger = orchestrator.ledger();
    assert_eq!(
        ledger.status("entrees/orange chicken"),
        Some(CaptureStatus::Captured)
    );
    assert_eq!(ledger.attempts("entrees/orange chicken"), 3);
}

#[tokio::test]
async fn test_noise_is_not_attributed_to_the_clicked_item() {
    let page = FakePage::new(vec![FakeSection::new(
        "Entrees",
        vec![
            FakeItem::new("Orange Chicken").script([Click::RespondAfter {
                noise: vec![feed_response("Orange Chicken"), item_response("Chow Mein")],
                delay: 2,
            }]),
            FakeItem::new("Chow Mein"),
        ],
    )]);
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    let orange = output.items.get("entrees/orange chicken").unwrap();
    assert_eq!(orange.name, "Orange Chicken");
    assert_eq!(orange.sequence, 1);

    // the stray Chow Mein response came before its click and is not reused
    let chow = output.items.get("entrees/chow mein").unwrap();
    assert_eq!(chow.sequence, 2);
    assert_eq!(output.report.responses_buffered, 3);
}

#[tokio::test]
async fn test_stale_elements_are_relocated() {
    let page = FakePage::new(vec![FakeSection::new(
        "Entrees",
        vec![
            FakeItem::new("Orange Chicken").script([Click::Stale]),
            FakeItem::new("Beijing Beef"),
        ],
    )]);
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    assert_eq!(output.items.len(), 2);
    assert!(output.report.complete);
    let ledger = orchestrator.ledger();
    assert_eq!(ledger.attempts("entrees/orange chicken"), 2);
    // its handle died with the re-render, so its first attempt was stale too
    assert_eq!(ledger.attempts("entrees/beijing beef"), 2);
    assert_eq!(orchestrator.page().clicks_on("Beijing Beef"), 1);
}

#[tokio::test]
async fn test_undecodable_response_fails_after_one_attempt() {
    let body = r#"{"data":{"itemPage":null},"errors":[{"message":"Item is unavailable"}]}"#;
    let page = FakePage::new(vec![FakeSection::new(
        "Entrees",
        vec![
            FakeItem::new("Orange Chicken").script([Click::RespondWith {
                body: body.to_string(),
                delay: 1,
            }]),
            FakeItem::new("Beijing Beef"),
        ],
    )]);
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    assert_eq!(output.items.len(), 1);
    assert_eq!(output.report.failed, 1);
    assert!(output.report.failed_keys[0].reason.contains("Item is unavailable"));
    assert_eq!(orchestrator.page().clicks_on("Orange Chicken"), 1);

    let record = orchestrator.ledger().get("entrees/orange chicken").unwrap();
    assert_eq!(record.status, CaptureStatus::Failed);
    assert!(matches!(record.error, Some(CaptureError::DecodeFailure { .. })));
}

#[tokio::test]
async fn test_page_without_structure_fails_the_run() {
    let config = test_config();
    let mut orchestrator = run_with(FakePage::new(Vec::new()), &config);

    let result = orchestrator.run().await;

    assert!(matches!(
        result,
        Err(HarvestError::StructureNotFound { attempts: 3 })
    ));
    assert_eq!(*orchestrator.state(), RunState::Failed);
    assert!(orchestrator.page().clicks.is_empty());
}

#[tokio::test]
async fn test_loose_items_are_harvested() {
    let page = FakePage::with_loose(vec![FakeItem::new("Burger"), FakeItem::new("Fries")]);
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    let keys: Vec<_> = output.items.keys().collect();
    assert_eq!(keys, vec!["menu/burger", "menu/fries"]);
}

#[tokio::test]
async fn test_items_without_label_are_never_clicked() {
    let page = FakePage::new(vec![FakeSection::new(
        "Entrees",
        vec![FakeItem::new(""), FakeItem::new("Orange Chicken")],
    )]);
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    assert_eq!(output.items.len(), 1);
    assert_eq!(orchestrator.page().clicks, vec!["Orange Chicken"]);
    assert_eq!(orchestrator.ledger().records().count(), 1);
}

#[tokio::test]
async fn test_key_scope_controls_cross_section_dedup() {
    let sections = || {
        vec![
            FakeSection::new("Popular", vec![FakeItem::new("Orange Chicken")]),
            FakeSection::new(
                "Entrees",
                vec![FakeItem::new("Orange Chicken"), FakeItem::new("Beijing Beef")],
            ),
        ]
    };

    let mut config = test_config();
    config.key_scope = KeyScope::Page;
    let mut orchestrator = run_with(FakePage::new(sections()), &config);
    let output = orchestrator.run().await.unwrap();
    let keys: Vec<_> = output.items.keys().collect();
    assert_eq!(keys, vec!["orange chicken", "beijing beef"]);
    assert_eq!(output.items.get("orange chicken").unwrap().segment, "popular");
    assert_eq!(orchestrator.page().clicks_on("Orange Chicken"), 1);

    let config = test_config();
    let mut orchestrator = run_with(FakePage::new(sections()), &config);
    let output = orchestrator.run().await.unwrap();
    assert_eq!(output.items.len(), 3);
    assert_eq!(orchestrator.page().clicks_on("Orange Chicken"), 2);
    let distinct: HashSet<_> = output.items.keys().collect();
    assert_eq!(distinct.len(), output.items.len());
}

#[tokio::test]
async fn test_total_timeout_returns_partial_results() {
    let mut items = vec![FakeItem::new("Orange Chicken")];
    items.extend(
        ["Chow Mein", "Fried Rice", "Beijing Beef", "Kung Pao Chicken"]
            .into_iter()
            .map(|label| FakeItem::new(label).script([Click::Silent])),
    );
    let page = FakePage::new(vec![FakeSection::new("Entrees", items)]);

    let mut config = test_config();
    config.interaction.wait_window_ms = 400;
    config.retry.max_attempts = 1;
    config.total_timeout_secs = Some(1);
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    let report = &output.report;
    assert_eq!(output.items.len(), 1);
    assert_eq!(report.captured, 1);
    assert!(report.failed >= 1);
    assert!(report.pending >= 1);
    assert_eq!(report.captured + report.failed + report.pending, 5);
    assert_eq!(report.pending_keys.last().unwrap(), "entrees/kung pao chicken");
    assert!(!report.complete);
    assert_eq!(*orchestrator.state(), RunState::Done);
}

#[tokio::test]
async fn test_item_captured_when_api_name_differs_from_label() {
    let page = FakePage::new(vec![FakeSection::new(
        "Entrees",
        vec![
            FakeItem::new("Orange Chicken").script([Click::RespondWith {
                body: item_body("Orange Chicken Bowl"),
                delay: 1,
            }]),
            FakeItem::new("Chow Mein"),
        ],
    )]);
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let output = orchestrator.run().await.unwrap();

    assert!(output.report.complete);
    let item = output.items.get("entrees/orange chicken").unwrap();
    assert_eq!(item.name, "Orange Chicken Bowl");
    assert_eq!(orchestrator.ledger().attempts("entrees/orange chicken"), 1);
    assert_eq!(output.items.get("entrees/chow mein").unwrap().name, "Chow Mein");
}

#[tokio::test]
async fn test_total_timeout_covers_the_scan() {
    let sections = ["Entrees", "Sides", "Drinks", "Desserts", "Extras"]
        .into_iter()
        .map(|heading| FakeSection::new(heading, vec![FakeItem::new(heading)]))
        .collect();
    let mut config = test_config();
    config.locator.scroll_settle_ms = 500;
    config.total_timeout_secs = Some(1);
    let mut orchestrator = run_with(FakePage::new(sections), &config);

    let started = Instant::now();
    let result = orchestrator.run().await;

    assert!(started.elapsed() < Duration::from_millis(1800));
    assert!(matches!(
        result,
        Err(HarvestError::DeadlineExceeded { limit }) if limit == Duration::from_secs(1)
    ));
    assert_eq!(*orchestrator.state(), RunState::Failed);
    assert!(orchestrator.page().clicks.is_empty());
}

#[tokio::test]
async fn test_browser_failure_during_scan_fails_the_run() {
    let mut page = FakePage::new(vec![FakeSection::new(
        "Entrees",
        vec![FakeItem::new("Orange Chicken")],
    )]);
    page.broken = true;
    let config = test_config();
    let mut orchestrator = run_with(page, &config);

    let result = orchestrator.run().await;

    assert!(matches!(
        result,
        Err(HarvestError::Page(PageError::Session(_)))
    ));
    assert_eq!(*orchestrator.state(), RunState::Failed);
}
