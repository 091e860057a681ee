use super::fake_page::{test_config, FakeItem, FakePage, FakeSection};
use crate::config::{HarvestConfig, KeyScope};
use crate::engine::locator::FALLBACK_SEGMENT_ID;
use crate::engine::SegmentLocator;

fn locator(config: &HarvestConfig) -> SegmentLocator {
    SegmentLocator::new(
        config.selectors.clone(),
        config.locator.clone(),
        config.key_scope,
    )
}

fn items(labels: &[&str]) -> Vec<FakeItem> {
    labels.iter().map(|l| FakeItem::new(l)).collect()
}

#[tokio::test]
async fn test_segments_and_keys_in_reading_order() {
    let mut page = FakePage::new(vec![
        FakeSection::new("Entrees", items(&["Orange Chicken", "Kung Pao Chicken", "Beijing Beef"])),
        FakeSection::new("Sides", items(&["Chow Mein"])),
    ]);
    let config = test_config();

    let segments = locator(&config).locate_with_retry(&mut page).await.unwrap();

    let ids: Vec<_> = segments.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["entrees", "sides"]);
    assert_eq!(segments[1].ordinal, 1);

    // two columns: items 0 and 1 share a row, item 2 starts the next one
    let keys: Vec<_> = segments[0].elements.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "entrees/orange chicken",
            "entrees/kung pao chicken",
            "entrees/beijing beef"
        ]
    );
    assert_eq!(segments[0].elements[2].index, 2);
    assert_eq!(segments[0].elements[0].match_id, "orange chicken");
    assert_eq!(segments[1].elements[0].label, "Chow Mein");
}

#[tokio::test]
async fn test_items_sorted_by_position_not_dom_order() {
    let mut page = FakePage::new(vec![FakeSection::new(
        "Drinks",
        vec![
            FakeItem::new("Lemonade").at(0.0, 300.0),
            FakeItem::new("Iced Tea").at(300.0, 100.0),
            FakeItem::new("Water").at(0.0, 100.0),
        ],
    )]);
    let config = test_config();

    let segments = locator(&config).locate_segments(&mut page).await.unwrap();

    let labels: Vec<_> = segments[0].elements.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["Water", "Iced Tea", "Lemonade"]);
}

#[tokio::test]
async fn test_materialize_sweeps_then_returns_to_top() {
    let mut page = FakePage::new(vec![
        FakeSection::new("A", items(&["a"])),
        FakeSection::new("B", items(&["b"])),
        FakeSection::new("C", items(&["c"])),
    ]);
    let config = test_config();

    locator(&config).materialize(&mut page).await.unwrap();
    assert_eq!(page.scrolls, vec![0, 1000, 2000, 0]);

    // unmeasurable viewport falls back to the configured height
    let mut page = FakePage::new(vec![FakeSection::new("A", items(&["a"]))]);
    page.viewport = None;
    let mut config = test_config();
    config.locator.default_viewport_height = 400;
    locator(&config).materialize(&mut page).await.unwrap();
    assert_eq!(page.scrolls, vec![0, 400, 800, 0]);
}

#[tokio::test]
async fn test_empty_labels_are_skipped() {
    let mut page = FakePage::new(vec![FakeSection::new("Entrees", items(&["Orange Chicken", "", "Beijing Beef"]))]);
    let config = test_config();

    let segments = locator(&config).locate_segments(&mut page).await.unwrap();

    assert_eq!(segments[0].elements.len(), 2);
    assert!(segments[0].elements.iter().all(|e| !e.label.is_empty()));
}

#[tokio::test]
async fn test_wrapping_container_does_not_steal_items() {
    let mut page = FakePage::new(vec![
        FakeSection::new("Entrees", items(&["Orange Chicken", "Beijing Beef"])),
        FakeSection::new("Sides", items(&["Chow Mein"])),
    ]);
    page.wrapper = true;
    let config = test_config();

    let segments = locator(&config).locate_segments(&mut page).await.unwrap();

    let ids: Vec<_> = segments.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["entrees", "sides"]);
    assert_eq!(segments.iter().map(|s| s.elements.len()).sum::<usize>(), 3);
}

#[tokio::test]
async fn test_segment_ids_are_unique() {
    let mut page = FakePage::new(vec![
        FakeSection::new("Specials", items(&["a"])),
        FakeSection::new("Specials", items(&["b"])),
        FakeSection::untitled(items(&["c"])),
    ]);
    let config = test_config();

    let segments = locator(&config).locate_segments(&mut page).await.unwrap();

    let ids: Vec<_> = segments.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["specials", "specials-2", "section-3"]);
}

#[tokio::test]
async fn test_loose_items_form_fallback_segment() {
    let mut page = FakePage::with_loose(items(&["Burger", "Fries"]));
    let mut config = test_config();
    config.key_scope = KeyScope::Page;

    let segments = locator(&config).locate_segments(&mut page).await.unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].id, FALLBACK_SEGMENT_ID);
    let keys: Vec<_> = segments[0].elements.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["burger", "fries"]);
}

#[tokio::test]
async fn test_retry_until_sections_render() {
    let mut page = FakePage::new(vec![FakeSection::new("Entrees", items(&["Orange Chicken"]))]);
    page.hidden_scans = 2;
    let config = test_config();

    let segments = locator(&config).locate_with_retry(&mut page).await.unwrap();
    assert_eq!(segments.len(), 1);

    let mut page = FakePage::new(vec![FakeSection::new("Entrees", items(&["Orange Chicken"]))]);
    page.hidden_scans = 5;
    let segments = locator(&config).locate_with_retry(&mut page).await.unwrap();
    assert!(segments.is_empty());
}
