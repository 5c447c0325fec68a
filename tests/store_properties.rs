// tests/store_properties.rs
//
// IngestionEngine invariants: one item per url, newest-first order,
// bounded store and bounded seen-set that outlives eviction.

use proptest::prelude::*;
use std::sync::Arc;

use news_pipeline::store::{guid_for, IngestionEngine, DEFAULT_SEEN_MAX};

const T1: &str = "Mon, 06 May 2024 10:00:00 +0000";
const T2: &str = "Mon, 06 May 2024 11:00:00 +0000";

#[test]
fn duplicate_url_is_rejected_without_change() {
    let e = IngestionEngine::new(10, 10);
    assert!(e.add_item("first", "https://x/a", "one", "FAZ", Some(T1)));
    let before = e.snapshot();
    assert!(!e.add_item("second", "https://x/a", "two", "WSJ", Some(T2)));
    assert_eq!(e.snapshot(), before);
}

#[test]
fn newer_item_comes_first_regardless_of_insert_order() {
    let e = IngestionEngine::new(10, 10);
    e.add_item("B", "https://x/b", "", "X", Some(T2));
    e.add_item("A", "https://x/a", "", "X", Some(T1));
    let titles: Vec<_> = e.snapshot().into_iter().map(|i| i.title).collect();
    assert_eq!(titles, vec!["B", "A"]);

    let e = IngestionEngine::new(10, 10);
    e.add_item("A", "https://x/a", "", "X", Some(T1));
    e.add_item("B", "https://x/b", "", "X", Some(T2));
    let titles: Vec<_> = e.snapshot().into_iter().map(|i| i.title).collect();
    assert_eq!(titles, vec!["B", "A"]);
}

#[test]
fn evicted_urls_stay_seen() {
    let e = IngestionEngine::new(2, 100);
    for i in 0..5 {
        let ts = format!("Mon, 06 May 2024 10:0{i}:00 +0000");
        e.add_item("t", &format!("https://x/{i}"), "", "X", Some(&ts));
    }
    assert_eq!(e.len(), 2);
    assert!(e.query(|it| it.url == "https://x/0").is_empty());
    assert!(!e.add_item("again", "https://x/0", "", "X", Some(T2)));
}

#[test]
fn seen_set_is_capped_at_two_thousand() {
    let e = IngestionEngine::new(10, DEFAULT_SEEN_MAX);
    for i in 0..=DEFAULT_SEEN_MAX {
        e.add_item("t", &format!("https://x/{i}"), "", "X", None);
    }
    assert_eq!(e.seen_len(), DEFAULT_SEEN_MAX);
    assert!(e.is_seen(&format!("https://x/{DEFAULT_SEEN_MAX}")));
    assert!(!e.is_seen("https://x/0"));
}

#[test]
fn guid_is_stable_across_engines() {
    let a = IngestionEngine::new(10, 10);
    let b = IngestionEngine::new(10, 10);
    a.add_item("t", "https://x/a", "", "X", Some(T1));
    b.add_item("other", "https://x/a", "c", "Y", Some(T2));
    assert_eq!(a.snapshot()[0].guid, b.snapshot()[0].guid);
    assert_eq!(a.snapshot()[0].guid, guid_for("https://x/a"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_keep_urls_unique() {
    let e = Arc::new(IngestionEngine::new(1000, 5000));
    let mut handles = Vec::new();
    for w in 0..8 {
        let e = e.clone();
        handles.push(tokio::spawn(async move {
            let mut won = 0;
            for i in 0..100 {
                // Every writer races on the same 100 urls.
                let ts = format!("Mon, 06 May 2024 10:{:02}:00 +0000", i % 60);
                if e.add_item(&format!("w{w}"), &format!("https://x/{i}"), "", "X", Some(&ts)) {
                    won += 1;
                }
            }
            won
        }));
    }
    let mut total = 0;
    for h in handles {
        total += h.await.unwrap();
    }
    assert_eq!(total, 100);
    assert_eq!(e.len(), 100);
}

proptest! {
    #[test]
    fn store_is_bounded_unique_and_sorted(
        ops in proptest::collection::vec((0u8..60, 0i64..100_000), 0..200),
        feed_max in 1usize..40,
    ) {
        let e = IngestionEngine::new(feed_max, 1000);
        for (u, ts) in &ops {
            let date = time::OffsetDateTime::from_unix_timestamp(1_700_000_000 + ts)
                .unwrap()
                .format(&time::format_description::well_known::Rfc2822)
                .unwrap();
            e.add_item("t", &format!("https://x/{u}"), "", "X", Some(&date));
        }

        let items = e.snapshot();
        prop_assert!(items.len() <= feed_max);

        let mut urls: Vec<_> = items.iter().map(|i| i.url.clone()).collect();
        urls.sort();
        urls.dedup();
        prop_assert_eq!(urls.len(), items.len());

        for pair in items.windows(2) {
            prop_assert!(pair[0].effective_ts() >= pair[1].effective_ts());
        }
    }
}
