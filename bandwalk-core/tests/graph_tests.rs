// Tests for the graph log

use bandwalk_core::graph::{Axis, GraphLog, NodeProps};
use bandwalk_core::store::ContentStore;
use bandwalk_core::GraphError;
use bandwalk_scanner::{url_key, MemorySite, WikiLinkExtractor};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

const BASE: &str = "http://wiki.test";
const NAMES: [&str; 6] = ["Alpha", "Beta", "Gamma_ray", "Delta", "Epsilon", "Zeta"];

fn url(name: &str) -> String {
    format!("{}/wiki/{}", BASE, name)
}

fn page(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="/wiki/{}">{}</a>"#, l, l))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

fn log_for(site: MemorySite) -> GraphLog {
    GraphLog::new("graphs", Arc::new(site), Arc::new(WikiLinkExtractor::new())).with_base_url(BASE)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

/// The same page written three different ways.
fn spelling(name: &str, variant: usize) -> String {
    match variant % 3 {
        0 => url(name),
        1 => format!("/wiki/{}", name),
        _ => format!("{}#History", url(name)),
    }
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #[test]
    fn test_node_keys_are_unique(
        steps in prop::collection::vec((0..NAMES.len(), 0..3usize, any::<bool>()), 0..40)
    ) {
        let mut site = MemorySite::new();
        for (i, name) in NAMES.iter().enumerate() {
            site.insert(url(name), page(&[NAMES[(i + 1) % NAMES.len()], NAMES[(i + 2) % NAMES.len()]]));
        }

        runtime().block_on(async {
            let mut log = log_for(site);
            let mut expected = HashSet::new();

            for (name, variant, download) in steps {
                let candidate = spelling(NAMES[name], variant);
                if log.contains(&candidate) {
                    continue;
                }
                log.add_node(&candidate, download, NodeProps::default()).await;
                expected.insert(url_key(&candidate));
            }

            let keys: HashSet<String> = log.nodes().iter().map(|n| n.key.clone()).collect();
            assert_eq!(keys.len(), log.length());
            assert_eq!(keys, expected);
        });
    }

    #[test]
    fn test_pop_never_returns_logged_key(
        frontier in prop::collection::vec(0..NAMES.len(), 0..30),
        logged in prop::collection::hash_set(0..NAMES.len(), 0..4),
    ) {
        runtime().block_on(async {
            let mut log = log_for(MemorySite::new());
            for &i in &frontier {
                log.add_link("Seed", &format!("/wiki/{}", NAMES[i]));
            }
            for &i in &logged {
                log.add_node(&url(NAMES[i]), false, NodeProps::default()).await;
            }

            let mut popped = HashSet::new();
            loop {
                match log.pop() {
                    Ok(next) => {
                        assert!(!log.contains(&next), "{} was already logged", next);
                        assert!(popped.insert(url_key(&next)));
                        log.add_node(&next, false, NodeProps::default()).await;
                    }
                    Err(GraphError::EmptyQueue) => break,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }

            let expected: HashSet<String> = frontier
                .iter()
                .filter(|&&i| !logged.contains(&i))
                .map(|&i| url_key(NAMES[i]))
                .collect();
            assert_eq!(popped, expected);
        });
    }
}

// ============================================================================
// Frontier Tests
// ============================================================================

#[tokio::test]
async fn test_pop_skips_duplicates_and_logged() {
    let mut log = log_for(MemorySite::new());
    for target in ["/wiki/A", "/wiki/B", "/wiki/A", "/wiki/C"] {
        log.add_link("Seed", target);
    }
    log.add_node(&url("A"), false, NodeProps::default()).await;

    let first = log.pop().unwrap();
    assert_eq!(first, url("B"));
    log.add_node(&first, false, NodeProps::default()).await;

    assert_eq!(log.pop().unwrap(), url("C"));
    assert!(matches!(log.pop(), Err(GraphError::EmptyQueue)));
}

#[tokio::test]
async fn test_failed_fetch_is_never_requeued() {
    let site = MemorySite::new().with_page(url("Root"), page(&["Broken", "Broken"]));
    let mut log = log_for(site);
    log.add_node(&url("Root"), true, NodeProps::default()).await;

    let next = log.pop().unwrap();
    assert_eq!(next, url("Broken"));
    let node = log.add_node(&next, true, NodeProps::default()).await;
    assert!(node.url.is_none());
    assert!(node.size.is_none());

    assert!(matches!(log.pop(), Err(GraphError::EmptyQueue)));
    assert_eq!(log.length(), 2);
    assert_eq!(log.downloaded_count(), 1);
}

#[tokio::test]
async fn test_protocol_relative_links_are_completed() {
    let mut log = log_for(MemorySite::new());
    log.add_link("Seed", "//en.wikipedia.org/wiki/Edge");
    assert_eq!(log.pop().unwrap(), "https://en.wikipedia.org/wiki/Edge");
}

// ============================================================================
// Sibling / Child Tests
// ============================================================================

#[tokio::test]
async fn test_pick_sibling_most_linked() {
    let mut log = log_for(MemorySite::new());
    log.add_link("/wiki/P", "/wiki/A");
    log.add_link("/wiki/P", "/wiki/B");
    log.add_link("/wiki/Q", "/wiki/B");
    log.add_node(&url("P"), false, NodeProps::default()).await;

    assert_eq!(log.pick_sibling(&url("A")).unwrap(), url("B"));
}

#[tokio::test]
async fn test_pick_sibling_tie_goes_to_first_encountered() {
    let mut log = log_for(MemorySite::new());
    log.add_link("/wiki/P", "/wiki/A");
    log.add_link("/wiki/P", "/wiki/C");
    log.add_link("/wiki/P", "/wiki/B");

    assert_eq!(log.pick_sibling(&url("A")).unwrap(), url("C"));
    assert_eq!(log.pick(Axis::Sibling, &url("A")).unwrap(), url("C"));
}

#[tokio::test]
async fn test_pick_sibling_excludes_logged_and_self() {
    let mut log = log_for(MemorySite::new());
    log.add_link("/wiki/P", "/wiki/A");
    log.add_link("/wiki/P", "/wiki/A");
    log.add_link("/wiki/P", "/wiki/B");
    log.add_node(&url("B"), false, NodeProps::default()).await;

    assert!(matches!(
        log.pick_sibling(&url("A")),
        Err(GraphError::NoCandidate {
            axis: Axis::Sibling,
            ..
        })
    ));
}

#[tokio::test]
async fn test_pick_sibling_across_parents() {
    let mut log = log_for(MemorySite::new());
    log.add_link("/wiki/P", "/wiki/A");
    log.add_link("/wiki/Q", "/wiki/A");
    log.add_link("/wiki/P", "/wiki/B");
    log.add_link("/wiki/Q", "/wiki/C");
    log.add_link("/wiki/R", "/wiki/C");

    // B has one incoming link, C has two
    assert_eq!(log.pick_sibling(&url("A")).unwrap(), url("C"));
}

#[tokio::test]
async fn test_pick_child_is_deterministic() {
    let site = MemorySite::new()
        .with_page(url("P"), page(&["A", "B", "C"]))
        .with_page(url("Q"), page(&["B", "C"]));
    let mut log = log_for(site);
    log.add_node(&url("P"), true, NodeProps::default()).await;
    log.add_node(&url("Q"), true, NodeProps::default()).await;

    for _ in 0..5 {
        assert_eq!(log.pick_child(&url("P")).unwrap(), url("B"));
    }
    assert_eq!(log.pick(Axis::Child, &url("Q")).unwrap(), url("B"));
}

// ============================================================================
// Content Store Tests
// ============================================================================

#[tokio::test]
async fn test_directory_store_writes_after_commit() {
    let dir = TempDir::new().unwrap();
    let body = page(&["A"]);
    let site = MemorySite::new().with_page(url("Graph_theory"), body.clone());
    let mut log = log_for(site).with_store(ContentStore::directory(dir.path()));

    let node = log
        .add_node(&url("Graph_theory"), true, NodeProps::default())
        .await
        .clone();

    let expected = dir.path().join("graphs").join("Graph_theory.html");
    assert_eq!(node.content_ref.as_deref(), Some(expected.as_path()));
    assert_eq!(std::fs::read_to_string(&expected).unwrap(), body);
    assert_eq!(log.content(&node).unwrap(), Some(body));
}

#[tokio::test]
async fn test_directory_store_keeps_existing_file() {
    let dir = TempDir::new().unwrap();
    let existing = dir.path().join("graphs").join("Vertex.html");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, "older copy").unwrap();

    let site = MemorySite::new().with_page(url("Vertex"), "newer copy");
    let mut log = log_for(site).with_store(ContentStore::directory(dir.path()));
    log.add_node(&url("Vertex"), true, NodeProps::default()).await;

    assert_eq!(std::fs::read_to_string(&existing).unwrap(), "older copy");
    assert!(log.node(&url("Vertex")).unwrap().is_downloaded());
}
