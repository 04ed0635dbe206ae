use bandwalk_scanner::{LinkExtractor, WikiLinkExtractor};

const PAGE: &str = r##"<html><body>
    <a href="/wiki/Vertex_(graph_theory)">Vertex</a>
    <a href="https://en.wikipedia.org/wiki/Edge">Edge</a>
    <a href="/wiki/Vertex_(graph_theory)">Vertex again</a>
    <a href="/wiki/File:Graph.svg">Figure</a>
    <a href="https://example.com/about">Elsewhere</a>
    <a name="anchor">No href</a>
    <a href="#History">Jump</a>
</body></html>"##;

#[test]
fn test_extracts_wiki_links_in_document_order() {
    let links = WikiLinkExtractor::new().extract_links("/wiki/Graph", PAGE);
    let targets: Vec<&str> = links.iter().map(|l| l.target.as_str()).collect();

    assert_eq!(
        targets,
        vec![
            "/wiki/Vertex_(graph_theory)",
            "https://en.wikipedia.org/wiki/Edge",
            "/wiki/Vertex_(graph_theory)",
            "/wiki/File:Graph.svg",
        ]
    );
    assert!(links.iter().all(|l| l.source == "/wiki/Graph"));
}

#[test]
fn test_duplicate_links_are_kept() {
    let links = WikiLinkExtractor::new().extract_links("/wiki/Graph", PAGE);
    let repeated = links
        .iter()
        .filter(|l| l.target == "/wiki/Vertex_(graph_theory)")
        .count();
    assert_eq!(repeated, 2);
}

#[test]
fn test_without_special_pages() {
    let links = WikiLinkExtractor::new()
        .without_special_pages()
        .extract_links("/wiki/Graph", PAGE);
    assert!(links.iter().all(|l| !l.target.contains("File:")));
    assert_eq!(links.len(), 3);
}

#[test]
fn test_page_without_links() {
    let links = WikiLinkExtractor::new().extract_links("/wiki/Stub", "<p>nothing here</p>");
    assert!(links.is_empty());
}
