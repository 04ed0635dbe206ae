// Graph log of considered pages, discovered links and the frontier

use crate::error::{GraphError, StoreError};
use crate::store::ContentStore;
use bandwalk_scanner::{complete_url, url_key, Fetcher, LinkExtractor, DEFAULT_BASE_URL};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction::{Incoming, Outgoing};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// A page that was considered, fetched or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: String,
    /// Absent when the fetch failed.
    pub url: Option<String>,
    pub size: Option<u64>,
    /// Number of outgoing links found on the page.
    pub linkage: Option<usize>,
    pub estimate: Option<f64>,
    pub reward: Option<f64>,
    pub content_ref: Option<PathBuf>,
}

impl Node {
    fn empty(key: String) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn is_downloaded(&self) -> bool {
        self.content_ref.is_some()
    }
}

/// Properties known about a page before it is logged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeProps {
    pub estimate: Option<f64>,
}

impl NodeProps {
    pub fn with_estimate(estimate: f64) -> Self {
        Self {
            estimate: Some(estimate),
        }
    }
}

/// A link from the page with key `source` to `target`, as written on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// Structural direction relative to a reference page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Pages sharing a parent with the reference page (breadth).
    Sibling,
    /// Pages linked from the reference page (depth).
    Child,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Sibling => write!(f, "sibling"),
            Axis::Child => write!(f, "child"),
        }
    }
}

/// Mean and sample standard deviation of in-degree over logged nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeStats {
    pub mean: f64,
    pub std: f64,
}

// Link vertices are keys, not nodes: an edge may point at a page that was
// never logged. Edge indices follow insertion order.
pub struct GraphLog {
    subject: String,
    base_url: String,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    links: DiGraph<String, Edge>,
    vertices: HashMap<String, NodeIndex>,
    frontier: VecDeque<String>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    store: ContentStore,
}

impl GraphLog {
    pub fn new(
        subject: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        Self {
            subject: subject.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            nodes: Vec::new(),
            index: HashMap::new(),
            links: DiGraph::new(),
            vertices: HashMap::new(),
            frontier: VecDeque::new(),
            fetcher,
            extractor,
            store: ContentStore::default(),
        }
    }

    /// Origin used to complete site-relative links.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_store(mut self, store: ContentStore) -> Self {
        self.store = store;
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Logs `url`, downloading it first when `download` is set.
    ///
    /// A successful download records size, outgoing links and a content
    /// reference, queues every link target and then persists the body. A
    /// failed download still logs an empty node so the page is never queued
    /// again.
    ///
    /// # Panics
    ///
    /// If a node with the same key is already logged. Callers only log
    /// candidates obtained from [`pop`](Self::pop) or the sibling/child
    /// queries, which never return logged keys.
    pub async fn add_node(&mut self, url: &str, download: bool, props: NodeProps) -> &Node {
        let key = url_key(url);
        assert!(
            !self.index.contains_key(&key),
            "node {:?} is already logged",
            key
        );

        if !download {
            let node = Node {
                key,
                url: Some(url.to_string()),
                estimate: props.estimate,
                ..Node::default()
            };
            let position = self.commit(node);
            return &self.nodes[position];
        }

        let page = match self.fetcher.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                let position = self.commit(Node::empty(key));
                return &self.nodes[position];
            }
        };

        let links = self.extractor.extract_links(url, &page.body);
        let content_ref = self.store.reference(&self.subject, url);
        let node = Node {
            key: key.clone(),
            url: Some(url.to_string()),
            size: Some(page.size),
            linkage: Some(links.len()),
            estimate: props.estimate,
            reward: None,
            content_ref: Some(content_ref.clone()),
        };

        debug!("Logging {} with {} outgoing links", key, links.len());
        for link in links {
            self.add_edge(&key, link.target.clone());
            self.frontier.push_back(link.target);
        }
        let position = self.commit(node);

        if let Err(e) = self.store.write(&content_ref, &page.body) {
            warn!("Could not store content for {}: {}", url, e);
            self.nodes[position].content_ref = None;
        }

        &self.nodes[position]
    }

    fn commit(&mut self, node: Node) -> usize {
        let position = self.nodes.len();
        self.index.insert(node.key.clone(), position);
        self.nodes.push(node);
        position
    }

    fn vertex(&mut self, key: &str) -> NodeIndex {
        if let Some(&vertex) = self.vertices.get(key) {
            return vertex;
        }
        let vertex = self.links.add_node(key.to_string());
        self.vertices.insert(key.to_string(), vertex);
        vertex
    }

    /// Records a link from `source` to `target` and queues the target,
    /// without logging `source` as a node. Lets tests lay out link structure
    /// without fetching pages.
    #[doc(hidden)]
    pub fn add_link(&mut self, source: &str, target: &str) {
        self.add_edge(&url_key(source), target.to_string());
        self.frontier.push_back(target.to_string());
    }

    fn add_edge(&mut self, source_key: &str, target: String) {
        let source = self.vertex(source_key);
        let sink = self.vertex(&url_key(&target));
        self.links.add_edge(
            source,
            sink,
            Edge {
                source: source_key.to_string(),
                target,
            },
        );
    }

    /// Next frontier entry whose key has no node yet, in complete form.
    pub fn pop(&mut self) -> Result<String, GraphError> {
        while let Some(candidate) = self.frontier.pop_front() {
            if !self.contains(&candidate) {
                return Ok(complete_url(&self.base_url, &candidate));
            }
        }
        Err(GraphError::EmptyQueue)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(&url_key(url))
    }

    pub fn node(&self, url: &str) -> Option<&Node> {
        self.index.get(&url_key(url)).map(|&i| &self.nodes[i])
    }

    /// Logged nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Discovered links in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.links.edge_weights()
    }

    pub fn edge_count(&self) -> usize {
        self.links.edge_count()
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Most recently logged page that has a URL.
    pub fn last_url(&self) -> Option<&str> {
        self.nodes.iter().rev().find_map(|n| n.url.as_deref())
    }

    /// Number of discovered links pointing at `url`.
    pub fn linkage(&self, url: &str) -> usize {
        self.in_degree(&url_key(url))
    }

    fn in_degree(&self, key: &str) -> usize {
        self.vertices
            .get(key)
            .map(|&v| self.links.edges_directed(v, Incoming).count())
            .unwrap_or(0)
    }

    pub fn in_degree_stats(&self) -> Option<DegreeStats> {
        let n = self.nodes.len();
        if n < 2 {
            return None;
        }
        let degrees: Vec<f64> = self
            .nodes
            .iter()
            .map(|node| self.in_degree(&node.key) as f64)
            .collect();
        let mean = degrees.iter().sum::<f64>() / n as f64;
        let variance = degrees.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Some(DegreeStats {
            mean,
            std: variance.sqrt(),
        })
    }

    /// Most linked-to unvisited page sharing a parent with `url`.
    pub fn pick_sibling(&self, url: &str) -> Result<String, GraphError> {
        let key = url_key(url);
        let no_candidate = || GraphError::NoCandidate {
            key: key.clone(),
            axis: Axis::Sibling,
        };
        let &vertex = self.vertices.get(&key).ok_or_else(no_candidate)?;

        let parents: HashSet<NodeIndex> = self.links.neighbors_directed(vertex, Incoming).collect();
        let reached = self
            .links
            .edge_references()
            .filter(|e| parents.contains(&e.source()))
            .map(|e| (e.target(), e.id()));

        self.most_linked(vertex, reached).ok_or_else(no_candidate)
    }

    /// Most linked-to unvisited page that `url` links to.
    pub fn pick_child(&self, url: &str) -> Result<String, GraphError> {
        let key = url_key(url);
        let no_candidate = || GraphError::NoCandidate {
            key: key.clone(),
            axis: Axis::Child,
        };
        let &vertex = self.vertices.get(&key).ok_or_else(no_candidate)?;

        let reached = self
            .links
            .edges_directed(vertex, Outgoing)
            .map(|e| (e.target(), e.id()))
            .collect::<Vec<_>>();
        // petgraph walks adjacency lists newest first
        let reached = reached.into_iter().rev();

        self.most_linked(vertex, reached).ok_or_else(no_candidate)
    }

    pub fn pick(&self, axis: Axis, url: &str) -> Result<String, GraphError> {
        match axis {
            Axis::Sibling => self.pick_sibling(url),
            Axis::Child => self.pick_child(url),
        }
    }

    /// Picks the candidate with the highest in-degree among `reached`
    /// (ordered by discovery), skipping `origin` and anything already logged.
    fn most_linked(
        &self,
        origin: NodeIndex,
        reached: impl Iterator<Item = (NodeIndex, EdgeIndex)>,
    ) -> Option<String> {
        let mut seen = HashSet::new();
        let mut best: Option<(usize, EdgeIndex)> = None;

        for (candidate, via) in reached {
            if candidate == origin || !seen.insert(candidate) {
                continue;
            }
            let key = &self.links[candidate];
            if self.index.contains_key(key) {
                continue;
            }
            let degree = self.in_degree(key);
            if best.is_none_or(|(top, _)| degree > top) {
                best = Some((degree, via));
            }
        }

        best.map(|(_, via)| complete_url(&self.base_url, &self.links[via].target))
    }

    /// Stores the observed reward of a logged page. Rewards are final.
    pub fn record_reward(&mut self, url: &str, reward: f64) -> Result<(), GraphError> {
        let key = url_key(url);
        let &position = self
            .index
            .get(&key)
            .ok_or_else(|| GraphError::UnknownNode(key.clone()))?;
        let node = &mut self.nodes[position];
        if node.reward.is_some() {
            return Err(GraphError::RewardAlreadySet(key));
        }
        node.reward = Some(reward);
        Ok(())
    }

    /// Downloaded body of `node`, if it has one.
    pub fn content(&self, node: &Node) -> Result<Option<String>, StoreError> {
        node.content_ref
            .as_deref()
            .map(|reference| self.store.read(reference))
            .transpose()
    }

    /// Total downloaded bytes.
    pub fn size(&self) -> u64 {
        self.nodes.iter().filter_map(|n| n.size).sum()
    }

    /// Pages considered, downloaded or not.
    pub fn length(&self) -> usize {
        self.nodes.len()
    }

    pub fn downloaded_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_downloaded()).count()
    }
}
