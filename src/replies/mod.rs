mod build;

pub use build::build_reply_graph;

pub const MIN_NODE_RADIUS: f32 = 6.0;
pub const MAX_NODE_RADIUS: f32 = 20.0;
pub const NODE_TEXT_MAX_CHARS: usize = 120;

/// One node per message id that participates in at least one reply
/// relationship. Immutable graph shape only; simulation position state is
/// owned by the app layer and never lives here.
#[derive(Clone, Debug)]
pub struct GraphNode {
    pub id: i64,
    /// 1-based id of the chain containing this node, assigned during
    /// component labeling. Zero only before labeling runs.
    pub chain_id: usize,
    /// Display text truncated to [`NODE_TEXT_MAX_CHARS`].
    pub text: String,
    /// Epoch seconds; zero sentinel for phantom nodes.
    pub timestamp: i64,
    pub reaction_count: u32,
    pub has_media: bool,
    /// True when the id was not found in the export: the reply points at a
    /// message that lives in another channel or was deleted.
    pub is_forwarded_reply: bool,
    pub radius: f32,
}

/// Directed reply edge: `source` is the replied-to message, `target` the
/// replying message, i.e. parent before child in chronological order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub source: i64,
    pub target: i64,
}

/// A connected component of the undirected reply graph.
#[derive(Clone, Debug)]
pub struct ReplyChain {
    pub id: usize,
    pub node_ids: Vec<i64>,
    pub edges: Vec<GraphEdge>,
    pub root_id: i64,
    /// Longest root-to-leaf reply distance in hops.
    pub depth: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ReplyGraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Sorted by descending member count.
    pub chains: Vec<ReplyChain>,
    pub self_reply_count: usize,
    pub cross_channel_reply_count: usize,
}

impl ReplyGraphData {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
