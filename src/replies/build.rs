use std::collections::{HashMap, HashSet, VecDeque};

use crate::telegram::{Message, MessageKind, build_index};
use crate::util::truncate_text;

use super::{
    GraphEdge, GraphNode, MAX_NODE_RADIUS, MIN_NODE_RADIUS, NODE_TEXT_MAX_CHARS, ReplyChain,
    ReplyGraphData,
};

/// Build the full reply graph for an export: nodes for every message that
/// takes part in a reply relationship, directed parent-to-child edges, and
/// the connected-component ("chain") partition with per-chain root and
/// depth.
///
/// Pure and total: rebuilds everything from scratch on every call, never
/// mutates `messages`, and degrades to an empty graph rather than failing.
/// Dangling reply targets are counted either way; they only materialize as
/// phantom nodes when `include_cross_channel` is set.
pub fn build_reply_graph(messages: &[Message], include_cross_channel: bool) -> ReplyGraphData {
    let index = build_index(messages);

    // Registration order doubles as component discovery order, so keep it
    // deterministic: a Vec for order, a HashSet for membership.
    let mut registered = HashSet::new();
    let mut node_order: Vec<i64> = Vec::new();
    let register = |id: i64, order: &mut Vec<i64>, seen: &mut HashSet<i64>| {
        if seen.insert(id) {
            order.push(id);
        }
    };

    let mut edges = Vec::new();
    let mut self_reply_count = 0usize;
    let mut cross_channel_reply_count = 0usize;

    for message in messages {
        if message.kind != MessageKind::Regular {
            continue;
        }
        let Some(target_id) = message.reply_to else {
            continue;
        };

        if index.contains_key(&target_id) {
            self_reply_count += 1;
            register(target_id, &mut node_order, &mut registered);
            register(message.id, &mut node_order, &mut registered);
            edges.push(GraphEdge {
                source: target_id,
                target: message.id,
            });
        } else {
            // Counted unconditionally so toggling inclusion never changes
            // the reported number of dangling references.
            cross_channel_reply_count += 1;
            if include_cross_channel {
                register(target_id, &mut node_order, &mut registered);
                register(message.id, &mut node_order, &mut registered);
                edges.push(GraphEdge {
                    source: target_id,
                    target: message.id,
                });
            }
        }
    }

    let mut nodes = node_order
        .iter()
        .map(|&id| materialize_node(id, index.get(&id).copied()))
        .collect::<Vec<_>>();

    let chains = label_chains(&node_order, &edges, &mut nodes);

    ReplyGraphData {
        nodes,
        edges,
        chains,
        self_reply_count,
        cross_channel_reply_count,
    }
}

fn materialize_node(id: i64, message: Option<&Message>) -> GraphNode {
    match message {
        Some(message) => {
            let reaction_count = message.reaction_total();
            GraphNode {
                id,
                chain_id: 0,
                text: truncate_text(&message.text, NODE_TEXT_MAX_CHARS),
                timestamp: message.date.timestamp(),
                reaction_count,
                has_media: message.has_media,
                is_forwarded_reply: false,
                radius: node_radius(reaction_count),
            }
        }
        None => GraphNode {
            id,
            chain_id: 0,
            text: format!("external message {id}"),
            timestamp: 0,
            reaction_count: 0,
            has_media: false,
            is_forwarded_reply: true,
            radius: node_radius(0),
        },
    }
}

/// Square-root damping keeps high-engagement nodes from dominating the
/// visual scale: monotone in the reaction count, clamped to [6, 20].
pub fn node_radius(reaction_count: u32) -> f32 {
    (MIN_NODE_RADIUS + (reaction_count as f32).sqrt() * 1.5).clamp(MIN_NODE_RADIUS, MAX_NODE_RADIUS)
}

/// Two-phase pass over the finished node/edge sets: first an undirected BFS
/// that partitions nodes into chains and stamps `chain_id`, then a directed
/// BFS per chain that finds the root and the longest reply distance.
fn label_chains(
    node_order: &[i64],
    edges: &[GraphEdge],
    nodes: &mut [GraphNode],
) -> Vec<ReplyChain> {
    let mut undirected: HashMap<i64, Vec<i64>> = HashMap::new();
    for edge in edges {
        undirected.entry(edge.source).or_default().push(edge.target);
        undirected.entry(edge.target).or_default().push(edge.source);
    }

    let mut chain_by_node: HashMap<i64, usize> = HashMap::new();
    let mut chains = Vec::new();
    let mut next_chain_id = 1usize;

    for &start in node_order {
        if chain_by_node.contains_key(&start) {
            continue;
        }

        let chain_id = next_chain_id;
        next_chain_id += 1;

        let mut members = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        chain_by_node.insert(start, chain_id);

        while let Some(current) = queue.pop_front() {
            members.push(current);
            for &neighbor in undirected.get(&current).into_iter().flatten() {
                if !chain_by_node.contains_key(&neighbor) {
                    chain_by_node.insert(neighbor, chain_id);
                    queue.push_back(neighbor);
                }
            }
        }

        let member_set = members.iter().copied().collect::<HashSet<_>>();
        let chain_edges = edges
            .iter()
            .filter(|edge| member_set.contains(&edge.source))
            .copied()
            .collect::<Vec<_>>();

        let (root_id, depth) = root_and_depth(&members, &chain_edges);

        chains.push(ReplyChain {
            id: chain_id,
            node_ids: members,
            edges: chain_edges,
            root_id,
            depth,
        });
    }

    for node in nodes.iter_mut() {
        node.chain_id = chain_by_node.get(&node.id).copied().unwrap_or(0);
    }

    chains.sort_by(|a, b| b.node_ids.len().cmp(&a.node_ids.len()));
    chains
}

fn root_and_depth(members: &[i64], chain_edges: &[GraphEdge]) -> (i64, usize) {
    let reply_targets = chain_edges
        .iter()
        .map(|edge| edge.target)
        .collect::<HashSet<_>>();

    // A reply forest root never appears as an edge target. A corrupted
    // export could produce a pure cycle with no such node; fall back to the
    // first member in discovery order rather than failing.
    let root_id = members
        .iter()
        .copied()
        .find(|id| !reply_targets.contains(id))
        .unwrap_or(members[0]);

    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for edge in chain_edges {
        children.entry(edge.source).or_default().push(edge.target);
    }

    let mut depth = 0usize;
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(root_id);
    queue.push_back((root_id, 0usize));

    while let Some((current, hops)) = queue.pop_front() {
        depth = depth.max(hops);
        for &child in children.get(&current).into_iter().flatten() {
            if visited.insert(child) {
                queue.push_back((child, hops + 1));
            }
        }
    }

    (root_id, depth)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::telegram::message::test_support::message;
    use crate::telegram::{Message, MessageKind, Reaction};

    fn sorted_ids(chain: &ReplyChain) -> Vec<i64> {
        let mut ids = chain.node_ids.clone();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn isolated_reply_pair() {
        let messages = vec![message(1, None), message(2, Some(1))];
        let data = build_reply_graph(&messages, false);

        assert_eq!(data.self_reply_count, 1);
        assert_eq!(data.cross_channel_reply_count, 0);

        let node_ids = data.nodes.iter().map(|n| n.id).collect::<HashSet<_>>();
        assert_eq!(node_ids, HashSet::from([1, 2]));
        assert_eq!(data.edges, vec![GraphEdge { source: 1, target: 2 }]);

        assert_eq!(data.chains.len(), 1);
        let chain = &data.chains[0];
        assert_eq!(sorted_ids(chain), vec![1, 2]);
        assert_eq!(chain.root_id, 1);
        assert_eq!(chain.depth, 1);
    }

    #[test]
    fn messages_without_replies_never_become_nodes() {
        let messages = vec![message(1, None), message(2, None), message(3, Some(2))];
        let data = build_reply_graph(&messages, false);

        assert!(!data.nodes.iter().any(|node| node.id == 1));
        assert_eq!(data.node_count(), 2);
    }

    #[test]
    fn dangling_reference_excluded() {
        let messages = vec![message(5, Some(999))];
        let data = build_reply_graph(&messages, false);

        assert!(data.nodes.is_empty());
        assert!(data.edges.is_empty());
        assert!(data.chains.is_empty());
        assert_eq!(data.self_reply_count, 0);
        assert_eq!(data.cross_channel_reply_count, 1);
    }

    #[test]
    fn dangling_reference_included_as_phantom() {
        let messages = vec![message(5, Some(999))];
        let data = build_reply_graph(&messages, true);

        let node_ids = data.nodes.iter().map(|n| n.id).collect::<HashSet<_>>();
        assert_eq!(node_ids, HashSet::from([5, 999]));

        let phantom = data.nodes.iter().find(|n| n.id == 999).unwrap();
        assert!(phantom.is_forwarded_reply);
        assert_eq!(phantom.timestamp, 0);
        assert_eq!(phantom.reaction_count, 0);

        let real = data.nodes.iter().find(|n| n.id == 5).unwrap();
        assert!(!real.is_forwarded_reply);

        assert_eq!(
            data.edges,
            vec![GraphEdge {
                source: 999,
                target: 5
            }]
        );
        assert_eq!(data.cross_channel_reply_count, 1);
    }

    #[test]
    fn cross_channel_count_is_independent_of_inclusion() {
        let messages = vec![
            message(1, None),
            message(2, Some(1)),
            message(3, Some(777)),
            message(4, Some(888)),
        ];

        let excluded = build_reply_graph(&messages, false);
        let included = build_reply_graph(&messages, true);

        assert_eq!(excluded.cross_channel_reply_count, 2);
        assert_eq!(included.cross_channel_reply_count, 2);
        assert_eq!(excluded.self_reply_count, included.self_reply_count);
        assert_eq!(excluded.node_count(), 2);
        assert_eq!(included.node_count(), 6);
    }

    #[test]
    fn straight_chain_depth_and_root() {
        // A <- B <- C <- D: three edges, depth 3, root A.
        let messages = vec![
            message(10, None),
            message(11, Some(10)),
            message(12, Some(11)),
            message(13, Some(12)),
        ];
        let data = build_reply_graph(&messages, false);

        assert_eq!(data.chains.len(), 1);
        let chain = &data.chains[0];
        assert_eq!(chain.node_ids.len(), 4);
        assert_eq!(chain.edges.len(), 3);
        assert_eq!(chain.root_id, 10);
        assert_eq!(chain.depth, 3);
    }

    #[test]
    fn branching_chain_single_root_two_children() {
        let messages = vec![message(1, None), message(2, Some(1)), message(3, Some(1))];
        let data = build_reply_graph(&messages, false);

        assert_eq!(data.chains.len(), 1);
        let chain = &data.chains[0];
        assert_eq!(chain.node_ids.len(), 3);
        assert_eq!(chain.root_id, 1);
        assert_eq!(chain.depth, 1);
        assert_eq!(chain.edges.len(), 2);
        assert!(chain.edges.iter().all(|edge| edge.source == 1));
    }

    #[test]
    fn two_disjoint_chains_sorted_by_size() {
        let messages = vec![
            message(1, None),
            message(2, Some(1)),
            message(10, None),
            message(11, Some(10)),
            message(12, Some(11)),
        ];
        let data = build_reply_graph(&messages, false);

        assert_eq!(data.chains.len(), 2);
        assert_eq!(data.chains[0].node_ids.len(), 3);
        assert_eq!(data.chains[1].node_ids.len(), 2);
        assert_eq!(data.chains[0].root_id, 10);
        assert_eq!(data.chains[1].root_id, 1);
    }

    #[test]
    fn every_edge_endpoint_has_a_node() {
        let messages = vec![
            message(1, None),
            message(2, Some(1)),
            message(3, Some(500)),
            message(4, Some(2)),
        ];

        for include in [false, true] {
            let data = build_reply_graph(&messages, include);
            let node_ids = data.nodes.iter().map(|n| n.id).collect::<HashSet<_>>();
            for edge in &data.edges {
                assert!(node_ids.contains(&edge.source));
                assert!(node_ids.contains(&edge.target));
            }
        }
    }

    #[test]
    fn chains_partition_the_node_set() {
        let messages = vec![
            message(1, None),
            message(2, Some(1)),
            message(3, Some(2)),
            message(10, None),
            message(11, Some(10)),
            message(20, Some(21)),
        ];
        let data = build_reply_graph(&messages, true);

        let mut seen = HashSet::new();
        for chain in &data.chains {
            for &id in &chain.node_ids {
                assert!(seen.insert(id), "node {id} appears in two chains");
            }
        }
        let all_nodes = data.nodes.iter().map(|n| n.id).collect::<HashSet<_>>();
        assert_eq!(seen, all_nodes);

        for node in &data.nodes {
            let chain = data
                .chains
                .iter()
                .find(|chain| chain.node_ids.contains(&node.id))
                .unwrap();
            assert_eq!(node.chain_id, chain.id);
        }
    }

    #[test]
    fn builder_is_idempotent() {
        let messages = vec![
            message(1, None),
            message(2, Some(1)),
            message(3, Some(900)),
            message(4, Some(2)),
        ];

        let first = build_reply_graph(&messages, true);
        let second = build_reply_graph(&messages, true);

        let node_set = |data: &ReplyGraphData| data.nodes.iter().map(|n| n.id).collect::<HashSet<_>>();
        let edge_set = |data: &ReplyGraphData| data.edges.iter().copied().collect::<HashSet<_>>();

        assert_eq!(node_set(&first), node_set(&second));
        assert_eq!(edge_set(&first), edge_set(&second));
        assert_eq!(first.self_reply_count, second.self_reply_count);
        assert_eq!(
            first.cross_channel_reply_count,
            second.cross_channel_reply_count
        );
        assert_eq!(first.chains.len(), second.chains.len());
        for (a, b) in first.chains.iter().zip(second.chains.iter()) {
            let mut a_ids = a.node_ids.clone();
            let mut b_ids = b.node_ids.clone();
            a_ids.sort_unstable();
            b_ids.sort_unstable();
            assert_eq!(a_ids, b_ids);
            assert_eq!(a.root_id, b.root_id);
            assert_eq!(a.depth, b.depth);
        }
    }

    #[test]
    fn radius_is_monotone_and_clamped() {
        let counts = [0u32, 1, 4, 9, 25, 81, 10_000];
        let radii = counts.map(node_radius);

        for pair in radii.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        for radius in radii {
            assert!((MIN_NODE_RADIUS..=MAX_NODE_RADIUS).contains(&radius));
        }
        assert_eq!(node_radius(0), MIN_NODE_RADIUS);
        assert_eq!(node_radius(10_000), MAX_NODE_RADIUS);
    }

    #[test]
    fn root_has_no_incoming_edge_within_its_chain() {
        let messages = vec![
            message(1, None),
            message(2, Some(1)),
            message(3, Some(2)),
            message(4, Some(1)),
        ];
        let data = build_reply_graph(&messages, false);

        for chain in &data.chains {
            assert!(
                !chain.edges.iter().any(|edge| edge.target == chain.root_id),
                "root {} has an incoming edge",
                chain.root_id
            );
        }
    }

    #[test]
    fn reply_cycle_does_not_hang_and_picks_a_fallback_root() {
        // 1 -> 2 -> 1: impossible in a real export, but corrupted data must
        // degrade instead of looping.
        let messages = vec![message(1, Some(2)), message(2, Some(1))];
        let data = build_reply_graph(&messages, false);

        assert_eq!(data.chains.len(), 1);
        let chain = &data.chains[0];
        assert_eq!(chain.node_ids.len(), 2);
        assert!(chain.node_ids.contains(&chain.root_id));
        assert!(chain.depth <= 1);
    }

    #[test]
    fn self_reply_does_not_loop() {
        let messages = vec![message(7, Some(7))];
        let data = build_reply_graph(&messages, false);

        assert_eq!(data.self_reply_count, 1);
        assert_eq!(data.node_count(), 1);
        assert_eq!(data.chains.len(), 1);
        assert_eq!(data.chains[0].root_id, 7);
        assert_eq!(data.chains[0].depth, 0);
    }

    #[test]
    fn multiple_replies_to_one_target_share_a_node() {
        let messages = vec![
            message(1, None),
            message(2, Some(1)),
            message(3, Some(1)),
            message(4, Some(1)),
        ];
        let data = build_reply_graph(&messages, false);

        assert_eq!(data.node_count(), 4);
        assert_eq!(data.edge_count(), 3);
        let incoming_on_one = data.edges.iter().filter(|e| e.source == 1).count();
        assert_eq!(incoming_on_one, 3);
    }

    #[test]
    fn service_messages_never_originate_edges_but_can_be_targets() {
        let mut pinned = message(1, None);
        pinned.kind = MessageKind::Service;
        let mut service_reply = message(3, Some(1));
        service_reply.kind = MessageKind::Service;

        let messages: Vec<Message> = vec![pinned, message(2, Some(1)), service_reply];
        let data = build_reply_graph(&messages, false);

        // Only message 2's reply counts; the service record's reply_to is ignored.
        assert_eq!(data.self_reply_count, 1);
        assert_eq!(data.node_count(), 2);
    }

    #[test]
    fn node_text_is_truncated_and_reactions_summed() {
        let mut long = message(1, None);
        long.text = "x".repeat(500);
        long.reactions = vec![
            Reaction {
                emoji: "👍".to_string(),
                count: 3,
            },
            Reaction {
                emoji: "❤".to_string(),
                count: 2,
            },
        ];
        let messages = vec![long, message(2, Some(1))];
        let data = build_reply_graph(&messages, false);

        let node = data.nodes.iter().find(|n| n.id == 1).unwrap();
        assert_eq!(node.text.chars().count(), NODE_TEXT_MAX_CHARS + 1); // +1 ellipsis
        assert_eq!(node.reaction_count, 5);
        assert!(node.radius > MIN_NODE_RADIUS);
    }
}
