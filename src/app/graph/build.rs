use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::replies::{GraphNode, build_reply_graph};
use crate::util::{first_line, stable_pair};

use super::super::{PhysicsScratch, RenderGraph, RenderNode, ViewModel, ViewScratch};

impl ViewModel {
    fn make_render_node(graph_node: &GraphNode, index: usize) -> RenderNode {
        let (jx, jy) = stable_pair(graph_node.id);
        let mut direction = vec2(jx, jy);
        if direction.length_sq() <= 0.0001 {
            let angle = ((index as f32) * 0.618_034 + 0.11) * std::f32::consts::TAU;
            direction = vec2(angle.cos(), angle.sin());
        } else {
            direction = direction.normalized();
        }

        let initial_speed = 1.15 + (graph_node.radius * 0.022);

        RenderNode {
            id: graph_node.id,
            chain_id: graph_node.chain_id,
            label: first_line(&graph_node.text).to_string(),
            radius: graph_node.radius,
            is_phantom: graph_node.is_forwarded_reply,
            reaction_count: graph_node.reaction_count,
            world_pos: Vec2::ZERO,
            velocity: direction * initial_speed,
            pinned: None,
        }
    }

    /// Recompute the reply graph and refresh the render-side node/edge
    /// arrays. Runs whenever the export or the cross-channel toggle changes.
    /// Prior world positions are carried over by id so toggling a filter
    /// nudges the layout instead of scrambling it.
    pub(in crate::app) fn rebuild_render_graph(&mut self) {
        self.render_graph_revision = self.render_graph_revision.wrapping_add(1);
        self.search_match_cache = None;
        self.dragged_node = None;

        self.reply_graph =
            build_reply_graph(&self.export.messages, self.include_cross_channel);

        if let Some(chain_id) = self.selected_chain
            && !self.reply_graph.chains.iter().any(|chain| chain.id == chain_id)
        {
            self.selected_chain = None;
        }
        if let Some(selected) = self.selected
            && !self.reply_graph.nodes.iter().any(|node| node.id == selected)
        {
            self.selected = None;
            self.show_full_message = false;
        }

        if self.reply_graph.nodes.is_empty() {
            self.graph_cache = None;
            self.visible_node_count = 0;
            self.visible_edge_count = 0;
            self.graph_dirty = false;
            return;
        }

        let mut index_by_id = HashMap::with_capacity(self.reply_graph.node_count());
        for (index, node) in self.reply_graph.nodes.iter().enumerate() {
            index_by_id.insert(node.id, index);
        }

        let mut edges = self
            .reply_graph
            .edges
            .iter()
            .filter_map(|edge| {
                let source = index_by_id.get(&edge.source)?;
                let target = index_by_id.get(&edge.target)?;
                Some((*source, *target))
            })
            .collect::<Vec<_>>();
        edges.sort_unstable();
        edges.dedup();

        let prior_nodes = self.graph_cache.take().map(|cache| {
            cache
                .nodes
                .into_iter()
                .map(|node| (node.id, node))
                .collect::<HashMap<_, _>>()
        });

        let nodes = self
            .reply_graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, graph_node)| {
                let mut node = Self::make_render_node(graph_node, index);
                if let Some(prior) = prior_nodes
                    .as_ref()
                    .and_then(|prior| prior.get(&graph_node.id))
                {
                    node.world_pos = prior.world_pos;
                    node.velocity = prior.velocity;
                }
                node
            })
            .collect::<Vec<_>>();

        self.visible_node_count = nodes.len();
        self.visible_edge_count = edges.len();

        self.graph_cache = Some(RenderGraph {
            nodes,
            edges,
            index_by_id,
            physics_scratch: PhysicsScratch {
                forces: Vec::new(),
                positions: Vec::new(),
                radii: Vec::new(),
            },
            view_scratch: ViewScratch {
                screen_positions: Vec::new(),
                screen_radii: Vec::new(),
                visible_indices: Vec::new(),
                visible_mask: Vec::new(),
                draw_order: Vec::new(),
                draw_order_dirty: true,
            },
        });

        self.graph_dirty = false;
    }
}
