use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::util::{format_timestamp, truncate_text};

use super::super::physics::step_physics;
use super::super::render_utils::{
    PHANTOM_COLOR, blend_color, chain_color, dim_color, draw_background, edge_visible,
    world_to_screen,
};
use super::super::{PhysicsConfig, RenderGraph, ViewModel};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

impl ViewModel {
    fn update_screen_space(rect: egui::Rect, pan: egui::Vec2, zoom: f32, cache: &mut RenderGraph) {
        let scratch = &mut cache.view_scratch;
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        scratch
            .screen_positions
            .reserve(cache.nodes.len().saturating_sub(scratch.screen_positions.capacity()));
        scratch
            .screen_radii
            .reserve(cache.nodes.len().saturating_sub(scratch.screen_radii.capacity()));
        for node in &cache.nodes {
            scratch
                .screen_positions
                .push(world_to_screen(rect, pan, zoom, node.world_pos));
            scratch
                .screen_radii
                .push((node.radius * zoom.powf(0.40)).clamp(2.5, 40.0));
        }
    }

    /// Low-engagement nodes first so the busiest messages end up on top,
    /// which is also the tie-break order hit-testing relies on.
    fn ensure_draw_order(cache: &mut RenderGraph) {
        if !cache.view_scratch.draw_order_dirty
            && cache.view_scratch.draw_order.len() == cache.nodes.len()
        {
            return;
        }

        cache.view_scratch.draw_order.clear();
        cache.view_scratch.draw_order.extend(0..cache.nodes.len());
        cache.view_scratch.draw_order.sort_by(|a, b| {
            cache.nodes[*a]
                .reaction_count
                .cmp(&cache.nodes[*b].reaction_count)
        });
        cache.view_scratch.draw_order_dirty = false;
    }

    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        if self.selected.is_some() {
            return None;
        }

        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.render_graph_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let cache = self.graph_cache.as_ref()?;
        let matcher = SkimMatcherV2::default();
        let matches = cache
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                fuzzy_match_score(&matcher, &node.label, query).map(|_| index)
            })
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(super::super::SearchMatchCache {
            query: query.to_owned(),
            graph_revision: self.render_graph_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    fn draw_empty_state(&self, ui: &mut Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(120.0);
            ui.heading("No reply relationships found");
            ui.add_space(6.0);
            if !self.include_cross_channel && self.reply_graph.cross_channel_reply_count > 0 {
                ui.label(format!(
                    "{} replies point at messages outside this export. \
                     Enable \"Include cross-channel replies\" to show them.",
                    self.reply_graph.cross_channel_reply_count
                ));
            } else {
                ui.label("No message in this export replies to another one.");
            }
        });
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        if self.graph_dirty {
            self.rebuild_render_graph();
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        // Drag capture first: pan must know whether the drag started on a node.
        self.handle_node_drag(rect, &response);
        self.handle_graph_pan(&response);

        let search_matches = self.cached_search_matches();
        let pan = self.pan;
        let zoom = self.zoom;
        let selected_chain = self.selected_chain;
        let interaction_active = response.dragged();
        let frame_delta_seconds = ui
            .ctx()
            .input(|input| input.stable_dt)
            .clamp(1.0 / 240.0, 1.0 / 20.0);
        let physics = PhysicsConfig {
            intensity: self.physics_intensity,
            repulsion_scale: self.physics_repulsion,
            spring_scale: self.physics_spring,
            collision_scale: self.physics_collision,
            velocity_damping: self.physics_velocity_damping,
            delta_seconds: frame_delta_seconds,
        };

        let Some(cache) = self.graph_cache.as_mut() else {
            self.visible_node_count = 0;
            self.visible_edge_count = 0;
            self.draw_empty_state(ui);
            return;
        };

        let mut physics_moving = false;
        if self.live_physics {
            physics_moving = step_physics(cache, physics);
        }

        if physics_moving || interaction_active {
            ui.ctx().request_repaint();
        }

        Self::update_screen_space(rect, pan, zoom, cache);
        Self::ensure_draw_order(cache);
        Self::visible_indices_into(
            rect,
            &cache.view_scratch.screen_positions,
            &cache.view_scratch.screen_radii,
            &mut cache.view_scratch.visible_indices,
        );
        cache.view_scratch.visible_mask.clear();
        cache
            .view_scratch
            .visible_mask
            .resize(cache.nodes.len(), false);
        for &index in &cache.view_scratch.visible_indices {
            if let Some(entry) = cache.view_scratch.visible_mask.get_mut(index) {
                *entry = true;
            }
        }
        self.visible_node_count = cache.view_scratch.visible_indices.len();

        let hovered = Self::hovered_index(
            ui,
            &cache.view_scratch.draw_order,
            &cache.view_scratch.screen_positions,
            &cache.view_scratch.screen_radii,
        );

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pending_selection = if response.clicked_by(egui::PointerButton::Primary) {
            Some(hovered.and_then(|index| cache.nodes.get(index).map(|node| node.id)))
        } else {
            None
        };

        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let zoom_sqrt = zoom.sqrt();

        let mut visible_edge_count = 0usize;
        for &(source, target) in &cache.edges {
            if source >= cache.nodes.len() || target >= cache.nodes.len() {
                continue;
            }

            let start = cache.view_scratch.screen_positions[source];
            let end = cache.view_scratch.screen_positions[target];
            let source_visible = cache
                .view_scratch
                .visible_mask
                .get(source)
                .copied()
                .unwrap_or(false);
            let target_visible = cache
                .view_scratch
                .visible_mask
                .get(target)
                .copied()
                .unwrap_or(false);
            if !source_visible && !target_visible && !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let edge_chain = cache.nodes[source].chain_id;
            let in_selected_chain = selected_chain.is_some_and(|chain| chain == edge_chain);
            let base = blend_color(chain_color(edge_chain), Color32::from_gray(95), 0.55);
            let (line_width, line_color) = if in_selected_chain {
                ((2.2 * zoom_sqrt).clamp(1.2, 4.2), chain_color(edge_chain))
            } else if selected_chain.is_some() {
                ((0.9 * zoom_sqrt).clamp(0.5, 2.0), dim_color(base, 0.45))
            } else {
                ((1.2 * zoom_sqrt).clamp(0.6, 3.0), base)
            };

            painter.line_segment([start, end], Stroke::new(line_width, line_color));
            visible_edge_count += 1;
        }
        self.visible_edge_count = visible_edge_count;

        let selected_color = Color32::from_rgb(245, 206, 93);
        let mut selection_animating = false;

        for index in cache.view_scratch.draw_order.iter().copied() {
            if !cache
                .view_scratch
                .visible_mask
                .get(index)
                .copied()
                .unwrap_or(false)
            {
                continue;
            }

            let node = &cache.nodes[index];
            let position = cache.view_scratch.screen_positions[index];
            let radius = cache.view_scratch.screen_radii[index];

            let is_selected = self.selected == Some(node.id);
            let is_hovered = hovered == Some(index);
            let is_search_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));
            let in_selected_chain = selected_chain.is_some_and(|chain| chain == node.chain_id);

            let base_color = if node.is_phantom {
                PHANTOM_COLOR
            } else {
                chain_color(node.chain_id)
            };
            let unselected_color = if is_hovered {
                blend_color(base_color, Color32::from_gray(255), 0.35)
            } else if is_search_match {
                blend_color(base_color, Color32::from_rgb(103, 196, 255), 0.55)
            } else if selected_chain.is_some() && !in_selected_chain {
                dim_color(base_color, 0.40)
            } else if search_active && !is_search_match {
                dim_color(base_color, 0.38)
            } else {
                base_color
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("node-selection", node.id)),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }

            let color = blend_color(unselected_color, selected_color, selection_mix);

            if node.is_phantom {
                // External references render hollow so they read as
                // placeholders rather than messages.
                painter.circle_filled(position, radius, dim_color(color, 0.35));
                painter.circle_stroke(position, radius, Stroke::new(1.6, color));
            } else {
                painter.circle_filled(position, radius, color);
                painter.circle_stroke(
                    position,
                    radius,
                    Stroke::new(
                        1.0 + (selection_mix * 1.2),
                        Color32::from_rgba_unmultiplied(15, 15, 15, 190),
                    ),
                );
            }

            if selection_mix > 0.0 {
                let halo_strength = (selection_mix * (1.0 - selection_mix) * 4.0).clamp(0.0, 1.0);
                let halo_alpha = (30.0 + (halo_strength * 145.0)) as u8;
                painter.circle_stroke(
                    position,
                    radius + 4.0 + ((1.0 - selection_mix) * 6.0),
                    Stroke::new(
                        1.0 + (halo_strength * 1.6),
                        Color32::from_rgba_unmultiplied(245, 206, 93, halo_alpha),
                    ),
                );
            }

            let should_draw_label = is_selected
                || is_hovered
                || (is_search_match && zoom > 0.35)
                || radius > 17.0
                || zoom > 1.35;
            if should_draw_label {
                let label = if node.label.is_empty() {
                    format!("#{}", node.id)
                } else {
                    truncate_text(&node.label, 48)
                };
                painter.text(
                    position + vec2(radius + 5.0, 0.0),
                    Align2::LEFT_CENTER,
                    label,
                    FontId::proportional(12.0),
                    Color32::from_gray(238),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if let Some(hovered_index) = hovered
            && let Some(node) = cache.nodes.get(hovered_index)
        {
            let summary = if node.is_phantom {
                format!("#{}  |  external reference  |  chain {}", node.id, node.chain_id)
            } else if let Some(message) = self
                .message_index
                .get(&node.id)
                .and_then(|&index| self.export.messages.get(index))
            {
                format!(
                    "{}  |  {}  |  {} reactions  |  chain {}",
                    message.from.as_deref().unwrap_or("unknown"),
                    format_timestamp(message.date),
                    node.reaction_count,
                    node.chain_id
                )
            } else {
                format!("#{}  |  chain {}", node.id, node.chain_id)
            };
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                summary,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if let Some(selected) = pending_selection {
            self.set_selected(selected);
        }
    }
}
