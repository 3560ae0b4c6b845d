use eframe::egui::{self, Pos2, Rect, Ui, Vec2};

use super::super::render_utils::{circle_visible, screen_to_world};
use super::super::ViewModel;

/// Extra slack around a node circle when hit-testing the pointer.
const HIT_TOLERANCE: f32 = 3.0;

impl ViewModel {
    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        // Keep the world point under the cursor fixed across the zoom.
        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.05, 6.0);
        self.pan = pointer - rect.center() - (world_before * self.zoom);
    }

    /// Primary drag pans only when it did not start on a node; middle and
    /// secondary drags always pan.
    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        let primary_on_empty =
            response.dragged_by(egui::PointerButton::Primary) && self.dragged_node.is_none();
        if primary_on_empty
            || response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Drag-to-pin: a primary drag starting on a node captures it, pins its
    /// position to the cursor for the duration of the drag, and releases it
    /// back to the simulation on drop. While captured, this is the only
    /// writer of the node's position.
    pub(in crate::app) fn handle_node_drag(&mut self, rect: Rect, response: &egui::Response) {
        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(pointer) = response.interact_pointer_pos()
            && let Some(cache) = self.graph_cache.as_ref()
        {
            self.dragged_node = Self::node_at(
                pointer,
                &cache.view_scratch.draw_order,
                &cache.view_scratch.screen_positions,
                &cache.view_scratch.screen_radii,
            );
        }

        let Some(index) = self.dragged_node else {
            return;
        };
        let Some(cache) = self.graph_cache.as_mut() else {
            self.dragged_node = None;
            return;
        };
        let Some(node) = cache.nodes.get_mut(index) else {
            self.dragged_node = None;
            return;
        };

        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pointer) = response.interact_pointer_pos() {
                let world = screen_to_world(rect, self.pan, self.zoom, pointer);
                node.pinned = Some(world);
                node.world_pos = world;
                node.velocity = Vec2::ZERO;
            }
        }

        if response.drag_stopped() {
            node.pinned = None;
            self.dragged_node = None;
        }
    }

    /// Hit-test a screen point against nodes in reverse draw order, so the
    /// visually topmost node wins ties.
    pub(in crate::app) fn node_at(
        pointer: Pos2,
        draw_order: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        draw_order.iter().rev().copied().find(|&index| {
            let Some(position) = screen_positions.get(index) else {
                return false;
            };
            let radius = screen_radii.get(index).copied().unwrap_or(0.0);
            let delta = *position - pointer;
            delta.length_sq() <= (radius + HIT_TOLERANCE) * (radius + HIT_TOLERANCE)
        })
    }

    pub(in crate::app) fn hovered_index(
        ui: &Ui,
        draw_order: &[usize],
        screen_positions: &[Pos2],
        screen_radii: &[f32],
    ) -> Option<usize> {
        let pointer = ui.input(|input| input.pointer.hover_pos())?;
        Self::node_at(pointer, draw_order, screen_positions, screen_radii)
    }

    pub(in crate::app) fn visible_indices_into(
        rect: Rect,
        screen_positions: &[Pos2],
        screen_radii: &[f32],
        out: &mut Vec<usize>,
    ) {
        out.clear();
        out.extend(
            (0..screen_positions.len())
                .filter(|&index| circle_visible(rect, screen_positions[index], screen_radii[index])),
        );
    }

    pub(in crate::app) fn reset_view(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }
}
