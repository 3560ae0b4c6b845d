use eframe::egui::{self, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search message text")
            .on_hover_text("Fuzzy-highlight matching nodes without changing the rendered graph.");
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Type to highlight matching nodes, then click one to select it.");

        ui.separator();

        let cross_channel_toggle = ui
            .checkbox(
                &mut self.include_cross_channel,
                "Include cross-channel replies",
            )
            .on_hover_text(
                "Materialize reply targets that are not part of this export as phantom nodes.",
            );
        if cross_channel_toggle.changed() {
            self.graph_dirty = true;
        }

        ui.checkbox(&mut self.live_physics, "Live physics")
            .on_hover_text("Pause to freeze the current layout.");

        ui.add_space(4.0);
        ui.collapsing("Physics tuning", |ui| {
            ui.add(
                egui::Slider::new(&mut self.physics_intensity, 0.2..=2.5).text("Intensity"),
            );
            ui.add(
                egui::Slider::new(&mut self.physics_repulsion, 0.25..=2.6).text("Repulsion"),
            );
            ui.add(egui::Slider::new(&mut self.physics_spring, 0.2..=2.2).text("Spring"));
            ui.add(
                egui::Slider::new(&mut self.physics_collision, 0.2..=2.0).text("Collision"),
            );
            ui.add(
                egui::Slider::new(&mut self.physics_velocity_damping, 0.78..=0.97)
                    .text("Velocity damping"),
            );
        });

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui
                .button("Reset view")
                .on_hover_text("Restore pan and zoom to the origin.")
                .clicked()
            {
                self.reset_view();
            }
            if ui
                .button("Re-run layout")
                .on_hover_text("Discard node positions and let the simulation settle again.")
                .clicked()
            {
                self.graph_cache = None;
                self.graph_dirty = true;
            }
        });

        ui.separator();
        self.draw_chain_ranking(ui);
    }

    /// Chains sorted by descending member count; the biggest conversational
    /// cluster leads the list.
    fn draw_chain_ranking(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("Reply chains ({})", self.reply_graph.chains.len()));
            if self.selected_chain.is_some() && ui.small_button("Clear focus").clicked() {
                self.select_chain(None);
            }
        });

        if self.reply_graph.chains.is_empty() {
            ui.label("No chains to rank.");
            return;
        }

        let row_count = self.reply_graph.chains.len().min(self.chain_rows_visible);
        let mut should_load_more = false;
        let mut pending_chain = None;
        let mut pending_root = None;

        egui::ScrollArea::vertical()
            .id_salt("chain_ranking_scroll")
            .max_height(360.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, row_count, |ui, row_range| {
                if row_range.end + Self::CHAIN_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for index in row_range {
                    let Some(chain) = self.reply_graph.chains.get(index) else {
                        continue;
                    };

                    let focused = self.selected_chain == Some(chain.id);
                    let label = format!(
                        "chain {}  —  {} messages, depth {}",
                        chain.id,
                        chain.node_ids.len(),
                        chain.depth
                    );
                    if ui
                        .selectable_label(focused, label)
                        .on_hover_text(format!("root message #{}", chain.root_id))
                        .clicked()
                    {
                        if focused {
                            pending_chain = Some(None);
                        } else {
                            pending_chain = Some(Some(chain.id));
                            pending_root = Some(chain.root_id);
                        }
                    }
                }
            });

        if let Some(chain) = pending_chain {
            self.select_chain(chain);
        }
        if let Some(root_id) = pending_root {
            self.set_selected(Some(root_id));
        }

        if should_load_more && row_count < self.reply_graph.chains.len() {
            self.chain_rows_visible =
                (row_count + Self::CHAIN_PAGE_ROWS).min(self.reply_graph.chains.len());
        }
    }
}
