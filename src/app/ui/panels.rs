use std::collections::HashMap;

use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::replies::ReplyGraphData;
use crate::telegram::ChatExport;
use crate::util::format_timestamp;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) const INITIAL_CHAIN_ROWS: usize = 20;
    pub(in crate::app) const CHAIN_PAGE_ROWS: usize = 20;
    pub(in crate::app) const CHAIN_PREFETCH_MARGIN: usize = 4;

    pub(in crate::app) fn new(export: ChatExport) -> Self {
        let message_index = export
            .messages
            .iter()
            .enumerate()
            .map(|(index, message)| (message.id, index))
            .collect::<HashMap<_, _>>();

        Self {
            export,
            message_index,
            include_cross_channel: false,
            search: String::new(),
            selected: None,
            selected_chain: None,
            show_full_message: false,
            pan: Vec2::ZERO,
            zoom: 1.0,
            live_physics: true,
            physics_intensity: 1.0,
            physics_repulsion: 1.0,
            physics_spring: 1.0,
            physics_collision: 1.0,
            physics_velocity_damping: 0.9,
            graph_dirty: true,
            render_graph_revision: 0,
            reply_graph: ReplyGraphData::default(),
            graph_cache: None,
            search_match_cache: None,
            dragged_node: None,
            chain_rows_visible: Self::INITIAL_CHAIN_ROWS,
            visible_node_count: 0,
            visible_edge_count: 0,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        export_path: &str,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        if self.graph_dirty {
            self.rebuild_render_graph();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("reply-lens");
                    ui.separator();
                    ui.label(self.export.name.as_str());
                    ui.label(format!("messages: {}", self.export.message_count()));
                    ui.label(format!(
                        "reply nodes: {}  edges: {}",
                        self.reply_graph.node_count(),
                        self.reply_graph.edge_count()
                    ));
                    ui.label(format!(
                        "self replies: {}  cross-channel: {}",
                        self.reply_graph.self_reply_count,
                        self.reply_graph.cross_channel_reply_count
                    ));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload export"));
                    if reload_button.on_hover_text(export_path).clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(format!(
                            "in view: {} nodes / {} edges",
                            self.visible_node_count, self.visible_edge_count
                        ));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(330.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(360.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading chat export...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });

        self.show_full_message_window(ctx);
    }

    /// The "view full post" delegate: an overlay window with the complete,
    /// untruncated message.
    fn show_full_message_window(&mut self, ctx: &Context) {
        if !self.show_full_message {
            return;
        }

        let Some(message) = self
            .selected
            .and_then(|id| self.message_index.get(&id))
            .and_then(|&index| self.export.messages.get(index))
        else {
            self.show_full_message = false;
            return;
        };

        let mut open = true;
        egui::Window::new(format!("Message #{}", message.id))
            .open(&mut open)
            .default_width(420.0)
            .show(ctx, |ui| {
                ui.label(format!(
                    "{} — {}",
                    message.from.as_deref().unwrap_or("unknown sender"),
                    format_timestamp(message.date)
                ));
                ui.separator();
                egui::ScrollArea::vertical()
                    .max_height(360.0)
                    .show(ui, |ui| {
                        if message.text.is_empty() {
                            ui.weak("(no text)");
                        } else {
                            ui.label(message.text.as_str());
                        }
                    });
                if !message.reactions.is_empty() {
                    ui.separator();
                    ui.horizontal_wrapped(|ui| {
                        for reaction in &message.reactions {
                            ui.label(format!("{} {}", reaction.emoji, reaction.count));
                        }
                    });
                }
            });

        if !open {
            self.show_full_message = false;
        }
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<i64>) {
        if self.selected == selected {
            return;
        }

        self.selected = selected;
        self.show_full_message = false;
    }

    pub(in crate::app) fn select_chain(&mut self, chain_id: Option<usize>) {
        self.selected_chain = chain_id;
    }
}
