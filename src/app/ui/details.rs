use eframe::egui::{self, RichText, Ui};

use crate::util::format_timestamp;

use super::super::ViewModel;

#[derive(Clone, Copy)]
struct ChainSummary {
    id: usize,
    size: usize,
    depth: usize,
    root_id: i64,
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Message Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected else {
            ui.label("Select a node from the graph or a chain from the ranking.");
            return;
        };

        let chain = self
            .reply_graph
            .chains
            .iter()
            .find(|chain| chain.node_ids.contains(&selected_id))
            .map(|chain| ChainSummary {
                id: chain.id,
                size: chain.node_ids.len(),
                depth: chain.depth,
                root_id: chain.root_id,
            });

        let Some(&message_position) = self.message_index.get(&selected_id) else {
            // Phantom node: the reply target lives outside this export.
            ui.label(RichText::new(format!("External message #{selected_id}")).strong());
            ui.add_space(6.0);
            ui.label(
                "This message is not part of the export. It was referenced by a reply \
                 but likely originated in another channel or was deleted.",
            );
            if let Some(chain) = chain {
                ui.separator();
                Self::chain_heading(ui, chain);
                ui.label("Includes at least one external reference.");
            }
            return;
        };

        let message = &self.export.messages[message_position];
        let from = message
            .from
            .clone()
            .unwrap_or_else(|| "unknown sender".to_string());
        let date = format_timestamp(message.date);
        let text = message.text.clone();
        let reactions = message.reactions.clone();
        let has_media = message.has_media;
        let reply_to = message.reply_to;

        ui.label(RichText::new(format!("Message #{selected_id}")).strong());
        ui.small(format!("{from} — {date}"));
        ui.add_space(6.0);

        egui::ScrollArea::vertical()
            .id_salt("details_text_scroll")
            .max_height(180.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                if text.is_empty() {
                    ui.weak("(no text)");
                } else {
                    ui.label(text.as_str());
                }
            });

        if ui.button("View full message").clicked() {
            self.show_full_message = true;
        }

        ui.add_space(6.0);
        if has_media {
            ui.label("Has media attachment");
        }
        if reactions.is_empty() {
            ui.label("No reactions");
        } else {
            ui.horizontal_wrapped(|ui| {
                ui.label("Reactions:");
                for reaction in &reactions {
                    ui.label(format!("{} {}", reaction.emoji, reaction.count));
                }
            });
        }

        ui.separator();

        if let Some(target) = reply_to {
            let in_graph = self
                .graph_cache
                .as_ref()
                .is_some_and(|cache| cache.index_by_id.contains_key(&target));
            if in_graph {
                if ui.link(format!("Replies to #{target}")).clicked() {
                    self.set_selected(Some(target));
                }
            } else {
                ui.label(format!("Replies to #{target} (not shown)"));
            }
        }

        let direct_replies = self
            .reply_graph
            .edges
            .iter()
            .filter(|edge| edge.source == selected_id)
            .map(|edge| edge.target)
            .collect::<Vec<_>>();
        if !direct_replies.is_empty() {
            ui.label(RichText::new(format!("Replies ({})", direct_replies.len())).strong());
            let mut pending = None;
            for target in direct_replies {
                if ui.link(format!("#{target}")).clicked() {
                    pending = Some(target);
                }
            }
            if let Some(target) = pending {
                self.set_selected(Some(target));
            }
        }

        ui.separator();
        match chain {
            Some(chain) => {
                Self::chain_heading(ui, chain);
                if chain.root_id == selected_id {
                    ui.label("This message is the chain's root.");
                } else {
                    ui.label(format!("Chain root: #{}", chain.root_id));
                }
                let focused = self.selected_chain == Some(chain.id);
                if ui
                    .selectable_label(focused, "Focus this chain in the graph")
                    .clicked()
                {
                    self.select_chain(if focused { None } else { Some(chain.id) });
                }
            }
            None => {
                ui.label("This message is not part of any reply chain.");
            }
        }
    }

    fn chain_heading(ui: &mut Ui, chain: ChainSummary) {
        ui.label(RichText::new(format!("Chain {}", chain.id)).strong());
        ui.label(format!(
            "{} messages, longest reply distance {}",
            chain.size, chain.depth
        ));
    }
}
