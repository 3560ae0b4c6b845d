use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Pos2, Vec2};

use crate::replies::ReplyGraphData;
use crate::telegram::{ChatExport, load_export};

mod graph;
mod physics;
mod render_utils;
mod ui;

pub struct ReplyLensApp {
    export_path: String,
    state: AppState,
    reload_rx: Option<Receiver<Result<ChatExport, String>>>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<ChatExport, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    export: ChatExport,
    /// Positions of real messages in `export.messages`, for detail lookups.
    message_index: HashMap<i64, usize>,
    include_cross_channel: bool,
    search: String,
    selected: Option<i64>,
    selected_chain: Option<usize>,
    show_full_message: bool,
    pan: Vec2,
    zoom: f32,
    live_physics: bool,
    physics_intensity: f32,
    physics_repulsion: f32,
    physics_spring: f32,
    physics_collision: f32,
    physics_velocity_damping: f32,
    graph_dirty: bool,
    render_graph_revision: u64,
    reply_graph: ReplyGraphData,
    graph_cache: Option<RenderGraph>,
    search_match_cache: Option<SearchMatchCache>,
    /// Index of the node currently pinned to the cursor, if any. While set,
    /// the canvas controller is the sole writer of that node's position.
    dragged_node: Option<usize>,
    chain_rows_visible: usize,
    visible_node_count: usize,
    visible_edge_count: usize,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<usize>>,
}

struct RenderGraph {
    nodes: Vec<RenderNode>,
    edges: Vec<(usize, usize)>,
    index_by_id: HashMap<i64, usize>,
    physics_scratch: PhysicsScratch,
    view_scratch: ViewScratch,
}

struct PhysicsScratch {
    forces: Vec<Vec2>,
    positions: Vec<Vec2>,
    radii: Vec<f32>,
}

struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    visible_indices: Vec<usize>,
    visible_mask: Vec<bool>,
    draw_order: Vec<usize>,
    draw_order_dirty: bool,
}

/// Mutable per-frame simulation state layered over one immutable
/// [`crate::replies::GraphNode`]. The physics stepper owns `world_pos` and
/// `velocity`; `pinned` overrides both while a drag is active.
struct RenderNode {
    id: i64,
    chain_id: usize,
    label: String,
    radius: f32,
    is_phantom: bool,
    reaction_count: u32,
    world_pos: Vec2,
    velocity: Vec2,
    pinned: Option<Vec2>,
}

#[derive(Clone, Copy)]
struct PhysicsConfig {
    intensity: f32,
    repulsion_scale: f32,
    spring_scale: f32,
    collision_scale: f32,
    velocity_damping: f32,
    delta_seconds: f32,
}

impl ReplyLensApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, export_path: String) -> Self {
        let state = Self::start_load(export_path.clone());
        Self {
            export_path,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(export_path: String) -> Receiver<Result<ChatExport, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result =
                load_export(Path::new(&export_path)).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(export_path: String) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(export_path),
        }
    }
}

impl eframe::App for ReplyLensApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(export) => AppState::Ready(Box::new(ViewModel::new(export))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading chat export...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load chat export");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.export_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &self.export_path, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.export_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            transition = Some(match result {
                                Ok(export) => AppState::Ready(Box::new(ViewModel::new(export))),
                                Err(error) => AppState::Error(error),
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(AppState::Error(
                                "Background load worker disconnected".to_owned(),
                            ));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
