// src/gui.rs
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};

use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{Legend, Line, LineStyle, Plot, PlotPoints};
use log::debug;

use wdq_explorer::drivers::{CsvReader, ExplorerError, PlotStyle};
use wdq_explorer::types::{ControllerEvent, FileInfo};
use wdq_explorer::waveform::{
    Axis, ChannelColor, ChannelConfig, ChannelStatistics, ExplorerSettings, NormalizeMethod, Rgb,
    Transform, TransformKind,
};
use wdq_explorer::Controller;

const MAX_LOG_LINES: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Channels,
    Processing,
    Statistics,
}

enum ChannelEdit {
    Axis(u32, Axis),
    Subplot(u32, u32),
    Color(u32, String),
}

pub struct ExplorerApp {
    controller: Controller<CsvReader>,
    rx: Receiver<ControllerEvent>,
    settings: ExplorerSettings,

    // Paths
    file_path: String,
    export_path: String,
    plot_path: String,

    // Processing form
    selected: BTreeSet<u32>,
    transform_kind: TransformKind,
    window: usize,
    factor: usize,
    cutoff_hz: f64,
    normalize_method: NormalizeMethod,

    // Cached views
    file_info: Option<FileInfo>,
    stats: BTreeMap<u32, ChannelStatistics>,
    color_inputs: BTreeMap<u32, String>,

    selected_tab: Tab,
    log_messages: Vec<String>,
}

impl ExplorerApp {
    pub fn new(settings: ExplorerSettings, initial: Option<PathBuf>) -> Self {
        let (tx, rx) = channel();
        let controller = Controller::new(CsvReader, tx).with_palette(settings.palette.clone());
        let defaults = settings.transforms.clone();
        let mut app = Self {
            controller,
            rx,
            file_path: String::new(),
            export_path: String::new(),
            plot_path: String::new(),
            selected: BTreeSet::new(),
            transform_kind: TransformKind::MovingAverage,
            window: defaults.moving_average_window,
            factor: defaults.decimation_factor,
            cutoff_hz: defaults.low_pass_cutoff_hz,
            normalize_method: defaults.normalize_method,
            file_info: None,
            stats: BTreeMap::new(),
            color_inputs: BTreeMap::new(),
            selected_tab: Tab::Channels,
            log_messages: vec!["WDQ Explorer ready.".to_owned()],
            settings,
        };
        if let Some(path) = initial {
            app.file_path = path.display().to_string();
            app.controller.load(&path).ok();
            app.drain_events();
        }
        app
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {msg}"));
        if self.log_messages.len() > MAX_LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn drain_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed = true;
            match event {
                ControllerEvent::FileLoaded(info) => {
                    self.log(&format!(
                        "Loaded {} ({} channels, {} samples, {:.3} Hz)",
                        info.filename, info.channel_count, info.sample_count, info.sample_rate
                    ));
                    self.selected = self
                        .controller
                        .channel_configs()
                        .map(ChannelConfig::channel_number)
                        .collect();
                    self.export_path = self.controller.default_export_name("_processed");
                    self.plot_path = self.controller.default_plot_name("_plot");
                    self.file_info = Some(info);
                    self.sync_color_inputs();
                    self.refresh_stats();
                }
                ControllerEvent::ProcessingApplied { message, .. } => {
                    self.log(&message);
                    self.refresh_stats();
                }
                ControllerEvent::DataReset(message) => {
                    self.log(&message);
                    self.refresh_stats();
                }
                ControllerEvent::PlotUpdate => self.sync_color_inputs(),
                ControllerEvent::Error(message) => self.log(&format!("ERROR: {message}")),
            }
        }
        changed
    }

    fn refresh_stats(&mut self) {
        if self.controller.is_loaded() {
            self.stats = self.controller.statistics().unwrap_or_default();
        }
    }

    fn sync_color_inputs(&mut self) {
        self.color_inputs = self
            .controller
            .channel_configs()
            .map(|c| (c.channel_number(), c.color.to_string()))
            .collect();
    }

    fn build_transform(&self) -> Transform {
        match self.transform_kind {
            TransformKind::MovingAverage => Transform::MovingAverage {
                window: self.window,
            },
            TransformKind::Decimation => Transform::Decimate {
                factor: self.factor,
            },
            TransformKind::LowPassFilter => Transform::LowPass {
                cutoff_hz: self.cutoff_hz,
                sample_rate_hz: self
                    .file_info
                    .as_ref()
                    .map(|info| info.sample_rate)
                    .unwrap_or(0.0),
            },
            TransformKind::OffsetRemoval => Transform::RemoveOffset,
            TransformKind::Normalization => Transform::Normalize {
                method: self.normalize_method,
            },
        }
    }

    fn file_section(&mut self, ui: &mut egui::Ui) {
        ui.label("FILE");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.file_path);
            if ui.button("Open").clicked() {
                let path = PathBuf::from(self.file_path.trim());
                self.controller.load(&path).ok();
            }
        });
        match &self.file_info {
            Some(info) => {
                ui.label(RichText::new(&info.filename).strong());
                ui.label(format!(
                    "{} channels | {} samples | {:.3} Hz | {:.3} s",
                    info.channel_count, info.sample_count, info.sample_rate, info.duration
                ));
            }
            None => {
                ui.label(RichText::new("No file loaded").color(Color32::YELLOW).small());
            }
        }
    }

    fn channels_tab(&mut self, ui: &mut egui::Ui) {
        let configs: Vec<ChannelConfig> = self.controller.channel_configs().cloned().collect();
        if configs.is_empty() {
            ui.label("Open a file to edit channels.");
            return;
        }
        let plan = self.controller.render_plan().ok();
        let mut edits = Vec::new();

        egui::Grid::new("channel_table")
            .striped(true)
            .num_columns(7)
            .show(ui, |ui| {
                for header in ["", "Ch", "Label", "Axis", "Subplot", "Color", "Processing"] {
                    ui.label(RichText::new(header).strong());
                }
                ui.end_row();

                for config in &configs {
                    let ch = config.channel_number();
                    let mut checked = self.selected.contains(&ch);
                    if ui.checkbox(&mut checked, "").changed() {
                        if checked {
                            self.selected.insert(ch);
                        } else {
                            self.selected.remove(&ch);
                        }
                    }
                    ui.label(ch.to_string());
                    ui.label(config.label());

                    let mut axis = config.axis;
                    egui::ComboBox::from_id_source(("axis", ch))
                        .selected_text(axis.as_str())
                        .show_ui(ui, |ui| {
                            for option in Axis::ALL {
                                ui.selectable_value(&mut axis, option, option.as_str());
                            }
                        });
                    if axis != config.axis {
                        edits.push(ChannelEdit::Axis(ch, axis));
                    }

                    let mut subplot = config.subplot;
                    ui.add(egui::DragValue::new(&mut subplot).clamp_range(1..=32));
                    if subplot != config.subplot {
                        edits.push(ChannelEdit::Subplot(ch, subplot));
                    }

                    ui.horizontal(|ui| {
                        let swatch = plan
                            .as_ref()
                            .and_then(|plan| plan.color_of(ch))
                            .map(to_color32)
                            .unwrap_or(Color32::DARK_GRAY);
                        ui.label(RichText::new("■").color(swatch));
                        let input = self.color_inputs.entry(ch).or_default();
                        let response =
                            ui.add(egui::TextEdit::singleline(input).desired_width(70.0));
                        if response.lost_focus() && *input != config.color.to_string() {
                            edits.push(ChannelEdit::Color(ch, input.clone()));
                        }
                    });

                    ui.label(self.controller.processing_summary(ch));
                    ui.end_row();
                }
            });

        ui.horizontal(|ui| {
            if ui.small_button("Select all").clicked() {
                self.selected = configs.iter().map(ChannelConfig::channel_number).collect();
            }
            if ui.small_button("Select none").clicked() {
                self.selected.clear();
            }
        });
        ui.horizontal(|ui| {
            ui.label("Selected to:");
            for axis in Axis::ALL {
                if ui.small_button(axis.as_str()).clicked() {
                    let channels: Vec<u32> = self.selected.iter().copied().collect();
                    self.controller.update_axes(&channels, axis).ok();
                }
            }
        });

        for edit in edits {
            match edit {
                ChannelEdit::Axis(ch, axis) => {
                    self.controller.update_axis(ch, axis).ok();
                }
                ChannelEdit::Subplot(ch, subplot) => {
                    self.controller.update_subplot(ch, subplot).ok();
                }
                ChannelEdit::Color(ch, text) => match text.parse::<ChannelColor>() {
                    Ok(color) => {
                        self.controller.update_color(ch, color).ok();
                    }
                    Err(err) => {
                        self.log(&format!("ERROR: channel {ch}: {err}"));
                        self.sync_color_inputs();
                    }
                },
            }
        }
    }

    fn processing_tab(&mut self, ui: &mut egui::Ui) {
        egui::ComboBox::from_label("Transform")
            .selected_text(self.transform_kind.title())
            .show_ui(ui, |ui| {
                for kind in TransformKind::ALL {
                    ui.selectable_value(&mut self.transform_kind, kind, kind.title());
                }
            });

        match self.transform_kind {
            TransformKind::MovingAverage => {
                ui.add(egui::DragValue::new(&mut self.window).prefix("window: "));
            }
            TransformKind::Decimation => {
                ui.add(egui::DragValue::new(&mut self.factor).prefix("factor: "));
            }
            TransformKind::LowPassFilter => {
                ui.add(
                    egui::DragValue::new(&mut self.cutoff_hz)
                        .speed(0.1)
                        .prefix("cutoff: ")
                        .suffix(" Hz"),
                );
            }
            TransformKind::OffsetRemoval => {}
            TransformKind::Normalization => {
                ui.horizontal(|ui| {
                    for method in NormalizeMethod::ALL {
                        ui.selectable_value(&mut self.normalize_method, method, method.as_str());
                    }
                });
            }
        }

        let channels: Vec<u32> = self.selected.iter().copied().collect();
        ui.label(format!("Selected channels: {channels:?}"));
        ui.horizontal(|ui| {
            if ui.button("Apply").clicked() {
                let transform = self.build_transform();
                self.controller.apply_transform(transform, &channels).ok();
            }
            if ui.button("Reset all").clicked() {
                self.controller.reset().ok();
            }
        });

        ui.separator();
        ui.label(RichText::new(self.controller.current_status()).italics());
        egui::ScrollArea::vertical()
            .id_source("history")
            .max_height(120.0)
            .show(ui, |ui| {
                for entry in self.controller.history() {
                    ui.monospace(entry);
                }
            });
    }

    fn statistics_tab(&mut self, ui: &mut egui::Ui) {
        if self.stats.is_empty() {
            ui.label("No statistics yet.");
            return;
        }
        egui::Grid::new("stats_table")
            .striped(true)
            .num_columns(6)
            .show(ui, |ui| {
                for header in ["Channel", "Min", "Max", "Mean", "Std", "N"] {
                    ui.label(RichText::new(header).strong());
                }
                ui.end_row();
                for stats in self.stats.values() {
                    ui.label(format!("{} [{}]", stats.name, stats.units));
                    ui.label(format!("{:.4}", stats.min));
                    ui.label(format!("{:.4}", stats.max));
                    ui.label(format!("{:.4}", stats.mean));
                    ui.label(format!("{:.4}", stats.std));
                    ui.label(stats.sample_count.to_string());
                    ui.end_row();
                }
            });
    }

    fn export_section(&mut self, ui: &mut egui::Ui) {
        ui.label("EXPORT");
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.export_path);
            if ui.button("CSV").clicked() {
                let path = PathBuf::from(self.export_path.trim());
                if let Ok(rows) = self.controller.export(&path) {
                    self.log(&format!("Exported {rows} rows to {}", path.display()));
                }
            }
        });
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.plot_path);
            if ui.button("PNG").clicked() {
                let path = PathBuf::from(self.plot_path.trim());
                let style = PlotStyle {
                    width: self.settings.plot_width,
                    panel_height: self.settings.plot_panel_height,
                    ..PlotStyle::default()
                };
                if self.controller.export_plot(&path, &style).is_ok() {
                    self.log(&format!("Saved plot to {}", path.display()));
                }
            }
        });
    }

    fn plot_panels(&self, ui: &mut egui::Ui) {
        let frame = match self.controller.plot_frame() {
            Ok(frame) => frame,
            Err(ExplorerError::NotLoaded) => {
                ui.centered_and_justified(|ui| ui.label("Open a file to begin."));
                return;
            }
            Err(ExplorerError::NothingToRender) => {
                ui.centered_and_justified(|ui| ui.label("All channels are hidden."));
                return;
            }
            Err(err) => {
                ui.label(RichText::new(err.to_string()).color(Color32::RED));
                return;
            }
        };

        let panels = frame.plan.panel_count().max(1);
        let spacing = ui.spacing().item_spacing.y + 24.0;
        let height = (ui.available_height() / panels as f32 - spacing).max(120.0);
        for group in &frame.plan.groups {
            ui.label(RichText::new(frame.title(group)).strong());
            let mut axes = group.primary_title.clone();
            if !group.secondary.is_empty() {
                axes.push_str(&format!("  |  {} (dashed)", group.secondary_title));
            }
            ui.label(RichText::new(axes).small());

            Plot::new(("panel", group.panel))
                .height(height)
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    for (axis, style) in group.traces() {
                        let Some(trace) = frame.traces.get(&style.channel) else {
                            continue;
                        };
                        let points: Vec<[f64; 2]> = trace.points().map(|(t, v)| [t, v]).collect();
                        let mut line = Line::new(PlotPoints::new(points))
                            .name(&trace.label)
                            .color(to_color32(style.color));
                        if axis == Axis::Secondary {
                            line = line.style(LineStyle::dashed_loose());
                        }
                        plot_ui.line(line);
                    }
                });
        }
    }
}

fn to_color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.0, rgb.1, rgb.2)
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.drain_events() {
            debug!("controller events handled, repainting");
            ctx.request_repaint();
        }

        egui::SidePanel::left("controls").min_width(420.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("WDQ Explorer");
            ui.separator();
            self.file_section(ui);
            ui.separator();

            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.selected_tab, Tab::Channels, "Channels");
                ui.selectable_value(&mut self.selected_tab, Tab::Processing, "Processing");
                ui.selectable_value(&mut self.selected_tab, Tab::Statistics, "Statistics");
            });
            ui.add_space(6.0);
            egui::ScrollArea::vertical()
                .id_source("tab")
                .max_height((ui.available_height() - 260.0).max(160.0))
                .show(ui, |ui| match self.selected_tab {
                    Tab::Channels => self.channels_tab(ui),
                    Tab::Processing => self.processing_tab(ui),
                    Tab::Statistics => self.statistics_tab(ui),
                });

            ui.separator();
            self.export_section(ui);
            ui.separator();
            egui::ScrollArea::vertical()
                .id_source("log")
                .max_height(120.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for m in &self.log_messages {
                        ui.monospace(m);
                    }
                });
        });

        egui::CentralPanel::default().show(ctx, |ui| self.plot_panels(ui));

        // Controller calls made this frame queue events; show them right away.
        if self.drain_events() {
            ctx.request_repaint();
        }
    }
}
