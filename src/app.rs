use eframe::egui;
use egui::{Color32, Key, Modifiers, Sense};
use std::sync::mpsc;

use crate::canvas::CellColor;
use crate::components::history::HistoryPanel;
use crate::components::tools::Tool;
use crate::editor::{Editor, EditorCommand, GridMode, PointerButton};
use crate::io::{self, ExportResult};
use crate::render::{self, PainterSurface};
use crate::settings::AppSettings;
use crate::{log_err, log_info};

/// What a key press asks for.
#[derive(Clone, Debug, PartialEq)]
pub enum Shortcut {
    Command(EditorCommand),
    OpenTemplateDialog,
}

/// Map a key press to its shortcut. Text fields with focus never reach here.
pub fn shortcut_for(key: Key, modifiers: Modifiers) -> Option<Shortcut> {
    if modifiers.command {
        return match key {
            Key::Z if modifiers.shift => Some(Shortcut::Command(EditorCommand::Redo)),
            Key::Z => Some(Shortcut::Command(EditorCommand::Undo)),
            Key::Y => Some(Shortcut::Command(EditorCommand::Redo)),
            _ => None,
        };
    }
    if modifiers.alt {
        return None;
    }
    match key {
        Key::P => Some(Shortcut::Command(EditorCommand::SetTool(Tool::Pen))),
        Key::E => Some(Shortcut::Command(EditorCommand::SetTool(Tool::Eraser))),
        Key::Space => Some(Shortcut::Command(EditorCommand::SetTool(Tool::Pan))),
        Key::T => Some(Shortcut::OpenTemplateDialog),
        Key::G => Some(Shortcut::Command(EditorCommand::ToggleGrid)),
        Key::F => Some(Shortcut::Command(EditorCommand::ToggleFrame)),
        _ => None,
    }
}

fn to_color32(c: CellColor) -> Color32 {
    let [r, g, b, a] = c.0;
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

fn from_color32(c: Color32) -> CellColor {
    image::Rgba(c.to_srgba_unmultiplied())
}

pub struct PixelSketchApp {
    editor: Editor,
    history_panel: HistoryPanel,
    show_template_window: bool,
    /// Zoom entry text while the user is typing.
    zoom_text: String,
    grid_size_input: (u32, u32),
    /// Last message for the status bar (errors, export results).
    status: Option<String>,
    export_sender: mpsc::Sender<ExportResult>,
    export_receiver: mpsc::Receiver<ExportResult>,
    pending_exports: usize,
    /// Canvas rect from the last frame, for the status bar's hovered cell.
    canvas_rect: Option<egui::Rect>,
}

impl PixelSketchApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());

        let settings = AppSettings::load();
        // write a default file on first launch so it can be edited by hand
        if AppSettings::settings_path().is_some_and(|p| !p.exists()) {
            settings.save();
        }
        Self::with_settings(&settings)
    }

    pub fn with_settings(settings: &AppSettings) -> Self {
        let editor = Editor::new(settings);
        let grid_size_input = match editor.grid_mode() {
            GridMode::Bounded { width, height } => (width, height),
            GridMode::Unbounded => (settings.grid_width, settings.grid_height),
        };
        let (export_sender, export_receiver) = mpsc::channel();
        Self {
            zoom_text: format!("{}%", editor.zoom_percent()),
            editor,
            history_panel: HistoryPanel::default(),
            show_template_window: false,
            grid_size_input,
            status: None,
            export_sender,
            export_receiver,
            pending_exports: 0,
            canvas_rect: None,
        }
    }

    fn run(&mut self, command: EditorCommand) {
        if let Err(e) = self.editor.apply(command) {
            self.status = Some(e.to_string());
        }
    }

    fn handle_shortcut(&mut self, shortcut: Shortcut) {
        match shortcut {
            Shortcut::Command(command) => self.run(command),
            Shortcut::OpenTemplateDialog => self.show_template_window = !self.show_template_window,
        }
    }

    fn start_export(&mut self) {
        let image = match self.editor.export_image(&self.editor.export_options()) {
            Ok(image) => image,
            Err(e) => {
                log_err!("Export aborted: {}", e);
                self.status = Some(e.to_string());
                return;
            }
        };
        let file_name = io::export_filename(self.editor.export_prefix());
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(file_name)
            .add_filter("PNG image", &["png"])
            .save_file()
        else {
            return;
        };
        log_info!("Exporting {}x{} to {}", image.width(), image.height(), path.display());
        self.pending_exports += 1;
        io::spawn_export(image, path, self.export_sender.clone());
    }

    fn poll_exports(&mut self) {
        while let Ok(result) = self.export_receiver.try_recv() {
            self.pending_exports = self.pending_exports.saturating_sub(1);
            self.status = Some(match result {
                ExportResult::Saved(path) => format!("Exported {}", path.display()),
                ExportResult::Failed { path, error } => {
                    format!("Export to {} failed: {}", path.display(), error)
                }
            });
        }
    }

    // ========================================================================
    // TOOLBAR
    // ========================================================================

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for &tool in Tool::all() {
                let selected = self.editor.tool() == tool;
                if ui
                    .selectable_label(selected, tool.label())
                    .on_hover_text(format!("{} ({})", tool.label(), tool.shortcut()))
                    .clicked()
                {
                    self.run(EditorCommand::SetTool(tool));
                }
            }

            ui.separator();
            let mut color = to_color32(self.editor.color());
            if egui::color_picker::color_edit_button_srgba(ui, &mut color, egui::color_picker::Alpha::Opaque)
                .changed()
            {
                self.run(EditorCommand::SetColor(from_color32(color)));
            }

            ui.separator();
            self.zoom_controls(ui);

            ui.separator();
            let flags = self.editor.flags();
            if ui.selectable_label(flags.show_grid, "Grid").on_hover_text("Toggle grid (G)").clicked() {
                self.run(EditorCommand::ToggleGrid);
            }
            if ui.selectable_label(flags.show_frame, "Frame").on_hover_text("Toggle export frame (F)").clicked() {
                self.run(EditorCommand::ToggleFrame);
            }
            if ui.selectable_label(self.show_template_window, "Template…").on_hover_text("Template (T)").clicked() {
                self.show_template_window = !self.show_template_window;
            }

            ui.separator();
            let history = self.editor.history();
            let (can_undo, can_redo) = (history.can_undo(), history.can_redo());
            if ui.add_enabled(can_undo, egui::Button::new("Undo")).on_hover_text("Ctrl+Z").clicked() {
                self.run(EditorCommand::Undo);
            }
            if ui.add_enabled(can_redo, egui::Button::new("Redo")).on_hover_text("Ctrl+Y").clicked() {
                self.run(EditorCommand::Redo);
            }
            if ui.button("Clear").clicked() {
                self.run(EditorCommand::Clear);
            }
            if ui.button("Export PNG").clicked() {
                self.start_export();
            }

            if let GridMode::Bounded { .. } = self.editor.grid_mode() {
                ui.separator();
                self.grid_size_controls(ui);
            }
        });
    }

    fn zoom_controls(&mut self, ui: &mut egui::Ui) {
        let bounded = matches!(self.editor.grid_mode(), GridMode::Bounded { .. });
        ui.add_enabled_ui(!bounded, |ui| {
            let mut percent = self.editor.zoom_percent();
            let slider = egui::Slider::new(&mut percent, 50..=500).suffix("%").show_value(false);
            if ui.add(slider).changed() {
                self.run(EditorCommand::SetZoomPercent(percent.to_string()));
            }

            let response = ui.add(egui::TextEdit::singleline(&mut self.zoom_text).desired_width(48.0));
            if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
                let text = std::mem::take(&mut self.zoom_text);
                self.run(EditorCommand::SetZoomPercent(text));
            }
            if !response.has_focus() {
                self.zoom_text = format!("{}%", self.editor.zoom_percent());
            }
        });
    }

    fn grid_size_controls(&mut self, ui: &mut egui::Ui) {
        let max = self.editor.max_grid_size();
        ui.label("Grid");
        ui.add(egui::DragValue::new(&mut self.grid_size_input.0).clamp_range(1..=max));
        ui.label("×");
        ui.add(egui::DragValue::new(&mut self.grid_size_input.1).clamp_range(1..=max));
        if ui.button("Resize").clicked() {
            let (width, height) = self.grid_size_input;
            self.run(EditorCommand::ResizeGrid { width, height });
        }
    }

    // ========================================================================
    // TEMPLATE WINDOW
    // ========================================================================

    fn template_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_template_window;
        let mut command = None;
        egui::Window::new("Template")
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                let template = self.editor.template();
                let (w, h) = template.size();
                ui.label(format!("{} ({}×{} cells)", template.name(), w, h));
                for part in template.parts() {
                    ui.label(format!("  {}: {} cells", part.name, part.cells.len()));
                }
                ui.separator();
                let mut overlay = self.editor.flags().show_template;
                if ui.checkbox(&mut overlay, "Show overlay").changed() {
                    command = Some(EditorCommand::ToggleTemplate);
                }
                if ui.button("Apply to canvas").clicked() {
                    command = Some(EditorCommand::ApplyTemplate);
                }
            });
        self.show_template_window = open;
        if let Some(command) = command {
            self.run(command);
        }
    }

    // ========================================================================
    // CANVAS
    // ========================================================================

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        self.canvas_rect = Some(rect);
        self.editor.set_viewport_size(rect.size());
        let local = |p: egui::Pos2| render::to_surface(p, rect.min);

        let (latest, pressed, released, scroll) = ui.input(|i| {
            let pressed = [
                (egui::PointerButton::Primary, PointerButton::Primary),
                (egui::PointerButton::Secondary, PointerButton::Secondary),
                (egui::PointerButton::Middle, PointerButton::Middle),
            ]
            .into_iter()
            .find(|(b, _)| i.pointer.button_pressed(*b))
            .map(|(_, ours)| ours);
            (i.pointer.latest_pos(), pressed, i.pointer.any_released(), i.scroll_delta.y)
        });

        // hovered() is false under the template window and other floating UI
        if let (Some(button), Some(pos)) = (pressed, latest)
            && response.hovered()
        {
            self.editor.pointer_down(local(pos), button);
        }

        if self.editor.is_busy() {
            match latest {
                Some(pos) if rect.contains(pos) => self.editor.pointer_move(local(pos)),
                _ => self.editor.pointer_leave(),
            }
            if released {
                self.editor.pointer_up();
            }
        }

        if let Some(pos) = response.hover_pos() {
            if scroll != 0.0 {
                self.editor.wheel(scroll.signum() as f64, local(pos));
            }
            ui.ctx().set_cursor_icon(self.editor.cursor_for(local(pos)));
        }

        let mut surface = PainterSurface {
            painter: &painter,
            origin: rect.min.to_vec2(),
        };
        render::render(&self.editor.scene(), &mut surface);
    }

    fn status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let hovered = ui
                .ctx()
                .pointer_hover_pos()
                .zip(self.canvas_rect)
                .filter(|(p, rect)| rect.contains(*p))
                .and_then(|(p, rect)| self.editor.cell_at(render::to_surface(p, rect.min)));
            match hovered {
                Some(cell) => ui.label(format!("Cell {}", cell)),
                None => ui.label("Cell –"),
            };
            ui.separator();
            ui.label(format!("Zoom {}%", self.editor.zoom_percent()));
            ui.separator();
            ui.label(format!("{} painted", self.editor.store().len()));
            if let GridMode::Bounded { width, height } = self.editor.grid_mode() {
                ui.separator();
                ui.label(format!("{}×{} grid", width, height));
            }
            if self.pending_exports > 0 {
                ui.separator();
                ui.spinner();
            }
            if let Some(status) = &self.status {
                ui.separator();
                ui.label(status);
            }
        });
    }
}

impl eframe::App for PixelSketchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);
    }
}

impl PixelSketchApp {
    /// One frame of the whole window.
    pub fn ui(&mut self, ctx: &egui::Context) {
        self.poll_exports();
        if self.pending_exports > 0 {
            ctx.request_repaint();
        }

        // --- Keyboard shortcuts (skipped while a text field has focus) ---
        if !ctx.wants_keyboard_input() {
            let shortcuts: Vec<Shortcut> = ctx.input(|i| {
                i.events
                    .iter()
                    .filter_map(|e| match e {
                        egui::Event::Key { key, pressed: true, repeat: false, modifiers, .. } => {
                            shortcut_for(*key, *modifiers)
                        }
                        _ => None,
                    })
                    .collect()
            });
            for shortcut in shortcuts {
                self.handle_shortcut(shortcut);
            }
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.status_bar(ui);
        });

        egui::SidePanel::right("history").default_width(180.0).show(ctx, |ui| {
            ui.heading("History");
            if let Some(index) = self.history_panel.show(ui, self.editor.history()) {
                self.editor.jump_to(index);
            }
        });

        self.template_window(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::from_gray(230)))
            .show(ctx, |ui| {
                self.canvas(ui);
            });
    }
}
