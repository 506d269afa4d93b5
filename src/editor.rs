//! The single-owner drawing controller.
//!
//! [`Editor`] exclusively owns the pixel store, history, export frame and view
//! transform. The UI layer forwards pointer and wheel events in surface-local
//! screen coordinates and dispatches [`EditorCommand`]s; rendering and export
//! read the state through [`Editor::scene`] and [`Editor::export_image`].

use std::fmt;
use std::path::Path;

use eframe::egui;
use egui::{CursorIcon, Vec2};
use image::RgbaImage;

use crate::canvas::{Cell, CellColor, PixelStore, line_cells};
use crate::components::history::HistoryManager;
use crate::components::tools::Tool;
use crate::frame::{ExportFrame, FrameDrag, FrameDragKind, FrameHandle, FrameHit};
use crate::io::{self, ExportError, ExportOptions};
use crate::render::{RenderFlags, Scene};
use crate::settings::AppSettings;
use crate::template::Template;
use crate::viewport::{CoordinateMapper, ScreenPos, ViewTransform, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP};
use crate::{log_info, log_warn};

/// Zoom percentages accepted by the text entry.
pub const ZOOM_PERCENT_MIN: f64 = ZOOM_MIN * 100.0;
pub const ZOOM_PERCENT_MAX: f64 = ZOOM_MAX * 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridMode {
    Unbounded,
    Bounded { width: u32, height: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Discrete actions from toolbar buttons, menus and shortcuts.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorCommand {
    SetTool(Tool),
    SetColor(CellColor),
    ToggleGrid,
    ToggleTemplate,
    ApplyTemplate,
    ToggleFrame,
    Clear,
    Undo,
    Redo,
    /// Bounded mode only.
    ResizeGrid { width: u32, height: u32 },
    /// Raw text from the zoom entry, e.g. `"150"` or `"150%"`.
    SetZoomPercent(String),
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    InvalidGridSize { width: u32, height: u32, max: u32 },
    InvalidZoom(String),
    /// Grid resize requested on the infinite canvas.
    NotBounded,
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::InvalidGridSize { width, height, max } => write!(
                f,
                "Grid size {}x{} is out of range (1 to {} per side)",
                width, height, max
            ),
            EditorError::InvalidZoom(text) => write!(
                f,
                "'{}' is not a zoom percentage ({} to {})",
                text, ZOOM_PERCENT_MIN, ZOOM_PERCENT_MAX
            ),
            EditorError::NotBounded => write!(f, "Only a bounded grid can be resized"),
        }
    }
}

impl std::error::Error for EditorError {}

/// Parse `"150"` / `"150%"` into a zoom factor clamped to the allowed range.
pub fn parse_zoom_percent(text: &str) -> Result<f64, EditorError> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match number.parse::<f64>() {
        Ok(p) if p.is_finite() => Ok(p.clamp(ZOOM_PERCENT_MIN, ZOOM_PERCENT_MAX) / 100.0),
        _ => Err(EditorError::InvalidZoom(text.to_string())),
    }
}

// ============================================================================
// GESTURES
// ============================================================================

/// What the pointer is doing between press and release.
#[derive(Clone, Debug)]
enum Gesture {
    Idle,
    Stroke { tool: Tool, last: Cell, changed: bool },
    Pan { last: ScreenPos },
    Frame(FrameDrag),
    /// Bounded grid edge drag; sizes are computed from the store as it was at
    /// press time.
    GridResize { drag: FrameDrag, start: PixelStore },
}

// ============================================================================
// EDITOR
// ============================================================================

pub struct Editor {
    store: PixelStore,
    history: HistoryManager,
    template: Template,
    frame: ExportFrame,
    view: ViewTransform,
    tool: Tool,
    color: CellColor,
    stamp_color: CellColor,
    flags: RenderFlags,
    max_grid_size: u32,
    export_scale: u32,
    export_prefix: String,
    viewport: Option<Vec2>,
    gesture: Gesture,
}

impl Editor {
    pub fn new(settings: &AppSettings) -> Self {
        let store = match settings.grid_mode() {
            GridMode::Bounded { width, height } => PixelStore::bounded(width, height),
            GridMode::Unbounded => PixelStore::unbounded(),
        };
        let history = HistoryManager::new(settings.max_undo_steps, &store);
        log_info!(
            "Editor started: {:?}, undo limit {}",
            settings.grid_mode(),
            settings.max_undo_steps
        );
        Self {
            store,
            history,
            template: Template::figure(),
            frame: ExportFrame::new(0, 0, settings.frame_width, settings.frame_height),
            view: ViewTransform::new(settings.cell_size),
            tool: Tool::default(),
            color: settings.default_color,
            stamp_color: settings.stamp_color,
            flags: RenderFlags {
                show_grid: settings.show_grid,
                show_template: false,
                show_frame: false,
            },
            max_grid_size: settings.max_grid_size.max(1),
            export_scale: settings.export_scale.max(1),
            export_prefix: settings.export_prefix.clone(),
            viewport: None,
            gesture: Gesture::Idle,
        }
    }

    // --- accessors ---------------------------------------------------------

    pub fn store(&self) -> &PixelStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Move the history cursor to `index` (0 = oldest entry) and restore that
    /// snapshot. A gesture in progress is completed first; out-of-range or
    /// current indices change nothing.
    pub fn jump_to(&mut self, index: usize) {
        if index >= self.history.len() || index == self.history.cursor() {
            return;
        }
        self.finish_gesture();
        self.history.jump_to(index, &mut self.store);
        log_info!("Jumped to history step {} of {}", index + 1, self.history.len());
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn frame(&self) -> ExportFrame {
        self.frame
    }

    /// Replace the export frame (e.g. from the command line).
    pub fn set_frame(&mut self, frame: ExportFrame) {
        self.frame = frame;
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> CellColor {
        self.color
    }

    pub fn flags(&self) -> RenderFlags {
        self.flags
    }

    pub fn max_grid_size(&self) -> u32 {
        self.max_grid_size
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions::with_scale(self.export_scale)
    }

    pub fn export_prefix(&self) -> &str {
        &self.export_prefix
    }

    /// The grid regime follows the live store, so undoing a resize also
    /// restores the old dimensions.
    pub fn grid_mode(&self) -> GridMode {
        match self.store.dimensions() {
            Some((width, height)) => GridMode::Bounded { width, height },
            None => GridMode::Unbounded,
        }
    }

    pub fn zoom_percent(&self) -> u32 {
        match self.grid_mode() {
            GridMode::Bounded { .. } => 100,
            GridMode::Unbounded => (self.view.zoom * 100.0).round() as u32,
        }
    }

    /// True while a stroke or drag is in progress.
    pub fn is_busy(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    pub fn mapper(&self) -> CoordinateMapper {
        match self.store.dimensions() {
            Some((width, height)) => CoordinateMapper::Bounded {
                cell_size: self.view.cell_size,
                width,
                height,
            },
            None => CoordinateMapper::Unbounded(self.view),
        }
    }

    /// The cell under a surface position, `None` outside a bounded grid.
    pub fn cell_at(&self, pos: ScreenPos) -> Option<Cell> {
        self.mapper().screen_to_grid(pos)
    }

    /// Where the template sits: centered on the origin of the infinite
    /// canvas, or centered in a bounded grid.
    pub fn template_offset(&self) -> Cell {
        match self.grid_mode() {
            GridMode::Bounded { width, height } => self.template.centered_in(width, height),
            GridMode::Unbounded => self.template.centered_on_origin(),
        }
    }

    pub fn scene(&self) -> Scene<'_> {
        Scene {
            store: &self.store,
            mapper: self.mapper(),
            viewport: self.viewport.unwrap_or(Vec2::ZERO),
            template: &self.template,
            template_offset: self.template_offset(),
            frame: self.frame,
            flags: self.flags,
        }
    }

    /// Report the drawing surface size. The first report centers the origin.
    pub fn set_viewport_size(&mut self, size: Vec2) {
        if self.viewport.is_none() {
            self.view.center_in(size);
        }
        self.viewport = Some(size);
    }

    // --- pointer input ----------------------------------------------------

    fn frame_hit(&self, pos: ScreenPos) -> FrameHit {
        match self.grid_mode() {
            GridMode::Unbounded if self.flags.show_frame => self.frame.hit_test(&self.view, pos),
            _ => FrameHit::Outside,
        }
    }

    /// Right, bottom and bottom-right grips of a bounded grid. They only
    /// grab in the margin outside the grid, which belongs to painting.
    fn grid_handle_at(&self, pos: ScreenPos) -> Option<FrameHandle> {
        let GridMode::Bounded { width, height } = self.grid_mode() else {
            return None;
        };
        if self.cell_at(pos).is_some() {
            return None;
        }
        let grid = ExportFrame::new(0, 0, width, height);
        match grid.hit_test(&self.mapper().view(), pos) {
            FrameHit::Handle(h @ (FrameHandle::Right | FrameHandle::Bottom | FrameHandle::BottomRight)) => Some(h),
            _ => None,
        }
    }

    /// Unclipped cell under a position, used for drags that may leave the grid.
    fn raw_cell(&self, pos: ScreenPos) -> Cell {
        self.mapper().view().screen_to_grid(pos)
    }

    pub fn pointer_down(&mut self, pos: ScreenPos, button: PointerButton) {
        self.finish_gesture();
        let bounded = matches!(self.grid_mode(), GridMode::Bounded { .. });

        if button == PointerButton::Middle {
            if !bounded {
                self.gesture = Gesture::Pan { last: pos };
            }
            return;
        }
        if button != PointerButton::Primary {
            return;
        }

        if let Some(handle) = self.grid_handle_at(pos) {
            let (w, h) = self.store.dimensions().unwrap_or((1, 1));
            let drag = FrameDrag::new(
                FrameDragKind::Resize(handle),
                self.raw_cell(pos),
                ExportFrame::new(0, 0, w, h),
            );
            self.gesture = Gesture::GridResize { drag, start: self.store.snapshot() };
            return;
        }

        match self.frame_hit(pos) {
            FrameHit::Handle(handle) => {
                let drag = FrameDrag::new(FrameDragKind::Resize(handle), self.raw_cell(pos), self.frame);
                self.gesture = Gesture::Frame(drag);
                return;
            }
            FrameHit::Interior => {
                let drag = FrameDrag::new(FrameDragKind::Move, self.raw_cell(pos), self.frame);
                self.gesture = Gesture::Frame(drag);
                return;
            }
            FrameHit::Outside => {}
        }

        if self.tool.paints() {
            let cell = self.raw_cell(pos);
            let changed = self.apply_tool(self.tool, cell);
            self.gesture = Gesture::Stroke { tool: self.tool, last: cell, changed };
        } else if !bounded {
            self.gesture = Gesture::Pan { last: pos };
        }
    }

    pub fn pointer_move(&mut self, pos: ScreenPos) {
        let cell = self.raw_cell(pos);
        match &mut self.gesture {
            Gesture::Idle => {}
            Gesture::Stroke { tool, last, changed } => {
                if cell == *last {
                    return;
                }
                let from = std::mem::replace(last, cell);
                // skip the first cell; it was painted by the previous sample
                for c in line_cells(from, cell).into_iter().skip(1) {
                    *changed |= match *tool {
                        Tool::Pen => self.store.paint(c, self.color),
                        Tool::Eraser => self.store.erase(c),
                        Tool::Pan => false,
                    };
                }
            }
            Gesture::Pan { last } => {
                let (dx, dy) = (pos.x - last.x, pos.y - last.y);
                *last = pos;
                self.view.pan_by(dx, dy);
            }
            Gesture::Frame(drag) => {
                self.frame = drag.frame_at(cell);
            }
            Gesture::GridResize { drag, start } => {
                let next = drag.frame_at(cell);
                let (w, h) = (next.width.min(self.max_grid_size), next.height.min(self.max_grid_size));
                if self.store.dimensions() != Some((w, h))
                    && let Some(resized) = resized_store(start, w, h)
                {
                    self.store = resized;
                }
            }
        }
    }

    /// Pointer released. Completes the gesture and records history if the
    /// store changed.
    pub fn pointer_up(&mut self) {
        self.finish_gesture();
    }

    /// Leaving the surface ends a stroke just like releasing the button.
    pub fn pointer_leave(&mut self) {
        self.finish_gesture();
    }

    /// Wheel zoom around `anchor`. Positive notches zoom in. Ignored on a
    /// bounded grid.
    pub fn wheel(&mut self, notches: f64, anchor: ScreenPos) {
        if notches == 0.0 || matches!(self.grid_mode(), GridMode::Bounded { .. }) {
            return;
        }
        let step = if notches > 0.0 { ZOOM_STEP } else { -ZOOM_STEP };
        // keep the factor on the 0.1 lattice so repeated steps don't drift
        let zoom = ((self.view.zoom + step) * 10.0).round() / 10.0;
        self.view.zoom_around(zoom, anchor);
    }

    pub fn cursor_for(&self, pos: ScreenPos) -> CursorIcon {
        match &self.gesture {
            Gesture::Pan { .. } => return CursorIcon::Grabbing,
            Gesture::Frame(drag) | Gesture::GridResize { drag, .. } => {
                return match drag.kind {
                    FrameDragKind::Move => CursorIcon::Move,
                    FrameDragKind::Resize(handle) => handle.cursor(),
                };
            }
            Gesture::Stroke { .. } | Gesture::Idle => {}
        }
        if let Some(handle) = self.grid_handle_at(pos) {
            return handle.cursor();
        }
        match self.frame_hit(pos) {
            FrameHit::Handle(handle) => handle.cursor(),
            FrameHit::Interior => CursorIcon::Move,
            FrameHit::Outside => self.tool.cursor(),
        }
    }

    /// Apply `tool` to a list of cells as a single stroke, for callers without
    /// pointer input. Records one history entry if anything changed.
    pub fn stroke_cells(&mut self, tool: Tool, cells: impl IntoIterator<Item = Cell>) -> bool {
        self.finish_gesture();
        if !tool.paints() {
            return false;
        }
        let mut changed = false;
        for cell in cells {
            changed |= self.apply_tool(tool, cell);
        }
        if changed {
            self.record(tool.stroke_description());
        }
        changed
    }

    fn apply_tool(&mut self, tool: Tool, cell: Cell) -> bool {
        match tool {
            Tool::Pen => self.store.paint(cell, self.color),
            Tool::Eraser => self.store.erase(cell),
            Tool::Pan => false,
        }
    }

    fn finish_gesture(&mut self) {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Stroke { tool, changed: true, .. } => {
                self.record(tool.stroke_description());
            }
            Gesture::GridResize { start, .. } => {
                if start.dimensions() != self.store.dimensions()
                    && let Some((w, h)) = self.store.dimensions()
                {
                    self.record(&format!("Resize grid to {}x{}", w, h));
                }
            }
            Gesture::Frame(drag) => {
                if drag.start != self.frame {
                    log_info!(
                        "Export frame now {}x{} at ({}, {})",
                        self.frame.width,
                        self.frame.height,
                        self.frame.x,
                        self.frame.y
                    );
                }
            }
            Gesture::Stroke { .. } | Gesture::Pan { .. } | Gesture::Idle => {}
        }
    }

    fn record(&mut self, description: &str) {
        self.history.record(description, &self.store);
        log_info!("{} ({} cells, {} undo steps)", description, self.store.len(), self.history.undo_count());
    }

    // --- commands ---------------------------------------------------------

    /// Run a discrete command. Any gesture in progress is completed first, so
    /// history is never recorded mid-drag. On error, state is unchanged.
    pub fn apply(&mut self, command: EditorCommand) -> Result<(), EditorError> {
        self.finish_gesture();
        match command {
            EditorCommand::SetTool(tool) => self.tool = tool,
            EditorCommand::SetColor(color) => self.color = color,
            EditorCommand::ToggleGrid => self.flags.show_grid = !self.flags.show_grid,
            EditorCommand::ToggleTemplate => self.flags.show_template = !self.flags.show_template,
            EditorCommand::ToggleFrame => self.flags.show_frame = !self.flags.show_frame,
            EditorCommand::ApplyTemplate => {
                let offset = self.template_offset();
                let mut changed = false;
                for cell in self.template.placed(offset) {
                    changed |= self.store.paint(cell, self.stamp_color);
                }
                if changed {
                    self.record("Apply template");
                }
            }
            EditorCommand::Clear => {
                if !self.store.is_empty() {
                    self.store.clear();
                    self.record("Clear");
                }
            }
            EditorCommand::Undo => {
                if let Some(step) = self.history.undo(&mut self.store) {
                    log_info!("Undo: {}", step);
                }
            }
            EditorCommand::Redo => {
                if let Some(step) = self.history.redo(&mut self.store) {
                    log_info!("Redo: {}", step);
                }
            }
            EditorCommand::ResizeGrid { width, height } => self.resize_grid(width, height)?,
            EditorCommand::SetZoomPercent(text) => {
                let zoom = parse_zoom_percent(&text).inspect_err(|e| {
                    log_warn!("{}", e);
                })?;
                if matches!(self.grid_mode(), GridMode::Unbounded) {
                    let center = self
                        .viewport
                        .map(|v| ScreenPos::new(v.x as f64 / 2.0, v.y as f64 / 2.0))
                        .unwrap_or_default();
                    self.view.zoom_around(zoom, center);
                }
            }
        }
        Ok(())
    }

    fn resize_grid(&mut self, width: u32, height: u32) -> Result<(), EditorError> {
        let Some(current) = self.store.dimensions() else {
            log_warn!("Grid resize to {}x{} ignored on the infinite canvas", width, height);
            return Err(EditorError::NotBounded);
        };
        let max = self.max_grid_size;
        if width == 0 || height == 0 || width > max || height > max {
            log_warn!("Rejected grid size {}x{} (max {})", width, height, max);
            return Err(EditorError::InvalidGridSize { width, height, max });
        }
        if current == (width, height) {
            return Ok(());
        }
        if let Some(resized) = resized_store(&self.store, width, height) {
            self.store = resized;
            self.record(&format!("Resize grid to {}x{}", width, height));
        }
        Ok(())
    }

    // --- export -----------------------------------------------------------

    /// Rasterize the export region: the whole bounded grid, the visible
    /// frame, or the painted cells' bounding box.
    pub fn export_image(&self, options: &ExportOptions) -> Result<RgbaImage, ExportError> {
        let frame = self.flags.show_frame.then_some(self.frame);
        let region = io::export_region(&self.store, frame)?;
        io::rasterize(&self.store, region, options.scale)
    }

    /// Rasterize and write synchronously.
    pub fn export_to(&self, path: &Path, options: &ExportOptions) -> Result<RgbaImage, ExportError> {
        let image = self.export_image(options)?;
        io::write_png(&image, path)?;
        log_info!("Exported {}x{} to {}", image.width(), image.height(), path.display());
        Ok(image)
    }
}

fn resized_store(store: &PixelStore, width: u32, height: u32) -> Option<PixelStore> {
    match store {
        PixelStore::Dense(grid) => Some(PixelStore::Dense(grid.resized(width, height))),
        PixelStore::Sparse(_) => None,
    }
}
