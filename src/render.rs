//! Scene composition.
//!
//! [`render`] reads the editor state and emits drawing calls into a
//! [`Surface`], in a fixed order: background, grid lines, template, painted
//! cells, frame overlay. It never mutates anything it is given.

use eframe::egui;
use egui::{Color32, Pos2, Rect, Vec2, pos2, vec2};

use crate::canvas::{Cell, PixelStore};
use crate::frame::{CORNER_HANDLE_SIZE, EDGE_HANDLE_LENGTH, EDGE_HANDLE_THICKNESS, ExportFrame};
use crate::template::Template;
use crate::viewport::{CoordinateMapper, ScreenPos, ViewTransform};

pub const BACKGROUND_COLOR: Color32 = Color32::WHITE;
pub const GRID_LINE_COLOR: Color32 = Color32::from_rgb(0xe0, 0xe0, 0xe0);
/// rgba(200, 200, 200, 0.4), premultiplied.
pub const TEMPLATE_FILL: Color32 = Color32::from_rgba_premultiplied(80, 80, 80, 102);
/// rgba(0, 0, 0, 0.5) laid over everything outside the export frame.
pub const FRAME_DIM: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 128);
pub const FRAME_ACCENT: Color32 = Color32::from_rgb(0x00, 0x7b, 0xff);
pub const FRAME_BORDER_WIDTH: f32 = 2.0;

// ============================================================================
// SURFACE
// ============================================================================

/// Anything the scene can be drawn onto. Coordinates are surface-local.
pub trait Surface {
    fn fill_rect(&mut self, rect: Rect, color: Color32);
    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color32);
    fn line(&mut self, from: Pos2, to: Pos2, width: f32, color: Color32);
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCmd {
    FillRect { rect: Rect, color: Color32 },
    StrokeRect { rect: Rect, width: f32, color: Color32 },
    Line { from: Pos2, to: Pos2, width: f32, color: Color32 },
}

/// Records drawing calls instead of executing them.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCmd>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filled rectangles of one color, in draw order.
    pub fn fills(&self, color: Color32) -> Vec<Rect> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCmd::FillRect { rect, color: c } if *c == color => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn lines(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, DrawCmd::Line { .. })).count()
    }
}

impl Surface for DrawList {
    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.commands.push(DrawCmd::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color32) {
        self.commands.push(DrawCmd::StrokeRect { rect, width, color });
    }

    fn line(&mut self, from: Pos2, to: Pos2, width: f32, color: Color32) {
        self.commands.push(DrawCmd::Line { from, to, width, color });
    }
}

/// Draws onto an egui painter, translating surface-local coordinates by
/// `origin` (the top-left of the allocated widget rect).
pub struct PainterSurface<'a> {
    pub painter: &'a egui::Painter,
    pub origin: Vec2,
}

impl Surface for PainterSurface<'_> {
    fn fill_rect(&mut self, rect: Rect, color: Color32) {
        self.painter.rect_filled(rect.translate(self.origin), 0.0, color);
    }

    fn stroke_rect(&mut self, rect: Rect, width: f32, color: Color32) {
        self.painter
            .rect_stroke(rect.translate(self.origin), 0.0, egui::Stroke::new(width, color));
    }

    fn line(&mut self, from: Pos2, to: Pos2, width: f32, color: Color32) {
        self.painter.line_segment(
            [from + self.origin, to + self.origin],
            egui::Stroke::new(width, color),
        );
    }
}

// ============================================================================
// SCENE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RenderFlags {
    pub show_grid: bool,
    pub show_template: bool,
    pub show_frame: bool,
}

/// Read-only view of everything the renderer needs.
pub struct Scene<'a> {
    pub store: &'a PixelStore,
    pub mapper: CoordinateMapper,
    /// Surface size in screen pixels.
    pub viewport: Vec2,
    pub template: &'a Template,
    pub template_offset: Cell,
    pub frame: ExportFrame,
    pub flags: RenderFlags,
}

impl Scene<'_> {
    fn view(&self) -> ViewTransform {
        self.mapper.view()
    }

    /// Screen rect of the bounded grid.
    fn grid_rect(&self) -> Option<Rect> {
        match self.mapper {
            CoordinateMapper::Bounded { cell_size, width, height } => Some(Rect::from_min_size(
                Pos2::ZERO,
                vec2((width as f64 * cell_size) as f32, (height as f64 * cell_size) as f32),
            )),
            CoordinateMapper::Unbounded(_) => None,
        }
    }

    fn cell_rect(&self, cell: Cell) -> Rect {
        let view = self.view();
        let p = view.grid_to_screen(cell);
        let s = view.scale() as f32;
        Rect::from_min_size(p.to_pos2(), vec2(s, s))
    }

    /// The area cells may be drawn into.
    fn clip(&self) -> Rect {
        let viewport = Rect::from_min_size(Pos2::ZERO, self.viewport);
        match self.grid_rect() {
            Some(grid) => grid.intersect(viewport),
            None => viewport,
        }
    }

    fn is_visible(&self, rect: Rect) -> bool {
        let clip = self.clip();
        rect.max.x > clip.min.x && rect.min.x < clip.max.x && rect.max.y > clip.min.y && rect.min.y < clip.max.y
    }
}

/// Compose the scene onto `surface`.
pub fn render(scene: &Scene<'_>, surface: &mut impl Surface) {
    draw_background(scene, surface);
    if scene.flags.show_grid {
        draw_grid(scene, surface);
    }
    if scene.flags.show_template {
        draw_template(scene, surface);
    }
    draw_pixels(scene, surface);
    match scene.grid_rect() {
        Some(grid) => draw_grid_border(scene, grid, surface),
        None if scene.flags.show_frame => draw_frame(scene, surface),
        None => {}
    }
}

fn draw_background(scene: &Scene<'_>, surface: &mut impl Surface) {
    surface.fill_rect(scene.clip(), BACKGROUND_COLOR);
}

fn draw_grid(scene: &Scene<'_>, surface: &mut impl Surface) {
    let view = scene.view();
    let clip = scene.clip();
    let (min, max) = match scene.mapper {
        CoordinateMapper::Bounded { width, height, .. } => {
            (Cell::new(0, 0), Cell::new(width as i32, height as i32))
        }
        CoordinateMapper::Unbounded(v) => v.visible_cells(scene.viewport),
    };

    for x in min.x..=max.x {
        let sx = view.grid_to_screen(Cell::new(x, 0)).x as f32;
        if sx >= clip.min.x - 1.0 && sx <= clip.max.x + 1.0 {
            surface.line(pos2(sx, clip.min.y), pos2(sx, clip.max.y), 1.0, GRID_LINE_COLOR);
        }
    }
    for y in min.y..=max.y {
        let sy = view.grid_to_screen(Cell::new(0, y)).y as f32;
        if sy >= clip.min.y - 1.0 && sy <= clip.max.y + 1.0 {
            surface.line(pos2(clip.min.x, sy), pos2(clip.max.x, sy), 1.0, GRID_LINE_COLOR);
        }
    }
}

fn draw_template(scene: &Scene<'_>, surface: &mut impl Surface) {
    let bounds = scene.store.dimensions();
    for cell in scene.template.placed(scene.template_offset) {
        if let Some((w, h)) = bounds {
            if cell.x < 0 || cell.y < 0 || cell.x as u32 >= w || cell.y as u32 >= h {
                continue;
            }
        }
        let rect = scene.cell_rect(cell);
        if scene.is_visible(rect) {
            surface.fill_rect(rect, TEMPLATE_FILL);
        }
    }
}

fn draw_pixels(scene: &Scene<'_>, surface: &mut impl Surface) {
    for (cell, color) in scene.store.iter() {
        let rect = scene.cell_rect(cell);
        if scene.is_visible(rect) {
            let [r, g, b, a] = color.0;
            surface.fill_rect(rect, Color32::from_rgba_unmultiplied(r, g, b, a));
        }
    }
}

/// Bounded mode: the whole grid is the frame, so only its outline and the
/// resize grips on the right/bottom edges are drawn.
fn draw_grid_border(scene: &Scene<'_>, grid: Rect, surface: &mut impl Surface) {
    if scene.flags.show_frame {
        surface.stroke_rect(grid, FRAME_BORDER_WIDTH, FRAME_ACCENT);
    }
    let corner = CORNER_HANDLE_SIZE as f32;
    let (bar_len, bar_thick) = (EDGE_HANDLE_LENGTH as f32, EDGE_HANDLE_THICKNESS as f32);
    draw_handle(surface, Rect::from_center_size(grid.max, vec2(corner, corner)));
    draw_handle(
        surface,
        Rect::from_center_size(pos2(grid.max.x, grid.center().y), vec2(bar_thick, bar_len)),
    );
    draw_handle(
        surface,
        Rect::from_center_size(pos2(grid.center().x, grid.max.y), vec2(bar_len, bar_thick)),
    );
}

fn draw_frame(scene: &Scene<'_>, surface: &mut impl Surface) {
    let view = scene.view();
    let (origin, w, h) = scene.frame.screen_rect(&view);
    let frame_rect = Rect::from_min_size(origin.to_pos2(), vec2(w as f32, h as f32));
    let (vw, vh) = (scene.viewport.x, scene.viewport.y);

    // Dim everything except the frame's own area, as four bands around it.
    let top = frame_rect.min.y.clamp(0.0, vh);
    let bottom = frame_rect.max.y.clamp(0.0, vh);
    let left = frame_rect.min.x.clamp(0.0, vw);
    let right = frame_rect.max.x.clamp(0.0, vw);
    let bands = [
        Rect::from_min_max(pos2(0.0, 0.0), pos2(vw, top)),
        Rect::from_min_max(pos2(0.0, bottom), pos2(vw, vh)),
        Rect::from_min_max(pos2(0.0, top), pos2(left, bottom)),
        Rect::from_min_max(pos2(right, top), pos2(vw, bottom)),
    ];
    for band in bands {
        if band.width() > 0.0 && band.height() > 0.0 {
            surface.fill_rect(band, FRAME_DIM);
        }
    }

    surface.stroke_rect(frame_rect, FRAME_BORDER_WIDTH, FRAME_ACCENT);

    let corner = vec2(CORNER_HANDLE_SIZE as f32, CORNER_HANDLE_SIZE as f32);
    for p in [
        frame_rect.left_top(),
        frame_rect.right_top(),
        frame_rect.left_bottom(),
        frame_rect.right_bottom(),
    ] {
        draw_handle(surface, Rect::from_center_size(p, corner));
    }

    let (bar_len, bar_thick) = (EDGE_HANDLE_LENGTH as f32, EDGE_HANDLE_THICKNESS as f32);
    let center = frame_rect.center();
    for (p, size) in [
        (pos2(center.x, frame_rect.min.y), vec2(bar_len, bar_thick)),
        (pos2(center.x, frame_rect.max.y), vec2(bar_len, bar_thick)),
        (pos2(frame_rect.min.x, center.y), vec2(bar_thick, bar_len)),
        (pos2(frame_rect.max.x, center.y), vec2(bar_thick, bar_len)),
    ] {
        draw_handle(surface, Rect::from_center_size(p, size));
    }
}

fn draw_handle(surface: &mut impl Surface, rect: Rect) {
    surface.fill_rect(rect, FRAME_ACCENT);
    surface.stroke_rect(rect, 2.0, Color32::WHITE);
}

/// Screen position → surface position helper for callers holding egui input.
pub fn to_surface(pointer: Pos2, origin: Pos2) -> ScreenPos {
    ScreenPos::from(pointer - origin)
}
