//! Screen ⇄ grid mapping.
//!
//! Screen positions are kept in `f64` so that mapping a cell to the screen and
//! back is exact for any cell a user can reach. Rendering converts to egui's
//! `f32` types only at the drawing boundary.

use eframe::egui;
use egui::{Pos2, Vec2};

use crate::canvas::Cell;

pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 5.0;
/// Zoom change per wheel notch.
pub const ZOOM_STEP: f64 = 0.1;
pub const DEFAULT_CELL_SIZE: f64 = 20.0;

/// Quotients this close to an integer are treated as lying on the cell
/// boundary, absorbing float error from the forward mapping.
const CELL_SNAP_EPSILON: f64 = 1e-7;

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ScreenPos {
    pub x: f64,
    pub y: f64,
}

impl ScreenPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_pos2(self) -> Pos2 {
        Pos2::new(self.x as f32, self.y as f32)
    }
}

impl From<Pos2> for ScreenPos {
    fn from(p: Pos2) -> Self {
        Self::new(p.x as f64, p.y as f64)
    }
}

impl From<Vec2> for ScreenPos {
    fn from(v: Vec2) -> Self {
        Self::new(v.x as f64, v.y as f64)
    }
}

/// `floor((screen - offset) / scale)`, except that a quotient within
/// `CELL_SNAP_EPSILON` of an integer is taken as that integer. The window is
/// far below one screen pixel at any zoom, so it only absorbs the rounding
/// left by `grid_to_screen` when a cell corner is mapped back.
#[inline]
fn axis_to_cell(screen: f64, offset: f64, scale: f64) -> i32 {
    let q = (screen - offset) / scale;
    let nearest = q.round();
    let cell = if (q - nearest).abs() < CELL_SNAP_EPSILON {
        nearest
    } else {
        q.floor()
    };
    cell as i32
}

// ============================================================================
// VIEW TRANSFORM
// ============================================================================

/// Pan offset (screen pixels) + zoom over a fixed base cell size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub offset_x: f64,
    pub offset_y: f64,
    pub zoom: f64,
    pub cell_size: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl ViewTransform {
    pub fn new(cell_size: f64) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            zoom: 1.0,
            cell_size,
        }
    }

    /// Screen pixels per cell edge.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.cell_size * self.zoom
    }

    pub fn screen_to_grid(&self, pos: ScreenPos) -> Cell {
        let scale = self.scale();
        Cell::new(
            axis_to_cell(pos.x, self.offset_x, scale),
            axis_to_cell(pos.y, self.offset_y, scale),
        )
    }

    /// Top-left screen corner of a cell.
    pub fn grid_to_screen(&self, cell: Cell) -> ScreenPos {
        let scale = self.scale();
        ScreenPos::new(
            cell.x as f64 * scale + self.offset_x,
            cell.y as f64 * scale + self.offset_y,
        )
    }

    /// Put the grid origin in the middle of a viewport.
    pub fn center_in(&mut self, viewport: Vec2) {
        self.offset_x = (viewport.x as f64 / 2.0).floor();
        self.offset_y = (viewport.y as f64 / 2.0).floor();
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Set the zoom (clamped) while keeping the grid point under `anchor` fixed
    /// on screen.
    pub fn zoom_around(&mut self, zoom: f64, anchor: ScreenPos) {
        let old_scale = self.scale();
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        let factor = self.scale() / old_scale;
        self.offset_x = anchor.x - (anchor.x - self.offset_x) * factor;
        self.offset_y = anchor.y - (anchor.y - self.offset_y) * factor;
    }

    /// Inclusive cell range `(min, max)` intersecting a viewport of the given
    /// size, padded by one cell on every side.
    pub fn visible_cells(&self, viewport: Vec2) -> (Cell, Cell) {
        let top_left = self.screen_to_grid(ScreenPos::new(0.0, 0.0));
        let bottom_right = self.screen_to_grid(ScreenPos::new(viewport.x as f64, viewport.y as f64));
        (top_left.offset(-1, -1), bottom_right.offset(1, 1))
    }
}

// ============================================================================
// COORDINATE MAPPER
// ============================================================================

/// Resolves pointer positions to cells for either grid regime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CoordinateMapper {
    /// Fixed grid drawn at the surface origin with zoom 1.
    Bounded { cell_size: f64, width: u32, height: u32 },
    Unbounded(ViewTransform),
}

impl CoordinateMapper {
    pub fn view(&self) -> ViewTransform {
        match *self {
            CoordinateMapper::Bounded { cell_size, .. } => ViewTransform::new(cell_size),
            CoordinateMapper::Unbounded(view) => view,
        }
    }

    /// The cell under a screen position; `None` outside a bounded grid.
    pub fn screen_to_grid(&self, pos: ScreenPos) -> Option<Cell> {
        let cell = self.view().screen_to_grid(pos);
        match *self {
            CoordinateMapper::Bounded { width, height, .. } => {
                let inside = cell.x >= 0
                    && cell.y >= 0
                    && (cell.x as u32) < width
                    && (cell.y as u32) < height;
                inside.then_some(cell)
            }
            CoordinateMapper::Unbounded(_) => Some(cell),
        }
    }

    pub fn grid_to_screen(&self, cell: Cell) -> ScreenPos {
        self.view().grid_to_screen(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn negative_cells_use_floor() {
        let view = ViewTransform::new(20.0);
        assert_eq!(view.screen_to_grid(ScreenPos::new(-0.5, -19.9)), Cell::new(-1, -1));
        assert_eq!(view.screen_to_grid(ScreenPos::new(-20.0, 0.0)), Cell::new(-1, 0));
        assert_eq!(view.screen_to_grid(ScreenPos::new(-20.1, 19.99)), Cell::new(-2, 0));
    }

    #[test]
    fn boundary_snap_is_narrower_than_a_pixel() {
        let view = ViewTransform::new(20.0);
        // float noise on a cell corner snaps onto it
        assert_eq!(view.screen_to_grid(ScreenPos::new(-1e-9, 20.0 - 1e-9)), Cell::new(0, 1));
        // anything a pointer can actually land on is plain floor
        assert_eq!(view.screen_to_grid(ScreenPos::new(-0.001, 19.999)), Cell::new(-1, 0));

        let mut zoomed = ViewTransform::new(20.0);
        zoomed.zoom = 0.7;
        zoomed.offset_x = 0.3;
        let corner = zoomed.grid_to_screen(Cell::new(-7, 11));
        assert_eq!(zoomed.screen_to_grid(corner), Cell::new(-7, 11));
    }

    #[test]
    fn offset_and_zoom_shift_the_mapping() {
        let mut view = ViewTransform::new(20.0);
        view.offset_x = 100.0;
        view.offset_y = 50.0;
        view.zoom = 2.0;
        assert_eq!(view.screen_to_grid(ScreenPos::new(100.0, 50.0)), Cell::new(0, 0));
        assert_eq!(view.screen_to_grid(ScreenPos::new(139.0, 89.0)), Cell::new(0, 0));
        assert_eq!(view.screen_to_grid(ScreenPos::new(140.0, 49.0)), Cell::new(1, -1));
        assert_eq!(view.grid_to_screen(Cell::new(-2, 3)), ScreenPos::new(20.0, 170.0));
    }

    #[test]
    fn bounded_mapper_rejects_outside_cells() {
        let mapper = CoordinateMapper::Bounded { cell_size: 10.0, width: 4, height: 2 };
        assert_eq!(mapper.screen_to_grid(ScreenPos::new(35.0, 15.0)), Some(Cell::new(3, 1)));
        assert_eq!(mapper.screen_to_grid(ScreenPos::new(40.0, 5.0)), None);
        assert_eq!(mapper.screen_to_grid(ScreenPos::new(5.0, 20.0)), None);
        assert_eq!(mapper.screen_to_grid(ScreenPos::new(-0.1, 5.0)), None);
    }

    #[test]
    fn zoom_around_keeps_anchor_fixed() {
        let mut view = ViewTransform::new(20.0);
        view.center_in(Vec2::new(801.0, 600.0));
        assert_eq!((view.offset_x, view.offset_y), (400.0, 300.0));

        let anchor = ScreenPos::new(523.0, 187.0);
        let before = view.screen_to_grid(anchor);
        view.zoom_around(3.0, anchor);
        assert_eq!(view.zoom, 3.0);
        assert_eq!(view.screen_to_grid(anchor), before);

        view.zoom_around(50.0, anchor);
        assert_eq!(view.zoom, ZOOM_MAX);
    }

    #[test]
    fn visible_range_covers_viewport() {
        let mut view = ViewTransform::new(20.0);
        view.offset_x = 50.0;
        view.offset_y = 50.0;
        let (min, max) = view.visible_cells(Vec2::new(200.0, 100.0));
        assert_eq!(min, Cell::new(-4, -4));
        assert_eq!(max, Cell::new(8, 3));
    }

    proptest! {
        #[test]
        fn grid_to_screen_inverts_exactly(
            gx in -100_000i32..100_000,
            gy in -100_000i32..100_000,
            zoom in ZOOM_MIN..ZOOM_MAX,
            ox in -5_000.0f64..5_000.0,
            oy in -5_000.0f64..5_000.0,
        ) {
            let view = ViewTransform { offset_x: ox, offset_y: oy, zoom, cell_size: DEFAULT_CELL_SIZE };
            let cell = Cell::new(gx, gy);
            prop_assert_eq!(view.screen_to_grid(view.grid_to_screen(cell)), cell);
        }
    }
}
