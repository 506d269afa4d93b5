use eframe::egui;
use egui::CursorIcon;

use crate::canvas::Cell;
use crate::viewport::{ScreenPos, ViewTransform};

/// Corner handles are grabbable within this many screen pixels on both axes.
pub const CORNER_HANDLE_SIZE: f64 = 12.0;
/// Length of the bar drawn at each edge midpoint.
pub const EDGE_HANDLE_LENGTH: f64 = 40.0;
/// Thickness of the edge bar.
pub const EDGE_HANDLE_THICKNESS: f64 = 8.0;
/// Edge handles are grabbable within this distance of the edge line.
pub const EDGE_TOLERANCE: f64 = 8.0;

// ============================================================================
// EXPORT FRAME
// ============================================================================

/// Rectangle in grid coordinates rasterized on export. Width and height are
/// always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportFrame {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ExportFrame {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Smallest frame containing both corners (inclusive).
    pub fn from_corners(min: Cell, max: Cell) -> Self {
        Self::new(
            min.x,
            min.y,
            (max.x as i64 - min.x as i64 + 1) as u32,
            (max.y as i64 - min.y as i64 + 1) as u32,
        )
    }

    pub fn contains(&self, cell: Cell) -> bool {
        let (x, y) = (cell.x as i64, cell.y as i64);
        x >= self.x as i64
            && y >= self.y as i64
            && x < self.x as i64 + self.width as i64
            && y < self.y as i64 + self.height as i64
    }

    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Frame after dragging `handle` by a grid delta, measured from `self`
    /// (the frame as it was when the drag started).
    pub fn resized_by(&self, handle: FrameHandle, dx: i32, dy: i32) -> Self {
        let (x, width) = resize_axis(self.x, self.width, handle.horizontal(), dx);
        let (y, height) = resize_axis(self.y, self.height, handle.vertical(), dy);
        Self { x, y, width, height }
    }

    /// Screen rectangle `(top_left, width_px, height_px)` under a view.
    pub fn screen_rect(&self, view: &ViewTransform) -> (ScreenPos, f64, f64) {
        let origin = view.grid_to_screen(Cell::new(self.x, self.y));
        let scale = view.scale();
        (origin, self.width as f64 * scale, self.height as f64 * scale)
    }

    /// Classify a screen position against the frame's handles and body.
    pub fn hit_test(&self, view: &ViewTransform, pos: ScreenPos) -> FrameHit {
        let (origin, w, h) = self.screen_rect(view);
        let near = |tx: f64, ty: f64| {
            (pos.x - tx).abs() <= CORNER_HANDLE_SIZE && (pos.y - ty).abs() <= CORNER_HANDLE_SIZE
        };

        if near(origin.x, origin.y) {
            return FrameHit::Handle(FrameHandle::TopLeft);
        }
        if near(origin.x + w, origin.y) {
            return FrameHit::Handle(FrameHandle::TopRight);
        }
        if near(origin.x, origin.y + h) {
            return FrameHit::Handle(FrameHandle::BottomLeft);
        }
        if near(origin.x + w, origin.y + h) {
            return FrameHit::Handle(FrameHandle::BottomRight);
        }

        let half = EDGE_HANDLE_LENGTH / 2.0;
        let mid_x = origin.x + w / 2.0;
        let mid_y = origin.y + h / 2.0;
        let on_horizontal_bar = (pos.x - mid_x).abs() <= half;
        let on_vertical_bar = (pos.y - mid_y).abs() <= half;

        if on_horizontal_bar && (pos.y - origin.y).abs() < EDGE_TOLERANCE {
            return FrameHit::Handle(FrameHandle::Top);
        }
        if on_horizontal_bar && (pos.y - (origin.y + h)).abs() < EDGE_TOLERANCE {
            return FrameHit::Handle(FrameHandle::Bottom);
        }
        if on_vertical_bar && (pos.x - origin.x).abs() < EDGE_TOLERANCE {
            return FrameHit::Handle(FrameHandle::Left);
        }
        if on_vertical_bar && (pos.x - (origin.x + w)).abs() < EDGE_TOLERANCE {
            return FrameHit::Handle(FrameHandle::Right);
        }

        let inside = pos.x >= origin.x
            && pos.x <= origin.x + w
            && pos.y >= origin.y
            && pos.y <= origin.y + h;
        if inside { FrameHit::Interior } else { FrameHit::Outside }
    }
}

/// Which side of an axis a handle moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisEdge {
    /// Left / top: the origin moves, the far edge stays anchored.
    Min,
    /// Right / bottom: the origin stays, the size changes.
    Max,
}

fn resize_axis(start: i32, size: u32, edge: Option<AxisEdge>, delta: i32) -> (i32, u32) {
    let (start64, size64, delta64) = (start as i64, size as i64, delta as i64);
    match edge {
        None => (start, size),
        Some(AxisEdge::Max) => (start, (size64 + delta64).clamp(1, u32::MAX as i64) as u32),
        Some(AxisEdge::Min) => {
            let origin = (start64 + delta64).min(start64 + size64 - 1);
            let new_size = size64 - (origin - start64);
            (
                origin.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
                new_size.clamp(1, u32::MAX as i64) as u32,
            )
        }
    }
}

// ============================================================================
// HANDLES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

impl FrameHandle {
    pub fn all() -> &'static [FrameHandle] {
        &[
            FrameHandle::TopLeft,
            FrameHandle::TopRight,
            FrameHandle::BottomLeft,
            FrameHandle::BottomRight,
            FrameHandle::Top,
            FrameHandle::Bottom,
            FrameHandle::Left,
            FrameHandle::Right,
        ]
    }

    pub fn horizontal(self) -> Option<AxisEdge> {
        match self {
            FrameHandle::TopLeft | FrameHandle::BottomLeft | FrameHandle::Left => Some(AxisEdge::Min),
            FrameHandle::TopRight | FrameHandle::BottomRight | FrameHandle::Right => Some(AxisEdge::Max),
            FrameHandle::Top | FrameHandle::Bottom => None,
        }
    }

    pub fn vertical(self) -> Option<AxisEdge> {
        match self {
            FrameHandle::TopLeft | FrameHandle::TopRight | FrameHandle::Top => Some(AxisEdge::Min),
            FrameHandle::BottomLeft | FrameHandle::BottomRight | FrameHandle::Bottom => Some(AxisEdge::Max),
            FrameHandle::Left | FrameHandle::Right => None,
        }
    }

    pub fn is_corner(self) -> bool {
        self.horizontal().is_some() && self.vertical().is_some()
    }

    pub fn cursor(self) -> CursorIcon {
        match self {
            FrameHandle::TopLeft | FrameHandle::BottomRight => CursorIcon::ResizeNwSe,
            FrameHandle::TopRight | FrameHandle::BottomLeft => CursorIcon::ResizeNeSw,
            FrameHandle::Top | FrameHandle::Bottom => CursorIcon::ResizeVertical,
            FrameHandle::Left | FrameHandle::Right => CursorIcon::ResizeHorizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameHit {
    Handle(FrameHandle),
    Interior,
    Outside,
}

// ============================================================================
// DRAG STATE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDragKind {
    Move,
    Resize(FrameHandle),
}

/// Captured once at pointer-down; every pointer-move is evaluated against
/// this anchor so rounding never accumulates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameDrag {
    pub kind: FrameDragKind,
    pub anchor: Cell,
    pub start: ExportFrame,
}

impl FrameDrag {
    pub fn new(kind: FrameDragKind, anchor: Cell, start: ExportFrame) -> Self {
        Self { kind, anchor, start }
    }

    /// Frame for the pointer currently over `cell`.
    pub fn frame_at(&self, cell: Cell) -> ExportFrame {
        let dx = cell.x.saturating_sub(self.anchor.x);
        let dy = cell.y.saturating_sub(self.anchor.y);
        match self.kind {
            FrameDragKind::Move => self.start.moved_by(dx, dy),
            FrameDragKind::Resize(handle) => self.start.resized_by(handle, dx, dy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn view() -> ViewTransform {
        ViewTransform::new(20.0)
    }

    #[test]
    fn max_side_handles_grow_and_clamp() {
        let f = ExportFrame::new(2, 3, 4, 5);
        assert_eq!(f.resized_by(FrameHandle::Right, 3, 99), ExportFrame::new(2, 3, 7, 5));
        assert_eq!(f.resized_by(FrameHandle::Bottom, 99, -2), ExportFrame::new(2, 3, 4, 3));
        assert_eq!(f.resized_by(FrameHandle::BottomRight, -10, -10), ExportFrame::new(2, 3, 1, 1));
    }

    #[test]
    fn min_side_handles_anchor_the_far_edge() {
        let f = ExportFrame::new(2, 3, 4, 5);
        // far edges sit at x = 6, y = 8 (exclusive)
        assert_eq!(f.resized_by(FrameHandle::Left, -2, 0), ExportFrame::new(0, 3, 6, 5));
        assert_eq!(f.resized_by(FrameHandle::Left, 2, 0), ExportFrame::new(4, 3, 2, 5));
        assert_eq!(f.resized_by(FrameHandle::Left, 50, 0), ExportFrame::new(5, 3, 1, 5));
        assert_eq!(f.resized_by(FrameHandle::Top, 0, 100), ExportFrame::new(2, 7, 4, 1));
        assert_eq!(f.resized_by(FrameHandle::TopLeft, 1, -1), ExportFrame::new(3, 2, 3, 6));
    }

    #[test]
    fn corners_combine_edge_rules() {
        let f = ExportFrame::new(0, 0, 10, 10);
        assert_eq!(f.resized_by(FrameHandle::TopRight, 5, 5), ExportFrame::new(0, 5, 15, 5));
        assert_eq!(f.resized_by(FrameHandle::BottomLeft, 5, 5), ExportFrame::new(5, 0, 5, 15));
    }

    #[test]
    fn hit_test_prefers_corners_then_edges_then_body() {
        // frame spans screen (0,0)..(100,200) at 20 px per cell
        let f = ExportFrame::new(0, 0, 5, 10);
        let v = view();
        let hit = |x, y| f.hit_test(&v, ScreenPos::new(x, y));

        assert_eq!(hit(-5.0, 6.0), FrameHit::Handle(FrameHandle::TopLeft));
        assert_eq!(hit(111.0, 0.0), FrameHit::Handle(FrameHandle::TopRight));
        assert_eq!(hit(0.0, 212.0), FrameHit::Handle(FrameHandle::BottomLeft));
        assert_eq!(hit(100.0, 200.0), FrameHit::Handle(FrameHandle::BottomRight));
        assert_eq!(hit(50.0, 3.0), FrameHit::Handle(FrameHandle::Top));
        assert_eq!(hit(60.0, 205.0), FrameHit::Handle(FrameHandle::Bottom));
        assert_eq!(hit(-7.0, 100.0), FrameHit::Handle(FrameHandle::Left));
        assert_eq!(hit(100.0, 115.0), FrameHit::Handle(FrameHandle::Right));
        assert_eq!(hit(40.0, 60.0), FrameHit::Interior);
        // on the top edge but outside the bar span
        assert_eq!(hit(80.0, 0.0), FrameHit::Interior);
        assert_eq!(hit(80.0, -5.0), FrameHit::Outside);
        assert_eq!(hit(300.0, 300.0), FrameHit::Outside);
    }

    #[test]
    fn handles_stay_grabbable_at_any_zoom() {
        let f = ExportFrame::new(0, 0, 1, 1);
        let mut v = view();
        v.zoom = 0.5;
        // 10 px wide frame: corners are still reachable just outside it
        assert_eq!(
            f.hit_test(&v, ScreenPos::new(14.0, 14.0)),
            FrameHit::Handle(FrameHandle::BottomRight)
        );
        assert_eq!(
            f.hit_test(&v, ScreenPos::new(5.0, 5.0)),
            FrameHit::Handle(FrameHandle::TopLeft)
        );
        v.zoom = 5.0;
        assert_eq!(
            f.hit_test(&v, ScreenPos::new(100.0, 50.0)),
            FrameHit::Handle(FrameHandle::Right)
        );
    }

    #[test]
    fn drag_is_relative_to_anchor() {
        let start = ExportFrame::new(0, 0, 3, 3);
        let drag = FrameDrag::new(FrameDragKind::Move, Cell::new(1, 1), start);
        assert_eq!(drag.frame_at(Cell::new(4, -1)), ExportFrame::new(3, -2, 3, 3));
        // returning to the anchor restores the start frame exactly
        assert_eq!(drag.frame_at(Cell::new(1, 1)), start);

        let resize = FrameDrag::new(FrameDragKind::Resize(FrameHandle::TopLeft), Cell::new(0, 0), start);
        assert_eq!(resize.frame_at(Cell::new(-9, 9)), ExportFrame::new(-9, 2, 12, 1));
    }

    #[test]
    fn cursors_match_handle_direction() {
        assert_eq!(FrameHandle::TopLeft.cursor(), CursorIcon::ResizeNwSe);
        assert_eq!(FrameHandle::BottomLeft.cursor(), CursorIcon::ResizeNeSw);
        assert_eq!(FrameHandle::Bottom.cursor(), CursorIcon::ResizeVertical);
        assert_eq!(FrameHandle::Left.cursor(), CursorIcon::ResizeHorizontal);
        assert_eq!(FrameHandle::all().iter().filter(|h| h.is_corner()).count(), 4);
    }

    fn any_handle() -> impl Strategy<Value = FrameHandle> {
        prop::sample::select(FrameHandle::all().to_vec())
    }

    proptest! {
        #[test]
        fn resize_never_degenerates(
            x in -1000i32..1000,
            y in -1000i32..1000,
            w in 1u32..200,
            h in 1u32..200,
            handle in any_handle(),
            dx in -100_000i32..100_000,
            dy in -100_000i32..100_000,
        ) {
            let start = ExportFrame::new(x, y, w, h);
            let out = start.resized_by(handle, dx, dy);
            prop_assert!(out.width >= 1 && out.height >= 1);
            // a min-side handle never moves the opposite edge
            if handle.horizontal() == Some(AxisEdge::Min) {
                prop_assert_eq!(out.x as i64 + out.width as i64, x as i64 + w as i64);
            }
            if handle.vertical() == Some(AxisEdge::Min) {
                prop_assert_eq!(out.y as i64 + out.height as i64, y as i64 + h as i64);
            }
        }
    }
}
