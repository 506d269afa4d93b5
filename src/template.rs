// ============================================================================
// TEMPLATE: fixed reference silhouette drawn as a faint guide
// ============================================================================

use crate::canvas::Cell;

/// A named group of template cells (e.g. "head").
#[derive(Clone, Debug, PartialEq)]
pub struct TemplatePart {
    pub name: &'static str,
    /// Cells relative to the template's own origin.
    pub cells: Vec<Cell>,
}

/// Immutable silhouette. Loaded once, never edited; only rendered or stamped.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    name: &'static str,
    parts: Vec<TemplatePart>,
}

/// `[row, col]` pairs for each part of the built-in figure.
const FIGURE_HEAD: &[[i32; 2]] = &[
    [6, 0], [5, 0], [4, 0], [3, 1], [2, 1], [1, 2], [0, 3], [0, 4], [0, 5], [0, 6],
    [0, 7], [0, 8], [0, 9], [1, 10], [2, 11], [3, 11], [4, 12], [5, 12], [6, 12],
    [6, 2], [6, 10], [5, 3], [5, 4], [5, 5], [5, 6], [5, 7], [5, 8], [5, 9],
];
const FIGURE_FACE: &[[i32; 2]] = &[
    [9, 1], [8, 1], [7, 1], [10, 2], [11, 3], [11, 4], [11, 5], [11, 6], [11, 7],
    [11, 8], [11, 9], [10, 10], [9, 11], [8, 11], [7, 11], [9, 4], [8, 4], [7, 4],
    [9, 8], [8, 8], [7, 8],
];
const FIGURE_ARMS: &[[i32; 2]] = &[
    [12, 4], [12, 8], [13, 3], [13, 9], [14, 2], [14, 10], [15, 1], [15, 11],
    [15, 3], [15, 4], [15, 8], [15, 9], [16, 2], [16, 10],
];
const FIGURE_LEGS: &[[i32; 2]] = &[
    [16, 4], [17, 4], [18, 4], [16, 8], [17, 8], [18, 8], [17, 6], [18, 6],
    [19, 5], [19, 7],
];

fn part(name: &'static str, rows_cols: &[[i32; 2]]) -> TemplatePart {
    TemplatePart {
        name,
        cells: rows_cols.iter().map(|&[row, col]| Cell::new(col, row)).collect(),
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::figure()
    }
}

impl Template {
    pub fn new(name: &'static str, parts: Vec<TemplatePart>) -> Self {
        Self { name, parts }
    }

    /// The built-in character silhouette.
    pub fn figure() -> Self {
        Self::new(
            "Figure",
            vec![
                part("head", FIGURE_HEAD),
                part("face", FIGURE_FACE),
                part("arms", FIGURE_ARMS),
                part("legs", FIGURE_LEGS),
            ],
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.parts.iter().flat_map(|p| p.cells.iter().copied())
    }

    /// `(width, height)` of the bounding box in cells.
    pub fn size(&self) -> (u32, u32) {
        let mut max = Cell::new(-1, -1);
        for c in self.cells() {
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        ((max.x + 1) as u32, (max.y + 1) as u32)
    }

    /// Offset that centers the template on the origin of an infinite canvas.
    pub fn centered_on_origin(&self) -> Cell {
        let (w, h) = self.size();
        Cell::new(-(w as i32) / 2, -(h as i32) / 2)
    }

    /// Offset that centers the template inside a `width × height` grid.
    pub fn centered_in(&self, width: u32, height: u32) -> Cell {
        let (w, h) = self.size();
        Cell::new(
            (width as i32 - w as i32) / 2,
            (height as i32 - h as i32) / 2,
        )
    }

    /// Template cells translated by `offset` into grid coordinates.
    pub fn placed(&self, offset: Cell) -> impl Iterator<Item = Cell> + '_ {
        self.cells().map(move |c| c.offset(offset.x, offset.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn figure_has_four_named_parts() {
        let t = Template::figure();
        let names: Vec<_> = t.parts().iter().map(|p| p.name).collect();
        assert_eq!(names, ["head", "face", "arms", "legs"]);
        assert_eq!(t.cells().count(), 28 + 21 + 14 + 10);
    }

    #[test]
    fn rows_map_to_y_and_columns_to_x() {
        let t = Template::figure();
        // legs end at row 19, column 7
        assert!(t.cells().any(|c| c == Cell::new(7, 19)));
        assert_eq!(t.size(), (13, 20));
    }

    #[test]
    fn placement_offsets() {
        let t = Template::figure();
        assert_eq!(t.centered_on_origin(), Cell::new(-6, -10));
        assert_eq!(t.centered_in(13, 20), Cell::new(0, 0));
        assert_eq!(t.centered_in(17, 24), Cell::new(2, 2));

        let placed: HashSet<Cell> = t.placed(Cell::new(2, 2)).collect();
        assert!(placed.contains(&Cell::new(7 + 2, 19 + 2)));
        assert!(placed.iter().all(|c| c.x >= 2 && c.y >= 2));
    }
}
