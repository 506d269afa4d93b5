use std::collections::HashMap;
use std::fmt;

use image::Rgba;

/// Stored color of a painted cell. Unpainted cells have no entry at all,
/// which is "fully transparent" rather than any particular color.
pub type CellColor = Rgba<u8>;

// ============================================================================
// CELL COORDINATES
// ============================================================================

/// One addressable unit of the logical drawing grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Pack both coordinates into one 64-bit map key (x in the high half).
    #[inline]
    pub fn key(self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.y as u32 as u64)
    }

    #[inline]
    pub fn from_key(key: u64) -> Self {
        Self {
            x: (key >> 32) as u32 as i32,
            y: key as u32 as i32,
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Every cell on the straight line from `from` to `to`, endpoints included.
/// Used to fill the gaps between pointer samples of a fast stroke.
pub fn line_cells(from: Cell, to: Cell) -> Vec<Cell> {
    let (mut x, mut y) = (from.x as i64, from.y as i64);
    let (x1, y1) = (to.x as i64, to.y as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    loop {
        cells.push(Cell::new(x as i32, y as i32));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

// ============================================================================
// COLORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color '{}': expected #rgb, #rrggbb or #rrggbbaa", self.0)
    }
}

impl std::error::Error for ColorParseError {}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
pub fn parse_hex_color(text: &str) -> Result<CellColor, ColorParseError> {
    let err = || ColorParseError(text.to_string());
    let hex = text.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(err());
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
    match hex.len() {
        3 => {
            let nib = |i: usize| {
                u8::from_str_radix(&hex[i..i + 1], 16)
                    .map(|v| v * 17)
                    .map_err(|_| err())
            };
            Ok(Rgba([nib(0)?, nib(1)?, nib(2)?, 255]))
        }
        6 => Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Ok(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => Err(err()),
    }
}

/// `#rrggbb` for opaque colors, `#rrggbbaa` otherwise.
pub fn to_hex(color: CellColor) -> String {
    let [r, g, b, a] = color.0;
    if a == 255 {
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    } else {
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }
}

// ============================================================================
// SPARSE STORE: unbounded canvas
// ============================================================================

/// Painted cells of the infinite canvas, keyed by [`Cell::key`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseStore {
    pixels: HashMap<u64, CellColor>,
}

impl SparseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paint(&mut self, cell: Cell, color: CellColor) -> bool {
        self.pixels.insert(cell.key(), color) != Some(color)
    }

    pub fn erase(&mut self, cell: Cell) -> bool {
        self.pixels.remove(&cell.key()).is_some()
    }

    pub fn get(&self, cell: Cell) -> Option<CellColor> {
        self.pixels.get(&cell.key()).copied()
    }

    pub fn clear(&mut self) {
        self.pixels.clear();
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, CellColor)> + '_ {
        self.pixels.iter().map(|(&k, &c)| (Cell::from_key(k), c))
    }
}

// ============================================================================
// DENSE GRID: bounded canvas
// ============================================================================

/// Fixed `width × height` array of optional colors, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseGrid {
    width: u32,
    height: u32,
    cells: Vec<Option<CellColor>>,
}

impl DenseGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    #[inline]
    fn index(&self, cell: Cell) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.y as usize * self.width as usize + cell.x as usize)
    }

    pub fn paint(&mut self, cell: Cell, color: CellColor) -> bool {
        match self.index(cell) {
            Some(i) => self.cells[i].replace(color) != Some(color),
            None => false,
        }
    }

    pub fn erase(&mut self, cell: Cell) -> bool {
        match self.index(cell) {
            Some(i) => self.cells[i].take().is_some(),
            None => false,
        }
    }

    pub fn get(&self, cell: Cell) -> Option<CellColor> {
        self.index(cell).and_then(|i| self.cells[i])
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    pub fn len(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, CellColor)> + '_ {
        let w = self.width as usize;
        self.cells.iter().enumerate().filter_map(move |(i, c)| {
            c.map(|color| (Cell::new((i % w) as i32, (i / w) as i32), color))
        })
    }

    /// New grid of the given size holding the overlapping part of this one.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        let copy_w = self.width.min(width) as usize;
        for y in 0..self.height.min(height) as usize {
            let src = y * self.width as usize;
            let dst = y * width as usize;
            out.cells[dst..dst + copy_w].copy_from_slice(&self.cells[src..src + copy_w]);
        }
        out
    }
}

// ============================================================================
// PIXEL STORE
// ============================================================================

/// The editable content of the drawing: either representation behind one
/// set of operations. A clone of a store is a history snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelStore {
    Sparse(SparseStore),
    Dense(DenseGrid),
}

impl PixelStore {
    pub fn unbounded() -> Self {
        PixelStore::Sparse(SparseStore::new())
    }

    pub fn bounded(width: u32, height: u32) -> Self {
        PixelStore::Dense(DenseGrid::new(width, height))
    }

    /// Insert or overwrite. Returns whether the store changed; cells outside a
    /// bounded grid are ignored.
    pub fn paint(&mut self, cell: Cell, color: CellColor) -> bool {
        match self {
            PixelStore::Sparse(s) => s.paint(cell, color),
            PixelStore::Dense(d) => d.paint(cell, color),
        }
    }

    /// Remove a cell's color. No-op if it was never painted.
    pub fn erase(&mut self, cell: Cell) -> bool {
        match self {
            PixelStore::Sparse(s) => s.erase(cell),
            PixelStore::Dense(d) => d.erase(cell),
        }
    }

    pub fn get(&self, cell: Cell) -> Option<CellColor> {
        match self {
            PixelStore::Sparse(s) => s.get(cell),
            PixelStore::Dense(d) => d.get(cell),
        }
    }

    pub fn clear(&mut self) {
        match self {
            PixelStore::Sparse(s) => s.clear(),
            PixelStore::Dense(d) => d.clear(),
        }
    }

    pub fn snapshot(&self) -> PixelStore {
        self.clone()
    }

    /// Replace all entries (and, for a bounded grid, its dimensions).
    pub fn restore(&mut self, snapshot: &PixelStore) {
        self.clone_from(snapshot);
    }

    pub fn len(&self) -> usize {
        match self {
            PixelStore::Sparse(s) => s.len(),
            PixelStore::Dense(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PixelStore::Sparse(s) => s.is_empty(),
            PixelStore::Dense(d) => d.is_empty(),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = (Cell, CellColor)> + '_> {
        match self {
            PixelStore::Sparse(s) => Box::new(s.iter()),
            PixelStore::Dense(d) => Box::new(d.iter()),
        }
    }

    /// `(width, height)` of a bounded grid.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            PixelStore::Sparse(_) => None,
            PixelStore::Dense(d) => Some((d.width(), d.height())),
        }
    }

    /// Inclusive `(min, max)` corners of the painted cells.
    pub fn bounds(&self) -> Option<(Cell, Cell)> {
        self.iter().fold(None, |acc, (cell, _)| match acc {
            None => Some((cell, cell)),
            Some((min, max)) => Some((
                Cell::new(min.x.min(cell.x), min.y.min(cell.y)),
                Cell::new(max.x.max(cell.x), max.y.max(cell.y)),
            )),
        })
    }

    pub fn memory_bytes(&self) -> usize {
        match self {
            PixelStore::Sparse(s) => s.len() * (std::mem::size_of::<u64>() + 4),
            PixelStore::Dense(d) => d.cells.len() * std::mem::size_of::<Option<CellColor>>(),
        }
    }
}
