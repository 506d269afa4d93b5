use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageError, Rgba, RgbaImage};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::canvas::{Cell, PixelStore};
use crate::frame::ExportFrame;
use crate::{log_err, log_info};

/// Largest output edge (after scaling) an export may produce.
pub const MAX_EXPORT_DIMENSION: u32 = 16_384;

/// Error type for export operations
#[derive(Debug)]
pub enum ExportError {
    /// No frame and no painted cells.
    NothingToExport,
    TooLarge { width: u64, height: u64 },
    Encode(ImageError),
    Io(std::io::Error),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::NothingToExport => write!(f, "Nothing to export: the canvas is empty"),
            ExportError::TooLarge { width, height } => write!(
                f,
                "Export of {}x{} exceeds the {} px limit",
                width, height, MAX_EXPORT_DIMENSION
            ),
            ExportError::Encode(e) => write!(f, "PNG encoding error: {}", e),
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Encode(e) => Some(e),
            ExportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ImageError> for ExportError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => ExportError::Io(io),
            other => ExportError::Encode(other),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Output pixels per cell edge (≥ 1).
    pub scale: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { scale: 1 }
    }
}

impl ExportOptions {
    pub fn with_scale(scale: u32) -> Self {
        Self { scale: scale.max(1) }
    }
}

// ============================================================================
// RASTERIZATION
// ============================================================================

/// The grid rectangle an export covers.
///
/// A bounded grid always exports whole. Otherwise the active frame wins, and
/// without one the painted cells are auto-cropped to their bounding box.
pub fn export_region(store: &PixelStore, frame: Option<ExportFrame>) -> Result<ExportFrame, ExportError> {
    if let Some((width, height)) = store.dimensions() {
        return Ok(ExportFrame::new(0, 0, width, height));
    }
    if let Some(frame) = frame {
        return Ok(frame);
    }
    store
        .bounds()
        .map(|(min, max)| ExportFrame::from_corners(min, max))
        .ok_or(ExportError::NothingToExport)
}

/// Rasterize `region` of the store: one `scale × scale` block per cell,
/// transparent where nothing is painted. Rows are filled in parallel.
pub fn rasterize(store: &PixelStore, region: ExportFrame, scale: u32) -> Result<RgbaImage, ExportError> {
    let scale = scale.max(1);
    let width = region.width as u64 * scale as u64;
    let height = region.height as u64 * scale as u64;
    if width > MAX_EXPORT_DIMENSION as u64 || height > MAX_EXPORT_DIMENSION as u64 {
        return Err(ExportError::TooLarge { width, height });
    }

    let mut image = RgbaImage::from_pixel(width as u32, height as u32, Rgba([0, 0, 0, 0]));
    let row_bytes = width as usize * 4;
    image
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(py, row)| {
            let cy = region.y as i64 + (py as u32 / scale) as i64;
            for cx_local in 0..region.width {
                let cx = region.x as i64 + cx_local as i64;
                let (Ok(x), Ok(y)) = (i32::try_from(cx), i32::try_from(cy)) else {
                    continue;
                };
                if let Some(color) = store.get(Cell::new(x, y)) {
                    let start = (cx_local * scale) as usize * 4;
                    for px in row[start..start + scale as usize * 4].chunks_exact_mut(4) {
                        px.copy_from_slice(&color.0);
                    }
                }
            }
        });
    Ok(image)
}

// ============================================================================
// ENCODING
// ============================================================================

/// PNG bytes for an image, in memory.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
    Ok(bytes)
}

/// Encode and write a PNG file.
/// Standalone (no `&self`) so it can run on a background thread via `rayon::spawn`.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer).write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)?;
    writer.flush()?;
    Ok(())
}

static LAST_EXPORT_STAMP: AtomicU64 = AtomicU64::new(0);

/// `<prefix>_<unix-millis>.png`. Stamps never repeat within a process, even
/// for two exports in the same millisecond.
pub fn export_filename(prefix: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let previous = LAST_EXPORT_STAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or(now);
    let stamp = now.max(previous + 1);
    format!("{}_{}.png", prefix, stamp)
}

// ============================================================================
// BACKGROUND EXPORT
// ============================================================================

/// Outcome of a background export, sent back to the UI thread.
#[derive(Debug)]
pub enum ExportResult {
    Saved(PathBuf),
    Failed { path: PathBuf, error: String },
}

/// Write `image` to `path` on the rayon pool. Fire-and-forget: the result is
/// reported once through `sender` and never retried.
pub fn spawn_export(image: RgbaImage, path: PathBuf, sender: mpsc::Sender<ExportResult>) {
    rayon::spawn(move || {
        let result = match write_png(&image, &path) {
            Ok(()) => {
                log_info!("Exported {}x{} to {}", image.width(), image.height(), path.display());
                ExportResult::Saved(path)
            }
            Err(e) => {
                log_err!("Export to {} failed: {}", path.display(), e);
                ExportResult::Failed { path, error: e.to_string() }
            }
        };
        let _ = sender.send(result);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn frame_export_is_frame_sized_and_transparent_elsewhere() {
        let mut store = PixelStore::unbounded();
        store.paint(Cell::new(1, 1), GREEN);
        let region = export_region(&store, Some(ExportFrame::new(0, 0, 3, 3))).unwrap();
        let image = rasterize(&store, region, 1).unwrap();

        assert_eq!(image.dimensions(), (3, 3));
        for (x, y, px) in image.enumerate_pixels() {
            let expected = if (x, y) == (1, 1) { GREEN } else { CLEAR };
            assert_eq!(*px, expected, "pixel ({}, {})", x, y);
        }
    }

    #[test]
    fn frameless_export_crops_to_painted_cells() {
        let mut store = PixelStore::unbounded();
        store.paint(Cell::new(-2, 3), GREEN);
        store.paint(Cell::new(1, 4), GREEN);
        let region = export_region(&store, None).unwrap();
        assert_eq!(region, ExportFrame::new(-2, 3, 4, 2));

        let image = rasterize(&store, region, 1).unwrap();
        assert_eq!(*image.get_pixel(0, 0), GREEN);
        assert_eq!(*image.get_pixel(3, 1), GREEN);
        assert_eq!(*image.get_pixel(1, 0), CLEAR);
    }

    #[test]
    fn empty_store_without_frame_has_nothing_to_export() {
        let store = PixelStore::unbounded();
        assert!(matches!(export_region(&store, None), Err(ExportError::NothingToExport)));
        // a frame makes even an empty canvas exportable
        assert!(export_region(&store, Some(ExportFrame::new(0, 0, 2, 2))).is_ok());
    }

    #[test]
    fn bounded_grid_exports_whole() {
        let mut store = PixelStore::bounded(5, 2);
        store.paint(Cell::new(4, 1), GREEN);
        let region = export_region(&store, Some(ExportFrame::new(1, 1, 1, 1))).unwrap();
        assert_eq!(region, ExportFrame::new(0, 0, 5, 2));
        assert_eq!(export_region(&PixelStore::bounded(2, 2), None).unwrap().width, 2);
    }

    #[test]
    fn scale_turns_cells_into_blocks() {
        let mut store = PixelStore::unbounded();
        store.paint(Cell::new(1, 0), GREEN);
        let image = rasterize(&store, ExportFrame::new(0, 0, 2, 1), 4).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(*image.get_pixel(3, 3), CLEAR);
        assert_eq!(*image.get_pixel(4, 0), GREEN);
        assert_eq!(*image.get_pixel(7, 3), GREEN);
    }

    #[test]
    fn oversized_exports_are_rejected() {
        let store = PixelStore::unbounded();
        let frame = ExportFrame::new(0, 0, 10_000, 1);
        assert!(matches!(rasterize(&store, frame, 2), Err(ExportError::TooLarge { .. })));
    }

    #[test]
    fn filenames_are_prefixed_and_strictly_increasing() {
        let stamp = |name: &str| -> u64 {
            name.trim_start_matches("pixelart_").trim_end_matches(".png").parse().unwrap()
        };
        let a = export_filename("pixelart");
        let b = export_filename("pixelart");
        assert!(a.starts_with("pixelart_") && a.ends_with(".png"));
        assert!(stamp(&b) > stamp(&a));
    }

    #[test]
    fn png_round_trips_through_disk() {
        let mut store = PixelStore::unbounded();
        store.paint(Cell::new(0, 0), GREEN);
        let image = rasterize(&store, ExportFrame::new(0, 0, 2, 2), 1).unwrap();

        let bytes = encode_png(&image).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(export_filename("test"));
        write_png(&image, &path).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn spawned_export_reports_once() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let image = RgbaImage::from_pixel(1, 1, GREEN);

        spawn_export(image.clone(), dir.path().join("ok.png"), tx.clone());
        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            ExportResult::Saved(path) => assert!(path.exists()),
            other => panic!("unexpected {:?}", other),
        }

        spawn_export(image, dir.path().join("missing").join("x.png"), tx);
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(10)).unwrap(),
            ExportResult::Failed { .. }
        ));
    }
}
