// ============================================================================
// PixelSketch CLI: headless drawing and export via command-line arguments
// ============================================================================
//
// Usage examples:
//   PixelSketch --output face.png --template
//   PixelSketch -o dot.png --paint 1,1,#00ff00 --frame 0,0,3,3
//   PixelSketch -o sprite.png --grid 16x16 --color #ff0000 --paint 0,0 --paint 15,15 --scale 8
//
// No GUI is opened in CLI mode. The drawing is built through the same editor
// commands as the GUI and exported synchronously.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use image::RgbaImage;

use crate::canvas::{Cell, CellColor, parse_hex_color};
use crate::components::tools::Tool;
use crate::editor::{Editor, EditorCommand, GridMode};
use crate::frame::ExportFrame;
use crate::io::ExportOptions;
use crate::logger;
use crate::settings::AppSettings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelSketch headless exporter.
///
/// Paint cells from the command line and write the result as a PNG.
#[derive(Parser, Debug)]
#[command(
    name = "PixelSketch",
    about = "PixelSketch headless pixel-art exporter",
    long_about = "Build a pixel drawing from command-line flags and export it as PNG\n\
                  without opening the GUI. Paints are applied first, then erases.\n\n\
                  Example:\n  \
                  PixelSketch --output face.png --template\n  \
                  PixelSketch -o sprite.png --grid 16x16 --paint 0,0,#ff0000 --scale 8"
)]
pub struct CliArgs {
    /// Output PNG path.
    #[arg(short, long, required = true, value_name = "FILE")]
    pub output: PathBuf,

    /// Use a bounded grid of this size instead of the infinite canvas.
    #[arg(short, long, value_name = "WxH", value_parser = parse_grid_size)]
    pub grid: Option<(u32, u32)>,

    /// Stamp the built-in figure template before painting.
    #[arg(short, long)]
    pub template: bool,

    /// Pen color for --paint entries without their own color.
    #[arg(short, long, value_name = "HEX", value_parser = parse_color_arg)]
    pub color: Option<CellColor>,

    /// Paint one cell. Repeatable.
    #[arg(short, long, value_name = "X,Y[,HEX]", value_parser = parse_paint, allow_hyphen_values = true)]
    pub paint: Vec<(Cell, Option<CellColor>)>,

    /// Erase one cell. Repeatable.
    #[arg(short, long, value_name = "X,Y", value_parser = parse_cell, allow_hyphen_values = true)]
    pub erase: Vec<Cell>,

    /// Export exactly this region of the infinite canvas.
    #[arg(short, long, value_name = "X,Y,W,H", value_parser = parse_frame, allow_hyphen_values = true)]
    pub frame: Option<ExportFrame>,

    /// Output pixels per cell (defaults to the export_scale setting).
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=256))]
    pub scale: Option<u32>,

    /// Mirror log output to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when the output flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        Self::requests_cli(std::env::args().skip(1))
    }

    /// `--output`, `--output=FILE`, `-o`, `-oFILE`, `-o=FILE`.
    fn requests_cli(args: impl IntoIterator<Item = impl AsRef<str>>) -> bool {
        args.into_iter().any(|a| {
            let a = a.as_ref();
            a == "--output" || a.starts_with("--output=") || (a.starts_with("-o") && !a.starts_with("--"))
        })
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the export and return an OS exit code.
/// `0` = file written, `1` = any error (including nothing to export).
pub fn run(args: CliArgs) -> ExitCode {
    if args.verbose {
        logger::init_verbose();
    }
    let settings = AppSettings::load();
    match execute(&args, &settings) {
        Ok(image) => {
            println!(
                "Exported {}x{} to {}",
                image.width(),
                image.height(),
                args.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build the drawing described by `args` and write it.
fn execute(args: &CliArgs, settings: &AppSettings) -> Result<RgbaImage, String> {
    let mut settings = settings.clone();
    if let Some((width, height)) = args.grid {
        let max = settings.max_grid_size;
        if width > max || height > max {
            return Err(format!("grid {}x{} exceeds max_grid_size {}", width, height, max));
        }
        settings.bounded = true;
        settings.grid_width = width;
        settings.grid_height = height;
    } else {
        settings.bounded = false;
    }

    let mut editor = Editor::new(&settings);

    if args.template {
        editor.apply(EditorCommand::ApplyTemplate).map_err(|e| e.to_string())?;
    }

    let pen = args.color.unwrap_or(settings.default_color);
    for &(cell, color) in &args.paint {
        editor
            .apply(EditorCommand::SetColor(color.unwrap_or(pen)))
            .map_err(|e| e.to_string())?;
        editor.stroke_cells(Tool::Pen, [cell]);
    }
    editor.stroke_cells(Tool::Eraser, args.erase.iter().copied());

    if let Some(frame) = args.frame {
        if matches!(editor.grid_mode(), GridMode::Bounded { .. }) {
            crate::log_warn!("--frame is ignored on a bounded grid; the whole grid is exported");
        }
        editor.set_frame(frame);
        if !editor.flags().show_frame {
            editor.apply(EditorCommand::ToggleFrame).map_err(|e| e.to_string())?;
        }
    }

    let options = match args.scale {
        Some(scale) => ExportOptions::with_scale(scale),
        None => editor.export_options(),
    };
    editor
        .export_to(&args.output, &options)
        .map_err(|e| e.to_string())
}

// ============================================================================
// Argument parsers
// ============================================================================

fn parse_int<T: std::str::FromStr>(part: &str, what: &str) -> Result<T, String> {
    part.trim()
        .parse()
        .map_err(|_| format!("invalid {} '{}'", what, part.trim()))
}

/// `"16x16"` → `(16, 16)`.
fn parse_grid_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let (w, h): (u32, u32) = (parse_int(w, "width")?, parse_int(h, "height")?);
    if w == 0 || h == 0 {
        return Err("grid width and height must be at least 1".to_string());
    }
    Ok((w, h))
}

fn parse_color_arg(s: &str) -> Result<CellColor, String> {
    parse_hex_color(s).map_err(|e| e.to_string())
}

/// `"x,y"` → cell.
fn parse_cell(s: &str) -> Result<Cell, String> {
    let parts: Vec<&str> = s.split(',').collect();
    match parts.as_slice() {
        [x, y] => Ok(Cell::new(parse_int(x, "x")?, parse_int(y, "y")?)),
        _ => Err(format!("expected X,Y, got '{}'", s)),
    }
}

/// `"x,y"` or `"x,y,#rrggbb"`.
fn parse_paint(s: &str) -> Result<(Cell, Option<CellColor>), String> {
    let parts: Vec<&str> = s.split(',').collect();
    match parts.as_slice() {
        [x, y] => Ok((Cell::new(parse_int(x, "x")?, parse_int(y, "y")?), None)),
        [x, y, color] => Ok((
            Cell::new(parse_int(x, "x")?, parse_int(y, "y")?),
            Some(parse_color_arg(color)?),
        )),
        _ => Err(format!("expected X,Y[,HEX], got '{}'", s)),
    }
}

/// `"x,y,w,h"` → frame. Width and height must be positive.
fn parse_frame(s: &str) -> Result<ExportFrame, String> {
    let parts: Vec<&str> = s.split(',').collect();
    let [x, y, w, h] = parts.as_slice() else {
        return Err(format!("expected X,Y,W,H, got '{}'", s));
    };
    let (w, h): (u32, u32) = (parse_int(w, "width")?, parse_int(h, "height")?);
    if w == 0 || h == 0 {
        return Err("frame width and height must be at least 1".to_string());
    }
    Ok(ExportFrame::new(parse_int(x, "x")?, parse_int(y, "y")?, w, h))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const GREEN: CellColor = Rgba([0, 255, 0, 255]);

    fn args(extra: &[&str], out: &std::path::Path) -> CliArgs {
        let mut argv = vec!["PixelSketch", "--output", out.to_str().unwrap()];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn parses_coordinates_and_sizes() {
        assert_eq!(parse_grid_size("16x8"), Ok((16, 8)));
        assert_eq!(parse_grid_size("3X4"), Ok((3, 4)));
        assert!(parse_grid_size("0x4").is_err());
        assert!(parse_grid_size("16").is_err());

        assert_eq!(parse_cell("-3, 7"), Ok(Cell::new(-3, 7)));
        assert!(parse_cell("1,2,3").is_err());

        assert_eq!(parse_paint("1,1,#00ff00"), Ok((Cell::new(1, 1), Some(GREEN))));
        assert_eq!(parse_paint("1,1"), Ok((Cell::new(1, 1), None)));
        assert!(parse_paint("1,1,nope").is_err());

        assert_eq!(parse_frame("-1,2,3,4"), Ok(ExportFrame::new(-1, 2, 3, 4)));
        assert!(parse_frame("0,0,0,4").is_err());
    }

    #[test]
    fn every_output_spelling_selects_cli_mode() {
        for argv in [
            &["--output", "a.png"][..],
            &["--output=a.png"],
            &["-o", "a.png"],
            &["-oa.png"],
            &["-o=a.png"],
            &["--template", "-oa.png"],
        ] {
            assert!(CliArgs::requests_cli(argv), "{:?}", argv);
        }
        assert!(!CliArgs::requests_cli(["--template"]));
        assert!(!CliArgs::requests_cli(Vec::<String>::new()));

        let parsed = CliArgs::try_parse_from(["PixelSketch", "-oa.png"]).unwrap();
        assert_eq!(parsed.output, PathBuf::from("a.png"));
    }

    #[test]
    fn output_is_required() {
        assert!(CliArgs::try_parse_from(["PixelSketch", "--template"]).is_err());
    }

    #[test]
    fn exports_a_framed_cell() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dot.png");
        let a = args(&["--paint", "1,1,#00ff00", "--frame", "0,0,3,3"], &out);
        let image = execute(&a, &AppSettings::default()).unwrap();

        assert_eq!(image.dimensions(), (3, 3));
        assert_eq!(*image.get_pixel(1, 1), GREEN);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert!(out.exists());
    }

    #[test]
    fn bounded_grid_with_scale_and_erase() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("grid.png");
        let a = args(
            &["--grid", "4x2", "--color", "#ff0000", "--paint", "0,0", "--paint", "3,1", "--erase", "0,0", "--scale", "2"],
            &out,
        );
        let image = execute(&a, &AppSettings::default()).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(*image.get_pixel(7, 3), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn empty_drawing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.png");
        let err = execute(&args(&[], &out), &AppSettings::default()).unwrap_err();
        assert!(err.contains("Nothing to export"));
        assert!(!out.exists());
    }

    #[test]
    fn template_alone_is_exportable() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("figure.png");
        let image = execute(&args(&["--template"], &out), &AppSettings::default()).unwrap();
        assert_eq!(image.dimensions(), (13, 20));
    }
}
