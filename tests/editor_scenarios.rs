//! End-to-end drawing sessions driven through the public editor API.

use std::collections::HashSet;

use egui::Vec2;
use image::Rgba;
use pixelsketch::canvas::{Cell, CellColor};
use pixelsketch::components::tools::Tool;
use pixelsketch::editor::{Editor, EditorCommand, GridMode, PointerButton};
use pixelsketch::frame::ExportFrame;
use pixelsketch::io::{ExportError, ExportOptions};
use pixelsketch::settings::AppSettings;
use pixelsketch::viewport::ScreenPos;

const RED: CellColor = Rgba([255, 0, 0, 255]);
const BLUE: CellColor = Rgba([0, 0, 255, 255]);
const GREEN: CellColor = Rgba([0, 255, 0, 255]);
const BLACK: CellColor = Rgba([0, 0, 0, 255]);

fn editor_with(settings: AppSettings) -> Editor {
    let mut editor = Editor::new(&settings);
    editor.set_viewport_size(Vec2::new(800.0, 600.0));
    editor
}

fn center_of(editor: &Editor, x: i32, y: i32) -> ScreenPos {
    let view = editor.mapper().view();
    let p = view.grid_to_screen(Cell::new(x, y));
    let half = view.scale() / 2.0;
    ScreenPos::new(p.x + half, p.y + half)
}

fn click(editor: &mut Editor, x: i32, y: i32) {
    let p = center_of(editor, x, y);
    editor.pointer_down(p, PointerButton::Primary);
    editor.pointer_up();
}

fn drag(editor: &mut Editor, from: (i32, i32), to: (i32, i32)) {
    let a = center_of(editor, from.0, from.1);
    let b = center_of(editor, to.0, to.1);
    editor.pointer_down(a, PointerButton::Primary);
    editor.pointer_move(b);
    editor.pointer_up();
}

#[test]
fn overpaint_then_undo_restores_previous_color() {
    let mut editor = editor_with(AppSettings::default());
    editor.apply(EditorCommand::SetColor(RED)).unwrap();
    click(&mut editor, 2, 3);
    editor.apply(EditorCommand::SetColor(BLUE)).unwrap();
    click(&mut editor, 2, 3);
    assert_eq!(editor.store().get(Cell::new(2, 3)), Some(BLUE));

    editor.apply(EditorCommand::Undo).unwrap();
    assert_eq!(editor.store().get(Cell::new(2, 3)), Some(RED));
    editor.apply(EditorCommand::Undo).unwrap();
    assert_eq!(editor.store().get(Cell::new(2, 3)), None);
    editor.apply(EditorCommand::Redo).unwrap();
    assert_eq!(editor.store().get(Cell::new(2, 3)), Some(RED));
}

#[test]
fn dragged_stroke_fills_the_line_and_is_one_step() {
    let mut editor = editor_with(AppSettings::default());
    drag(&mut editor, (0, 0), (5, 0));
    assert_eq!(editor.store().len(), 6);
    assert_eq!(editor.history().undo_count(), 1);

    editor.apply(EditorCommand::Undo).unwrap();
    assert!(editor.store().is_empty());
}

#[test]
fn framed_export_of_a_single_cell() {
    let mut editor = editor_with(AppSettings::default());
    editor.apply(EditorCommand::SetColor(GREEN)).unwrap();
    click(&mut editor, 1, 1);
    editor.set_frame(ExportFrame::new(0, 0, 3, 3));
    editor.apply(EditorCommand::ToggleFrame).unwrap();

    let image = editor.export_image(&ExportOptions::default()).unwrap();
    assert_eq!(image.dimensions(), (3, 3));
    for (x, y, px) in image.enumerate_pixels() {
        if (x, y) == (1, 1) {
            assert_eq!(*px, GREEN);
        } else {
            assert_eq!(px.0[3], 0, "pixel ({}, {}) should be transparent", x, y);
        }
    }
}

#[test]
fn empty_canvas_without_frame_cannot_export() {
    let editor = editor_with(AppSettings::default());
    assert!(matches!(
        editor.export_image(&ExportOptions::default()),
        Err(ExportError::NothingToExport)
    ));
}

#[test]
fn template_stamps_a_bounded_grid_and_undoes() {
    let settings = AppSettings {
        bounded: true,
        grid_width: 13,
        grid_height: 20,
        ..Default::default()
    };
    let mut editor = editor_with(settings);
    assert_eq!(editor.grid_mode(), GridMode::Bounded { width: 13, height: 20 });

    editor.apply(EditorCommand::ApplyTemplate).unwrap();
    let offset = editor.template_offset();
    let expected: HashSet<Cell> = editor.template().placed(offset).collect();
    assert_eq!(editor.store().len(), expected.len());
    for &cell in &expected {
        assert_eq!(editor.store().get(cell), Some(BLACK), "cell {}", cell);
    }

    let image = editor.export_image(&ExportOptions::default()).unwrap();
    assert_eq!(image.dimensions(), (13, 20));

    editor.apply(EditorCommand::Undo).unwrap();
    assert!(editor.store().is_empty());
}

#[test]
fn history_keeps_only_the_newest_steps() {
    let mut editor = editor_with(AppSettings::default());
    for i in 0..75 {
        click(&mut editor, i, 0);
    }
    assert_eq!(editor.history().len(), 50);
    assert_eq!(editor.history().undo_count(), 49);

    while editor.history().can_undo() {
        editor.apply(EditorCommand::Undo).unwrap();
    }
    // the oldest surviving state already holds the first 26 strokes
    assert_eq!(editor.store().len(), 26);
    assert_eq!(editor.store().get(Cell::new(25, 0)), Some(BLACK));
    assert_eq!(editor.store().get(Cell::new(26, 0)), None);
}

#[test]
fn erasing_removes_what_was_painted() {
    let mut editor = editor_with(AppSettings::default());
    click(&mut editor, 4, 4);
    editor.apply(EditorCommand::SetTool(Tool::Eraser)).unwrap();
    click(&mut editor, 4, 4);
    assert_eq!(editor.store().get(Cell::new(4, 4)), None);

    // erasing blank space changes nothing and records nothing
    let steps = editor.history().undo_count();
    click(&mut editor, 9, 9);
    assert_eq!(editor.history().undo_count(), steps);
}

#[test]
fn new_stroke_after_undo_drops_redo() {
    let mut editor = editor_with(AppSettings::default());
    click(&mut editor, 0, 0);
    click(&mut editor, 1, 0);
    editor.apply(EditorCommand::Undo).unwrap();
    assert!(editor.history().can_redo());

    click(&mut editor, 2, 0);
    assert!(!editor.history().can_redo());
    assert_eq!(editor.store().get(Cell::new(1, 0)), None);
}

#[test]
fn pan_then_paint_lands_on_the_cell_under_the_pointer() {
    let mut editor = editor_with(AppSettings::default());
    editor.apply(EditorCommand::SetTool(Tool::Pan)).unwrap();
    let start = ScreenPos::new(100.0, 100.0);
    editor.pointer_down(start, PointerButton::Primary);
    editor.pointer_move(ScreenPos::new(137.0, 71.0));
    editor.pointer_up();

    editor.apply(EditorCommand::SetTool(Tool::Pen)).unwrap();
    let pos = ScreenPos::new(250.0, 250.0);
    let expected = editor.cell_at(pos).unwrap();
    editor.pointer_down(pos, PointerButton::Primary);
    editor.pointer_up();
    assert_eq!(editor.store().get(expected), Some(BLACK));
}
