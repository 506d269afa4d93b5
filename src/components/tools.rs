use eframe::egui;
use egui::CursorIcon;

/// Drawing tools. Pen and Eraser change single cells; Pan drags the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
    Pan,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pen => "Pen",
            Tool::Eraser => "Eraser",
            Tool::Pan => "Pan",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::Pen, Tool::Eraser, Tool::Pan]
    }

    /// Keyboard shortcut shown in tooltips.
    pub fn shortcut(&self) -> &'static str {
        match self {
            Tool::Pen => "P",
            Tool::Eraser => "E",
            Tool::Pan => "Space",
        }
    }

    /// History label for a stroke made with this tool.
    pub fn stroke_description(&self) -> &'static str {
        match self {
            Tool::Pen => "Pen stroke",
            Tool::Eraser => "Eraser stroke",
            Tool::Pan => "Pan",
        }
    }

    pub fn paints(&self) -> bool {
        matches!(self, Tool::Pen | Tool::Eraser)
    }

    /// Cursor over empty canvas.
    pub fn cursor(&self) -> CursorIcon {
        match self {
            Tool::Pen | Tool::Eraser => CursorIcon::Crosshair,
            Tool::Pan => CursorIcon::Grab,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pen_and_eraser_paint() {
        assert!(Tool::Pen.paints());
        assert!(Tool::Eraser.paints());
        assert!(!Tool::Pan.paints());
        assert_eq!(Tool::default(), Tool::Pen);
        assert_eq!(Tool::all().len(), 3);
    }

    #[test]
    fn cursors() {
        assert_eq!(Tool::Pan.cursor(), CursorIcon::Grab);
        assert_eq!(Tool::Eraser.cursor(), CursorIcon::Crosshair);
    }
}
