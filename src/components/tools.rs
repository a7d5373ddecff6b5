use eframe::egui;
use egui::Color32;
use image::Rgba;

use crate::canvas::{Color, BLACK, BLUE, CYAN, GREEN, MAGENTA, RED, WHITE, YELLOW};
use crate::ops::shapes::{ShapeFillMode, ShapeKind};

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 50;

/// Text preview colour while the eraser is active, so typed text stays legible.
pub const ERASER_PREVIEW_TEXT: Color = Rgba([50, 50, 50, 255]);

/// Fixed swatches. The background swatch toggles eraser mode.
pub const PALETTE: [Color; 8] = [BLACK, RED, GREEN, BLUE, YELLOW, CYAN, MAGENTA, WHITE];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Brush,
    Rectangle,
    Circle,
    Triangle,
    Fill,
    Text,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Brush => "BRUSH",
            Tool::Rectangle => "RECT",
            Tool::Circle => "CIRCLE",
            Tool::Triangle => "TRI",
            Tool::Fill => "FILL",
            Tool::Text => "TEXT",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::Brush, Tool::Rectangle, Tool::Circle, Tool::Triangle, Tool::Fill, Tool::Text]
    }

    /// The preview shape dragged out by this tool, if it is a shape tool.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Tool::Rectangle => Some(ShapeKind::Rectangle),
            Tool::Circle => Some(ShapeKind::Circle),
            Tool::Triangle => Some(ShapeKind::Triangle),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Tool> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brush" => Some(Tool::Brush),
            "rect" | "rectangle" => Some(Tool::Rectangle),
            "circle" => Some(Tool::Circle),
            "tri" | "triangle" => Some(Tool::Triangle),
            "fill" => Some(Tool::Fill),
            "text" => Some(Tool::Text),
            _ => None,
        }
    }
}

/// Tool and colour state owned by the UI and read by the controller at
/// gesture start.
#[derive(Clone, Debug)]
pub struct ToolProperties {
    pub tool: Tool,
    pub color: Color,
    pub eraser: bool,
    pub size: u32,
    pub background: Color,
    pub shape_fill: ShapeFillMode,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            tool: Tool::Brush,
            color: BLACK,
            eraser: false,
            size: 5,
            background: WHITE,
            shape_fill: ShapeFillMode::Outline,
        }
    }
}

impl ToolProperties {
    /// Colour written by the current tool (background when erasing).
    pub fn effective_color(&self) -> Color {
        if self.eraser { self.background } else { self.color }
    }

    pub fn preview_text_color(&self) -> Color {
        if self.eraser { ERASER_PREVIEW_TEXT } else { self.color }
    }

    /// Line thickness for shape previews; 0 means filled.
    pub fn shape_thickness(&self) -> u32 {
        self.shape_fill.thickness(self.size)
    }

    /// Pick a colour. The background colour switches to eraser mode and keeps
    /// the previous ink colour.
    pub fn select_color(&mut self, color: Color) {
        if color == self.background {
            self.eraser = true;
        } else {
            self.eraser = false;
            self.color = color;
        }
    }

    pub fn select_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.eraser = false;
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn grow(&mut self) {
        self.set_size(self.size + 1);
    }

    pub fn shrink(&mut self) {
        self.set_size(self.size.saturating_sub(1));
    }
}

// ============================================================================
// TOOLBAR STRIP
// ============================================================================

/// Requests from the toolbar that need the controller or the exporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolbarAction {
    ToolChanged(Tool),
    ColorChanged,
    Save,
    Clear,
}

fn to_color32(c: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}

fn from_color32(c: Color32) -> Color {
    let [r, g, b, _] = c.to_srgba_unmultiplied();
    Rgba([r, g, b, 255])
}

#[derive(Default)]
pub struct ToolsPanel {
    picker_color: Option<Color32>,
}

impl ToolsPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, props: &mut ToolProperties) -> Option<ToolbarAction> {
        let mut action = None;

        ui.label(
            egui::RichText::new("C: Clear | ^Z: Undo | ^Y: Redo | +/-: Size | ENTER: Commit Text")
                .color(Color32::from_gray(40))
                .size(13.0),
        );

        ui.horizontal(|ui| {
            for &tool in Tool::all() {
                let selected = props.tool == tool && !props.eraser;
                if ui.selectable_label(selected, tool.label()).clicked() {
                    props.select_tool(tool);
                    action = Some(ToolbarAction::ToolChanged(tool));
                }
            }
            ui.separator();
            if ui.button("SAVE").clicked() {
                action = Some(ToolbarAction::Save);
            }
            if ui.button("CLEAR").clicked() {
                action = Some(ToolbarAction::Clear);
            }
        });

        ui.horizontal(|ui| {
            for &swatch in PALETTE.iter() {
                let is_eraser_swatch = swatch == props.background;
                let active = if is_eraser_swatch { props.eraser } else { !props.eraser && props.color == swatch };
                let (rect, response) = ui.allocate_exact_size(egui::vec2(35.0, 35.0), egui::Sense::click());
                ui.painter().rect_filled(rect, 2.0, to_color32(swatch));
                let stroke = if active {
                    egui::Stroke::new(3.0, Color32::from_rgb(255, 140, 0))
                } else {
                    egui::Stroke::new(1.0, Color32::from_gray(60))
                };
                ui.painter().rect_stroke(rect, 2.0, stroke);
                let response = if is_eraser_swatch { response.on_hover_text("Eraser") } else { response };
                if response.clicked() {
                    props.select_color(swatch);
                    action = Some(ToolbarAction::ColorChanged);
                }
            }

            ui.separator();
            let mut picked = self.picker_color.unwrap_or_else(|| to_color32(props.color));
            if ui.color_edit_button_srgba(&mut picked).changed() {
                self.picker_color = Some(picked);
                props.select_color(from_color32(picked));
                action = Some(ToolbarAction::ColorChanged);
            }
        });

        ui.horizontal(|ui| {
            let mut size = props.size;
            ui.label(egui::RichText::new(format!("Brush Size: {}", props.size)).strong());
            if ui
                .add(egui::Slider::new(&mut size, MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE).show_value(false))
                .changed()
            {
                props.set_size(size);
            }
            ui.separator();
            ui.radio_value(&mut props.shape_fill, ShapeFillMode::Outline, "Outline");
            ui.radio_value(&mut props.shape_fill, ShapeFillMode::Filled, "Filled");
            if props.eraser {
                ui.label(egui::RichText::new("ERASER").color(Color32::from_rgb(200, 60, 60)));
            }
        });

        action
    }
}
