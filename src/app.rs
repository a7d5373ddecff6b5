use std::time::{Duration, Instant};

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, TextureHandle, TextureOptions, Vec2};

use crate::canvas::{PixelSurface, Point};
use crate::components::history::{HistoryAction, HistoryPanel};
use crate::components::tools::{ToolProperties, ToolbarAction, ToolsPanel};
use crate::controller::{CanvasController, EngineConfig, KeyInput, caret_visible};
use crate::io;
use crate::settings::AppSettings;

const TEXTURE_OPTIONS: TextureOptions = TextureOptions::NEAREST;

/// The window: shows the composed frame, hosts the toolbar in the reserved
/// band and forwards pointer and keyboard input to the controller.
pub struct RasterPadApp {
    controller: CanvasController,
    props: ToolProperties,
    settings: AppSettings,
    tools_panel: ToolsPanel,
    history_panel: HistoryPanel,
    texture: Option<TextureHandle>,
    /// (revision, caret phase) the texture was last uploaded for.
    uploaded: Option<(u64, bool)>,
    started: Instant,
    status: Option<String>,
}

impl RasterPadApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        let controller = CanvasController::new(EngineConfig::from(&settings));
        let mut props = ToolProperties {
            background: settings.background,
            shape_fill: settings.shape_fill,
            ..ToolProperties::default()
        };
        props.set_size(settings.brush_size);
        Self {
            controller,
            props,
            settings,
            tools_panel: ToolsPanel::default(),
            history_panel: HistoryPanel::default(),
            texture: None,
            uploaded: None,
            started: Instant::now(),
            status: None,
        }
    }

    fn caret_phase(&self) -> bool {
        let millis = self.started.elapsed().as_millis() as u64;
        caret_visible(millis, self.settings.caret_blink_ms)
    }

    fn upload_frame(&mut self, ctx: &egui::Context) {
        let caret = self.caret_phase();
        let key = (self.controller.revision(), self.controller.is_editing_text() && caret);
        if self.texture.is_some() && self.uploaded == Some(key) {
            return;
        }

        let frame = self.controller.render_frame(caret);
        let image = to_color_image(&frame);
        match self.texture.as_mut() {
            Some(tex) => tex.set(image, TEXTURE_OPTIONS),
            None => self.texture = Some(ctx.load_texture("canvas_surface", image, TEXTURE_OPTIONS)),
        }
        self.uploaded = Some(key);
    }

    fn handle_toolbar_action(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::ToolChanged(_) | ToolbarAction::ColorChanged => self.controller.finish_gesture(),
            ToolbarAction::Save => self.save_image(),
            ToolbarAction::Clear => self.controller.clear(),
        }
    }

    fn save_image(&mut self) {
        self.controller.finish_gesture();
        let dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        self.status = Some(match io::export_png(self.controller.surface(), &dir) {
            Ok(path) => format!("Saved {}", path.display()),
            Err(e) => {
                log_err!("Save failed: {}", e);
                format!("Save failed: {}", e)
            }
        });
    }

    fn persist_settings(&mut self) {
        if self.settings.brush_size != self.props.size || self.settings.shape_fill != self.props.shape_fill {
            self.settings.brush_size = self.props.size;
            self.settings.shape_fill = self.props.shape_fill;
            self.settings.save();
        }
    }
}

/// Screen position → surface pixel, for a surface drawn into `rect`.
fn to_surface(surface: &PixelSurface, rect: Rect, pos: Pos2) -> Point {
    let sx = surface.width() as f32 / rect.width();
    let sy = surface.height() as f32 / rect.height();
    (
        ((pos.x - rect.min.x) * sx).floor() as i32,
        ((pos.y - rect.min.y) * sy).floor() as i32,
    )
}

/// Forward this frame's primary-button activity to the controller.
///
/// A press and a release may both land in one frame (a quick click), so each
/// is handled on its own, press first.
fn route_pointer(ctx: &egui::Context, rect: Rect, controller: &mut CanvasController, props: &ToolProperties) {
    let (pressed, released, down, moved, pos) = ctx.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.primary_down(),
            i.pointer.delta() != Vec2::ZERO,
            i.pointer.interact_pos(),
        )
    });
    let Some(pos) = pos else { return };
    let p = to_surface(controller.surface(), rect, pos);

    if pressed {
        // Band clicks belong to the toolbar, popups (colour picker) float above the canvas
        let over_popup = ctx
            .layer_id_at(pos)
            .is_some_and(|layer| layer.order != egui::Order::Background);
        if !over_popup && controller.surface().is_drawable(p.0, p.1) {
            controller.pointer_down(p, props);
        }
    }
    if controller.is_dragging() && down && moved {
        controller.pointer_move(p);
    }
    if released || (controller.is_dragging() && !down) {
        controller.pointer_up(p);
    }
}

/// Forward typed text and editing keys. Nothing reaches the canvas while an
/// egui widget (e.g. a colour picker field) holds keyboard focus.
fn route_keys(ctx: &egui::Context, controller: &mut CanvasController, props: &mut ToolProperties) {
    if ctx.wants_keyboard_input() {
        return;
    }
    let (undo, redo) = ctx.input_mut(|i| {
        (
            i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z),
            i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y),
        )
    });
    if undo {
        controller.undo();
    }
    if redo {
        controller.redo();
    }

    let events: Vec<egui::Event> = ctx.input(|i| i.events.clone());
    for event in &events {
        match event {
            egui::Event::Text(t) => {
                for c in t.chars() {
                    controller.key_input(KeyInput::Char(c), props);
                }
            }
            egui::Event::Key { key, pressed: true, .. } => {
                let input = match key {
                    egui::Key::Enter => Some(KeyInput::Enter),
                    egui::Key::Backspace => Some(KeyInput::Backspace),
                    egui::Key::Escape => Some(KeyInput::Escape),
                    _ => None,
                };
                if let Some(input) = input {
                    controller.key_input(input, props);
                }
            }
            _ => {}
        }
    }
}

fn to_color_image(surface: &PixelSurface) -> ColorImage {
    ColorImage::from_rgba_unmultiplied([surface.width() as usize, surface.height() as usize], surface.as_raw())
}

impl eframe::App for RasterPadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        route_keys(ctx, &mut self.controller, &mut self.props);

        egui::CentralPanel::default().frame(egui::Frame::none()).show(ctx, |ui| {
            let surface = self.controller.surface();
            let (w, h, band) = (surface.width() as f32, surface.height() as f32, surface.toolbar_height() as f32);
            let rect = Rect::from_min_size(ui.max_rect().min, Vec2::new(w, h));
            let band_rect = Rect::from_min_size(rect.min, Vec2::new(w, band));

            // Surface first, toolbar chrome on top of its reserved band
            self.upload_frame(ctx);
            if let Some(tex) = &self.texture {
                ui.painter().image(
                    tex.id(),
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
            ui.painter().rect_filled(band_rect, 0.0, Color32::from_gray(220));
            ui.painter().line_segment(
                [band_rect.left_bottom(), band_rect.right_bottom()],
                egui::Stroke::new(2.0, Color32::BLACK),
            );

            let mut toolbar_action = None;
            let mut history_action = None;
            ui.allocate_ui_at_rect(band_rect.shrink(6.0), |ui| {
                toolbar_action = self.tools_panel.show(ui, &mut self.props);
                ui.horizontal(|ui| {
                    history_action = self.history_panel.show(ui, self.controller.history());
                    if let Some(status) = &self.status {
                        ui.separator();
                        ui.label(status);
                    }
                });
            });

            if let Some(action) = toolbar_action {
                self.handle_toolbar_action(action);
            }
            match history_action {
                Some(HistoryAction::Undo) => {
                    self.controller.undo();
                }
                Some(HistoryAction::Redo) => {
                    self.controller.redo();
                }
                None => {}
            }

            route_pointer(ctx, rect, &mut self.controller, &self.props);
        });

        self.persist_settings();

        if self.controller.is_editing_text() {
            ctx.request_repaint_after(Duration::from_millis(self.settings.caret_blink_ms));
        }
    }
}
