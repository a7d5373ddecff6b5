use std::borrow::Cow;

use crate::canvas::{Color, PixelSurface, Point, WHITE};
use crate::components::history::{DEFAULT_MAX_HISTORY, HistoryManager};
use crate::components::tools::{Tool, ToolProperties};
use crate::ops::fill::{FillOutcome, flood_fill};
use crate::ops::shapes::preview_shape;
use crate::ops::stroke::stamp_line;
use crate::ops::text::{TextRenderer, canvas_font_size, draw_text_preview};
use crate::settings::AppSettings;

/// The settings the engine itself consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub toolbar_height: u32,
    pub max_history: usize,
    pub background: Color,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 650,
            toolbar_height: 160,
            max_history: DEFAULT_MAX_HISTORY,
            background: WHITE,
        }
    }
}

impl From<&AppSettings> for EngineConfig {
    fn from(s: &AppSettings) -> Self {
        Self {
            width: s.canvas_width,
            height: s.canvas_height,
            toolbar_height: s.toolbar_height,
            max_history: s.max_undo_steps,
            background: s.background,
        }
    }
}

/// Keyboard input delivered to the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Backspace,
    Enter,
    Escape,
}

/// Transient per-gesture state. Tool, colour and size are captured when the
/// gesture starts.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureState {
    Idle,
    Dragging {
        tool: Tool,
        anchor: Point,
        previous: Point,
        color: Color,
        thickness: u32,
    },
    TextEditing {
        anchor: Point,
        buffer: String,
        color: Color,
        preview_color: Color,
        font_size: f32,
    },
}

/// Owns the live surface and its history, and turns pointer and key events
/// into engine calls.
pub struct CanvasController {
    surface: PixelSurface,
    history: HistoryManager,
    gesture: GestureState,
    text: Option<TextRenderer>,
    config: EngineConfig,
    /// Bumped whenever the displayed frame may have changed.
    revision: u64,
}

impl CanvasController {
    pub fn new(config: EngineConfig) -> Self {
        let text = TextRenderer::from_egui_defaults();
        if text.is_none() {
            log_warn!("Controller: no font available, the text tool is disabled");
        }
        Self::with_text_renderer(config, text)
    }

    pub fn with_text_renderer(config: EngineConfig, text: Option<TextRenderer>) -> Self {
        let surface = PixelSurface::new(config.width, config.height, config.toolbar_height, config.background);
        log_info!(
            "Controller: {}×{} surface, toolbar {} rows, {} undo steps",
            surface.width(),
            surface.height(),
            surface.toolbar_height(),
            config.max_history
        );
        Self {
            surface,
            history: HistoryManager::new(config.max_history),
            gesture: GestureState::Idle,
            text,
            config,
            revision: 0,
        }
    }

    pub fn surface(&self) -> &PixelSurface {
        &self.surface
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, GestureState::Dragging { .. })
    }

    pub fn is_editing_text(&self) -> bool {
        matches!(self.gesture, GestureState::TextEditing { .. })
    }

    pub fn pending_text(&self) -> Option<&str> {
        match &self.gesture {
            GestureState::TextEditing { buffer, .. } => Some(buffer.as_str()),
            _ => None,
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Put the most recent undo state (the pre-gesture surface) back live.
    fn restore_latest(&mut self) {
        if let Some(snap) = self.history.latest() {
            if let Err(e) = self.surface.restore(snap) {
                log_err!("Controller: restore failed: {}", e);
            }
        }
    }

    // ---- pointer ------------------------------------------------------------

    pub fn pointer_down(&mut self, pos: Point, props: &ToolProperties) {
        if !self.surface.is_drawable(pos.0, pos.1) {
            log_warn!("Controller: pointer down at ({}, {}) outside the drawable region ignored", pos.0, pos.1);
            return;
        }
        self.finish_gesture();

        let color = props.effective_color();
        match props.tool {
            Tool::Fill => {
                self.history.snapshot(&self.surface, "Fill");
                match flood_fill(&mut self.surface, pos, color) {
                    Ok(FillOutcome::Filled { pixels, bounds }) => {
                        log_info!("Fill: {} pixels in {:?}", pixels, bounds);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log_warn!("Fill: {}", e);
                    }
                }
            }
            Tool::Text => {
                self.history.snapshot(&self.surface, "Text");
                self.gesture = GestureState::TextEditing {
                    anchor: pos,
                    buffer: String::new(),
                    color,
                    preview_color: props.preview_text_color(),
                    font_size: canvas_font_size(props.size),
                };
            }
            tool => {
                self.history.snapshot(&self.surface, tool.label());
                let thickness = if tool.shape_kind().is_some() { props.shape_thickness() } else { props.size };
                self.gesture = GestureState::Dragging { tool, anchor: pos, previous: pos, color, thickness };
            }
        }
        self.touch();
    }

    pub fn pointer_move(&mut self, pos: Point) {
        let GestureState::Dragging { tool, anchor, previous, color, thickness } = &mut self.gesture else {
            return;
        };
        let (tool, anchor, from, color, thickness) = (*tool, *anchor, *previous, *color, *thickness);
        *previous = pos;

        match tool.shape_kind() {
            Some(kind) => {
                // Zero-area drags leave the restored pre-gesture state on screen
                self.restore_latest();
                preview_shape(kind, &mut self.surface, anchor, pos, thickness, color);
            }
            None => {
                stamp_line(&mut self.surface, from, pos, thickness, color);
            }
        }
        self.touch();
    }

    pub fn pointer_up(&mut self, _pos: Point) {
        if self.is_dragging() {
            self.gesture = GestureState::Idle;
        }
    }

    // ---- keyboard -------------------------------------------------------------

    /// Text entry while editing; otherwise the canvas hotkeys (`c` clears,
    /// `+`/`=` and `-` resize the brush).
    pub fn key_input(&mut self, key: KeyInput, props: &mut ToolProperties) {
        if let GestureState::TextEditing { buffer, .. } = &mut self.gesture {
            match key {
                KeyInput::Char(c) if !c.is_control() => buffer.push(c),
                KeyInput::Char(_) => return,
                KeyInput::Backspace => {
                    buffer.pop();
                }
                KeyInput::Enter => {
                    self.commit_text();
                    return;
                }
                KeyInput::Escape => {
                    self.cancel_text();
                    return;
                }
            }
            self.touch();
            return;
        }

        match key {
            KeyInput::Char('c') | KeyInput::Char('C') => self.clear(),
            KeyInput::Char('+') | KeyInput::Char('=') => props.grow(),
            KeyInput::Char('-') => props.shrink(),
            _ => {}
        }
    }

    /// Stamp the pending text (if any) and leave text editing.
    pub fn commit_text(&mut self) {
        let gesture = std::mem::replace(&mut self.gesture, GestureState::Idle);
        let GestureState::TextEditing { anchor, buffer, color, font_size, .. } = gesture else {
            self.gesture = gesture;
            return;
        };

        self.restore_latest();
        if !buffer.trim().is_empty() {
            self.history.snapshot(&self.surface, "Text");
            match &self.text {
                Some(renderer) => {
                    renderer.stamp(&mut self.surface, &buffer, anchor, font_size, color);
                    log_info!("Text: committed {} chars at ({}, {})", buffer.chars().count(), anchor.0, anchor.1);
                }
                None => {
                    log_warn!("Text: no font loaded, '{}' dropped", buffer);
                }
            }
        }
        self.touch();
    }

    /// Discard the pending text and restore the pre-edit surface.
    pub fn cancel_text(&mut self) {
        if !self.is_editing_text() {
            return;
        }
        self.gesture = GestureState::Idle;
        self.restore_latest();
        self.touch();
    }

    /// End whatever gesture is in flight: pending text is committed, a drag
    /// keeps what it has drawn.
    pub fn finish_gesture(&mut self) {
        match self.gesture {
            GestureState::TextEditing { .. } => self.commit_text(),
            GestureState::Dragging { .. } => self.gesture = GestureState::Idle,
            GestureState::Idle => {}
        }
    }

    // ---- history and whole-canvas actions -----------------------------------

    pub fn undo(&mut self) -> bool {
        self.finish_gesture();
        let Some(snap) = self.history.undo(&self.surface) else {
            return false;
        };
        if let Err(e) = self.surface.restore(&snap) {
            log_err!("Undo: {}", e);
            return false;
        }
        self.touch();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.finish_gesture();
        let Some(snap) = self.history.redo(&self.surface) else {
            return false;
        };
        if let Err(e) = self.surface.restore(&snap) {
            log_err!("Redo: {}", e);
            return false;
        }
        self.touch();
        true
    }

    /// Snapshot, then paint the drawable region with the background colour.
    pub fn clear(&mut self) {
        self.finish_gesture();
        self.history.snapshot(&self.surface, "Clear");
        let region = self.surface.drawable_rect();
        self.surface.fill_rect(region, self.config.background);
        self.touch();
    }

    // ---- display ----------------------------------------------------------------

    /// The frame to display. While editing text this is the live surface with
    /// the text box, pending text and caret composed on a copy; the live
    /// surface itself never holds half-typed text.
    pub fn render_frame(&self, caret_visible: bool) -> Cow<'_, PixelSurface> {
        match (&self.gesture, &self.text) {
            (GestureState::TextEditing { anchor, buffer, preview_color, font_size, .. }, Some(renderer)) => {
                let mut frame = self.surface.clone();
                draw_text_preview(&mut frame, renderer, *anchor, buffer, *font_size, *preview_color, caret_visible);
                Cow::Owned(frame)
            }
            _ => Cow::Borrowed(&self.surface),
        }
    }
}

/// Caret blink phase: visible during even periods of `blink_ms`.
pub fn caret_visible(millis: u64, blink_ms: u64) -> bool {
    (millis / blink_ms.max(1)) % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{BLACK, BLUE, RED};
    use crate::ops::shapes::ShapeFillMode;

    fn config() -> EngineConfig {
        EngineConfig { width: 120, height: 100, toolbar_height: 20, max_history: 50, background: WHITE }
    }

    fn controller() -> CanvasController {
        CanvasController::new(config())
    }

    fn props(tool: Tool) -> ToolProperties {
        ToolProperties { tool, color: BLACK, size: 2, ..ToolProperties::default() }
    }

    fn count(s: &PixelSurface, color: Color) -> usize {
        s.as_raw().chunks_exact(4).filter(|p| *p == color.0).count()
    }

    #[test]
    fn brush_drag_paints_incrementally() {
        let mut c = controller();
        let p = props(Tool::Brush);
        c.pointer_down((10, 40), &p);
        assert!(c.is_dragging());
        assert_eq!(count(c.surface(), BLACK), 0);
        c.pointer_move((30, 40));
        let after_first = count(c.surface(), BLACK);
        c.pointer_move((30, 70));
        assert!(count(c.surface(), BLACK) > after_first);
        assert_eq!(c.surface().get_pixel(10, 40).unwrap(), BLACK);
        c.pointer_up((30, 70));
        assert!(!c.is_dragging());
        assert_eq!(c.history().undo_count(), 1);
    }

    #[test]
    fn malformed_sequences_are_no_ops() {
        let mut c = controller();
        let before = c.surface().snapshot();
        c.pointer_move((50, 50));
        c.pointer_up((50, 50));
        c.cancel_text();
        c.commit_text();
        assert!(!c.undo());
        assert!(!c.redo());
        assert!(c.surface().matches(&before));
        assert_eq!(c.history().undo_count(), 0);
    }

    #[test]
    fn pointer_down_in_toolbar_is_ignored() {
        let mut c = controller();
        c.pointer_down((10, 5), &props(Tool::Fill));
        c.pointer_down((10, 5), &props(Tool::Brush));
        assert!(!c.is_dragging());
        assert_eq!(c.history().undo_count(), 0);
    }

    #[test]
    fn shape_preview_never_accumulates() {
        let mut c = controller();
        let p = props(Tool::Rectangle);
        c.pointer_down((10, 30), &p);
        c.pointer_move((100, 90));
        c.pointer_move((30, 50));
        c.pointer_up((30, 50));

        // Only the final 20×20 rectangle remains
        assert_eq!(c.surface().get_pixel(99, 89).unwrap(), WHITE);
        assert_eq!(c.surface().get_pixel(10, 30).unwrap(), BLACK);
        assert_eq!(c.surface().get_pixel(29, 49).unwrap(), BLACK);
        assert_eq!(count(c.surface(), BLACK), 20 * 20 - 16 * 16);
    }

    #[test]
    fn shape_drag_back_to_anchor_restores_the_surface() {
        let mut c = controller();
        let p = props(Tool::Triangle);
        let before = c.surface().snapshot();
        c.pointer_down((40, 40), &p);
        c.pointer_move((80, 80));
        c.pointer_move((40, 60));
        assert!(c.surface().matches(&before));
    }

    #[test]
    fn filled_shapes_use_thickness_zero() {
        let mut c = controller();
        let mut p = props(Tool::Rectangle);
        p.shape_fill = ShapeFillMode::Filled;
        c.pointer_down((10, 30), &p);
        c.pointer_move((20, 40));
        assert_eq!(count(c.surface(), BLACK), 100);
    }

    #[test]
    fn fill_is_a_single_undo_step() {
        let mut c = controller();
        let mut p = props(Tool::Fill);
        p.color = RED;
        c.pointer_down((60, 60), &p);
        assert!(!c.is_dragging());
        assert_eq!(count(c.surface(), RED), 120 * 80);
        assert!(c.undo());
        assert_eq!(count(c.surface(), RED), 0);
        assert!(c.redo());
        assert_eq!(count(c.surface(), RED), 120 * 80);
    }

    #[test]
    fn eraser_paints_background() {
        let mut c = controller();
        let mut p = props(Tool::Fill);
        p.color = BLUE;
        c.pointer_down((60, 60), &p);
        p.select_color(WHITE);
        p.tool = Tool::Brush;
        c.pointer_down((60, 60), &p);
        c.pointer_move((61, 60));
        assert_eq!(c.surface().get_pixel(60, 60).unwrap(), WHITE);
    }

    #[test]
    fn new_gesture_clears_redo() {
        let mut c = controller();
        let p = props(Tool::Brush);
        c.pointer_down((30, 30), &p);
        c.pointer_move((40, 40));
        c.pointer_up((40, 40));
        assert!(c.undo());
        assert!(c.history().can_redo());
        c.pointer_down((50, 50), &p);
        assert!(!c.history().can_redo());
    }

    #[test]
    fn typing_never_touches_the_live_surface() {
        let mut c = controller();
        let mut p = props(Tool::Text);
        let before = c.surface().snapshot();
        c.pointer_down((20, 40), &p);
        for ch in "Hi".chars() {
            c.key_input(KeyInput::Char(ch), &mut p);
        }
        c.key_input(KeyInput::Char('\u{7}'), &mut p);
        assert_eq!(c.pending_text(), Some("Hi"));
        assert!(c.surface().matches(&before));

        let frame = c.render_frame(true);
        assert!(!frame.matches(&before));
    }

    #[test]
    fn enter_commits_and_escape_cancels() {
        let mut c = controller();
        let mut p = props(Tool::Text);
        let blank = c.surface().snapshot();

        c.pointer_down((20, 40), &p);
        c.key_input(KeyInput::Char('A'), &mut p);
        c.key_input(KeyInput::Escape, &mut p);
        assert!(!c.is_editing_text());
        assert!(c.surface().matches(&blank));

        c.pointer_down((20, 40), &p);
        c.key_input(KeyInput::Char('A'), &mut p);
        c.key_input(KeyInput::Char('B'), &mut p);
        c.key_input(KeyInput::Backspace, &mut p);
        c.key_input(KeyInput::Enter, &mut p);
        assert!(!c.is_editing_text());
        assert!(!c.surface().matches(&blank));

        assert!(c.undo());
        assert!(c.surface().matches(&blank));
    }

    #[test]
    fn blank_text_commits_nothing() {
        let mut c = controller();
        let mut p = props(Tool::Text);
        let blank = c.surface().snapshot();
        c.pointer_down((20, 40), &p);
        c.key_input(KeyInput::Char(' '), &mut p);
        c.key_input(KeyInput::Enter, &mut p);
        assert!(c.surface().matches(&blank));
        assert_eq!(c.history().undo_count(), 1);
    }

    #[test]
    fn commit_without_a_font_leaves_pixels_alone() {
        let mut c = CanvasController::with_text_renderer(config(), None);
        let mut p = props(Tool::Text);
        let blank = c.surface().snapshot();
        c.pointer_down((20, 40), &p);
        c.key_input(KeyInput::Char('Q'), &mut p);
        c.key_input(KeyInput::Enter, &mut p);
        assert!(!c.is_editing_text());
        assert!(c.surface().matches(&blank));
        assert_eq!(c.history().undo_count(), 2);
    }

    #[test]
    fn new_gesture_commits_pending_text() {
        let mut c = controller();
        let mut p = props(Tool::Text);
        let blank = c.surface().snapshot();
        c.pointer_down((20, 40), &p);
        c.key_input(KeyInput::Char('X'), &mut p);
        p.select_tool(Tool::Brush);
        c.pointer_down((100, 90), &p);
        assert!(c.is_dragging());
        assert!(!c.surface().matches(&blank));
        assert_eq!(c.history().undo_count(), 3);
    }

    #[test]
    fn hotkeys_apply_only_when_not_typing() {
        let mut c = controller();
        let mut p = props(Tool::Fill);
        p.color = RED;
        c.pointer_down((60, 60), &p);
        c.key_input(KeyInput::Char('+'), &mut p);
        assert_eq!(p.size, 3);
        c.key_input(KeyInput::Char('-'), &mut p);
        c.key_input(KeyInput::Char('-'), &mut p);
        assert_eq!(p.size, 1);

        c.key_input(KeyInput::Char('c'), &mut p);
        assert_eq!(count(c.surface(), RED), 0);

        p.select_tool(Tool::Text);
        c.pointer_down((20, 40), &p);
        c.key_input(KeyInput::Char('c'), &mut p);
        assert_eq!(c.pending_text(), Some("c"));
    }

    #[test]
    fn clear_is_undoable() {
        let mut c = controller();
        let mut p = props(Tool::Fill);
        p.color = RED;
        c.pointer_down((60, 60), &p);
        c.clear();
        assert_eq!(count(c.surface(), RED), 0);
        assert!(c.undo());
        assert_eq!(count(c.surface(), RED), 120 * 80);
    }

    #[test]
    fn revision_tracks_visible_changes() {
        let mut c = controller();
        let r0 = c.revision();
        c.pointer_move((1, 1));
        assert_eq!(c.revision(), r0);
        c.pointer_down((30, 30), &props(Tool::Brush));
        assert!(c.revision() > r0);
    }

    #[test]
    fn caret_blinks_on_even_periods() {
        assert!(caret_visible(0, 400));
        assert!(caret_visible(399, 400));
        assert!(!caret_visible(400, 400));
        assert!(caret_visible(800, 400));
        // A zero period is clamped to 1 ms
        assert!(caret_visible(4, 0));
        assert!(!caret_visible(5, 0));
    }

    #[test]
    fn config_follows_settings() {
        let s = AppSettings { canvas_width: 300, max_undo_steps: 7, ..AppSettings::default() };
        let cfg = EngineConfig::from(&s);
        assert_eq!(cfg.width, 300);
        assert_eq!(cfg.max_history, 7);
        assert_eq!(cfg.toolbar_height, 160);
    }
}
