//! Gesture scripts: a line-oriented record of pointer, key and history
//! events that can be replayed against a [`CanvasController`] without a window.
//!
//! ```text
//! # red rectangle, then fill its inside
//! tool rect
//! color 255 0 0
//! down 100 200
//! move 300 400
//! up 300 400
//! tool fill
//! down 150 250
//! ```

use std::fmt;

use image::Rgba;

use crate::canvas::Point;
use crate::components::tools::{Tool, ToolProperties};
use crate::controller::{CanvasController, KeyInput};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// 1-based source line.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Tool(Tool),
    Color([u8; 3]),
    Eraser,
    Size(u32),
    Down(Point),
    Move(Point),
    Up(Point),
    Type(String),
    Key(KeyInput),
    Undo,
    Redo,
    Clear,
}

fn err(line: usize, message: impl Into<String>) -> ScriptError {
    ScriptError { line, message: message.into() }
}

fn parse_point(line: usize, args: &[&str]) -> Result<Point, ScriptError> {
    let [x, y] = args else {
        return Err(err(line, "expected two coordinates"));
    };
    let x = x.parse().map_err(|_| err(line, format!("bad x coordinate '{}'", x)))?;
    let y = y.parse().map_err(|_| err(line, format!("bad y coordinate '{}'", y)))?;
    Ok((x, y))
}

fn parse_line(line: usize, text: &str) -> Result<Option<Command>, ScriptError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let args: Vec<&str> = rest.split_whitespace().collect();

    let cmd = match word.to_ascii_lowercase().as_str() {
        "tool" => {
            let name = args.first().ok_or_else(|| err(line, "missing tool name"))?;
            Command::Tool(Tool::parse(name).ok_or_else(|| err(line, format!("unknown tool '{}'", name)))?)
        }
        "color" | "colour" => {
            let [r, g, b] = args.as_slice() else {
                return Err(err(line, "expected R G B"));
            };
            let channel = |v: &str| v.parse::<u8>().map_err(|_| err(line, format!("bad colour channel '{}'", v)));
            Command::Color([channel(*r)?, channel(*g)?, channel(*b)?])
        }
        "eraser" => Command::Eraser,
        "size" => {
            let v = args.first().ok_or_else(|| err(line, "missing size"))?;
            Command::Size(v.parse().map_err(|_| err(line, format!("bad size '{}'", v)))?)
        }
        "down" => Command::Down(parse_point(line, &args)?),
        "move" => Command::Move(parse_point(line, &args)?),
        "up" => Command::Up(parse_point(line, &args)?),
        // The rest of the line verbatim, inner spaces included
        "type" => Command::Type(rest.trim_start().to_string()),
        "key" => {
            let name = args.first().ok_or_else(|| err(line, "missing key name"))?;
            Command::Key(match name.to_ascii_lowercase().as_str() {
                "enter" | "return" => KeyInput::Enter,
                "backspace" => KeyInput::Backspace,
                "escape" | "esc" => KeyInput::Escape,
                other => {
                    let mut chars = other.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => KeyInput::Char(c),
                        _ => return Err(err(line, format!("unknown key '{}'", name))),
                    }
                }
            })
        }
        "undo" => Command::Undo,
        "redo" => Command::Redo,
        "clear" => Command::Clear,
        other => return Err(err(line, format!("unknown command '{}'", other))),
    };
    Ok(Some(cmd))
}

/// Parse a whole script, stopping at the first bad line.
pub fn parse_script(source: &str) -> Result<Vec<Command>, ScriptError> {
    let mut commands = Vec::new();
    for (i, text) in source.lines().enumerate() {
        if let Some(cmd) = parse_line(i + 1, text)? {
            commands.push(cmd);
        }
    }
    Ok(commands)
}

/// Feed commands to `controller`, updating `props` as the toolbar would.
/// Pending text is committed at the end so the result can be exported.
pub fn run_commands(controller: &mut CanvasController, props: &mut ToolProperties, commands: &[Command]) {
    for cmd in commands {
        match cmd {
            Command::Tool(tool) => {
                controller.finish_gesture();
                props.select_tool(*tool);
            }
            Command::Color([r, g, b]) => props.select_color(Rgba([*r, *g, *b, 255])),
            Command::Eraser => props.eraser = true,
            Command::Size(n) => props.set_size(*n),
            Command::Down(p) => controller.pointer_down(*p, props),
            Command::Move(p) => controller.pointer_move(*p),
            Command::Up(p) => controller.pointer_up(*p),
            Command::Type(text) => {
                for c in text.chars() {
                    controller.key_input(KeyInput::Char(c), props);
                }
            }
            Command::Key(key) => controller.key_input(*key, props),
            Command::Undo => {
                controller.undo();
            }
            Command::Redo => {
                controller.redo();
            }
            Command::Clear => controller.clear(),
        }
    }
    controller.finish_gesture();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{RED, WHITE};
    use crate::controller::EngineConfig;

    #[test]
    fn parses_every_command() {
        let src = "\
# comment
tool rect
color 255 0 0
eraser
size 12

down 10 20
move -5 30
up 40 50
type hello world
key enter
key c
undo
redo
clear";
        let cmds = parse_script(src).unwrap();
        assert_eq!(
            cmds,
            vec![
                Command::Tool(Tool::Rectangle),
                Command::Color([255, 0, 0]),
                Command::Eraser,
                Command::Size(12),
                Command::Down((10, 20)),
                Command::Move((-5, 30)),
                Command::Up((40, 50)),
                Command::Type("hello world".to_string()),
                Command::Key(KeyInput::Enter),
                Command::Key(KeyInput::Char('c')),
                Command::Undo,
                Command::Redo,
                Command::Clear,
            ]
        );
    }

    #[test]
    fn errors_carry_the_line_number() {
        let e = parse_script("tool brush\n\ncolor 300 0 0").unwrap_err();
        assert_eq!(e.line, 3);
        assert!(e.message.contains("300"));

        assert_eq!(parse_script("down 1").unwrap_err().line, 1);
        assert_eq!(parse_script("tool lasso").unwrap_err().line, 1);
        assert_eq!(parse_script("spin 3").unwrap_err().to_string(), "line 1: unknown command 'spin'");
    }

    #[test]
    fn replay_drives_the_controller() {
        let cfg = EngineConfig { width: 60, height: 50, toolbar_height: 10, max_history: 50, background: WHITE };
        let mut c = CanvasController::with_text_renderer(cfg, None);
        let mut props = ToolProperties::default();
        let cmds = parse_script("tool fill\ncolor 255 0 0\ndown 5 20\nundo\nredo").unwrap();
        run_commands(&mut c, &mut props, &cmds);
        assert_eq!(c.surface().get_pixel(59, 49).unwrap(), RED);
        assert_eq!(c.surface().get_pixel(0, 0).unwrap(), WHITE);
        assert_eq!(c.history().undo_count(), 1);
    }
}
