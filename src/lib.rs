#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;
pub mod app;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod controller;
pub mod io;
pub mod ops;
pub mod script;
pub mod settings;

pub use canvas::{CanvasError, Color, PixelRect, PixelSurface, Point, Snapshot};
pub use components::history::HistoryManager;
pub use components::tools::{Tool, ToolProperties};
pub use controller::{CanvasController, EngineConfig, GestureState, KeyInput};
