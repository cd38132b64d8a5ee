//! Pixel-art drawing surface: layered multi-frame raster documents, the
//! tools that paint into them, and the gesture classifier that turns raw
//! pointer streams into drawing, panning, pinch zoom, brush resizing and
//! color picking.
//!
//! Every pixel change is reported as a [`PixelEdit`] and batched by the
//! [`ChangeTracker`](components::history::ChangeTracker), which feeds local
//! history and an optional collaboration sink.
#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod canvas;
pub mod components;
pub mod config;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod playback;
pub mod project;
pub mod viewport;

pub use app::Editor;
pub use canvas::{Frame, Layer, LayerAddress, LayerId, LayerTarget, PixelColor, PixelEdit};
pub use components::gestures::{GestureMode, PointerButton, PointerDevice, PointerEvent, PointerTarget};
pub use components::history::{ChangeBatch, ChangeTracker, CollabSink, EditOrigin, HistorySink, UndoStack};
pub use components::tools::{DrawingContext, Tool};
pub use config::EditorConfig;
pub use error::{Result, SurfaceError};
pub use ops::raster::Direction;
pub use project::Project;
pub use viewport::{OverlayLayout, Viewport};
