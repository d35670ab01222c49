//! Raster paint engine for coloring-book pages.
//!
//! A [`PaintSession`] owns one RGBA canvas and turns pointer events into
//! brush strokes, sticker stamps and region fills, recording a snapshot
//! history that supports undo and redo. Canvases persist through a
//! [`io::BlobStore`].

pub mod canvas;
pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod session;

pub use canvas::{PaintColor, PixelBuffer, RegionMask};
pub use components::tools::DrawMode;
pub use config::SessionConfig;
pub use error::{PaintError, PaintResult};
pub use session::{PaintSession, PointerEvent, PointerPhase};
