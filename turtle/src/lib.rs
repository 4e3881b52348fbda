//! A small Logo-style turtle language: parser, sandboxed executor, SVG
//! output and a pixel rasterizer used to compare drawings.
//!
//! Submissions and model solutions are written in this dialect
//! (`fd 100 rt 90`, `repeat 4 [ ... ]`, `to name :arg ... end`). Python
//! `turtle` programs are not accepted; they fail to parse like any other
//! foreign source. The grader shows scripts with the plain `code`
//! description format for the same reason.
//!
//! Untrusted scripts cannot exhaust the judge: parsing stops at a fixed
//! nesting depth, and [`Limits`] bounds steps, time, strokes, output,
//! call depth and the work needed to rasterize the drawing.

pub mod drawing;
pub mod environment;
pub mod error;
pub mod executor;
pub mod parser;
pub mod program;
pub mod raster;

pub use drawing::{Canvas, Color, Drawing, Point, Stroke};
pub use environment::Value;
pub use error::{ErrorClass, RunError, RuntimeError};
pub use executor::{Limits, Run, execute};
pub use parser::{ParseError, Parser, line_column};
pub use program::Program;
pub use raster::{Raster, RasterError};
