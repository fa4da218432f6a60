//! Sprite-sheet compositor: slices one skin image into named regions, instantiates positioned
//! clips from a declarative scene description and composites them into a single raster.
//!
//! The tree is `Movie` → `Scene` → `Layer` → `Clip`. Everything fallible happens while building
//! it; once built, frame switching, lookup through [`ClipHandle`]s and rendering never fail.

pub use builder::*;
pub use clip::*;
pub use error::*;
pub use expr::*;
pub use input::*;
pub use layer::*;
pub use movie::*;
pub use raster::*;
pub use scene::*;
pub use sheet::*;

mod builder;
mod clip;
mod error;
mod expr;
mod input;
mod layer;
mod movie;
mod raster;
mod scene;
mod sheet;
