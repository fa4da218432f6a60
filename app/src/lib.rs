//! Classic minesweeper on top of the `pixmines-stage` sprite compositor.
//!
//! [`GameView`] binds the bundled [`skin`] scene to a [`GameSession`]; [`GameLoop`] feeds it
//! pointer and timer events from any thread.

pub use event_loop::*;
pub use export::*;
pub use moves::*;
pub use session::*;
pub use settings::*;
pub use view::*;

pub mod skin;

mod event_loop;
mod export;
mod moves;
mod session;
mod settings;
mod view;
