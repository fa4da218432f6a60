use serde::{Deserialize, Serialize};

/// One square of the board.
///
/// `pressed` is purely visual: it marks cells drawn sunken while the pointer is held down.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub open: bool,
    pub flagged: bool,
    pub bomb: bool,
    pub pressed: bool,
    pub adjacent_bombs: u8,
}

impl Cell {
    /// Closed and not flagged, so a reveal would open it.
    pub const fn is_revealable(self) -> bool {
        !self.open && !self.flagged
    }
}
