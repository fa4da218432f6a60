#![no_std]

extern crate alloc;

use serde::{Deserialize, Serialize};

pub use engine::*;
pub use error::*;
pub use generator::*;
pub use tile::*;
pub use types::*;

mod engine;
mod error;
mod generator;
mod tile;
mod types;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub size: Coord2,
    pub bombs: CellCount,
}

impl GameConfig {
    pub const fn new_unchecked(size: Coord2, bombs: CellCount) -> Self {
        Self { size, bombs }
    }

    /// Clamps the size to at least 1x1 and the bomb count so that at least one cell stays safe.
    pub fn new((size_x, size_y): Coord2, bombs: CellCount) -> Self {
        let size_x = size_x.max(1);
        let size_y = size_y.max(1);
        let bombs = bombs.min(mult(size_x, size_y) - 1);
        Self::new_unchecked((size_x, size_y), bombs)
    }

    pub fn try_new(size: Coord2, bombs: CellCount) -> Result<Self> {
        if size.0 == 0 || size.1 == 0 {
            return Err(GameError::EmptyBoard);
        }
        if bombs >= mult(size.0, size.1) {
            return Err(GameError::TooManyBombs);
        }
        Ok(Self::new_unchecked(size, bombs))
    }

    pub const fn beginner() -> Self {
        Self::new_unchecked((9, 9), 10)
    }

    pub const fn intermediate() -> Self {
        Self::new_unchecked((16, 16), 40)
    }

    pub const fn expert() -> Self {
        Self::new_unchecked((30, 16), 99)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size.0, self.size.1)
    }

    pub const fn safe_cells(&self) -> CellCount {
        self.total_cells() - self.bombs
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if coords.0 < self.size.0 && coords.1 < self.size.1 {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_classic_boards() {
        assert_eq!(GameConfig::beginner().total_cells(), 81);
        assert_eq!(GameConfig::intermediate().bombs, 40);
        assert_eq!(GameConfig::expert().size, (30, 16));
        assert_eq!(GameConfig::expert().safe_cells(), 381);
    }

    #[test]
    fn new_keeps_one_safe_cell() {
        let config = GameConfig::new((2, 2), 50);
        assert_eq!(config.bombs, 3);

        let config = GameConfig::new((0, 0), 1);
        assert_eq!(config.size, (1, 1));
        assert_eq!(config.bombs, 0);
    }

    #[test]
    fn try_new_rejects_full_boards() {
        assert_eq!(GameConfig::try_new((3, 3), 9), Err(GameError::TooManyBombs));
        assert_eq!(GameConfig::try_new((0, 3), 1), Err(GameError::EmptyBoard));
        assert!(GameConfig::try_new((3, 3), 8).is_ok());
    }

    #[test]
    fn validate_coords_rejects_out_of_range() {
        let config = GameConfig::beginner();
        assert_eq!(config.validate_coords((8, 8)), Ok((8, 8)));
        assert_eq!(config.validate_coords((9, 0)), Err(GameError::InvalidCoords));
    }
}
