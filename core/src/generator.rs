use rand::prelude::*;

use crate::*;

/// Source of candidate bomb positions.
///
/// Implementations must return coordinates inside `size`. The board keeps asking until it has
/// collected enough distinct cells, so a picker that never produces a free cell will stall
/// placement.
pub trait BombPicker {
    fn pick(&mut self, size: Coord2) -> Coord2;
}

impl<F> BombPicker for F
where
    F: FnMut(Coord2) -> Coord2,
{
    fn pick(&mut self, size: Coord2) -> Coord2 {
        self(size)
    }
}

/// Uniform picker backed by a seeded small RNG.
#[derive(Clone, Debug)]
pub struct RandomPicker {
    rng: SmallRng,
}

impl RandomPicker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl BombPicker for RandomPicker {
    fn pick(&mut self, (size_x, size_y): Coord2) -> Coord2 {
        (
            self.rng.random_range(0..size_x),
            self.rng.random_range(0..size_y),
        )
    }
}
