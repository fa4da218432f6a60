/// Single coordinate axis used for board width, height, and positions.
pub type Coord = u8;

/// Count type used for bomb counts and total-cell counts.
pub type CellCount = u16;

/// Two-dimensional coordinates `(x, y)`.
pub type Coord2 = (Coord, Coord);

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    (a as CellCount).saturating_mul(b as CellCount)
}

/// Row-major position of `coords` on a board of width `size.0`.
pub const fn linear_index(coords: Coord2, size: Coord2) -> usize {
    coords.1 as usize * size.0 as usize + coords.0 as usize
}

/// Inverse of [`linear_index`].
pub const fn from_linear_index(index: usize, size: Coord2) -> Coord2 {
    let width = size.0 as usize;
    ((index % width) as Coord, (index / width) as Coord)
}

/// Walks the up-to-8 cells around `center`, row by row, skipping the center and anything outside
/// `[0, bounds.0) x [0, bounds.1)`.
///
/// The iterator owns copies of its inputs, so it can be driven while the board it came from is
/// being mutated.
#[derive(Clone, Debug)]
pub struct NeighborIter {
    center: Coord2,
    bounds: Coord2,
    step: u8,
}

impl NeighborIter {
    pub const fn new(center: Coord2, bounds: Coord2) -> Self {
        Self {
            center,
            bounds,
            step: 0,
        }
    }
}

impl Iterator for NeighborIter {
    type Item = Coord2;

    fn next(&mut self) -> Option<Self::Item> {
        while self.step < 9 {
            let step = self.step;
            self.step += 1;

            // step 4 is the center of the 3x3 block
            if step == 4 {
                continue;
            }

            let dx = (step % 3) as i16 - 1;
            let dy = (step / 3) as i16 - 1;
            let x = self.center.0 as i16 + dx;
            let y = self.center.1 as i16 + dy;

            if x < 0 || y < 0 || x >= self.bounds.0 as i16 || y >= self.bounds.1 as i16 {
                continue;
            }

            return Some((x as Coord, y as Coord));
        }
        None
    }
}
