use alloc::vec;
use core::ops::BitOr;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Valid transitions:
/// - Waiting -> Playing (first reveal)
/// - Playing -> Won
/// - Playing -> Lost
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Waiting,
    Playing,
    Won,
    Lost,
}

impl GameState {
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::Waiting)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Face shown on the restart button. The discriminant is the sprite frame index.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonFace {
    #[default]
    Playing = 0,
    Evaluating = 1,
    Lost = 2,
    Won = 3,
    Pressed = 4,
}

impl ButtonFace {
    pub const fn frame(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitBomb,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            HitBomb => true,
            Won => true,
        }
    }
}

/// Used to merge outcomes when a chord opens several cells
impl BitOr for RevealOutcome {
    type Output = RevealOutcome;

    fn bitor(self, rhs: Self) -> Self::Output {
        use RevealOutcome::*;
        match (self, rhs) {
            (HitBomb, _) => HitBomb,
            (_, HitBomb) => HitBomb,
            (Won, _) => Won,
            (_, Won) => Won,
            (Revealed, _) => Revealed,
            (_, Revealed) => Revealed,
            (NoChange, NoChange) => NoChange,
        }
    }
}

/// The minesweeper state machine.
///
/// Bombs are placed lazily on the first reveal so that the revealed cell is never a bomb.
/// Coordinates outside the board are a caller bug and panic on indexing.
#[derive(Clone, Debug)]
pub struct Board<P = RandomPicker> {
    config: GameConfig,
    cells: Array2<Cell>,
    picker: P,
    bombs_placed: bool,
    flags_left: i32,
    closed_count: CellCount,
    state: GameState,
    button: ButtonFace,
    triggered_bomb: Option<Coord2>,
}

impl Board<RandomPicker> {
    pub fn new(config: GameConfig, seed: u64) -> Self {
        Self::with_picker(config, RandomPicker::new(seed))
    }

    /// Builds a board whose bombs are already laid out, mostly useful for tests and replays.
    pub fn with_bombs(size: Coord2, bombs: &[Coord2]) -> Result<Self> {
        let config = GameConfig::try_new(size, 0)?;
        let mut board = Self::new(config, 0);

        for &coords in bombs {
            let coords = config.validate_coords(coords)?;
            board.set_bomb(coords);
        }

        let bomb_count = board.cells.iter().filter(|cell| cell.bomb).count() as CellCount;
        if bomb_count >= config.total_cells() {
            return Err(GameError::TooManyBombs);
        }

        board.config.bombs = bomb_count;
        board.flags_left = bomb_count.into();
        board.bombs_placed = true;
        Ok(board)
    }
}

impl<P: BombPicker> Board<P> {
    pub fn with_picker(config: GameConfig, picker: P) -> Self {
        Self {
            config,
            cells: Array2::default(config.size.to_nd_index()),
            picker,
            bombs_placed: false,
            flags_left: config.bombs.into(),
            closed_count: config.total_cells(),
            state: GameState::default(),
            button: ButtonFace::default(),
            triggered_bomb: None,
        }
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn size(&self) -> Coord2 {
        self.config.size
    }

    pub fn total_bombs(&self) -> CellCount {
        self.config.bombs
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn button_face(&self) -> ButtonFace {
        self.button
    }

    /// Remaining-bombs counter as shown to the player. Not clamped, it may go negative.
    pub fn flags_left(&self) -> i32 {
        self.flags_left
    }

    pub fn closed_count(&self) -> CellCount {
        self.closed_count
    }

    pub fn cell_at(&self, coords: Coord2) -> Cell {
        self.cells[coords.to_nd_index()]
    }

    pub fn triggered_bomb(&self) -> Option<Coord2> {
        self.triggered_bomb
    }

    pub fn neighbors(&self, coords: Coord2) -> NeighborIter {
        NeighborIter::new(coords, self.config.size)
    }

    /// Lays out `count` bombs anywhere except `safe`, updating neighbor counts as it goes.
    pub fn place_bombs(&mut self, safe: Coord2, count: CellCount) {
        let total = self.config.total_cells();
        let count = if count >= total {
            log::warn!(
                "Board too small, requested {} bombs but only {} fit",
                count,
                total - 1
            );
            total - 1
        } else {
            count
        };

        // temporarily mark the safe cell so the picker can never land on it
        self.cells[safe.to_nd_index()].bomb = true;

        let mut remaining = count;
        while remaining > 0 {
            let coords = self.picker.pick(self.config.size);
            let cell = &mut self.cells[coords.to_nd_index()];
            if cell.bomb {
                continue;
            }
            cell.bomb = true;
            remaining -= 1;
            for pos in self.neighbors(coords) {
                self.cells[pos.to_nd_index()].adjacent_bombs += 1;
            }
        }

        self.cells[safe.to_nd_index()].bomb = false;
        self.config.bombs = count;
        self.bombs_placed = true;
        log::debug!("Placed {} bombs, kept {:?} safe", count, safe);
    }

    pub fn reveal(&mut self, coords: Coord2) -> RevealOutcome {
        if self.state.is_finished() || !self.cell_at(coords).is_revealable() {
            return RevealOutcome::NoChange;
        }

        if self.state.is_waiting() {
            self.start(coords);
        }

        self.open_cell(coords)
    }

    /// Opens every unflagged neighbor of an open cell whose number is satisfied by flags.
    pub fn chord_reveal(&mut self, coords: Coord2) -> RevealOutcome {
        let cell = self.cell_at(coords);
        if self.state.is_finished() || !cell.open {
            return RevealOutcome::NoChange;
        }

        if self.count_flagged_neighbors(coords) != cell.adjacent_bombs {
            return RevealOutcome::NoChange;
        }

        self.neighbors(coords)
            .map(|pos| self.reveal(pos))
            .reduce(BitOr::bitor)
            .unwrap_or(RevealOutcome::NoChange)
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> MarkOutcome {
        if self.state.is_finished() {
            return MarkOutcome::NoChange;
        }

        let cell = &mut self.cells[coords.to_nd_index()];
        if cell.open {
            return MarkOutcome::NoChange;
        }

        cell.flagged = !cell.flagged;
        self.flags_left += if cell.flagged { -1 } else { 1 };
        MarkOutcome::Changed
    }

    /// Pointer went down on a cell: sink it, and its neighbors when it is already open.
    pub fn press(&mut self, coords: Coord2) {
        if self.state.is_finished() {
            return;
        }

        self.button = ButtonFace::Evaluating;
        if self.cell_at(coords).flagged {
            return;
        }

        let open = {
            let cell = &mut self.cells[coords.to_nd_index()];
            cell.pressed = true;
            cell.open
        };
        if open {
            for pos in self.neighbors(coords) {
                let neighbor = &mut self.cells[pos.to_nd_index()];
                if !neighbor.flagged {
                    neighbor.pressed = true;
                }
            }
        }
    }

    /// Clears every pressed mark and restores the playing face.
    pub fn release_press(&mut self) {
        if self.state.is_finished() {
            return;
        }

        self.cells.iter_mut().for_each(|cell| cell.pressed = false);
        self.button = ButtonFace::Playing;
    }

    pub fn press_button(&mut self) {
        self.button = ButtonFace::Pressed;
    }

    fn start(&mut self, coords: Coord2) {
        self.state = GameState::Playing;
        if !self.bombs_placed {
            self.place_bombs(coords, self.config.bombs);
        }
        log::debug!("Game started at {:?}", coords);
    }

    fn open_cell(&mut self, coords: Coord2) -> RevealOutcome {
        let cell = {
            let cell = &mut self.cells[coords.to_nd_index()];
            cell.open = true;
            *cell
        };
        self.closed_count -= 1;

        if cell.bomb {
            self.state = GameState::Lost;
            self.button = ButtonFace::Lost;
            self.triggered_bomb = Some(coords);
            log::debug!("Hit bomb at {:?}", coords);
            return RevealOutcome::HitBomb;
        }

        if cell.adjacent_bombs == 0 {
            self.flood_fill(coords);
        }

        if self.closed_count == self.config.bombs {
            self.state = GameState::Won;
            self.button = ButtonFace::Won;
            self.flags_left = 0;
            log::debug!("Game won");
            return RevealOutcome::Won;
        }

        RevealOutcome::Revealed
    }

    /// Opens the connected zero region around `start` plus its numbered border.
    fn flood_fill(&mut self, start: Coord2) {
        let mut to_visit = vec![start];

        while let Some(visit_coords) = to_visit.pop() {
            for pos in self.neighbors(visit_coords) {
                let cell = &mut self.cells[pos.to_nd_index()];
                if !cell.is_revealable() {
                    continue;
                }

                cell.open = true;
                self.closed_count -= 1;
                log::trace!("Flood opened cell at {:?}, bomb count: {}", pos, cell.adjacent_bombs);

                if cell.adjacent_bombs == 0 {
                    to_visit.push(pos);
                }
            }
        }
    }

    fn set_bomb(&mut self, coords: Coord2) {
        if self.cells[coords.to_nd_index()].bomb {
            return;
        }
        self.cells[coords.to_nd_index()].bomb = true;
        for pos in self.neighbors(coords) {
            self.cells[pos.to_nd_index()].adjacent_bombs += 1;
        }
    }

    fn count_flagged_neighbors(&self, coords: Coord2) -> u8 {
        self.neighbors(coords)
            .filter(|&pos| self.cells[pos.to_nd_index()].flagged)
            .count() as u8
    }
}
