use chrono::prelude::*;
use pixmines_core::{Board, Coord2, GameConfig, GameState, MarkOutcome, RevealOutcome};

/// One round of play: the board plus the wall-clock bookkeeping for the timer display.
#[derive(Clone, Debug)]
pub struct GameSession {
    board: Board,
    seed: u64,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl GameSession {
    pub fn new(config: GameConfig, seed: u64) -> Self {
        Self::with_board(Board::new(config, seed), seed)
    }

    pub fn with_board(board: Board, seed: u64) -> Self {
        Self {
            board,
            seed,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> GameState {
        self.board.state()
    }

    /// Fresh board with the same configuration.
    pub fn restart(&mut self, seed: u64) {
        log::debug!("Restarting with seed {}", seed);
        *self = Self::new(self.board.config(), seed);
    }

    pub fn reveal(&mut self, coords: Coord2, now: DateTime<Utc>) -> RevealOutcome {
        let outcome = self.board.reveal(coords);
        self.on_move(now);
        outcome
    }

    pub fn chord_reveal(&mut self, coords: Coord2, now: DateTime<Utc>) -> RevealOutcome {
        let outcome = self.board.chord_reveal(coords);
        self.on_move(now);
        outcome
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> MarkOutcome {
        self.board.toggle_flag(coords)
    }

    /// Right click or long press: chord an open cell, flag a closed one.
    pub fn alternate(&mut self, coords: Coord2, now: DateTime<Utc>) -> bool {
        if self.board.cell_at(coords).open {
            self.chord_reveal(coords, now).has_update()
        } else {
            self.toggle_flag(coords).has_update()
        }
    }

    /// Left button let go over a cell: open it, or chord it when it is open already.
    pub fn primary(&mut self, coords: Coord2, now: DateTime<Utc>) -> bool {
        if self.board.cell_at(coords).open {
            self.chord_reveal(coords, now).has_update()
        } else {
            self.reveal(coords, now).has_update()
        }
    }

    pub fn press(&mut self, coords: Coord2) {
        self.board.press(coords);
    }

    pub fn release_press(&mut self) {
        self.board.release_press();
    }

    pub fn press_button(&mut self) {
        self.board.press_button();
    }

    fn on_move(&mut self, now: DateTime<Utc>) {
        let state = self.board.state();
        if self.started_at.is_none() && !state.is_waiting() {
            self.started_at = Some(now);
        }
        if self.ended_at.is_none() && state.is_finished() {
            self.ended_at = Some(now);
            log::debug!("Game over: {:?} after {}s", state, self.elapsed_secs(now));
        }
    }

    /// Whole seconds played, frozen once the game is over.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u32 {
        if let Some(started_at) = self.started_at {
            (self.ended_at.unwrap_or(now) - started_at)
                .num_seconds()
                .max(0) as u32
        } else {
            0
        }
    }
}
