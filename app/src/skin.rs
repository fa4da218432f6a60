//! The bundled classic skin: sprite layout, game scene and the frame numbering inside them.

use pixmines_core::{Cell, Coord2, GameState};
use pixmines_stage::{Movie, Params, SpriteSheet, StageError};

pub const LAYOUT: &str = include_str!("../assets/sprites.json");
pub const SCENES: &str = include_str!("../assets/scenes.json");

/// Smallest skin image that holds every region of [`LAYOUT`].
pub const SHEET_SIZE: (u32, u32) = (144, 122);

pub const SCENE: &str = "game";
pub const LAYER: &str = "fg";
pub const BUTTON: &str = "button";
pub const BOMBS: &str = "bombs";
pub const TIME: &str = "time";
pub const ICONS: &str = "icons";

/// Digit frame showing a minus sign.
pub const MINUS_DIGIT: usize = 10;

/// Cell pictures, in the order of the `icons` sprite frames.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Icon {
    /// Open cell with this many neighboring bombs; 0 is the blank open cell.
    Number(u8),
    Closed,
    Bomb,
    Marked,
    AnswerNoBomb,
    AnswerIsBomb,
}

impl Icon {
    pub const fn frame(self) -> usize {
        match self {
            Self::Number(n) => n as usize,
            Self::Closed => 9,
            Self::Bomb => 11,
            Self::Marked => 12,
            Self::AnswerNoBomb => 13,
            Self::AnswerIsBomb => 14,
        }
    }

    /// Picture for `cell`. Once the game is over, bombs and wrong flags are uncovered.
    pub fn for_cell(cell: Cell, state: GameState) -> Self {
        if state.is_finished() {
            return match (cell.open, cell.flagged, cell.bomb) {
                (true, _, true) => Self::AnswerIsBomb,
                (true, _, false) => Self::Number(cell.adjacent_bombs),
                (false, true, true) => Self::Marked,
                (false, true, false) => Self::AnswerNoBomb,
                (false, false, true) if state == GameState::Won => Self::Marked,
                (false, false, true) => Self::Bomb,
                (false, false, false) => Self::Closed,
            };
        }

        if cell.open {
            Self::Number(cell.adjacent_bombs)
        } else if cell.flagged {
            Self::Marked
        } else if cell.pressed {
            Self::Number(0)
        } else {
            Self::Closed
        }
    }
}

/// Screen size of the game scene for a board of `size` cells.
pub fn screen_size((width, height): Coord2, scale: u32) -> (u32, u32) {
    (
        (width as u32 * 16 + 24) * scale,
        (height as u32 * 16 + 66) * scale,
    )
}

pub fn scene_params((width, height): Coord2, scale: u32) -> Params {
    Params::new()
        .with("w", width.into())
        .with("h", height.into())
        .with("s", scale.into())
}

/// Builds the presentation for a board of `size` cells from `scenes`.
pub fn build_movie(
    sheet: &SpriteSheet,
    scenes: &str,
    size: Coord2,
    scale: u32,
) -> Result<Movie, StageError> {
    let mut movie = Movie::from_json(sheet, scenes, &scene_params(size, scale))?;
    let (width, height) = screen_size(size, scale);
    movie.set_size(width, height);
    Ok(movie)
}

/// Frames for a three digit counter, most significant first.
///
/// Values are clamped to `-99..=999`; negative values put a minus sign in front.
pub fn counter_frames(value: i32) -> [usize; 3] {
    let value = value.clamp(-99, 999);
    let mut rest = value.unsigned_abs() as usize;
    let mut frames = [0; 3];
    for frame in frames.iter_mut().rev() {
        *frame = rest % 10;
        rest /= 10;
    }
    if value < 0 {
        frames[0] = MINUS_DIGIT;
    }
    frames
}
