use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use pixmines_core::Coord2;
use pixmines_stage::PointerInput;
use thiserror::Error;

use crate::{GameView, Gesture, PointerEvent, PointerKind};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseMoveError {
    #[error("move '{0}' should look like ACTION:X,Y")]
    Syntax(String),
    #[error("unknown action '{0}', expected reveal, flag, chord or hold")]
    Action(String),
}

/// Scripted player action on one cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Move {
    Reveal(Coord2),
    Flag(Coord2),
    Chord(Coord2),
    /// Left button kept down until it counts as a long press.
    Hold(Coord2),
}

impl Move {
    pub const fn coords(self) -> Coord2 {
        match self {
            Self::Reveal(coords) | Self::Flag(coords) | Self::Chord(coords) | Self::Hold(coords) => {
                coords
            }
        }
    }

    /// The pointer gesture a player would make for this move, or `None` when the cell is off
    /// the board.
    pub fn to_events(self, view: &GameView) -> Option<[PointerEvent; 2]> {
        let pos = view.cell_center(self.coords())?;
        let input = match self {
            Self::Reveal(_) | Self::Hold(_) => PointerInput::LEFT,
            Self::Flag(_) | Self::Chord(_) => PointerInput::RIGHT,
        };
        Some([
            PointerEvent::new(PointerKind::Down, pos, input),
            PointerEvent::new(PointerKind::Up, pos, PointerInput::empty()),
        ])
    }

    /// Like [`Move::to_events`], with the button kept down for `long_press` on a hold.
    pub fn to_gesture(self, view: &GameView, long_press: Duration) -> Option<Gesture> {
        let [down, up] = self.to_events(view)?;
        let hold = match self {
            Self::Hold(_) => long_press,
            _ => Duration::ZERO,
        };
        Some(Gesture { down, up, hold })
    }
}

impl FromStr for Move {
    type Err = ParseMoveError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let syntax = || ParseMoveError::Syntax(text.to_owned());
        let (action, coords) = text.split_once(':').ok_or_else(syntax)?;
        let (x, y) = coords.split_once(',').ok_or_else(syntax)?;
        let coords = (
            x.trim().parse().map_err(|_| syntax())?,
            y.trim().parse().map_err(|_| syntax())?,
        );

        match action.trim().to_ascii_lowercase().as_str() {
            "reveal" | "r" => Ok(Self::Reveal(coords)),
            "flag" | "f" => Ok(Self::Flag(coords)),
            "chord" | "c" => Ok(Self::Chord(coords)),
            "hold" | "h" => Ok(Self::Hold(coords)),
            other => Err(ParseMoveError::Action(other.to_owned())),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Self::Reveal(_) => "reveal",
            Self::Flag(_) => "flag",
            Self::Chord(_) => "chord",
            Self::Hold(_) => "hold",
        };
        let (x, y) = self.coords();
        write!(f, "{}:{},{}", action, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameSession;
    use crate::skin::{self, tests::blank_sheet};
    use pixmines_core::Board;

    #[test]
    fn parse_moves() {
        assert_eq!("reveal:3,4".parse(), Ok(Move::Reveal((3, 4))));
        assert_eq!("F: 0, 12".parse(), Ok(Move::Flag((0, 12))));
        assert_eq!("chord:1,1".parse(), Ok(Move::Chord((1, 1))));
        assert_eq!("hold:0,2".parse(), Ok(Move::Hold((0, 2))));
        assert_eq!(
            "dig:1,1".parse::<Move>(),
            Err(ParseMoveError::Action("dig".to_owned()))
        );
        assert!(matches!("reveal:1".parse::<Move>(), Err(ParseMoveError::Syntax(_))));
        assert!(matches!("reveal:1,300".parse::<Move>(), Err(ParseMoveError::Syntax(_))));
        assert_eq!(Move::Chord((2, 5)).to_string(), "chord:2,5");
    }

    #[test]
    fn moves_become_clicks_on_the_cell() {
        let board = Board::with_bombs((3, 3), &[(0, 0)]).unwrap();
        let movie = skin::build_movie(&blank_sheet(), skin::SCENES, board.size(), 2).unwrap();
        let view = GameView::new(movie, GameSession::with_board(board, 0), 5).unwrap();

        let [down, up] = Move::Flag((1, 2)).to_events(&view).unwrap();
        assert_eq!((down.kind, down.input), (PointerKind::Down, PointerInput::RIGHT));
        assert_eq!(up.kind, PointerKind::Up);
        assert_eq!((down.x, down.y), ((12 + 16 + 8) * 2, (55 + 32 + 8) * 2));
        assert_eq!((up.x, up.y), (down.x, down.y));

        assert!(Move::Reveal((3, 0)).to_events(&view).is_none());

        let long_press = Duration::from_millis(600);
        let hold = Move::Hold((0, 0)).to_gesture(&view, long_press).unwrap();
        assert_eq!((hold.down.input, hold.hold), (PointerInput::LEFT, long_press));
        let reveal = Move::Reveal((0, 0)).to_gesture(&view, long_press).unwrap();
        assert_eq!(reveal.hold, Duration::ZERO);
    }
}
