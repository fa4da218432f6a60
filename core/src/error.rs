use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board must be at least 1x1")]
    EmptyBoard,
    #[error("Too many bombs, at least one cell must stay safe")]
    TooManyBombs,
}

pub type Result<T> = core::result::Result<T, GameError>;
