use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Board needs at least 2 rows and 2 columns")]
    BoardTooSmall,
    #[error("At least one mine is required")]
    NoMines,
    #[error("Too many mines, at least one cell must stay safe")]
    TooManyMines,
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
    #[error("Game already ended, no new moves are accepted")]
    AlreadyEnded,
}

pub type Result<T> = core::result::Result<T, GameError>;

/// Failure to load a [`GameConfig`](crate::GameConfig) from its serialized form.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Malformed game config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] GameError),
}
