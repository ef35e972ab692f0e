use crate::types::PlayerId;

/// Errors raised by team generation, scoring and persistence
#[derive(thiserror::Error, Debug)]
pub enum CricketError {
    #[error("need at least {required} players, found {found}")]
    InsufficientPlayers { required: usize, found: usize },

    #[error("both captains are the same player")]
    DuplicateCaptain,

    #[error("invalid player: {0}")]
    InvalidPlayer(String),

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("player {player} is not in {team}")]
    PlayerNotInTeam { player: PlayerId, team: String },

    #[error("match is not in progress")]
    MatchNotInProgress,

    #[error("match has not finished")]
    MatchNotCompleted,

    #[error("no active match")]
    NoActiveMatch,

    #[error("a match is already active")]
    MatchAlreadyActive,

    #[error("striker and non-striker must be selected before scoring")]
    BatsmanNotSelected,

    #[error("a bowler must be selected before scoring")]
    BowlerNotSelected,

    #[error("over complete: select the next bowler")]
    BowlerChangeRequired,

    #[error("player {0} bowled the previous over")]
    ConsecutiveOvers(PlayerId),

    #[error("the bowler can only change at the end of an over")]
    MidOverBowlerChange,

    #[error("player {0} cannot bat now")]
    BatsmanUnavailable(PlayerId),

    #[error("invalid team: {0}")]
    InvalidTeam(String),

    #[error("invalid delivery: {0}")]
    InvalidDelivery(String),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("sync error: {0}")]
    Sync(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CricketError>;
