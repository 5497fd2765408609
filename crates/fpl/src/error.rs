use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("FPL request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FPL API returned {status} for {path}")]
    Status { status: u16, path: String },

    #[error("could not decode FPL response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(
        "no FPL team id is configured; set `team_id` under [fpl] in touchline.toml or the FPL_TEAM_ID environment variable"
    )]
    MissingTeamId,
}

pub type Result<T> = std::result::Result<T, Error>;
