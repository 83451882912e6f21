use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid card format: {0}")]
    InvalidCardFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
