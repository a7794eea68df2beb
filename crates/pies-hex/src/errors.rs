use pies_types::domain::ValidationError;
use pies_types::ports::store::RepoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage failure: {0}")]
    Storage(#[from] RepoError),
}
