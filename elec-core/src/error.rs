#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}
