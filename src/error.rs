use thiserror::Error;

/// Errors that can occur while setting up or writing a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;
