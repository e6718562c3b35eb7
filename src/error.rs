use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroupingError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Parsing Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Degenerate Input: {subjects} subjects cannot fill {groups} groups")]
    DegenerateInput { subjects: usize, groups: usize },
}

impl GroupingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GroupingError::Validation(msg.into())
    }
}

pub type GfResult<T> = Result<T, GroupingError>;
