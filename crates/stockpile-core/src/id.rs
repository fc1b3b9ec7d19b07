use thiserror::Error;

/// Longest identifier accepted on the wire.
pub const MAX_ID_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("ID must not be empty")]
    Empty,
    #[error("ID exceeds 64 characters")]
    TooLong,
    #[error("ID contains invalid character {0:?}")]
    InvalidChar(char),
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Ids are embedded in cache keys, so separators and glob metacharacters are
/// rejected along with anything outside `[A-Za-z0-9_-]`.
pub fn validate_id(id: &str) -> Result<(), IdError> {
    if id.is_empty() {
        return Err(IdError::Empty);
    }
    if id.len() > MAX_ID_LEN {
        return Err(IdError::TooLong);
    }
    match id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        Some(c) => Err(IdError::InvalidChar(c)),
        None => Ok(()),
    }
}
