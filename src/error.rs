use sea_orm::{DbErr, SqlErr};

/// Terminal outcome of a failed request. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Invalid `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("{0}")]
    Conflict(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("Internal error")]
    Internal(#[from] color_eyre::Report),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Wrap a store failure with context. Constraint violations that slipped
    /// past the service-level checks still come back as conflicts.
    pub fn from_db(err: DbErr, context: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                log::warn!("{context}: unique constraint violated: {detail}");
                Self::Conflict(format!("{context}: record already exists"))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                log::warn!("{context}: foreign key constraint violated: {detail}");
                Self::Conflict(format!("{context}: record is still referenced"))
            }
            _ => Self::Internal(color_eyre::eyre::eyre!("{context}: {err}")),
        }
    }
}

/// Shorthand for `map_err(|e| AppError::from_db(e, ctx))`.
pub trait DbResultExt<T> {
    fn db_context(self, context: &str) -> AppResult<T>;
}

impl<T> DbResultExt<T> for Result<T, DbErr> {
    fn db_context(self, context: &str) -> AppResult<T> {
        self.map_err(|e| AppError::from_db(e, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = AppError::validation("artist", "artist 7 does not exist");
        assert_eq!(err.to_string(), "Invalid `artist`: artist 7 does not exist");
    }

    #[test]
    fn test_plain_db_error_is_internal() {
        let err = AppError::from_db(DbErr::Custom("disk on fire".into()), "Failed to save");
        assert!(matches!(err, AppError::Internal(_)));
        // The detail stays in the report, not the display string
        assert_eq!(err.to_string(), "Internal error");
    }
}
