pub mod admin;
pub mod artist;
pub mod event;
pub mod settings;
pub mod validate;
pub mod video;

use sea_orm::TransactionError;

use crate::error::AppError;

/// Unwrap a failed transaction: errors raised inside the callback pass
/// through, failures to begin or commit become store errors.
pub(crate) fn transaction_error(err: TransactionError<AppError>, context: &str) -> AppError {
    match err {
        TransactionError::Connection(db_err) => AppError::from_db(db_err, context),
        TransactionError::Transaction(app_err) => app_err,
    }
}
