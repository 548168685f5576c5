use err_derive::Error;

use infra::persistence::StorageError;

/// Client-side checks made before anything is sent to the backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error(display = "{} is required", _0)]
    Missing(&'static str),
    #[error(display = "{} must be a number, not {:?}", field, input)]
    NotANumber { field: &'static str, input: String },
    #[error(display = "{} must not be negative", _0)]
    Negative(&'static str),
    /// A whole-form check, carrying the message shown on the screen.
    #[error(display = "{}", _0)]
    Incomplete(&'static str),
    #[error(display = "there is no row {}", _0)]
    NoSuchRow(usize),
    /// An imported row that failed its checks, numbered from 1.
    #[error(display = "Row {}: {}", row, reason)]
    Row {
        row: usize,
        reason: Box<ValidationError>,
    },
}

/// What a screen was doing when it failed; picks the fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Save,
    Delete,
    Upload,
}

impl Operation {
    pub fn generic_message(self) -> &'static str {
        match self {
            Operation::Fetch => "Failed to fetch data",
            Operation::Save => "Failed to save data",
            Operation::Delete => "Failed to delete data",
            Operation::Upload => "Failed to upload data",
        }
    }
}

/// Collapses any failure into the one line a screen shows: validation
/// problems as themselves, backend rejections verbatim when the backend
/// explained itself, and otherwise a generic message for the operation.
pub fn user_message(op: Operation, err: &anyhow::Error) -> String {
    if let Some(invalid) = err
        .chain()
        .find_map(|e| e.downcast_ref::<ValidationError>())
    {
        return invalid.to_string();
    }
    err.chain()
        .filter_map(|e| e.downcast_ref::<StorageError>())
        .find_map(|e| e.server_message())
        .unwrap_or_else(|| op.generic_message())
        .to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use anyhow::Context;

    #[test]
    fn validation_errors_are_shown_as_is() {
        let err = anyhow::Error::from(ValidationError::Incomplete("All fields are required"))
            .context("submit menu item");
        assert_eq!(user_message(Operation::Save, &err), "All fields are required");
    }

    #[test]
    fn server_messages_are_shown_verbatim() {
        let res: Result<(), _> = Err(StorageError::Status {
            status: 409,
            message: Some("Username taken".into()),
        });
        let err = res.context("create user").expect_err("error");
        assert_eq!(user_message(Operation::Save, &err), "Username taken");
    }

    #[test]
    fn otherwise_a_generic_message() {
        let err = anyhow::Error::from(StorageError::Status {
            status: 500,
            message: None,
        });
        assert_eq!(user_message(Operation::Delete, &err), "Failed to delete data");
        let err = anyhow::anyhow!("connection reset");
        assert_eq!(user_message(Operation::Fetch, &err), "Failed to fetch data");
    }
}
