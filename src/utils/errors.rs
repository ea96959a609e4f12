#![forbid(unsafe_code)]

use thiserror::Error;

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("mini_web input parameters:\n{}", .0)]
    InputParms(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    /// The request line did not contain a method and a path.
    #[error("Malformed request: {:?}", .0)]
    MalformedRequest(String),

    #[error("NOT_FOUND: no row with id {} in table {}", .id, .table)]
    RowNotFound { table: String, id: i64 },

    #[error("Invalid table descriptor: {}", .0)]
    InvalidDescriptor(String),

    /// A stored value could not be converted to the requested Rust type.
    #[error("Column type mismatch: {}", .0)]
    ColumnType(String),

    #[error("Unable to render template: {}", .0)]
    TemplateError(String),

    /// Represents all errors raised by the sqlite driver.
    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),

    #[error("MiniWeb Error: {}", .0)]
    MiniWebError(String),
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::Errors;

    #[test]
    fn row_not_found_message() {
        let e = Errors::RowNotFound { table: "author".to_string(), id: 7 };
        assert_eq!(e.to_string(), "NOT_FOUND: no row with id 7 in table author");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.html");
        let e: Errors = io.into();
        assert!(matches!(e, Errors::IOError(_)));
        assert_eq!(e.to_string(), "missing.html");
    }
}
