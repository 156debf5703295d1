use thiserror::Error;

use crate::Version;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("state error: {0}")]
    State(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("execution error at version {version}: {message}")]
    Execution { version: Version, message: String },

    #[error("history error: {0}")]
    History(String),

    #[error("version {0} has no down migration")]
    Irreversible(Version),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_display_includes_context() {
        let e = Error::Connection("refused".into());
        assert_eq!(e.to_string(), "connection error: refused");

        let e = Error::InvalidVersion("target version 5 is not in the history".into());
        assert_eq!(
            e.to_string(),
            "invalid version: target version 5 is not in the history"
        );

        let e = Error::Execution {
            version: 2,
            message: "no such table: a".into(),
        };
        assert_eq!(
            e.to_string(),
            "execution error at version 2: no such table: a"
        );

        let e = Error::Irreversible(3);
        assert_eq!(e.to_string(), "version 3 has no down migration");
    }
}
