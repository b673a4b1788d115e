//! Process exit codes.

use std::process::ExitCode;

use clap::error::ErrorKind as ClapErrorKind;
use shuttl_core::{Error, ErrorKind};

/// Exit status of `shuttl-freeze`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// The bucket was archived or staged.
    Success = 0,
    /// Anything not covered by a more specific status.
    Failure = 1,
    /// Wrong number of arguments, unknown arguments or unusable names.
    InvalidArguments = 11,
    /// The bucket path is not a directory.
    NotADirectory = 12,
    /// The bucket path does not exist.
    NotFound = 13,
    /// Configuration, logging or storage could not be initialized.
    InitializationFailed = 14,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Status for a failed freeze.
    pub fn from_error(err: &Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => Self::InvalidArguments,
            ErrorKind::NotADirectory => Self::NotADirectory,
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Configuration => Self::InitializationFailed,
            _ => Self::Failure,
        }
    }

    /// Status for a command line that did not parse.
    ///
    /// Help and version requests succeed. Bad option values and missing
    /// required options are configuration failures; anything else is an
    /// argument error.
    pub fn from_clap_error(err: &clap::Error) -> Self {
        match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => Self::Success,
            ClapErrorKind::InvalidValue
            | ClapErrorKind::ValueValidation
            | ClapErrorKind::InvalidUtf8
            | ClapErrorKind::MissingRequiredArgument => Self::InitializationFailed,
            _ => Self::InvalidArguments,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(ExitStatus::from_error(&Error::not_found()), ExitStatus::NotFound);
        assert_eq!(ExitStatus::from_error(&Error::not_a_directory()), ExitStatus::NotADirectory);
        assert_eq!(ExitStatus::from_error(&Error::invalid_input()), ExitStatus::InvalidArguments);
        assert_eq!(ExitStatus::from_error(&Error::lock_unavailable()), ExitStatus::Failure);
        assert_eq!(ExitStatus::from_error(&Error::configuration()).code(), 14);
    }
}
