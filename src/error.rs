use std::{fmt, panic::Location};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    ClassFormat(String),

    #[error("ClassNotFoundException: {0}")]
    ClassNotFound(String),

    #[error("NoSuchMethodError: {0}")]
    NoSuchMethod(String),

    #[error("ClassCircularityError: {0}")]
    ClassCircularity(String),

    #[error(
        "Error: main() method not found in class {0}\n\
         Please define the main method as:\n   public static void main(String[] args)"
    )]
    NoMainMethod(String),

    #[error("load_class_from_name_only for {class} failed: {source}")]
    ClassLoad {
        class: String,
        #[source]
        source: Box<Error>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("{0}")]
    Archive(String),

    #[error("invalid magic number 0x{found:04X} in jmod file {path}")]
    InvalidJmod { path: String, found: u16 },

    #[error("InternalError: {0}")]
    Internal(String),
}

impl Error {
    /// Class format error tagged with the location of the detecting code.
    #[track_caller]
    pub fn class_format(msg: impl fmt::Display) -> Self {
        let location = Location::caller();
        Error::ClassFormat(format!(
            "Class Format Error: {msg}\n  detected by file: {}, line: {}",
            location.file(),
            location.line()
        ))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    pub fn kind(&self) -> ExceptionKind {
        match self {
            Error::ClassFormat(_) => ExceptionKind::ClassFormatError,
            Error::ClassNotFound(_) => ExceptionKind::ClassNotFoundException,
            Error::NoSuchMethod(_) => ExceptionKind::NoSuchMethodError,
            Error::ClassCircularity(_) => ExceptionKind::ClassCircularityError,
            Error::NoMainMethod(_) => ExceptionKind::NoMainMethodError,
            Error::ClassLoad { source, .. } => source.kind(),
            Error::Io(_) | Error::Zip(_) | Error::Snapshot(_) | Error::Archive(_) => {
                ExceptionKind::IoError
            }
            Error::InvalidJmod { .. } => ExceptionKind::IoError,
            Error::Internal(_) => ExceptionKind::InternalError,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.kind() {
            ExceptionKind::ClassNotFoundException
            | ExceptionKind::NoSuchMethodError
            | ExceptionKind::NoMainMethodError => ExitCode::AppException,
            ExceptionKind::ClassFormatError
            | ExceptionKind::ClassCircularityError
            | ExceptionKind::IoError
            | ExceptionKind::InternalError => ExitCode::JvmException,
        }
    }
}

/// Java-level exception classes the core can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    ClassFormatError,
    ClassNotFoundException,
    NoSuchMethodError,
    NoMainMethodError,
    ClassCircularityError,
    IoError,
    InternalError,
}

impl ExceptionKind {
    pub fn class_name(self) -> &'static str {
        match self {
            ExceptionKind::ClassFormatError => "java/lang/ClassFormatError",
            ExceptionKind::ClassNotFoundException => "java/lang/ClassNotFoundException",
            ExceptionKind::NoSuchMethodError => "java/lang/NoSuchMethodError",
            ExceptionKind::NoMainMethodError => "java/lang/NoSuchMethodError",
            ExceptionKind::ClassCircularityError => "java/lang/ClassCircularityError",
            ExceptionKind::IoError => "java/io/IOError",
            ExceptionKind::InternalError => "java/lang/InternalError",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    Ok = 0,
    JvmException = 1,
    AppException = 2,
    UnknownError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_format_location() {
        let err = Error::class_format("bad things");
        let msg = err.to_string();
        assert!(msg.starts_with("Class Format Error: bad things"));
        assert!(msg.contains("detected by file:"));
        assert!(msg.contains("error.rs"));
        assert_eq!(err.exit_code(), ExitCode::JvmException);
    }

    #[test]
    fn test_class_load_message() {
        let err = Error::ClassLoad {
            class: "gherkin".into(),
            source: Box::new(Error::ClassNotFound("gherkin".into())),
        };
        assert!(
            err.to_string()
                .starts_with("load_class_from_name_only for gherkin failed")
        );
        assert_eq!(err.kind(), ExceptionKind::ClassNotFoundException);
        assert_eq!(i32::from(err.exit_code()), 2);
    }

    #[test]
    fn test_no_main_message() {
        let err = Error::NoMainMethod("Hello".into());
        assert!(
            err.to_string()
                .starts_with("Error: main() method not found in class Hello\n")
        );
    }
}
