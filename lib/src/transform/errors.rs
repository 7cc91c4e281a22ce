use crate::jvm;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// Class could not be read or written
    ClassFile(jvm::Error),

    /// A required property is absent (the key is included)
    MissingProperty(&'static str),

    /// A configured value does not form a valid class name
    MalformedName(String),

    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ClassFile(err) => write!(f, "invalid class file: {:?}", err),
            Error::MissingProperty(key) => write!(f, "{} is not present!", key),
            Error::MalformedName(message) => write!(f, "malformed name: {}", message),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::ClassFile(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
