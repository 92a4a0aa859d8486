//! Error type shared by the wrappers, the runtime seam and the consumer-side
//! method table.
//!
//! None of the six sampling operations surface these to their caller: they
//! degrade to zero or empty results and report through a
//! [`DiagnosticSink`](crate::diagnostics::DiagnosticSink).

use thiserror::Error;

use crate::sys::jvmti::jvmtiError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{call} failed: {code}")]
    Jvmti {
        call: &'static str,
        code: jvmtiError,
    },

    #[error("{0} returned a null reference")]
    NullHandle(&'static str),

    #[error("JNI call {0} failed")]
    Jni(&'static str),

    #[error("class not found: {0}")]
    ClassNotFound(String),

    #[error("invalid agent option: {0}")]
    InvalidOption(String),

    #[error("method table is a frozen copy and cannot be updated")]
    FrozenTable,

    #[error("malformed metadata blob: {0}")]
    MalformedBlob(String),

    #[error("string of {0} bytes does not fit a modified UTF-8 record")]
    StringTooLong(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attaches the JVMTI function name to a raw error code.
    pub fn jvmti(call: &'static str) -> impl FnOnce(jvmtiError) -> Error {
        move |code| Error::Jvmti { call, code }
    }

    /// The JVMTI code behind this error, if it came from a JVMTI call.
    pub fn jvmti_code(&self) -> Option<jvmtiError> {
        match self {
            Error::Jvmti { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
