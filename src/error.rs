//! Unified error type.

use std::fmt;

/// The error type returned by routekit's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// setup and infrastructure failures: a route the router refuses, or a
/// listener that cannot bind.
#[derive(Debug)]
pub enum Error {
    /// Binding or accepting on the listening socket failed.
    Io(std::io::Error),
    /// The router rejected a path (malformed, or conflicts with an existing route).
    Route {
        path: String,
        source: matchit::InsertError,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Route { path, source } => write!(f, "invalid route `{path}`: {source}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Route { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
