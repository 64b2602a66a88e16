//! Route verbs: the HTTP method a route method asks to be bound under.
//!
//! Eight values, no default. `Any` is a catch-all that fans out to every
//! common HTTP method when bound.

use std::fmt;
use std::str::FromStr;

use http::Method;

/// The verb half of a [`Route`](crate::Route).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verb {
    Get,
    Delete,
    Put,
    Patch,
    Post,
    Options,
    Any,
    Head,
}

impl Verb {
    /// Returns the uppercase name (e.g. `"GET"`, `"ANY"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get     => "GET",
            Self::Delete  => "DELETE",
            Self::Put     => "PUT",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Options => "OPTIONS",
            Self::Any     => "ANY",
            Self::Head    => "HEAD",
        }
    }

    /// The HTTP methods a registration under this verb covers.
    pub fn methods(self) -> Vec<Method> {
        match self {
            Self::Get     => vec![Method::GET],
            Self::Delete  => vec![Method::DELETE],
            Self::Put     => vec![Method::PUT],
            Self::Patch   => vec![Method::PATCH],
            Self::Post    => vec![Method::POST],
            Self::Options => vec![Method::OPTIONS],
            Self::Head    => vec![Method::HEAD],
            Self::Any     => vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::HEAD,
                Method::OPTIONS,
                Method::DELETE,
                Method::CONNECT,
                Method::TRACE,
            ],
        }
    }
}

/// Parses an uppercase verb name. Case-sensitive, like HTTP methods.
impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET"     => Ok(Self::Get),
            "DELETE"  => Ok(Self::Delete),
            "PUT"     => Ok(Self::Put),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "OPTIONS" => Ok(Self::Options),
            "ANY"     => Ok(Self::Any),
            "HEAD"    => Ok(Self::Head),
            _         => Err(()),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
