//! URI-reference values.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{ValueError, ValueResult};

/// Base used only to check that a relative reference is well formed.
const PROBE_BASE: &str = "http://uri-reference.invalid/";

/// A URI-reference (RFC 3986 §4.1): either an absolute URI or a relative
/// reference.
///
/// The original text is preserved verbatim as the canonical string form, so
/// `UriRef::parse(s)?.as_str() == s` for every accepted `s`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UriRef(String);

impl UriRef {
    /// Parse and validate a URI-reference.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidUri`] when the text is neither an absolute
    /// URI nor a resolvable relative reference.
    pub fn parse(input: &str) -> ValueResult<Self> {
        match Url::parse(input) {
            Ok(_) => Ok(Self(input.to_owned())),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse(PROBE_BASE).map_err(|e| invalid(input, &e))?;
                base.join(input).map_err(|e| invalid(input, &e))?;
                Ok(Self(input.to_owned()))
            },
            Err(e) => Err(invalid(input, &e)),
        }
    }

    /// The reference as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the reference is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the reference is an absolute URI.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        Url::parse(&self.0).is_ok()
    }

    /// Convert to an absolute [`Url`].
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::NotAbsolute`] for relative references.
    pub fn to_url(&self) -> ValueResult<Url> {
        match Url::parse(&self.0) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Err(ValueError::NotAbsolute(self.0.clone()))
            },
            Err(e) => Err(invalid(&self.0, &e)),
        }
    }

    /// Consume into the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

fn invalid(input: &str, err: &url::ParseError) -> ValueError {
    ValueError::InvalidUri {
        input: input.to_owned(),
        reason: err.to_string(),
    }
}

impl fmt::Display for UriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UriRef {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Url> for UriRef {
    fn from(url: Url) -> Self {
        Self(url.into())
    }
}

impl From<&Url> for UriRef {
    fn from(url: &Url) -> Self {
        Self(url.as_str().to_owned())
    }
}

impl AsRef<str> for UriRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
