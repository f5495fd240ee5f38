use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::TransportError;

/// Immutable descriptor of a remote streaming endpoint.
///
/// Cheap to clone; passed as the argument of [`Connected`](crate::Connected)
/// and [`ConnectionLost`](crate::ConnectionLost).
///
/// ## Example
/// ```rust
/// use streamkeeper::Endpoint;
///
/// let ep = Endpoint::parse("T", "wss://example/test").unwrap();
/// assert_eq!(ep.name(), "T");
/// assert_eq!(ep.address().scheme(), "wss");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    name: Arc<str>,
    address: Arc<Url>,
}

impl Endpoint {
    pub fn new(name: impl Into<Arc<str>>, address: Url) -> Self {
        Self {
            name: name.into(),
            address: Arc::new(address),
        }
    }

    /// Parses `address`; fails with [`TransportError::Invalid`] on a malformed URL.
    pub fn parse(name: impl Into<Arc<str>>, address: &str) -> Result<Self, TransportError> {
        let url = Url::parse(address).map_err(|e| TransportError::Invalid {
            error: format!("{address}: {e}"),
        })?;
        Ok(Self::new(name, url))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn address(&self) -> &Url {
        &self.address
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}
