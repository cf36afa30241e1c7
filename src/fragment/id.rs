use derive_more::{Display, From, Into};
use uuid::Uuid;

/// Correlation id naming one logical transform request.
///
/// Fresh ids are UUIDv7 strings, so they sort by creation time. Ids read
/// from the wire are kept verbatim; the service may echo anything.
///
/// # Examples
///
/// ```
/// use sreeify::fragment::RequestId;
/// let first = RequestId::generate();
/// let second = RequestId::generate();
/// assert_ne!(first, second);
/// assert_eq!(RequestId::from("abc".to_owned()).as_str(), "abc");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new time-ordered id.
    #[must_use]
    pub fn generate() -> Self { Self(Uuid::now_v7().to_string()) }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { self.0.as_str() }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self { Self(value.to_owned()) }
}
