//! Wire formats and the serializer strategy contract.

use std::borrow::Cow;
use std::fmt;

use crate::{Error, Map};

/// A MIME-type-like content type for wire text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WireFormat(pub Cow<'static, str>);

impl WireFormat {
    /// Structured text (`application/json`)
    pub const JSON: WireFormat = WireFormat(Cow::Borrowed("application/json"));

    /// Flat key-value pairs (`application/x-www-form-urlencoded`)
    pub const FORM: WireFormat = WireFormat(Cow::Borrowed("application/x-www-form-urlencoded"));

    /// Create a format from a static string.
    pub const fn from_static(s: &'static str) -> Self {
        WireFormat(Cow::Borrowed(s))
    }

    /// Create a format from an owned string.
    pub fn new(s: impl Into<String>) -> Self {
        WireFormat(Cow::Owned(s.into()))
    }

    /// Get the format string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&'static str> for WireFormat {
    fn from(s: &'static str) -> Self {
        WireFormat(Cow::Borrowed(s))
    }
}

impl From<String> for WireFormat {
    fn from(s: String) -> Self {
        WireFormat(Cow::Owned(s))
    }
}

impl AsRef<str> for WireFormat {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strategy for converting between wire text and a generic key-value map.
///
/// Two built-ins ship with the codec crate: a structured-text (JSON)
/// strategy and a flat key-value (form-encoded) strategy. Custom strategies
/// implement this trait.
///
/// The round-trip law must hold for any map `m` the strategy can represent:
/// `from_wire(&to_wire(&m)?)? == m`.
///
/// # Object Safety
///
/// This trait is object-safe: schemas hold `Arc<dyn Serializer>`.
pub trait Serializer: Send + Sync {
    /// Serialize a map to wire text.
    fn to_wire(&self, map: &Map) -> Result<String, Error>;

    /// Parse wire text into a map.
    ///
    /// A top level that is not a mapping is a decode error.
    fn from_wire(&self, text: &str) -> Result<Map, Error>;

    /// The content type of the text this strategy produces.
    fn content_type(&self) -> WireFormat;
}

// Blanket implementations for boxes and arcs

impl<T: Serializer + ?Sized> Serializer for Box<T> {
    fn to_wire(&self, map: &Map) -> Result<String, Error> {
        self.as_ref().to_wire(map)
    }

    fn from_wire(&self, text: &str) -> Result<Map, Error> {
        self.as_ref().from_wire(text)
    }

    fn content_type(&self) -> WireFormat {
        self.as_ref().content_type()
    }
}

impl<T: Serializer + ?Sized> Serializer for std::sync::Arc<T> {
    fn to_wire(&self, map: &Map) -> Result<String, Error> {
        self.as_ref().to_wire(map)
    }

    fn from_wire(&self, text: &str) -> Result<Map, Error> {
        self.as_ref().from_wire(text)
    }

    fn content_type(&self) -> WireFormat {
        self.as_ref().content_type()
    }
}
