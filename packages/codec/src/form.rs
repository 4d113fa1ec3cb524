//! Flat key-value (form-encoded) serializer strategy.

use restmap_core::{Error, Map, Serializer, Value, WireFormat};

/// The flat key-value strategy.
///
/// Represents a map as percent-encoded `key=value` pairs joined with `&`.
/// This is the default for action parameters sent as a query string. The
/// format is flat: a container value is an encode error.
///
/// Pair order follows map order, so the round-trip law holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormSerializer;

impl Serializer for FormSerializer {
    fn to_wire(&self, map: &Map) -> Result<String, Error> {
        let mut encoder = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in map {
            let text = value.coerce_string().ok_or_else(|| {
                Error::encode(
                    WireFormat::FORM,
                    format!("value for '{}' is not a scalar", key),
                )
            })?;
            encoder.append_pair(key, &text);
        }
        Ok(encoder.finish())
    }

    fn from_wire(&self, text: &str) -> Result<Map, Error> {
        let mut map = Map::new();
        for (key, value) in url::form_urlencoded::parse(text.as_bytes()) {
            map.insert(key.into_owned(), Value::String(value.into_owned()));
        }
        Ok(map)
    }

    fn content_type(&self) -> WireFormat {
        WireFormat::FORM
    }
}
