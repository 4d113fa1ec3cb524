//! Structured-text (JSON) serializer strategy.

use restmap_core::{Error, Map, Serializer, WireFormat};

use crate::convert::{json_to_value, value_to_json};

/// The structured-text strategy.
///
/// This is the default serializer and deserializer on every schema. It
/// converts between `Map` and JSON text.
///
/// # Example
///
/// ```rust
/// use restmap_codec::JsonSerializer;
/// use restmap_core::{Map, Serializer, Value};
///
/// let mut map = Map::new();
/// map.insert("version".to_string(), Value::Integer(1));
///
/// let text = JsonSerializer.to_wire(&map).unwrap();
/// let decoded = JsonSerializer.from_wire(&text).unwrap();
///
/// assert_eq!(decoded, map);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn to_wire(&self, map: &Map) -> Result<String, Error> {
        let json = serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        );
        serde_json::to_string(&json).map_err(|e| Error::encode(WireFormat::JSON, e.to_string()))
    }

    fn from_wire(&self, text: &str) -> Result<Map, Error> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::decode(WireFormat::JSON, e.to_string()))?;

        match json_to_value(json) {
            restmap_core::Value::Map(map) => Ok(map),
            other => Err(Error::decode(
                WireFormat::JSON,
                format!("expected a mapping at the top level, got {:?}", other),
            )),
        }
    }

    fn content_type(&self) -> WireFormat {
        WireFormat::JSON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restmap_core::Value;

    #[test]
    fn roundtrip() {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::from("Alice"));
        map.insert("age".to_string(), Value::Integer(30));
        map.insert(
            "tags".to_string(),
            Value::from(vec!["admin", "staff"]),
        );

        let text = JsonSerializer.to_wire(&map).unwrap();
        let decoded = JsonSerializer.from_wire(&text).unwrap();

        assert_eq!(decoded, map);
    }

    #[test]
    fn rejects_non_mapping_top_level() {
        let result = JsonSerializer.from_wire("[1, 2, 3]");
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn rejects_invalid_json() {
        let result = JsonSerializer.from_wire("not valid json{");
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn content_type() {
        assert_eq!(JsonSerializer.content_type(), WireFormat::JSON);
    }
}
