//! Anonymous structured objects.
//!
//! When a response has no declared class, the mapping layer materializes it
//! as an `ObjectValue`: a recursive tagged value with dynamic key lookup.
//! Nodes are shared (`Rc`), so callers can build object graphs - including
//! accidental cycles, which the reverse conversion detects.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use restmap_core::{Error, Result, Value};

/// Key-alias table: maps a key as found to the key to use instead.
pub type AliasTable = BTreeMap<String, String>;

/// A host-side structured object: scalar leaf, shared list, or shared
/// object node with string-keyed attributes.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectValue {
    /// A leaf value (null, boolean, number, or string).
    Scalar(Value),
    /// An ordered sequence of values. Shared.
    List(Rc<RefCell<Vec<ObjectValue>>>),
    /// An attribute-per-key object node. Shared.
    Object(Rc<RefCell<BTreeMap<String, ObjectValue>>>),
}

impl ObjectValue {
    /// Create an empty object node.
    pub fn object() -> Self {
        ObjectValue::Object(Rc::new(RefCell::new(BTreeMap::new())))
    }

    /// Create an empty list node.
    pub fn list() -> Self {
        ObjectValue::List(Rc::new(RefCell::new(Vec::new())))
    }

    /// Recursively convert a wire value into an anonymous object,
    /// renaming every map key through the alias table at every nesting
    /// depth (lists recursed element-wise, scalars unchanged).
    pub fn from_value(value: Value, aliases: &AliasTable) -> Self {
        match value {
            Value::Array(items) => ObjectValue::List(Rc::new(RefCell::new(
                items
                    .into_iter()
                    .map(|v| Self::from_value(v, aliases))
                    .collect(),
            ))),
            Value::Map(map) => ObjectValue::Object(Rc::new(RefCell::new(
                map.into_iter()
                    .map(|(k, v)| {
                        let key = aliases.get(&k).cloned().unwrap_or(k);
                        (key, Self::from_value(v, aliases))
                    })
                    .collect(),
            ))),
            scalar => ObjectValue::Scalar(scalar),
        }
    }

    /// Convert back to a wire value, renaming keys through the given
    /// table (callers pass the inverse of the forward table).
    ///
    /// A fresh visited set is threaded through each top-level call;
    /// revisiting a node that is still on the way down means the graph has
    /// a reference cycle, which fails with `Error::SerializationCycle`.
    /// Shared-but-acyclic nodes serialize fine: the set is unwound when a
    /// node completes.
    pub fn to_value(&self, aliases: &AliasTable) -> Result<Value> {
        let mut visited = Vec::new();
        self.to_value_inner(aliases, &mut visited)
    }

    fn to_value_inner(
        &self,
        aliases: &AliasTable,
        visited: &mut Vec<*const ()>,
    ) -> Result<Value> {
        match self {
            ObjectValue::Scalar(value) => Ok(value.clone()),
            ObjectValue::List(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if visited.contains(&ptr) {
                    return Err(Error::SerializationCycle);
                }
                visited.push(ptr);
                let result = items
                    .borrow()
                    .iter()
                    .map(|item| item.to_value_inner(aliases, visited))
                    .collect::<Result<Vec<_>>>()?;
                visited.pop();
                Ok(Value::Array(result))
            }
            ObjectValue::Object(map) => {
                let ptr = Rc::as_ptr(map) as *const ();
                if visited.contains(&ptr) {
                    return Err(Error::SerializationCycle);
                }
                visited.push(ptr);
                let mut result = restmap_core::Map::new();
                for (key, value) in map.borrow().iter() {
                    let key = aliases.get(key).cloned().unwrap_or_else(|| key.clone());
                    result.insert(key, value.to_value_inner(aliases, visited)?);
                }
                visited.pop();
                Ok(Value::Map(result))
            }
        }
    }

    /// Dynamic attribute lookup on an object node.
    pub fn attr(&self, name: &str) -> Option<ObjectValue> {
        match self {
            ObjectValue::Object(map) => map.borrow().get(name).cloned(),
            _ => None,
        }
    }

    /// Set an attribute on an object node. No-op on other variants.
    pub fn set_attr(&self, name: impl Into<String>, value: ObjectValue) {
        if let ObjectValue::Object(map) = self {
            map.borrow_mut().insert(name.into(), value);
        }
    }

    /// Index lookup on a list node.
    pub fn index(&self, i: usize) -> Option<ObjectValue> {
        match self {
            ObjectValue::List(items) => items.borrow().get(i).cloned(),
            _ => None,
        }
    }

    /// Append to a list node. No-op on other variants.
    pub fn push(&self, value: ObjectValue) {
        if let ObjectValue::List(items) = self {
            items.borrow_mut().push(value);
        }
    }

    /// The inner value of a scalar leaf.
    pub fn scalar(&self) -> Option<&Value> {
        match self {
            ObjectValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Number of entries in a list or object node.
    pub fn len(&self) -> usize {
        match self {
            ObjectValue::Scalar(_) => 0,
            ObjectValue::List(items) => items.borrow().len(),
            ObjectValue::Object(map) => map.borrow().len(),
        }
    }

    /// Whether a list or object node is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Value> for ObjectValue {
    fn from(value: Value) -> Self {
        ObjectValue::from_value(value, &AliasTable::new())
    }
}

/// Invert a key-alias table. The forward table renames wire keys to host
/// names; the inverse takes host names back to wire keys.
pub fn invert_aliases(aliases: &AliasTable) -> AliasTable {
    aliases.iter().map(|(k, v)| (v.clone(), k.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use restmap_core::Map;

    fn sample_map() -> Value {
        let mut inner = Map::new();
        inner.insert("deep".to_string(), Value::from("down"));

        let mut map = Map::new();
        map.insert("one".to_string(), Value::Integer(1));
        map.insert("nested".to_string(), Value::Map(inner));
        map.insert(
            "items".to_string(),
            Value::from(vec![Value::Integer(1), Value::Integer(2)]),
        );
        Value::Map(map)
    }

    #[test]
    fn from_value_builds_objects() {
        let obj = ObjectValue::from_value(sample_map(), &AliasTable::new());

        assert_eq!(obj.attr("one").unwrap().scalar(), Some(&Value::Integer(1)));
        assert_eq!(
            obj.attr("nested").unwrap().attr("deep").unwrap().scalar(),
            Some(&Value::from("down"))
        );
        assert_eq!(obj.attr("items").unwrap().len(), 2);
        assert_eq!(
            obj.attr("items").unwrap().index(1).unwrap().scalar(),
            Some(&Value::Integer(2))
        );
    }

    #[test]
    fn aliases_apply_at_every_depth() {
        let mut aliases = AliasTable::new();
        aliases.insert("deep".to_string(), "renamed".to_string());
        aliases.insert("one".to_string(), "neo".to_string());

        let obj = ObjectValue::from_value(sample_map(), &aliases);

        assert!(obj.attr("neo").is_some());
        assert!(obj.attr("one").is_none());
        assert!(obj.attr("nested").unwrap().attr("renamed").is_some());
    }

    #[test]
    fn roundtrip_through_inverse() {
        let mut aliases = AliasTable::new();
        aliases.insert("one".to_string(), "neo".to_string());

        let obj = ObjectValue::from_value(sample_map(), &aliases);
        let back = obj.to_value(&invert_aliases(&aliases)).unwrap();

        assert_eq!(back, sample_map());
    }

    #[test]
    fn cycle_is_detected() {
        let obj = ObjectValue::object();
        obj.set_attr("name", ObjectValue::Scalar(Value::from("loop")));
        obj.set_attr("me", obj.clone());

        let result = obj.to_value(&AliasTable::new());
        assert!(matches!(result, Err(Error::SerializationCycle)));
    }

    #[test]
    fn cycle_through_list_is_detected() {
        let list = ObjectValue::list();
        let obj = ObjectValue::object();
        obj.set_attr("children", list.clone());
        list.push(obj.clone());

        let result = obj.to_value(&AliasTable::new());
        assert!(matches!(result, Err(Error::SerializationCycle)));
    }

    #[test]
    fn shared_acyclic_nodes_are_fine() {
        // A diamond: the same node referenced twice, but no cycle.
        let shared = ObjectValue::object();
        shared.set_attr("x", ObjectValue::Scalar(Value::Integer(1)));

        let root = ObjectValue::object();
        root.set_attr("left", shared.clone());
        root.set_attr("right", shared);

        let value = root.to_value(&AliasTable::new()).unwrap();
        assert_eq!(value.get("left"), value.get("right"));
    }

    #[test]
    fn fresh_visited_set_per_call() {
        // A second serialization of the same graph must not see state from
        // the first.
        let obj = ObjectValue::object();
        obj.set_attr("x", ObjectValue::Scalar(Value::Integer(1)));

        assert!(obj.to_value(&AliasTable::new()).is_ok());
        assert!(obj.to_value(&AliasTable::new()).is_ok());
    }

    #[test]
    fn invert_swaps_pairs() {
        let mut aliases = AliasTable::new();
        aliases.insert("one".to_string(), "neo".to_string());

        let inverse = invert_aliases(&aliases);
        assert_eq!(inverse.get("neo"), Some(&"one".to_string()));
    }
}
