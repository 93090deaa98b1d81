use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

/// Typed description of the JSON shape the model is asked to emit.
/// Serializes to the `responseSchema` form of `generateContent`.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDescriptor {
    String,
    Array { items: Box<SchemaDescriptor> },
    Object { properties: Vec<(String, SchemaDescriptor)>, required: Vec<String> },
}

impl SchemaDescriptor {
    pub fn array_of(items: SchemaDescriptor) -> Self {
        SchemaDescriptor::Array { items: Box::new(items) }
    }

    /// Object whose listed properties are all required.
    pub fn object_all_required(properties: Vec<(&str, SchemaDescriptor)>) -> Self {
        let required = properties.iter().map(|(name, _)| name.to_string()).collect();
        let properties = properties.into_iter().map(|(name, s)| (name.to_string(), s)).collect();
        SchemaDescriptor::Object { properties, required }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SchemaDescriptor::String => json!({ "type": "STRING" }),
            SchemaDescriptor::Array { items } => json!({ "type": "ARRAY", "items": items.to_json() }),
            SchemaDescriptor::Object { properties, required } => {
                let props: Map<String, Value> =
                    properties.iter().map(|(name, s)| (name.clone(), s.to_json())).collect();
                json!({ "type": "OBJECT", "properties": props, "required": required })
            }
        }
    }
}

impl Serialize for SchemaDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_schema_matches_wire_shape() {
        let schema = SchemaDescriptor::object_all_required(vec![
            ("name", SchemaDescriptor::String),
            ("tags", SchemaDescriptor::array_of(SchemaDescriptor::String)),
        ]);
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "OBJECT",
                "properties": {
                    "name": { "type": "STRING" },
                    "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
                },
                "required": ["name", "tags"]
            })
        );
    }
}
