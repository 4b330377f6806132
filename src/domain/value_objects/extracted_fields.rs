use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldsError {
    #[error("fields must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("fields contain a NUL character at {0}")]
    NulCharacter(String),
}

/// Structured data derived from the raw OCR text by an extraction step.
///
/// Always a JSON object at the top level; nested values are arbitrary JSON.
/// Key order carries no meaning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFields {
    properties: Map<String, Value>,
}

impl ExtractedFields {
    pub fn new() -> Self {
        Self {
            properties: Map::new(),
        }
    }

    /// Interprets an optional JSON payload. Absent and JSON `null` both mean
    /// "no fields"; anything else must be an object.
    pub fn from_optional(value: Option<Value>) -> Result<Option<Self>, FieldsError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Self::try_from(value).map(Some),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Shallow merge: top-level keys of `other` overwrite ours, nested values
    /// are replaced wholesale.
    pub fn merge(&mut self, other: ExtractedFields) {
        for (key, value) in other.properties {
            self.properties.insert(key, value);
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.properties)
    }

    /// Postgres JSONB rejects `\u0000` anywhere in keys or strings.
    fn check_nul(value: &Value, path: &str) -> Result<(), FieldsError> {
        match value {
            Value::String(s) if s.contains('\0') => Err(FieldsError::NulCharacter(path.to_string())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| Self::check_nul(item, &format!("{}[{}]", path, i))),
            Value::Object(map) => map.iter().try_for_each(|(key, item)| {
                let child = format!("{}.{}", path, key);
                if key.contains('\0') {
                    return Err(FieldsError::NulCharacter(child));
                }
                Self::check_nul(item, &child)
            }),
            _ => Ok(()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl TryFrom<Value> for ExtractedFields {
    type Error = FieldsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::check_nul(&value, "$")?;
        match value {
            Value::Object(properties) => Ok(Self { properties }),
            other => Err(FieldsError::NotAnObject(json_kind(&other))),
        }
    }
}

impl From<Map<String, Value>> for ExtractedFields {
    fn from(properties: Map<String, Value>) -> Self {
        Self { properties }
    }
}

impl From<ExtractedFields> for Value {
    fn from(fields: ExtractedFields) -> Self {
        fields.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_is_accepted() {
        let fields = ExtractedFields::try_from(json!({"invoice_no": "A-100", "total": 42.5})).unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get_property("invoice_no"), Some(&json!("A-100")));
        assert_eq!(fields.get_property("total"), Some(&json!(42.5)));
    }

    #[test]
    fn test_top_level_scalars_and_arrays_are_rejected() {
        assert_eq!(
            ExtractedFields::try_from(json!([1, 2])),
            Err(FieldsError::NotAnObject("array"))
        );
        assert_eq!(
            ExtractedFields::try_from(json!("text")),
            Err(FieldsError::NotAnObject("string"))
        );
        assert_eq!(
            ExtractedFields::try_from(json!(3)),
            Err(FieldsError::NotAnObject("number"))
        );
    }

    #[test]
    fn test_null_and_absent_mean_no_fields() {
        assert_eq!(ExtractedFields::from_optional(None), Ok(None));
        assert_eq!(ExtractedFields::from_optional(Some(Value::Null)), Ok(None));

        let some = ExtractedFields::from_optional(Some(json!({}))).unwrap();
        assert!(some.unwrap().is_empty());
    }

    #[test]
    fn test_nul_characters_are_rejected_with_path() {
        let result = ExtractedFields::try_from(json!({"rows": [{"label": "a\u{0}b"}]}));
        assert_eq!(
            result,
            Err(FieldsError::NulCharacter("$.rows[0].label".to_string()))
        );

        let result = ExtractedFields::try_from(json!({"bad\u{0}key": 1}));
        assert!(matches!(result, Err(FieldsError::NulCharacter(_))));
    }

    #[test]
    fn test_merge_overwrites_top_level_keys_only() {
        let mut fields = ExtractedFields::new()
            .with_property("invoice_no", json!("A-100"))
            .with_property("balance_sheet", json!({"rows": [1]}));

        let patch = ExtractedFields::new()
            .with_property("balance_sheet", json!({"table_years": ["2022", "2021"]}))
            .with_property("emails", json!(["billing@example.com"]));

        fields.merge(patch);

        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get_property("invoice_no"), Some(&json!("A-100")));
        assert_eq!(
            fields.get_property("balance_sheet"),
            Some(&json!({"table_years": ["2022", "2021"]}))
        );
    }

    #[test]
    fn test_key_order_is_not_significant() {
        let a = ExtractedFields::try_from(json!({"a": 1, "b": 2})).unwrap();
        let b = ExtractedFields::try_from(json!({"b": 2, "a": 1})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_property_operations() {
        let mut fields = ExtractedFields::new();
        fields.set_property("phones", json!(["+1 555 0100"]));
        assert!(fields.has_property("phones"));

        let removed = fields.remove_property("phones").unwrap();
        assert_eq!(removed, json!(["+1 555 0100"]));
        assert!(fields.is_empty());
    }
}
