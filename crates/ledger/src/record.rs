use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub const RECORDS_TABLE: &str = "records";
pub const SETTINGS_TABLE: &str = "settings";

pub const ALIASES_KEY: &str = "aliases";
pub const SUB_PASSWORD_KEY: &str = "sub_password";

pub const ID_FIELD: &str = "id";
pub const PLAY_DATE_FIELD: &str = "play_date";

/// One finished game session. Only `id` and `play_date` carry meaning here;
/// player names and scores are forwarded as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn id(&self) -> Option<&Value> {
        self.0.get(ID_FIELD)
    }

    pub fn play_date(&self) -> Option<&Value> {
        self.0.get(PLAY_DATE_FIELD)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn into_patch(mut self) -> Map<String, Value> {
        self.0.remove(ID_FIELD);
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Entity name to display alias. Stored and replaced as a single JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aliases(pub Map<String, Value>);

impl Aliases {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Anything other than a JSON object is treated as no aliases.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Parses route identifiers such as `"42"` into a numeric key. Signs, spaces and
/// decimals are rejected.
pub fn numeric_id(id: &str) -> Option<Value> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match id.parse::<u64>() {
        Ok(id) => Some(Value::from(id)),
        Err(_) => id.parse::<Number>().ok().map(Value::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_id_accepts_only_plain_digits() {
        assert_eq!(numeric_id("42"), Some(json!(42)));
        assert_eq!(numeric_id("007"), Some(json!(7)));
        assert_eq!(numeric_id(""), None);
        assert_eq!(numeric_id("-1"), None);
        assert_eq!(numeric_id("4.2"), None);
        assert_eq!(numeric_id("abc-42"), None);
    }

    #[test]
    fn numeric_id_keeps_ids_beyond_u64() {
        let id = "123456789012345678901234567890";
        let numeric = numeric_id(id).expect("numeric");
        assert!(numeric.is_number());
        assert!(!numeric.is_u64());
    }

    #[test]
    fn into_patch_strips_identifier() {
        let record: Record = serde_json::from_value(json!({
            "id": 3,
            "play_date": "2024-05-01",
            "east": 32000
        }))
        .expect("record");
        let patch = record.into_patch();
        assert!(!patch.contains_key("id"));
        assert_eq!(patch.get("east"), Some(&json!(32000)));
    }

    #[test]
    fn aliases_ignore_non_object_values() {
        assert!(Aliases::from_value(json!("oops")).is_empty());
        let aliases = Aliases::from_value(json!({"alice": "Tile Queen"}));
        assert_eq!(aliases.get("alice"), Some(&json!("Tile Queen")));
    }
}
