//! Structured section codecs
//!
//! A structured section arrives as one of:
//! - an object (newer backends)
//! - a string holding a JSON object (older backends)
//! - a plain markdown string (oldest backends, or hand-edited files)
//! - null / absent / empty
//!
//! Objects are accepted only if they carry at least one known key in either
//! snake_case or camelCase. Anything else is kept verbatim in the section's
//! free-text field.

use framer_core::{
    EngineeringFraming, StructuredSection, TestCase, UserPerspective, ValidationThinking,
};
use serde_json::{Map, Value};

/// A structured section with a JSON object form
pub trait WireSection: StructuredSection {
    /// Keys (all aliases) that identify the object form
    const KNOWN_KEYS: &'static [&'static str];

    /// Read from an object; missing fields default to empty
    fn from_object(map: &Map<String, Value>) -> Self;

    /// Canonical snake_case object
    fn to_object(&self) -> Map<String, Value>;
}

/// Render any JSON value as text: strings verbatim, null empty, others as JSON
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k)).filter(|v| !v.is_null())
}

fn text_field(map: &Map<String, Value>, keys: &[&str]) -> String {
    lookup(map, keys).map(value_text).unwrap_or_default()
}

/// A list, a lone string (becomes one element) or null
pub(crate) fn list_value(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(value_text)
            .collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        other => vec![value_text(other)],
    }
}

fn list_field(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    lookup(map, keys).map(list_value).unwrap_or_default()
}

fn string_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

impl WireSection for UserPerspective {
    const KNOWN_KEYS: &'static [&'static str] = &[
        "persona",
        "context",
        "journey_steps",
        "journeySteps",
        "pain_points",
        "painPoints",
    ];

    fn from_object(map: &Map<String, Value>) -> Self {
        Self {
            persona: text_field(map, &["persona"]),
            context: text_field(map, &["context"]),
            journey_steps: list_field(map, &["journey_steps", "journeySteps"]),
            pain_points: list_field(map, &["pain_points", "painPoints"]),
        }
    }

    fn to_object(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("persona".into(), Value::String(self.persona.clone()));
        map.insert("context".into(), Value::String(self.context.clone()));
        map.insert("journey_steps".into(), string_list(&self.journey_steps));
        map.insert("pain_points".into(), string_list(&self.pain_points));
        map
    }
}

impl WireSection for EngineeringFraming {
    const KNOWN_KEYS: &'static [&'static str] = &[
        "approach",
        "principles",
        "non_goals",
        "nonGoals",
        "risks",
    ];

    fn from_object(map: &Map<String, Value>) -> Self {
        Self {
            approach: text_field(map, &["approach"]),
            principles: list_field(map, &["principles"]),
            non_goals: list_field(map, &["non_goals", "nonGoals"]),
            risks: list_field(map, &["risks"]),
        }
    }

    fn to_object(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("approach".into(), Value::String(self.approach.clone()));
        map.insert("principles".into(), string_list(&self.principles));
        map.insert("non_goals".into(), string_list(&self.non_goals));
        map.insert("risks".into(), string_list(&self.risks));
        map
    }
}

fn test_case(value: &Value) -> Option<TestCase> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(TestCase {
            scenario: text_field(map, &["scenario", "name", "description"]),
            expected: text_field(map, &["expected", "expected_result", "expectedResult"]),
            priority: text_field(map, &["priority"]),
        }),
        other => Some(TestCase {
            scenario: value_text(other),
            ..TestCase::default()
        }),
    }
}

fn test_cases(value: &Value) -> Vec<TestCase> {
    match value {
        Value::Array(items) => items.iter().filter_map(test_case).collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        other => test_case(other).into_iter().collect(),
    }
}

impl WireSection for ValidationThinking {
    const KNOWN_KEYS: &'static [&'static str] = &[
        "summary",
        "success_criteria",
        "successCriteria",
        "test_cases",
        "testCases",
        "rollback_plan",
        "rollbackPlan",
    ];

    fn from_object(map: &Map<String, Value>) -> Self {
        Self {
            summary: text_field(map, &["summary"]),
            success_criteria: list_field(map, &["success_criteria", "successCriteria"]),
            test_cases: lookup(map, &["test_cases", "testCases"])
                .map(test_cases)
                .unwrap_or_default(),
            rollback_plan: text_field(map, &["rollback_plan", "rollbackPlan"]),
        }
    }

    fn to_object(&self) -> Map<String, Value> {
        let cases = self
            .test_cases
            .iter()
            .map(|tc| {
                let mut obj = Map::new();
                obj.insert("scenario".into(), Value::String(tc.scenario.clone()));
                obj.insert("expected".into(), Value::String(tc.expected.clone()));
                obj.insert("priority".into(), Value::String(tc.priority.clone()));
                Value::Object(obj)
            })
            .collect();
        let mut map = Map::new();
        map.insert("summary".into(), Value::String(self.summary.clone()));
        map.insert("success_criteria".into(), string_list(&self.success_criteria));
        map.insert("test_cases".into(), Value::Array(cases));
        map.insert("rollback_plan".into(), Value::String(self.rollback_plan.clone()));
        map
    }
}

fn has_known_key<T: WireSection>(map: &Map<String, Value>) -> bool {
    T::KNOWN_KEYS.iter().any(|k| map.contains_key(*k))
}

/// Decode a structured section from any wire shape; never fails
pub fn decode_section<T: WireSection>(value: &Value) -> T {
    match value {
        Value::Null => T::default(),
        Value::String(raw) if raw.trim().is_empty() => T::default(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) if has_known_key::<T>(&map) => T::from_object(&map),
            _ => {
                tracing::trace!(section = %T::KEY, "Section is not structured JSON, keeping as text");
                T::from_text(raw.clone())
            }
        },
        Value::Object(map) if has_known_key::<T>(map) => T::from_object(map),
        other => T::from_text(other.to_string()),
    }
}

/// Encode a structured section as a JSON-object string; empty encodes as `""`
pub fn encode_section<T: WireSection + PartialEq>(section: &T) -> String {
    if *section == T::default() {
        return String::new();
    }
    Value::Object(section.to_object()).to_string()
}

/// Decode a flat section: strings pass through, other values become JSON text
#[must_use]
pub fn decode_flat(value: &Value) -> String {
    value_text(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn plain_string_becomes_context() {
        let up: UserPerspective = decode_section(&json!("ad-hoc note"));
        assert_eq!(up, UserPerspective::from_text("ad-hoc note"));
    }

    #[test]
    fn json_string_is_parsed() {
        let raw = r#"{"persona":"Admin","journeySteps":["a","b"],"pain_points":"slow"}"#;
        let up: UserPerspective = decode_section(&json!(raw));
        assert_eq!(up.persona, "Admin");
        assert_eq!(up.journey_steps, vec!["a", "b"]);
        assert_eq!(up.pain_points, vec!["slow"]);
        assert_eq!(up.context, "");
    }

    #[test]
    fn object_without_known_keys_is_text() {
        let ef: EngineeringFraming = decode_section(&json!({"foo": 1}));
        assert_eq!(ef.approach, r#"{"foo":1}"#);

        let ef: EngineeringFraming = decode_section(&json!(r#"{"foo": 1}"#));
        assert_eq!(ef.approach, r#"{"foo": 1}"#);
    }

    #[test]
    fn json_scalar_string_is_text() {
        let vt: ValidationThinking = decode_section(&json!("42"));
        assert_eq!(vt.summary, "42");
    }

    #[test]
    fn null_and_empty_are_default() {
        assert_eq!(decode_section::<UserPerspective>(&Value::Null), UserPerspective::default());
        assert_eq!(decode_section::<UserPerspective>(&json!("  ")), UserPerspective::default());
    }

    #[test]
    fn test_cases_are_lenient() {
        let vt: ValidationThinking = decode_section(&json!({
            "testCases": ["smoke", {"name": "load", "expected_result": "ok", "priority": 1}, null],
            "rollbackPlan": "flag off"
        }));
        assert_eq!(vt.test_cases.len(), 2);
        assert_eq!(vt.test_cases[0].scenario, "smoke");
        assert_eq!(vt.test_cases[1].expected, "ok");
        assert_eq!(vt.test_cases[1].priority, "1");
        assert_eq!(vt.rollback_plan, "flag off");
    }

    #[test]
    fn encode_uses_snake_case() {
        let up = UserPerspective {
            journey_steps: vec!["open".into()],
            ..Default::default()
        };
        let encoded = encode_section(&up);
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["journey_steps"], json!(["open"]));
        assert_eq!(encode_section(&UserPerspective::default()), "");
    }

    #[test]
    fn flat_values() {
        assert_eq!(decode_flat(&json!("text")), "text");
        assert_eq!(decode_flat(&Value::Null), "");
        assert_eq!(decode_flat(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
