//! Wire types for the recognition endpoint.
//!
//! Responses are taken as-is: missing fields default, unknown fields are
//! ignored, and person fields are kept as raw JSON values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STATUS_MATCH_FOUND: &str = "match_found";

/// Body of `POST /process_frame`.
#[derive(Debug, Serialize)]
pub struct ProcessFrameRequest {
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MatchResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub matches: Vec<Person>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub image_url: Field,
    #[serde(default)]
    pub name: Field,
    #[serde(default)]
    pub location: Field,
    #[serde(default)]
    pub age: Field,
}

/// An opaque passthrough value. Strings display without quotes, null as empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Field(pub Value);

impl MatchResult {
    /// True when the service reported a match and sent at least one candidate.
    pub fn has_matches(&self) -> bool {
        self.status == STATUS_MATCH_FOUND && !self.matches.is_empty()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::Null => Ok(()),
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field(Value::String(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_match_found_with_numeric_age() {
        let raw = r#"{"status":"match_found","matches":[{"image_url":"a.jpg","name":"X","location":"Y","age":30}]}"#;
        let result: MatchResult = serde_json::from_str(raw).unwrap();
        assert!(result.has_matches());
        let p = &result.matches[0];
        assert_eq!(p.image_url.to_string(), "a.jpg");
        assert_eq!(p.name.to_string(), "X");
        assert_eq!(p.location.to_string(), "Y");
        assert_eq!(p.age.to_string(), "30");
    }

    #[test]
    fn string_age_and_missing_fields_pass_through() {
        let raw = r#"{"status":"match_found","matches":[{"name":"Z","age":"unknown"}]}"#;
        let result: MatchResult = serde_json::from_str(raw).unwrap();
        let p = &result.matches[0];
        assert_eq!(p.age.to_string(), "unknown");
        assert_eq!(p.location.to_string(), "");
    }

    #[test]
    fn status_without_matches_defaults_to_empty() {
        let result: MatchResult = serde_json::from_str(r#"{"status":"no_face"}"#).unwrap();
        assert!(result.matches.is_empty());
        assert!(!result.has_matches());
    }

    #[test]
    fn match_found_with_empty_list_has_no_matches() {
        let result: MatchResult =
            serde_json::from_str(r#"{"status":"match_found","matches":[]}"#).unwrap();
        assert!(!result.has_matches());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let raw = r#"{"status":"match_found","name":"X","match_score":"87%","redirect_url":"/sighting_result/4"}"#;
        let result: MatchResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.status, "match_found");
        assert!(result.matches.is_empty());
    }

    #[test]
    fn request_serializes_image_field() {
        let body = serde_json::to_string(&ProcessFrameRequest {
            image: "data:image/jpeg;base64,AAAA".into(),
        })
        .unwrap();
        assert_eq!(body, r#"{"image":"data:image/jpeg;base64,AAAA"}"#);
    }
}
