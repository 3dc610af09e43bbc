use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::InvalidReason;

/// `aud` is either a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(aud) => aud == audience,
            Audience::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// Decoded claim set of a validated token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, deserialize_with = "numeric_date", skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, deserialize_with = "numeric_date", skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Everything that is not a standard claim above.
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericDate {
    Seconds(i64),
    Fractional(f64),
}

/// NumericDate may carry fractional seconds; those are floored.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NumericDate>::deserialize(deserializer)?.map(|date| match date {
        NumericDate::Seconds(secs) => secs,
        // saturating cast
        NumericDate::Fractional(secs) => secs.floor() as i64,
    }))
}

impl JwtPayload {
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.custom.get(name)
    }
}

/// Outcome of validating one token: valid with claims, or invalid with a reason.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid { payload: JwtPayload },
    Invalid { reason: InvalidReason },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid { .. })
    }

    pub fn payload(&self) -> Option<&JwtPayload> {
        match self {
            ValidationResult::Valid { payload } => Some(payload),
            ValidationResult::Invalid { .. } => None,
        }
    }

    pub fn into_payload(self) -> Option<JwtPayload> {
        match self {
            ValidationResult::Valid { payload } => Some(payload),
            ValidationResult::Invalid { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            ValidationResult::Valid { .. } => None,
            ValidationResult::Invalid { reason } => Some(*reason),
        }
    }
}

impl From<InvalidReason> for ValidationResult {
    fn from(reason: InvalidReason) -> Self {
        ValidationResult::Invalid { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_standard_and_custom_claims() {
        let payload: JwtPayload = serde_json::from_value(json!({
            "sub": "svc-1",
            "iss": "https://auth.example.com",
            "exp": 2000,
            "iat": 1000,
            "aud": ["api-a", "api-b"],
            "tnt_id": "tenant-9",
        }))
        .unwrap();

        assert_eq!(payload.sub.as_deref(), Some("svc-1"));
        assert!(payload.aud.as_ref().unwrap().contains("api-b"));
        assert_eq!(payload.claim("tnt_id"), Some(&json!("tenant-9")));
        assert!(payload.claim("sub").is_none());
    }

    #[test]
    fn single_string_audience() {
        let payload: JwtPayload = serde_json::from_value(json!({"aud": "api-a"})).unwrap();
        assert_eq!(payload.aud, Some(Audience::One("api-a".into())));
    }

    #[test]
    fn fractional_numeric_dates_are_floored() {
        let payload: JwtPayload =
            serde_json::from_value(json!({"exp": 1700000060.75, "iat": 1.7e9, "sub": "s"})).unwrap();
        assert_eq!(payload.exp, Some(1_700_000_060));
        assert_eq!(payload.iat, Some(1_700_000_000));
    }

    #[test]
    fn non_numeric_exp_is_rejected() {
        assert!(serde_json::from_value::<JwtPayload>(json!({"exp": "tomorrow"})).is_err());
    }

    #[test]
    fn null_exp_is_absent() {
        let payload: JwtPayload = serde_json::from_value(json!({"exp": null})).unwrap();
        assert_eq!(payload.exp, None);
    }
}
