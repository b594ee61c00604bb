//! Alert Record Types

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Final risk score as sent by the server, either numeric or textual
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RiskScore {
    /// Numeric score, kept in its JSON form so it renders as sent
    Number(serde_json::Number),
    /// Free-form score label
    Text(String),
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskScore::Number(n) => write!(f, "{}", n),
            RiskScore::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RiskScore {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(RiskScore::Number)
            .unwrap_or_else(|| RiskScore::Text(value.to_string()))
    }
}

impl From<&str> for RiskScore {
    fn from(value: &str) -> Self {
        RiskScore::Text(value.to_string())
    }
}

/// A single risk-scoring alert received from the server
///
/// `null` counts as absent for every field. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AlertRecord {
    /// Risk classification (e.g. "HIGH"), if the server sent one
    #[serde(default)]
    pub risk_level: Option<String>,
    /// Reasons that contributed to the score, in server order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reasons: Vec<String>,
    /// Final risk score, if the server sent one
    #[serde(default)]
    pub final_risk: Option<RiskScore>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AlertRecord {
    /// Create a record from its parts
    pub fn new(
        risk_level: Option<&str>,
        reasons: &[&str],
        final_risk: Option<RiskScore>,
    ) -> Self {
        Self {
            risk_level: risk_level.map(str::to_string),
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
            final_risk,
        }
    }
}
