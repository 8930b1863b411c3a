//! AI risk analysis payloads.
//!
//! The analysis service writes its result into `ai_risk_analysis` either as
//! a JSON object or as a JSON-encoded string. Klausa never computes these;
//! it only decodes them for display. A payload that cannot be decoded is
//! treated as "no analysis available".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::CoreError;
use crate::model::{RiskLevel, de};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    #[serde(default, deserialize_with = "de::lenient_risk")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default)]
    pub risk_assessment: Option<RiskAssessment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "de::lenient_risk")]
    pub severity: Option<RiskLevel>,
    #[serde(default)]
    pub found_keywords: Vec<String>,
    #[serde(default)]
    pub keyword_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskAssessment {
    pub description: String,
    pub confidence_interpretation: String,
    pub recommendations: Vec<String>,
    pub risk_factor_count: u32,
    pub high_severity_factors: u32,
    pub medium_severity_factors: u32,
    pub low_severity_factors: u32,
}

/// A row from `ai_risk_analysis`. `analysis_result` is kept raw until
/// decoded with [`AnalysisRecord::analysis`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(deserialize_with = "de::id_string")]
    pub contract_id: String,
    #[serde(default)]
    pub analysis_result: Value,
    #[serde(default, deserialize_with = "de::lenient_risk")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn analysis(&self) -> Option<RiskAnalysis> {
        decode_analysis(&self.analysis_result)
    }
}

/// Strictly decode an analysis payload.
///
/// `null` decodes to `Ok(None)`. Strings are parsed as embedded JSON.
pub fn parse_analysis(raw: &Value) -> Result<Option<RiskAnalysis>, CoreError> {
    match raw {
        Value::Null => Ok(None),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => Ok(Some(serde_json::from_str(text)?)),
        Value::Object(_) => Ok(Some(RiskAnalysis::deserialize(raw)?)),
        _ => Err(CoreError::AnalysisShape("expected object or JSON string")),
    }
}

/// Decode an analysis payload, logging and discarding anything malformed.
pub fn decode_analysis(raw: &Value) -> Option<RiskAnalysis> {
    match parse_analysis(raw) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "discarding malformed analysis payload");
            None
        }
    }
}

/// Latest analysis row for a contract, by `analyzed_at`.
pub fn latest_analysis<'a, I>(records: I) -> Option<&'a AnalysisRecord>
where
    I: IntoIterator<Item = &'a AnalysisRecord>,
{
    records.into_iter().max_by_key(|r| r.analyzed_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "success": true,
            "risk_level": "Low",
            "confidence": 0.961,
            "risk_factors": [
                {
                    "type": "warranty_risk",
                    "description": "Risiko terkait garansi",
                    "severity": "Low",
                    "found_keywords": ["jaminan"],
                    "keyword_count": 1
                },
                {
                    "type": "legal_compliance",
                    "description": "Risiko kepatuhan hukum",
                    "severity": "Medium",
                    "found_keywords": ["peraturan", "undang-undang", "hukum"],
                    "keyword_count": 3
                }
            ],
            "risk_assessment": {
                "description": "Kontrak memiliki tingkat risiko rendah",
                "recommendations": ["Review berkala terhadap pelaksanaan kontrak"],
                "risk_factor_count": 2,
                "medium_severity_factors": 1,
                "low_severity_factors": 1
            }
        })
    }

    #[test]
    fn object_payload() {
        let analysis = parse_analysis(&sample()).unwrap().unwrap();
        assert_eq!(analysis.risk_level, Some(RiskLevel::Low));
        assert_eq!(analysis.risk_factors.len(), 2);
        assert_eq!(analysis.risk_factors[1].severity, Some(RiskLevel::Medium));
        let assessment = analysis.risk_assessment.unwrap();
        assert_eq!(assessment.risk_factor_count, 2);
        assert_eq!(assessment.high_severity_factors, 0);
    }

    #[test]
    fn string_payload() {
        let embedded = Value::String(sample().to_string());
        let analysis = parse_analysis(&embedded).unwrap().unwrap();
        assert_eq!(analysis.confidence, Some(0.961));
    }

    #[test]
    fn null_and_blank_mean_no_analysis() {
        assert!(parse_analysis(&Value::Null).unwrap().is_none());
        assert!(parse_analysis(&json!("  ")).unwrap().is_none());
    }

    #[test]
    fn malformed_payload_is_discarded() {
        let broken = json!("{\"risk_level\": \"High\", ");
        assert!(parse_analysis(&broken).is_err());
        assert!(decode_analysis(&broken).is_none());
        assert!(decode_analysis(&json!(42)).is_none());
    }

    #[test]
    fn record_decodes_lazily() {
        let record: AnalysisRecord = serde_json::from_value(json!({
            "contract_id": "c1",
            "analysis_result": sample().to_string(),
            "risk_level": "Low",
            "model_used": "rule-based-v2",
            "analyzed_at": "2025-02-01T08:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.analysis().unwrap().risk_factors.len(), 2);
    }
}
