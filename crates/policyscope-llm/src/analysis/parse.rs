use once_cell::sync::Lazy;
use policyscope_core::{AnalysisResult, RiskFinding, RiskLevel};
use regex::Regex;
use serde::Deserialize;

use crate::error::{LlmError, Result};

static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?").expect("valid regex"));

/// Remove markdown code-fence markers and surrounding whitespace.
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    score: f64,
    risk_level: String,
    #[serde(default)]
    analysis: String,
    #[serde(default)]
    risks: Vec<RiskFinding>,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Parse a provider reply into an [`AnalysisResult`].
///
/// The score must lie in `0..=100` and the risk level must be one of the
/// four analysis levels; anything else is an invalid response.
pub fn parse_analysis(provider: &str, text: &str) -> Result<AnalysisResult> {
    let invalid = |message: String| LlmError::InvalidProviderResponse {
        provider: provider.to_string(),
        message,
    };

    let raw: RawAnalysis =
        serde_json::from_str(&strip_code_fences(text)).map_err(|e| invalid(e.to_string()))?;

    if !(0.0..=100.0).contains(&raw.score) {
        return Err(invalid(format!("score {} outside 0-100", raw.score)));
    }

    let risk_level: RiskLevel = raw
        .risk_level
        .parse()
        .map_err(|_| invalid(format!("unknown riskLevel '{}'", raw.risk_level)))?;
    if risk_level == RiskLevel::Error {
        return Err(invalid("riskLevel ERROR is reserved".to_string()));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = raw.score.round() as u8;

    Ok(AnalysisResult {
        score,
        risk_level,
        analysis: raw.analysis,
        risks: raw.risks,
        recommendations: raw.recommendations,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"score":70,"riskLevel":"MEDIUM","analysis":"ok","risks":[],"recommendations":[]}"#;

    #[test]
    fn test_parse_plain_json() {
        let result = parse_analysis("gemini", PLAIN).expect("parse");
        assert_eq!(result.score, 70);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.analysis, "ok");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_fenced_json_matches_plain() {
        let fenced = format!("```json\n{PLAIN}\n```");
        let bare_fence = format!("```\n{PLAIN}\n```  ");

        let plain = parse_analysis("gemini", PLAIN).expect("parse plain");
        assert_eq!(parse_analysis("gemini", &fenced).expect("parse fenced"), plain);
        assert_eq!(parse_analysis("gemini", &bare_fence).expect("parse bare"), plain);
    }

    #[test]
    fn test_parse_full_result() {
        let text = r#"{
            "score": 42,
            "riskLevel": "high",
            "analysis": "Third-party trackers load before consent.",
            "risks": [{"category": "GDPR", "description": "No consent banner", "severity": "HIGH"}],
            "recommendations": ["Add a consent manager"]
        }"#;

        let result = parse_analysis("openai", text).expect("parse");
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.risks.len(), 1);
        assert_eq!(result.risks[0].category, "GDPR");
        assert_eq!(result.recommendations, vec!["Add a consent manager"]);
    }

    #[test]
    fn test_not_json_is_invalid() {
        let err = parse_analysis("gemini", "I cannot help with that.").expect_err("should fail");
        assert!(matches!(err, LlmError::InvalidProviderResponse { .. }));
    }

    #[test]
    fn test_out_of_range_score_is_invalid() {
        let text = r#"{"score":140,"riskLevel":"LOW"}"#;
        assert!(parse_analysis("gemini", text).is_err());

        let text = r#"{"score":-1,"riskLevel":"LOW"}"#;
        assert!(parse_analysis("gemini", text).is_err());
    }

    #[test]
    fn test_unknown_risk_level_is_invalid() {
        let text = r#"{"score":50,"riskLevel":"SEVERE"}"#;
        assert!(parse_analysis("gemini", text).is_err());

        let text = r#"{"score":50,"riskLevel":"ERROR"}"#;
        assert!(parse_analysis("gemini", text).is_err());
    }
}
