use policyscope_core::ExtractedSignals;

/// Placeholder embedded when no policy text was captured.
pub const NO_POLICY_TEXT: &str = "None found";

/// Build the privacy-compliance prompt shared by every provider.
///
/// Only the first `policy_chars` characters of the policy text are embedded.
#[must_use]
pub fn build_prompt(signals: &ExtractedSignals, policy_chars: usize) -> String {
    let cookies = serde_json::to_string(&signals.cookies).unwrap_or_else(|_| "[]".to_string());
    let scripts = serde_json::to_string(&signals.scripts).unwrap_or_else(|_| "[]".to_string());
    let metadata = serde_json::to_string(&signals.metadata).unwrap_or_else(|_| "{}".to_string());

    let policy = if signals.privacy_policy_text.is_empty() {
        NO_POLICY_TEXT.to_string()
    } else {
        signals
            .privacy_policy_text
            .chars()
            .take(policy_chars)
            .collect()
    };

    format!(
        r#"You are a Privacy Compliance Expert. Analyze the following website scan data.

URL: {url}
Cookies Found: {cookies}
External Scripts: {scripts}
Privacy Policy Snippet: "{policy}"
Metadata: {metadata}

Task:
1. Calculate a privacy risk score (0-100, where 100 is perfectly safe).
2. Identify specific risks (GDPR, CCPA gaps, tracking).
3. Recommend improvements.

Return ONLY valid JSON in this format, with no other text:
{{
  "score": number,
  "riskLevel": "LOW" | "MEDIUM" | "HIGH" | "CRITICAL",
  "analysis": "summary string",
  "risks": [{{ "category": "string", "description": "string", "severity": "string" }}],
  "recommendations": ["string"]
}}"#,
        url = signals.url,
    )
}
