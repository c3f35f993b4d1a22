// Classification of backend failures into user-facing errors

use crate::errors::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16, body: &str) -> BackendError {
        BackendError::Status {
            code,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_detail_without_sentinel_is_all_message() {
        let parsed = ErrorDetail::parse("Something broke");
        assert_eq!(parsed.message, "Something broke");
        assert_eq!(parsed.raw_response, None);
    }

    #[test]
    fn test_detail_splits_on_first_sentinel_only() {
        let parsed = ErrorDetail::parse("Bad|RAW_RESPONSE:first|RAW_RESPONSE:second");
        assert_eq!(parsed.message, "Bad");
        assert_eq!(parsed.raw_response.as_deref(), Some("first|RAW_RESPONSE:second"));

        let empty_raw = ErrorDetail::parse("Bad|RAW_RESPONSE:");
        assert_eq!(empty_raw.raw_response.as_deref(), Some(""));
    }

    #[test]
    fn test_extract_detail_handles_body_shapes() {
        assert_eq!(extract_detail(r#"{"detail":"nope"}"#).as_deref(), Some("nope"));
        assert_eq!(extract_detail(r#""quoted""#).as_deref(), Some("quoted"));
        assert_eq!(extract_detail("plain text\n").as_deref(), Some("plain text"));
        assert_eq!(extract_detail(r#"{"detail":null}"#), None);
        assert_eq!(extract_detail("   "), None);
        assert!(extract_detail(r#"{"detail":[{"msg":"field required"}]}"#)
            .unwrap()
            .contains("field required"));
    }

    #[test]
    fn test_raw_response_inside_json_detail() {
        let body = r#"{"detail":"Failed to parse AI response|RAW_RESPONSE:{\"tracks\": ["}"#;
        let err = classify_fallback_failure(status(500, body));
        assert_eq!(
            err,
            GenerationError::FallbackDomain {
                message: "Failed to parse AI response".to_string(),
                raw_response: Some("{\"tracks\": [".to_string()),
            }
        );
    }

    #[test]
    fn test_raw_response_mentioning_expiry_keeps_diagnostic() {
        let body = r#"{"detail":"Failed to parse AI response|RAW_RESPONSE:{\"reason\": \"token expired\"}"}"#;
        let err = classify_fallback_failure(status(500, body));
        assert_eq!(
            err,
            GenerationError::FallbackDomain {
                message: "Failed to parse AI response".to_string(),
                raw_response: Some("{\"reason\": \"token expired\"}".to_string()),
            }
        );
        assert!(!err.is_credential_expired());

        // the sentinel wins over the status code too
        let err = classify_fallback_failure(status(401, body));
        assert_eq!(err.raw_response(), Some("{\"reason\": \"token expired\"}"));
    }

    #[test]
    fn test_fallback_messages_are_made_friendly() {
        let generate = classify_fallback_failure(status(500, r#"{"detail":"Failed to generate track suggestions"}"#));
        assert!(generate.to_string().starts_with("Unable to generate playlist suggestions"));

        let search = classify_fallback_failure(status(500, r#"{"detail":"Failed to search Spotify: 503"}"#));
        assert!(search.to_string().starts_with("Unable to search Spotify"));

        let other = classify_fallback_failure(status(500, r#"{"detail":"OpenAI key missing"}"#));
        assert_eq!(other.to_string(), "OpenAI key missing");
        assert_eq!(other.raw_response(), None);

        let empty = classify_fallback_failure(status(500, ""));
        assert!(empty.to_string().starts_with("Unable to generate playlist suggestions"));
    }

    #[test]
    fn test_expiry_detection() {
        assert!(classify_fallback_failure(status(401, "{}")).is_credential_expired());
        assert!(classify_fallback_failure(status(500, "Spotify token expired or invalid")).is_credential_expired());
        assert!(!classify_fallback_failure(status(500, "Spotify Token Expired")).is_credential_expired());
        assert!(classify_commit_failure(status(401, "")).is_credential_expired());
        assert!(
            classify_commit_failure(status(500, r#"{"detail":"token expired or invalid"}"#))
                .is_credential_expired()
        );
        assert_eq!(
            classify_commit_failure(status(500, "")),
            GenerationError::Commit("Failed to create playlist".to_string())
        );
    }

    #[test]
    fn test_transport_failures() {
        let err = classify_fallback_failure(BackendError::Transport("timed out".to_string()));
        assert!(matches!(err, GenerationError::FallbackTransport(ref m) if m.contains("timed out")));

        let err = classify_fallback_failure(BackendError::Decode("missing field `tracks`".to_string()));
        assert!(matches!(err, GenerationError::FallbackTransport(_)));

        let err = classify_commit_failure(BackendError::Transport("dns failure".to_string()));
        assert!(matches!(err, GenerationError::Commit(ref m) if m.contains("dns failure")));
    }
}
