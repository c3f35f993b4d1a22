// Mapping of ureq failures onto backend errors

use crate::client::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{BackendError, GenerationError, classify_fallback_failure};

    fn status_failure(code: u16, body: &str) -> ureq::Error {
        let response = ureq::Response::new(code, "Error", body).unwrap();
        ureq::Error::Status(code, response)
    }

    #[test]
    fn test_status_error_keeps_body() {
        let body = r#"{"detail":"Failed to parse AI response|RAW_RESPONSE:[1, 2"}"#;
        match into_backend_error(status_failure(500, body)) {
            BackendError::Status { code, body: kept } => {
                assert_eq!(code, 500);
                assert_eq!(kept, body);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_error_body_classifies_to_default() {
        let error = into_backend_error(status_failure(502, ""));
        let classified = classify_fallback_failure(error);
        assert!(matches!(classified, GenerationError::FallbackDomain { raw_response: None, .. }));
        assert!(classified.to_string().starts_with("Unable to generate playlist suggestions"));
    }
}
