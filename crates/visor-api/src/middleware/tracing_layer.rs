//! # Request/Response Tracing
//!
//! `tower_http::trace::TraceLayer` with a span that never records a
//! credential. Query strings are dropped and the credential segment of
//! document links is replaced by its fingerprint.

use axum::http::{Request, Uri};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Span;
use visor_token::fingerprint;

const DOCUMENT_PREFIX: &str = "/api/pdf/v2/";

#[derive(Debug, Clone, Copy, Default)]
pub struct RedactingMakeSpan;

impl<B> MakeSpan<B> for RedactingMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %redacted_path(request.uri()),
        )
    }
}

pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RedactingMakeSpan> {
    TraceLayer::new_for_http().make_span_with(RedactingMakeSpan)
}

/// Request path safe to log.
pub fn redacted_path(uri: &Uri) -> String {
    let path = uri.path();
    match path.strip_prefix(DOCUMENT_PREFIX) {
        Some(rest) => {
            let credential = rest.trim_end_matches('/');
            if credential.is_empty() {
                path.to_string()
            } else {
                format!("{DOCUMENT_PREFIX}[{}]/", fingerprint(credential))
            }
        }
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_constructs_without_panic() {
        let _layer = layer();
    }

    #[test]
    fn query_strings_are_dropped() {
        let uri: Uri = "/api/validate-access/?token=secret-credential".parse().unwrap();
        assert_eq!(redacted_path(&uri), "/api/validate-access/");
    }

    #[test]
    fn document_credentials_are_fingerprinted() {
        let uri: Uri = "/api/pdf/v2/secret-credential/".parse().unwrap();
        let logged = redacted_path(&uri);
        assert!(!logged.contains("secret-credential"));
        assert_eq!(
            logged,
            format!("/api/pdf/v2/[{}]/", fingerprint("secret-credential"))
        );
    }
}
