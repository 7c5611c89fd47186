//! # Integration Tests for visor-api
//!
//! Drives the full router: issuance behind the API key, access validation,
//! listing with minted document links, document retrieval, expiry through
//! a manual clock, upstream failures, and the audit trail.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use tower::ServiceExt;

use visor_api::audit::{AuditAction, AuditLog};
use visor_api::config::AppConfig;
use visor_api::gate::OutcomeKind;
use visor_api::state::AppState;
use visor_report::{InMemoryReportStore, Report, ReportError, ReportStore, ReportSummary};
use visor_token::{Grant, ManualClock, TokenCodec, TokenKey, DEFAULT_TTL_SECS};

const T0: i64 = 1_760_000_000;
const SUBJECT: &str = "9895722-7";
const API_KEY: &str = "admin-secret";

struct Harness {
    app: axum::Router,
    clock: Arc<ManualClock>,
    codec: Arc<TokenCodec>,
    audit: AuditLog,
}

fn report(document_ref: &str, subject: &str, day: u32) -> Report {
    Report {
        document_ref: document_ref.into(),
        subject: subject.into(),
        patient_name: "Ana Rojas".into(),
        service: "GASTROENTEROLOGIA".into(),
        physician: "Dr. Soto".into(),
        validated_at: NaiveDate::from_ymd_opt(2025, 10, day)
            .and_then(|d| d.and_hms_opt(14, 32, 0)),
        clinical_history: "Dolor epigástrico".into(),
        macroscopic_exam: String::new(),
        microscopic_exam: String::new(),
        diagnostic_conclusion: "- Gastritis cr\\'f3nica".into(),
        complementary_report: String::new(),
        techniques: vec!["HE".into(), "Giemsa".into()],
    }
}

fn sample_store() -> InMemoryReportStore {
    InMemoryReportStore::with_reports([
        report("B24-0900", SUBJECT, 1),
        report("B24-1187", SUBJECT, 7),
        report("B24-2000", "1111111-1", 9),
    ])
}

fn harness_with(config: AppConfig, store: Arc<dyn ReportStore>) -> Harness {
    let clock = Arc::new(ManualClock::new(T0));
    let state = AppState::with_clock(&config, store, clock.clone());
    let codec = state.codec.clone();
    let audit = state.audit.clone();
    Harness {
        app: visor_api::app(state),
        clock,
        codec,
        audit,
    }
}

fn harness() -> Harness {
    let config = AppConfig::new(TokenKey::from_bytes([17u8; 32])).with_issuance_key(API_KEY);
    harness_with(config, Arc::new(sample_store()))
}

async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn get(app: &axum::Router, uri: &str) -> Response<Body> {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn issue(app: &axum::Router, api_key: Option<&str>, body: &str) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/access-token/")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn mint_access(h: &Harness) -> String {
    let response = issue(&h.app, Some(API_KEY), &format!(r#"{{"rut":"{SUBJECT}"}}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

struct FailingStore;

#[async_trait]
impl ReportStore for FailingStore {
    async fn list_for_subject(&self, _subject: &str) -> Result<Vec<ReportSummary>, ReportError> {
        Err(ReportError::Unavailable("connection refused".into()))
    }

    async fn fetch(&self, _subject: &str, _doc: &str) -> Result<Option<Report>, ReportError> {
        Err(ReportError::Unavailable("connection refused".into()))
    }
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_health_probes() {
    let h = harness();
    let live = get(&h.app, "/health/liveness").await;
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(body_bytes(live).await, b"ok");

    let ready = get(&h.app, "/health/readiness").await;
    assert_eq!(ready.status(), StatusCode::OK);
    assert_eq!(body_bytes(ready).await, b"ready");
}

#[tokio::test]
async fn test_metrics_endpoint_without_recorder_is_404() {
    let h = harness();
    assert_eq!(get(&h.app, "/metrics").await.status(), StatusCode::NOT_FOUND);
}

// -- Issuance -----------------------------------------------------------------

#[tokio::test]
async fn test_issue_access_token() {
    let config = AppConfig::new(TokenKey::from_bytes([17u8; 32]))
        .with_issuance_key(API_KEY)
        .with_public_base_url("https://informes.example.cl");
    let h = harness_with(config, Arc::new(sample_store()));

    let response = issue(&h.app, Some(API_KEY), r#"{"rut":" 9895722-7 "}"#).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["expires_in_seconds"], 86_400);
    let token = json["token"].as_str().unwrap();
    assert_eq!(
        json["url"],
        format!("https://informes.example.cl/?token={token}")
    );

    let payload = h
        .codec
        .decode(token, visor_token::Purpose::Access, DEFAULT_TTL_SECS)
        .unwrap();
    assert_eq!(payload.subject, SUBJECT);
    assert_eq!(payload.issued_at, T0);
}

#[tokio::test]
async fn test_issue_link_uses_host_header_by_default() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/api/access-token/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::HOST, "10.8.1.20:8080")
        .header("X-API-Key", API_KEY)
        .body(Body::from(r#"{"rut":"9895722-7"}"#))
        .unwrap();
    let json = body_json(send(&h.app, request).await).await;
    assert!(json["url"]
        .as_str()
        .unwrap()
        .starts_with("http://10.8.1.20:8080/?token="));
}

#[tokio::test]
async fn test_issue_requires_api_key() {
    let h = harness();
    for key in [None, Some("wrong"), Some("")] {
        let response = issue(&h.app, key, r#"{"rut":"9895722-7"}"#).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{key:?}");
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json.get("token").is_none());
    }
}

#[tokio::test]
async fn test_issue_disabled_without_configured_key() {
    let config = AppConfig::new(TokenKey::from_bytes([17u8; 32]));
    let h = harness_with(config, Arc::new(sample_store()));
    let response = issue(&h.app, Some(API_KEY), r#"{"rut":"9895722-7"}"#).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_issue_rejects_missing_or_blank_rut() {
    let h = harness();
    for body in [r#"{}"#, r#"{"rut":""}"#, r#"{"rut":"   "}"#, "not json", r#"{"rut":42}"#] {
        let response = issue(&h.app, Some(API_KEY), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
}

// -- Validation ---------------------------------------------------------------

#[tokio::test]
async fn test_end_to_end_access_lifecycle() {
    let h = harness();
    let token = mint_access(&h).await;

    let response = get(&h.app, &format!("/api/validate-access/?token={token}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"valid": true, "rut": SUBJECT})
    );

    h.clock.advance(DEFAULT_TTL_SECS - 1);
    let response = get(&h.app, &format!("/api/validate-access/?token={token}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    h.clock.advance(2);
    let response = get(&h.app, &format!("/api/validate-access/?token={token}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({"valid": false, "error": "invalid or expired token"})
    );
}

#[tokio::test]
async fn test_document_credential_rejected_by_validation() {
    let h = harness();
    let credential = h.codec.encode(&Grant::document(SUBJECT, "B24-1187")).unwrap();
    let response = get(&h.app, &format!("/api/validate-access/?token={credential}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["valid"], false);
}

#[tokio::test]
async fn test_validation_failures_are_indistinguishable() {
    let h = harness();
    let token = mint_access(&h).await;
    let mut tampered = token.clone().into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let mut bodies = Vec::new();
    for uri in [
        "/api/validate-access/".to_string(),
        "/api/validate-access/?token=".to_string(),
        "/api/validate-access/?token=garbage".to_string(),
        format!("/api/validate-access/?token={tampered}"),
    ] {
        let response = get(&h.app, &uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        bodies.push(body_bytes(response).await);
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
}

// -- Listing & Documents ------------------------------------------------------

#[tokio::test]
async fn test_listing_mints_document_links() {
    let h = harness();
    let token = mint_access(&h).await;

    let response = get(&h.app, &format!("/api/reports/?token={token}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let entries = body_json(response).await;
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);

    let first = &entries[0];
    assert_eq!(first["id"], 1);
    assert_eq!(first["numero_biopsia"], "B24-1187");
    assert_eq!(first["nombre"], "Ana Rojas");
    assert_eq!(first["rut"], SUBJECT);
    assert_eq!(first["servicio"], "GASTROENTEROLOGIA");
    assert_eq!(first["medico"], "Dr. Soto");
    assert_eq!(first["fecha"], "07/10/2025 14:32");
    assert_eq!(entries[1]["numero_biopsia"], "B24-0900");

    let url = first["url"].as_str().unwrap();
    let path = url.strip_prefix("http://localhost").unwrap();
    assert!(path.starts_with("/api/pdf/v2/"));
    assert!(!path.contains(SUBJECT) && !path.contains("B24-1187"));

    let response = send(
        &h.app,
        Request::builder()
            .uri(path)
            .header(header::ORIGIN, "https://visor.example.cl")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "inline; filename=\"informe_B24-1187.html\""
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("B24-1187"));
    assert!(html.contains("<li>Gastritis crónica</li>"));
}

#[tokio::test]
async fn test_listing_requires_access_credential() {
    let h = harness();
    let document = h.codec.encode(&Grant::document(SUBJECT, "B24-1187")).unwrap();
    for uri in [
        "/api/reports/".to_string(),
        format!("/api/reports/?token={document}"),
    ] {
        let response = get(&h.app, &uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_document_link_failures_are_uniform_400() {
    let h = harness();
    let access = mint_access(&h).await;
    let expired = h.codec.encode(&Grant::document(SUBJECT, "B24-1187")).unwrap();

    let mut messages = Vec::new();
    for credential in [access.as_str(), "garbage", "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"] {
        let response = get(&h.app, &format!("/api/pdf/v2/{credential}/")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{credential}");
        messages.push(body_json(response).await["error"]["message"].clone());
    }

    h.clock.advance(DEFAULT_TTL_SECS + 1);
    let response = get(&h.app, &format!("/api/pdf/v2/{expired}/")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    messages.push(body_json(response).await["error"]["message"].clone());

    assert!(messages.iter().all(|m| m == "link invalid or expired"));
}

#[tokio::test]
async fn test_document_for_unknown_report_is_404() {
    let h = harness();
    let credential = h.codec.encode(&Grant::document(SUBJECT, "B99-0001")).unwrap();
    let response = get(&h.app, &format!("/api/pdf/v2/{credential}/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_document_of_another_subject_is_404() {
    let h = harness();
    // B24-2000 belongs to 1111111-1.
    let credential = h.codec.encode(&Grant::document(SUBJECT, "B24-2000")).unwrap();
    let response = get(&h.app, &format!("/api/pdf/v2/{credential}/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_failure_is_503_not_credential_failure() {
    let config = AppConfig::new(TokenKey::from_bytes([17u8; 32])).with_issuance_key(API_KEY);
    let h = harness_with(config, Arc::new(FailingStore));
    let token = mint_access(&h).await;

    let response = get(&h.app, &format!("/api/reports/?token={token}")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "UPSTREAM_UNAVAILABLE");
    assert!(!json.to_string().contains("connection refused"));

    let document = h.codec.encode(&Grant::document(SUBJECT, "B24-1187")).unwrap();
    let response = get(&h.app, &format!("/api/pdf/v2/{document}/")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_reports_loaded_from_seed_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[{{"document_ref":"B25-0001","subject":"{SUBJECT}","patient_name":"Ana Rojas"}}]"#
    )
    .unwrap();
    let store = InMemoryReportStore::load_json(file.path()).unwrap();
    let config = AppConfig::new(TokenKey::from_bytes([17u8; 32])).with_issuance_key(API_KEY);
    let h = harness_with(config, Arc::new(store));
    let token = mint_access(&h).await;

    let entries = body_json(get(&h.app, &format!("/api/reports/?token={token}")).await).await;
    assert_eq!(entries[0]["numero_biopsia"], "B25-0001");
    assert_eq!(entries[0]["fecha"], "");
}

// -- Audit Trail --------------------------------------------------------------

#[tokio::test]
async fn test_audit_trail_records_gate_decisions() {
    let h = harness();
    let token = mint_access(&h).await;

    let request = Request::builder()
        .uri(format!("/api/validate-access/?token={token}"))
        .header("X-Forwarded-For", "10.0.0.7, 172.16.0.1")
        .header(header::USER_AGENT, "Mozilla/5.0")
        .body(Body::empty())
        .unwrap();
    send(&h.app, request).await;
    get(&h.app, "/api/pdf/v2/garbage/").await;

    let events = h.audit.recent(10);
    assert_eq!(events.len(), 2);

    let denied = &events[0];
    assert_eq!(denied.action, AuditAction::DocumentView);
    assert_eq!(denied.outcome, OutcomeKind::Invalid);
    assert!(denied.subject.is_none());

    let granted = &events[1];
    assert_eq!(granted.action, AuditAction::Access);
    assert_eq!(granted.outcome, OutcomeKind::Ok);
    assert_eq!(granted.subject.as_deref(), Some(SUBJECT));
    assert_eq!(granted.client_ip.as_deref(), Some("10.0.0.7"));
    assert_eq!(granted.user_agent.as_deref(), Some("Mozilla/5.0"));
    assert_eq!(
        granted.fingerprint.as_deref(),
        Some(visor_token::fingerprint(&token).as_str())
    );
}
