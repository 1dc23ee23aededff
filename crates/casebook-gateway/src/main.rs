//! Casebook gateway: REST API for case records, dashboard metrics and the
//! AI-assisted case services. Binds to `host:port` from `CaseConfig`.

mod handlers;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use casebook_core::models::{
    Act, CaseContext, Document, Entity, Event, GeneratedDocument, Information, Insight, Involvement, KnowledgeItem,
    Person, RiskFlags, Settings, Tag, Task, TimelineEvent,
};
use casebook_core::{AiGateway, CaseConfig, CaseStore};
use handlers::{ai, dashboard, records};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CaseConfig>,
    pub(crate) store: Arc<CaseStore>,
    /// Single throttled gateway shared by every request.
    pub(crate) ai: Arc<AiGateway>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match CaseConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    let store = match CaseStore::open_path(&config.storage_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, path = %config.storage_path, "could not open case store");
            std::process::exit(1);
        }
    };
    let ai = match AiGateway::from_config(&config) {
        Ok(ai) => ai,
        Err(e) => {
            tracing::error!(error = %e, "could not configure AI gateway");
            std::process::exit(1);
        }
    };

    let addr = config.bind_addr();
    let app = build_router(AppState {
        config: Arc::new(config),
        store: Arc::new(store),
        ai: Arc::new(ai),
    });

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "could not bind");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, version = casebook_core::version(), "Casebook gateway listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server stopped");
    }
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/documents", get(records::list::<Document>).post(records::upsert::<Document>))
        .route("/api/documents/:id", put(records::update::<Document>))
        .route("/api/entities", get(records::list::<Entity>).post(records::upsert::<Entity>))
        .route("/api/entities/:id", put(records::update::<Entity>))
        .route(
            "/api/knowledge",
            get(records::list::<KnowledgeItem>).post(records::upsert::<KnowledgeItem>),
        )
        .route("/api/knowledge/:id", put(records::update::<KnowledgeItem>))
        .route("/api/tags", get(records::list::<Tag>).post(records::upsert::<Tag>))
        .route(
            "/api/timeline",
            get(records::list::<TimelineEvent>).post(records::replace_timeline),
        )
        .route("/api/esf/events", get(records::list::<Event>).post(records::upsert::<Event>))
        .route("/api/esf/acts", get(records::list::<Act>).post(records::upsert::<Act>))
        .route("/api/esf/persons", get(records::list::<Person>).post(records::upsert::<Person>))
        .route(
            "/api/esf/involvements",
            get(records::list::<Involvement>).post(records::upsert::<Involvement>),
        )
        .route(
            "/api/esf/information",
            get(records::list::<Information>).post(records::upsert::<Information>),
        )
        .route("/api/tasks", get(records::list::<Task>).post(records::upsert::<Task>))
        .route("/api/insights", get(records::list::<Insight>).post(records::upsert::<Insight>))
        .route(
            "/api/generated",
            get(records::list::<GeneratedDocument>).post(records::upsert::<GeneratedDocument>),
        )
        .route("/api/activities", get(records::list_activities))
        .route(
            "/api/case-context",
            get(records::get_singleton::<CaseContext>).post(records::put_singleton::<CaseContext>),
        )
        .route(
            "/api/risk-flags",
            get(records::get_singleton::<RiskFlags>).post(records::put_singleton::<RiskFlags>),
        )
        .route(
            "/api/settings",
            get(records::get_singleton::<Settings>).post(records::put_singleton::<Settings>),
        )
        .route("/api/dashboard", get(dashboard::metrics))
        .route("/api/agents", get(ai::list_agents))
        .route("/api/ai/risk-assessment", post(ai::risk_assessment))
        .route("/api/ai/un-submission", post(ai::un_submission))
        .route("/api/ai/temporal-analysis", post(ai::temporal_analysis))
        .route("/api/ai/documents/:id/summarize", post(ai::summarize_document))
        .route("/api/ai/documents/:id/extract", post(ai::extract_document))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    tracing::info!(%method, %path, status = response.status().as_u16(), "request");
    response
}

async fn health() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use casebook_core::ai::{MockBackend, ThrottlePolicy};
    use casebook_core::models::AgentActivity;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(dir: &tempfile::TempDir, mock: Arc<MockBackend>) -> AppState {
        let config = CaseConfig {
            storage_path: dir.path().to_string_lossy().into_owned(),
            ..CaseConfig::default()
        };
        AppState {
            store: Arc::new(CaseStore::open_path(dir.path()).unwrap()),
            ai: Arc::new(AiGateway::new(
                mock,
                ThrottlePolicy::fixed(Duration::from_millis(1)),
                &config.model,
            )),
            config: Arc::new(config),
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir, Arc::new(MockBackend::new())));
        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn documents_upsert_list_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir, Arc::new(MockBackend::new())));

        let (status, body) = send(
            &app,
            "POST",
            "/api/documents",
            Some(json!([{ "id": "d1", "name": "witness.txt", "content": "Statement", "tags": ["witness"] }])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["saved"], 1);

        let (_, list) = send(&app, "GET", "/api/documents", None).await;
        assert_eq!(list[0]["name"], "witness.txt");
        assert_eq!(list[0]["mimeType"], "text/plain");
        assert_eq!(list[0]["tags"], json!(["witness"]));

        let (status, _) = send(
            &app,
            "PUT",
            "/api/documents/d1",
            Some(json!({ "id": "d1", "name": "witness-2.txt" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, list) = send(&app, "GET", "/api/documents", None).await;
        assert_eq!(list[0]["name"], "witness-2.txt");
    }

    #[tokio::test]
    async fn update_of_missing_record_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir, Arc::new(MockBackend::new())));
        let (status, body) = send(
            &app,
            "PUT",
            "/api/entities/ghost",
            Some(json!({ "id": "ghost", "name": "Nobody" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn put_with_mismatched_body_id_keeps_path_id() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir, Arc::new(MockBackend::new())));
        send(&app, "POST", "/api/entities", Some(json!([{ "id": "a", "name": "Witness" }]))).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/entities/a",
            Some(json!({ "id": "b", "name": "Witness (renamed)" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "a");

        send(&app, "POST", "/api/entities", Some(json!([{ "id": "b", "name": "Lawyer" }]))).await;
        let (_, list) = send(&app, "GET", "/api/entities", None).await;
        let mut ids: Vec<&str> = list.as_array().unwrap().iter().map(|e| e["id"].as_str().unwrap()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn timeline_post_replaces_collection() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir, Arc::new(MockBackend::new())));
        send(
            &app,
            "POST",
            "/api/timeline",
            Some(json!([{ "id": "t1", "date": "2024-01-01", "title": "Arrest" }])),
        )
        .await;
        send(
            &app,
            "POST",
            "/api/timeline",
            Some(json!([{ "id": "t2", "date": "2024-02-01", "title": "Hearing" }])),
        )
        .await;
        let (_, list) = send(&app, "GET", "/api/timeline", None).await;
        let ids: Vec<&str> = list.as_array().unwrap().iter().map(|t| t["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["t2"]);
    }

    #[tokio::test]
    async fn singletons_default_then_persist() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir, Arc::new(MockBackend::new())));
        let (_, flags) = send(&app, "GET", "/api/risk-flags", None).await;
        assert_eq!(flags, json!({ "immediateDanger": false, "underSurveillance": false }));

        send(
            &app,
            "POST",
            "/api/risk-flags",
            Some(json!({ "immediateDanger": true, "underSurveillance": false })),
        )
        .await;
        let (_, dash) = send(&app, "GET", "/api/dashboard", None).await;
        assert_eq!(dash["threatLevel"], "High");
    }

    #[tokio::test]
    async fn dashboard_groups_esf_events() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir, Arc::new(MockBackend::new())));
        send(
            &app,
            "POST",
            "/api/esf/events",
            Some(json!([
                { "id": "e1", "title": "Raid", "startDate": "2024-01-15", "geographicalTerm": "Aleppo" },
                { "id": "e2", "title": "Arrest", "startDate": "2024-01-20", "geographicalTerm": "Aleppo" }
            ])),
        )
        .await;
        let (status, dash) = send(&app, "GET", "/api/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dash["totalEvents"], 2);
        assert_eq!(dash["violationsOverTime"][0]["month"], "2024-01");
        assert_eq!(dash["violationsOverTime"][0]["count"], 2);
        assert_eq!(dash["geoHotspots"][0]["term"], "Aleppo");
        assert_eq!(dash["threatLevel"], "Low");
    }

    #[tokio::test]
    async fn risk_assessment_records_activity() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::with_replies([Ok(
            r#"{"overallLevel":"medium","summary":"Monitoring reported"}"#.to_string(),
        )]));
        let app = build_router(test_state(&dir, mock.clone()));
        send(
            &app,
            "POST",
            "/api/case-context",
            Some(json!({ "description": "Journalist held incommunicado" })),
        )
        .await;

        let (status, body) = send(&app, "POST", "/api/ai/risk-assessment", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agent"], "Risk Assessor");
        assert_eq!(body["result"]["overallLevel"], "medium");

        let prompt = match &mock.requests()[0].contents {
            casebook_core::ai::Contents::Text(t) => t.clone(),
            other => panic!("unexpected contents {other:?}"),
        };
        assert!(prompt.contains("Journalist held incommunicado"));

        let (_, activities) = send(&app, "GET", "/api/activities", None).await;
        let log: Vec<AgentActivity> = serde_json::from_value(activities).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, "risk_assessment");
    }

    #[tokio::test]
    async fn failed_ai_call_is_500_and_logged_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::with_replies([Err(casebook_core::GatewayError::Status {
            status: 429,
            body: "quota".into(),
        })]));
        let app = build_router(test_state(&dir, mock));

        let (status, body) = send(&app, "POST", "/api/ai/temporal-analysis", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "an error occurred" }));

        let (_, activities) = send(&app, "GET", "/api/activities", None).await;
        assert_eq!(activities[0]["status"], "failed");
        assert_eq!(activities[0]["agent"], "Timeline Analyst");
    }

    #[tokio::test]
    async fn un_submission_is_stored_as_generated_document() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::with_replies([Ok("To the Special Rapporteur...".to_string())]));
        let app = build_router(test_state(&dir, mock));

        let (status, body) = send(
            &app,
            "POST",
            "/api/ai/un-submission",
            Some(json!({ "mechanism": "special_procedures", "addressee": "SR on torture" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["kind"], "un_submission");

        let (_, generated) = send(&app, "GET", "/api/generated", None).await;
        assert_eq!(generated[0]["content"], "To the Special Rapporteur...");
    }

    #[tokio::test]
    async fn extraction_merges_into_collections() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::with_replies([Ok(r#"{
            "entities": [{"name": "Military Intelligence", "kind": "organization"}],
            "events": [{"date": "2023-11-02", "title": "Transfer to Branch 215"}]
        }"#
        .to_string())]));
        let app = build_router(test_state(&dir, mock));
        send(
            &app,
            "POST",
            "/api/documents",
            Some(json!([{ "id": "d1", "name": "letter.txt", "content": "..." }])),
        )
        .await;

        let (status, body) = send(&app, "POST", "/api/ai/documents/d1/extract", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["agent"], "Case Analyst");

        let (_, entities) = send(&app, "GET", "/api/entities", None).await;
        assert_eq!(entities[0]["kind"], "organization");
        let (_, timeline) = send(&app, "GET", "/api/timeline", None).await;
        let timeline: Vec<TimelineEvent> = serde_json::from_value(timeline).unwrap();
        assert_eq!(timeline[0].source_document_id.as_deref(), Some("d1"));
    }

    #[tokio::test]
    async fn summarize_saves_summary_and_missing_document_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::with_replies([Ok("  Short summary. ".to_string())]));
        let app = build_router(test_state(&dir, mock));
        send(
            &app,
            "POST",
            "/api/documents",
            Some(json!([{ "id": "d1", "name": "report.txt", "content": "Long report" }])),
        )
        .await;

        let (status, body) = send(&app, "POST", "/api/ai/documents/d1/summarize", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["summary"], "Short summary.");

        let (status, _) = send(&app, "POST", "/api/ai/documents/nope/summarize", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn agents_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir, Arc::new(MockBackend::new())));
        let (_, agents) = send(&app, "GET", "/api/agents", None).await;
        assert!(agents
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["name"] == "UN Advocate"));
    }
}
