//! HTTP surface of the consultation service. Thin by construction: handlers
//! load state, delegate to the agent runtime or the calculation engine, and
//! persist the outcome. No grant math lives here.

use std::collections::BTreeSet;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use grantline_agent::messages::MessageComposer;
use grantline_core::calculator::{calculate, CalculationResult};
use grantline_core::domain::consultation::{
    ConsultationId, ConsultationRecord, MarketingChannel, ProjectType,
};
use grantline_core::domain::session::{
    ChatMessage, ChatSession, MessageRole, SessionId,
};
use grantline_core::errors::{ApplicationError, DomainError, InterfaceError};
use grantline_core::intents::{self, FieldUpdate, UpdateIntent};
use grantline_core::progress::{next_action, Action};
use grantline_core::export::export_rows;
use grantline_core::registry;
use grantline_db::RepositoryError;

use crate::auth::AuthUser;
use crate::bootstrap::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/subsidy/chat", post(chat))
        .route("/api/subsidy/sessions", get(list_sessions))
        .route("/api/subsidy/sessions/latest", get(latest_session))
        .route("/api/subsidy/sessions/new", post(new_session))
        .route("/api/subsidy/sessions/{id}/messages", get(session_messages))
        .route("/api/subsidy/consultations/{session_id}", get(get_consultation))
        .route("/api/subsidy/consultations/{session_id}/export", get(export_consultation))
        .route("/api/subsidy/calculate", post(calculate_standalone))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized { detail: String },
    NotFound,
    Interface(InterfaceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized { detail } => {
                warn!(event_name = "api.auth.rejected", detail = %detail, "request rejected");
                let body = serde_json::json!({ "error": "Authentication required." });
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            Self::NotFound => {
                let body = serde_json::json!({ "error": "Not found." });
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            Self::Interface(interface) => {
                let (status, correlation_id) = match &interface {
                    InterfaceError::BadRequest { correlation_id, .. } => {
                        (StatusCode::BAD_REQUEST, correlation_id.clone())
                    }
                    InterfaceError::ServiceUnavailable { correlation_id, .. } => {
                        (StatusCode::SERVICE_UNAVAILABLE, correlation_id.clone())
                    }
                    InterfaceError::Internal { correlation_id, .. } => {
                        (StatusCode::INTERNAL_SERVER_ERROR, correlation_id.clone())
                    }
                };
                error!(
                    event_name = "api.request.failed",
                    correlation_id = %correlation_id,
                    error = %interface,
                    "request failed"
                );
                let body = serde_json::json!({
                    "error": interface.user_message(),
                    "correlation_id": correlation_id,
                });
                (status, Json(body)).into_response()
            }
        }
    }
}

pub(crate) fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn persistence(error: RepositoryError, correlation_id: &str) -> ApiError {
    ApiError::Interface(
        ApplicationError::Persistence(error.to_string()).into_interface(correlation_id),
    )
}

fn bad_request(message: impl Into<String>, correlation_id: &str) -> ApiError {
    ApiError::Interface(InterfaceError::BadRequest {
        message: message.into(),
        correlation_id: correlation_id.to_string(),
    })
}

fn internal(message: impl Into<String>, correlation_id: &str) -> ApiError {
    ApiError::Interface(InterfaceError::Internal {
        message: message.into(),
        correlation_id: correlation_id.to_string(),
    })
}

/// Load a session and enforce ownership. Foreign sessions are
/// indistinguishable from absent ones.
async fn owned_session(
    state: &AppState,
    user: &AuthUser,
    session_id: &SessionId,
    correlation_id: &str,
) -> Result<ChatSession, ApiError> {
    state
        .sessions
        .find_by_id(session_id)
        .await
        .map_err(|error| persistence(error, correlation_id))?
        .filter(|session| session.user_id == user.0.id)
        .ok_or(ApiError::NotFound)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    #[serde(flatten)]
    pub action: Action,
    pub completed: bool,
    pub fields_answered: usize,
    pub fields_total: usize,
}

async fn chat(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let now = Utc::now();

    if request.message.trim().is_empty() {
        return Err(bad_request("message must not be empty", &correlation_id));
    }

    let mut session = match &request.session_id {
        Some(id) => owned_session(&state, &user, &SessionId(id.clone()), &correlation_id).await?,
        None => {
            let session = ChatSession::new(SessionId::generate(), user.0.id.clone(), now);
            let record =
                ConsultationRecord::new(ConsultationId::generate(), session.id.clone(), now);
            state
                .sessions
                .save(session.clone())
                .await
                .map_err(|error| persistence(error, &correlation_id))?;
            state
                .consultations
                .save(record)
                .await
                .map_err(|error| persistence(error, &correlation_id))?;
            session
        }
    };

    let _turn_guard = state.locks.acquire(&session.id).await;

    let mut record = state
        .consultations
        .find_by_session(&session.id)
        .await
        .map_err(|error| persistence(error, &correlation_id))?
        .ok_or_else(|| internal("session has no consultation record", &correlation_id))?;

    let transcript = state
        .messages
        .list_for_session(&session.id)
        .await
        .map_err(|error| persistence(error, &correlation_id))?;

    state
        .messages
        .append(ChatMessage::new(
            session.id.clone(),
            MessageRole::User,
            request.message.as_str(),
            now,
        ))
        .await
        .map_err(|error| persistence(error, &correlation_id))?;

    let reply = state
        .runtime
        .handle_message(&mut record, &transcript, &request.message, now)
        .await
        .map_err(|error| {
            ApiError::Interface(
                ApplicationError::Integration(format!("{error:#}"))
                    .into_interface(correlation_id.clone()),
            )
        })?;

    let fields_total = registry::required_fields(record.project_type).len();
    let fields_answered = fields_total - registry::missing_fields(&record).len();

    state
        .consultations
        .save(record)
        .await
        .map_err(|error| persistence(error, &correlation_id))?;
    state
        .messages
        .append(ChatMessage::new(
            session.id.clone(),
            MessageRole::Assistant,
            reply.text.as_str(),
            now,
        ))
        .await
        .map_err(|error| persistence(error, &correlation_id))?;

    if reply.completed {
        session.mark_completed(now);
    } else {
        session.updated_at = now;
    }
    state
        .sessions
        .save(session.clone())
        .await
        .map_err(|error| persistence(error, &correlation_id))?;

    Ok(Json(ChatResponse {
        session_id: session.id.0,
        reply: reply.text,
        action: reply.action,
        completed: reply.completed,
        fields_answered,
        fields_total,
    }))
}

async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ChatSession>>, ApiError> {
    let correlation_id = new_correlation_id();
    let sessions = state
        .sessions
        .list_for_user(&user.0.id)
        .await
        .map_err(|error| persistence(error, &correlation_id))?;
    Ok(Json(sessions))
}

#[derive(Debug, Serialize)]
pub struct LatestSessionResponse {
    pub session: ChatSession,
    pub record: Option<ConsultationRecord>,
}

async fn latest_session(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<LatestSessionResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let session = state
        .sessions
        .find_latest_for_user(&user.0.id)
        .await
        .map_err(|error| persistence(error, &correlation_id))?
        .ok_or(ApiError::NotFound)?;
    let record = state
        .consultations
        .find_by_session(&session.id)
        .await
        .map_err(|error| persistence(error, &correlation_id))?;
    Ok(Json(LatestSessionResponse { session, record }))
}

#[derive(Debug, Default, Deserialize)]
pub struct NewSessionQuery {
    #[serde(default)]
    pub previous_session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub message: String,
}

async fn new_session(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NewSessionQuery>,
) -> Result<Json<NewSessionResponse>, ApiError> {
    let correlation_id = new_correlation_id();
    let now = Utc::now();

    let previous_record = match &query.previous_session_id {
        Some(id) => {
            let previous =
                owned_session(&state, &user, &SessionId(id.clone()), &correlation_id).await?;
            state
                .consultations
                .find_by_session(&previous.id)
                .await
                .map_err(|error| persistence(error, &correlation_id))?
        }
        None => None,
    };

    let session = ChatSession::new(SessionId::generate(), user.0.id.clone(), now);
    let record = match &previous_record {
        Some(source) => ConsultationRecord::carried_over_from(
            source,
            ConsultationId::generate(),
            session.id.clone(),
            now,
        ),
        None => ConsultationRecord::new(ConsultationId::generate(), session.id.clone(), now),
    };

    let message = match previous_record {
        None => MessageComposer::welcome(),
        Some(_) => {
            let lead = "Welcome back! I carried over the answers from your previous consultation.";
            match next_action(&record) {
                Action::AskField { field } => {
                    format!("{lead} {}", MessageComposer::question(field))
                }
                _ => format!("{lead}\n\n{}", MessageComposer::summary(&record)),
            }
        }
    };

    state
        .sessions
        .save(session.clone())
        .await
        .map_err(|error| persistence(error, &correlation_id))?;
    state
        .consultations
        .save(record)
        .await
        .map_err(|error| persistence(error, &correlation_id))?;
    state
        .messages
        .append(ChatMessage::new(
            session.id.clone(),
            MessageRole::Assistant,
            message.as_str(),
            now,
        ))
        .await
        .map_err(|error| persistence(error, &correlation_id))?;

    Ok(Json(NewSessionResponse { session_id: session.id.0, message }))
}

async fn session_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let correlation_id = new_correlation_id();
    let session = owned_session(&state, &user, &SessionId(id), &correlation_id).await?;
    let messages = state
        .messages
        .list_for_session(&session.id)
        .await
        .map_err(|error| persistence(error, &correlation_id))?;
    Ok(Json(messages))
}

async fn get_consultation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<ConsultationRecord>, ApiError> {
    let correlation_id = new_correlation_id();
    let session = owned_session(&state, &user, &SessionId(session_id), &correlation_id).await?;
    let record = state
        .consultations
        .find_by_session(&session.id)
        .await
        .map_err(|error| persistence(error, &correlation_id))?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(record))
}

async fn export_consultation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let correlation_id = new_correlation_id();
    let session = owned_session(&state, &user, &SessionId(session_id), &correlation_id).await?;
    let record = state
        .consultations
        .find_by_session(&session.id)
        .await
        .map_err(|error| persistence(error, &correlation_id))?
        .ok_or(ApiError::NotFound)?;

    let rows = export_rows(&record);
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(rows.iter().map(|row| row.key))
        .and_then(|_| writer.write_record(rows.iter().map(|row| row.value.as_str())))
        .map_err(|error| internal(format!("csv encoding failed: {error}"), &correlation_id))?;
    let bytes = writer
        .into_inner()
        .map_err(|error| internal(format!("csv encoding failed: {error}"), &correlation_id))?;

    let disposition = format!("attachment; filename=\"consultation-{}.csv\"", session.id.0);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Direct calculation without a conversation, for pre-filled data. This is
/// the one entry point where incomplete data is the caller's mistake.
#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub project_type: ProjectType,
    pub budget: i64,
    pub people: i64,
    pub capital: i64,
    pub revenue: i64,
    #[serde(default)]
    pub growth_revenue: Option<i64>,
    pub has_certification: bool,
    pub has_gov_award: bool,
    pub is_mit: bool,
    pub has_industry_academia: bool,
    pub has_factory_registration: bool,
    #[serde(default)]
    pub marketing_channels: BTreeSet<MarketingChannel>,
}

async fn calculate_standalone(
    State(_state): State<AppState>,
    _user: AuthUser,
    Json(request): Json<CalculateRequest>,
) -> Result<Json<CalculationResult>, ApiError> {
    let correlation_id = new_correlation_id();
    let now = Utc::now();

    let mut record = ConsultationRecord::new(
        ConsultationId::generate(),
        SessionId("standalone".to_string()),
        now,
    );

    // Same range checks the conversational path applies: negative amounts
    // and non-positive headcounts never reach the engine.
    let mut updates = vec![
        FieldUpdate::ProjectType(request.project_type),
        FieldUpdate::Budget(request.budget),
        FieldUpdate::People(request.people),
        FieldUpdate::Capital(request.capital),
        FieldUpdate::Revenue(request.revenue),
        FieldUpdate::HasCertification(request.has_certification),
        FieldUpdate::HasGovAward(request.has_gov_award),
        FieldUpdate::IsMit(request.is_mit),
        FieldUpdate::HasIndustryAcademia(request.has_industry_academia),
        FieldUpdate::HasFactoryRegistration(request.has_factory_registration),
    ];
    if let Some(growth_revenue) = request.growth_revenue {
        updates.push(FieldUpdate::GrowthRevenue(growth_revenue));
    }
    if !request.marketing_channels.is_empty() {
        updates.push(FieldUpdate::MarketingChannels(request.marketing_channels));
    }
    let batch: Vec<UpdateIntent> = updates.into_iter().map(UpdateIntent::SetField).collect();

    let outcome = intents::apply(&mut record, &batch);
    if !outcome.rejected.is_empty() {
        let names: Vec<&str> = outcome.rejected.iter().map(|r| r.field.as_str()).collect();
        return Err(bad_request(
            format!("invalid values for: {}", names.join(", ")),
            &correlation_id,
        ));
    }

    match calculate(&record) {
        Ok(result) => Ok(Json(result)),
        Err(DomainError::IncompleteData { missing }) => {
            let names: Vec<&str> = missing.iter().map(|field| field.as_str()).collect();
            Err(bad_request(format!("missing required fields: {}", names.join(", ")), &correlation_id))
        }
        Err(other) => Err(internal(other.to_string(), &correlation_id)),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use tower::util::ServiceExt;

    use grantline_core::domain::consultation::ProjectType;
    use grantline_core::intents::{FieldUpdate, UpdateIntent};

    use crate::auth::issue_token;
    use crate::bootstrap::AppState;
    use crate::testutil::test_state;

    fn set(update: FieldUpdate) -> UpdateIntent {
        UpdateIntent::SetField(update)
    }

    /// Every intent needed to complete an R&D consultation in one turn.
    fn full_rd_turn() -> Vec<UpdateIntent> {
        vec![
            set(FieldUpdate::ProjectType(ProjectType::ResearchAndDevelopment)),
            set(FieldUpdate::Budget(5_000_000)),
            set(FieldUpdate::People(20)),
            set(FieldUpdate::Capital(10_000_000)),
            set(FieldUpdate::Revenue(50_000_000)),
            set(FieldUpdate::HasCertification(true)),
            set(FieldUpdate::HasGovAward(false)),
            set(FieldUpdate::IsMit(true)),
            set(FieldUpdate::HasIndustryAcademia(true)),
            set(FieldUpdate::HasFactoryRegistration(false)),
            UpdateIntent::Confirm { confirmed: true },
        ]
    }

    fn app(state: &AppState) -> Router {
        super::router(state.clone())
    }

    async fn send(
        router: Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request should build"),
            None => builder.body(Body::empty()).expect("request should build"),
        };

        let response = router.oneshot(request).await.expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable")
            .to_vec();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json, bytes)
    }

    #[tokio::test]
    async fn chat_requires_a_bearer_token() {
        let state = test_state(vec![]);
        let (status, _, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/chat",
            None,
            Some(serde_json::json!({ "message": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_without_session_creates_one_and_asks_the_first_field() {
        let state = test_state(vec![vec![]]);
        let token = issue_token(&state, "u-1", "alice");

        let (status, json, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/chat",
            Some(&token),
            Some(serde_json::json!({ "message": "hi there" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["action"], "ask_field");
        assert_eq!(json["field"], "project_type");
        assert_eq!(json["completed"], false);
        assert_eq!(json["fields_answered"], 0);
        assert_eq!(json["fields_total"], 10);
        let session_id = json["session_id"].as_str().expect("session id").to_string();

        // Transcript holds the user message and the assistant reply.
        let (status, messages, _) = send(
            app(&state),
            "GET",
            &format!("/api/subsidy/sessions/{session_id}/messages"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let messages = messages.as_array().expect("array").clone();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
    }

    #[tokio::test]
    async fn full_conversation_completes_and_exports_csv() {
        let state = test_state(vec![full_rd_turn()]);
        let token = issue_token(&state, "u-1", "alice");

        let (status, json, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/chat",
            Some(&token),
            Some(serde_json::json!({ "message": "all the answers at once, confirmed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["completed"], true);
        let session_id = json["session_id"].as_str().expect("session id").to_string();

        let (status, record, _) = send(
            app(&state),
            "GET",
            &format!("/api/subsidy/consultations/{session_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "COMPLETED");
        assert_eq!(record["grant_max"], 3_700_000);
        assert_eq!(record["grant_min"], 2_775_000);

        let (status, _, bytes) = send(
            app(&state),
            "GET",
            &format!("/api/subsidy/consultations/{session_id}/export"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let csv = String::from_utf8(bytes).expect("csv should be utf-8");
        let mut lines = csv.lines();
        let header = lines.next().expect("header row");
        let values = lines.next().expect("value row");
        assert!(header.starts_with("consultation_id,session_id,status"));
        assert!(values.contains("3700000"));
        assert!(values.contains("2775000"));

        // The session itself is closed out and its record rides along.
        let (status, latest, _) = send(
            app(&state),
            "GET",
            "/api/subsidy/sessions/latest",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["session"]["status"], "COMPLETED");
        assert_eq!(latest["record"]["grant_max"], 3_700_000);
    }

    #[tokio::test]
    async fn sessions_are_invisible_to_other_users() {
        let state = test_state(vec![vec![]]);
        let owner = issue_token(&state, "u-1", "alice");
        let intruder = issue_token(&state, "u-2", "mallory");

        let (_, json, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/chat",
            Some(&owner),
            Some(serde_json::json!({ "message": "hi" })),
        )
        .await;
        let session_id = json["session_id"].as_str().expect("session id").to_string();

        for uri in [
            format!("/api/subsidy/sessions/{session_id}/messages"),
            format!("/api/subsidy/consultations/{session_id}"),
            format!("/api/subsidy/consultations/{session_id}/export"),
        ] {
            let (status, _, _) = send(app(&state), "GET", &uri, Some(&intruder), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri} should be hidden");
        }

        let (status, _, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/chat",
            Some(&intruder),
            Some(serde_json::json!({ "session_id": session_id, "message": "mine now" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn latest_session_is_not_found_before_any_chat() {
        let state = test_state(vec![]);
        let token = issue_token(&state, "u-1", "alice");
        let (status, _, _) =
            send(app(&state), "GET", "/api/subsidy/sessions/latest", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn new_session_carries_over_previous_answers() {
        let state = test_state(vec![vec![
            set(FieldUpdate::ProjectType(ProjectType::ResearchAndDevelopment)),
            set(FieldUpdate::Budget(5_000_000)),
        ]]);
        let token = issue_token(&state, "u-1", "alice");

        let (_, json, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/chat",
            Some(&token),
            Some(serde_json::json!({ "message": "R&D, budget 500 wan" })),
        )
        .await;
        let previous = json["session_id"].as_str().expect("session id").to_string();

        let (status, json, _) = send(
            app(&state),
            "POST",
            &format!("/api/subsidy/sessions/new?previous_session_id={previous}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let new_session = json["session_id"].as_str().expect("session id").to_string();
        assert_ne!(new_session, previous);
        assert!(json["message"].as_str().expect("message").contains("carried over"));

        let (status, record, _) = send(
            app(&state),
            "GET",
            &format!("/api/subsidy/consultations/{new_session}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["budget"], 5_000_000);
        assert_eq!(record["data_confirmed"], false);
        assert_eq!(record["status"], "COLLECTING");
    }

    #[tokio::test]
    async fn standalone_calculation_returns_the_grant_range() {
        let state = test_state(vec![]);
        let token = issue_token(&state, "u-1", "alice");

        let (status, json, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/calculate",
            Some(&token),
            Some(serde_json::json!({
                "project_type": "RESEARCH_AND_DEVELOPMENT",
                "budget": 5_000_000,
                "people": 20,
                "capital": 10_000_000,
                "revenue": 50_000_000,
                "has_certification": true,
                "has_gov_award": false,
                "is_mit": true,
                "has_industry_academia": true,
                "has_factory_registration": false
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["grant_max"], 3_700_000);
        assert_eq!(json["grant_min"], 2_775_000);
    }

    #[tokio::test]
    async fn standalone_calculation_rejects_negative_and_zero_inputs() {
        let state = test_state(vec![]);
        let token = issue_token(&state, "u-1", "alice");

        let (status, json, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/calculate",
            Some(&token),
            Some(serde_json::json!({
                "project_type": "RESEARCH_AND_DEVELOPMENT",
                "budget": -5_000_000,
                "people": -5,
                "capital": 10_000_000,
                "revenue": 50_000_000,
                "has_certification": false,
                "has_gov_award": false,
                "is_mit": false,
                "has_industry_academia": false,
                "has_factory_registration": false
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = json["error"].as_str().expect("error message");
        assert!(message.contains("budget"));
        assert!(message.contains("people"));
    }

    #[tokio::test]
    async fn standalone_calculation_survives_oversized_headcount() {
        let state = test_state(vec![]);
        let token = issue_token(&state, "u-1", "alice");

        let (status, json, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/calculate",
            Some(&token),
            Some(serde_json::json!({
                "project_type": "RESEARCH_AND_DEVELOPMENT",
                "budget": 5_000_000,
                "people": i64::MAX,
                "capital": 10_000_000,
                "revenue": 50_000_000,
                "has_certification": false,
                "has_gov_award": false,
                "is_mit": false,
                "has_industry_academia": false,
                "has_factory_registration": false
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let grant_max = json["grant_max"].as_i64().expect("grant max");
        assert!(grant_max > 0);
        assert!(grant_max <= 4_500_000);
    }

    #[tokio::test]
    async fn standalone_calculation_rejects_incomplete_marketing_data() {
        let state = test_state(vec![]);
        let token = issue_token(&state, "u-1", "alice");

        let (status, json, _) = send(
            app(&state),
            "POST",
            "/api/subsidy/calculate",
            Some(&token),
            Some(serde_json::json!({
                "project_type": "MARKETING",
                "budget": 2_000_000,
                "people": 10,
                "capital": 5_000_000,
                "revenue": 20_000_000,
                "has_certification": false,
                "has_gov_award": false,
                "is_mit": false,
                "has_industry_academia": false,
                "has_factory_registration": false
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["correlation_id"].is_string());
    }
}
