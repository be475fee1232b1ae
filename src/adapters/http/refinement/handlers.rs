//! HTTP handlers for refinement endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::{handle_refinement_error, ErrorResponse};
use crate::application::{
    AcceptSuggestionsCommand, FinalizeCommand, RefinementOrchestrator, SubmitAnswersCommand,
};
use crate::domain::foundation::SessionId;
use crate::domain::refinement::{RefinementPhase, RefinementRequest};

use super::dto::{
    AcceptSuggestionsRequest, AcceptSuggestionsResponse, FinalizeRequest, FinalizeResponse,
    MessageResponse, SessionResponse, SubmitAnswersRequest,
};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct RefinementHandlers {
    orchestrator: Arc<RefinementOrchestrator>,
}

impl RefinementHandlers {
    pub fn new(orchestrator: Arc<RefinementOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// GET /ping - Liveness check
pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "pong".to_string(),
    })
}

/// POST /api/refine/start - Open a session and get the first questions
pub async fn start_refinement(
    State(handlers): State<RefinementHandlers>,
    Json(req): Json<RefinementRequest>,
) -> Response {
    match handlers.orchestrator.start(req).await {
        Ok(session) => (StatusCode::OK, Json(SessionResponse::from(session))).into_response(),
        Err(e) => handle_refinement_error(e),
    }
}

/// POST /api/refine/submit_answers_and_continue
pub async fn submit_answers_and_continue(
    State(handlers): State<RefinementHandlers>,
    Json(req): Json<SubmitAnswersRequest>,
) -> Response {
    let cmd = match submit_command(req) {
        Ok(cmd) => cmd,
        Err(response) => return response,
    };

    match handlers.orchestrator.submit_answers_and_continue(cmd).await {
        Ok(session) => (StatusCode::OK, Json(SessionResponse::from(session))).into_response(),
        Err(e) => handle_refinement_error(e),
    }
}

/// POST /api/refine/submit_answers_and_get_suggestions
pub async fn submit_answers_and_get_suggestions(
    State(handlers): State<RefinementHandlers>,
    Json(req): Json<SubmitAnswersRequest>,
) -> Response {
    let cmd = match submit_command(req) {
        Ok(cmd) => cmd,
        Err(response) => return response,
    };

    match handlers.orchestrator.submit_answers_and_get_suggestions(cmd).await {
        Ok(session) => (StatusCode::OK, Json(SessionResponse::from(session))).into_response(),
        Err(e) => handle_refinement_error(e),
    }
}

/// POST /api/refine/accept_suggestions
pub async fn accept_suggestions(
    State(handlers): State<RefinementHandlers>,
    Json(req): Json<AcceptSuggestionsRequest>,
) -> Response {
    let session_id = match parse_session_id(&req.session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let next_phase = match parse_phase(&req.next_phase) {
        Ok(phase) => phase,
        Err(response) => return response,
    };

    let cmd = AcceptSuggestionsCommand {
        session_id,
        accepted: req.accepted_suggestions,
        next_phase,
        additional_info: req.additional_info,
    };

    match handlers.orchestrator.accept_suggestions(cmd).await {
        Ok(result) => {
            let response = AcceptSuggestionsResponse {
                session: result.session.into(),
                previous_result: result.previous_accepted,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => handle_refinement_error(e),
    }
}

/// POST /api/refine/finalize
pub async fn finalize(
    State(handlers): State<RefinementHandlers>,
    Json(req): Json<FinalizeRequest>,
) -> Response {
    let session_id = match parse_session_id(&req.session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let current_phase = match req.current_phase.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match parse_phase(raw) {
            Ok(phase) => Some(phase),
            Err(response) => return response,
        },
    };

    let cmd = FinalizeCommand {
        session_id,
        current_phase,
        current_answers: req.current_answers,
        current_suggestion_keys: req.current_suggestions,
        modification_note: req.modification_suggestion,
    };

    match handlers.orchestrator.finalize(cmd).await {
        Ok(result) => (StatusCode::OK, Json(FinalizeResponse::from(result))).into_response(),
        Err(e) => handle_refinement_error(e),
    }
}

/// GET /api/refine/sessions/:id
pub async fn get_session(
    State(handlers): State<RefinementHandlers>,
    Path(session_id): Path<String>,
) -> Response {
    let session_id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match handlers.orchestrator.get(session_id).await {
        Ok(session) => (StatusCode::OK, Json(SessionResponse::from(session))).into_response(),
        Err(e) => handle_refinement_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Request parsing
// ════════════════════════════════════════════════════════════════════════════

fn submit_command(req: SubmitAnswersRequest) -> Result<SubmitAnswersCommand, Response> {
    Ok(SubmitAnswersCommand {
        session_id: parse_session_id(&req.session_id)?,
        answers: req.answers,
        additional_info: req.additional_info,
    })
}

fn parse_session_id(raw: &str) -> Result<SessionId, Response> {
    raw.trim().parse::<SessionId>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request("Invalid session ID")),
        )
            .into_response()
    })
}

fn parse_phase(raw: &str) -> Result<RefinementPhase, Response> {
    raw.parse::<RefinementPhase>().map_err(|e| {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::bad_request(e.to_string()))).into_response()
    })
}
