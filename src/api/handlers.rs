use crate::aggregate::{SessionSummary, format_clock};
use crate::api::responses::{
    DisplayResponse, ErrorCode, ErrorResponse, EventEntry, EventsResponse, LeaderboardEntry,
    SelectionRequest, SessionStatusResponse, SummaryResponse,
};
use crate::driver::DriverHandle;
use crate::error::AppError;
use crate::scoring::FocusBand;
use crate::state::SessionState;
use crate::tracking::DistractionEvent;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

pub enum ApiResponse<T> {
    Success(T),
    Error {
        status: StatusCode,
        body: ErrorResponse,
    },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_display(State(driver): State<DriverHandle>) -> impl IntoResponse {
    build_display_response(&driver.snapshot(), SystemTime::now())
}

pub async fn get_events(State(driver): State<DriverHandle>) -> impl IntoResponse {
    build_events_response(&driver.snapshot(), SystemTime::now())
}

pub async fn get_summary(State(driver): State<DriverHandle>) -> impl IntoResponse {
    build_summary_response(&driver.snapshot(), SystemTime::now())
}

pub async fn get_session(State(driver): State<DriverHandle>) -> impl IntoResponse {
    build_session_response(&driver.snapshot(), SystemTime::now())
}

pub async fn post_start(
    State(driver): State<DriverHandle>,
) -> ApiResponse<SessionStatusResponse> {
    match driver.start().await {
        Ok(()) => build_session_response(&driver.snapshot(), SystemTime::now()),
        Err(err) => app_error_response(&err, SystemTime::now()),
    }
}

pub async fn post_stop(State(driver): State<DriverHandle>) -> ApiResponse<SessionStatusResponse> {
    match driver.stop().await {
        Ok(_summary) => build_session_response(&driver.snapshot(), SystemTime::now()),
        Err(err) => app_error_response(&err, SystemTime::now()),
    }
}

pub async fn post_reset(
    State(driver): State<DriverHandle>,
) -> ApiResponse<SessionStatusResponse> {
    match driver.reset_after_summary().await {
        Ok(()) => build_session_response(&driver.snapshot(), SystemTime::now()),
        Err(err) => app_error_response(&err, SystemTime::now()),
    }
}

pub async fn post_selection(
    State(driver): State<DriverHandle>,
    Json(request): Json<SelectionRequest>,
) -> ApiResponse<DisplayResponse> {
    match driver.select(request.person_id).await {
        Ok(()) => build_display_response(&driver.snapshot(), SystemTime::now()),
        Err(err) => app_error_response(&err, SystemTime::now()),
    }
}

fn build_display_response(state: &SessionState, now: SystemTime) -> ApiResponse<DisplayResponse> {
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("timestamp formatting failure"),
    };
    let display = state.display_data();

    ApiResponse::Success(DisplayResponse {
        band: FocusBand::of(display.score),
        label: display.label,
        score: display.score,
        average: display.average,
        history: display.history,
        timestamp,
    })
}

fn build_events_response(state: &SessionState, now: SystemTime) -> ApiResponse<EventsResponse> {
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("timestamp formatting failure"),
    };

    ApiResponse::Success(EventsResponse {
        events: state.event_log().iter().map(map_event).collect(),
        timestamp,
    })
}

fn build_summary_response(state: &SessionState, now: SystemTime) -> ApiResponse<SummaryResponse> {
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("timestamp formatting failure"),
    };

    match state.summary() {
        Some(summary) => ApiResponse::Success(map_summary(&summary, state, timestamp)),
        None => ApiResponse::Error {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse {
                error_code: ErrorCode::NoSummary,
                error_message: "No session summary available".to_string(),
                timestamp,
            },
        },
    }
}

fn build_session_response(
    state: &SessionState,
    now: SystemTime,
) -> ApiResponse<SessionStatusResponse> {
    let timestamp = match format_timestamp(now) {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("timestamp formatting failure"),
    };

    ApiResponse::Success(SessionStatusResponse {
        phase: state.phase,
        elapsed_secs: state.elapsed_secs,
        clock: format_clock(state.elapsed_secs),
        tracked: state.persons.len(),
        selected: state.selected,
        summary_available: state.summary().is_some(),
        timestamp,
    })
}

fn map_event(event: &DistractionEvent) -> EventEntry {
    EventEntry {
        time: event.time,
        clock: format_clock(event.time),
        person_id: event.person_id,
        label: event.label.clone(),
        message: format!("{}'s focus dropped.", event.label),
    }
}

fn map_summary(
    summary: &SessionSummary,
    state: &SessionState,
    timestamp: String,
) -> SummaryResponse {
    let leaderboard = summary
        .leaderboard()
        .into_iter()
        .map(|person| LeaderboardEntry {
            person_id: person.id,
            label: format!("{} {}", state.label_prefix, person.id),
            average_focus: person.average_focus,
            band: FocusBand::of(person.average_focus),
        })
        .collect();

    SummaryResponse {
        duration_secs: summary.duration_secs,
        duration_clock: format_clock(summary.duration_secs),
        overall_average: summary.overall_average,
        overall_band: FocusBand::of(summary.overall_average),
        leaderboard,
        events: summary.events.iter().map(map_event).collect(),
        timestamp,
    }
}

fn app_error_response<T>(err: &AppError, now: SystemTime) -> ApiResponse<T> {
    let (status, error_code) = match err {
        AppError::UnknownPerson(_) => (StatusCode::NOT_FOUND, ErrorCode::UnknownPerson),
        AppError::SessionActive => (StatusCode::CONFLICT, ErrorCode::SessionActive),
        AppError::DriverClosed => (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::DriverUnavailable),
    };
    warn!(error = %err, "Session request refused");

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Error {
            status,
            body: ErrorResponse {
                error_code,
                error_message: err.to_string(),
                timestamp,
            },
        },
        Err(_) => internal_error("timestamp formatting failure"),
    }
}

fn internal_error<T>(message: &str) -> ApiResponse<T> {
    error!(message = message, "Internal error while handling request");
    let formatted = format_timestamp(SystemTime::now()).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    datetime.format(&Rfc3339).map_err(TimestampError::Format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::mock::{MockFace, ScriptedSource, batch};
    use crate::driver::{DriverSettings, spawn_driver};
    use crate::scoring::heuristic::HeuristicModel;
    use crate::state::{SessionEngine, SessionPhase};
    use crate::tracking::{PersonTracker, TrackerConfig};
    use std::time::{Duration, UNIX_EPOCH};

    fn engine() -> SessionEngine {
        SessionEngine::new(PersonTracker::new(
            Box::new(HeuristicModel::with_defaults()),
            TrackerConfig::default(),
            500,
        ))
    }

    fn fixed_now() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_768_134_600)
    }

    fn finished_session() -> SessionEngine {
        let mut engine = engine();
        engine.start();
        let generation = engine.state().generation;
        engine.apply_detections(
            generation,
            &batch(&[MockFace::attentive(), MockFace::tilted()]),
        );
        for _ in 0..65 {
            engine.advance_clock(generation);
        }
        engine.apply_detections(
            generation,
            &batch(&[MockFace::attentive(), MockFace::turned_away()]),
        );
        engine.stop();
        engine
    }

    #[test]
    fn display_response_reports_class_view() {
        let engine = finished_session();

        let response = build_display_response(engine.state(), fixed_now());

        match response {
            ApiResponse::Success(body) => {
                assert_eq!(body.label, "Class");
                // (100 + 35) / 2 = 67.5
                assert_eq!(body.score, 68);
                assert_eq!(body.band, FocusBand::Medium);
                assert_eq!(body.history.len(), 2);
                assert_eq!(body.timestamp, "2026-01-11T12:30:00Z");
            }
            ApiResponse::Error { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn events_response_formats_clock_and_message() {
        let engine = finished_session();

        let response = build_events_response(engine.state(), fixed_now());

        match response {
            ApiResponse::Success(body) => {
                assert_eq!(
                    body.events,
                    vec![EventEntry {
                        time: 65,
                        clock: "01:05".to_string(),
                        person_id: 2,
                        label: "Student 2".to_string(),
                        message: "Student 2's focus dropped.".to_string(),
                    }]
                );
            }
            ApiResponse::Error { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn summary_response_ranks_by_average() {
        let engine = finished_session();

        let response = build_summary_response(engine.state(), fixed_now());

        match response {
            ApiResponse::Success(body) => {
                assert_eq!(body.duration_secs, 65);
                assert_eq!(body.duration_clock, "01:05");
                // averages 100 and 43 (42.5 rounded)
                assert_eq!(body.overall_average, 72);
                assert_eq!(body.overall_band, FocusBand::High);
                let ids: Vec<_> = body.leaderboard.iter().map(|e| e.person_id).collect();
                assert_eq!(ids, vec![1, 2]);
                assert_eq!(body.leaderboard[1].label, "Student 2");
                assert_eq!(body.leaderboard[1].band, FocusBand::Medium);
                assert_eq!(body.events.len(), 1);
            }
            ApiResponse::Error { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn summary_response_is_not_found_while_active() {
        let mut engine = engine();
        engine.start();

        let response = build_summary_response(engine.state(), fixed_now());

        match response {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body.error_code, ErrorCode::NoSummary);
            }
            ApiResponse::Success(_) => panic!("expected error"),
        }
    }

    #[test]
    fn session_response_reports_phase_and_clock() {
        let engine = finished_session();

        let response = build_session_response(engine.state(), fixed_now());

        match response {
            ApiResponse::Success(body) => {
                assert_eq!(body.phase, SessionPhase::Idle);
                assert_eq!(body.elapsed_secs, 65);
                assert_eq!(body.clock, "01:05");
                assert_eq!(body.tracked, 2);
                assert!(body.summary_available);
            }
            ApiResponse::Error { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn app_errors_map_to_status_codes() {
        let cases = [
            (AppError::UnknownPerson(4), StatusCode::NOT_FOUND, ErrorCode::UnknownPerson),
            (AppError::SessionActive, StatusCode::CONFLICT, ErrorCode::SessionActive),
            (
                AppError::DriverClosed,
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::DriverUnavailable,
            ),
        ];

        for (err, expected_status, expected_code) in cases {
            match app_error_response::<SessionStatusResponse>(&err, fixed_now()) {
                ApiResponse::Error { status, body } => {
                    assert_eq!(status, expected_status);
                    assert_eq!(body.error_code, expected_code);
                    assert_eq!(body.error_message, err.to_string());
                }
                ApiResponse::Success(_) => panic!("expected error"),
            }
        }
    }

    #[tokio::test]
    async fn control_handlers_drive_the_session() -> Result<(), AppError> {
        let source = ScriptedSource::new(Vec::new());
        let (driver, actor) = spawn_driver(engine(), source, DriverSettings::default());

        match post_start(State(driver.clone())).await {
            ApiResponse::Success(body) => assert_eq!(body.phase, SessionPhase::Active),
            ApiResponse::Error { .. } => panic!("expected start to succeed"),
        }

        match post_reset(State(driver.clone())).await {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(body.error_code, ErrorCode::SessionActive);
            }
            ApiResponse::Success(_) => panic!("expected reset to be refused"),
        }

        let request = SelectionRequest { person_id: Some(7) };
        match post_selection(State(driver.clone()), Json(request)).await {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body.error_code, ErrorCode::UnknownPerson);
            }
            ApiResponse::Success(_) => panic!("expected unknown person"),
        }

        match post_stop(State(driver.clone())).await {
            ApiResponse::Success(body) => {
                assert_eq!(body.phase, SessionPhase::Idle);
                assert!(!body.summary_available);
            }
            ApiResponse::Error { .. } => panic!("expected stop to succeed"),
        }

        driver.shutdown().await?;
        actor.await.expect("actor task");

        match post_start(State(driver)).await {
            ApiResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body.error_code, ErrorCode::DriverUnavailable);
            }
            ApiResponse::Success(_) => panic!("expected driver to be closed"),
        }
        Ok(())
    }
}
