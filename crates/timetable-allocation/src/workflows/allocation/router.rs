use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::catalog::{PriorityCatalog, PriorityLedger};
use super::domain::{AllocationId, AllocationReassignment, FacultyId, YearId};
use super::repository::{AllocationDirectory, AllocationStore};
use super::service::{AllocationEngine, AllocationServiceError};
use super::submission::{PriorityIntake, PrioritySubmission, SubmissionError};

/// Router exposing allocation runs and the allocation read models.
pub fn allocation_router<C, S, D>(engine: Arc<AllocationEngine<C, S, D>>) -> Router
where
    C: PriorityCatalog + 'static,
    S: AllocationStore + 'static,
    D: AllocationDirectory + 'static,
{
    Router::new()
        .route("/api/v1/allocations/:year_id/run", post(run_handler::<C, S, D>))
        .route("/api/v1/allocations/:year_id", get(year_handler::<C, S, D>))
        .route(
            "/api/v1/allocations/:year_id/by-batch",
            get(by_batch_handler::<C, S, D>),
        )
        .route(
            "/api/v1/allocation-records/:allocation_id",
            get(record_handler::<C, S, D>).put(reassign_handler::<C, S, D>),
        )
        .with_state(engine)
}

/// Router accepting priority submissions.
pub fn priority_router<L, D>(intake: Arc<PriorityIntake<L, D>>) -> Router
where
    L: PriorityLedger + 'static,
    D: AllocationDirectory + 'static,
{
    Router::new()
        .route("/api/v1/priorities", post(submit_handler::<L, D>))
        .route(
            "/api/v1/priorities/:year_id",
            get(year_priorities_handler::<L, D>),
        )
        .route(
            "/api/v1/priorities/:year_id/:faculty_id",
            get(priorities_handler::<L, D>).delete(withdraw_handler::<L, D>),
        )
        .with_state(intake)
}

pub(crate) async fn run_handler<C, S, D>(
    State(engine): State<Arc<AllocationEngine<C, S, D>>>,
    Path(year_id): Path<u32>,
) -> Response
where
    C: PriorityCatalog + 'static,
    S: AllocationStore + 'static,
    D: AllocationDirectory + 'static,
{
    // Runs take a per-year mutex; keep them off the async workers.
    let outcome =
        tokio::task::spawn_blocking(move || engine.allocate_subjects(YearId(year_id))).await;

    match outcome {
        Ok(Ok(result)) => (StatusCode::OK, axum::Json(result)).into_response(),
        Ok(Err(error)) => allocation_error_response(error),
        Err(join_error) => {
            let payload = json!({
                "error": format!("allocation run aborted: {join_error}"),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn year_handler<C, S, D>(
    State(engine): State<Arc<AllocationEngine<C, S, D>>>,
    Path(year_id): Path<u32>,
) -> Response
where
    C: PriorityCatalog + 'static,
    S: AllocationStore + 'static,
    D: AllocationDirectory + 'static,
{
    match engine.allocations_for_year(YearId(year_id)) {
        Ok(allocations) => {
            let payload = json!({ "allocations": allocations });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => allocation_error_response(error),
    }
}

pub(crate) async fn by_batch_handler<C, S, D>(
    State(engine): State<Arc<AllocationEngine<C, S, D>>>,
    Path(year_id): Path<u32>,
) -> Response
where
    C: PriorityCatalog + 'static,
    S: AllocationStore + 'static,
    D: AllocationDirectory + 'static,
{
    match engine.allocations_by_batch(YearId(year_id)) {
        Ok(years) => {
            let payload = json!({ "allocations": years });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => allocation_error_response(error),
    }
}

pub(crate) async fn record_handler<C, S, D>(
    State(engine): State<Arc<AllocationEngine<C, S, D>>>,
    Path(allocation_id): Path<u64>,
) -> Response
where
    C: PriorityCatalog + 'static,
    S: AllocationStore + 'static,
    D: AllocationDirectory + 'static,
{
    match engine.allocation(AllocationId(allocation_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => allocation_error_response(error),
    }
}

pub(crate) async fn reassign_handler<C, S, D>(
    State(engine): State<Arc<AllocationEngine<C, S, D>>>,
    Path(allocation_id): Path<u64>,
    axum::Json(reassignment): axum::Json<AllocationReassignment>,
) -> Response
where
    C: PriorityCatalog + 'static,
    S: AllocationStore + 'static,
    D: AllocationDirectory + 'static,
{
    match engine.reassign(AllocationId(allocation_id), reassignment) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => allocation_error_response(error),
    }
}

pub(crate) async fn submit_handler<L, D>(
    State(intake): State<Arc<PriorityIntake<L, D>>>,
    axum::Json(submission): axum::Json<PrioritySubmission>,
) -> Response
where
    L: PriorityLedger + 'static,
    D: AllocationDirectory + 'static,
{
    match intake.submit(submission) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(error) => submission_error_response(error),
    }
}

pub(crate) async fn withdraw_handler<L, D>(
    State(intake): State<Arc<PriorityIntake<L, D>>>,
    Path((year_id, faculty_id)): Path<(u32, u32)>,
) -> Response
where
    L: PriorityLedger + 'static,
    D: AllocationDirectory + 'static,
{
    match intake.withdraw(FacultyId(faculty_id), YearId(year_id)) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => submission_error_response(error),
    }
}

pub(crate) async fn year_priorities_handler<L, D>(
    State(intake): State<Arc<PriorityIntake<L, D>>>,
    Path(year_id): Path<u32>,
) -> Response
where
    L: PriorityLedger + 'static,
    D: AllocationDirectory + 'static,
{
    match intake.priorities_for_year(YearId(year_id)) {
        Ok(priorities) => {
            let payload = json!({ "priorities": priorities });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => allocation_error_response(error),
    }
}

pub(crate) async fn priorities_handler<L, D>(
    State(intake): State<Arc<PriorityIntake<L, D>>>,
    Path((year_id, faculty_id)): Path<(u32, u32)>,
) -> Response
where
    L: PriorityLedger + 'static,
    D: AllocationDirectory + 'static,
{
    match intake.priorities(FacultyId(faculty_id), YearId(year_id)) {
        Ok(priorities) => {
            let payload = json!({ "priorities": priorities });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => submission_error_response(error),
    }
}

fn submission_error_response(error: SubmissionError) -> Response {
    let status = match &error {
        SubmissionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SubmissionError::NotSubmitted { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn allocation_error_response(error: AllocationServiceError) -> Response {
    let status = match &error {
        AllocationServiceError::DataIntegrity(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AllocationServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        AllocationServiceError::Interrupted(_) => StatusCode::SERVICE_UNAVAILABLE,
        AllocationServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
