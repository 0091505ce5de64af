use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use timetable_allocation::workflows::allocation::{
    allocation_router, priority_router, AllocationDirectory, AllocationEngine, AllocationStore,
    PriorityCatalog, PriorityIntake, PriorityLedger,
};

pub(crate) fn with_allocation_routes<C, S, D, L>(
    engine: Arc<AllocationEngine<C, S, D>>,
    intake: Arc<PriorityIntake<L, D>>,
) -> axum::Router
where
    C: PriorityCatalog + 'static,
    S: AllocationStore + 'static,
    D: AllocationDirectory + 'static,
    L: PriorityLedger + 'static,
{
    allocation_router(engine)
        .merge(priority_router(intake))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::AllocationServices;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use timetable_allocation::workflows::import::PriorityCsvImporter;
    use tower::ServiceExt;

    const EXPORT: &str = "Faculty ID,Faculty Name,Email,Role,Joining Year,Year ID,Academic Year,Subject ID,Subject Name,Subject Code,Subject Type,Abbreviation,Batch ID,Section,Student Count,Priority\n\
3,Chitra Rao,chitra.rao@college.test,FACULTY,2012,1,2024-2025,10,Data Structures,CS201,CORE,DS,1,A,60,1\n\
6,Farid Khan,farid.khan@college.test,FACULTY,2021,1,2024-2025,10,Data Structures,CS201,CORE,DS,1,A,60,1\n\
6,Farid Khan,farid.khan@college.test,FACULTY,2021,1,2024-2025,11,Operating Systems,CS301,CORE,OS,1,A,60,2\n";

    fn app(ready: bool) -> axum::Router {
        let catalog = PriorityCsvImporter::from_reader(EXPORT.as_bytes()).expect("seed imports");
        let services = AllocationServices::from_catalog(catalog, None);
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };

        with_allocation_routes(services.engine, services.intake).layer(Extension(state))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(true)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_is_unavailable_until_flagged() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "initializing");
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let response = app(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn allocation_run_is_mounted_beside_health_checks() {
        let app = app(true);

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/v1/allocations/1/run")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total_allocations"], 2);
        assert_eq!(body["allocations"][0]["faculty_name"], "Chitra Rao");
        assert_eq!(body["allocations"][1]["subject_code"], "CS301");

        let response = app
            .oneshot(
                Request::get("/api/v1/priorities/1/6")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["priorities"].as_array().map(Vec::len), Some(2));
    }
}
