//! Queue HTTP handlers.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use pqueue_core::{Payload, TaskId};
use tracing::{info, warn};

use super::{ApiError, AppState, ROUTES};
use crate::wire::{
    CustomerRequestView, EnqueueRequest, EnqueuedView, IdView, PriorityRequest, QueueListing,
    RenegedView, ServedView, SystemInfoView,
};

/// List task ids in queue (heap-array order).
pub async fn list(State(queue): State<AppState>) -> Json<QueueListing<IdView>> {
    info!(endpoint = "/queue/list", "endpoint hit");
    let snapshot = queue.snapshot().await;
    Json(QueueListing::ids(queue.name(), queue.description(), &snapshot))
}

/// List full task details in queue (heap-array order).
pub async fn detail(State(queue): State<AppState>) -> Json<QueueListing<CustomerRequestView>> {
    info!(endpoint = "/queue/detail", "endpoint hit");
    let snapshot = queue.snapshot().await;
    Json(QueueListing::details(
        queue.name(),
        queue.description(),
        &snapshot,
    ))
}

/// Serve the highest-priority task.
pub async fn service(State(queue): State<AppState>) -> Result<Json<ServedView>, ApiError> {
    info!(endpoint = "/queue/service", "endpoint hit");
    let served = queue.extract_max().await?;
    info!(id = %served.task.id(), wait_secs = served.wait.as_secs_f64(), "task served");
    Ok(Json(ServedView::from(&served)))
}

pub async fn enqueue(
    State(queue): State<AppState>,
    body: Result<Json<EnqueueRequest>, JsonRejection>,
) -> Result<Json<EnqueuedView>, ApiError> {
    info!(endpoint = "/queue/enqueue", "endpoint hit");
    let Json(req) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected enqueue body");
        ApiError::InvalidParameters(rejection.body_text())
    })?;
    req.validate().map_err(ApiError::InvalidParameters)?;

    let enqueued = queue
        .insert(req.priority_weight, Payload::new(req.customer_name, req.description))
        .await
        .inspect_err(|err| warn!(error = %err, "enqueue failed"))?;
    info!(id = %enqueued.task.id(), position = enqueued.position, "task enqueued");
    Ok(Json(EnqueuedView::from(&enqueued)))
}

pub async fn renege(
    State(queue): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<RenegedView>, ApiError> {
    info!(endpoint = "/queue/renege", "endpoint hit");
    let id = parse_id(id)?;
    let reneged = queue
        .renege(id)
        .await
        .inspect_err(|err| warn!(%id, error = %err, "renege failed"))?;
    info!(%id, "task reneged");
    Ok(Json(RenegedView::from(&reneged)))
}

pub async fn update_priority(
    State(queue): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<PriorityRequest>, JsonRejection>,
) -> Result<Json<CustomerRequestView>, ApiError> {
    info!(endpoint = "/queue/priority", "endpoint hit");
    let id = parse_id(id)?;
    let Json(req) = body.map_err(|rejection| {
        warn!(%id, error = %rejection.body_text(), "rejected priority body");
        ApiError::InvalidParameters(rejection.body_text())
    })?;
    let task = queue
        .update(id, req.priority_weight, req.description)
        .await
        .inspect_err(|err| warn!(%id, error = %err, "priority update failed"))?;
    info!(%id, priority = task.priority(), "task reprioritized");
    Ok(Json(CustomerRequestView::from(&task)))
}

/// Queue status. An empty queue is reported, not failed.
pub async fn system_info(State(queue): State<AppState>) -> Json<SystemInfoView> {
    info!(endpoint = "/SystemInfo", "endpoint hit");
    let summary = queue.status_summary().await;
    Json(SystemInfoView::from(&summary))
}

pub async fn fallback() -> (StatusCode, String) {
    info!(endpoint = "fallback", "endpoint hit");
    let mut body = String::from("Try other routes such as:\n");
    for route in ROUTES {
        body.push_str(route);
        body.push('\n');
    }
    (StatusCode::NOT_FOUND, body)
}

fn parse_id(id: Result<Path<u64>, PathRejection>) -> Result<TaskId, ApiError> {
    id.map(|Path(id)| TaskId::new(id))
        .map_err(|rejection| ApiError::InvalidParameters(rejection.body_text()))
}
