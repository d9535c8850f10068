//! JSON shapes shared by the console and the HTTP API.
//!
//! Field names follow the customer-request vocabulary existing clients use
//! (`customerName`, `priorityWeight`, `waitTimeinSec`, ...).

use chrono::{DateTime, Utc};
use pqueue_core::{
    Enqueued, Priority, QueueError, QueueSnapshot, QueueStatus, Served, StatusSummary, Task, TaskId,
};
use serde::{Deserialize, Serialize};

pub const RENEGE_MESSAGE: &str = "Request reneged successfully";

#[derive(Debug, Serialize)]
pub struct IdView {
    pub id: TaskId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequestView {
    pub id: TaskId,
    pub customer_name: String,
    pub description: String,
    pub priority_weight: Priority,
    pub enqueue_time: DateTime<Utc>,
}

impl From<&Task> for CustomerRequestView {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id(),
            customer_name: task.payload().name.clone(),
            description: task.payload().description.clone(),
            priority_weight: task.priority(),
            enqueue_time: task.enqueued_at(),
        }
    }
}

/// Queue listing. `customerRequests` is in heap-array order, not priority order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueListing<T> {
    pub queue_name: String,
    pub queue_description: String,
    pub size: usize,
    pub oldest_task_id: Option<TaskId>,
    pub customer_requests: Vec<T>,
}

impl QueueListing<IdView> {
    pub fn ids(name: &str, description: &str, snapshot: &QueueSnapshot) -> Self {
        let ids = snapshot
            .tasks
            .iter()
            .map(|task| IdView { id: task.id() })
            .collect();
        Self::build(name, description, snapshot, ids)
    }
}

impl QueueListing<CustomerRequestView> {
    pub fn details(name: &str, description: &str, snapshot: &QueueSnapshot) -> Self {
        let details = snapshot
            .tasks
            .iter()
            .map(CustomerRequestView::from)
            .collect();
        Self::build(name, description, snapshot, details)
    }
}

impl<T> QueueListing<T> {
    fn build(
        name: &str,
        description: &str,
        snapshot: &QueueSnapshot,
        customer_requests: Vec<T>,
    ) -> Self {
        Self {
            queue_name: name.to_string(),
            queue_description: description.to_string(),
            size: snapshot.tasks.len(),
            oldest_task_id: snapshot.oldest_task_id,
            customer_requests,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedView {
    pub id: TaskId,
    pub customer_name: String,
    pub description: String,
    pub priority_weight: Priority,
    pub enqueue_time: DateTime<Utc>,
    #[serde(rename = "waitTimeinSec")]
    pub wait_time_in_sec: f64,
}

impl From<&Served> for ServedView {
    fn from(served: &Served) -> Self {
        let task = CustomerRequestView::from(&served.task);
        Self {
            id: task.id,
            customer_name: task.customer_name,
            description: task.description,
            priority_weight: task.priority_weight,
            enqueue_time: task.enqueue_time,
            wait_time_in_sec: served.wait.as_secs_f64(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueuedView {
    pub customer_name: String,
    pub description: String,
    pub priority_weight: Priority,
    pub id: TaskId,
    pub enqueue_time: DateTime<Utc>,
    pub position_in_queue: usize,
}

impl From<&Enqueued> for EnqueuedView {
    fn from(enqueued: &Enqueued) -> Self {
        let task = CustomerRequestView::from(&enqueued.task);
        Self {
            customer_name: task.customer_name,
            description: task.description,
            priority_weight: task.priority_weight,
            id: task.id,
            enqueue_time: task.enqueue_time,
            position_in_queue: enqueued.position,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenegedView {
    pub customer_name: String,
    pub id: TaskId,
    pub enqueue_time: DateTime<Utc>,
    #[serde(rename = "waitTimeinSec")]
    pub wait_time_in_sec: f64,
    pub message: String,
}

impl From<&Served> for RenegedView {
    fn from(served: &Served) -> Self {
        Self {
            customer_name: served.task.payload().name.clone(),
            id: served.task.id(),
            enqueue_time: served.task.enqueued_at(),
            wait_time_in_sec: served.wait.as_secs_f64(),
            message: RENEGE_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueInfoView {
    pub name: String,
    /// Kept as a string for compatibility with existing clients.
    pub size: String,
    pub oldest_customer_request_time_in_sec: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SystemInfoView {
    pub status: &'static str,
    pub queue: QueueInfoView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn status_label(status: QueueStatus) -> &'static str {
    match status {
        QueueStatus::InService => "IN_SERVICE",
        QueueStatus::AtCapacity => "MAX_CAPACITY_REACHED",
    }
}

impl From<&StatusSummary> for SystemInfoView {
    fn from(summary: &StatusSummary) -> Self {
        Self {
            status: status_label(summary.status),
            queue: QueueInfoView {
                name: summary.name.clone(),
                size: summary.size.to_string(),
                oldest_customer_request_time_in_sec: summary.oldest_wait.map(|w| w.as_secs_f64()),
            },
            message: summary
                .oldest_wait
                .is_none()
                .then(|| QueueError::Empty.to_string()),
        }
    }
}

/// Body of `POST /queue/enqueue`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub customer_name: String,
    #[serde(default)]
    pub description: String,
    pub priority_weight: Priority,
}

impl EnqueueRequest {
    /// Reject requests that would create an anonymous task.
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("customerName must not be empty".to_string());
        }
        Ok(())
    }
}

/// Body of `PUT /queue/priority/{id}`. A missing description keeps the current one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityRequest {
    pub priority_weight: Priority,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}
