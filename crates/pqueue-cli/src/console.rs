//! Interactive menu over stdin/stdout.
//!
//! Each command prints its result as pretty JSON, using the same shapes as
//! the HTTP API.

use pqueue_core::{Payload, Priority, TaskId};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::http::AppState;
use crate::wire::{
    CustomerRequestView, EnqueueRequest, EnqueuedView, QueueListing, RenegedView, ServedView,
    SystemInfoView,
};

const MENU: &str = "\
==============================
 1. List request ids
 2. List request details
 3. Service next request
 4. Enqueue a request
 5. Renege a request
 6. System information
 7. Update request priority
 9. Show this menu
 0. Exit
==============================
";

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("console I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ListIds,
    ListDetails,
    Service,
    Enqueue,
    Renege,
    SystemInfo,
    UpdatePriority,
    Menu,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        let choice = match input.trim() {
            "1" => Self::ListIds,
            "2" => Self::ListDetails,
            "3" => Self::Service,
            "4" => Self::Enqueue,
            "5" => Self::Renege,
            "6" => Self::SystemInfo,
            "7" => Self::UpdatePriority,
            "9" => Self::Menu,
            "0" => Self::Exit,
            _ => return None,
        };
        Some(choice)
    }
}

pub struct Console<R, W> {
    queue: AppState,
    reader: R,
    writer: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(queue: AppState, reader: R, writer: W) -> Self {
        Self {
            queue,
            reader,
            writer,
        }
    }

    /// Run until the user exits or input reaches EOF.
    pub async fn run(&mut self) -> Result<(), ConsoleError> {
        let banner = format!(
            "Queue: {} ({})\n{}",
            self.queue.name(),
            self.queue.description(),
            MENU
        );
        self.write(&banner).await?;

        loop {
            let Some(line) = self.prompt("Enter selection: ").await? else {
                info!("console input closed");
                return Ok(());
            };
            let Some(choice) = MenuChoice::parse(&line) else {
                self.write(&format!("Invalid selection: {:?}\n", line.trim()))
                    .await?;
                continue;
            };
            debug!(?choice, "console command");

            match choice {
                MenuChoice::ListIds => self.list_ids().await?,
                MenuChoice::ListDetails => self.list_details().await?,
                MenuChoice::Service => self.service().await?,
                MenuChoice::Enqueue => self.enqueue().await?,
                MenuChoice::Renege => self.renege().await?,
                MenuChoice::SystemInfo => self.system_info().await?,
                MenuChoice::UpdatePriority => self.update_priority().await?,
                MenuChoice::Menu => self.write(MENU).await?,
                MenuChoice::Exit => {
                    self.write("Bye\n").await?;
                    info!("console exited");
                    return Ok(());
                }
            }
        }
    }

    async fn list_ids(&mut self) -> Result<(), ConsoleError> {
        let snapshot = self.queue.snapshot().await;
        let listing =
            QueueListing::ids(self.queue.name(), self.queue.description(), &snapshot);
        self.print_json(&listing).await
    }

    async fn list_details(&mut self) -> Result<(), ConsoleError> {
        let snapshot = self.queue.snapshot().await;
        let listing =
            QueueListing::details(self.queue.name(), self.queue.description(), &snapshot);
        self.write("Customer requests in queue:\n").await?;
        self.print_json(&listing).await
    }

    async fn service(&mut self) -> Result<(), ConsoleError> {
        match self.queue.extract_max().await {
            Ok(served) => {
                info!(id = %served.task.id(), "serviced request");
                self.write("Dequeued customer request:\n").await?;
                self.print_json(&ServedView::from(&served)).await
            }
            Err(err) => self.report(&err).await,
        }
    }

    async fn enqueue(&mut self) -> Result<(), ConsoleError> {
        let Some(name) = self.prompt("Customer name: ").await? else {
            return Ok(());
        };
        let Some(description) = self.prompt("Description: ").await? else {
            return Ok(());
        };
        let Some(raw_priority) = self.prompt("Priority weight: ").await? else {
            return Ok(());
        };
        let Some(priority) = self.parse_priority(&raw_priority).await? else {
            return Ok(());
        };

        let request = EnqueueRequest {
            customer_name: name.trim().to_string(),
            description: description.trim().to_string(),
            priority_weight: priority,
        };
        if let Err(reason) = request.validate() {
            return self.write(&format!("{reason}\n")).await;
        }

        let payload = Payload::new(request.customer_name, request.description);
        match self.queue.insert(request.priority_weight, payload).await {
            Ok(enqueued) => {
                info!(id = %enqueued.task.id(), priority, "enqueued request");
                self.write("Customer request enqueued:\n").await?;
                self.print_json(&EnqueuedView::from(&enqueued)).await
            }
            Err(err) => self.report(&err).await,
        }
    }

    async fn renege(&mut self) -> Result<(), ConsoleError> {
        let Some(raw_id) = self.prompt("Request id to renege: ").await? else {
            return Ok(());
        };
        let Some(id) = self.parse_id(&raw_id).await? else {
            return Ok(());
        };
        match self.queue.renege(id).await {
            Ok(served) => {
                info!(%id, "reneged request");
                self.print_json(&RenegedView::from(&served)).await
            }
            Err(err) => self.report(&err).await,
        }
    }

    async fn system_info(&mut self) -> Result<(), ConsoleError> {
        let summary = self.queue.status_summary().await;
        self.print_json(&SystemInfoView::from(&summary)).await
    }

    async fn update_priority(&mut self) -> Result<(), ConsoleError> {
        let Some(raw_id) = self.prompt("Request id: ").await? else {
            return Ok(());
        };
        let Some(id) = self.parse_id(&raw_id).await? else {
            return Ok(());
        };
        let Some(raw_priority) = self.prompt("New priority weight: ").await? else {
            return Ok(());
        };
        let Some(priority) = self.parse_priority(&raw_priority).await? else {
            return Ok(());
        };
        let Some(description) = self.prompt("New description (blank keeps current): ").await?
        else {
            return Ok(());
        };
        let description = Some(description.trim().to_string()).filter(|d| !d.is_empty());
        match self.queue.update(id, priority, description).await {
            Ok(task) => {
                info!(%id, priority, "updated request priority");
                self.print_json(&CustomerRequestView::from(&task)).await
            }
            Err(err) => self.report(&err).await,
        }
    }

    async fn parse_id(&mut self, raw: &str) -> Result<Option<TaskId>, ConsoleError> {
        match raw.parse::<TaskId>() {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                self.write(&format!("Invalid id: {:?}\n", raw.trim())).await?;
                Ok(None)
            }
        }
    }

    async fn parse_priority(&mut self, raw: &str) -> Result<Option<Priority>, ConsoleError> {
        match raw.trim().parse::<Priority>() {
            Ok(priority) => Ok(Some(priority)),
            Err(_) => {
                self.write(&format!("Invalid priority weight: {:?}\n", raw.trim()))
                    .await?;
                Ok(None)
            }
        }
    }

    async fn report(&mut self, err: &pqueue_core::QueueError) -> Result<(), ConsoleError> {
        warn!(error = %err, "console command failed");
        self.write(&format!("{err}\n")).await
    }

    /// Returns `None` at EOF.
    async fn prompt(&mut self, message: &str) -> Result<Option<String>, ConsoleError> {
        self.write(message).await?;
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    async fn print_json<T: Serialize>(&mut self, value: &T) -> Result<(), ConsoleError> {
        let mut text = serde_json::to_string_pretty(value)?;
        text.push('\n');
        self.write(&text).await
    }

    async fn write(&mut self, text: &str) -> Result<(), ConsoleError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
