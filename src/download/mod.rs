//! Ingestion engine.
//!
//! This module provides:
//! - Rate-limited pagination of a collection's feed
//! - Bounded-concurrency asset downloads
//! - The per-collection run state machine
//! - Run status publication and the external stop signal

pub mod control;
pub mod orchestrator;
pub mod paginator;
pub mod scheduler;
pub mod state;
pub mod status;

pub use control::{stop_channel, StopHandle, StopSignal};
pub use orchestrator::{HarvestSettings, Harvester};
pub use paginator::{Page, PageDelay, Paginator};
pub use scheduler::{DownloadOutcome, DownloadPool, DownloadScheduler, DrainReport, TaskHandle};
pub use state::{GlobalState, RunState};
pub use status::{status_channel, RunPhase, RunStatus, StatusReceiver, StatusSender};
