//! Case Review Monitor
//!
//! Back-end for following a compliance case review as it runs. It includes:
//! - Transport adapters (live WebSocket, recorded replay)
//! - History backfill client
//! - Case session and monitor runtime driving the reconciliation and pacing engines
//! - Presentation projection
//! - Configuration storage and utilities

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::settings::{ConfigUpdate, MonitorConfig};
pub use services::{
    CaseMonitor, EventTransport, HistoryClient, HistorySource, MonitorHandle, MonitorView,
    OutcomeView, ReplayTransport, WebSocketTransport,
};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
