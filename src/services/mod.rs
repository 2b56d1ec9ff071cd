//! Services
//!
//! Runtime services for the monitor. The engines live in the workspace
//! crates; services connect them to the outside world.

pub mod history;
pub mod monitor;
pub mod presentation;
pub mod transport;

pub use history::{HistoryClient, HistorySource, StaticHistory};
pub use monitor::{CaseMonitor, CaseSession, MonitorCommand, MonitorHandle};
pub use presentation::{project, render_text, ConnectionState, MonitorView, OutcomeView};
pub use transport::{
    ConnectionSignal, EventTransport, ReplayPace, ReplayTransport, Subscription,
    TransportError, TransportMessage, WebSocketConfig, WebSocketTransport,
};
