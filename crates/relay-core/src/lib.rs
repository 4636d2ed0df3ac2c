//! Core relay-client contract shared between transport and frontends.
//!
//! This crate defines the message/snapshot model, the incremental snapshot
//! reconciliation engine, the single-flight polling coordinator, the
//! clear-all command interception, and common error/formatting helpers.

/// Clear-all chat-command interception and confirmation gate.
pub mod command;
/// Device identity generation and persistence.
pub mod device;
/// Stable relay error kinds and HTTP classification helpers.
pub mod error;
/// File-size and timestamp display formatting.
pub mod format;
/// Single-flight polling coordinator with suspend/resume semantics.
pub mod poller;
/// Snapshot reconciliation engine (the diff core).
pub mod reconcile;
/// Abstract renderer interface and headless reference implementation.
pub mod render;
/// Message, snapshot, and clear-summary types.
pub mod types;

pub use command::{CLEAR_CONFIRM_CODE, CLEAR_TRIGGERS, ClearDecision, ConfirmPrompt, decide_clear, is_clear_command};
pub use device::{
    DEVICE_ID_PREFIX, device_display_name, generate_device_id, load_or_create_device_id,
};
pub use error::{RelayError, RelayErrorKind, classify_http_status};
pub use format::{format_file_size, format_timestamp};
pub use poller::{FetchTicket, PollCoordinator, PollPhase};
pub use reconcile::{
    AT_BOTTOM_TOLERANCE, ReconcileEngine, ReconcileOptions, ReconcileOutcome, ScrollMetrics,
    ViewMutation,
};
pub use render::{BufferRenderer, Renderer, apply_outcome};
pub use types::{ClearSummary, FileRef, Message, MessageBody, MessageId, Snapshot};
