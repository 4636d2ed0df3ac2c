//! Async driver tying polling, reconciliation, and user input together.

use std::{path::Path, sync::Arc, time::Duration};

use relay_core::{
    ClearDecision, FetchTicket, PollCoordinator, ReconcileEngine, ReconcileOptions, Renderer,
    apply_outcome, format_file_size, is_clear_command,
};
use relay_transport::{FileUpload, ProgressSink, RelayApi};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::renderer::StatusSink;

/// One unit of user input, produced by the stdin reader thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A plain input line (message text or a slash command).
    Line(String),
    /// Outcome of the interactive clear-all confirmation gate.
    Clear(ClearDecision),
}

/// Interactive relay session over one backend and one view.
pub struct RelaySession<R: Renderer + StatusSink> {
    api: RelayApi,
    renderer: R,
    engine: ReconcileEngine,
    coordinator: PollCoordinator,
    device_id: String,
    message_limit: u32,
    loaded_once: bool,
    shown_empty_fallback: bool,
}

impl<R: Renderer + StatusSink> RelaySession<R> {
    pub fn new(api: RelayApi, renderer: R, device_id: String, message_limit: u32) -> Self {
        Self {
            api,
            renderer,
            engine: ReconcileEngine::new(),
            coordinator: PollCoordinator::new(),
            device_id,
            message_limit,
            loaded_once: false,
            shown_empty_fallback: false,
        }
    }

    /// Drive the session until the input stream closes or `cancel` fires.
    ///
    /// The first interval tick fires immediately and doubles as the initial
    /// load.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        mut visibility: watch::Receiver<bool>,
        mut connectivity: watch::Receiver<bool>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut visibility_open = true;
        let mut connectivity_open = true;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.poll_now().await,
                maybe = events.recv() => match maybe {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                changed = visibility.changed(), if visibility_open => match changed {
                    Ok(()) => {
                        let visible = *visibility.borrow_and_update();
                        if let Some(ticket) = self.coordinator.set_visibility(visible) {
                            self.fetch(ticket).await;
                        }
                    }
                    Err(_) => visibility_open = false,
                },
                changed = connectivity.changed(), if connectivity_open => match changed {
                    Ok(()) => {
                        let online = *connectivity.borrow_and_update();
                        if let Some(ticket) = self.coordinator.set_connectivity(online) {
                            self.fetch(ticket).await;
                        }
                    }
                    Err(_) => connectivity_open = false,
                },
            }
        }
        debug!("session loop ended");
    }

    async fn poll_now(&mut self) {
        if let Some(ticket) = self.coordinator.on_tick() {
            self.fetch(ticket).await;
        }
    }

    async fn fetch(&mut self, ticket: FetchTicket) {
        let result = self.api.fetch_snapshot(self.message_limit, 0).await;
        let apply = self.coordinator.complete(ticket.seq);

        match result {
            Ok(snapshot) => {
                if !apply {
                    return;
                }
                let was_at_bottom = self.renderer.measure_scroll().is_at_bottom();
                let outcome = self.engine.reconcile(
                    &snapshot,
                    ReconcileOptions {
                        force_scroll: ticket.force_scroll,
                        was_at_bottom,
                    },
                );
                apply_outcome(&mut self.renderer, &outcome);
                self.loaded_once = true;
            }
            Err(err) => {
                // Stale failures are dropped like stale successes.
                if !apply {
                    return;
                }
                // A failing first load degrades to the empty state without
                // alarming the user; later failures are surfaced.
                if !self.loaded_once && !self.engine.has_content() {
                    debug!(%err, "initial load failed, showing empty state");
                    if !self.shown_empty_fallback {
                        self.renderer.clear_to_empty();
                        self.shown_empty_fallback = true;
                    }
                } else {
                    warn!(%err, "poll failed");
                    self.renderer.notice(&format!("connection problem: {err}"));
                }
            }
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Line(line) => self.handle_line(line.trim().to_owned()).await,
            SessionEvent::Clear(decision) => self.handle_clear(decision).await,
        }
    }

    async fn handle_line(&mut self, line: String) {
        if line.is_empty() {
            return;
        }
        // Second gate: trigger text must never leave the client as a message,
        // even if the input layer failed to intercept it.
        if is_clear_command(&line) {
            self.renderer
                .notice("clear-all needs interactive confirmation; nothing was sent");
            return;
        }
        if let Some(path) = line.strip_prefix("/upload ") {
            self.upload(path.trim()).await;
            return;
        }

        match self.api.send_message(&line, &self.device_id).await {
            Ok(receipt) => {
                debug!(message_id = receipt.id, "message sent");
                if let Some(ticket) = self.coordinator.request_refresh(true) {
                    self.fetch(ticket).await;
                }
            }
            Err(err) => self.renderer.notice(&format!("send failed: {err}")),
        }
    }

    async fn handle_clear(&mut self, decision: ClearDecision) {
        match decision {
            ClearDecision::Cancelled => self.renderer.notice("clear-all cancelled"),
            ClearDecision::CodeMismatch => self
                .renderer
                .notice("confirmation code mismatch; nothing was deleted"),
            ClearDecision::Proceed { confirm_code } => {
                match self.api.clear_all(&confirm_code).await {
                    Ok(summary) => {
                        self.engine.reset();
                        self.renderer.clear_to_empty();
                        self.renderer.notice(&format!(
                            "cleared {} messages and {} files ({})",
                            summary.deleted_messages,
                            summary.deleted_files,
                            format_file_size(summary.deleted_file_size),
                        ));
                        if let Some(ticket) = self.coordinator.request_refresh(false) {
                            self.fetch(ticket).await;
                        }
                    }
                    Err(err) => self.renderer.notice(&format!("clear-all failed: {err}")),
                }
            }
        }
    }

    async fn upload(&mut self, path: &str) {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.renderer.notice(&format!("cannot read {path}: {err}"));
                return;
            }
        };
        let file_name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_owned());

        let progress: ProgressSink = Arc::new(|percent: f64| {
            info!(percent = percent as u32, "uploading");
        });
        let upload = FileUpload {
            file_name,
            mime_type: "application/octet-stream".to_owned(),
            bytes,
        };
        match self
            .api
            .upload_file(upload, &self.device_id, Some(progress))
            .await
        {
            Ok(receipt) => {
                self.renderer.notice(&format!(
                    "uploaded {} ({})",
                    receipt.file_name,
                    format_file_size(receipt.file_size),
                ));
                if let Some(ticket) = self.coordinator.request_refresh(true) {
                    self.fetch(ticket).await;
                }
            }
            Err(err) => self.renderer.notice(&format!("upload failed: {err}")),
        }
    }
}
