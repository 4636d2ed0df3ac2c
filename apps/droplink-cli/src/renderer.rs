//! Terminal presentation of the reconciled message view.

use std::io::Write;

use chrono::{DateTime, Utc};
use relay_core::{
    Message, MessageBody, MessageId, Renderer, ScrollMetrics, format_file_size, format_timestamp,
};
use tracing::warn;

const EMPTY_NOTICE: &str = "(no messages yet)";

/// Out-of-view status output (errors, summaries, hints).
pub trait StatusSink {
    fn notice(&mut self, text: &str);
}

/// Render one message as a terminal line.
pub fn format_line(message: &Message, own_device_id: &str, now: DateTime<Utc>) -> String {
    let when = format_timestamp(message.timestamp_ms, now);
    let who = if message.device_id == own_device_id {
        "you"
    } else {
        message.device_id.as_str()
    };
    match &message.body {
        MessageBody::Text { content } => format!("[{when}] {who}: {content}"),
        MessageBody::File(file) => format!(
            "[{when}] {who}: [file] {} ({}) key={}",
            file.original_name,
            format_file_size(file.file_size),
            file.storage_key,
        ),
    }
}

/// Line-oriented renderer over any writer.
///
/// A terminal has no scrollback the program controls, so appends print new
/// lines directly while positional inserts and removals redraw the whole
/// view. The synthesized scroll geometry always reads as at-bottom; a
/// terminal follows its tail.
pub struct TerminalRenderer<W: Write> {
    out: W,
    own_device_id: String,
    rows: Vec<Message>,
    empty_state: bool,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, own_device_id: impl Into<String>) -> Self {
        Self {
            out,
            own_device_id: own_device_id.into(),
            rows: Vec::new(),
            // Flips on the first clear so the empty notice prints exactly once
            // even while every poll of an empty backend re-renders it.
            empty_state: false,
        }
    }

    /// Rendered ids in view order.
    pub fn row_ids(&self) -> Vec<MessageId> {
        self.rows.iter().map(|m| m.id).collect()
    }

    /// Whether the view currently shows the empty state.
    pub fn is_empty_state(&self) -> bool {
        self.empty_state
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!(%err, "terminal write failed");
        }
    }

    fn redraw(&mut self) {
        let lines: Vec<String> = self
            .rows
            .iter()
            .map(|m| format_line(m, &self.own_device_id, Utc::now()))
            .collect();
        self.emit("--- view updated ---");
        for line in lines {
            self.emit(&line);
        }
    }
}

impl<W: Write> StatusSink for TerminalRenderer<W> {
    fn notice(&mut self, text: &str) {
        self.emit(&format!("* {text}"));
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn measure_scroll(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 0.0,
            viewport_height: 0.0,
            content_height: 0.0,
        }
    }

    fn append_batch(&mut self, messages: &[Message]) {
        self.empty_state = false;
        for message in messages {
            let line = format_line(message, &self.own_device_id, Utc::now());
            self.emit(&line);
        }
        self.rows.extend_from_slice(messages);
    }

    fn insert_before(&mut self, message: &Message, before: MessageId) {
        self.empty_state = false;
        match self.rows.iter().position(|m| m.id == before) {
            Some(index) => self.rows.insert(index, message.clone()),
            None => self.rows.push(message.clone()),
        }
        self.redraw();
    }

    fn remove(&mut self, id: MessageId) {
        let before = self.rows.len();
        self.rows.retain(|m| m.id != id);
        if self.rows.len() != before {
            self.redraw();
        }
    }

    fn clear_to_empty(&mut self) {
        self.rows.clear();
        if !self.empty_state {
            self.empty_state = true;
            self.emit(EMPTY_NOTICE);
        }
    }

    fn scroll_to_bottom(&mut self) {
        // A terminal already follows its tail.
    }
}
