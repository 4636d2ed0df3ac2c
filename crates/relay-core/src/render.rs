use crate::reconcile::{ReconcileOutcome, ScrollMetrics, ViewMutation};
use crate::types::{Message, MessageId};

/// Abstract view surface the reconciliation engine mutates.
///
/// Implementations own the platform-specific node handling; the engine only
/// ever talks to this interface. Scrolling requested via [`scroll_to_bottom`]
/// must be deferred until the implementation has laid out the newly applied
/// mutations.
///
/// [`scroll_to_bottom`]: Renderer::scroll_to_bottom
pub trait Renderer {
    /// Current scroll geometry, measured before mutations are applied.
    fn measure_scroll(&self) -> ScrollMetrics;

    /// Append messages at the end of the view in one batch.
    fn append_batch(&mut self, messages: &[Message]);

    /// Insert a message immediately before the node rendered for `before`.
    fn insert_before(&mut self, message: &Message, before: MessageId);

    /// Remove the node rendered for `id`.
    fn remove(&mut self, id: MessageId);

    /// Replace the whole view with the empty state.
    fn clear_to_empty(&mut self);

    /// Scroll to the bottom after the pending mutations are laid out.
    fn scroll_to_bottom(&mut self);
}

/// Apply a reconciliation outcome to a renderer, in mutation order.
pub fn apply_outcome<R: Renderer + ?Sized>(renderer: &mut R, outcome: &ReconcileOutcome) {
    for mutation in &outcome.mutations {
        match mutation {
            ViewMutation::Remove { id } => renderer.remove(*id),
            ViewMutation::InsertBefore { message, before } => {
                renderer.insert_before(message, *before)
            }
            ViewMutation::AppendBatch { messages } => renderer.append_batch(messages),
            ViewMutation::ClearToEmpty => renderer.clear_to_empty(),
        }
    }
    if outcome.should_scroll {
        renderer.scroll_to_bottom();
    }
}

const ROW_HEIGHT: f64 = 24.0;

/// Headless renderer backed by an ordered message buffer.
///
/// Reference implementation used by tests and by frontends that keep their own
/// draw pass separate from view bookkeeping. Scroll geometry is synthesized
/// from a fixed row height.
#[derive(Debug, Clone, Default)]
pub struct BufferRenderer {
    rows: Vec<Message>,
    scroll_top: f64,
    viewport_height: f64,
    empty_state: bool,
}

impl BufferRenderer {
    pub fn new(viewport_height: f64) -> Self {
        Self {
            rows: Vec::new(),
            scroll_top: 0.0,
            viewport_height,
            empty_state: true,
        }
    }

    /// Rendered messages in view order.
    pub fn rows(&self) -> &[Message] {
        &self.rows
    }

    /// Rendered ids in view order.
    pub fn row_ids(&self) -> Vec<MessageId> {
        self.rows.iter().map(|m| m.id).collect()
    }

    /// Whether the view currently shows the empty state.
    pub fn is_empty_state(&self) -> bool {
        self.empty_state
    }

    /// Simulate the user scrolling to an absolute offset.
    pub fn set_scroll_top(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.max(0.0);
    }

    fn content_height(&self) -> f64 {
        self.rows.len() as f64 * ROW_HEIGHT
    }
}

impl Renderer for BufferRenderer {
    fn measure_scroll(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: self.scroll_top,
            viewport_height: self.viewport_height,
            content_height: self.content_height(),
        }
    }

    fn append_batch(&mut self, messages: &[Message]) {
        self.empty_state = false;
        self.rows.extend_from_slice(messages);
    }

    fn insert_before(&mut self, message: &Message, before: MessageId) {
        self.empty_state = false;
        match self.rows.iter().position(|m| m.id == before) {
            Some(index) => self.rows.insert(index, message.clone()),
            None => self.rows.push(message.clone()),
        }
    }

    fn remove(&mut self, id: MessageId) {
        self.rows.retain(|m| m.id != id);
    }

    fn clear_to_empty(&mut self) {
        self.rows.clear();
        self.scroll_top = 0.0;
        self.empty_state = true;
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_top = (self.content_height() - self.viewport_height).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{ReconcileEngine, ReconcileOptions};
    use crate::types::{MessageBody, Snapshot};

    fn msg(id: MessageId, timestamp_ms: i64) -> Message {
        Message {
            id,
            device_id: "cli-test".to_owned(),
            timestamp_ms,
            body: MessageBody::Text {
                content: format!("m{id}"),
            },
        }
    }

    fn snapshot(entries: &[(MessageId, i64)]) -> Snapshot {
        Snapshot::from_messages(entries.iter().map(|&(id, ts)| msg(id, ts)).collect())
    }

    fn reconcile_into(
        engine: &mut ReconcileEngine,
        renderer: &mut BufferRenderer,
        snap: &Snapshot,
        force_scroll: bool,
    ) {
        let options = ReconcileOptions {
            force_scroll,
            was_at_bottom: renderer.measure_scroll().is_at_bottom(),
        };
        let outcome = engine.reconcile(snap, options);
        apply_outcome(renderer, &outcome);
    }

    #[test]
    fn rendered_sequence_matches_snapshot_order_for_interleavings() {
        // Window jitter: grow, shrink, interleave, shift.
        let windows = [
            vec![(2, 200), (4, 400)],
            vec![(1, 100), (2, 200), (3, 300), (4, 400)],
            vec![(2, 200), (3, 300), (4, 400), (5, 500)],
            vec![(3, 300), (5, 500), (6, 600)],
            vec![(3, 300), (4, 400), (5, 500), (6, 600), (7, 700)],
        ];

        let mut engine = ReconcileEngine::new();
        let mut renderer = BufferRenderer::new(120.0);
        for window in &windows {
            let snap = snapshot(window);
            reconcile_into(&mut engine, &mut renderer, &snap, false);

            let expected: Vec<MessageId> = snap.messages().iter().map(|m| m.id).collect();
            assert_eq!(renderer.row_ids(), expected);
            assert_eq!(engine.rendered_ids(), expected.as_slice());
        }
    }

    #[test]
    fn clear_to_empty_resets_buffer() {
        let mut engine = ReconcileEngine::new();
        let mut renderer = BufferRenderer::new(120.0);
        reconcile_into(&mut engine, &mut renderer, &snapshot(&[(1, 100)]), false);
        assert!(!renderer.is_empty_state());

        reconcile_into(&mut engine, &mut renderer, &Snapshot::default(), false);
        assert!(renderer.is_empty_state());
        assert!(renderer.rows().is_empty());
    }

    #[test]
    fn scrolls_only_when_outcome_requests_it() {
        let mut engine = ReconcileEngine::new();
        let mut renderer = BufferRenderer::new(48.0);
        reconcile_into(
            &mut engine,
            &mut renderer,
            &snapshot(&[(1, 100), (2, 200), (3, 300), (4, 400), (5, 500)]),
            false,
        );
        // First population scrolled to the bottom.
        assert!(renderer.measure_scroll().is_at_bottom());

        // Scroll far away from the bottom, then receive new messages.
        renderer.set_scroll_top(0.0);
        let stayed = renderer.measure_scroll();
        reconcile_into(
            &mut engine,
            &mut renderer,
            &snapshot(&[
                (1, 100),
                (2, 200),
                (3, 300),
                (4, 400),
                (5, 500),
                (6, 600),
                (7, 700),
                (8, 800),
            ]),
            false,
        );
        assert_eq!(renderer.measure_scroll().scroll_top, stayed.scroll_top);
    }
}
