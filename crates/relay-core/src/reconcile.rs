use std::collections::HashSet;

use tracing::{debug, trace};

use crate::types::{Message, MessageId, Snapshot};

/// Distance from the true bottom (in layout units) still treated as "at
/// bottom", tolerating sub-pixel rounding.
pub const AT_BOTTOM_TOLERANCE: f64 = 50.0;

/// Scroll geometry of the view, measured before mutations are applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    /// Current scroll offset from the top.
    pub scroll_top: f64,
    /// Visible viewport height.
    pub viewport_height: f64,
    /// Total scrollable content height.
    pub content_height: f64,
}

impl ScrollMetrics {
    /// Whether the user is within [`AT_BOTTOM_TOLERANCE`] of the true bottom.
    pub fn is_at_bottom(&self) -> bool {
        self.scroll_top + self.viewport_height >= self.content_height - AT_BOTTOM_TOLERANCE
    }
}

/// One minimal view mutation produced by reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewMutation {
    /// Remove the rendered node for `id`.
    Remove { id: MessageId },
    /// Insert a new node immediately before the existing node for `before`.
    InsertBefore {
        message: Message,
        before: MessageId,
    },
    /// Append all messages at the end in one batch.
    AppendBatch { messages: Vec<Message> },
    /// Replace the whole view with the empty state.
    ClearToEmpty,
}

/// Caller-supplied inputs for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Unconditional scroll-to-bottom request (local send, first load).
    pub force_scroll: bool,
    /// Whether the user was at the bottom, measured before any mutation.
    pub was_at_bottom: bool,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// Mutations to apply in order.
    pub mutations: Vec<ViewMutation>,
    /// Whether the renderer should scroll to the bottom after applying.
    pub should_scroll: bool,
    /// `false` when the snapshot was a no-op poll and nothing was touched.
    pub rendered: bool,
}

impl ReconcileOutcome {
    fn noop() -> Self {
        Self {
            mutations: Vec::new(),
            should_scroll: false,
            rendered: false,
        }
    }
}

/// Incremental diff engine that owns the authoritative in-memory view.
///
/// Every poll result is treated as authoritative-but-partial: ids absent from
/// a new snapshot are removed, new ids are inserted at their ordered position,
/// and untouched messages are never re-rendered. Re-reconciling an identical
/// snapshot produces zero mutations.
#[derive(Debug, Clone, Default)]
pub struct ReconcileEngine {
    rendered_ids: Vec<MessageId>,
    rendered_set: HashSet<MessageId>,
    last_fingerprint: Vec<(MessageId, i64)>,
}

impl ReconcileEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently-rendered message ids in view order.
    pub fn rendered_ids(&self) -> &[MessageId] {
        &self.rendered_ids
    }

    /// Whether the view currently holds any messages.
    pub fn has_content(&self) -> bool {
        !self.rendered_ids.is_empty()
    }

    /// Discard the view and cached snapshot, independent of the next poll.
    ///
    /// Used after a successful clear-all; the next reconciliation counts as a
    /// first population again.
    pub fn reset(&mut self) {
        self.rendered_ids.clear();
        self.rendered_set.clear();
        self.last_fingerprint.clear();
    }

    /// Diff `snapshot` against the current view.
    ///
    /// The cached snapshot fingerprint is replaced only when a render occurred;
    /// a content-identical snapshot with different underlying data is treated
    /// as a no-op (accepted approximation).
    pub fn reconcile(&mut self, snapshot: &Snapshot, options: ReconcileOptions) -> ReconcileOutcome {
        let fingerprint = snapshot.fingerprint();
        let has_changes = fingerprint != self.last_fingerprint;
        let is_first_population = self.last_fingerprint.is_empty();

        if !has_changes && !options.force_scroll && !is_first_population {
            trace!("snapshot unchanged, skipping render");
            return ReconcileOutcome::noop();
        }

        let should_scroll = options.force_scroll
            || (has_changes && options.was_at_bottom)
            || is_first_population;

        if snapshot.is_empty() {
            self.reset();
            return ReconcileOutcome {
                mutations: vec![ViewMutation::ClearToEmpty],
                should_scroll: false,
                rendered: true,
            };
        }

        let mut mutations = Vec::new();

        let snapshot_ids: HashSet<MessageId> =
            snapshot.messages().iter().map(|m| m.id).collect();
        for &id in &self.rendered_ids {
            if !snapshot_ids.contains(&id) {
                mutations.push(ViewMutation::Remove { id });
            }
        }
        self.rendered_ids.retain(|id| snapshot_ids.contains(id));
        self.rendered_set.retain(|id| snapshot_ids.contains(id));

        // Positionally-inserted messages become anchors for later insertions;
        // batched appends do not exist in the view until the batch lands.
        let mut in_view = self.rendered_set.clone();
        let mut appends: Vec<Message> = Vec::new();
        let messages = snapshot.messages();
        for (index, message) in messages.iter().enumerate() {
            if self.rendered_set.contains(&message.id) {
                continue;
            }
            let successor = messages[index + 1..]
                .iter()
                .map(|m| m.id)
                .find(|id| in_view.contains(id));
            match successor {
                Some(before) => {
                    mutations.push(ViewMutation::InsertBefore {
                        message: message.clone(),
                        before,
                    });
                    in_view.insert(message.id);
                }
                None => appends.push(message.clone()),
            }
        }
        if !appends.is_empty() {
            mutations.push(ViewMutation::AppendBatch { messages: appends });
        }

        self.rendered_ids = messages.iter().map(|m| m.id).collect();
        self.rendered_set = snapshot_ids;
        self.last_fingerprint = fingerprint;

        debug!(
            mutation_count = mutations.len(),
            view_len = self.rendered_ids.len(),
            should_scroll,
            "reconciled snapshot"
        );

        ReconcileOutcome {
            mutations,
            should_scroll,
            rendered: true,
        }
    }
}
