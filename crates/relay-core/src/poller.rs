use tracing::{debug, trace};

/// Single-flight fetch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// No fetch in flight; triggers may start one.
    Idle,
    /// A fetch is in flight; concurrent triggers are dropped, not queued.
    Fetching,
}

/// Authorization for one fetch, tagged with a monotonic sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    /// Monotonic sequence; responses for a stale sequence are dropped.
    pub seq: u64,
    /// Whether the resulting reconciliation should assert a forced scroll.
    pub force_scroll: bool,
}

/// Drives periodic fetching with suspension and single-flight semantics.
///
/// Pure state machine: the async driver feeds it timer ticks and
/// visibility/connectivity transitions and performs a fetch whenever a
/// [`FetchTicket`] comes back. While hidden or offline the timer is suspended
/// (no tickets for ticks); in-flight fetches are never cancelled mid-flight.
#[derive(Debug, Clone)]
pub struct PollCoordinator {
    phase: PollPhase,
    visible: bool,
    online: bool,
    next_seq: u64,
    latest_seq: u64,
}

impl Default for PollCoordinator {
    fn default() -> Self {
        Self {
            phase: PollPhase::Idle,
            visible: true,
            online: true,
            next_seq: 1,
            latest_seq: 0,
        }
    }
}

impl PollCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Whether periodic ticks are currently suppressed.
    pub fn is_suspended(&self) -> bool {
        !self.visible || !self.online
    }

    /// Periodic timer tick. Suppressed while suspended or fetching.
    pub fn on_tick(&mut self) -> Option<FetchTicket> {
        if self.is_suspended() {
            trace!("tick suppressed while suspended");
            return None;
        }
        self.issue(false)
    }

    /// Explicit caller-requested refresh (after a local send/upload/clear).
    ///
    /// Bypasses suspension but not single-flight: a refresh requested during a
    /// fetch is dropped and the next natural tick picks up fresh data.
    pub fn request_refresh(&mut self, force_scroll: bool) -> Option<FetchTicket> {
        self.issue(force_scroll)
    }

    /// Page-visibility transition. Becoming visible resumes the timer and
    /// yields exactly one immediate non-forced poll.
    pub fn set_visibility(&mut self, visible: bool) -> Option<FetchTicket> {
        let was_suspended = self.is_suspended();
        self.visible = visible;
        self.resume_ticket(was_suspended)
    }

    /// Network connectivity transition. Coming back online resumes the timer
    /// and yields exactly one immediate non-forced poll.
    pub fn set_connectivity(&mut self, online: bool) -> Option<FetchTicket> {
        let was_suspended = self.is_suspended();
        self.online = online;
        self.resume_ticket(was_suspended)
    }

    /// Record completion of the fetch tagged `seq`.
    ///
    /// Returns `true` when the response belongs to the latest issued fetch and
    /// should be applied; stale responses must be ignored by the caller.
    pub fn complete(&mut self, seq: u64) -> bool {
        if seq == self.latest_seq {
            self.phase = PollPhase::Idle;
            true
        } else {
            debug!(seq, latest = self.latest_seq, "dropping stale fetch response");
            false
        }
    }

    fn resume_ticket(&mut self, was_suspended: bool) -> Option<FetchTicket> {
        if was_suspended && !self.is_suspended() {
            debug!("resuming polling after suspension");
            // Non-forced: resuming must not yank the user's scroll position.
            return self.issue(false);
        }
        None
    }

    fn issue(&mut self, force_scroll: bool) -> Option<FetchTicket> {
        if self.phase == PollPhase::Fetching {
            trace!("fetch already in flight, dropping trigger");
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.latest_seq = seq;
        self.phase = PollPhase::Fetching;
        Some(FetchTicket { seq, force_scroll })
    }
}
