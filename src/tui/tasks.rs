use crate::core::{AnalysisResult, OutlineResult, VideoRecord};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Search,
    Analysis,
    Outline,
}

/// Identifies one in-flight request. Only the latest ticket of each kind
/// may commit its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct RequestTracker {
    issued: u64,
    search: Option<Ticket>,
    analysis: Option<Ticket>,
    outline: Option<Ticket>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: RequestKind) -> &mut Option<Ticket> {
        match kind {
            RequestKind::Search => &mut self.search,
            RequestKind::Analysis => &mut self.analysis,
            RequestKind::Outline => &mut self.outline,
        }
    }

    /// Issue a fresh ticket, superseding any earlier one of the same kind.
    pub fn begin(&mut self, kind: RequestKind) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        *self.slot(kind) = Some(ticket);
        ticket
    }

    pub fn is_current(&self, kind: RequestKind, ticket: Ticket) -> bool {
        let latest = match kind {
            RequestKind::Search => self.search,
            RequestKind::Analysis => self.analysis,
            RequestKind::Outline => self.outline,
        };
        latest == Some(ticket)
    }

    /// Accept a completion and retire its ticket. Stale or already
    /// retired tickets are rejected.
    pub fn finish(&mut self, kind: RequestKind, ticket: Ticket) -> bool {
        if self.is_current(kind, ticket) {
            *self.slot(kind) = None;
            true
        } else {
            false
        }
    }

    /// Drop interest in whatever is in flight for `kind`.
    pub fn cancel(&mut self, kind: RequestKind) {
        *self.slot(kind) = None;
    }

    pub fn in_flight(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Search => self.search.is_some(),
            RequestKind::Analysis => self.analysis.is_some(),
            RequestKind::Outline => self.outline.is_some(),
        }
    }
}

/// Results sent back from background tasks.
#[derive(Debug)]
pub enum TaskMessage {
    SearchFinished {
        ticket: Ticket,
        result: Result<Vec<VideoRecord>>,
    },
    AnalysisFinished {
        ticket: Ticket,
        video: Box<VideoRecord>,
        result: Result<AnalysisResult>,
    },
    OutlineFinished {
        ticket: Ticket,
        keyword: String,
        result: Result<OutlineResult>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_ticket_supersedes_older() {
        let mut tracker = RequestTracker::new();
        let first = tracker.begin(RequestKind::Search);
        let second = tracker.begin(RequestKind::Search);

        assert!(second > first);
        assert!(!tracker.finish(RequestKind::Search, first));
        assert!(tracker.finish(RequestKind::Search, second));
        assert!(!tracker.in_flight(RequestKind::Search));
    }

    #[test]
    fn kinds_are_tracked_independently() {
        let mut tracker = RequestTracker::new();
        let search = tracker.begin(RequestKind::Search);
        let outline = tracker.begin(RequestKind::Outline);

        assert!(tracker.is_current(RequestKind::Search, search));
        assert!(tracker.is_current(RequestKind::Outline, outline));
        assert!(!tracker.is_current(RequestKind::Analysis, search));
    }

    #[test]
    fn finished_ticket_cannot_commit_twice() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.begin(RequestKind::Analysis);
        assert!(tracker.finish(RequestKind::Analysis, ticket));
        assert!(!tracker.finish(RequestKind::Analysis, ticket));
    }

    #[test]
    fn cancel_discards_in_flight_result() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.begin(RequestKind::Outline);
        tracker.cancel(RequestKind::Outline);
        assert!(!tracker.finish(RequestKind::Outline, ticket));
    }
}
