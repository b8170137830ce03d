// ChatLog - core/reconciler.rs
//
// Turns "a new snapshot is available" into "here is the edit script that
// brings the previously rendered list up to date".
//
// State machine:
//   Empty ──on_change──▶ Rendered(snapshot) ──on_change──▶ Rendered(snapshot')
//
// The rendered copy only ever serves as the "old" side of the next diff; it
// is replaced wholesale after each change, never patched.

use crate::core::diff::{self, EditScript};
use crate::core::model::{ChangeVersion, Message, Snapshot};
use serde::Serialize;

/// Reconciler state.
#[derive(Debug, Clone, Default)]
pub enum RenderState {
    /// Nothing rendered yet.
    #[default]
    Empty,

    /// The snapshot most recently handed to the view.
    Rendered(Snapshot),
}

/// Result of reconciling one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Edits that turn the previously rendered list into the new snapshot.
    pub script: EditScript<Message>,

    /// Whether the view should scroll to its last row.
    pub scroll_to_end: bool,

    /// Version of the snapshot that was reconciled.
    pub version: ChangeVersion,
}

/// Diffs successive snapshots for a single view.
#[derive(Debug, Default)]
pub struct ListReconciler {
    state: RenderState,
}

impl ListReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile `snapshot` against whatever was rendered last.
    ///
    /// Every change reaches the reconciler through the store's append path,
    /// so a non-empty snapshot always asks the view to scroll to the end,
    /// including the very first one.
    pub fn on_change(&mut self, snapshot: Snapshot) -> Reconciliation {
        let script = diff::diff(self.rendered(), snapshot.messages());

        let first = !self.is_rendered();
        let scroll_to_end = !snapshot.is_empty();
        let version = snapshot.version();

        tracing::debug!(
            %version,
            first,
            rows = snapshot.len(),
            edits = %script.summary(),
            "Reconciled snapshot"
        );

        self.state = RenderState::Rendered(snapshot);

        Reconciliation {
            script,
            scroll_to_end,
            version,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self.state, RenderState::Rendered(_))
    }

    /// The last reconciled snapshot, or an empty slice before the first one.
    pub fn rendered(&self) -> &[Message] {
        match &self.state {
            RenderState::Empty => &[],
            RenderState::Rendered(snapshot) => snapshot.messages(),
        }
    }
}
