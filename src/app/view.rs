// ChatLog - app/view.rs
//
// Reference view-side collaborator: keeps a row list in step with the store
// by applying edit scripts, and remembers where to scroll.
//
// A widget toolkit would bind rows to its own list control; the CLI prints
// `render_lines()` instead.

use crate::app::reconcile::ViewUpdate;
use crate::core::diff::Edit;
use crate::core::model::{ChangeVersion, Message};
use crate::core::reconciler::Reconciliation;
use crate::util::constants::DEFAULT_TIME_FORMAT;

/// Rendered chat rows plus scroll state.
#[derive(Debug, Clone)]
pub struct ChatView {
    rows: Vec<Message>,
    version: ChangeVersion,
    /// Row index the view should scroll to on its next frame.
    scroll_target: Option<usize>,
    time_format: String,
}

impl ChatView {
    pub fn new(time_format: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            version: ChangeVersion::INITIAL,
            scroll_target: None,
            time_format: time_format.into(),
        }
    }

    /// Apply one reconciliation: run its edit script over the rows and, if
    /// asked, target the last row for scrolling.
    pub fn apply(&mut self, reconciliation: &Reconciliation) {
        reconciliation.script.apply(&mut self.rows);
        self.version = reconciliation.version;
        if reconciliation.scroll_to_end {
            self.scroll_target = self.rows.len().checked_sub(1);
        }
    }

    /// Handle a message from the reconcile thread. Returns `true` if the
    /// rows changed.
    pub fn handle(&mut self, update: &ViewUpdate) -> bool {
        match update {
            ViewUpdate::Reconciled(rec) => {
                self.apply(rec);
                !rec.script.is_empty()
            }
            ViewUpdate::Started { .. } | ViewUpdate::Stopped => false,
        }
    }

    pub fn rows(&self) -> &[Message] {
        &self.rows
    }

    pub fn version(&self) -> ChangeVersion {
        self.version
    }

    pub fn scroll_target(&self) -> Option<usize> {
        self.scroll_target
    }

    /// Consume the pending scroll request.
    pub fn take_scroll_target(&mut self) -> Option<usize> {
        self.scroll_target.take()
    }

    /// Text of the row at `index`, for copy-to-clipboard actions.
    pub fn copy_text(&self, index: usize) -> Option<&str> {
        self.rows.get(index).map(|m| m.text.as_str())
    }

    /// `"[HH:MM] text"` for one row. An unusable time format leaves the
    /// brackets empty.
    pub fn render_row(&self, message: &Message) -> String {
        format!("[{}] {}", message.time_label(&self.time_format), message.text)
    }

    pub fn render_lines(&self) -> Vec<String> {
        self.rows.iter().map(|m| self.render_row(m)).collect()
    }

    /// Human-readable description of one edit, for logging and the CLI.
    pub fn describe_edit(edit: &Edit<Message>) -> String {
        match edit {
            Edit::Remove { position } => format!("remove @{position}"),
            Edit::Insert { position, item } => format!("insert @{position} {:?}", item.text),
            Edit::Move { from, to } => format!("move {from} -> {to}"),
            Edit::Update { position, item } => format!("update @{position} {:?}", item.text),
        }
    }
}

impl Default for ChatView {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Snapshot;
    use crate::core::reconciler::ListReconciler;

    fn snap(items: &[(&str, i64)], seq: u64) -> Snapshot {
        Snapshot::from_messages(
            items.iter().map(|(t, ts)| Message::new(*t, *ts)).collect(),
            ChangeVersion {
                seq,
                updated_at_ms: seq as i64,
            },
        )
    }

    #[test]
    fn test_apply_tracks_rows_and_scroll() {
        let mut reconciler = ListReconciler::new();
        let mut view = ChatView::default();

        view.apply(&reconciler.on_change(snap(&[("hi", 1)], 1)));
        assert_eq!(view.rows().len(), 1);
        assert_eq!(view.take_scroll_target(), Some(0));
        assert_eq!(view.take_scroll_target(), None);

        view.apply(&reconciler.on_change(snap(&[("hi", 1), ("there", 2)], 2)));
        assert_eq!(view.copy_text(1), Some("there"));
        assert_eq!(view.scroll_target(), Some(1));
        assert_eq!(view.version().seq, 2);
    }

    #[test]
    fn test_empty_snapshot_leaves_scroll_alone() {
        let mut reconciler = ListReconciler::new();
        let mut view = ChatView::default();
        view.apply(&reconciler.on_change(snap(&[], 0)));
        assert_eq!(view.scroll_target(), None);
        assert!(view.render_lines().is_empty());
    }

    #[test]
    fn test_handle_ignores_lifecycle_messages() {
        let mut view = ChatView::default();
        assert!(!view.handle(&ViewUpdate::Started {
            version: ChangeVersion::INITIAL
        }));
        assert!(!view.handle(&ViewUpdate::Stopped));
    }

    #[test]
    fn test_render_row_uses_time_format() {
        let view = ChatView::new("T");
        let line = view.render_row(&Message::new("hello", 0));
        assert_eq!(line, "[T] hello");
    }

    #[test]
    fn test_invalid_time_format_renders_empty_label() {
        let view = ChatView::new("%Q");
        assert_eq!(view.render_row(&Message::new("hello", 0)), "[] hello");
    }

    #[test]
    fn test_describe_edit() {
        let insert = Edit::Insert {
            position: 3,
            item: Message::new("hi", 1),
        };
        assert_eq!(ChatView::describe_edit(&insert), "insert @3 \"hi\"");
        assert_eq!(
            ChatView::describe_edit(&Edit::Move { from: 0, to: 2 }),
            "move 0 -> 2"
        );
    }
}
