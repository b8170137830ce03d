// ChatLog - app/compose.rs
//
// Producer side: turns raw user input into store appends.
// The store accepts any string, so input hygiene happens here.

use crate::app::store::MessageStore;
use crate::core::model::ChangeVersion;
use crate::util::logging::preview;

/// What happened to one piece of submitted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Appended; the store is now at this version.
    Sent(ChangeVersion),

    /// Empty after trimming; nothing was appended.
    Ignored,
}

/// Trim `raw` and append it unless nothing is left.
pub fn submit(store: &MessageStore, raw: &str) -> SubmitOutcome {
    let text = raw.trim();
    if text.is_empty() {
        tracing::trace!("Ignoring blank input");
        return SubmitOutcome::Ignored;
    }
    tracing::debug!(text = %preview(text), "Submitting message");
    SubmitOutcome::Sent(store.append(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_trims_whitespace() {
        let store = MessageStore::new();
        let outcome = submit(&store, "  hello world \n");
        assert!(matches!(outcome, SubmitOutcome::Sent(v) if v.seq == 1));
        assert_eq!(store.snapshot()[0].text, "hello world");
    }

    #[test]
    fn test_blank_input_never_reaches_store() {
        let store = MessageStore::new();
        assert_eq!(submit(&store, ""), SubmitOutcome::Ignored);
        assert_eq!(submit(&store, " \t\r\n "), SubmitOutcome::Ignored);
        assert!(store.is_empty());
        assert_eq!(store.version().seq, 0);
    }
}
