// ChatLog - core/diff.rs
//
// List diff: computes an ordered edit script that transforms one sequence
// into another. Pure functions only, independent of any view toolkit.
//
// Algorithm:
//   1. Pair items by identity. The Nth occurrence of an id in `old` pairs
//      with the Nth occurrence in `new`; unpaired old items are removed and
//      unpaired new items are inserted.
//   2. Removes are emitted back to front so each position refers to the
//      list as it stands at that point.
//   3. Among the surviving items, one longest increasing subsequence (by
//      position in `new`) stays where it is. Every other survivor costs
//      exactly one move.
//   4. `new` is walked front to back; each inserted or moved item is placed
//      immediately after its predecessor in `new`.
//   5. Survivors whose contents changed get an in-place update, addressed
//      by their final position.
//
// Every position in the script is relative to the list produced by the
// edits before it, so a consumer applies the script strictly in order.

use crate::core::model::Message;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;

// =============================================================================
// Item comparison
// =============================================================================

/// How the diff engine compares list items.
///
/// `id` decides whether two values are the same item (possibly moved);
/// `same_contents` decides whether a paired item needs an in-place update.
pub trait Diffable: Clone {
    type Id: Eq + Hash;

    fn id(&self) -> Self::Id;

    fn same_contents(&self, other: &Self) -> bool;
}

impl Diffable for Message {
    type Id = (i64, String);

    fn id(&self) -> Self::Id {
        (self.timestamp, self.text.clone())
    }

    fn same_contents(&self, other: &Self) -> bool {
        self == other
    }
}

// =============================================================================
// Edit script
// =============================================================================

/// A single structural edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Edit<T> {
    /// Remove the item at `position`.
    Remove { position: usize },

    /// Insert `item` so that it ends up at `position`.
    Insert { position: usize, item: T },

    /// Take the item at `from` out of the list and re-insert it so that it
    /// ends up at `to`.
    Move { from: usize, to: usize },

    /// Replace the item at `position` with `item` (same identity, new contents).
    Update { position: usize, item: T },
}

/// Ordered list of edits. Empty when both sides were already equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EditScript<T> {
    edits: Vec<Edit<T>>,
}

impl<T> Default for EditScript<T> {
    fn default() -> Self {
        Self { edits: Vec::new() }
    }
}

impl<T> EditScript<T> {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn edits(&self) -> &[Edit<T>] {
        &self.edits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edit<T>> {
        self.edits.iter()
    }

    /// Count edits by kind.
    pub fn summary(&self) -> EditSummary {
        let mut summary = EditSummary::default();
        for edit in &self.edits {
            match edit {
                Edit::Remove { .. } => summary.removes += 1,
                Edit::Insert { .. } => summary.inserts += 1,
                Edit::Move { .. } => summary.moves += 1,
                Edit::Update { .. } => summary.updates += 1,
            }
        }
        summary
    }
}

impl<T: Clone> EditScript<T> {
    /// Apply every edit in order to `list`.
    ///
    /// # Panics
    ///
    /// Panics if a position is out of bounds, which only happens when the
    /// script was computed against a different list.
    pub fn apply(&self, list: &mut Vec<T>) {
        for edit in &self.edits {
            match edit {
                Edit::Remove { position } => {
                    list.remove(*position);
                }
                Edit::Insert { position, item } => list.insert(*position, item.clone()),
                Edit::Move { from, to } => {
                    let item = list.remove(*from);
                    list.insert(*to, item);
                }
                Edit::Update { position, item } => list[*position] = item.clone(),
            }
        }
    }
}

impl<'a, T> IntoIterator for &'a EditScript<T> {
    type Item = &'a Edit<T>;
    type IntoIter = std::slice::Iter<'a, Edit<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.edits.iter()
    }
}

/// Per-kind edit counts, used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EditSummary {
    pub inserts: usize,
    pub removes: usize,
    pub moves: usize,
    pub updates: usize,
}

impl fmt::Display for EditSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} -{} ~{} ={}",
            self.inserts, self.removes, self.moves, self.updates
        )
    }
}

// =============================================================================
// Diff
// =============================================================================

/// Compute the edit script that turns `old` into `new`.
pub fn diff<T: Diffable>(old: &[T], new: &[T]) -> EditScript<T> {
    // -- 1. Pair by identity, Nth occurrence with Nth occurrence --
    let mut unclaimed: HashMap<T::Id, VecDeque<usize>> = HashMap::with_capacity(new.len());
    for (j, item) in new.iter().enumerate() {
        unclaimed.entry(item.id()).or_default().push_back(j);
    }

    let mut new_to_old: Vec<Option<usize>> = vec![None; new.len()];
    let mut old_to_new: Vec<Option<usize>> = Vec::with_capacity(old.len());
    for (i, item) in old.iter().enumerate() {
        let paired = unclaimed.get_mut(&item.id()).and_then(VecDeque::pop_front);
        if let Some(j) = paired {
            new_to_old[j] = Some(i);
        }
        old_to_new.push(paired);
    }

    let mut edits = Vec::new();

    // -- 2. Removes, back to front --
    for (i, paired) in old_to_new.iter().enumerate().rev() {
        if paired.is_none() {
            edits.push(Edit::Remove { position: i });
        }
    }

    // Working list: survivors in their current order, named by new index.
    let mut current: Vec<usize> = old_to_new.iter().flatten().copied().collect();

    // -- 3. Survivors that never move --
    let mut stays = vec![false; new.len()];
    for (k, keep) in longest_increasing_subsequence(&current)
        .into_iter()
        .enumerate()
    {
        if keep {
            stays[current[k]] = true;
        }
    }

    // -- 4. Inserts and moves, front to back --
    for j in 0..new.len() {
        let target = j
            .checked_sub(1)
            .and_then(|prev| position_of(&current, prev))
            .map_or(0, |p| p + 1);

        match new_to_old[j] {
            None => {
                current.insert(target, j);
                edits.push(Edit::Insert {
                    position: target,
                    item: new[j].clone(),
                });
            }
            Some(_) if stays[j] => {}
            Some(_) => {
                if let Some(from) = position_of(&current, j) {
                    let to = if from < target { target - 1 } else { target };
                    if from != to {
                        current.remove(from);
                        current.insert(to, j);
                        edits.push(Edit::Move { from, to });
                    }
                }
            }
        }
    }

    // -- 5. In-place updates at final positions --
    for (j, paired) in new_to_old.iter().enumerate() {
        if let Some(i) = *paired {
            if !old[i].same_contents(&new[j]) {
                edits.push(Edit::Update {
                    position: j,
                    item: new[j].clone(),
                });
            }
        }
    }

    EditScript { edits }
}

fn position_of(current: &[usize], new_index: usize) -> Option<usize> {
    current.iter().position(|&j| j == new_index)
}

/// Mark one longest strictly increasing subsequence of `seq`.
///
/// Patience sorting with back-links, O(n log n).
fn longest_increasing_subsequence(seq: &[usize]) -> Vec<bool> {
    // tails[k]: index in `seq` of the smallest tail of any run of length k + 1.
    let mut tails: Vec<usize> = Vec::new();
    let mut back: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < value);
        if k > 0 {
            back[i] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut keep = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        keep[i] = true;
        cursor = back[i];
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str, ts: i64) -> Message {
        Message::new(text, ts)
    }

    fn msgs(items: &[(&str, i64)]) -> Vec<Message> {
        items.iter().map(|(t, ts)| msg(t, *ts)).collect()
    }

    /// Apply `diff(old, new)` to a copy of `old` and check it yields `new`.
    fn round_trip<T: Diffable + PartialEq + std::fmt::Debug>(old: &[T], new: &[T]) -> EditScript<T> {
        let script = diff(old, new);
        let mut list = old.to_vec();
        script.apply(&mut list);
        assert_eq!(list, new, "script {script:?} did not reproduce new");
        script
    }

    #[test]
    fn test_identical_lists_produce_no_edits() {
        let a = msgs(&[("hi", 1), ("there", 2), ("you", 3)]);
        assert!(diff(&a, &a.clone()).is_empty());
        assert!(diff::<Message>(&[], &[]).is_empty());
    }

    #[test]
    fn test_append_is_single_insert_at_end() {
        let old = msgs(&[("hi", 1)]);
        let new = msgs(&[("hi", 1), ("there", 2)]);
        let script = round_trip(&old, &new);
        assert_eq!(
            script.edits(),
            &[Edit::Insert {
                position: 1,
                item: msg("there", 2)
            }]
        );
    }

    #[test]
    fn test_from_empty_inserts_in_order() {
        let new = msgs(&[("a", 1), ("b", 2), ("c", 3)]);
        let script = round_trip(&[], &new);
        let positions: Vec<usize> = script
            .iter()
            .map(|e| match e {
                Edit::Insert { position, .. } => *position,
                other => panic!("unexpected edit {other:?}"),
            })
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_to_empty_removes_back_to_front() {
        let old = msgs(&[("a", 1), ("b", 2), ("c", 3)]);
        let script = round_trip(&old, &[]);
        assert_eq!(
            script.edits(),
            &[
                Edit::Remove { position: 2 },
                Edit::Remove { position: 1 },
                Edit::Remove { position: 0 },
            ]
        );
    }

    #[test]
    fn test_eviction_plus_append_is_remove_then_insert() {
        let old: Vec<Message> = (0..100).map(|i| msg(&format!("m{i}"), i)).collect();
        let new: Vec<Message> = (1..101).map(|i| msg(&format!("m{i}"), i)).collect();
        let script = round_trip(&old, &new);
        assert_eq!(
            script.edits(),
            &[
                Edit::Remove { position: 0 },
                Edit::Insert {
                    position: 99,
                    item: msg("m100", 100)
                },
            ]
        );
    }

    #[test]
    fn test_rotation_costs_one_move() {
        let old = msgs(&[("d", 4), ("a", 1), ("b", 2), ("c", 3)]);
        let new = msgs(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]);
        let script = round_trip(&old, &new);
        assert_eq!(script.summary().moves, 1);
        assert_eq!(script.len(), 1);
    }

    #[test]
    fn test_swap_costs_one_move() {
        let old = msgs(&[("a", 1), ("b", 2)]);
        let new = msgs(&[("b", 2), ("a", 1)]);
        let script = round_trip(&old, &new);
        assert_eq!(script.len(), 1);
        assert!(matches!(script.edits()[0], Edit::Move { .. }));
    }

    #[test]
    fn test_reversal_moves_all_but_one() {
        let old: Vec<Message> = (0..6).map(|i| msg("x", i)).collect();
        let new: Vec<Message> = old.iter().rev().cloned().collect();
        let script = round_trip(&old, &new);
        let summary = script.summary();
        assert_eq!(summary.moves, 5);
        assert_eq!(summary.inserts + summary.removes + summary.updates, 0);
    }

    #[test]
    fn test_same_text_different_timestamp_is_different_item() {
        let old = msgs(&[("hi", 1)]);
        let new = msgs(&[("hi", 2)]);
        let summary = round_trip(&old, &new).summary();
        assert_eq!(summary.removes, 1);
        assert_eq!(summary.inserts, 1);
    }

    #[test]
    fn test_duplicates_pair_in_order() {
        // Three identical items; the last one is dropped, so the first two
        // pair with the first two and only position 2 is removed.
        let old = msgs(&[("dup", 5), ("dup", 5), ("dup", 5)]);
        let new = msgs(&[("dup", 5), ("dup", 5)]);
        let script = round_trip(&old, &new);
        assert_eq!(script.edits(), &[Edit::Remove { position: 2 }]);
    }

    #[test]
    fn test_duplicates_with_new_item_between() {
        let old = msgs(&[("dup", 5), ("dup", 5)]);
        let new = msgs(&[("dup", 5), ("mid", 6), ("dup", 5)]);
        let script = round_trip(&old, &new);
        assert_eq!(
            script.edits(),
            &[Edit::Insert {
                position: 1,
                item: msg("mid", 6)
            }]
        );
    }

    #[test]
    fn test_mixed_edits_round_trip() {
        let old = msgs(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]);
        let new = msgs(&[("e", 5), ("b", 2), ("x", 9), ("a", 1), ("d", 4)]);
        let summary = round_trip(&old, &new).summary();
        assert_eq!(summary.removes, 1); // c
        assert_eq!(summary.inserts, 1); // x
        assert_eq!(summary.moves, 2); // survivors b,a,d,e in old order -> e,b,a,d
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        key: u32,
        label: &'static str,
    }

    impl Diffable for Row {
        type Id = u32;

        fn id(&self) -> u32 {
            self.key
        }

        fn same_contents(&self, other: &Self) -> bool {
            self.label == other.label
        }
    }

    #[test]
    fn test_changed_contents_emit_update_at_final_position() {
        let old = vec![Row { key: 1, label: "a" }, Row { key: 2, label: "b" }];
        let new = vec![Row { key: 2, label: "B" }, Row { key: 1, label: "a" }];
        let script = round_trip(&old, &new);
        let summary = script.summary();
        assert_eq!(summary.moves, 1);
        assert_eq!(summary.updates, 1);
        assert!(script.iter().any(|e| matches!(
            e,
            Edit::Update { position: 0, item } if item.label == "B"
        )));
    }

    /// Small deterministic generator so the exhaustive check needs no extra crate.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }

        fn list(&mut self) -> Vec<Message> {
            let len = self.next(12) as usize;
            (0..len)
                .map(|_| {
                    let ts = self.next(6) as i64;
                    msg(["a", "b", "c"][self.next(3) as usize], ts)
                })
                .collect()
        }
    }

    #[test]
    fn test_random_lists_round_trip() {
        let mut rng = Lcg(0x5eed);
        for _ in 0..2_000 {
            let old = rng.list();
            let new = rng.list();
            let script = round_trip(&old, &new);

            // Messages compare by identity only, so updates never appear.
            assert_eq!(script.summary().updates, 0);

            // Paired items are never both removed and re-inserted.
            let summary = script.summary();
            assert!(summary.inserts <= new.len());
            assert!(summary.removes <= old.len());
            assert_eq!(old.len() - summary.removes + summary.inserts, new.len());
        }
    }

    #[test]
    fn test_lis_marks_longest_run() {
        let keep = longest_increasing_subsequence(&[3, 0, 1, 4, 2]);
        let kept: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter(|(_, k)| **k)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(kept.len(), 3);
        assert!(longest_increasing_subsequence(&[]).is_empty());
    }

    #[test]
    fn test_script_serialises_as_tagged_ops() {
        let script = diff(&msgs(&[("a", 1)]), &msgs(&[("b", 2)]));
        let json = serde_json::to_string(&script).unwrap();
        assert_eq!(
            json,
            r#"[{"op":"remove","position":0},{"op":"insert","position":0,"item":{"text":"b","timestamp":2}}]"#
        );
    }

    #[test]
    fn test_summary_display() {
        let summary = EditSummary {
            inserts: 2,
            removes: 1,
            moves: 0,
            updates: 0,
        };
        assert_eq!(summary.to_string(), "+2 -1 ~0 =0");
    }
}
