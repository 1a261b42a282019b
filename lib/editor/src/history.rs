//! Bounded undo/redo history of graph snapshots.
//!
//! The history owns deep copies only, never aliases of the live graph,
//! so later mutations of the store cannot corrupt a stored snapshot. The
//! stack is bounded; pushing past the cap evicts the oldest entry.

use crate::graph::EditorGraph;

/// Maximum number of snapshots retained.
pub const MAX_HISTORY: usize = 50;

/// Undo/redo stack of graph snapshots.
///
/// `cursor` indexes the snapshot describing the current state, or -1
/// when the stack is empty. `undo`/`redo` move the cursor and hand back
/// the snapshot for the caller to load into the graph store; applying a
/// snapshot is a load, not a mutation, and must not push.
#[derive(Debug, Default)]
pub struct History {
    stack: Vec<EditorGraph>,
    cursor: isize,
}

impl History {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            cursor: -1,
        }
    }

    /// Records a snapshot of the current state.
    ///
    /// Entries after the cursor (undone states) are discarded. When the
    /// stack exceeds [`MAX_HISTORY`], the oldest entry is evicted and the
    /// cursor shifts with it.
    pub fn push(&mut self, snapshot: EditorGraph) {
        let keep = (self.cursor + 1) as usize;
        self.stack.truncate(keep);
        self.stack.push(snapshot);
        self.cursor = self.stack.len() as isize - 1;

        if self.stack.len() > MAX_HISTORY {
            self.stack.remove(0);
            self.cursor -= 1;
        }
    }

    /// Steps back one snapshot.
    ///
    /// Returns `None` (and does nothing) when there is nothing earlier to
    /// return to.
    pub fn undo(&mut self) -> Option<&EditorGraph> {
        if self.cursor <= 0 {
            return None;
        }
        self.cursor -= 1;
        self.stack.get(self.cursor as usize)
    }

    /// Steps forward one snapshot.
    ///
    /// Returns `None` (and does nothing) when already at the newest
    /// snapshot.
    pub fn redo(&mut self) -> Option<&EditorGraph> {
        if self.cursor >= self.stack.len() as isize - 1 {
            return None;
        }
        self.cursor += 1;
        self.stack.get(self.cursor as usize)
    }

    /// Discards all snapshots.
    pub fn clear(&mut self) {
        self.stack.clear();
        self.cursor = -1;
    }

    /// Returns whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Returns whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor < self.stack.len() as isize - 1
    }

    /// Returns the number of retained snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns whether the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Returns the cursor position (-1 when empty).
    #[must_use]
    pub fn cursor(&self) -> isize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_workflow::{Node, Position};

    fn snapshot(node_count: usize) -> EditorGraph {
        let mut graph = EditorGraph::new();
        for i in 0..node_count {
            graph
                .nodes
                .push(Node::with_id(format!("n{i}"), "click", Position::default()));
        }
        graph
    }

    #[test]
    fn empty_history_cannot_step() {
        let mut history = History::new();
        assert_eq!(history.cursor(), -1);
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn undo_redo_walk_the_stack() {
        let mut history = History::new();
        history.push(snapshot(1));
        history.push(snapshot(2));
        history.push(snapshot(3));

        assert_eq!(history.undo().unwrap().nodes.len(), 2);
        assert_eq!(history.undo().unwrap().nodes.len(), 1);
        assert!(history.undo().is_none()); // floor

        assert_eq!(history.redo().unwrap().nodes.len(), 2);
        assert_eq!(history.redo().unwrap().nodes.len(), 3);
        assert!(history.redo().is_none()); // ceiling
    }

    #[test]
    fn push_truncates_redo_branch() {
        let mut history = History::new();
        history.push(snapshot(1));
        history.push(snapshot(2));
        history.push(snapshot(3));
        history.undo();
        history.undo();

        history.push(snapshot(9));
        assert_eq!(history.len(), 2); // snapshot(1) + snapshot(9)
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn stack_is_bounded_at_fifty() {
        let mut history = History::new();
        for i in 0..60 {
            history.push(snapshot(i));
        }

        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.cursor(), MAX_HISTORY as isize - 1);

        // The oldest ten entries were evicted: walking all the way back
        // lands on snapshot(10).
        let mut earliest = 0;
        while history.can_undo() {
            earliest = history.undo().unwrap().nodes.len();
        }
        assert_eq!(earliest, 10);
    }

    #[test]
    fn undo_then_redo_round_trip() {
        let mut history = History::new();
        for i in 1..=5 {
            history.push(snapshot(i));
        }
        for _ in 0..5 {
            history.undo();
        }
        let mut last = 0;
        for _ in 0..5 {
            if let Some(graph) = history.redo() {
                last = graph.nodes.len();
            }
        }
        assert_eq!(last, 5);
        assert_eq!(history.cursor(), 4);
    }

    #[test]
    fn clear_resets_cursor() {
        let mut history = History::new();
        history.push(snapshot(1));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), -1);
        assert!(history.undo().is_none());
    }
}
