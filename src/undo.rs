//! Snapshot-based undo/redo for in-session edits.
//!
//! The editor pushes the last committed state of the shape collection before
//! applying a change. History lives only as long as the session.

use crate::constants::UNDO_HISTORY_SIZE;

/// A bounded undo/redo history of snapshots.
///
/// # Example
/// ```
/// use labelcanvas::undo::UndoStack;
///
/// let mut stack: UndoStack<Vec<u32>> = UndoStack::new(10);
///
/// // Before making a change, push current state
/// stack.push(vec![1]);
/// let current = vec![1, 2];
///
/// // Undo returns the previous state
/// assert_eq!(stack.undo(current), Some(vec![1]));
/// ```
#[derive(Debug, Clone)]
pub struct UndoStack<T: Clone> {
    /// States that can be undone, oldest first
    undo_stack: Vec<T>,
    /// States that can be redone
    redo_stack: Vec<T>,
    /// Maximum history size
    max_history: usize,
}

impl<T: Clone> Default for UndoStack<T> {
    fn default() -> Self {
        Self::new(UNDO_HISTORY_SIZE)
    }
}

impl<T: Clone> UndoStack<T> {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history,
        }
    }

    /// Record a state before changing it. Clears the redo history.
    pub fn push(&mut self, state: T) {
        if self.max_history == 0 {
            return;
        }
        self.undo_stack.push(state);
        self.redo_stack.clear();

        while self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Return the previous state; `current` moves onto the redo stack.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let prev = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(prev)
    }

    /// Return the next state; `current` moves onto the undo stack.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo() {
        let mut stack = UndoStack::new(10);
        stack.push(1);
        stack.push(2);

        assert_eq!(stack.undo(3), Some(2));
        assert_eq!(stack.undo(2), Some(1));
        assert_eq!(stack.undo(1), None);
        assert_eq!(stack.redo(1), Some(2));
        assert_eq!(stack.redo(2), Some(3));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_push_clears_redo() {
        let mut stack = UndoStack::new(10);
        stack.push("a");
        assert_eq!(stack.undo("b"), Some("a"));
        assert!(stack.can_redo());
        stack.push("c");
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut stack = UndoStack::new(3);
        for i in 0..5 {
            stack.push(i);
        }
        assert_eq!(stack.undo_count(), 3);
        assert_eq!(stack.undo(5), Some(4));
        assert_eq!(stack.undo(4), Some(3));
        assert_eq!(stack.undo(3), Some(2));
        assert_eq!(stack.undo(2), None);
    }

    #[test]
    fn test_zero_history_records_nothing() {
        let mut stack = UndoStack::new(0);
        stack.push(1);
        assert!(!stack.can_undo());
    }
}
