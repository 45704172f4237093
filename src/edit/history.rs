// Linear undo/redo history over EditSpec snapshots.
//
// A new push discards everything past the cursor; there is no branching.
// Entries are small Copy values, so an editing session keeps all of them.

use super::EditSpec;

#[derive(Debug, Clone)]
#[allow(clippy::len_without_is_empty)]
pub struct HistoryManager {
    entries: Vec<EditSpec>,
    cursor: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(EditSpec::identity())
    }
}

impl HistoryManager {
    /// Start a history whose oldest state is `initial`.
    pub fn new(initial: EditSpec) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    /// Record a new state. Forward history past the cursor is dropped.
    pub fn push(&mut self, spec: EditSpec) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(spec);
        self.cursor = self.entries.len() - 1;
        log::debug!("history push: {} entries, cursor {}", self.entries.len(), self.cursor);
    }

    /// Step back one state. `None` when already at the oldest state.
    pub fn undo(&mut self) -> Option<&EditSpec> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward one state. `None` when already at the newest state.
    pub fn redo(&mut self) -> Option<&EditSpec> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// The currently displayed state.
    pub fn current(&self) -> &EditSpec {
        &self.entries[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[EditSpec] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(brightness: f32) -> EditSpec {
        EditSpec { brightness, ..EditSpec::default() }
    }

    #[test]
    fn test_new_history_has_single_entry() {
        let history = HistoryManager::default();
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert!(history.current().is_identity());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_at_oldest_is_noop() {
        let mut history = HistoryManager::new(spec(10.0));
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.current().brightness, 10.0);
    }

    #[test]
    fn test_redo_at_newest_is_noop() {
        let mut history = HistoryManager::new(spec(10.0));
        history.push(spec(20.0));
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn test_undo_then_redo() {
        let mut history = HistoryManager::new(spec(10.0));
        history.push(spec(20.0));
        history.push(spec(30.0));

        assert_eq!(history.undo().map(|s| s.brightness), Some(20.0));
        assert_eq!(history.undo().map(|s| s.brightness), Some(10.0));
        assert!(history.undo().is_none());
        assert_eq!(history.redo().map(|s| s.brightness), Some(20.0));
        assert_eq!(history.redo().map(|s| s.brightness), Some(30.0));
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_push_after_undo_discards_forward_history() {
        // [A, B, C] at cursor 2 -> undo -> push(D) -> [A, B, D] at cursor 2
        let (a, b, c, d) = (spec(10.0), spec(20.0), spec(30.0), spec(40.0));
        let mut history = HistoryManager::new(a);
        history.push(b);
        history.push(c);
        assert_eq!(history.cursor(), 2);

        assert_eq!(history.undo(), Some(&b));
        assert_eq!(history.cursor(), 1);

        history.push(d);
        assert_eq!(history.entries(), &[a, b, d]);
        assert_eq!(history.cursor(), 2);
        assert!(history.redo().is_none());
        assert_eq!(history.current(), &d);
    }

    #[test]
    fn test_push_after_multiple_undos_truncates_to_cursor() {
        let mut history = HistoryManager::new(spec(0.0));
        for b in [10.0, 20.0, 30.0, 40.0] {
            history.push(spec(b));
        }
        history.undo();
        history.undo();
        history.undo();
        history.push(spec(99.0));
        assert_eq!(history.len(), 3);
        assert_eq!(history.current().brightness, 99.0);
        assert!(!history.can_redo());
    }
}
