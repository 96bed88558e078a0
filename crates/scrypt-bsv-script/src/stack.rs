//! Execution stack with a parallel channel of slot names.
//!
//! Every value carries a symbolic name used by script tracing. Values and
//! names always move together; a length mismatch is a bug in the caller
//! and panics.

use crate::ScriptError;

/// Name given to a slot when the caller does not supply one.
pub const DEFAULT_VAR_NAME: &str = "$tmp";

/// A value stack with one symbolic name per slot.
///
/// Index 0 is the bottom of the stack. `stack_top(-1)` is the top.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionStack {
    values: Vec<Vec<u8>>,
    names: Vec<String>,
}

impl ExecutionStack {
    pub fn new() -> Self {
        ExecutionStack::default()
    }

    /// Build a stack from values and names of equal length.
    ///
    /// # Panics
    /// If `values` and `names` differ in length.
    pub fn from_parts(values: Vec<Vec<u8>>, names: Vec<String>) -> Self {
        let stack = ExecutionStack { values, names };
        stack.check_consistency();
        stack
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Push a value with an optional name (defaults to `$tmp`).
    pub fn push(&mut self, value: Vec<u8>, name: Option<&str>) {
        self.values.push(value);
        self.names.push(name.unwrap_or(DEFAULT_VAR_NAME).to_string());
        self.check_consistency();
    }

    /// Pop the top value together with its name and return the value.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.pop_named().map(|(value, _)| value)
    }

    /// Pop the top value and its name.
    pub fn pop_named(&mut self) -> Option<(Vec<u8>, String)> {
        let value = self.values.pop()?;
        let name = self.names.pop();
        self.check_consistency();
        name.map(|n| (value, n))
    }

    /// Push a value that keeps an existing name.
    pub fn push_named(&mut self, value: Vec<u8>, name: String) {
        self.values.push(value);
        self.names.push(name);
        self.check_consistency();
    }

    /// Overwrite the names of the top `names.len()` slots.
    ///
    /// The last name supplied lands on the top of the stack, the one before
    /// it one slot lower, and so on.
    ///
    /// # Returns
    /// `InconsistentStack` if more names are supplied than slots exist; the
    /// stack is left unchanged in that case.
    pub fn update_top_vars(&mut self, names: &[&str]) -> Result<(), ScriptError> {
        if names.len() > self.names.len() {
            return Err(ScriptError::InconsistentStack {
                names: names.len(),
                depth: self.names.len(),
            });
        }
        let start = self.names.len() - names.len();
        for (slot, name) in self.names[start..].iter_mut().zip(names) {
            *slot = name.to_string();
        }
        Ok(())
    }

    /// Remove `delete_count` slots starting at `start` and insert `items`
    /// (each with the default name) in their place. A `start` past the end
    /// appends.
    ///
    /// # Returns
    /// The removed values.
    pub fn splice(&mut self, start: usize, delete_count: usize, items: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        let named = items
            .into_iter()
            .map(|v| (v, DEFAULT_VAR_NAME.to_string()))
            .collect();
        self.splice_named(start, delete_count, named)
            .into_iter()
            .map(|(v, _)| v)
            .collect()
    }

    /// Like `splice`, but inserted items carry their own names and the
    /// removed slots are returned with theirs.
    pub fn splice_named(
        &mut self,
        start: usize,
        delete_count: usize,
        items: Vec<(Vec<u8>, String)>,
    ) -> Vec<(Vec<u8>, String)> {
        let start = start.min(self.values.len());
        let end = start.saturating_add(delete_count).min(self.values.len());
        let (new_values, new_names): (Vec<_>, Vec<_>) = items.into_iter().unzip();
        let removed_values: Vec<_> = self.values.splice(start..end, new_values).collect();
        let removed_names: Vec<_> = self.names.splice(start..end, new_names).collect();
        self.check_consistency();
        removed_values.into_iter().zip(removed_names).collect()
    }

    /// Value at a negative offset from the top (`-1` is the top).
    pub fn stack_top(&self, i: isize) -> Option<&Vec<u8>> {
        self.index_from_top(i).map(|idx| &self.values[idx])
    }

    /// Name at a negative offset from the top (`-1` is the top).
    pub fn var_top(&self, i: isize) -> Option<&str> {
        self.index_from_top(i).map(|idx| self.names[idx].as_str())
    }

    /// Replace the value at a negative offset from the top, keeping its name.
    ///
    /// # Returns
    /// `false` if the offset is outside the stack.
    pub fn write(&mut self, i: isize, value: Vec<u8>) -> bool {
        match self.index_from_top(i) {
            Some(idx) => {
                self.values[idx] = value;
                true
            }
            None => false,
        }
    }

    /// Copy of the values in `start..end` (clamped to the stack length).
    pub fn slice(&self, start: usize, end: usize) -> Vec<Vec<u8>> {
        let end = end.min(self.values.len());
        let start = start.min(end);
        self.values[start..end].to_vec()
    }

    /// All values, bottom first.
    pub fn values(&self) -> &[Vec<u8>] {
        &self.values
    }

    /// All names, bottom first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// An independent copy of the stack.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    fn index_from_top(&self, i: isize) -> Option<usize> {
        if i >= 0 {
            return None;
        }
        let back = i.unsigned_abs();
        self.values.len().checked_sub(back)
    }

    /// Assert that values and names have equal length.
    ///
    /// # Panics
    /// On mismatch, after logging both sequences.
    pub fn check_consistency(&self) {
        if self.values.len() != self.names.len() {
            tracing::error!(
                values = self.values.len(),
                names = self.names.len(),
                var_stack = ?self.names,
                "execution stack out of sync"
            );
            panic!(
                "checkConsistency fail, stack: {}, varStack: {}",
                self.values.len(),
                self.names.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(n: u8) -> ExecutionStack {
        let mut stack = ExecutionStack::new();
        for i in 0..n {
            stack.push(vec![i], None);
        }
        stack
    }

    #[test]
    fn test_push_pop_lockstep() {
        let mut stack = ExecutionStack::new();
        stack.push(vec![1], Some("a"));
        stack.push(vec![2], None);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.var_top(-1), Some(DEFAULT_VAR_NAME));
        assert_eq!(stack.var_top(-2), Some("a"));

        assert_eq!(stack.pop(), Some(vec![2]));
        assert_eq!(stack.pop_named(), Some((vec![1], "a".to_string())));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
        assert!(stack.names().is_empty());
    }

    #[test]
    fn test_update_top_vars_last_name_on_top() {
        let mut stack = stack_of(4);
        stack.update_top_vars(&["x", "y", "z"]).expect("fits");
        assert_eq!(stack.names(), &["$tmp", "x", "y", "z"]);
        assert_eq!(stack.var_top(-1), Some("z"));
    }

    #[test]
    fn test_update_top_vars_too_many_names() {
        let mut stack = stack_of(2);
        let before = stack.clone();
        let err = stack.update_top_vars(&["a", "b", "c"]).unwrap_err();
        assert!(matches!(
            err,
            ScriptError::InconsistentStack { names: 3, depth: 2 }
        ));
        assert_eq!(stack, before);
    }

    #[test]
    fn test_splice_mirrors_names() {
        let mut stack = stack_of(5);
        stack.update_top_vars(&["a", "b", "c", "d", "e"]).expect("fits");
        let removed = stack.splice(1, 2, vec![vec![9], vec![8], vec![7]]);
        assert_eq!(removed, vec![vec![1], vec![2]]);
        assert_eq!(stack.values(), &[vec![0], vec![9], vec![8], vec![7], vec![3], vec![4]]);
        assert_eq!(stack.names(), &["a", "$tmp", "$tmp", "$tmp", "d", "e"]);
    }

    #[test]
    fn test_splice_named_returns_names() {
        let mut stack = stack_of(3);
        stack.update_top_vars(&["a", "b", "c"]).expect("fits");
        let removed = stack.splice_named(1, 10, vec![]);
        assert_eq!(
            removed,
            vec![(vec![1], "b".to_string()), (vec![2], "c".to_string())]
        );
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_splice_past_end_appends() {
        let mut stack = ExecutionStack::new();
        stack.push(vec![1], None);
        let removed = stack.splice(3, 0, vec![vec![2]]);
        assert!(removed.is_empty());
        assert_eq!(stack.values(), &[vec![1], vec![2]]);

        let removed = stack.splice_named(usize::MAX, 4, vec![(vec![3], "x".to_string())]);
        assert!(removed.is_empty());
        assert_eq!(stack.names(), &["$tmp", "$tmp", "x"]);
    }

    #[test]
    fn test_write_and_stack_top() {
        let mut stack = stack_of(3);
        assert!(stack.write(-1, vec![0xff]));
        assert_eq!(stack.stack_top(-1), Some(&vec![0xff]));
        assert_eq!(stack.stack_top(-3), Some(&vec![0]));
        assert_eq!(stack.stack_top(-4), None);
        assert_eq!(stack.stack_top(0), None);
        assert!(!stack.write(-4, vec![]));
    }

    #[test]
    fn test_copy_is_independent() {
        let original = stack_of(2);
        let mut copy = original.copy();
        copy.push(vec![7], Some("extra"));
        copy.write(-2, vec![0xee]);
        assert_eq!(original.len(), 2);
        assert_eq!(original.stack_top(-1), Some(&vec![1]));
        assert_eq!(copy.len(), 3);
    }

    #[test]
    fn test_slice() {
        let stack = stack_of(4);
        assert_eq!(stack.slice(1, 3), vec![vec![1], vec![2]]);
        assert_eq!(stack.slice(3, 10), vec![vec![3]]);
    }

    #[test]
    #[should_panic(expected = "checkConsistency fail")]
    fn test_mismatched_parts_panic() {
        ExecutionStack::from_parts(vec![vec![1]], vec![]);
    }
}
