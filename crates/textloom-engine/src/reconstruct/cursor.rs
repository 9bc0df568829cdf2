//! Attribute cursors: per-object, per-attribute consumption bookkeeping.
//!
//! A [`CursorState`] is an immutable snapshot. Consuming a value produces a
//! *new* snapshot; backtracking never decrements anything, it simply reuses
//! the snapshot captured when the abandoned branch was entered. This keeps
//! the cursor value at any search position a pure function of the tokens
//! bound before it.

use textloom_syntax::{ObjId, SemanticModel, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    /// `consumed[obj][attr_index]` = number of values consumed so far.
    consumed: Vec<Vec<u32>>,
}

impl CursorState {
    /// Fresh snapshot with nothing consumed, sized to the model.
    pub fn new(model: &SemanticModel) -> Self {
        let consumed = (0..model.len())
            .map(|i| vec![0; model.object(ObjId(i as u32)).attributes.len()])
            .collect();
        Self { consumed }
    }

    pub fn consumed_count(&self, obj: ObjId, attr_index: usize) -> u32 {
        self.consumed[obj.0 as usize][attr_index]
    }

    /// Next unconsumed value of the attribute, without mutating anything.
    pub fn peek_next<'m>(
        &self,
        model: &'m SemanticModel,
        obj: ObjId,
        attr: &str,
    ) -> Option<&'m Value> {
        let idx = model.attr_index(obj, attr)?;
        let n = self.consumed_count(obj, idx) as usize;
        model.object(obj).attributes[idx].values.get(n)
    }

    /// Consume the next value of the attribute, returning it together with
    /// the successor snapshot. `None` when the attribute is missing or
    /// exhausted.
    pub fn consume(
        &self,
        model: &SemanticModel,
        obj: ObjId,
        attr: &str,
    ) -> Option<(Value, CursorState)> {
        let idx = model.attr_index(obj, attr)?;
        let value = self.peek_next(model, obj, attr)?.clone();
        let mut next = self.clone();
        next.consumed[obj.0 as usize][idx] += 1;
        Some((value, next))
    }

    /// Whether every attribute of the object has consumed all its values.
    pub fn is_fully_consumed(&self, model: &SemanticModel, obj: ObjId) -> bool {
        model
            .object(obj)
            .attributes
            .iter()
            .enumerate()
            .all(|(i, a)| self.consumed_count(obj, i) as usize >= a.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_value_model() -> (SemanticModel, ObjId) {
        let mut m = SemanticModel::new();
        let o = m.add_object("M");
        m.push_value(o, "items", Value::Str("a".into()));
        m.push_value(o, "items", Value::Str("b".into()));
        (m, o)
    }

    #[test]
    fn peek_does_not_advance() {
        let (m, o) = two_value_model();
        let s = CursorState::new(&m);
        assert_eq!(s.peek_next(&m, o, "items"), Some(&Value::Str("a".into())));
        assert_eq!(s.peek_next(&m, o, "items"), Some(&Value::Str("a".into())));
    }

    #[test]
    fn consume_returns_successor_snapshot() {
        let (m, o) = two_value_model();
        let s0 = CursorState::new(&m);
        let (v1, s1) = s0.consume(&m, o, "items").unwrap();
        assert_eq!(v1, Value::Str("a".into()));
        // the original snapshot is untouched - that is what backtracking
        // relies on
        assert_eq!(s0.peek_next(&m, o, "items"), Some(&Value::Str("a".into())));
        assert_eq!(s1.peek_next(&m, o, "items"), Some(&Value::Str("b".into())));

        let (v2, s2) = s1.consume(&m, o, "items").unwrap();
        assert_eq!(v2, Value::Str("b".into()));
        assert_eq!(s2.consume(&m, o, "items"), None);
    }

    #[test]
    fn fully_consumed_requires_every_attribute() {
        let (mut m, o) = two_value_model();
        m.push_value(o, "name", Value::Str("x".into()));
        let s0 = CursorState::new(&m);
        assert!(!s0.is_fully_consumed(&m, o));

        let (_, s1) = s0.consume(&m, o, "items").unwrap();
        let (_, s2) = s1.consume(&m, o, "items").unwrap();
        assert!(!s2.is_fully_consumed(&m, o));

        let (_, s3) = s2.consume(&m, o, "name").unwrap();
        assert!(s3.is_fully_consumed(&m, o));
    }

    #[test]
    fn missing_attribute_is_not_consumable() {
        let (m, o) = two_value_model();
        let s = CursorState::new(&m);
        assert_eq!(s.peek_next(&m, o, "missing"), None);
        assert_eq!(s.consume(&m, o, "missing"), None);
    }
}
