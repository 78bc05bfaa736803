//! The per-field write barrier (spec §4.6): a [`TrackedField`] compares
//! old/new values on write and reports whether the value actually changed, so
//! callers can route a changed value into [`crate::role::RoleHooks::on_entity_field_changed`].
//!
//! A smart-pointer-shaped wrapper that gates writes behind an equality
//! check, without the Host/Remote/Delegated/Local state machine a wire
//! protocol would need: the wire protocol is an out-of-scope collaborator
//! here (spec §1), so one plain state is enough.

use std::ops::Deref;

use crate::class_registry::FieldId;

/// Bound satisfied by any type usable as entity field state.
pub trait FieldValue: Clone + PartialEq + 'static {}
impl<T: Clone + PartialEq + 'static> FieldValue for T {}

/// A field slot that remembers its stable [`FieldId`] and gates writes behind
/// an equality check (spec §4.6 "the per-field write barrier").
#[derive(Debug, Clone)]
pub struct TrackedField<T: FieldValue> {
    field_id: FieldId,
    value: T,
}

impl<T: FieldValue> TrackedField<T> {
    pub fn new(field_id: FieldId, value: T) -> Self {
        Self { field_id, value }
    }

    pub fn field_id(&self) -> FieldId {
        self.field_id
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Assigns `new_value`, returning `true` iff it differs from the
    /// previous value. The write barrier itself: callers that want
    /// `EntityFieldChanged` notifications should only fire them when this
    /// returns `true` (spec §4.6).
    pub fn set(&mut self, new_value: T) -> bool {
        let changed = self.value != new_value;
        self.value = new_value;
        changed
    }

    /// Set without ever comparing — used by rollback replay when writing the
    /// "fixed" slot back from history, where spurious-looking "no change"
    /// should not suppress anything (Design Note "Rollback discipline").
    pub fn set_unconditionally(&mut self, new_value: T) {
        self.value = new_value;
    }
}

impl<T: FieldValue> Deref for TrackedField<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_change_only_when_value_differs() {
        let mut field = TrackedField::new(3, 10u32);
        assert!(!field.set(10));
        assert!(field.set(11));
        assert_eq!(*field.get(), 11);
    }
}
