//! Reconciliation of predicted vs. authoritative field slots (spec §3,
//! §9 Design Note "Rollback discipline"): a field whose `EntityFieldInfo`
//! marks it non-predicted is never replayed forward during rollback — it is
//! instead copied straight from the last-received authoritative value into
//! the entity's live slot.

use entityplex_shared::FieldId;

/// Implemented by concrete entity types that distinguish predicted fields
/// (replayed forward during rollback) from non-predicted ones (always
/// mirrored from the latest authoritative value). A given entity type knows
/// its own field layout, so it owns the match from `field_id` to the
/// concrete `TrackedField` that needs refreshing.
pub trait Predictable {
    /// Copies the authoritative value for `field_id` into this entity's live
    /// slot, bypassing prediction. Called once per non-predicted field,
    /// after a rollback replay restores the fixed/received state but before
    /// gameplay resumes reading it (Design Note "Rollback discipline").
    fn reconcile_field(&mut self, field_id: FieldId);
}
