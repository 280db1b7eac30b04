//! Stamina bounds.
//!
//! Heroes may fall below zero down to their negative floor (`min`); every
//! other entity bottoms out at zero. Nobody exceeds `max`. The clamp runs after
//! every change to permanent stamina, undo included, with whatever bounds the
//! entity has *now*.

use crate::types::{Entity, EntityClass};

/// Clamp a raw permanent stamina value into the legal range for `class`.
pub fn clamp(class: EntityClass, raw_permanent: i64, min: i64, max: i64) -> i64 {
    let floor = match class {
        EntityClass::Hero => min,
        EntityClass::NonHero => 0,
    };
    // max() last so a misconfigured floor above the ceiling still yields the floor
    raw_permanent.min(max).max(floor)
}

/// Clamp `raw_permanent` against the entity's current bounds.
pub fn clamp_for(entity: &Entity, raw_permanent: i64) -> i64 {
    clamp(
        entity.class,
        raw_permanent,
        entity.stamina.min,
        entity.stamina.max,
    )
}

/// Temporary stamina never drops below zero and is never capped by `max`.
pub fn clamp_temporary(raw_temporary: i64) -> i64 {
    raw_temporary.max(0)
}
