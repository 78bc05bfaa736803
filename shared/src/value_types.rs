//! Process-wide, once-initialized registry of [`ValueTypeProcessor`]s (spec §5
//! "Global mutable state (`ValueTypeProcessor.Registered`)", §6
//! "`ValueTypeProcessor<T>`").
//!
//! Custom user types are registered by the host at startup, before any
//! [`crate::manager::EntityManager`] is constructed, via
//! [`register_field_type`]/[`register_field_type_with_interpolator`]. After
//! that point the registry is read-only, matching the Design Note: "Convert
//! to a once-initialized immutable registry keyed by type-id known at compile
//! time, populated before any manager exists."

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::sync::RwLock;

/// Copy, compare, and (optionally) interpolate for one field type (spec §6).
pub trait ValueTypeProcessor<T>: Send + Sync {
    fn copy(&self, value: &T) -> T;
    fn compare(&self, a: &T, b: &T) -> bool;
    /// Linear interpolation between `from` and `to` at fraction `t` in
    /// `[0, 1]`. Returns `None` for types with no defined interpolation
    /// (interpolation is required only for [`FloatAngle`], spec §6).
    fn interpolate(&self, from: &T, to: &T, t: f32) -> Option<T>;
}

struct ErasedEntry {
    processor: Box<dyn Any + Send + Sync>,
}

fn registry() -> &'static RwLock<HashMap<TypeId, ErasedEntry>> {
    static REGISTRY: OnceLock<RwLock<HashMap<TypeId, ErasedEntry>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(built_in_processors()))
}

/// `RegisterFieldType<T>(interpolator)` (spec §6).
pub fn register_field_type_with_interpolator<T, P>(processor: P)
where
    T: 'static,
    P: ValueTypeProcessor<T> + 'static,
{
    let boxed: Box<dyn ValueTypeProcessor<T>> = Box::new(processor);
    let mut guard = registry().write().expect("value type registry poisoned");
    guard.insert(
        TypeId::of::<T>(),
        ErasedEntry {
            processor: Box::new(boxed),
        },
    );
}

/// `RegisterFieldType<T>()` using `T`'s own `Clone`/`PartialEq` for copy and
/// compare, with no interpolation.
pub fn register_field_type<T>()
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    register_field_type_with_interpolator::<T, _>(DefaultProcessor::<T>::new());
}

pub fn is_registered<T: 'static>() -> bool {
    registry()
        .read()
        .expect("value type registry poisoned")
        .contains_key(&TypeId::of::<T>())
}

pub fn with_processor<T, R>(f: impl FnOnce(&dyn ValueTypeProcessor<T>) -> R) -> Option<R>
where
    T: 'static,
{
    let guard = registry().read().expect("value type registry poisoned");
    let entry = guard.get(&TypeId::of::<T>())?;
    let processor = entry
        .processor
        .downcast_ref::<Box<dyn ValueTypeProcessor<T>>>()?;
    Some(f(processor.as_ref()))
}

struct DefaultProcessor<T>(std::marker::PhantomData<T>);

impl<T> DefaultProcessor<T> {
    fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<T: Clone + PartialEq + Send + Sync> ValueTypeProcessor<T> for DefaultProcessor<T> {
    fn copy(&self, value: &T) -> T {
        value.clone()
    }

    fn compare(&self, a: &T, b: &T) -> bool {
        a == b
    }

    fn interpolate(&self, _from: &T, _to: &T, _t: f32) -> Option<T> {
        None
    }
}

/// A wrapped angle in radians, normalized on construction to `(-PI, PI]`.
/// Required to interpolate along the shortest arc rather than linearly
/// between raw radian values (spec §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatAngle(f32);

impl FloatAngle {
    pub fn from_radians(radians: f32) -> Self {
        Self(Self::normalize(radians))
    }

    pub fn radians(&self) -> f32 {
        self.0
    }

    fn normalize(radians: f32) -> f32 {
        use std::f32::consts::PI;
        let mut r = radians % (2.0 * PI);
        if r <= -PI {
            r += 2.0 * PI;
        } else if r > PI {
            r -= 2.0 * PI;
        }
        r
    }

    /// Shortest-arc linear interpolation (spec §6).
    pub fn lerp(from: FloatAngle, to: FloatAngle, t: f32) -> FloatAngle {
        use std::f32::consts::PI;
        let mut diff = to.0 - from.0;
        if diff > PI {
            diff -= 2.0 * PI;
        } else if diff < -PI {
            diff += 2.0 * PI;
        }
        FloatAngle::from_radians(from.0 + diff * t)
    }
}

struct FloatAngleProcessor;

impl ValueTypeProcessor<FloatAngle> for FloatAngleProcessor {
    fn copy(&self, value: &FloatAngle) -> FloatAngle {
        *value
    }

    fn compare(&self, a: &FloatAngle, b: &FloatAngle) -> bool {
        a == b
    }

    fn interpolate(&self, from: &FloatAngle, to: &FloatAngle, t: f32) -> Option<FloatAngle> {
        Some(FloatAngle::lerp(*from, *to, t))
    }
}

fn built_in_processors() -> HashMap<TypeId, ErasedEntry> {
    let mut map = HashMap::new();
    macro_rules! default_scalar {
        ($t:ty) => {
            let boxed: Box<dyn ValueTypeProcessor<$t>> = Box::new(DefaultProcessor::<$t>::new());
            map.insert(
                TypeId::of::<$t>(),
                ErasedEntry {
                    processor: Box::new(boxed),
                },
            );
        };
    }
    default_scalar!(u8);
    default_scalar!(u16);
    default_scalar!(u32);
    default_scalar!(u64);
    default_scalar!(i8);
    default_scalar!(i16);
    default_scalar!(i32);
    default_scalar!(i64);
    default_scalar!(f32);
    default_scalar!(f64);
    default_scalar!(bool);
    let angle_boxed: Box<dyn ValueTypeProcessor<FloatAngle>> = Box::new(FloatAngleProcessor);
    map.insert(
        TypeId::of::<FloatAngle>(),
        ErasedEntry {
            processor: Box::new(angle_boxed),
        },
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_scalars_are_registered_before_any_manager_exists() {
        assert!(is_registered::<u32>());
        assert!(is_registered::<f32>());
        assert!(is_registered::<FloatAngle>());
    }

    #[test]
    fn float_angle_interpolates_along_the_shortest_arc() {
        use std::f32::consts::PI;
        let from = FloatAngle::from_radians(PI - 0.1);
        let to = FloatAngle::from_radians(-PI + 0.1);
        let mid = FloatAngle::lerp(from, to, 0.5);
        // Going the short way (through PI) rather than the long way (through 0).
        assert!(mid.radians().abs() > PI / 2.0);
    }

    #[test]
    fn custom_type_can_be_registered_by_the_host() {
        #[derive(Clone, PartialEq, Debug)]
        struct CustomStat(i32);
        register_field_type::<CustomStat>();
        assert!(is_registered::<CustomStat>());
        let equal = with_processor::<CustomStat, _>(|p| p.compare(&CustomStat(1), &CustomStat(1)));
        assert_eq!(equal, Some(true));
    }
}
