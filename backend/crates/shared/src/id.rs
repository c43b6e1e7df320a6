//! Common ID Types
//!
//! Type-safe wrappers around storage-assigned integer keys.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Typed integer ID
///
/// The storage layer assigns keys; they are always strictly positive.
///
/// ```
/// use kernel::id::Id;
///
/// struct Order;
/// type OrderId = Id<Order>;
///
/// assert!(OrderId::new(0).is_none());
/// assert_eq!(OrderId::new(7).map(|id| id.get()), Some(7));
/// ```
pub struct Id<T> {
    value: i64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Wrap a storage key; zero and negative values are not valid ids
    pub fn new(value: i64) -> Option<Self> {
        (value > 0).then_some(Self {
            value,
            _marker: PhantomData,
        })
    }

    /// Get the raw key
    pub fn get(&self) -> i64 {
        self.value
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.value)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Id::new(value).ok_or_else(|| serde::de::Error::custom("id must be positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing;
    type ThingId = Id<Thing>;

    #[test]
    fn test_rejects_non_positive() {
        assert!(ThingId::new(0).is_none());
        assert!(ThingId::new(-3).is_none());
        assert_eq!(ThingId::new(42).unwrap().get(), 42);
    }

    #[test]
    fn test_serde_as_plain_integer() {
        let id = ThingId::new(9).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "9");

        let back: ThingId = serde_json::from_str("9").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ThingId>("0").is_err());
    }
}
