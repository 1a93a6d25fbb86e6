use serde::{Serialize, Serializer};

use crate::{errors::Error, Result};

/// Explicit-absence container returned by lookups that may find nothing.
///
/// Serialization and equality only look at the wrapped value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptionValue<T> {
    Present(T),
    Absent,
}

pub use OptionValue::{Absent, Present};

impl<T> OptionValue<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Absent)
    }

    /// Take the value out. Only for call sites where absence is a bug.
    pub fn unwrap(self) -> Result<T> {
        match self {
            Present(v) => Ok(v),
            Absent => Err(Error::EmptyUnwrap),
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Present(v) => v,
            Absent => default,
        }
    }

    /// `f` is never called on `Absent`.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OptionValue<U> {
        match self {
            Present(v) => Present(f(v)),
            Absent => Absent,
        }
    }

    pub fn as_ref(&self) -> OptionValue<&T> {
        match self {
            Present(v) => Present(v),
            Absent => Absent,
        }
    }

    pub fn into_option(self) -> Option<T> {
        self.into()
    }
}

impl<T> OptionValue<OptionValue<T>> {
    /// Collapse nesting so a `Present` never wraps an `Absent`.
    pub fn flatten(self) -> OptionValue<T> {
        match self {
            Present(inner) => inner,
            Absent => Absent,
        }
    }
}

impl<T> Default for OptionValue<T> {
    fn default() -> Self {
        Absent
    }
}

impl<T> From<Option<T>> for OptionValue<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Present(v),
            None => Absent,
        }
    }
}

impl<T> From<OptionValue<T>> for Option<T> {
    fn from(v: OptionValue<T>) -> Self {
        match v {
            Present(v) => Some(v),
            Absent => None,
        }
    }
}

impl<T: Serialize> Serialize for OptionValue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Present(v) => v.serialize(serializer),
            Absent => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_and_absent_are_distinguishable() {
        let p = Present(3);
        let a: OptionValue<i32> = Absent;
        assert!(p.is_present() && !p.is_absent());
        assert!(a.is_absent() && !a.is_present());
    }

    #[test]
    fn unwrap_absent_is_an_error() {
        assert_eq!(Present("x").unwrap().unwrap(), "x");
        assert!(matches!(
            OptionValue::<u8>::Absent.unwrap(),
            Err(Error::EmptyUnwrap)
        ));
    }

    #[test]
    fn unwrap_or_never_fails() {
        assert_eq!(Present(1).unwrap_or(9), 1);
        assert_eq!(Absent.unwrap_or(9), 9);
    }

    #[test]
    fn map_short_circuits_on_absent() {
        let mut calls = 0;
        let out = OptionValue::<i32>::Absent.map(|v| {
            calls += 1;
            v + 1
        });
        assert_eq!(out, Absent);
        assert_eq!(calls, 0);

        assert_eq!(Present(1).map(|v| v + 1), Present(2));
    }

    #[test]
    fn flatten_removes_nested_absence() {
        let nested: OptionValue<OptionValue<i32>> = Present(Absent);
        assert_eq!(nested.flatten(), Absent);
        assert_eq!(Present(Present(5)).flatten(), Present(5));
    }

    #[test]
    fn serializes_only_the_wrapped_value() {
        assert_eq!(serde_json::to_string(&Present(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&OptionValue::<i32>::Absent).unwrap(),
            "null"
        );
    }
}
