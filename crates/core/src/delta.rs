//! Polarity-tagged deltas.
//!
//! A `Delta` is the universal unit of flow: a value plus a polarity saying
//! whether the value is being asserted (addition) or withdrawn (retraction).
//! Equal values may flow many times, so consumers count, they do not flag.

use crate::error::Error;

/// Whether a delta asserts or withdraws its value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// The value is asserted. Absent polarity means addition.
    #[default]
    Addition,
    /// The value is withdrawn.
    Retraction,
}

impl Polarity {
    /// Returns the opposite polarity.
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Polarity::Addition => Polarity::Retraction,
            Polarity::Retraction => Polarity::Addition,
        }
    }

    #[inline]
    pub fn is_addition(self) -> bool {
        self == Polarity::Addition
    }

    /// +1 for additions, -1 for retractions.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Polarity::Addition => 1,
            Polarity::Retraction => -1,
        }
    }
}

/// A change to a data item.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Delta<T> {
    /// The data being changed
    pub data: T,
    /// Addition or retraction
    pub polarity: Polarity,
}

impl<T> Delta<T> {
    /// Creates a new delta with the given data and polarity.
    #[inline]
    pub fn new(data: T, polarity: Polarity) -> Self {
        Self { data, polarity }
    }

    /// Creates an addition.
    #[inline]
    pub fn addition(data: T) -> Self {
        Self::new(data, Polarity::Addition)
    }

    /// Creates a retraction.
    #[inline]
    pub fn retraction(data: T) -> Self {
        Self::new(data, Polarity::Retraction)
    }

    #[inline]
    pub fn is_addition(&self) -> bool {
        self.polarity.is_addition()
    }

    #[inline]
    pub fn is_retraction(&self) -> bool {
        !self.polarity.is_addition()
    }

    /// Maps the data to a new type, keeping the polarity.
    #[inline]
    pub fn map<U, F>(self, f: F) -> Delta<U>
    where
        F: FnOnce(T) -> U,
    {
        Delta {
            data: f(self.data),
            polarity: self.polarity,
        }
    }

    /// Turns an addition into a retraction and vice versa.
    #[inline]
    pub fn negate(self) -> Self {
        Self {
            data: self.data,
            polarity: self.polarity.flip(),
        }
    }
}

impl<T: Clone> Delta<T> {
    /// Creates a negated copy of this delta.
    #[inline]
    pub fn negated(&self) -> Self {
        Self {
            data: self.data.clone(),
            polarity: self.polarity.flip(),
        }
    }
}

impl<T> From<T> for Delta<T> {
    fn from(data: T) -> Self {
        Delta::addition(data)
    }
}

/// A message on a delta channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Message<T> {
    /// A polarity-tagged item.
    Item(Delta<T>),
    /// The producer finished; nothing follows.
    End,
    /// The producer failed; nothing follows.
    Error(Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_addition() {
        let d = Delta::addition(42);
        assert!(d.is_addition());
        assert!(!d.is_retraction());
        assert_eq!(d.polarity.sign(), 1);
        assert_eq!(d.data, 42);
    }

    #[test]
    fn test_default_polarity_is_addition() {
        assert_eq!(Polarity::default(), Polarity::Addition);
        let d: Delta<i32> = 5.into();
        assert!(d.is_addition());
    }

    #[test]
    fn test_delta_negate() {
        let neg = Delta::addition(42).negate();
        assert!(neg.is_retraction());
        assert_eq!(neg.data, 42);
        assert!(neg.negated().is_addition());
    }

    #[test]
    fn test_delta_map() {
        let mapped = Delta::retraction(42).map(|x| x * 2);
        assert_eq!(mapped.data, 84);
        assert!(mapped.is_retraction());
    }
}
