use std::fmt;
use std::ops::Add;

/// Test functions can return this so that `?` works on parse results.
#[cfg(test)]
pub(crate) type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A non-negative distance that may be infinite (unreachable).
///
/// Addition saturates at infinity, so `infinity() + x == infinity()` and distances
/// never wrap around.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NaturalOrInfinite(u64);

impl NaturalOrInfinite {
    pub const fn infinity() -> Self {
        Self(u64::MAX)
    }

    pub const fn is_infinite(self) -> bool {
        self.0 == u64::MAX
    }

    pub const fn is_finite(self) -> bool {
        !self.is_infinite()
    }

    /// The finite value of this distance.
    ///
    /// # Panics
    /// If the distance is infinite.
    pub fn finite_value(self) -> u64 {
        assert!(self.is_finite(), "expected a finite distance");
        self.0
    }

    /// `Some(value)` for finite distances.
    pub fn finite(self) -> Option<u64> {
        self.is_finite().then_some(self.0)
    }
}

impl From<u64> for NaturalOrInfinite {
    fn from(value: u64) -> Self {
        debug_assert!(value != u64::MAX, "u64::MAX is reserved for infinity");
        Self(value)
    }
}

impl Add for NaturalOrInfinite {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        if self.is_infinite() || rhs.is_infinite() {
            Self::infinity()
        } else {
            // a finite sum that would overflow is treated as unreachable
            Self(self.0.checked_add(rhs.0).unwrap_or(u64::MAX))
        }
    }
}

impl Add<u64> for NaturalOrInfinite {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        self + Self::from(rhs)
    }
}

impl fmt::Debug for NaturalOrInfinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "∞")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for NaturalOrInfinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// All non-empty subsets of `{0, .., n-1}` as bitmasks, ordered by size and then by
/// bitmask value. Every subset comes after all of its proper subsets.
pub fn subsets_by_size(n: usize) -> Vec<usize> {
    assert!(n < usize::BITS as usize, "too many elements for a bitmask");
    let mut subsets = (1..1usize << n).collect::<Vec<_>>();
    subsets.sort_by_key(|&mask| (mask.count_ones(), mask));
    subsets
}

/// Iterator over the non-empty proper subsets of `set` (as bitmasks), largest first.
pub fn proper_subsets(set: usize) -> impl Iterator<Item = usize> {
    let mut current = set;
    std::iter::from_fn(move || {
        current = current.wrapping_sub(1) & set;
        (current != 0).then_some(current)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_or_infinite_add() {
        let inf = NaturalOrInfinite::infinity();
        assert_eq!(NaturalOrInfinite::from(2) + NaturalOrInfinite::from(3), 5.into());
        assert_eq!(inf + NaturalOrInfinite::from(3), inf);
        assert_eq!(NaturalOrInfinite::from(3) + inf, inf);
        assert!(NaturalOrInfinite::from(u64::MAX - 1) + 7 == inf);
        assert!(NaturalOrInfinite::from(1_000) < inf);
        assert_eq!(format!("{:?}", inf), "∞");
    }

    #[test]
    #[should_panic]
    fn test_finite_value_of_infinity() {
        NaturalOrInfinite::infinity().finite_value();
    }

    #[test]
    fn test_subsets_by_size() {
        assert_eq!(
            subsets_by_size(3),
            vec![0b001, 0b010, 0b100, 0b011, 0b101, 0b110, 0b111]
        );
        assert!(subsets_by_size(0).is_empty());
    }

    #[test]
    fn test_proper_subsets() {
        let mut subs = proper_subsets(0b1011).collect::<Vec<_>>();
        subs.sort_unstable();
        assert_eq!(subs, vec![0b0001, 0b0010, 0b0011, 0b1000, 0b1001, 0b1010]);
        assert_eq!(proper_subsets(0b100).count(), 0);
    }
}
