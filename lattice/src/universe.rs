//! The ordered constraint universe and its subset encodings.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Display};
use std::hash::Hash;

use itertools::Itertools;

use crate::bits::{self, SubsetCode};
use crate::Error;

/// Trait requirements for a constraint identifier: cheap to clone, ordered,
/// printable. Implemented for any type with those bounds.
pub trait Constraint: Clone + Eq + Ord + Hash + Display + Debug {}
impl<T: Clone + Eq + Ord + Hash + Display + Debug> Constraint for T {}

/// The fixed, ordered sequence of constraints under diagnosis.
///
/// Position `i` maps to bit `n - 1 - i` of the subset code: the first
/// constraint owns the most significant used bit.
#[derive(Debug, Clone)]
pub struct Universe<C> {
    constraints: Vec<C>,
    index: HashMap<C, usize>,
}

impl<C: Constraint> Universe<C> {
    pub fn new(constraints: impl IntoIterator<Item = C>) -> Result<Self, Error> {
        let constraints = constraints.into_iter().collect_vec();
        let mut index = HashMap::with_capacity(constraints.len());
        for (i, c) in constraints.iter().enumerate() {
            if index.insert(c.clone(), i).is_some() {
                return Err(Error::DuplicateConstraint(c.to_string()));
            }
        }
        Ok(Universe { constraints, index })
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraints(&self) -> &[C] {
        &self.constraints
    }

    pub fn contains(&self, c: &C) -> bool {
        self.index.contains_key(c)
    }

    /// Position of `c` in the universe order.
    pub fn position(&self, c: &C) -> Result<usize, Error> {
        self.index
            .get(c)
            .copied()
            .ok_or_else(|| Error::UnknownConstraint(c.to_string()))
    }

    /// Bit of the subset code owned by `c`.
    pub fn bit(&self, c: &C) -> Result<usize, Error> {
        Ok(self.len() - self.position(c)? - 1)
    }

    /// Constraint owning the given bit.
    pub fn constraint_at_bit(&self, bit: usize) -> &C {
        &self.constraints[self.len() - bit - 1]
    }

    pub fn full_set(&self) -> BTreeSet<C> {
        self.constraints.iter().cloned().collect()
    }

    pub fn complement(&self, subset: &BTreeSet<C>) -> BTreeSet<C> {
        self.constraints
            .iter()
            .filter(|c| !subset.contains(c))
            .cloned()
            .collect()
    }

    /// Mask of the full universe. Only meaningful when the universe fits the
    /// code width.
    pub fn full_code(&self) -> SubsetCode {
        bits::full_code(self.len())
    }

    pub fn constraint_set_to_int(&self, subset: &BTreeSet<C>) -> Result<SubsetCode, Error> {
        if self.len() > bits::CODE_WIDTH {
            return Err(Error::UniverseTooWide {
                n: self.len(),
                max: bits::CODE_WIDTH,
            });
        }
        let mut code = 0;
        for c in subset {
            code |= 1 << self.bit(c)?;
        }
        Ok(code)
    }

    pub fn int_to_constraint_set(&self, code: SubsetCode) -> BTreeSet<C> {
        let n = self.len();
        (0..n)
            .filter(|&i| (code >> (n - 1 - i)) & 1 == 1)
            .map(|i| self.constraints[i].clone())
            .collect()
    }

    pub fn constraint_set_to_bitlist(&self, subset: &BTreeSet<C>) -> Result<Vec<bool>, Error> {
        Ok(bits::int_to_bitlist(
            self.constraint_set_to_int(subset)?,
            self.len(),
        ))
    }

    pub fn bitlist_to_constraint_set(&self, bitlist: &[bool]) -> BTreeSet<C> {
        self.int_to_constraint_set(bits::bitlist_to_int(bitlist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> Universe<&'static str> {
        Universe::new(["a", "b", "c", "d"]).unwrap()
    }

    #[test]
    fn code_round_trip() {
        let u = abcd();
        let set = BTreeSet::from(["a", "c"]);
        assert_eq!(u.constraint_set_to_int(&set).unwrap(), 10);
        assert_eq!(u.int_to_constraint_set(10), set);
    }

    #[test]
    fn first_constraint_owns_most_significant_bit() {
        let u = abcd();
        assert_eq!(u.bit(&"a").unwrap(), 3);
        assert_eq!(u.bit(&"d").unwrap(), 0);
        assert_eq!(*u.constraint_at_bit(3), "a");
        assert_eq!(*u.constraint_at_bit(0), "d");
    }

    #[test]
    fn bitlist_round_trip() {
        let u = abcd();
        let set = BTreeSet::from(["b", "d"]);
        let bitlist = u.constraint_set_to_bitlist(&set).unwrap();
        assert_eq!(bitlist, vec![false, true, false, true]);
        assert_eq!(u.bitlist_to_constraint_set(&bitlist), set);
    }

    #[test]
    fn duplicate_constraints_are_rejected() {
        assert!(matches!(
            Universe::new(["a", "b", "a"]),
            Err(Error::DuplicateConstraint(_))
        ));
    }

    #[test]
    fn unknown_constraint_is_rejected() {
        let u = abcd();
        let set = BTreeSet::from(["a", "z"]);
        assert!(matches!(
            u.constraint_set_to_int(&set),
            Err(Error::UnknownConstraint(_))
        ));
    }
}
