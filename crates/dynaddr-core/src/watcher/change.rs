//! Snapshot comparison
//!
//! Sets, not lists: resolver order and duplicate answers never count as a
//! change.

use std::collections::BTreeSet;
use std::net::IpAddr;

/// Ordered set of resolved addresses
///
/// Iteration order is IPv4 before IPv6, then numeric. Publication uses this
/// order, so the first element (the primary address during reconciliation)
/// does not depend on how the resolver happened to sort its answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet(BTreeSet<IpAddr>);

impl AddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct addresses
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `addr` is in the set
    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.0.contains(addr)
    }

    /// Iterate in publication order
    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.0.iter()
    }

    /// Render as address strings in publication order
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(IpAddr::to_string).collect()
    }
}

impl FromIterator<IpAddr> for AddressSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Compare a fresh resolution against the retained snapshot
///
/// Returns whether the address set differs from `snapshot`, together with
/// the set that should become the new snapshot.
pub fn check(
    snapshot: &AddressSet,
    resolved: impl IntoIterator<Item = IpAddr>,
) -> (bool, AddressSet) {
    let current: AddressSet = resolved.into_iter().collect();
    (current != *snapshot, current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn set(addrs: &[&str]) -> AddressSet {
        addrs.iter().map(|a| ip(a)).collect()
    }

    #[test]
    fn identical_sets_are_unchanged() {
        for addrs in [&[][..], &["1.2.3.4"][..], &["1.2.3.4", "5.6.7.8", "2001:db8::1"][..]] {
            let snapshot = set(addrs);
            let (changed, next) = check(&snapshot, snapshot.iter().copied());
            assert!(!changed);
            assert_eq!(next, snapshot);
        }
    }

    #[test]
    fn order_and_duplicates_are_ignored() {
        let snapshot = set(&["1.2.3.4", "5.6.7.8"]);
        let (changed, _) = check(
            &snapshot,
            [ip("5.6.7.8"), ip("1.2.3.4"), ip("5.6.7.8")],
        );
        assert!(!changed);
    }

    #[test]
    fn differing_sets_change_and_become_the_snapshot() {
        let cases = [
            (set(&[]), vec![ip("1.2.3.4")]),
            (set(&["1.2.3.4"]), vec![ip("1.2.3.4"), ip("5.6.7.8")]),
            (set(&["1.2.3.4", "5.6.7.8"]), vec![ip("5.6.7.8")]),
            (set(&["1.2.3.4"]), vec![ip("4.3.2.1")]),
        ];

        for (snapshot, resolved) in cases {
            let expected: AddressSet = resolved.iter().copied().collect();
            let (changed, next) = check(&snapshot, resolved);
            assert!(changed);
            assert_eq!(next, expected);
        }
    }

    #[test]
    fn publication_order_puts_ipv4_first() {
        let snapshot = set(&["2001:db8::1", "10.0.0.2", "9.9.9.9"]);
        assert_eq!(
            snapshot.to_strings(),
            vec!["9.9.9.9", "10.0.0.2", "2001:db8::1"]
        );
    }
}
