//! An insertion-ordered multimap from backbone positions to attachments.
//! The maps involved are tiny (a handful of entries), so it's backed by a
//! plain vector

use crate::Position;

#[derive(Clone, Debug)]
pub struct PositionMap<V> {
    entries: Vec<(Position, V)>,
}

impl<V> PositionMap<V> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, position: Position, value: V) {
        self.entries.push((position, value));
    }

    #[must_use]
    pub fn count_at(&self, position: Position) -> usize {
        self.entries.iter().filter(|(p, _)| *p == position).count()
    }

    pub fn get(&self, position: Position) -> impl Iterator<Item = &V> {
        self.entries
            .iter()
            .filter(move |(p, _)| *p == position)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &V)> {
        self.entries.iter().map(|(p, v)| (*p, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(Position, &V) -> bool) {
        self.entries.retain(|(p, v)| keep(*p, v));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V: PartialEq> PositionMap<V> {
    /// Removes the first entry matching both `position` and `value`
    pub fn remove(&mut self, position: Position, value: &V) -> Option<V> {
        let at = self
            .entries
            .iter()
            .position(|(p, v)| *p == position && v == value)?;
        Some(self.entries.remove(at).1)
    }

    /// Removes the first entry holding `value`, at any position
    pub fn remove_value(&mut self, value: &V) -> Option<(Position, V)> {
        let at = self.entries.iter().position(|(_, v)| v == value)?;
        Some(self.entries.remove(at))
    }

    pub fn contains(&self, value: &V) -> bool {
        self.entries.iter().any(|(_, v)| v == value)
    }
}

impl<V> Default for PositionMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

// Multiset equality: the same (position, value) entries with the same
// multiplicities, in any order
impl<V: PartialEq> PartialEq for PositionMap<V> {
    fn eq(&self, other: &Self) -> bool {
        let count = |map: &Self, entry: &(Position, V)| {
            map.entries
                .iter()
                .filter(|(p, v)| *p == entry.0 && *v == entry.1)
                .count()
        };
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|entry| count(self, entry) == count(other, entry))
    }
}

impl<V: Eq> Eq for PositionMap<V> {}

impl<V> FromIterator<(Position, V)> for PositionMap<V> {
    fn from_iter<I: IntoIterator<Item = (Position, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: Position = Position::Known(1);
    const P2: Position = Position::Known(2);

    #[test]
    fn ordered_multi_insertion() {
        let mut map = PositionMap::new();
        map.push(P2, "sulfate");
        map.push(P1, "n_acetyl");
        map.push(P2, "methyl");

        assert_eq!(map.len(), 3);
        assert_eq!(map.count_at(P2), 2);
        assert_eq!(map.get(P2).copied().collect::<Vec<_>>(), ["sulfate", "methyl"]);
        // Insertion order is preserved across positions
        assert_eq!(
            map.values().copied().collect::<Vec<_>>(),
            ["sulfate", "n_acetyl", "methyl"]
        );
    }

    #[test]
    fn removal() {
        let mut map: PositionMap<&str> = [(P1, "a"), (P2, "b"), (P1, "a")].into_iter().collect();
        assert_eq!(map.remove(P1, &"a"), Some("a"));
        assert_eq!(map.count_at(P1), 1);
        assert_eq!(map.remove(P1, &"missing"), None);
        assert_eq!(map.remove_value(&"b"), Some((P2, "b")));
    }

    #[test]
    fn multiset_equality() {
        let a: PositionMap<&str> = [(P1, "x"), (P2, "y")].into_iter().collect();
        let b: PositionMap<&str> = [(P2, "y"), (P1, "x")].into_iter().collect();
        let c: PositionMap<&str> = [(P1, "x"), (P1, "x")].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn unknown_positions() {
        let map: PositionMap<&str> = [(Position::Unknown, "x")].into_iter().collect();
        assert_eq!(map.count_at(Position::Unknown), 1);
        assert_eq!(map.count_at(P1), 0);
    }
}
