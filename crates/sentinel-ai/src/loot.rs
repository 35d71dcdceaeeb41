//! Loot tables rolled once on death.

use sentinel_common::ItemTypeId;
use serde::{Deserialize, Serialize};

/// One droppable item and its independent drop chance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    /// Item to spawn.
    pub item: ItemTypeId,
    /// Probability in `[0, 1]`.
    pub chance: f32,
}

impl LootEntry {
    /// Creates an entry.
    #[must_use]
    pub const fn new(item: ItemTypeId, chance: f32) -> Self {
        Self { item, chance }
    }
}

/// Set of independently rolled drops.
///
/// Chances are not normalized and not mutually exclusive: every entry gets
/// its own trial, so anything from zero to all items can drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LootTable {
    entries: Vec<LootEntry>,
}

impl LootTable {
    /// Creates a table from entries.
    #[must_use]
    pub fn new(entries: Vec<LootEntry>) -> Self {
        Self { entries }
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, item: ItemTypeId, chance: f32) -> Self {
        self.entries.push(LootEntry::new(item, chance));
        self
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[LootEntry] {
        &self.entries
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs one Bernoulli trial per entry.
    pub fn roll(&self, rng: &mut fastrand::Rng) -> Vec<ItemTypeId> {
        self.entries
            .iter()
            .filter(|entry| rng.f32() < entry.chance)
            .map(|entry| entry.item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM_A: ItemTypeId = ItemTypeId::new(1);
    const ITEM_B: ItemTypeId = ItemTypeId::new(2);

    #[test]
    fn test_certain_and_impossible_drops() {
        let table = LootTable::default().with(ITEM_A, 1.0).with(ITEM_B, 0.0);
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..100 {
            assert_eq!(table.roll(&mut rng), vec![ITEM_A]);
        }
    }

    #[test]
    fn test_entries_roll_independently() {
        let table = LootTable::default().with(ITEM_A, 0.5).with(ITEM_B, 0.5);
        let mut rng = fastrand::Rng::with_seed(7);
        let mut both = 0;
        let mut none = 0;
        for _ in 0..1000 {
            match table.roll(&mut rng).len() {
                2 => both += 1,
                0 => none += 1,
                _ => {},
            }
        }
        assert!(both > 150, "both dropped only {both} times");
        assert!(none > 150, "nothing dropped only {none} times");
    }

    #[test]
    fn test_empty_table_drops_nothing() {
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(LootTable::default().roll(&mut rng).is_empty());
    }

    #[test]
    fn test_same_seed_same_drops() {
        let table = LootTable::default().with(ITEM_A, 0.3).with(ITEM_B, 0.6);
        let mut rng1 = fastrand::Rng::with_seed(99);
        let mut rng2 = fastrand::Rng::with_seed(99);
        for _ in 0..20 {
            assert_eq!(table.roll(&mut rng1), table.roll(&mut rng2));
        }
    }
}
