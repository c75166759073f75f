use std::collections::HashMap;

/// Historical occurrence count per menu item name.
///
/// Loaded from a JSON object such as `{"Spring Roll": 12, "Pho": 30}`.
/// Names are matched exactly; anything not in the table counts as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuItemFrequencyTable {
    counts: HashMap<String, u64>,
}

impl MenuItemFrequencyTable {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let counts: HashMap<String, u64> = serde_json::from_slice(bytes)?;
        Ok(Self { counts })
    }

    pub fn count(&self, menu_item: &str) -> u64 {
        self.counts.get(menu_item).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for MenuItemFrequencyTable {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// The `MenuItem_freq` feature for one record. Zero when the table is absent
/// or does not list the item.
pub fn frequency_feature(table: Option<&MenuItemFrequencyTable>, menu_item: &str) -> f32 {
    table.map_or(0, |t| t.count(menu_item)) as f32
}
