//! Per-point store of pixel arrays and statistics
//!
//! Records are keyed by item id and kept in the order items were first
//! seen. A statistic is computed at most once per item between resets.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use super::standard::{check_single_band, StdStat};
use super::value::StatValue;
use crate::errors::{DrillError, DrillResult};
use crate::extractor::ArrayInfo;

/// Everything stored for one item at one point
#[derive(Debug, Clone, Default)]
pub struct ItemStats {
    /// Arrays read, one per asset in asset order
    pub arrays: Vec<ArrayInfo>,
    /// Statistic name to value
    pub stats: BTreeMap<String, StatValue>,
    /// Reason the item could not be read, if any
    pub failure: Option<String>,
}

/// Statistics accumulator owned by a single survey point
#[derive(Debug, Clone, Default)]
pub struct PointStats {
    items: HashMap<String, ItemStats>,
    order: Vec<String>,
}

impl PointStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, item_id: &str) -> &mut ItemStats {
        if !self.items.contains_key(item_id) {
            self.order.push(item_id.to_string());
        }
        self.items.entry(item_id.to_string()).or_default()
    }

    /// Stores an array, replacing any earlier array for the same asset
    pub fn store_array(&mut self, item_id: &str, array: ArrayInfo) {
        let record = self.entry(item_id);
        match record.arrays.iter_mut().find(|a| a.asset_id == array.asset_id) {
            Some(existing) => *existing = array,
            None => record.arrays.push(array),
        }
    }

    /// Marks an item as unreadable at this point, dropping partial arrays
    pub fn record_failure(&mut self, item_id: &str, reason: &str) {
        let record = self.entry(item_id);
        record.arrays.clear();
        record.failure = Some(reason.to_string());
    }

    /// Reason the item failed, if it did
    pub fn failure(&self, item_id: &str) -> Option<&str> {
        self.items.get(item_id).and_then(|r| r.failure.as_deref())
    }

    /// Arrays stored for an item; `None` if the item was never read or
    /// failed to read
    pub fn arrays(&self, item_id: &str) -> Option<&[ArrayInfo]> {
        self.items
            .get(item_id)
            .filter(|r| r.failure.is_none())
            .map(|r| r.arrays.as_slice())
    }

    /// True if readable arrays are stored for the item
    pub fn has_arrays(&self, item_id: &str) -> bool {
        self.items
            .get(item_id)
            .map(|r| r.failure.is_none() && !r.arrays.is_empty())
            .unwrap_or(false)
    }

    /// Item ids in first-seen order
    pub fn item_ids(&self) -> &[String] {
        &self.order
    }

    /// Fails if any of `names` was already computed for the item
    pub fn ensure_uncomputed<'a, I>(&self, item_id: &str, names: I) -> DrillResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(record) = self.items.get(item_id) else {
            return Ok(());
        };
        for name in names {
            if record.stats.contains_key(name) {
                return Err(DrillError::StatAlreadyComputed {
                    item_id: item_id.to_string(),
                    stat_name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Computes standard statistics for one item
    ///
    /// # Arguments
    /// * `item_id` - Item whose stored arrays are used
    /// * `std_stats` - Statistics to compute
    ///
    /// # Returns
    /// `Ok(())` once every statistic is stored. Items with no arrays or a
    /// recorded failure are skipped. Multi-band arrays are rejected with
    /// `UnsupportedBandCount`; names already present give
    /// `StatAlreadyComputed`.
    pub fn calc_std_stats(&mut self, item_id: &str, std_stats: &[StdStat]) -> DrillResult<()> {
        if std_stats.is_empty() || !self.has_arrays(item_id) {
            return Ok(());
        }
        self.ensure_uncomputed(item_id, std_stats.iter().map(|s| s.name()))?;

        let record = self.entry(item_id);
        check_single_band(&record.arrays)?;
        for stat in std_stats {
            let value = stat.compute(&record.arrays);
            record.stats.insert(stat.name().to_string(), value);
        }
        debug!("Computed {} standard statistics for item '{}'", std_stats.len(), item_id);
        Ok(())
    }

    /// Stores a computed value under a new name
    pub fn insert_stat(&mut self, item_id: &str, name: &str, value: StatValue) -> DrillResult<()> {
        self.ensure_uncomputed(item_id, [name])?;
        self.entry(item_id).stats.insert(name.to_string(), value);
        Ok(())
    }

    /// Computed statistics, by item then by name
    ///
    /// # Arguments
    /// * `item_id` - Restrict to one item
    /// * `names` - Restrict to these statistic names
    ///
    /// Items without any matching statistic are left out.
    pub fn get_stats(
        &self,
        item_id: Option<&str>,
        names: Option<&[&str]>,
    ) -> BTreeMap<String, BTreeMap<String, StatValue>> {
        self.order
            .iter()
            .filter(|id| item_id.map_or(true, |wanted| wanted == id.as_str()))
            .filter_map(|id| {
                let record = self.items.get(id)?;
                let stats: BTreeMap<String, StatValue> = record
                    .stats
                    .iter()
                    .filter(|(name, _)| names.map_or(true, |n| n.contains(&name.as_str())))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                (!stats.is_empty()).then(|| (id.clone(), stats))
            })
            .collect()
    }

    /// One statistic for one item
    pub fn get_stat(&self, item_id: &str, name: &str) -> Option<&StatValue> {
        self.items.get(item_id)?.stats.get(name)
    }

    /// Clears all arrays, statistics and failures
    pub fn reset(&mut self) {
        self.items.clear();
        self.order.clear();
    }

    /// Clears the statistics of one item, keeping its arrays
    pub fn reset_item(&mut self, item_id: &str) {
        if let Some(record) = self.items.get_mut(item_id) {
            record.stats.clear();
        }
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::MaskedArray;
    use ndarray::{array, Array3};

    fn array_info(asset_id: &str, data: Array3<f64>) -> ArrayInfo {
        let (_, rows, cols) = data.dim();
        ArrayInfo {
            asset_id: asset_id.to_string(),
            data: MaskedArray::new(data),
            xoff: 0,
            yoff: 0,
            win_xsize: cols as u32,
            win_ysize: rows as u32,
            ulx: 0.0,
            uly: 0.0,
            lrx: 0.0,
            lry: 0.0,
            x_res: 1.0,
            y_res: 1.0,
        }
    }

    #[test]
    fn test_store_replaces_same_asset() {
        let mut stats = PointStats::new();
        stats.store_array("item", array_info("B02", array![[[1.0]]]));
        stats.store_array("item", array_info("B03", array![[[2.0]]]));
        stats.store_array("item", array_info("B02", array![[[5.0]]]));
        let arrays = stats.arrays("item").unwrap();
        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays[0].data.valid_values(0), vec![5.0]);
    }

    #[test]
    fn test_calc_twice_requires_reset() {
        let mut stats = PointStats::new();
        stats.store_array("item", array_info("b", array![[[1.0, 2.0], [3.0, 4.0]]]));
        stats.calc_std_stats("item", &[StdStat::Mean]).unwrap();
        let first = stats.get_stats(None, None);
        assert_eq!(first["item"]["mean"], StatValue::Floats(vec![2.5]));

        assert!(matches!(
            stats.calc_std_stats("item", &[StdStat::Mean]),
            Err(DrillError::StatAlreadyComputed { .. })
        ));

        stats.reset_item("item");
        stats.calc_std_stats("item", &[StdStat::Mean]).unwrap();
        assert_eq!(stats.get_stats(None, None), first);
    }

    #[test]
    fn test_failed_item_skipped() {
        let mut stats = PointStats::new();
        stats.store_array("item", array_info("b", array![[[1.0]]]));
        stats.record_failure("item", "timed out");
        assert_eq!(stats.failure("item"), Some("timed out"));
        assert!(stats.arrays("item").is_none());
        stats.calc_std_stats("item", &[StdStat::Mean]).unwrap();
        assert!(stats.get_stats(None, None).is_empty());
    }

    #[test]
    fn test_get_stats_filters() {
        let mut stats = PointStats::new();
        stats.store_array("a", array_info("b", array![[[1.0, 3.0]]]));
        stats.store_array("b", array_info("b", array![[[2.0]]]));
        stats.calc_std_stats("a", &[StdStat::Mean, StdStat::Max]).unwrap();
        stats.calc_std_stats("b", &[StdStat::Mean]).unwrap();

        assert_eq!(stats.get_stats(Some("a"), None)["a"].len(), 2);
        let maxes = stats.get_stats(None, Some(&["max"]));
        assert_eq!(maxes.keys().collect::<Vec<_>>(), vec!["a"]);
        assert!(stats.get_stats(Some("missing"), None).is_empty());
        assert_eq!(stats.get_stat("b", "mean"), Some(&StatValue::Floats(vec![2.0])));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut stats = PointStats::new();
        stats.store_array("a", array_info("b", array![[[1.0]]]));
        stats.insert_stat("a", "label", StatValue::Text("x".into())).unwrap();
        assert!(stats.insert_stat("a", "label", StatValue::Text("y".into())).is_err());
        stats.reset();
        assert!(stats.is_empty());
        assert!(stats.item_ids().is_empty());
    }
}
