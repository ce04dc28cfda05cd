use rustc_hash::FxHashMap;

/// A snapshot of a scheduler's lifetime counters.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Counters {
    /// Successful inserts.
    pub inserts: u64,
    /// Entries removed by an explicit cancel or an eager bulk cancel. Evictions done by
    /// `insert` are not included here, see `insert_removals`.
    pub removals: u64,
    /// Stale entries evicted because their event was inserted again. These are explicit removals
    /// triggered by a reschedule, counted apart from `removals`.
    pub insert_removals: u64,
    /// Calls to `clear`.
    pub clears: u64,
    /// Events delivered by `pop_next`.
    pub pops: u64,
}

impl Counters {
    pub fn to_map(&self) -> FxHashMap<&'static str, u64> {
        [
            ("inserts", self.inserts),
            ("removals", self.removals),
            ("insert_removals", self.insert_removals),
            ("clears", self.clears),
            ("pops", self.pops),
        ]
        .into_iter()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_matches_serialized_form() -> anyhow::Result<()> {
        let counters = Counters {
            inserts: 5,
            removals: 1,
            insert_removals: 2,
            clears: 0,
            pops: 3,
        };
        let map = counters.to_map();
        assert_eq!(map.len(), 5);
        assert_eq!(map["insert_removals"], 2);

        let json = serde_json::to_value(counters)?;
        let obj = json.as_object().expect("flat object");
        assert_eq!(obj.len(), map.len());
        for (name, value) in map {
            assert_eq!(obj[name].as_u64(), Some(value));
        }
        Ok(())
    }
}
