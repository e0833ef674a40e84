use crate::domain::model::{AdoptionSummary, RooftopRecord};
use std::collections::{BTreeMap, BTreeSet};

/// Cumulative tally of unique rooftops, keyed by tracker ID.
///
/// A rooftop counts as having solar once it has been seen with a panel in any
/// frame; later frames without a panel do not take it back out. The per-frame
/// status used for labels, on the other hand, always reflects the latest frame.
#[derive(Debug, Default, Clone)]
pub struct AdoptionCounter {
    all_rooftops: BTreeSet<u64>,
    with_solar: BTreeSet<u64>,
    latest_status: BTreeMap<u64, bool>,
    records: BTreeMap<u64, RooftopRecord>,
}

impl AdoptionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, frame_index: u64, tracker_id: u64, has_solar: bool) {
        self.all_rooftops.insert(tracker_id);
        if has_solar {
            self.with_solar.insert(tracker_id);
        }
        self.latest_status.insert(tracker_id, has_solar);

        let record = self
            .records
            .entry(tracker_id)
            .or_insert_with(|| RooftopRecord {
                tracker_id,
                first_frame: frame_index,
                last_frame: frame_index,
                frames_observed: 0,
                solar_frames: 0,
                first_solar_frame: None,
                has_solar: false,
            });
        record.last_frame = record.last_frame.max(frame_index);
        record.frames_observed += 1;
        if has_solar {
            record.solar_frames += 1;
            record.first_solar_frame.get_or_insert(frame_index);
            record.has_solar = true;
        }
    }

    /// Status from the most recent frame the rooftop appeared in.
    pub fn status(&self, tracker_id: u64) -> bool {
        self.latest_status
            .get(&tracker_id)
            .copied()
            .unwrap_or(false)
    }

    pub fn summary(&self) -> AdoptionSummary {
        AdoptionSummary::new(self.all_rooftops.len(), self.with_solar.len())
    }

    pub fn records(&self) -> Vec<RooftopRecord> {
        self.records.values().cloned().collect()
    }
}
