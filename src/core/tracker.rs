use crate::core::geometry::iou;
use crate::domain::model::{BoundingBox, Detection, TrackedDetection};
use crate::utils::error::{AnalysisError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};

/// Tuning knobs for [`ByteTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub track_activation_threshold: f64,
    pub low_confidence_threshold: f64,
    pub new_track_threshold: f64,
    pub match_iou_threshold: f64,
    pub low_match_iou_threshold: f64,
    pub lost_track_buffer: u32,
    pub frame_rate: u32,
    pub minimum_consecutive_frames: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_activation_threshold: 0.25,
            low_confidence_threshold: 0.1,
            new_track_threshold: 0.35,
            match_iou_threshold: 0.2,
            low_match_iou_threshold: 0.5,
            lost_track_buffer: 30,
            frame_rate: 30,
            minimum_consecutive_frames: 1,
        }
    }
}

impl TrackerConfig {
    /// Frames a track may stay unmatched before it is dropped.
    pub fn max_frames_lost(&self) -> u64 {
        (self.frame_rate as f64 / 30.0 * self.lost_track_buffer as f64) as u64
    }
}

impl Validate for TrackerConfig {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("tracking.track_activation_threshold", self.track_activation_threshold),
            ("tracking.low_confidence_threshold", self.low_confidence_threshold),
            ("tracking.new_track_threshold", self.new_track_threshold),
            ("tracking.match_iou_threshold", self.match_iou_threshold),
            ("tracking.low_match_iou_threshold", self.low_match_iou_threshold),
        ] {
            validation::validate_range(field, value, 0.0, 1.0)?;
        }

        // low <= activation <= new, otherwise one of the two passes never runs
        if self.low_confidence_threshold > self.track_activation_threshold {
            return Err(AnalysisError::InvalidConfigValueError {
                field: "tracking.low_confidence_threshold".to_string(),
                value: self.low_confidence_threshold.to_string(),
                reason: format!(
                    "Must not exceed track_activation_threshold ({})",
                    self.track_activation_threshold
                ),
            });
        }
        if self.new_track_threshold < self.track_activation_threshold {
            return Err(AnalysisError::InvalidConfigValueError {
                field: "tracking.new_track_threshold".to_string(),
                value: self.new_track_threshold.to_string(),
                reason: format!(
                    "Must be at least track_activation_threshold ({})",
                    self.track_activation_threshold
                ),
            });
        }

        validation::validate_positive_number("tracking.frame_rate", self.frame_rate as usize, 1)?;
        validation::validate_positive_number(
            "tracking.minimum_consecutive_frames",
            self.minimum_consecutive_frames as usize,
            1,
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackState {
    Tracked,
    Lost,
}

#[derive(Debug, Clone)]
struct Track {
    public_id: Option<u64>,
    bbox: BoundingBox,
    velocity: (f64, f64),
    last_seen_frame: u64,
    hit_streak: u32,
    state: TrackState,
}

impl Track {
    fn predict(&self, frame: u64) -> BoundingBox {
        let gap = frame.saturating_sub(self.last_seen_frame) as f64;
        self.bbox
            .translate(self.velocity.0 * gap, self.velocity.1 * gap)
    }

    fn observe(&mut self, bbox: BoundingBox, frame: u64) {
        let gap = frame.saturating_sub(self.last_seen_frame).max(1);
        let (old_x, old_y) = self.bbox.center();
        let (new_x, new_y) = bbox.center();
        self.velocity = (
            (new_x - old_x) / gap as f64,
            (new_y - old_y) / gap as f64,
        );

        if self.state == TrackState::Tracked && gap == 1 {
            self.hit_streak += 1;
        } else {
            self.hit_streak = 1;
        }
        self.bbox = bbox;
        self.last_seen_frame = frame;
        self.state = TrackState::Tracked;
    }
}

/// ByteTrack-style tracker: high-confidence detections are associated first,
/// low-confidence ones then recover tracks that are still being followed.
///
/// Association is greedy on descending IoU against each track's
/// constant-velocity prediction. Public IDs start at 1 and are never reused.
#[derive(Debug, Clone)]
pub struct ByteTracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    last_frame: Option<u64>,
    next_id: u64,
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            last_frame: None,
            next_id: 1,
        }
    }

    /// Confirmed tracks matched in the latest frame.
    pub fn active_tracks(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.state == TrackState::Tracked && t.public_id.is_some())
            .count()
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.last_frame = None;
        self.next_id = 1;
    }

    /// Feeds the frame right after the previous one.
    pub fn update(&mut self, detections: &[Detection]) -> Vec<TrackedDetection> {
        let next = self.last_frame.map_or(0, |f| f + 1);
        self.update_at(next, detections)
    }

    /// Feeds the detections of `frame_index` and returns those that belong to
    /// a confirmed track, in input order.
    ///
    /// Prediction and the lost-track buffer are measured in frame indices, so
    /// frames missing from the input still count as elapsed time. An index not
    /// after the previous one is treated as the next frame.
    pub fn update_at(&mut self, frame_index: u64, detections: &[Detection]) -> Vec<TrackedDetection> {
        let frame = match self.last_frame {
            Some(prev) if frame_index <= prev => prev + 1,
            _ => frame_index,
        };
        self.last_frame = Some(frame);

        // frames skipped since the last update count as misses
        self.prune(frame.saturating_sub(1));
        for track in &mut self.tracks {
            if track.last_seen_frame + 1 < frame {
                track.state = TrackState::Lost;
                track.hit_streak = 0;
            }
        }

        let predicted: Vec<BoundingBox> = self.tracks.iter().map(|t| t.predict(frame)).collect();

        let mut high = Vec::new();
        let mut low = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            if det.confidence >= self.config.track_activation_threshold {
                high.push(idx);
            } else if det.confidence >= self.config.low_confidence_threshold {
                low.push(idx);
            }
        }

        let mut track_matched = vec![false; self.tracks.len()];
        let mut assignment: Vec<Option<usize>> = vec![None; detections.len()];

        // First pass: confident detections against every live track.
        let all_tracks: Vec<usize> = (0..self.tracks.len()).collect();
        for (t, d) in greedy_match(
            &all_tracks,
            &high,
            &predicted,
            detections,
            self.config.match_iou_threshold,
        ) {
            track_matched[t] = true;
            assignment[d] = Some(t);
        }

        // Second pass: weak detections only keep currently followed tracks alive.
        let followed: Vec<usize> = (0..self.tracks.len())
            .filter(|&t| !track_matched[t] && self.tracks[t].state == TrackState::Tracked)
            .collect();
        for (t, d) in greedy_match(
            &followed,
            &low,
            &predicted,
            detections,
            self.config.low_match_iou_threshold,
        ) {
            track_matched[t] = true;
            assignment[d] = Some(t);
        }

        for (d, slot) in assignment.iter().enumerate() {
            if let Some(t) = *slot {
                self.tracks[t].observe(detections[d].bbox, frame);
            }
        }

        for (t, matched) in track_matched.iter().enumerate() {
            if !matched {
                let track = &mut self.tracks[t];
                track.state = TrackState::Lost;
                track.hit_streak = 0;
            }
        }

        for &d in &high {
            if assignment[d].is_none()
                && detections[d].confidence >= self.config.new_track_threshold
            {
                self.tracks.push(Track {
                    public_id: None,
                    bbox: detections[d].bbox,
                    velocity: (0.0, 0.0),
                    last_seen_frame: frame,
                    hit_streak: 1,
                    state: TrackState::Tracked,
                });
                assignment[d] = Some(self.tracks.len() - 1);
            }
        }

        let min_frames = self.config.minimum_consecutive_frames.max(1);
        for track in &mut self.tracks {
            if track.public_id.is_none()
                && track.state == TrackState::Tracked
                && track.hit_streak >= min_frames
            {
                track.public_id = Some(self.next_id);
                self.next_id += 1;
            }
        }

        let output: Vec<TrackedDetection> = assignment
            .iter()
            .enumerate()
            .filter_map(|(d, slot)| {
                let tracker_id = self.tracks[(*slot)?].public_id?;
                Some(TrackedDetection {
                    tracker_id,
                    detection: detections[d].clone(),
                })
            })
            .collect();

        self.prune(frame);
        output
    }

    /// Drops tracks unmatched for longer than the buffer as of `frame`.
    fn prune(&mut self, frame: u64) {
        let max_lost = self.config.max_frames_lost();
        let before = self.tracks.len();
        self.tracks.retain(|t| {
            let missed = frame.saturating_sub(t.last_seen_frame);
            // unconfirmed tracks are dropped on their first miss
            missed == 0 || (t.public_id.is_some() && missed <= max_lost)
        });
        if self.tracks.len() != before {
            tracing::trace!(
                "frame {}: dropped {} expired tracks",
                frame,
                before - self.tracks.len()
            );
        }
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

/// Greedy one-to-one assignment by descending IoU; ties resolve by track then
/// detection order.
fn greedy_match(
    tracks: &[usize],
    dets: &[usize],
    predicted: &[BoundingBox],
    detections: &[Detection],
    min_iou: f64,
) -> Vec<(usize, usize)> {
    let mut candidates = Vec::new();
    for &t in tracks {
        for &d in dets {
            let score = iou(&predicted[t], &detections[d].bbox);
            if score > 0.0 && score >= min_iou {
                candidates.push((score, t, d));
            }
        }
    }
    candidates.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut used_tracks = std::collections::HashSet::new();
    let mut used_dets = std::collections::HashSet::new();
    let mut matches = Vec::new();
    for (_, t, d) in candidates {
        if used_tracks.contains(&t) || used_dets.contains(&d) {
            continue;
        }
        used_tracks.insert(t);
        used_dets.insert(d);
        matches.push((t, d));
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> Detection {
        Detection::new(BoundingBox::new(x1, y1, x2, y2).unwrap(), confidence)
    }

    fn ids(tracked: &[TrackedDetection]) -> Vec<u64> {
        tracked.iter().map(|t| t.tracker_id).collect()
    }

    #[test]
    fn test_ids_persist_across_frames() {
        let mut tracker = ByteTracker::default();

        let first = tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9), det(50.0, 50.0, 60.0, 60.0, 0.9)]);
        assert_eq!(ids(&first), vec![1, 2]);

        // both boxes drift slightly; order of input swapped
        let second = tracker.update(&[det(51.0, 50.0, 61.0, 60.0, 0.9), det(1.0, 0.0, 11.0, 10.0, 0.9)]);
        assert_eq!(ids(&second), vec![2, 1]);
        assert_eq!(tracker.active_tracks(), 2);
    }

    #[test]
    fn test_velocity_prediction_follows_motion() {
        let mut tracker = ByteTracker::default();
        // after the first step the box moves 9px per frame, which only
        // overlaps its last position at IoU ~0.05
        for (step, x) in [0.0, 6.0, 15.0, 24.0, 33.0].into_iter().enumerate() {
            let out = tracker.update(&[det(x, 0.0, x + 10.0, 10.0, 0.9)]);
            assert_eq!(ids(&out), vec![1], "step {}", step);
        }
    }

    #[test]
    fn test_lost_track_recovers_within_buffer() {
        let mut tracker = ByteTracker::new(TrackerConfig {
            lost_track_buffer: 3,
            ..TrackerConfig::default()
        });
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        tracker.update(&[]);
        tracker.update(&[]);
        let back = tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        assert_eq!(ids(&back), vec![1]);
    }

    #[test]
    fn test_lost_track_expires_after_buffer() {
        let mut tracker = ByteTracker::new(TrackerConfig {
            lost_track_buffer: 2,
            ..TrackerConfig::default()
        });
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        for _ in 0..3 {
            tracker.update(&[]);
        }
        let back = tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        assert_eq!(ids(&back), vec![2]);
    }

    #[test]
    fn test_sparse_frame_indices_expire_lost_tracks() {
        let mut tracker = ByteTracker::default();
        let house = det(0.0, 0.0, 10.0, 10.0, 0.9);

        assert_eq!(ids(&tracker.update_at(0, &[house.clone()])), vec![1]);
        assert_eq!(ids(&tracker.update_at(1, &[det(200.0, 0.0, 210.0, 10.0, 0.9)])), vec![2]);
        // 999 frames absent from the input are far past the 30-frame buffer
        assert_eq!(ids(&tracker.update_at(1000, &[house])), vec![3]);
    }

    #[test]
    fn test_sparse_frame_indices_within_buffer_keep_id() {
        let mut tracker = ByteTracker::default();
        let house = det(0.0, 0.0, 10.0, 10.0, 0.9);

        tracker.update_at(0, &[house.clone()]);
        assert_eq!(ids(&tracker.update_at(20, &[house.clone()])), vec![1]);
        assert_eq!(ids(&tracker.update_at(100, &[house])), vec![2]);
    }

    #[test]
    fn test_prediction_spans_skipped_frames() {
        let mut tracker = ByteTracker::default();
        tracker.update_at(0, &[det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        tracker.update_at(1, &[det(2.0, 0.0, 12.0, 10.0, 0.9)]);
        // 2px per frame over ten frames; a one-frame step would not overlap
        let out = tracker.update_at(11, &[det(22.0, 0.0, 32.0, 10.0, 0.9)]);
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn test_repeated_frame_index_advances_one_frame() {
        let mut tracker = ByteTracker::default();
        let house = det(0.0, 0.0, 10.0, 10.0, 0.9);
        tracker.update_at(5, &[house.clone()]);
        assert_eq!(ids(&tracker.update_at(5, &[house])), vec![1]);
    }

    #[test]
    fn test_low_confidence_detection_leaves_lost_track_lost() {
        let mut tracker = ByteTracker::default();
        let house = det(0.0, 0.0, 10.0, 10.0, 0.9);
        tracker.update(&[house.clone()]);
        tracker.update(&[]);

        // exact overlap, but weak detections only serve tracks still followed
        let weak = tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.15)]);
        assert!(weak.is_empty());
        assert_eq!(tracker.active_tracks(), 0);

        // the lost track was neither consumed nor replaced
        assert_eq!(ids(&tracker.update(&[house])), vec![1]);
    }

    #[test]
    fn test_low_confidence_match_needs_half_overlap() {
        let house = det(0.0, 0.0, 10.0, 10.0, 0.9);

        let mut below = ByteTracker::default();
        below.update(&[house.clone()]);
        // IoU 0.49
        assert!(below.update(&[det(0.0, 0.0, 10.0, 4.9, 0.15)]).is_empty());
        assert_eq!(below.active_tracks(), 0);

        let mut at = ByteTracker::default();
        at.update(&[house]);
        // IoU exactly 0.5
        assert_eq!(ids(&at.update(&[det(0.0, 0.0, 10.0, 5.0, 0.15)])), vec![1]);
        assert_eq!(at.active_tracks(), 1);
    }

    #[test]
    fn test_low_confidence_keeps_track_but_never_starts_one() {
        let mut tracker = ByteTracker::default();
        assert!(tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.2)]).is_empty());

        tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        let weak = tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.15)]);
        assert_eq!(ids(&weak), vec![1]);

        // below the low threshold the detection is ignored entirely
        let ignored = tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.05)]);
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_activation_band_below_new_track_threshold() {
        let mut tracker = ByteTracker::default();
        // high enough to match, too weak to start a track
        assert!(tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.3)]).is_empty());
        assert_eq!(tracker.active_tracks(), 0);
    }

    #[test]
    fn test_minimum_consecutive_frames_delays_id() {
        let mut tracker = ByteTracker::new(TrackerConfig {
            minimum_consecutive_frames: 3,
            ..TrackerConfig::default()
        });
        let b = det(0.0, 0.0, 10.0, 10.0, 0.9);
        assert!(tracker.update(&[b.clone()]).is_empty());
        assert!(tracker.update(&[b.clone()]).is_empty());
        assert_eq!(ids(&tracker.update(&[b.clone()])), vec![1]);

        // a one-frame flicker never receives an ID
        let flicker = det(100.0, 100.0, 110.0, 110.0, 0.9);
        tracker.update(&[b.clone(), flicker]);
        let out = tracker.update(&[b]);
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn test_one_detection_per_track() {
        let mut tracker = ByteTracker::default();
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        // two candidates overlap the single track; the closer one wins, the other starts a new track
        let out = tracker.update(&[det(2.0, 0.0, 12.0, 10.0, 0.9), det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        assert_eq!(ids(&out), vec![2, 1]);
    }

    #[test]
    fn test_reset_restarts_ids() {
        let mut tracker = ByteTracker::default();
        tracker.update(&[det(0.0, 0.0, 10.0, 10.0, 0.9)]);
        tracker.reset();
        let out = tracker.update(&[det(40.0, 40.0, 50.0, 50.0, 0.9)]);
        assert_eq!(ids(&out), vec![1]);
    }

    #[test]
    fn test_config_threshold_ordering() {
        assert!(TrackerConfig::default().validate().is_ok());

        let low_above_activation = TrackerConfig {
            low_confidence_threshold: 0.4,
            ..TrackerConfig::default()
        };
        match low_above_activation.validate() {
            Err(AnalysisError::InvalidConfigValueError { field, .. }) => {
                assert_eq!(field, "tracking.low_confidence_threshold")
            }
            other => panic!("expected ordering error, got {:?}", other),
        }

        let new_below_activation = TrackerConfig {
            new_track_threshold: 0.2,
            ..TrackerConfig::default()
        };
        match new_below_activation.validate() {
            Err(AnalysisError::InvalidConfigValueError { field, .. }) => {
                assert_eq!(field, "tracking.new_track_threshold")
            }
            other => panic!("expected ordering error, got {:?}", other),
        }

        // equal thresholds are allowed
        let flat = TrackerConfig {
            low_confidence_threshold: 0.3,
            track_activation_threshold: 0.3,
            new_track_threshold: 0.3,
            ..TrackerConfig::default()
        };
        assert!(flat.validate().is_ok());
    }

    #[test]
    fn test_max_frames_lost_scales_with_frame_rate() {
        let config = TrackerConfig {
            frame_rate: 60,
            lost_track_buffer: 30,
            ..TrackerConfig::default()
        };
        assert_eq!(config.max_frames_lost(), 60);
    }
}
