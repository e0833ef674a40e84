use crate::core::counter::AdoptionCounter;
use crate::core::matcher::{MatchConfig, PanelMatcher};
use crate::core::tracker::{ByteTracker, TrackerConfig};
use crate::domain::model::{
    AnalysisResult, BoundingBox, Detection, FrameDetections, FrameReport, RooftopObservation,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    pub rooftop_confidence: f64,
    pub panel_confidence: f64,
    pub tracker: TrackerConfig,
    pub matching: MatchConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rooftop_confidence: 0.86,
            panel_confidence: 0.25,
            tracker: TrackerConfig::default(),
            matching: MatchConfig::default(),
        }
    }
}

pub fn rooftop_label(tracker_id: u64, has_solar: bool) -> String {
    format!(
        "#{} Rooftop {}",
        tracker_id,
        if has_solar { "(Solar)" } else { "(No Solar)" }
    )
}

/// Runs detection filtering, tracking, matching and counting frame by frame.
pub struct FrameAnalyzer {
    config: AnalyzerConfig,
    rooftop_tracker: ByteTracker,
    panel_tracker: ByteTracker,
    matcher: PanelMatcher,
    counter: AdoptionCounter,
    reports: Vec<FrameReport>,
}

impl FrameAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            rooftop_tracker: ByteTracker::new(config.tracker),
            panel_tracker: ByteTracker::new(config.tracker),
            matcher: PanelMatcher::new(config.matching),
            counter: AdoptionCounter::new(),
            reports: Vec::new(),
            config,
        }
    }

    pub fn process(&mut self, frame: &FrameDetections) -> FrameReport {
        let rooftops = filter_confident(&frame.rooftops, self.config.rooftop_confidence);
        let panels = filter_confident(&frame.panels, self.config.panel_confidence);

        let tracked_rooftops = self.rooftop_tracker.update_at(frame.frame_index, &rooftops);
        let tracked_panels = self.panel_tracker.update_at(frame.frame_index, &panels);
        let panel_boxes: Vec<BoundingBox> = tracked_panels
            .iter()
            .map(|p| p.detection.bbox)
            .collect();

        let mut observations = Vec::with_capacity(tracked_rooftops.len());
        for rooftop in tracked_rooftops {
            let has_solar = self.matcher.has_solar(&rooftop.detection.bbox, &panel_boxes);
            self.counter
                .observe(frame.frame_index, rooftop.tracker_id, has_solar);

            observations.push(RooftopObservation {
                tracker_id: rooftop.tracker_id,
                bbox: rooftop.detection.bbox,
                confidence: rooftop.detection.confidence,
                has_solar,
                label: rooftop_label(rooftop.tracker_id, self.counter.status(rooftop.tracker_id)),
            });
        }

        let report = FrameReport {
            frame_index: frame.frame_index,
            rooftops: observations,
            panels_tracked: panel_boxes.len(),
            summary: self.counter.summary(),
        };
        tracing::debug!(
            "frame {}: {} rooftops ({} with solar), {} panels, {} unique so far",
            report.frame_index,
            report.rooftops.len(),
            report.solar_rooftops(),
            report.panels_tracked,
            report.summary.total_rooftops
        );

        self.reports.push(report.clone());
        report
    }

    pub fn finish(self) -> AnalysisResult {
        AnalysisResult {
            summary: self.counter.summary(),
            rooftops: self.counter.records(),
            frames: self.reports,
        }
    }
}

/// Zero-area boxes are skipped too: they never overlap anything, so the
/// tracker could not follow them from one frame to the next.
fn filter_confident(detections: &[Detection], min_confidence: f64) -> Vec<Detection> {
    detections
        .iter()
        .filter(|d| d.confidence >= min_confidence && d.bbox.area() > 0.0)
        .cloned()
        .collect()
}
