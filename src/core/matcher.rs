use crate::core::geometry::{coverage, iou};
use crate::domain::model::BoundingBox;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Intersection over union of the rooftop and panel boxes.
    #[default]
    Iou,
    /// Share of the panel box that lies inside the rooftop box.
    Coverage,
}

impl MatchStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "iou" => Some(MatchStrategy::Iou),
            "coverage" => Some(MatchStrategy::Coverage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub strategy: MatchStrategy,
    pub threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::Iou,
            threshold: 0.05,
        }
    }
}

/// Decides which rooftops carry solar panels.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelMatcher {
    config: MatchConfig,
}

impl PanelMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, rooftop: &BoundingBox, panel: &BoundingBox) -> f64 {
        match self.config.strategy {
            MatchStrategy::Iou => iou(rooftop, panel),
            MatchStrategy::Coverage => coverage(panel, rooftop),
        }
    }

    /// A rooftop has solar once any panel scores strictly above the threshold.
    pub fn has_solar(&self, rooftop: &BoundingBox, panels: &[BoundingBox]) -> bool {
        panels
            .iter()
            .any(|panel| self.score(rooftop, panel) > self.config.threshold)
    }

    pub fn assign(&self, rooftops: &[BoundingBox], panels: &[BoundingBox]) -> Vec<bool> {
        rooftops
            .iter()
            .map(|rooftop| self.has_solar(rooftop, panels))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn test_no_panels_means_no_solar() {
        let matcher = PanelMatcher::default();
        assert!(!matcher.has_solar(&bbox(0.0, 0.0, 10.0, 10.0), &[]));
    }

    #[test]
    fn test_iou_threshold_is_exclusive() {
        let matcher = PanelMatcher::default();
        let rooftop = bbox(0.0, 0.0, 100.0, 100.0);

        // IoU 0.04
        assert!(!matcher.has_solar(&rooftop, &[bbox(10.0, 10.0, 30.0, 30.0)]));
        // IoU 0.09
        assert!(matcher.has_solar(&rooftop, &[bbox(10.0, 10.0, 40.0, 40.0)]));

        let exact = PanelMatcher::new(MatchConfig {
            strategy: MatchStrategy::Iou,
            threshold: 0.09,
        });
        assert!(!exact.has_solar(&rooftop, &[bbox(10.0, 10.0, 40.0, 40.0)]));
    }

    #[test]
    fn test_coverage_strategy_accepts_small_panels() {
        let matcher = PanelMatcher::new(MatchConfig {
            strategy: MatchStrategy::Coverage,
            threshold: 0.5,
        });
        let rooftop = bbox(0.0, 0.0, 100.0, 100.0);
        assert!(matcher.has_solar(&rooftop, &[bbox(10.0, 10.0, 20.0, 20.0)]));
        assert!(!matcher.has_solar(&rooftop, &[bbox(95.0, 10.0, 115.0, 20.0)]));
    }

    #[test]
    fn test_assign_per_rooftop() {
        let matcher = PanelMatcher::default();
        let rooftops = [bbox(0.0, 0.0, 10.0, 10.0), bbox(100.0, 100.0, 110.0, 110.0)];
        let panels = [bbox(2.0, 2.0, 8.0, 8.0)];
        assert_eq!(matcher.assign(&rooftops, &panels), vec![true, false]);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(MatchStrategy::parse("IoU"), Some(MatchStrategy::Iou));
        assert_eq!(MatchStrategy::parse("coverage"), Some(MatchStrategy::Coverage));
        assert_eq!(MatchStrategy::parse("mask"), None);
    }
}
