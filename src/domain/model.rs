use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates, `(x1, y1)` top-left and `(x2, y2)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> std::result::Result<Self, String> {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return Err(format!(
                "box coordinates must be finite, got [{}, {}, {}, {}]",
                x1, y1, x2, y2
            ));
        }
        if x2 < x1 || y2 < y1 {
            return Err(format!(
                "box [{}, {}, {}, {}] has x2 < x1 or y2 < y1",
                x1, y1, x2, y2
            ));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Smallest box containing every polygon vertex.
    pub fn from_polygon(points: &[[f64; 2]]) -> std::result::Result<Self, String> {
        let (first, rest) = points
            .split_first()
            .ok_or_else(|| "polygon has no points".to_string())?;

        let mut bbox = (first[0], first[1], first[0], first[1]);
        for [x, y] in rest {
            bbox.0 = bbox.0.min(*x);
            bbox.1 = bbox.1.min(*y);
            bbox.2 = bbox.2.max(*x);
            bbox.3 = bbox.3.max(*y);
        }
        Self::new(bbox.0, bbox.1, bbox.2, bbox.3)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x1: self.x1 + dx,
            y1: self.y1 + dy,
            x2: self.x2 + dx,
            y2: self.y2 + dy,
        }
    }

    /// Overlap area with `other`; zero when the boxes only touch or are disjoint.
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let x_left = self.x1.max(other.x1);
        let y_top = self.y1.max(other.y1);
        let x_right = self.x2.min(other.x2);
        let y_bottom = self.y2.min(other.y2);

        if x_right <= x_left || y_bottom <= y_top {
            return 0.0;
        }
        (x_right - x_left) * (y_bottom - y_top)
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = String;

    fn try_from(v: [f64; 4]) -> std::result::Result<Self, Self::Error> {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// A single model output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
    /// Segmentation outline, present for mask-producing models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<[f64; 2]>>,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64) -> Self {
        Self {
            bbox,
            confidence,
            class_id: None,
            polygon: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_index: u64,
    pub rooftops: Vec<Detection>,
    pub panels: Vec<Detection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedDetection {
    pub tracker_id: u64,
    pub detection: Detection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RooftopObservation {
    pub tracker_id: u64,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub has_solar: bool,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdoptionSummary {
    pub total_rooftops: usize,
    pub with_solar: usize,
    pub without_solar: usize,
    pub adoption_rate: Option<f64>,
}

impl AdoptionSummary {
    pub fn new(total_rooftops: usize, with_solar: usize) -> Self {
        let adoption_rate = if total_rooftops == 0 {
            None
        } else {
            Some(with_solar as f64 / total_rooftops as f64)
        };
        Self {
            total_rooftops,
            with_solar,
            without_solar: total_rooftops.saturating_sub(with_solar),
            adoption_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub frame_index: u64,
    pub rooftops: Vec<RooftopObservation>,
    pub panels_tracked: usize,
    pub summary: AdoptionSummary,
}

impl FrameReport {
    pub fn solar_rooftops(&self) -> usize {
        self.rooftops.iter().filter(|r| r.has_solar).count()
    }
}

/// Lifetime of one unique rooftop across the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RooftopRecord {
    pub tracker_id: u64,
    pub first_frame: u64,
    pub last_frame: u64,
    pub frames_observed: u64,
    pub solar_frames: u64,
    pub first_solar_frame: Option<u64>,
    pub has_solar: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub frames: Vec<FrameReport>,
    pub rooftops: Vec<RooftopRecord>,
    pub summary: AdoptionSummary,
}
