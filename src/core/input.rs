use crate::domain::model::{BoundingBox, Detection, FrameDetections};
use crate::domain::ports::InputFormat;
use crate::utils::error::{AnalysisError, Result};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct RawDetection {
    #[serde(default)]
    bbox: Option<[f64; 4]>,
    confidence: f64,
    #[serde(default)]
    class_id: Option<u32>,
    #[serde(default)]
    polygon: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    frame_index: u64,
    #[serde(default)]
    rooftops: Vec<RawDetection>,
    #[serde(default)]
    panels: Vec<RawDetection>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Wrapped { frames: Vec<RawFrame> },
    Bare(Vec<RawFrame>),
}

impl RawDetection {
    fn into_detection(self, frame: u64) -> Result<Detection> {
        let invalid = |message: String| AnalysisError::InputError { frame, message };

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(invalid(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        let bbox = match (self.bbox, self.polygon.as_deref()) {
            (Some(b), _) => BoundingBox::try_from(b).map_err(invalid)?,
            (None, Some(points)) => BoundingBox::from_polygon(points).map_err(invalid)?,
            (None, None) => {
                return Err(invalid(
                    "detection needs a bbox or a polygon".to_string(),
                ))
            }
        };
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(invalid(format!(
                "bbox [{}, {}, {}, {}] has zero area",
                bbox.x1, bbox.y1, bbox.x2, bbox.y2
            )));
        }

        Ok(Detection {
            bbox,
            confidence: self.confidence,
            class_id: self.class_id,
            polygon: self.polygon,
        })
    }
}

impl RawFrame {
    fn into_frame(self) -> Result<FrameDetections> {
        let frame = self.frame_index;
        Ok(FrameDetections {
            frame_index: frame,
            rooftops: self
                .rooftops
                .into_iter()
                .map(|d| d.into_detection(frame))
                .collect::<Result<_>>()?,
            panels: self
                .panels
                .into_iter()
                .map(|d| d.into_detection(frame))
                .collect::<Result<_>>()?,
        })
    }
}

/// Parses per-frame detections and returns them ordered by frame index.
pub fn parse_frames(data: &[u8], format: InputFormat) -> Result<Vec<FrameDetections>> {
    let raw_frames = match format {
        InputFormat::Json => match serde_json::from_slice::<RawDocument>(data)? {
            RawDocument::Wrapped { frames } => frames,
            RawDocument::Bare(frames) => frames,
        },
        InputFormat::JsonLines => {
            let text = std::str::from_utf8(data).map_err(|e| AnalysisError::ProcessingError {
                message: format!("detections are not valid UTF-8: {}", e),
            })?;
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .map(serde_json::from_str::<RawFrame>)
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let mut frames = raw_frames
        .into_iter()
        .map(RawFrame::into_frame)
        .collect::<Result<Vec<_>>>()?;
    frames.sort_by_key(|f| f.frame_index);

    let mut seen = HashSet::new();
    for frame in &frames {
        if !seen.insert(frame.frame_index) {
            return Err(AnalysisError::InputError {
                frame: frame.frame_index,
                message: "duplicate frame_index".to_string(),
            });
        }
    }

    Ok(frames)
}
