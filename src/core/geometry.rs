use crate::domain::model::BoundingBox;

/// Intersection over union of two boxes.
///
/// Disjoint or touching boxes score 0.0, and so do boxes whose union has no
/// area, so the result is always within `[0, 1]`.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let intersection = a.intersection_area(b);
    if intersection <= 0.0 {
        return 0.0;
    }

    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    (intersection / union).clamp(0.0, 1.0)
}

/// Fraction of `inner` covered by `outer`.
pub fn coverage(inner: &BoundingBox, outer: &BoundingBox) -> f64 {
    let area = inner.area();
    if area <= 0.0 {
        return 0.0;
    }
    (inner.intersection_area(outer) / area).clamp(0.0, 1.0)
}
