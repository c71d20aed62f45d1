use std::time::Duration;

/// Box in relative coordinates, engine order `(ymin, xmin, ymax, xmax)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub ymin: f32,
    pub xmin: f32,
    pub ymax: f32,
    pub xmax: f32,
}

impl BoundingBox {
    pub fn new(ymin: f32, xmin: f32, ymax: f32, xmax: f32) -> Self {
        Self {
            ymin,
            xmin,
            ymax,
            xmax,
        }
    }

    pub fn full_frame() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// True when ordered and inside the unit square.
    pub fn is_well_formed(&self) -> bool {
        let unit = 0.0..=1.0;
        unit.contains(&self.ymin)
            && unit.contains(&self.xmin)
            && unit.contains(&self.ymax)
            && unit.contains(&self.xmax)
            && self.xmin <= self.xmax
            && self.ymin <= self.ymax
    }
}

/// One qualifying object instance in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Engine class id, float encoded.
    pub class_id: f32,
    pub score: f32,
    pub bounding_box: BoundingBox,
}

/// Detections for one frame, in engine output order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResultSet {
    pub detections: Vec<Detection>,
    /// Raw `count` reported by the engine before filtering.
    pub raw_count: usize,
    /// Wall-clock time spent in the engine invocation.
    pub inference_time: Duration,
}

impl DetectionResultSet {
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }
}

impl<'a> IntoIterator for &'a DetectionResultSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
