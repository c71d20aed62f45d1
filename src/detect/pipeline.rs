//! Frame to detections.
//!
//! `detect` is the object-detection path: nearest-neighbour resize to the
//! engine input, one synchronous invoke, then decoding of the four positional
//! outputs (boxes, classes, scores, count) filtered by category and score.
//!
//! `DetectionPipeline` lets the scheduler drive either that path
//! (`ObjectDetector`) or the motion-only deployment (`MotionTrigger`) with
//! the same loop.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use super::backend::{InferenceEngine, OutputTensor};
use super::result::{BoundingBox, Detection, DetectionResultSet};
use crate::error::AgentError;
use crate::frame::{resize_nearest, Frame};

pub const BOXES_OUTPUT: usize = 0;
pub const CLASSES_OUTPUT: usize = 1;
pub const SCORES_OUTPUT: usize = 2;
pub const COUNT_OUTPUT: usize = 3;

/// Detection stage of a cycle.
pub trait DetectionPipeline {
    fn name(&self) -> &'static str;

    fn detect(&mut self, frame: &Frame) -> crate::error::Result<DetectionResultSet>;

    /// Line logged (and printed in debug mode) when a result triggers the alarm.
    fn trigger_line(&self, result: &DetectionResultSet) -> String {
        detection_line(result.len(), result.inference_time)
    }
}

impl<T: DetectionPipeline + ?Sized> DetectionPipeline for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> crate::error::Result<DetectionResultSet> {
        (**self).detect(frame)
    }

    fn trigger_line(&self, result: &DetectionResultSet) -> String {
        (**self).trigger_line(result)
    }
}

/// `Detections:<n>, <seconds> Sec elapsed`.
pub fn detection_line(count: usize, inference_time: Duration) -> String {
    format!(
        "Detections:{}, {:.2} Sec elapsed",
        count,
        inference_time.as_secs_f32()
    )
}

/// Run one frame through the engine and keep detections of interest.
///
/// A detection is kept when its class id equals one of `categories` exactly
/// and its score is at least `threshold`. Output order is engine order.
/// Any engine or decoding failure yields an error and no partial result.
pub fn detect<E: InferenceEngine + ?Sized>(
    frame: &Frame,
    engine: &mut E,
    threshold: f32,
    categories: &[f32],
) -> crate::error::Result<DetectionResultSet> {
    let (width, height) = engine.input_size();
    let input = resize_nearest(frame.image(), width, height);
    engine.set_input(&input).map_err(AgentError::Inference)?;

    let start = Instant::now();
    engine.invoke().map_err(AgentError::Inference)?;
    let inference_time = start.elapsed();
    log::debug!(
        "{}: invoke took {:.3}s",
        engine.name(),
        inference_time.as_secs_f32()
    );

    let outputs = [BOXES_OUTPUT, CLASSES_OUTPUT, SCORES_OUTPUT, COUNT_OUTPUT]
        .map(|index| engine.output(index));
    let [boxes, classes, scores, count] = outputs;
    let raw = RawOutputs {
        boxes: boxes.map_err(AgentError::Inference)?,
        classes: classes.map_err(AgentError::Inference)?,
        scores: scores.map_err(AgentError::Inference)?,
        count: count.map_err(AgentError::Inference)?,
    };

    let (raw_count, detections) =
        decode_outputs(&raw, threshold, categories).map_err(AgentError::Inference)?;
    Ok(DetectionResultSet {
        detections,
        raw_count,
        inference_time,
    })
}

/// The four positional engine outputs.
#[derive(Clone, Debug)]
pub struct RawOutputs {
    /// `N x 4` relative boxes, `(ymin, xmin, ymax, xmax)`.
    pub boxes: OutputTensor,
    /// `N` float-encoded class ids.
    pub classes: OutputTensor,
    /// `N` scores in `[0, 1]`.
    pub scores: OutputTensor,
    /// Scalar count of valid rows.
    pub count: OutputTensor,
}

/// Decode and filter raw outputs. Returns the raw count and the kept rows.
pub fn decode_outputs(
    raw: &RawOutputs,
    threshold: f32,
    categories: &[f32],
) -> Result<(usize, Vec<Detection>)> {
    let count = decode_count(&raw.count)?;
    let boxes = raw.boxes.data();
    let classes = raw.classes.data();
    let scores = raw.scores.data();

    if let Some(&last) = raw.boxes.squeezed_shape().last() {
        if last != 4 {
            return Err(anyhow!(
                "boxes tensor {:?} is not N x 4",
                raw.boxes.shape()
            ));
        }
    }
    let rows = (boxes.len() / 4).min(classes.len()).min(scores.len());
    if count > rows {
        return Err(anyhow!(
            "engine count {} exceeds output rows (boxes {}, classes {}, scores {})",
            count,
            boxes.len() / 4,
            classes.len(),
            scores.len()
        ));
    }

    let mut detections = Vec::new();
    for i in 0..count {
        let class_id = classes[i];
        let score = scores[i];
        // Exact equality on the float-encoded id, no tolerance.
        if categories.iter().any(|&category| category == class_id) && score >= threshold {
            let b = &boxes[i * 4..i * 4 + 4];
            detections.push(Detection {
                class_id,
                score,
                bounding_box: BoundingBox::new(b[0], b[1], b[2], b[3]),
            });
        }
    }
    Ok((count, detections))
}

fn decode_count(tensor: &OutputTensor) -> Result<usize> {
    let value = match tensor.data() {
        [value] => *value,
        other => {
            return Err(anyhow!(
                "count tensor must hold one value, holds {}",
                other.len()
            ))
        }
    };
    if !value.is_finite() {
        return Err(anyhow!("count tensor is not finite: {}", value));
    }
    Ok(value.trunc().max(0.0) as usize)
}

// ----------------------------------------------------------------------------
// Pipeline variants
// ----------------------------------------------------------------------------

/// Camera + classifier deployment.
pub struct ObjectDetector<E> {
    engine: E,
    threshold: f32,
    categories: Vec<f32>,
}

impl<E: InferenceEngine> ObjectDetector<E> {
    pub fn new(engine: E, threshold: f32, categories: Vec<f32>) -> Self {
        Self {
            engine,
            threshold,
            categories,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: InferenceEngine> DetectionPipeline for ObjectDetector<E> {
    fn name(&self) -> &'static str {
        "object"
    }

    fn detect(&mut self, frame: &Frame) -> crate::error::Result<DetectionResultSet> {
        detect(frame, &mut self.engine, self.threshold, &self.categories)
    }
}

/// Motion-only deployment: every frame the sensor hands over is a trigger.
#[derive(Clone, Copy, Debug, Default)]
pub struct MotionTrigger;

/// Class id reported for motion triggers.
pub const MOTION_CLASS_ID: f32 = 0.0;

impl DetectionPipeline for MotionTrigger {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn detect(&mut self, _frame: &Frame) -> crate::error::Result<DetectionResultSet> {
        Ok(DetectionResultSet {
            detections: vec![Detection {
                class_id: MOTION_CLASS_ID,
                score: 1.0,
                bounding_box: BoundingBox::full_frame(),
            }],
            raw_count: 1,
            inference_time: Default::default(),
        })
    }

    fn trigger_line(&self, _result: &DetectionResultSet) -> String {
        "Motion Detected".to_string()
    }
}
