mod backend;
pub mod backends;
mod pipeline;
mod result;

pub use backend::{InferenceEngine, OutputTensor};
pub use backends::{open_engine, StubEngine};
pub use pipeline::{
    decode_outputs, detect, detection_line, DetectionPipeline, MotionTrigger, ObjectDetector,
    RawOutputs, BOXES_OUTPUT, CLASSES_OUTPUT, COUNT_OUTPUT, MOTION_CLASS_ID, SCORES_OUTPUT,
};
pub use result::{BoundingBox, Detection, DetectionResultSet};
