//! AGODS monitoring agent
//!
//! This crate implements a single-board object detection alarm: it
//! periodically captures a still frame, runs a pretrained detector over it,
//! keeps the detections whose class is of interest and whose score clears
//! the threshold, and drives a physical alarm on any qualifying detection.
//!
//! # Architecture
//!
//! The agent is one synchronous loop with no overlapping cycles:
//!
//! 1. **Capture**: a `FrameSource` is opened for exactly one cycle through a
//!    scoped `CameraSession` and released on every exit path.
//! 2. **Detect**: a `DetectionPipeline` turns the frame into a filtered
//!    `DetectionResultSet` (object detector, or motion trigger for PIR-only
//!    deployments).
//! 3. **Annotate** (debug): the raw frame and an optional overlay are saved.
//! 4. **Actuate**: the `ActuationController` engages the alarm for the dwell
//!    when the cycle produced any detection.
//! 5. **Sleep** for the configured interval.
//!
//! Faults inside a cycle are isolated to that cycle. Configuration and label
//! faults are fatal at startup.
//!
//! # Module Structure
//!
//! - `config`, `cli`: immutable configuration merged from file and flags
//! - `ingest`: frame sources (synthetic, V4L2, PIR sensor)
//! - `detect`: inference engines and detection decoding
//! - `annotate`, `labels`: overlay drawing and the class-name catalog
//! - `actuate`, `gpio`: alarm and indicator outputs
//! - `scheduler`, `clock`: the cycle loop and its time source

pub mod actuate;
pub mod annotate;
pub mod cli;
pub mod clock;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod gpio;
pub mod ingest;
pub mod labels;
pub mod logging;
pub mod scheduler;

pub use actuate::{ActuationController, Actuator, ActuatorGroup, GpioActuator, MemoryActuator};
pub use annotate::{annotate_detections, to_pixel_rect, Annotator, ImageAnnotator, PixelRect};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AgentConfig, ConfigOverrides};
pub use detect::{
    detect, BoundingBox, Detection, DetectionPipeline, DetectionResultSet, InferenceEngine,
    MotionTrigger, ObjectDetector, OutputTensor, StubEngine,
};
pub use error::AgentError;
pub use frame::Frame;
pub use ingest::{CameraSession, CameraSettings, FrameSource, Rotation, SyntheticCamera};
pub use labels::LabelCatalog;
pub use scheduler::{CycleReport, CycleSummary, SchedulerLoop};
