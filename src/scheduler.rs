//! The capture → detect → actuate loop.
//!
//! One cycle:
//! 1. Acquire the camera (scoped: released on every exit path).
//! 2. Start the preview and wait out the warm-up.
//! 3. Capture one frame and release the device.
//! 4. Run the detection pipeline.
//! 5. In debug mode, save the raw frame; draw the overlay when configured.
//! 6. Hand the detection count to the actuation controller.
//! 7. Sleep for the interval, then start over.
//!
//! A fault inside a cycle ends that cycle only. It is logged, the camera is
//! already released by then, and the interval sleep still happens, so the
//! period between cycle starts is always processing time plus interval.

use std::path::PathBuf;
use std::time::Duration;

use crate::actuate::{ActuationController, Actuator};
use crate::annotate::{annotate_detections, Annotator};
use crate::clock::Clock;
use crate::detect::DetectionPipeline;
use crate::error::{AgentError, Result};
use crate::frame::Frame;
use crate::ingest::{CameraSession, CameraSettings, FrameSource};
use crate::labels::LabelCatalog;

/// What one cycle produced.
#[derive(Debug)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Clock reading when the cycle started.
    pub started_at: Duration,
    pub outcome: Result<CycleSummary>,
}

impl CycleReport {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CycleSummary {
    /// Detections that passed the filter.
    pub detections: usize,
    /// Rows the engine reported before filtering.
    pub raw_count: usize,
    pub inference_time: Duration,
    /// Wall time from capture to the end of detection.
    pub detection_latency: Duration,
    /// False when the debug image or overlay could not be written.
    pub debug_output_ok: bool,
}

struct Overlay {
    annotator: Box<dyn Annotator>,
    labels: LabelCatalog,
}

pub struct SchedulerLoop<S, P, A, C> {
    source: S,
    camera: CameraSettings,
    pipeline: P,
    controller: ActuationController<A, C>,
    clock: C,
    warm_up: Duration,
    interval: Duration,
    debug_image: Option<PathBuf>,
    overlay: Option<Overlay>,
    cycles: u64,
}

impl<S, P, A, C> SchedulerLoop<S, P, A, C>
where
    S: FrameSource,
    P: DetectionPipeline,
    A: Actuator,
    C: Clock,
{
    pub fn new(
        source: S,
        camera: CameraSettings,
        pipeline: P,
        controller: ActuationController<A, C>,
        clock: C,
    ) -> Self {
        Self {
            source,
            camera,
            pipeline,
            controller,
            clock,
            warm_up: Duration::from_secs(2),
            interval: Duration::from_secs(60),
            debug_image: None,
            overlay: None,
            cycles: 0,
        }
    }

    pub fn with_timing(mut self, warm_up: Duration, interval: Duration) -> Self {
        self.warm_up = warm_up;
        self.interval = interval;
        self
    }

    /// Save every captured frame to `path`, overwriting the previous one.
    pub fn with_debug_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_image = Some(path.into());
        self
    }

    pub fn with_overlay(mut self, annotator: Box<dyn Annotator>, labels: LabelCatalog) -> Self {
        self.overlay = Some(Overlay { annotator, labels });
        self
    }

    /// Run cycles until the process is terminated.
    pub fn run(&mut self) -> ! {
        log::info!(
            "scheduler started: source={} pipeline={} interval={}s",
            self.source.name(),
            self.pipeline.name(),
            self.interval.as_secs()
        );
        loop {
            self.run_cycle();
        }
    }

    /// One full cycle, including the interval sleep.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let started_at = self.clock.now();
        let outcome = self.cycle();
        match &outcome {
            Ok(summary) => log::debug!(
                "cycle {}: {} detections ({} raw)",
                self.cycles,
                summary.detections,
                summary.raw_count
            ),
            Err(err) => {
                let level = if err.is_cycle_local() {
                    log::Level::Warn
                } else {
                    log::Level::Error
                };
                log::log!(level, "cycle {} failed: {}", self.cycles, err);
            }
        }
        self.clock.sleep(self.interval);
        CycleReport {
            cycle: self.cycles,
            started_at,
            outcome,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn controller(&self) -> &ActuationController<A, C> {
        &self.controller
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    fn cycle(&mut self) -> Result<CycleSummary> {
        let frame = self.capture()?;
        let result = self.pipeline.detect(&frame)?;
        let detection_latency = frame.age();
        log::debug!(
            "{}: detection done {:.3}s after capture",
            self.pipeline.name(),
            detection_latency.as_secs_f32()
        );
        let debug_output_ok = self.write_debug_output(&frame, &result);

        let line = self.pipeline.trigger_line(&result);
        self.controller.on_trigger(result.len(), &line)?;

        Ok(CycleSummary {
            detections: result.len(),
            raw_count: result.raw_count,
            inference_time: result.inference_time,
            detection_latency,
            debug_output_ok,
        })
    }

    fn capture(&mut self) -> Result<Frame> {
        let mut session =
            CameraSession::acquire(&mut self.source, &self.camera).map_err(AgentError::Resource)?;
        session.start_preview().map_err(AgentError::Resource)?;
        self.clock.sleep(self.warm_up);
        session.capture().map_err(AgentError::Resource)
    }

    // Best effort: failures are logged and never block actuation.
    fn write_debug_output(
        &mut self,
        frame: &Frame,
        result: &crate::detect::DetectionResultSet,
    ) -> bool {
        let mut ok = true;
        if let Some(path) = &self.debug_image {
            if let Err(err) = frame.save(path) {
                log::warn!("{}", AgentError::Annotation(err));
                ok = false;
            }
        }
        if let Some(overlay) = self.overlay.as_mut() {
            if let Err(err) =
                annotate_detections(overlay.annotator.as_mut(), frame, result, &overlay.labels)
            {
                log::warn!("overlay skipped: {}", err);
                ok = false;
            }
        }
        ok
    }
}
