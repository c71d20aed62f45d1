//! agods - object detection alarm daemon
//!
//! This daemon:
//! 1. Merges the configuration file with command-line overrides
//! 2. Loads the label catalog and the detection model
//! 3. Probes the camera (or PIR sensor) once, failing fast if it is absent
//! 4. Runs the capture → detect → actuate loop until terminated

use anyhow::{Context, Result};
use clap::Parser;

use agods::actuate::{ActuationController, ActuatorGroup, GpioActuator};
use agods::annotate::ImageAnnotator;
use agods::cli::Args;
use agods::clock::SystemClock;
use agods::config::{AgentConfig, DEFAULT_CONFIG_PATH};
use agods::detect::{open_engine, DetectionPipeline, MotionTrigger, ObjectDetector};
use agods::error::AgentError;
use agods::ingest::{open_source, CameraSession, FrameSource, MotionSensorSource};
use agods::labels::LabelCatalog;
use agods::logging;
use agods::scheduler::SchedulerLoop;

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = AgentConfig::load(&args.overrides())?;
    logging::init(&cfg.logging, cfg.debug.enabled)?;

    log::info!("AGODS Service Started");
    match &cfg.source {
        Some(path) => log::info!("configuration loaded from {}", path.display()),
        None => log::warn!(
            "no configuration file at {}, running on defaults",
            DEFAULT_CONFIG_PATH
        ),
    }

    if cfg.motion.enabled {
        let source = MotionSensorSource::new(
            &cfg.actuator.gpio_root,
            cfg.motion.sensor_pin,
            cfg.motion.poll,
        );
        return start(&cfg, source, MotionTrigger, None);
    }

    let labels = LabelCatalog::load(&cfg.detection.label_file)?;
    log::info!(
        "{} labels loaded from {}",
        labels.len(),
        cfg.detection.label_file.display()
    );
    let engine = open_engine(
        &cfg.detection.model_file,
        cfg.detection.input_width,
        cfg.detection.input_height,
    )
    .with_context(|| format!("failed to load model {}", cfg.detection.model_file))?;
    let pipeline = ObjectDetector::new(
        engine,
        cfg.detection.threshold,
        cfg.detection.categories.clone(),
    );
    let source = open_source(&cfg.camera)?;
    start(&cfg, source, pipeline, Some(labels))
}

fn start<S, P>(cfg: &AgentConfig, mut source: S, pipeline: P, labels: Option<LabelCatalog>) -> Result<()>
where
    S: FrameSource,
    P: DetectionPipeline,
{
    // A device missing at startup is fatal; later faults only end a cycle.
    drop(CameraSession::acquire(&mut source, &cfg.camera).map_err(AgentError::Resource)?);
    log::info!("{} ready on {}", source.name(), cfg.camera.device);

    let clock = SystemClock::new();
    let controller = ActuationController::new(build_actuators(cfg)?, clock, cfg.actuator.dwell)
        .with_console(cfg.debug.enabled);

    let mut scheduler = SchedulerLoop::new(source, cfg.camera.clone(), pipeline, controller, clock)
        .with_timing(cfg.warm_up, cfg.detection.interval);
    if cfg.debug.enabled {
        scheduler = scheduler.with_debug_image(&cfg.debug.image);
    }
    if let (true, Some(labels)) = (cfg.debug.overlay, labels) {
        let mut annotator = ImageAnnotator::new(&cfg.debug.overlay_image);
        if let Some(font) = &cfg.debug.font_file {
            annotator = annotator.with_font_file(font)?;
        }
        scheduler = scheduler.with_overlay(Box::new(annotator), labels);
    }

    scheduler.run()
}

fn build_actuators(cfg: &AgentConfig) -> Result<ActuatorGroup> {
    let root = &cfg.actuator.gpio_root;
    let mut group = ActuatorGroup::new().with(
        GpioActuator::open("alarm", root, cfg.actuator.alarm_pin)
            .context("failed to open alarm output")?,
    );
    if let Some(pin) = cfg.actuator.indicator_pin {
        group = group.with(
            GpioActuator::open("indicator", root, pin).context("failed to open indicator output")?,
        );
    }
    Ok(group)
}
