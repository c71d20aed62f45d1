use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::gpio::DEFAULT_GPIO_ROOT;
use crate::ingest::{CameraSettings, Rotation};

pub const DEFAULT_CONFIG_PATH: &str = "/boot/agods.toml";

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 368;
const DEFAULT_ROTATION: u32 = 0;
const DEFAULT_BRIGHTNESS: u8 = 50;
const DEFAULT_WARM_UP_SECS: u64 = 2;
const DEFAULT_THRESHOLD: f32 = 0.5;
const DEFAULT_LABEL_FILE: &str = "agods_labels.txt";
const DEFAULT_MODEL_FILE: &str = "agods.tflite";
const DEFAULT_CATEGORIES: [f32; 1] = [0.0];
const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_INPUT_SIZE: u32 = 300;
const DEFAULT_ALARM_PIN: u32 = 22;
const DEFAULT_DWELL_SECS: u64 = 2;
const DEFAULT_SENSOR_PIN: u32 = 27;
const DEFAULT_MOTION_INDICATOR_PIN: u32 = 4;
const DEFAULT_MOTION_POLL_MS: u64 = 50;
const DEFAULT_IMAGE: &str = "agods.jpg";
const DEFAULT_OVERLAY_IMAGE: &str = "agods_overlay.jpg";
const DEFAULT_LOG_FILE: &str = "/var/log/agods.log";

#[derive(Debug, Deserialize, Default)]
struct AgentConfigFile {
    camera: Option<CameraConfigFile>,
    object_detection: Option<DetectionConfigFile>,
    actuator: Option<ActuatorConfigFile>,
    motion: Option<MotionConfigFile>,
    debug: Option<DebugConfigFile>,
    other: Option<OtherConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    rotation: Option<u32>,
    brightness: Option<u8>,
    warm_up_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    threshold: Option<f32>,
    label_file: Option<PathBuf>,
    model_file: Option<String>,
    categories: Option<CategoriesField>,
    interval: Option<u64>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

/// Categories as a TOML array or a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoriesField {
    List(Vec<f32>),
    Csv(String),
}

#[derive(Debug, Deserialize, Default)]
struct ActuatorConfigFile {
    alarm_pin: Option<u32>,
    indicator_pin: Option<u32>,
    dwell_secs: Option<u64>,
    gpio_root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct MotionConfigFile {
    enabled: Option<bool>,
    sensor_pin: Option<u32>,
    poll_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DebugConfigFile {
    image: Option<PathBuf>,
    overlay: Option<bool>,
    overlay_image: Option<PathBuf>,
    font_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct OtherConfigFile {
    logging: Option<bool>,
    log_file: Option<PathBuf>,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config: Option<PathBuf>,
    pub model: Option<String>,
    pub labels: Option<PathBuf>,
    pub threshold: Option<f32>,
    pub image: Option<PathBuf>,
    pub interval: Option<u64>,
    pub debug: bool,
    pub motion: bool,
}

/// Immutable agent configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// File the settings were read from; `None` when running on defaults.
    pub source: Option<PathBuf>,
    pub camera: CameraSettings,
    pub warm_up: Duration,
    pub detection: DetectionSettings,
    pub actuator: ActuatorSettings,
    pub motion: MotionSettings,
    pub debug: DebugSettings,
    pub logging: LogSettings,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub threshold: f32,
    pub label_file: PathBuf,
    pub model_file: String,
    pub categories: Vec<f32>,
    pub interval: Duration,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone)]
pub struct ActuatorSettings {
    pub alarm_pin: u32,
    pub indicator_pin: Option<u32>,
    pub dwell: Duration,
    pub gpio_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MotionSettings {
    pub enabled: bool,
    pub sensor_pin: u32,
    pub poll: Duration,
}

#[derive(Debug, Clone)]
pub struct DebugSettings {
    pub enabled: bool,
    pub image: PathBuf,
    pub overlay: bool,
    pub overlay_image: PathBuf,
    pub font_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub enabled: bool,
    pub log_file: PathBuf,
}

impl AgentConfig {
    /// Read the configured file (or the default path), merge overrides, validate.
    ///
    /// An explicitly named file must exist. A missing default file means
    /// running on built-in defaults.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let (file_cfg, source) = match overrides.config.as_deref() {
            Some(path) => (read_config_file(path)?, Some(path.to_path_buf())),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    (read_config_file(path)?, Some(path.to_path_buf()))
                } else {
                    (AgentConfigFile::default(), None)
                }
            }
        };
        let mut cfg = Self::build(file_cfg, overrides)?;
        cfg.source = source;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse TOML text, merge overrides, validate.
    pub fn from_toml_str(raw: &str, overrides: &ConfigOverrides) -> Result<Self> {
        let file_cfg = toml::from_str(raw)
            .map_err(|e| AgentError::Config(format!("invalid config: {}", e)))?;
        let cfg = Self::build(file_cfg, overrides)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn build(file: AgentConfigFile, overrides: &ConfigOverrides) -> Result<Self> {
        let camera_file = file.camera.unwrap_or_default();
        let detection_file = file.object_detection.unwrap_or_default();
        let actuator_file = file.actuator.unwrap_or_default();
        let motion_file = file.motion.unwrap_or_default();
        let debug_file = file.debug.unwrap_or_default();
        let other_file = file.other.unwrap_or_default();

        let motion = MotionSettings {
            enabled: overrides.motion || motion_file.enabled.unwrap_or(false),
            sensor_pin: motion_file.sensor_pin.unwrap_or(DEFAULT_SENSOR_PIN),
            poll: Duration::from_millis(motion_file.poll_ms.unwrap_or(DEFAULT_MOTION_POLL_MS)),
        };
        // The PIR sensor needs no exposure settling and paces the loop itself.
        let (default_warm_up, default_interval) = if motion.enabled {
            (0, 0)
        } else {
            (DEFAULT_WARM_UP_SECS, DEFAULT_INTERVAL_SECS)
        };
        // The motion deployment lights its LED alongside the alarm.
        let default_indicator = motion.enabled.then_some(DEFAULT_MOTION_INDICATOR_PIN);

        let rotation_degrees = camera_file.rotation.unwrap_or(DEFAULT_ROTATION);
        let rotation = Rotation::try_from(rotation_degrees)
            .map_err(|e| AgentError::Config(e.to_string()))?;
        let camera = CameraSettings {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            width: camera_file.width.unwrap_or(DEFAULT_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_HEIGHT),
            rotation,
            brightness: camera_file.brightness.unwrap_or(DEFAULT_BRIGHTNESS),
        };
        let warm_up = Duration::from_secs(camera_file.warm_up_secs.unwrap_or(default_warm_up));

        let categories = match detection_file.categories {
            Some(CategoriesField::List(list)) => list,
            Some(CategoriesField::Csv(csv)) => parse_categories(&csv)?,
            None => DEFAULT_CATEGORIES.to_vec(),
        };
        let detection = DetectionSettings {
            threshold: overrides
                .threshold
                .or(detection_file.threshold)
                .unwrap_or(DEFAULT_THRESHOLD),
            label_file: overrides
                .labels
                .clone()
                .or(detection_file.label_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LABEL_FILE)),
            model_file: overrides
                .model
                .clone()
                .or(detection_file.model_file)
                .unwrap_or_else(|| DEFAULT_MODEL_FILE.to_string()),
            categories,
            interval: Duration::from_secs(
                overrides
                    .interval
                    .or(detection_file.interval)
                    .unwrap_or(default_interval),
            ),
            input_width: detection_file.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
            input_height: detection_file.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
        };

        let actuator = ActuatorSettings {
            alarm_pin: actuator_file.alarm_pin.unwrap_or(DEFAULT_ALARM_PIN),
            indicator_pin: actuator_file.indicator_pin.or(default_indicator),
            dwell: Duration::from_secs(actuator_file.dwell_secs.unwrap_or(DEFAULT_DWELL_SECS)),
            gpio_root: actuator_file
                .gpio_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GPIO_ROOT)),
        };

        let debug = DebugSettings {
            enabled: overrides.debug,
            image: overrides
                .image
                .clone()
                .or(debug_file.image)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE)),
            overlay: debug_file.overlay.unwrap_or(false),
            overlay_image: debug_file
                .overlay_image
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OVERLAY_IMAGE)),
            font_file: debug_file.font_file,
        };

        let logging = LogSettings {
            enabled: other_file.logging.unwrap_or(false),
            log_file: other_file
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
        };

        Ok(Self {
            source: None,
            camera,
            warm_up,
            detection,
            actuator,
            motion,
            debug,
            logging,
        })
    }

    fn validate(&self) -> Result<()> {
        let detection = &self.detection;
        if !(0.0..=1.0).contains(&detection.threshold) {
            return Err(AgentError::Config(format!(
                "threshold must be within 0..=1, got {}",
                detection.threshold
            )));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(AgentError::Config(format!(
                "camera resolution must be non-zero, got {}x{}",
                self.camera.width, self.camera.height
            )));
        }
        if self.camera.brightness > 100 {
            return Err(AgentError::Config(format!(
                "brightness must be within 0..=100, got {}",
                self.camera.brightness
            )));
        }
        if self.camera.device.trim().is_empty() {
            return Err(AgentError::Config("camera device must be set".into()));
        }
        if self.motion.enabled {
            return Ok(());
        }
        if detection.categories.is_empty() {
            return Err(AgentError::Config("at least one category is required".into()));
        }
        if detection.categories.iter().any(|c| !c.is_finite()) {
            return Err(AgentError::Config("categories must be finite numbers".into()));
        }
        if detection.input_width == 0 || detection.input_height == 0 {
            return Err(AgentError::Config("model input size must be non-zero".into()));
        }
        if detection.model_file.trim().is_empty() {
            return Err(AgentError::Config("model_file must be set".into()));
        }
        if detection.label_file.as_os_str().is_empty() {
            return Err(AgentError::Config("label_file must be set".into()));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AgentConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AgentError::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let parsed = if is_json {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    } else {
        toml::from_str(&raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| AgentError::Config(format!("invalid config file {}: {}", path.display(), e)))
}

fn parse_categories(value: &str) -> Result<Vec<f32>> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<f32>()
                .map_err(|_| AgentError::Config(format!("invalid category {:?}", entry)))
        })
        .collect()
}
