use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tempfile::{Builder, NamedTempFile};

use agods::cli::Args;
use agods::config::AgentConfig;
use agods::ingest::Rotation;
use agods::AgentError;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_config(suffix: &str, body: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().expect("temp config");
    file.write_all(body.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_toml_file_with_flag_overrides() {
    let file = write_config(
        ".toml",
        r#"
            [camera]
            device = "stub://porch"
            width = 1280
            height = 720
            rotation = 180
            brightness = 60

            [object_detection]
            threshold = 0.4
            label_file = "coco_labels.txt"
            model_file = "ssd_mobilenet.onnx"
            categories = "17, 18"
            interval = 30

            [actuator]
            alarm_pin = 17
            indicator_pin = 4

            [other]
            logging = true
            log_file = "/tmp/agods-test.log"
        "#,
    );
    let config_path = file.path().to_str().expect("utf-8 path");

    let args = Args::try_parse_from([
        "agods",
        "--config",
        config_path,
        "--threshold",
        "0.75",
        "--labels",
        "override_labels.txt",
    ])
    .expect("parse args");
    let cfg = AgentConfig::load(&args.overrides()).expect("load config");

    assert_eq!(cfg.source.as_deref(), Some(file.path()));
    assert_eq!(cfg.camera.device, "stub://porch");
    assert_eq!((cfg.camera.width, cfg.camera.height), (1280, 720));
    assert_eq!(cfg.camera.rotation, Rotation::Cw180);
    assert_eq!(cfg.camera.brightness, 60);
    assert_eq!(cfg.detection.threshold, 0.75);
    assert_eq!(cfg.detection.label_file, PathBuf::from("override_labels.txt"));
    assert_eq!(cfg.detection.model_file, "ssd_mobilenet.onnx");
    assert_eq!(cfg.detection.categories, vec![17.0, 18.0]);
    assert_eq!(cfg.detection.interval, Duration::from_secs(30));
    assert_eq!(cfg.actuator.alarm_pin, 17);
    assert_eq!(cfg.actuator.indicator_pin, Some(4));
    assert!(cfg.logging.enabled);
}

#[test]
fn config_path_can_come_from_the_environment() {
    let _guard = ENV_LOCK.lock().unwrap();
    let file = write_config(
        ".json",
        r#"{
            "object_detection": { "categories": [1.0, 3.0], "interval": 5 },
            "debug": { "overlay": true, "overlay_image": "overlay.png" }
        }"#,
    );

    std::env::set_var("AGODS_CONFIG", file.path());
    let args = Args::try_parse_from(["agods", "--debug"]);
    std::env::remove_var("AGODS_CONFIG");

    let cfg = AgentConfig::load(&args.expect("parse args").overrides()).expect("load config");
    assert_eq!(cfg.detection.categories, vec![1.0, 3.0]);
    assert_eq!(cfg.detection.interval, Duration::from_secs(5));
    assert!(cfg.debug.enabled);
    assert!(cfg.debug.overlay);
    assert_eq!(cfg.debug.overlay_image, PathBuf::from("overlay.png"));
}

#[test]
fn malformed_file_is_a_config_error() {
    let file = write_config(".toml", "[object_detection\nthreshold = ");
    let args = Args::try_parse_from(["agods", "--config", file.path().to_str().unwrap()])
        .expect("parse args");
    let err = AgentConfig::load(&args.overrides()).unwrap_err();
    assert!(matches!(err, AgentError::Config(_)));
    assert!(!err.is_cycle_local());
}

#[test]
fn invalid_threshold_override_is_rejected() {
    let file = write_config(".toml", "");
    let args = Args::try_parse_from([
        "agods",
        "--config",
        file.path().to_str().unwrap(),
        "--threshold",
        "2.0",
    ])
    .expect("parse args");
    assert!(matches!(
        AgentConfig::load(&args.overrides()),
        Err(AgentError::Config(_))
    ));
}
