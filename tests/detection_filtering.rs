use std::io::Write;

use agods::detect::{detect, StubEngine};
use agods::frame::Frame;
use agods::labels::LabelCatalog;
use agods::AgentError;

fn frame() -> Frame {
    Frame::from_rgb(640, 368, vec![90u8; 640 * 368 * 3]).unwrap()
}

fn boxes(rows: usize) -> Vec<f32> {
    (0..rows).flat_map(|_| [0.1, 0.2, 0.6, 0.7]).collect()
}

#[test]
fn two_cats_one_above_threshold() {
    let mut engine = StubEngine::new(300, 300).with_outputs(
        boxes(2),
        vec![17.0, 17.0],
        vec![0.9, 0.3],
        2.0,
    );
    let result = detect(&frame(), &mut engine, 0.5, &[17.0]).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.detections[0].score, 0.9);
    assert_eq!(engine.last_input_size(), Some((300, 300)));
}

#[test]
fn kept_detections_always_match_filter() {
    let classes = vec![0.0, 17.0, 18.0, 17.0, 3.0, 18.0];
    let scores = vec![0.95, 0.49, 0.5, 0.51, 0.99, 0.1];
    let category_sets: [&[f32]; 4] = [&[17.0], &[18.0, 0.0], &[], &[3.0, 17.0, 18.0]];

    for categories in category_sets {
        for threshold in [0.0, 0.3, 0.5, 0.9, 1.0] {
            for count in 0..=classes.len() {
                let mut engine = StubEngine::new(8, 8).with_outputs(
                    boxes(classes.len()),
                    classes.clone(),
                    scores.clone(),
                    count as f32,
                );
                let result = detect(&frame(), &mut engine, threshold, categories).unwrap();
                assert!(result.len() <= count);
                assert_eq!(result.raw_count, count);
                for detection in &result {
                    assert!(categories.contains(&detection.class_id));
                    assert!(detection.score >= threshold);
                }
            }
        }
    }
}

#[test]
fn engine_failure_yields_no_partial_result() {
    let mut engine = StubEngine::new(8, 8)
        .with_outputs(boxes(1), vec![17.0], vec![0.9], 1.0)
        .failing("delegate crashed");
    let err = detect(&frame(), &mut engine, 0.5, &[17.0]).unwrap_err();
    assert!(matches!(err, AgentError::Inference(_)));
    assert!(err.to_string().contains("delegate crashed"));
}

#[test]
fn detections_resolve_through_label_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "0 person").unwrap();
    writeln!(file, "17: cat").unwrap();
    writeln!(file, "18:dog").unwrap();
    let labels = LabelCatalog::load(file.path()).unwrap();

    let mut engine = StubEngine::new(8, 8).with_outputs(
        boxes(3),
        vec![18.0, 5.0, 0.0],
        vec![0.8, 0.9, 0.7],
        3.0,
    );
    let result = detect(&frame(), &mut engine, 0.5, &[0.0, 18.0]).unwrap();
    let names: Vec<&str> = result
        .iter()
        .map(|d| labels.label(d.class_id).unwrap())
        .collect();
    assert_eq!(names, vec!["dog", "person"]);
}
