use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::detect::backend::{InferenceEngine, OutputTensor};

/// Scripted engine for `stub://` model paths and tests.
///
/// Returns the same outputs on every invoke. With no script it reports zero
/// detections; `failing` makes every invoke return an error.
pub struct StubEngine {
    input_size: (u32, u32),
    outputs: Vec<OutputTensor>,
    failure: Option<String>,
    last_input_size: Option<(u32, u32)>,
    invocations: u64,
}

impl StubEngine {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            input_size: (width, height),
            outputs: vec![
                OutputTensor::batch_rows(4, Vec::new()),
                OutputTensor::vector(Vec::new()),
                OutputTensor::vector(Vec::new()),
                OutputTensor::scalar(0.0),
            ],
            failure: None,
            last_input_size: None,
            invocations: 0,
        }
    }

    /// Script the four positional outputs.
    pub fn with_outputs(
        mut self,
        boxes: Vec<f32>,
        classes: Vec<f32>,
        scores: Vec<f32>,
        count: f32,
    ) -> Self {
        self.outputs = vec![
            OutputTensor::batch_rows(4, boxes),
            OutputTensor::vector(classes),
            OutputTensor::vector(scores),
            OutputTensor::scalar(count),
        ];
        self
    }

    /// Make every invoke fail with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    pub fn last_input_size(&self) -> Option<(u32, u32)> {
        self.last_input_size
    }
}

impl InferenceEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    fn set_input(&mut self, image: &RgbImage) -> Result<()> {
        if image.dimensions() != self.input_size {
            return Err(anyhow!(
                "input {:?} does not match engine input {:?}",
                image.dimensions(),
                self.input_size
            ));
        }
        self.last_input_size = Some(image.dimensions());
        Ok(())
    }

    fn invoke(&mut self) -> Result<()> {
        self.invocations += 1;
        match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }

    fn output(&self, index: usize) -> Result<OutputTensor> {
        self.outputs
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("engine has no output {}", index))
    }
}
