#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::{InferenceEngine, OutputTensor};

/// Tract-based engine for SSD-style ONNX detectors.
///
/// The model takes one `1 x H x W x 3` u8 tensor and produces boxes, classes,
/// scores and count at output positions 0..=3. It loads the model from a
/// local file and does no network I/O.
pub struct TractEngine {
    model: TypedRunnableModel<TypedModel>,
    width: u32,
    height: u32,
    input: Option<Tensor>,
    outputs: TVec<TValue>,
}

impl TractEngine {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    u8::datum_type(),
                    tvec!(1, height as usize, width as usize, 3),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            input: None,
            outputs: TVec::new(),
        })
    }
}

impl InferenceEngine for TractEngine {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_input(&mut self, image: &RgbImage) -> Result<()> {
        if image.dimensions() != (self.width, self.height) {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            ));
        }
        let input = tract_ndarray::Array4::from_shape_vec(
            (1, self.height as usize, self.width as usize, 3),
            image.as_raw().clone(),
        )
        .context("pack input tensor")?;
        self.input = Some(input.into_tensor());
        Ok(())
    }

    fn invoke(&mut self) -> Result<()> {
        let input = self.input.take().context("input tensor not set")?;
        self.outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        Ok(())
    }

    fn output(&self, index: usize) -> Result<OutputTensor> {
        let output = self
            .outputs
            .get(index)
            .ok_or_else(|| anyhow!("model produced no output {}", index))?;
        let values = output
            .cast_to::<f32>()
            .with_context(|| format!("output {} is not numeric", index))?;
        let data = values
            .as_slice::<f32>()
            .with_context(|| format!("read output {}", index))?
            .to_vec();
        OutputTensor::new(output.shape().to_vec(), data)
    }
}
