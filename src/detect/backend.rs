use anyhow::{anyhow, Result};
use image::RgbImage;

/// One engine output tensor, flattened row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl OutputTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(anyhow!(
                "tensor shape {:?} needs {} values, received {}",
                shape,
                expected,
                data.len()
            ));
        }
        Ok(Self { shape, data })
    }

    /// Rank-1 tensor.
    pub fn vector(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// `[1, N, width]` batch; trailing values that do not fill a row are dropped.
    pub fn batch_rows(width: usize, mut data: Vec<f32>) -> Self {
        let rows = if width == 0 { 0 } else { data.len() / width };
        data.truncate(rows * width);
        Self {
            shape: vec![1, rows, width],
            data,
        }
    }

    pub fn scalar(value: f32) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Shape without unit dimensions, e.g. `[1, 10, 4]` becomes `[10, 4]`.
    pub fn squeezed_shape(&self) -> Vec<usize> {
        self.shape.iter().copied().filter(|&d| d != 1).collect()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Inference engine capability.
///
/// The engine is opaque: it takes one RGB raster of its fixed input size and
/// exposes positional output tensors after `invoke`. Box, class, score and
/// count interpretation happens in the detection pipeline, not here.
pub trait InferenceEngine {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Fixed input shape as `(width, height)`.
    fn input_size(&self) -> (u32, u32);

    /// Copy the raster into the input tensor.
    fn set_input(&mut self, image: &RgbImage) -> Result<()>;

    /// Run the model once, synchronously.
    fn invoke(&mut self) -> Result<()>;

    /// Output tensor at `index` from the last `invoke`.
    fn output(&self, index: usize) -> Result<OutputTensor>;
}

impl<T: InferenceEngine + ?Sized> InferenceEngine for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn input_size(&self) -> (u32, u32) {
        (**self).input_size()
    }

    fn set_input(&mut self, image: &RgbImage) -> Result<()> {
        (**self).set_input(image)
    }

    fn invoke(&mut self) -> Result<()> {
        (**self).invoke()
    }

    fn output(&self, index: usize) -> Result<OutputTensor> {
        (**self).output(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_rejects_mismatched_shape() {
        assert!(OutputTensor::new(vec![1, 2, 4], vec![0.0; 8]).is_ok());
        assert!(OutputTensor::new(vec![1, 2, 4], vec![0.0; 7]).is_err());
    }

    #[test]
    fn squeeze_drops_unit_dimensions() {
        let t = OutputTensor::new(vec![1, 10, 4], vec![0.0; 40]).unwrap();
        assert_eq!(t.squeezed_shape(), vec![10, 4]);
        assert!(OutputTensor::scalar(3.0).squeezed_shape().is_empty());
        assert_eq!(OutputTensor::batch_rows(4, vec![0.0; 9]).shape(), &[1, 2, 4]);
    }
}
