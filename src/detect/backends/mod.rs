pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubEngine;

#[cfg(feature = "backend-tract")]
pub use tract::TractEngine;

use anyhow::Result;

use crate::detect::backend::InferenceEngine;

/// Open the engine for a model path.
///
/// `stub://` paths select the scripted engine, which reports no detections.
pub fn open_engine(model_path: &str, width: u32, height: u32) -> Result<Box<dyn InferenceEngine>> {
    if model_path.starts_with("stub://") {
        log::warn!("using stub inference engine for {}", model_path);
        return Ok(Box::new(StubEngine::new(width, height)));
    }
    #[cfg(feature = "backend-tract")]
    {
        Ok(Box::new(TractEngine::new(model_path, width, height)?))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        Err(anyhow::anyhow!(
            "model {} requires the backend-tract feature",
            model_path
        ))
    }
}
