// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared ONNX Runtime session plumbing for the built-in providers

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayD};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::ProviderError;

/// A CPU-only ONNX session shared across concurrent requests
#[derive(Clone)]
pub struct OnnxSession {
    session: Arc<Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxSession {
    /// Load a model file with CPU execution and full graph optimization
    pub fn load(model_path: &Path, default_input: &str) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("Model not found: {}", model_path.display());
        }

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| default_input.to_string());

        if let Some(input) = session.inputs.first() {
            debug!(
                "{} input {}: {:?}",
                model_path.display(),
                input_name,
                input.input_type
            );
        }

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
        })
    }

    /// Run the model on one NCHW tensor and return its first output
    pub fn run(&self, input: Array4<f32>) -> Result<ArrayD<f32>, ProviderError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| ProviderError::Unavailable("ONNX session lock poisoned".to_string()))?;

        let input_value = Value::from_array(input)
            .map_err(|e| ProviderError::DetectionFailed(format!("input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|e| ProviderError::DetectionFailed(format!("inference: {}", e)))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ProviderError::DetectionFailed(format!("output tensor: {}", e)))?;

        Ok(output.to_owned())
    }
}
