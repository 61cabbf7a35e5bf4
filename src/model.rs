use crate::config::ModelConfig;
use crate::preprocess::INPUT_SIZE;
use ndarray::{Array, Ix4};
use ort::{
    execution_providers::{CUDAExecutionProvider, ExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to load model weights: {0}")]
    Load(ort::Error),
    #[error("model outputs {actual} classes but the label table holds {expected}")]
    ClassCountMismatch { expected: usize, actual: usize },
    #[error("inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

/// Seam between the predictor and the ONNX runtime so tests can substitute
/// a mock. `infer` returns the softmaxed probability distribution over all
/// classes.
pub trait ModelHandle: Send + Sync + 'static {
    fn infer(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError>;
    fn is_loaded(&self) -> bool;
    fn device(&self) -> Device;
    fn num_classes(&self) -> usize;
}

/// Classifier sessions loaded once at startup and shared read-only for the
/// rest of the process lifetime. Each session requires exclusive access per
/// forward pass, so concurrent requests are spread round-robin over
/// `num_instances` sessions of the same weights.
pub struct OrtModelHandle {
    sessions: Vec<Mutex<Session>>,
    counter: AtomicUsize,
    output_name: String,
    device: Device,
    num_classes: usize,
}

impl OrtModelHandle {
    pub fn new(model_config: &ModelConfig, num_classes: usize) -> Result<Self, ModelError> {
        let cuda = CUDAExecutionProvider::default();
        let device = if cuda.is_available().unwrap_or(false) {
            Device::Cuda
        } else {
            Device::Cpu
        };

        ort::init()
            .with_execution_providers([cuda.build()])
            .commit()
            .map_err(ModelError::Load)?;

        let sessions = (0..model_config.num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_config.get_model_path())?;
                Ok(Mutex::new(session))
            })
            .collect::<Result<Vec<_>, ort::Error>>()
            .map_err(ModelError::Load)?;

        let output_name = {
            let session = sessions[0]
                .lock()
                .map_err(|e| ModelError::Inference(format!("session mutex poisoned: {}", e)))?;
            session.outputs[0].name.clone()
        };

        // Probe forward pass: the exported graph fixes the classifier
        // width, so a label-table drift surfaces here instead of as
        // garbage predictions.
        let size = INPUT_SIZE as usize;
        let probe = Array::zeros((1, 3, size, size));
        let logits = run_forward(&sessions[0], &output_name, &probe)?;
        if logits.len() != num_classes {
            return Err(ModelError::ClassCountMismatch {
                expected: num_classes,
                actual: logits.len(),
            });
        }

        tracing::info!(
            "Loaded {} ONNX sessions on {} ({} classes)",
            sessions.len(),
            device.as_str(),
            num_classes
        );

        Ok(Self {
            sessions,
            counter: AtomicUsize::new(0),
            output_name,
            device,
            num_classes,
        })
    }
}

impl ModelHandle for OrtModelHandle {
    fn infer(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        tracing::debug!("Handling request with session {}", index);

        let logits = run_forward(&self.sessions[index], &self.output_name, input)?;
        if logits.len() != self.num_classes {
            return Err(ModelError::Inference(format!(
                "expected {} logits, got {}",
                self.num_classes,
                logits.len()
            )));
        }

        Ok(softmax(&logits))
    }

    fn is_loaded(&self) -> bool {
        !self.sessions.is_empty()
    }

    fn device(&self) -> Device {
        self.device
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }
}

fn run_forward(
    session: &Mutex<Session>,
    output_name: &str,
    input: &Array<f32, Ix4>,
) -> Result<Vec<f32>, ModelError> {
    let mut session = session
        .lock()
        .map_err(|e| ModelError::Inference(format!("session mutex poisoned: {}", e)))?;

    let owned_buffer;
    let input_view = if input.view().is_standard_layout() {
        input.view()
    } else {
        owned_buffer = input.to_owned();
        owned_buffer.view()
    };

    let tensor_ref = TensorRef::from_array_view(input_view)
        .map_err(|e| ModelError::Inference(format!("failed to build tensor: {}", e)))?;

    let input_tensor = ort::inputs![tensor_ref];

    let outputs = session
        .run(input_tensor)
        .map_err(|e| ModelError::Inference(format!("forward pass failed: {}", e)))?;

    let (_shape, data) = outputs[output_name]
        .try_extract_tensor::<f32>()
        .map_err(|e| ModelError::Inference(format!("failed to extract tensor: {}", e)))?;

    // Batch dimension is always 1, so the flat buffer is the logit vector.
    Ok(data.to_vec())
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|v| v / sum).collect()
}
