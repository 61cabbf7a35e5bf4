use crate::labels::{LabelError, LabelTable};
use crate::model::{Device, ModelError, ModelHandle};
use crate::preprocess::{self, PreprocessError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub const TOP_K: usize = 5;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Label(#[from] LabelError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLabel {
    pub gardiner_code: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub gardiner_code: String,
    pub confidence: f32,
    pub top_5: Vec<RankedLabel>,
}

/// Composes preprocessing, the forward pass and top-k ranking. Holds the
/// model behind the `ModelHandle` seam so tests can inject a mock.
pub struct Predictor<M: ModelHandle> {
    model: Arc<M>,
    labels: LabelTable,
}

impl<M: ModelHandle> Predictor<M> {
    pub fn new(model: Arc<M>, labels: LabelTable) -> Self {
        Self { model, labels }
    }

    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction, PredictError> {
        let input = preprocess::transform(image_bytes)?;
        let probabilities = self.model.infer(&input)?;

        let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
        // Descending by probability; equal probabilities keep the lowest
        // class index first.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let top_5 = ranked
            .iter()
            .take(TOP_K)
            .map(|&(index, confidence)| {
                Ok(RankedLabel {
                    gardiner_code: self.labels.label_at(index)?.to_string(),
                    confidence,
                })
            })
            .collect::<Result<Vec<_>, LabelError>>()?;

        let top = top_5
            .first()
            .cloned()
            .ok_or_else(|| ModelError::Inference("empty probability vector".to_string()))?;

        Ok(Prediction {
            gardiner_code: top.gardiner_code,
            confidence: top.confidence,
            top_5,
        })
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    pub fn device(&self) -> Device {
        self.model.device()
    }

    pub fn num_classes(&self) -> usize {
        self.labels.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use ndarray::{Array, Ix4};
    use std::io::Cursor;

    struct MockModelHandle {
        probabilities: Vec<f32>,
    }

    impl MockModelHandle {
        fn with_peaks(peaks: &[(usize, f32)]) -> Self {
            let mut probabilities = vec![0.0; 159];
            for &(index, probability) in peaks {
                probabilities[index] = probability;
            }
            Self { probabilities }
        }
    }

    impl ModelHandle for MockModelHandle {
        fn infer(&self, _input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError> {
            Ok(self.probabilities.clone())
        }

        fn is_loaded(&self) -> bool {
            true
        }

        fn device(&self) -> Device {
            Device::Cpu
        }

        fn num_classes(&self) -> usize {
            self.probabilities.len()
        }
    }

    fn test_image() -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(50, 50, Rgb([128, 64, 32]));
        let mut image_data: Vec<u8> = Vec::new();
        let mut cursor = Cursor::new(&mut image_data);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        image_data
    }

    fn predictor_with(peaks: &[(usize, f32)]) -> Predictor<MockModelHandle> {
        Predictor::new(
            Arc::new(MockModelHandle::with_peaks(peaks)),
            LabelTable::gardiner(),
        )
    }

    #[test]
    fn top_entry_matches_top_fields() {
        let predictor = predictor_with(&[(2, 0.6), (0, 0.2), (5, 0.1), (9, 0.05), (1, 0.05)]);

        let prediction = predictor.predict(&test_image()).unwrap();

        assert_eq!(prediction.top_5.len(), 5);
        assert_eq!(prediction.gardiner_code, "E9");
        assert!((prediction.confidence - 0.6).abs() < 1e-6);
        assert_eq!(prediction.top_5[0].gardiner_code, prediction.gardiner_code);
        assert_eq!(prediction.top_5[0].confidence, prediction.confidence);
    }

    #[test]
    fn top_5_is_sorted_descending() {
        let predictor = predictor_with(&[(7, 0.4), (3, 0.3), (42, 0.15), (100, 0.1), (20, 0.05)]);

        let prediction = predictor.predict(&test_image()).unwrap();

        for pair in prediction.top_5.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert_eq!(prediction.top_5[0].gardiner_code, "N30");
        assert_eq!(prediction.top_5[1].gardiner_code, "F18");
    }

    #[test]
    fn ties_break_toward_lowest_index() {
        let predictor = predictor_with(&[(12, 0.5), (4, 0.5)]);

        let prediction = predictor.predict(&test_image()).unwrap();

        // Index 4 ("G35") sorts before index 12 ("a2") at equal confidence.
        assert_eq!(prediction.gardiner_code, "G35");
        assert_eq!(prediction.top_5[1].gardiner_code, "a2");
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let predictor = predictor_with(&[(33, 0.9), (1, 0.1)]);
        let image = test_image();

        let first = predictor.predict(&image).unwrap();
        let second = predictor.predict(&image).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn malformed_image_propagates_decode_error() {
        let predictor = predictor_with(&[(0, 1.0)]);

        let err = predictor.predict(b"not an image").unwrap_err();

        assert!(matches!(err, PredictError::Preprocess(_)));
    }

    #[test]
    fn model_failure_propagates_without_retry() {
        struct FailingModelHandle;

        impl ModelHandle for FailingModelHandle {
            fn infer(&self, _input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError> {
                Err(ModelError::Inference("forward pass failed".to_string()))
            }

            fn is_loaded(&self) -> bool {
                true
            }

            fn device(&self) -> Device {
                Device::Cpu
            }

            fn num_classes(&self) -> usize {
                159
            }
        }

        let predictor = Predictor::new(Arc::new(FailingModelHandle), LabelTable::gardiner());

        let err = predictor.predict(&test_image()).unwrap_err();
        assert!(matches!(err, PredictError::Model(_)));
    }
}
