use std::collections::BTreeMap;

use candle_core::{DType, Module, Tensor, D};
use candle_nn::{ops::softmax, Func};
use serde::Serialize;
use tracing::debug;

use crate::{
    error::ClassifyError,
    label::{Label, CLASS_LABELS, NUM_CLASSES},
};

/// Predicted label together with the softmax probability of every class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    #[serde(rename = "prediction")]
    pub label: Label,
    pub probabilities: BTreeMap<Label, f32>,
}

impl Prediction {
    /// Softmax over the head outputs, then argmax. Ties go to the lowest index.
    pub fn from_logits(logits: &Tensor) -> Result<Self, ClassifyError> {
        let logits = logits.flatten_all()?.to_dtype(DType::F32)?;
        let actual = logits.elem_count();
        if actual != NUM_CLASSES {
            return Err(ClassifyError::UnexpectedOutput {
                expected: NUM_CLASSES,
                actual,
            });
        }

        let probs = softmax(&logits, D::Minus1)?.to_vec1::<f32>()?;
        debug!("softmax: {:?}", probs);

        let best = probs
            .iter()
            .enumerate()
            .fold(0, |best, (i, p)| if *p > probs[best] { i } else { best });

        Ok(Self {
            label: CLASS_LABELS[best],
            probabilities: CLASS_LABELS.iter().copied().zip(probs).collect(),
        })
    }

    pub fn probability(&self, label: Label) -> f32 {
        self.probabilities.get(&label).copied().unwrap_or(0.0)
    }
}

/// A network in evaluation mode, ready to score preprocessed scans.
pub struct Classifier<M = Func<'static>> {
    model: M,
}

impl<M: Module> Classifier<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn predict(&self, pixels: &Tensor) -> Result<Prediction, ClassifyError> {
        let logits = self.model.forward(pixels)?;
        debug!("logits: {}", logits);
        Prediction::from_logits(&logits)
    }
}
