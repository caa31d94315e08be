// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text line recognition with CTC decoding

use anyhow::{Context, Result};
use ndarray::{ArrayD, ArrayView2, Axis, Ix2};
use std::fs;
use std::path::Path;
use tracing::info;

use super::preprocessing::preprocess_for_recognition;
use crate::vision::observations::TextCandidate;
use crate::vision::providers::session::OnnxSession;
use crate::vision::providers::ProviderError;
use image::DynamicImage;

/// CTC blank class index
pub const BLANK_INDEX: usize = 0;

/// Result of recognizing one text line
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Mean probability of the emitted characters
    pub confidence: f32,
    /// Next-best reading, if one differs from `text`
    pub alternate: Option<TextCandidate>,
}

/// Character table for CTC output classes
///
/// Class 0 is the blank; classes 1..=n are the dictionary lines in order,
/// followed by a trailing space class.
#[derive(Debug, Clone)]
pub struct CharDictionary {
    classes: Vec<Option<char>>,
}

impl CharDictionary {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read dictionary {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut classes = vec![None];
        classes.extend(
            contents
                .lines()
                .filter_map(|line| line.trim_end_matches('\r').chars().next())
                .map(Some),
        );
        classes.push(Some(' '));
        Self { classes }
    }

    /// Number of output classes, blank included
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.len() <= 1
    }

    fn char_at(&self, class: usize) -> Option<char> {
        self.classes.get(class).copied().flatten()
    }
}

/// Text recognition stage
#[derive(Debug, Clone)]
pub struct TextRecognitionModel {
    session: OnnxSession,
    dictionary: CharDictionary,
}

impl TextRecognitionModel {
    /// Load `rec_model.onnx` and its character dictionary
    pub fn load(model_path: &Path, dict_path: &Path) -> Result<Self> {
        let dictionary = CharDictionary::load(dict_path)?;
        info!(
            "Loading text recognition model from {} ({} classes)",
            model_path.display(),
            dictionary.len()
        );
        let session = OnnxSession::load(model_path, "x")?;
        Ok(Self {
            session,
            dictionary,
        })
    }

    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Recognize a cropped text line; `None` when nothing was read
    pub fn recognize(&self, crop: &DynamicImage) -> Result<Option<RecognizedText>, ProviderError> {
        let output = self.session.run(preprocess_for_recognition(crop))?;
        let probabilities = squeeze_batch(output)?;
        Ok(ctc_decode(probabilities.view(), &self.dictionary))
    }
}

fn squeeze_batch(output: ArrayD<f32>) -> Result<ndarray::Array2<f32>, ProviderError> {
    let output = match output.ndim() {
        3 => output.index_axis_move(Axis(0), 0),
        2 => output,
        _ => {
            return Err(ProviderError::DetectionFailed(format!(
                "unexpected recognition output shape {:?}",
                output.shape()
            )))
        }
    };
    output
        .into_dimensionality::<Ix2>()
        .map_err(|e| ProviderError::DetectionFailed(e.to_string()))
}

#[derive(Debug, Clone, Copy)]
struct Step {
    best: (usize, f32),
    second: (usize, f32),
}

/// Greedy CTC decoding of a `[timesteps, classes]` probability matrix
///
/// Repeated classes collapse and blanks are dropped. The alternate reading
/// swaps in the second-best class at the least confident timestep.
pub fn ctc_decode(
    probabilities: ArrayView2<f32>,
    dictionary: &CharDictionary,
) -> Option<RecognizedText> {
    let steps: Vec<Step> = probabilities
        .outer_iter()
        .map(|row| {
            let mut best = (BLANK_INDEX, f32::NEG_INFINITY);
            let mut second = (BLANK_INDEX, f32::NEG_INFINITY);
            for (class, &p) in row.iter().enumerate() {
                if p > best.1 {
                    second = best;
                    best = (class, p);
                } else if p > second.1 {
                    second = (class, p);
                }
            }
            Step { best, second }
        })
        .collect();

    let path: Vec<(usize, f32)> = steps.iter().map(|s| s.best).collect();
    let (text, confidence) = collapse(&path, dictionary)?;

    let alternate = steps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.second.1.is_finite())
        .min_by(|(_, a), (_, b)| a.best.1.total_cmp(&b.best.1))
        .and_then(|(weakest, step)| {
            let mut swapped = path.clone();
            swapped[weakest] = step.second;
            collapse(&swapped, dictionary)
        })
        .filter(|(alt, _)| *alt != text)
        .map(|(text, confidence)| TextCandidate { text, confidence });

    Some(RecognizedText {
        text,
        confidence,
        alternate,
    })
}

fn collapse(path: &[(usize, f32)], dictionary: &CharDictionary) -> Option<(String, f32)> {
    let mut text = String::new();
    let mut total = 0.0f32;
    let mut emitted = 0usize;
    let mut previous = BLANK_INDEX;

    for &(class, p) in path {
        if class != BLANK_INDEX && class != previous {
            if let Some(ch) = dictionary.char_at(class) {
                text.push(ch);
                total += p;
                emitted += 1;
            }
        }
        previous = class;
    }

    if text.trim().is_empty() {
        return None;
    }
    Some((text, (total / emitted as f32).clamp(0.0, 1.0)))
}
