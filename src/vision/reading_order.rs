// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Reading-order reconstruction for recognized text fragments
//!
//! Recovers human reading order and paragraph structure from an unordered
//! set of text fragments using only their normalized bounding boxes:
//!
//! 1. Sort fragments top to bottom (descending y, stable).
//! 2. Greedily group consecutive fragments into lines. A fragment starts a
//!    new line when its y differs from the previous fragment's y by more
//!    than half of the previous fragment's height.
//! 3. Order each line left to right and join with single spaces.
//! 4. Separate lines with `\n`, or with a blank line when the vertical gap
//!    between two lines exceeds 1.5x their average height.
//!
//! Thresholds scale with fragment size, so the result does not depend on
//! image resolution. Line representatives are single fragments, so pages
//! that mix very large and very small text can misplace a paragraph break.

use std::cmp::Ordering;

use super::observations::TextObservation;

/// Fraction of the previous fragment's height that still counts as the same line
pub const LINE_BREAK_RATIO: f64 = 0.5;

/// Gap (in average line heights) above which lines belong to different paragraphs
pub const PARAGRAPH_GAP_RATIO: f64 = 1.5;

/// One reconstructed line of text
#[derive(Debug, Clone)]
pub struct TextLine<'a> {
    /// Topmost fragment of the line, used for line spacing decisions
    pub representative: &'a TextObservation,
    /// Fragments ordered left to right
    pub fragments: Vec<&'a TextObservation>,
}

impl TextLine<'_> {
    /// Line text with fragments joined by single spaces
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Group fragments into lines, top to bottom
pub fn group_lines(observations: &[TextObservation]) -> Vec<TextLine<'_>> {
    let mut sorted: Vec<&TextObservation> = observations.iter().collect();
    sorted.sort_by(|a, b| descending_y(a, b));

    let mut lines: Vec<TextLine<'_>> = Vec::new();
    let mut previous: Option<&TextObservation> = None;

    for fragment in sorted {
        let starts_new_line = match previous {
            None => true,
            Some(prev) => {
                let distance = (prev.bounding_box.y - fragment.bounding_box.y).abs();
                distance > prev.bounding_box.height * LINE_BREAK_RATIO
            }
        };

        if starts_new_line {
            lines.push(TextLine {
                representative: fragment,
                fragments: vec![fragment],
            });
        } else if let Some(line) = lines.last_mut() {
            line.fragments.push(fragment);
        }
        previous = Some(fragment);
    }

    for line in &mut lines {
        line.fragments
            .sort_by(|a, b| a.bounding_box.x.total_cmp(&b.bounding_box.x));
    }

    lines
}

/// Whether the gap between two consecutive lines is a paragraph break
fn is_paragraph_break(prev: &TextObservation, cur: &TextObservation) -> bool {
    let gap = prev.bounding_box.y - cur.bounding_box.y - prev.bounding_box.height;
    let average_height = (prev.bounding_box.height + cur.bounding_box.height) / 2.0;
    gap > PARAGRAPH_GAP_RATIO * average_height
}

/// Rebuild the full text of a page from its fragments
///
/// Returns an empty string for empty input; a single fragment is returned
/// verbatim.
pub fn reconstruct(observations: &[TextObservation]) -> String {
    let lines = group_lines(observations);

    let mut text = String::new();
    let mut previous: Option<&TextLine<'_>> = None;

    for line in &lines {
        if let Some(prev) = previous {
            if is_paragraph_break(prev.representative, line.representative) {
                text.push_str("\n\n");
            } else {
                text.push('\n');
            }
        }
        text.push_str(&line.text());
        previous = Some(line);
    }

    text
}

fn descending_y(a: &TextObservation, b: &TextObservation) -> Ordering {
    b.bounding_box.y.total_cmp(&a.bounding_box.y)
}
