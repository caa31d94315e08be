// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Reading-order reconstruction tests
//!
//! These tests verify that:
//! - Fragments on one line are joined left to right with single spaces
//! - Large vertical gaps become blank-line paragraph breaks
//! - Output depends only on geometry, never on input order
//! - Empty and single-fragment input are handled

use fabstir_vision_node::vision::{
    reading_order::{group_lines, reconstruct},
    NormalizedRect, TextObservation,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Helper: fragment with a 0.2 x 0.05 box
fn fragment(text: &str, x: f64, y: f64) -> TextObservation {
    TextObservation::new(text, 0.95, NormalizedRect::new(x, y, 0.20, 0.05))
}

/// Helper: a two-paragraph page
fn page() -> Vec<TextObservation> {
    vec![
        fragment("Dear", 0.10, 0.90),
        fragment("reader,", 0.32, 0.90),
        fragment("thanks", 0.10, 0.84),
        fragment("for", 0.32, 0.84),
        fragment("reading.", 0.54, 0.84),
        fragment("Regards", 0.10, 0.50),
        fragment("Fabstir", 0.10, 0.44),
    ]
}

#[cfg(test)]
mod reading_order_tests {
    use super::*;

    /// Test 1: Same-line fragments join with a space
    #[test]
    fn test_single_line() {
        let a = fragment("Hello", 0.10, 0.90);
        let b = fragment("World", 0.35, 0.90);
        assert_eq!(reconstruct(&[b.clone(), a.clone()]), "Hello World");
        assert_eq!(reconstruct(&[a, b]), "Hello World");
    }

    /// Test 2: Large vertical gap produces a paragraph break
    #[test]
    fn test_paragraph_break() {
        let fragments = vec![
            fragment("Hello", 0.10, 0.90),
            fragment("World", 0.35, 0.90),
            fragment("Next", 0.10, 0.60),
        ];
        assert_eq!(reconstruct(&fragments), "Hello World\n\nNext");
    }

    /// Test 3: Tight line spacing produces a single newline
    #[test]
    fn test_adjacent_lines() {
        let fragments = vec![fragment("first", 0.10, 0.90), fragment("second", 0.10, 0.84)];
        assert_eq!(reconstruct(&fragments), "first\nsecond");
    }

    /// Test 4: Multi-paragraph page
    #[test]
    fn test_page_layout() {
        assert_eq!(
            reconstruct(&page()),
            "Dear reader,\nthanks for reading.\n\nRegards\nFabstir"
        );
    }

    /// Test 5: Result is independent of input order
    ///
    /// Shuffles the page with a fixed seed many times and checks every
    /// permutation yields the same text.
    #[test]
    fn test_permutation_invariance() {
        let expected = reconstruct(&page());
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..50 {
            let mut shuffled = page();
            shuffled.shuffle(&mut rng);
            assert_eq!(reconstruct(&shuffled), expected);
        }
    }

    /// Test 6: Empty input yields empty text
    #[test]
    fn test_empty_input() {
        assert_eq!(reconstruct(&[]), "");
        assert!(group_lines(&[]).is_empty());
    }

    /// Test 7: Single fragment is returned verbatim
    #[test]
    fn test_single_fragment() {
        let only = fragment("  spaced  text ", 0.40, 0.40);
        assert_eq!(reconstruct(&[only]), "  spaced  text ");
    }

    /// Test 8: Slightly misaligned baselines still share a line
    #[test]
    fn test_baseline_jitter() {
        let fragments = vec![
            fragment("left", 0.10, 0.500),
            fragment("right", 0.60, 0.480),
            fragment("middle", 0.35, 0.510),
        ];
        let lines = group_lines(&fragments);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "left middle right");
    }

    /// Test 9: Resolution independence
    ///
    /// Scaling every box around the origin by the same factor keeps the same
    /// line and paragraph decisions.
    #[test]
    fn test_scale_invariance() {
        let scaled: Vec<TextObservation> = page()
            .into_iter()
            .map(|mut f| {
                let b = f.bounding_box;
                f.bounding_box =
                    NormalizedRect::new(b.x * 0.5, b.y * 0.5, b.width * 0.5, b.height * 0.5);
                f
            })
            .collect();
        assert_eq!(reconstruct(&scaled), reconstruct(&page()));
    }
}
