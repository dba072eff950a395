//! Default fixture and scenario catalogue

use crate::fixtures::{ColorMode, ImageSpec, PatternKind, PayloadSpec};
use crate::invoker::ToolExit;
use crate::verifier::Scenario;

/// Files left behind by older harness versions
pub const LEGACY_ARTIFACTS: [&str; 2] = ["extracted_text.txt", "test_output.png"];

const MEDIUM_TEXT: &str = "This is a medium-sized payload for testing.
It contains multiple lines of text and various characters.
Special characters: !@#$%^&*()_+-={}[]|\\:\"\";'<>?,.
Numbers: 1234567890";

const LARGE_TEXT: &str = "This is a large payload for testing the steganography tool.
It contains multiple paragraphs, various characters, and a significant amount of text data.

His palms are sweaty, knees weak, arms are heavy
There's vomit on his sweater already, mom's spaghetti

Special characters and symbols:
!@#$%^&*()_+-={}[]|\\:\"\";'<>?,.
1234567890 ABCDEFGHIJKLMNOPQRSTUVWXYZ abcdefghijklmnopqrstuvwxyz

This payload should provide a comprehensive test of the steganography
embedding and extraction capabilities across different image sizes and
content types. The goal is to ensure that the tool works reliably
with various amounts of data and different character sets.

End of large payload - testing complete!";

/// Fixed catalogue of covers, payloads and scenarios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    pub images: Vec<ImageSpec>,
    pub payloads: Vec<PayloadSpec>,
    pub scenarios: Vec<Scenario>,
}

impl Corpus {
    /// The standard suite
    ///
    /// Alpha-checked scenarios run first, then the plain round trips, then
    /// the negative capacity case.
    #[must_use]
    pub fn standard() -> Self {
        let small = ImageSpec::new(
            "sample_small.png",
            50,
            50,
            ColorMode::Rgb,
            PatternKind::Checkerboard,
        );
        let medium = ImageSpec::new(
            "sample_medium.png",
            150,
            150,
            ColorMode::Rgb,
            PatternKind::Checkerboard,
        );
        let grayscale = ImageSpec::new(
            "sample_grayscale.png",
            100,
            100,
            ColorMode::Grayscale,
            PatternKind::Checkerboard,
        );
        let rgba = ImageSpec::new(
            "sample_rgba.png",
            100,
            100,
            ColorMode::Rgba,
            PatternKind::Checkerboard,
        );
        let large = ImageSpec::new(
            "sample_large.png",
            300,
            300,
            ColorMode::Rgb,
            PatternKind::Radial,
        );
        let xlarge = ImageSpec::new(
            "sample_xlarge.png",
            500,
            400,
            ColorMode::Rgb,
            PatternKind::Radial,
        );

        let small_text = PayloadSpec::text("small_payload.txt", "Hi mom");
        let medium_text = PayloadSpec::text("medium_payload.txt", MEDIUM_TEXT);
        let large_text = PayloadSpec::text("large_payload.txt", LARGE_TEXT);
        let binary = PayloadSpec::byte_range("binary_payload.bin", 500);
        let overflow = overflow_payload(&small);

        let scenarios = vec![
            Scenario::new("RGBA Alpha Preservation", rgba.clone(), small_text.clone())
                .with_alpha_check(),
            Scenario::new("RGBA LSB Integrity", rgba.clone(), medium_text.clone())
                .with_alpha_check(),
            Scenario::new("PNG Lossless Encoding", medium.clone(), large_text.clone())
                .with_alpha_check(),
            Scenario::new("Small", small.clone(), small_text.clone()),
            Scenario::new("Medium", medium.clone(), medium_text.clone()),
            Scenario::new("Grayscale", grayscale.clone(), small_text.clone()),
            Scenario::new("RGBA", rgba.clone(), medium_text.clone()),
            Scenario::new("Large", large.clone(), large_text.clone()),
            Scenario::new("Capacity", xlarge.clone(), large_text.clone()),
            Scenario::new("Binary Payload", large.clone(), binary.clone()),
            Scenario::new("Capacity Overflow", small.clone(), overflow.clone())
                .expecting_rejection(ToolExit::CapacityExceeded),
        ];

        Self {
            images: vec![small, medium, grayscale, rgba, large, xlarge],
            payloads: vec![small_text, medium_text, large_text, binary, overflow],
            scenarios,
        }
    }

    /// Every file name the corpus can leave in the working directory
    #[must_use]
    pub fn artifact_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .images
            .iter()
            .map(|i| i.name.clone())
            .chain(self.payloads.iter().map(|p| p.name.clone()))
            .collect();
        for scenario in &self.scenarios {
            names.push(scenario.output_image_name());
            names.push(scenario.extracted_payload_name());
        }
        names.extend(LEGACY_ARTIFACTS.iter().map(ToString::to_string));
        names.sort();
        names.dedup();
        names
    }
}

impl Default for Corpus {
    fn default() -> Self {
        Self::standard()
    }
}

/// Payload one byte larger than the cover's entire LSB plane
///
/// Cannot fit regardless of how the tool frames its header.
#[must_use]
pub fn overflow_payload(cover: &ImageSpec) -> PayloadSpec {
    let len = usize::try_from(cover.lsb_plane_bytes()).unwrap_or(usize::MAX - 1) + 1;
    PayloadSpec::filler("overflow_payload.bin", len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::Expectation;

    #[test]
    fn scenario_order() {
        let corpus = Corpus::standard();
        let labels: Vec<&str> = corpus.scenarios.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "RGBA Alpha Preservation",
                "RGBA LSB Integrity",
                "PNG Lossless Encoding",
                "Small",
                "Medium",
                "Grayscale",
                "RGBA",
                "Large",
                "Capacity",
                "Binary Payload",
                "Capacity Overflow",
            ]
        );
        assert!(corpus.scenarios[..3].iter().all(|s| s.expect_alpha_check));
        assert!(corpus.scenarios[3..].iter().all(|s| !s.expect_alpha_check));
    }

    #[test]
    fn slugs_are_unique() {
        let corpus = Corpus::standard();
        let mut slugs: Vec<String> = corpus.scenarios.iter().map(Scenario::slug).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), corpus.scenarios.len());
    }

    #[test]
    fn overflow_exceeds_small_cover() {
        let corpus = Corpus::standard();
        let last = corpus.scenarios.last().unwrap();
        assert_eq!(
            last.expectation,
            Expectation::EmbedRejected(ToolExit::CapacityExceeded)
        );
        assert_eq!(last.payload.len(), 938);
        assert!(last.payload.len() as u64 * 8 > last.cover.lsb_plane_bits());
    }

    #[test]
    fn medium_text_has_single_backslash() {
        let corpus = Corpus::standard();
        let medium = &corpus.payloads[1];
        assert_eq!(medium.name, "medium_payload.txt");
        let text = std::str::from_utf8(&medium.content).unwrap();
        assert!(text.contains("[]|\\:\"\";"));
        assert!(!text.contains("\\\\"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn artifact_names_cover_outputs_and_legacy() {
        let names = Corpus::standard().artifact_names();
        assert!(names.contains(&"sample_xlarge.png".to_string()));
        assert!(names.contains(&"demo_output_small.png".to_string()));
        assert!(names.contains(&"demo_extracted_capacity_overflow.bin".to_string()));
        assert!(names.contains(&"test_output.png".to_string()));
        assert!(!names.contains(&"demo_cover.png".to_string()));
    }
}
