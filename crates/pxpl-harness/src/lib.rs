//! pxpl harness - round-trip verification for the pxpl steganography tool
//!
//! The tool is a black box reached through a subprocess. This crate:
//! - Generates deterministic cover images and payload files
//! - Invokes `embed` / `extract` under a timeout with a fixed exit taxonomy
//! - Verifies byte-exact round trips and alpha preservation
//! - Runs the scenario suite and cleans up every artifact it produced
//!
//! # Example
//!
//! ```rust,ignore
//! use pxpl_harness::{HarnessConfig, TestCycle};
//!
//! # async fn example() -> Result<(), pxpl_harness::HarnessError> {
//! let config = HarnessConfig::new().with_project_root("..");
//! let report = TestCycle::new(config).run().await?;
//!
//! println!("{}", report.render_text());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod build;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod invoker;
pub mod suite;
pub mod telemetry;
pub mod verifier;

pub use build::{BuildDriver, BuildProfile, BuildReport};
pub use cleaner::{ArtifactCleaner, ArtifactManifest};
pub use config::{BuildConfig, HarnessConfig};
pub use error::{BuildError, ConfigError, FixtureError, HarnessError, InvocationError, Result};
pub use fixtures::{
    ColorMode, DemoImage, FixtureBatch, GeneratedFixture, ImageFixtureGenerator, ImageSpec,
    PatternKind, PayloadFixtureGenerator, PayloadSpec,
};
pub use invoker::{InvocationResult, InvocationStatus, ProcessInvoker, ToolExit, ToolInvoker};
pub use suite::{Corpus, CycleReport, ScenarioReport, SuiteResult, SuiteRunner, TestCycle};
pub use verifier::{
    Expectation, OutcomeReason, RoundTripVerifier, Scenario, ScenarioPaths, VerificationOutcome,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the harness
    pub use crate::{
        ArtifactCleaner, ArtifactManifest, Corpus, HarnessConfig, ImageSpec, PayloadSpec,
        RoundTripVerifier, Scenario, SuiteRunner, TestCycle, ToolInvoker,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
