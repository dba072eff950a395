//! Round-trip verification against the in-process stub tool

use std::sync::Arc;

use pretty_assertions::assert_eq;
use pxpl_harness::invoker::{EMBED, EXTRACT};
use pxpl_harness::suite::overflow_payload;
use pxpl_harness::{
    Corpus, Expectation, OutcomeReason, PayloadSpec, Scenario, SuiteRunner, TestCycle, ToolExit,
};
use pxpl_test_utils::{
    max_payload_len, radial_cover, rgb_cover, rgba_cover, small_scenario, stub, LsbStubTool,
    TestWorkspace,
};

#[tokio::test]
async fn small_rgb_cover_round_trips_hi_mom() {
    let ws = TestWorkspace::new();
    let scenario = small_scenario();
    ws.materialize(&scenario);
    let tool = stub();

    let outcome = ws.verifier(tool.clone()).verify(&scenario).await;

    assert!(outcome.passed, "{outcome:?}");
    assert_eq!(outcome.reason, OutcomeReason::RoundTripOk);
    assert_eq!(outcome.original_len, Some(6));
    assert_eq!(outcome.extracted_len, Some(6));
    assert_eq!(tool.count(EMBED), 1);
    assert_eq!(tool.count(EXTRACT), 1);
    assert_eq!(
        std::fs::read(ws.join("demo_extracted_small.bin")).unwrap(),
        b"Hi mom"
    );
}

#[tokio::test]
async fn rgba_cover_keeps_alpha() {
    let ws = TestWorkspace::new();
    let medium = Corpus::standard().payloads[1].clone();
    assert_eq!(medium.name, "medium_payload.txt");
    let scenario = Scenario::new(
        "RGBA LSB Integrity",
        rgba_cover("sample_rgba.png", 100, 100),
        medium.clone(),
    )
    .with_alpha_check();
    ws.materialize(&scenario);

    let outcome = ws.verifier(stub()).verify(&scenario).await;

    assert!(outcome.passed, "{outcome:?}");
    assert_eq!(outcome.alpha_preserved, Some(true));
    assert_eq!(outcome.original_len, Some(medium.len()));
    assert_eq!(
        std::fs::read(ws.join("demo_extracted_rgba_lsb_integrity.bin")).unwrap(),
        medium.content
    );
}

#[tokio::test]
async fn alpha_loss_fails_before_extract() {
    let ws = TestWorkspace::new();
    let scenario = Scenario::new(
        "RGBA Alpha",
        rgba_cover("sample_rgba.png", 100, 100),
        PayloadSpec::text("small_payload.txt", "Hi mom"),
    )
    .with_alpha_check();
    ws.materialize(&scenario);
    let tool = Arc::new(LsbStubTool::new().with_dropped_alpha());

    let outcome = ws.verifier(tool.clone()).verify(&scenario).await;

    assert!(!outcome.passed);
    assert_eq!(outcome.reason, OutcomeReason::AlphaLost);
    assert_eq!(outcome.alpha_preserved, Some(false));
    assert_eq!(tool.count(EXTRACT), 0);
}

#[tokio::test]
async fn rgb_cover_skips_alpha_verdict() {
    let ws = TestWorkspace::new();
    let scenario = small_scenario().with_alpha_check();
    ws.materialize(&scenario);

    let outcome = ws.verifier(stub()).verify(&scenario).await;

    assert!(outcome.passed);
    assert_eq!(outcome.alpha_preserved, None);
}

#[tokio::test]
async fn radial_cover_carries_full_byte_range() {
    let ws = TestWorkspace::new();
    let scenario = Scenario::new(
        "Binary Payload",
        radial_cover("sample_large.png", 300, 300),
        PayloadSpec::byte_range("binary_payload.bin", 500),
    );
    ws.materialize(&scenario);

    let outcome = ws.verifier(stub()).verify(&scenario).await;

    assert!(outcome.passed, "{outcome:?}");
    assert_eq!(outcome.original_len, Some(500));
}

#[tokio::test]
async fn corrupted_byte_reports_offset() {
    let ws = TestWorkspace::new();
    let scenario = small_scenario();
    ws.materialize(&scenario);
    let tool = Arc::new(LsbStubTool::new().with_corrupted_byte(2));

    let outcome = ws.verifier(tool).verify(&scenario).await;

    assert!(!outcome.passed);
    assert_eq!(outcome.reason, OutcomeReason::ContentMismatch);
    assert_eq!(outcome.mismatch_offset, Some(2));
    assert_eq!(outcome.original_len, outcome.extracted_len);
}

#[tokio::test]
async fn truncated_payload_reports_lengths() {
    let ws = TestWorkspace::new();
    let scenario = small_scenario();
    ws.materialize(&scenario);
    let tool = Arc::new(LsbStubTool::new().with_truncation(3));

    let outcome = ws.verifier(tool).verify(&scenario).await;

    assert_eq!(outcome.reason, OutcomeReason::ContentMismatch);
    assert_eq!(outcome.mismatch_offset, None);
    assert_eq!(outcome.original_len, Some(6));
    assert_eq!(outcome.extracted_len, Some(3));
}

#[tokio::test]
async fn missing_extract_output_is_extract_failure() {
    let ws = TestWorkspace::new();
    let scenario = small_scenario();
    ws.materialize(&scenario);
    let tool = Arc::new(LsbStubTool::new().skipping_output(EXTRACT));

    let outcome = ws.verifier(tool).verify(&scenario).await;

    assert_eq!(outcome.reason, OutcomeReason::ExtractFailed);
    assert!(outcome.tool_exit.is_none());
}

#[tokio::test]
async fn tool_failure_is_classified() {
    let ws = TestWorkspace::new();
    let scenario = small_scenario();
    ws.materialize(&scenario);
    let tool = Arc::new(LsbStubTool::new().failing(EMBED, 2));

    let outcome = ws.verifier(tool.clone()).verify(&scenario).await;

    assert_eq!(outcome.reason, OutcomeReason::EmbedFailed);
    assert_eq!(outcome.tool_exit, Some(ToolExit::UnsupportedImage));
    assert_eq!(tool.count(EXTRACT), 0);
}

#[tokio::test]
async fn overflow_is_rejected_with_capacity_exit() {
    let ws = TestWorkspace::new();
    let cover = rgb_cover("sample_small.png", 50, 50);
    let scenario = Scenario::new("Capacity Overflow", cover.clone(), overflow_payload(&cover))
        .expecting_rejection(ToolExit::CapacityExceeded);
    ws.materialize(&scenario);

    let outcome = ws.verifier(stub()).verify(&scenario).await;

    assert!(!outcome.passed);
    assert_eq!(outcome.tool_exit, Some(ToolExit::CapacityExceeded));
    assert!(scenario.expectation.is_met(&outcome));
    assert!(!ws.join("demo_output_capacity_overflow.png").exists());
}

#[tokio::test]
async fn largest_fitting_payload_round_trips() {
    let ws = TestWorkspace::new();
    let len = usize::try_from(max_payload_len(50 * 50)).unwrap();
    assert_eq!(len, 933);
    let scenario = Scenario::new(
        "Edge",
        rgb_cover("sample_small.png", 50, 50),
        PayloadSpec::filler("edge_payload.bin", len),
    );
    ws.materialize(&scenario);

    let outcome = ws.verifier(stub()).verify(&scenario).await;

    assert!(outcome.passed, "{outcome:?}");
    assert_eq!(outcome.extracted_len, Some(933));
}

#[tokio::test]
async fn one_byte_past_capacity_is_rejected() {
    let ws = TestWorkspace::new();
    let len = usize::try_from(max_payload_len(50 * 50)).unwrap() + 1;
    let scenario = Scenario::new(
        "Past Edge",
        rgb_cover("sample_small.png", 50, 50),
        PayloadSpec::filler("edge_payload.bin", len),
    );
    ws.materialize(&scenario);
    let tool = stub();

    let outcome = ws.verifier(tool.clone()).verify(&scenario).await;

    assert_eq!(outcome.reason, OutcomeReason::EmbedFailed);
    assert_eq!(outcome.tool_exit, Some(ToolExit::CapacityExceeded));
    assert_eq!(tool.count(EXTRACT), 0);
}

#[tokio::test]
async fn suite_continues_after_capacity_failure() {
    let ws = TestWorkspace::new();
    let cover = rgb_cover("sample_small.png", 50, 50);
    let overflow = Scenario::new("Too Big", cover.clone(), overflow_payload(&cover));
    let small = small_scenario();
    ws.materialize(&overflow);
    ws.materialize(&small);

    let mut runner = SuiteRunner::new(ws.verifier(stub()));
    let result = runner.run(&[overflow, small]).await;

    assert_eq!(result.total_count, 2);
    assert_eq!(result.passed_count, 1);
    assert!(!result.succeeded());
    assert!(!result.reports[0].met);
    assert_eq!(result.reports[0].expectation, Expectation::RoundTrip);
    assert!(result.reports[1].met);
    assert!(result.render_text().contains("Passed: 1/2 tests"));
}

#[tokio::test]
async fn full_cycle_passes_and_leaves_work_dir_clean() {
    let ws = TestWorkspace::new();
    ws.write("unrelated.txt", b"keep me");
    let tool = stub();

    let report = TestCycle::new(ws.config().clone())
        .with_invoker(tool.clone())
        .run()
        .await
        .unwrap();

    let corpus = Corpus::standard();
    assert!(report.succeeded(), "{}", report.render_text());
    assert_eq!(report.suite.total_count, corpus.scenarios.len());
    assert_eq!(report.fixtures_created, corpus.images.len() + corpus.payloads.len());
    assert!(report.fixtures_skipped.is_empty());
    assert!(report.files_removed > report.fixtures_created);
    assert_eq!(ws.file_names(), ["unrelated.txt"]);

    // the overflow scenario never reaches extract
    assert_eq!(tool.count(EMBED), corpus.scenarios.len());
    assert_eq!(tool.count(EXTRACT), corpus.scenarios.len() - 1);

    assert_eq!(report.fixture_digests.len(), report.fixtures_created);
    assert!(report
        .fixture_digests
        .values()
        .all(|d| d.len() == 64 && d.bytes().all(|b| b.is_ascii_hexdigit())));
    assert!(report.fixture_digests.contains_key("sample_rgba.png"));

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"passed_count\":11"));
}

#[tokio::test]
async fn separate_cycles_generate_identical_fixtures() {
    let mut digests = Vec::new();
    for _ in 0..2 {
        let ws = TestWorkspace::new();
        let cycle = TestCycle::new(ws.config().clone()).with_invoker(stub());
        digests.push(cycle.run().await.unwrap().fixture_digests);
    }

    assert!(!digests[0].is_empty());
    assert_eq!(digests[0], digests[1]);
}

#[tokio::test]
async fn failing_cycle_still_cleans_up() {
    let ws = TestWorkspace::new();
    let tool = Arc::new(LsbStubTool::new().failing(EXTRACT, 4));

    let report = TestCycle::new(ws.config().clone())
        .with_invoker(tool)
        .run()
        .await
        .unwrap();

    assert!(!report.succeeded());
    // only the rejection scenario meets its expectation
    assert_eq!(report.suite.passed_count, 1);
    assert!(ws.file_names().is_empty());
}
