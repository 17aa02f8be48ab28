// tests/fake_terminal.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use termrun::{FakeResponse, OutputLine, Terminal, TermrunError};
use termrun_test_utils::assertions::assert_response;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn unregistered_commands_get_an_empty_successful_response() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake();

    // Would fail loudly if it ever reached a real shell.
    let response = terminal.run("termrun-definitely-not-a-binary --flag").await?;

    assert_response(response).ok().empty();
    terminal.assert_executed("termrun-definitely-not-a-binary --flag", 1);
    Ok(())
}

#[tokio::test]
async fn registered_strings_become_single_line_responses() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake_command("echo hi", "hello");

    let response = terminal.run("echo hi").await?;

    assert_response(response).ok().output("hello").line_count(1);
    Ok(())
}

#[tokio::test]
async fn registered_line_lists_keep_their_order_and_tags() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake_with([
        ("ls", vec!["a.txt", "b.txt"]),
    ]);
    terminal.fake_command(
        "deploy",
        [OutputLine::out("pushed"), OutputLine::err("warned")],
    );

    let listing = terminal.run("ls").await?;
    assert_response(listing).ok().output("a.txt\nb.txt").line_count(2);

    let deploy = terminal.run("deploy").await?;
    assert_eq!(deploy.output(), "pushed");
    assert_eq!(deploy.error_output(), "warned");
    Ok(())
}

#[tokio::test]
async fn canned_failures_flow_through_throw() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake_command(
        "broken",
        FakeResponse::new().line("nope").should_fail(),
    );

    let response = terminal.run("broken").await?;
    assert!(!response.successful());
    assert_eq!(response.exit_code(), Some(1));

    let err = response.throw().expect_err("a failed response must throw");
    match err {
        TermrunError::ProcessFailed { process } => {
            assert_eq!(process.command_line(), "broken");
            assert_eq!(process.output(), "nope");
        }
        other => panic!("expected ProcessFailed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn custom_responses_are_returned_as_registered() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();

    let custom = FakeResponse::new()
        .line("done")
        .command("internal-name")
        .build();
    terminal.fake_command("make release", custom);

    let response = terminal.run("make release").await?;
    assert_eq!(response.output(), "done");
    // A custom response keeps its own synthetic process identity.
    assert_eq!(response.process().command_line(), "internal-name");
    Ok(())
}

#[tokio::test]
async fn argv_and_string_forms_share_one_registry_key() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake_command(vec!["rm", "-rf", "vendor"], "gone");

    let response = terminal.run("rm -rf vendor").await?;
    assert_response(response).ok().output("gone");

    // Assertions accept either form as well.
    terminal.assert_executed(vec!["rm", "-rf", "vendor"], 1);
    terminal.assert_executed("rm -rf vendor", 1);
    Ok(())
}

#[tokio::test]
async fn execution_counts_are_asserted_exactly() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake();

    terminal.run("echo hi").await?;
    terminal.run("echo hi").await?;
    terminal.run("echo other").await?;

    terminal.assert_executed("echo hi", 2);
    terminal.assert_executed("echo other", 1);
    terminal.assert_not_executed("echo never");

    let failure = catch_unwind(AssertUnwindSafe(|| {
        terminal.assert_executed("echo hi", 5);
    }))
    .expect_err("a wrong count must panic");
    let message = failure
        .downcast_ref::<String>()
        .expect("assertion panics carry a formatted message");
    assert!(
        message.contains("was executed 2 times instead of the expected 5 times"),
        "unexpected assertion message: {message}"
    );
    Ok(())
}

#[tokio::test]
async fn predicates_see_the_full_captured_configuration() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake();

    terminal
        .builder()
        .with("tag", "v1.2.3")
        .in_dir("/srv/app")
        .env_clear()
        .input("y\n")
        .timeout(Duration::from_secs(120))
        .run("git checkout {{ $tag }}")
        .await?;

    terminal.assert_executed_matching(
        |captured| {
            captured.rendered == "git checkout {{ $tag }}"
                && captured.bindings.get("tag").map(String::as_str) == Some("v1.2.3")
                && captured.cwd.as_deref() == Some(std::path::Path::new("/srv/app"))
                && captured.env_clear
                && captured.input.as_deref() == Some(b"y\n".as_slice())
                && captured.timeout == Some(Duration::from_secs(120))
                && !captured.background
        },
        1,
    );
    terminal.assert_executed_matching(|captured| captured.background, 0);
    // Executions that differ only in stdin payload or isolation stay
    // distinguishable.
    terminal.assert_executed_matching(|captured| captured.input.is_none(), 0);
    terminal.assert_executed_matching(|captured| !captured.env_clear, 0);
    Ok(())
}

#[tokio::test]
async fn reset_returns_to_live_execution_with_a_clean_slate() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake_command("echo hi", "hello");

    terminal.run("echo hi").await?;
    assert_eq!(terminal.captured().len(), 1);

    terminal.reset();

    assert!(!terminal.is_faking());
    assert!(terminal.captured().is_empty());
    // Previous captures are invisible once the fake state is gone.
    terminal.assert_not_executed("echo hi");

    // Faking again starts from an empty registry, so the old canned
    // response is no longer matched.
    terminal.fake();
    let response = terminal.run("echo hi").await?;
    assert_response(response).ok().empty();
    Ok(())
}

#[tokio::test]
async fn contexts_are_isolated_from_each_other() -> TestResult {
    init_tracing();
    let faked = Terminal::new();
    let untouched = Terminal::new();
    faked.fake_command("echo hi", "hello");
    untouched.fake();

    faked.run("echo hi").await?;

    faked.assert_executed("echo hi", 1);
    untouched.assert_not_executed("echo hi");
    assert!(untouched.captured().is_empty());
    Ok(())
}

#[tokio::test]
async fn clones_share_their_context_state() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    let handle = terminal.clone();
    terminal.fake_command("echo hi", "hello");

    // The code under test runs through the clone; the original asserts.
    let response = handle.run("echo hi").await?;
    assert_eq!(response.output(), "hello");
    terminal.assert_executed("echo hi", 1);
    assert!(handle.is_faking());
    Ok(())
}

#[tokio::test]
async fn fake_failures_drive_the_retry_loop() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake_command("flaky", FakeResponse::new().should_fail());

    let err = terminal
        .builder()
        .retries(3, Duration::from_millis(1))
        .run("flaky")
        .await
        .expect_err("a canned failure must exhaust its retries");

    assert!(matches!(err, TermrunError::ProcessFailed { .. }));
    terminal.assert_executed("flaky", 3);
    Ok(())
}

#[tokio::test]
async fn repeated_hits_get_independent_canned_responses() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake_command("tail", vec!["one", "two"]);

    let first = terminal.run("tail").await?;
    assert_eq!(first.new_lines().len(), 2);
    assert_eq!(first.new_lines().len(), 0);

    // A second execution is backed by a fresh synthetic process, so its
    // line cursor starts over.
    let second = terminal.run("tail").await?;
    assert_eq!(second.new_lines().len(), 2);
    Ok(())
}

#[test]
fn live_contexts_count_zero_captures() {
    init_tracing();
    let terminal = Terminal::new();

    // Nothing is captured outside fake mode, so the zero-count assertion
    // holds and any nonzero expectation fails.
    terminal.assert_not_executed("echo hi");

    let failure = catch_unwind(AssertUnwindSafe(|| {
        terminal.assert_executed("echo hi", 1);
    }))
    .expect_err("a nonzero expectation must fail on a live context");
    let message = failure
        .downcast_ref::<String>()
        .expect("assertion panics carry a formatted message");
    assert!(
        message.contains("was executed 0 times instead of the expected 1 times"),
        "unexpected assertion message: {message}"
    );
}
