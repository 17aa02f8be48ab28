// tests/extensions.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::time::Duration;

use termrun::{Terminal, TermrunError};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn registered_extensions_reshape_the_builder() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.extend("patient", |builder| {
        builder.timeout(Duration::from_secs(25))
    });

    let process = terminal
        .builder()
        .command("echo hi")
        .call("patient")?
        .process()?;

    assert_eq!(process.timeout(), Some(Duration::from_secs(25)));
    Ok(())
}

#[test]
fn unknown_extension_names_are_reported() {
    init_tracing();
    let terminal = Terminal::new();

    let err = terminal
        .builder()
        .call("never_registered")
        .expect_err("unregistered names must be rejected");

    assert!(matches!(err, TermrunError::MethodNotFound(_)));
    assert!(err.to_string().contains("never_registered"));
}

#[test]
fn extensions_are_shared_across_context_clones() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    let handle = terminal.clone();
    handle.extend("tagged", |builder| builder.with("tag", "shared"));

    let process = terminal
        .builder()
        .command("deploy {{ $tag }}")
        .call("tagged")?
        .process()?;

    assert_eq!(
        process.env().get("termrun_tag").map(String::as_str),
        Some("shared")
    );
    Ok(())
}

#[test]
fn separate_contexts_have_separate_extensions() {
    init_tracing();
    let configured = Terminal::new();
    configured.extend("present", |builder| builder);

    let other = Terminal::new();
    let err = other
        .builder()
        .call("present")
        .expect_err("extensions must not leak between contexts");
    assert!(matches!(err, TermrunError::MethodNotFound(_)));
}

#[test]
fn re_registering_a_name_replaces_the_extension() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.extend("limit", |builder| builder.timeout(Duration::from_secs(1)));
    terminal.extend("limit", |builder| builder.timeout(Duration::from_secs(9)));

    let process = terminal
        .builder()
        .command("echo hi")
        .call("limit")?
        .process()?;

    assert_eq!(process.timeout(), Some(Duration::from_secs(9)));
    Ok(())
}

#[tokio::test]
async fn extensions_compose_with_fake_execution() -> TestResult {
    init_tracing();
    let terminal = Terminal::new();
    terminal.fake();
    terminal.extend("releasing", |builder| builder.with("channel", "stable"));

    terminal
        .builder()
        .command("publish {{ $channel }}")
        .call("releasing")?
        .execute()
        .await?;

    terminal.assert_executed_matching(
        |captured| captured.bindings.get("channel").map(String::as_str) == Some("stable"),
        1,
    );
    Ok(())
}
