// tests/template_props.rs

//! Property tests for placeholder compilation.
//!
//! Values bound with `with` must never be spliced into the command text;
//! they travel through prefixed environment variables and a quoted shell
//! expansion, so arbitrary values cannot change the command's structure.

mod common;
use crate::common::init_tracing;

use proptest::prelude::*;
use termrun::Terminal;

proptest! {
    #[test]
    fn placeholders_compile_to_quoted_expansions(
        name in "[a-z][a-z0-9_]{0,8}",
        value in "[ -~]{0,40}",
    ) {
        init_tracing();
        let line = format!("deploy {{{{ ${name} }}}}");
        let process = Terminal::new()
            .builder()
            .command(line)
            .with(name.as_str(), &value)
            .process()
            .expect("compilation succeeds");

        prop_assert_eq!(
            process.command_line(),
            format!("deploy \"${{termrun_{}}}\"", name)
        );
        let env = process.env();
        prop_assert_eq!(
            env.get(&format!("termrun_{name}")),
            Some(&value)
        );
    }

    #[test]
    fn brace_padding_does_not_change_compilation(
        name in "[a-z][a-z0-9_]{0,8}",
        left in 0usize..4,
        right in 0usize..4,
    ) {
        init_tracing();
        let lpad = " ".repeat(left);
        let rpad = " ".repeat(right);
        let line = format!("echo {{{{{lpad}${name}{rpad}}}}}");
        let process = Terminal::new()
            .builder()
            .command(line)
            .with(name.as_str(), "padded")
            .process()
            .expect("compilation succeeds");

        prop_assert_eq!(
            process.command_line(),
            format!("echo \"${{termrun_{}}}\"", name)
        );
    }

    #[test]
    fn unbound_names_always_get_an_empty_variable(
        name in "[a-z][a-z0-9_]{0,8}",
    ) {
        init_tracing();
        let process = Terminal::new()
            .builder()
            .command(format!("echo {{{{ ${name} }}}}"))
            .process()
            .expect("compilation succeeds");

        let env = process.env();
        prop_assert_eq!(
            env.get(&format!("termrun_{name}")).map(String::as_str),
            Some("")
        );
    }

    #[test]
    fn argv_commands_pass_through_compilation_untouched(
        words in proptest::collection::vec("[A-Za-z0-9_]{1,12}", 1..5),
    ) {
        init_tracing();
        let process = Terminal::new()
            .builder()
            .command(words.clone())
            .with("unused", "binding")
            .process()
            .expect("compilation succeeds");

        prop_assert_eq!(process.command_line(), words.join(" "));
        prop_assert!(process.env().is_empty());
    }
}

proptest! {
    // Each case spawns a real shell, so keep the sample small.
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn bound_values_round_trip_through_a_real_shell(value in "[ -~]{1,40}") {
        init_tracing();
        let runtime = tokio::runtime::Runtime::new().expect("runtime starts");
        let response = runtime
            .block_on(
                Terminal::new()
                    .builder()
                    .with("v", &value)
                    .run("printf %s {{ $v }}"),
            )
            .expect("printf run succeeds");

        prop_assert!(response.successful());
        prop_assert_eq!(response.output(), value);
    }
}
