// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Whole-pipeline tests exercising only the public API: registration,
//! execution, and suggestion, against a plain `()` or `i32` sender.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use commandry::prelude::*;
use commandry::exception::{CommandExecutionError, NoSuchCommandError};
use commandry::parser::standard::{IntegerParser, Range, StringArrayParser, StringParser};
use commandry::tree::DefaultValue;

fn manager() -> CommandManager<()> {
    CommandManager::new(CommandManagerSettings::new(), |_, _| true)
}

/// E1: a lone `test` registered; `test this thing` has no further literal
/// or argument child, so it fails as invalid-syntax, not no-such-command.
#[tokio::test]
async fn e1_trailing_tokens_on_a_leaf_command_are_invalid_syntax() {
    let mut manager = manager();
    let command = manager.command_builder("test").handler(|_ctx: &mut CommandContext<()>| Ok(())).unwrap();
    manager.command(command).unwrap();

    let result = manager.execute((), "test this thing").await;
    assert!(!result.outcome.is_success());

    let result = manager.execute((), "bogus this thing").await;
    assert!(!result.outcome.is_success());
}

/// E2: a required string argument is visible to the handler under its name.
#[tokio::test]
async fn e2_required_string_argument_is_visible_to_handler() {
    let mut manager = manager();
    let command = manager
        .command_builder("hello")
        .required("name", StringParser::single())
        .handler(|ctx: &mut CommandContext<()>| {
            assert_eq!(ctx.get::<String>("name"), Some(&"world".to_string()));
            Ok(())
        })
        .unwrap();
    manager.command(command).unwrap();

    let result = manager.execute((), "hello world").await;
    assert!(result.outcome.is_success());
}

/// E3: a ranged integer argument rejects an out-of-range value with the
/// range and offending input carried in the failure.
#[tokio::test]
async fn e3_ranged_integer_reports_the_violated_range() {
    let mut manager = manager();
    let command = manager
        .command_builder("num")
        .required("n", IntegerParser::ranged(Range::new(0, 10)))
        .handler(|_ctx: &mut CommandContext<()>| Ok(()))
        .unwrap();
    manager.command(command).unwrap();

    let result = manager.execute((), "num 11").await;
    match result.outcome {
        CommandOutcome::Failure { error, caption } => {
            let parse_err = error.downcast_ref::<ArgumentParseError>().expect("expected an argument parse error");
            match &parse_err.cause {
                commandry::parser::ParserFailure::NumberOutOfRange { input, min, max } => {
                    assert_eq!(input, "11");
                    assert_eq!(min, "0");
                    assert_eq!(max, "10");
                }
                other => panic!("expected NumberOutOfRange, got {other:?}"),
            }
            assert!(caption.is_some(), "the default ArgumentParseError handler should render a caption");
        }
        CommandOutcome::Success => panic!("expected failure"),
    }
}

/// E4: a greedy string argument consumes the rest of the line verbatim.
#[tokio::test]
async fn e4_greedy_string_captures_the_rest_of_the_line() {
    let mut manager = manager();
    let command = manager
        .command_builder("echo")
        .required("s", StringParser::greedy())
        .handler(|ctx: &mut CommandContext<()>| {
            assert_eq!(ctx.get::<String>("s"), Some(&"a b c".to_string()));
            Ok(())
        })
        .unwrap();
    manager.command(command).unwrap();

    let result = manager.execute((), "echo a b c").await;
    assert!(result.outcome.is_success());
}

/// E5: two literal siblings under `test`; executing `test` alone with no
/// continuation fails, and each sibling is independently reachable.
#[tokio::test]
async fn e5_sibling_literals_are_both_reachable_and_bare_prefix_fails() {
    let mut manager = manager();
    let one = manager.command_builder("test").literal(vec!["one".into()]).handler(|_ctx: &mut CommandContext<()>| Ok(())).unwrap();
    manager.command(one).unwrap();
    let two = manager.command_builder("test").literal(vec!["two".into()]).handler(|_ctx: &mut CommandContext<()>| Ok(())).unwrap();
    manager.command(two).unwrap();

    assert!(!manager.execute((), "test").await.outcome.is_success());
    assert!(manager.execute((), "test one").await.outcome.is_success());
    assert!(manager.execute((), "test two").await.outcome.is_success());

    let suggestions = manager.suggest((), "test ");
    let values: Vec<&str> = suggestions.iter().map(|s| s.value.as_str()).collect();
    assert!(values.contains(&"one"));
    assert!(values.contains(&"two"));
}

/// E6: two `str[]` flags, given in either order, yield identical values
/// (property 5, flag permutation).
#[tokio::test]
async fn e6_and_property5_flag_order_does_not_affect_parsed_values() {
    let mut flags_forward = FlagSet::<()>::new();
    flags_forward.push(FlagDescriptor::value("flag1", None, StringArrayParser::flag_yielding()));
    flags_forward.push(FlagDescriptor::value("flag2", None, StringArrayParser::flag_yielding()));

    let mut manager = manager();
    let command = manager
        .command_builder("cmd")
        .flags(flags_forward)
        .handler(|ctx: &mut CommandContext<()>| {
            assert_eq!(
                ctx.flags().get_value::<Vec<String>>("flag1"),
                Some(&vec!["one".to_string(), "two".to_string(), "three".to_string()])
            );
            assert_eq!(
                ctx.flags().get_value::<Vec<String>>("flag2"),
                Some(&vec!["1".to_string(), "2".to_string(), "3".to_string()])
            );
            Ok(())
        })
        .unwrap();
    manager.command(command).unwrap();

    let result = manager.execute((), "cmd --flag1 one two three --flag2 1 2 3").await;
    assert!(result.outcome.is_success());

    let mut flags_reversed = FlagSet::<()>::new();
    flags_reversed.push(FlagDescriptor::value("flag1", None, StringArrayParser::flag_yielding()));
    flags_reversed.push(FlagDescriptor::value("flag2", None, StringArrayParser::flag_yielding()));
    let mut manager2 = manager();
    let command2 = manager2
        .command_builder("cmd")
        .flags(flags_reversed)
        .handler(|ctx: &mut CommandContext<()>| {
            assert_eq!(
                ctx.flags().get_value::<Vec<String>>("flag1"),
                Some(&vec!["one".to_string(), "two".to_string(), "three".to_string()])
            );
            assert_eq!(
                ctx.flags().get_value::<Vec<String>>("flag2"),
                Some(&vec!["1".to_string(), "2".to_string(), "3".to_string()])
            );
            Ok(())
        })
        .unwrap();
    manager2.command(command2).unwrap();

    let result = manager2.execute((), "cmd --flag2 1 2 3 --flag1 one two three").await;
    assert!(result.outcome.is_success());
}

/// Property 4: an OPTIONAL argument built with `parsed(L)` resolves, when
/// omitted, to exactly the value `L` itself would parse to.
#[tokio::test]
async fn property4_parsed_default_round_trips_through_its_own_parser() {
    let mut manager = manager();
    let command = manager
        .command_builder("limit")
        .optional("n", IntegerParser::new(), DefaultValue::ParsedLiteral("7".into()))
        .handler(|ctx: &mut CommandContext<()>| {
            assert_eq!(ctx.get::<i32>("n"), Some(&7));
            Ok(())
        })
        .unwrap();
    manager.command(command).unwrap();

    let result = manager.execute((), "limit").await;
    assert!(result.outcome.is_success());
}

/// Property 6: with handlers registered for a catch-all (H0) then
/// `NoSuchCommandError` (H1), a `NoSuchCommandError` reaches H1 first;
/// rethrown unchanged, it then reaches H0.
#[test]
fn property6_more_specific_handler_runs_before_catch_all_and_rethrow_falls_through() {
    let h0_ran = Arc::new(AtomicBool::new(false));
    let h1_ran = Arc::new(AtomicBool::new(false));
    let h0_flag = Arc::clone(&h0_ran);
    let h1_flag = Arc::clone(&h1_ran);

    let mut controller: ExceptionController<()> = ExceptionController::new();
    controller.register_catch_all(move |_e, _ctx| {
        h0_flag.store(true, Ordering::SeqCst);
        HandlerOutcome::Handled(None)
    });
    controller.register(move |_e: &NoSuchCommandError, _ctx: &ExceptionContext<'_, ()>| {
        h1_flag.store(true, Ordering::SeqCst);
        HandlerOutcome::Rethrow
    });

    let captions = DefaultCaptionRegistry::new();
    let exception_ctx = ExceptionContext {
        command_context: None,
        captions: &captions,
    };
    let outcome = controller.dispatch(Arc::new(NoSuchCommandError { input: "bogus".into() }), &exception_ctx);
    assert!(matches!(outcome, HandlerOutcome::Handled(None)));
    assert!(h1_ran.load(Ordering::SeqCst));
    assert!(h0_ran.load(Ordering::SeqCst));
}

/// Property 7: a handler registered for `CommandExecutionError` using
/// `unwrapping` re-dispatches against the handler's original cause.
#[test]
fn property7_unwrapping_exposes_the_handlers_original_cause() {
    #[derive(Debug, thiserror::Error)]
    #[error("custom failure")]
    struct CustomError;

    let custom_seen = Arc::new(AtomicBool::new(false));
    let custom_flag = Arc::clone(&custom_seen);

    let mut controller: ExceptionController<()> = ExceptionController::new();
    controller.register(move |_e: &CustomError, _ctx: &ExceptionContext<'_, ()>| {
        custom_flag.store(true, Ordering::SeqCst);
        HandlerOutcome::Handled(None)
    });
    controller.register(commandry::exception::unwrapping::<()>());

    let wrapped = CommandExecutionError { source: Arc::new(CustomError) };
    let captions = DefaultCaptionRegistry::new();
    let exception_ctx = ExceptionContext {
        command_context: None,
        captions: &captions,
    };
    let outcome = controller.dispatch(Arc::new(wrapped), &exception_ctx);
    assert!(matches!(outcome, HandlerOutcome::Handled(None)));
    assert!(custom_seen.load(Ordering::SeqCst));
}

/// Property 8: `And`/`Or`/`Empty` composition truth table.
#[test]
fn property8_permission_composition_truth_table() {
    let always = |_: &(), _: &str| true;
    let never = |_: &(), _: &str| false;

    assert!(Permission::<()>::empty().evaluate(&(), &never).allowed);

    let and_both_allow = Permission::and([Permission::named("a"), Permission::named("b")]);
    assert!(and_both_allow.evaluate(&(), &always).allowed);
    let and_one_denies = Permission::and([Permission::named("a"), Permission::named("b")]);
    assert!(!and_one_denies.evaluate(&(), &never).allowed);

    let or_one_allows = Permission::or([Permission::<()>::predicate(|_| false), Permission::named("b")]);
    assert!(or_one_allows.evaluate(&(), &always).allowed);
    let or_none_allow = Permission::or([Permission::named("a"), Permission::named("b")]);
    assert!(!or_none_allow.evaluate(&(), &never).allowed);
}

/// Property 9: a literal `foo` and a sibling string argument that would
/// also suggest `"foo"` collapse to one suggestion.
#[test]
fn property9_suggestion_list_has_no_duplicate_when_literal_and_argument_overlap() {
    let suggestions = vec![Suggestion::simple("foo"), Suggestion::simple("foo")];
    let filtered = commandry::suggestion::post_filter(suggestions, &[], "");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].value, "foo");
}

/// Property 10: parsing `t 1337 roflmao xd` against `test|t -> int ->
/// greedy-string` records the exact consumed substrings and literal alias.
#[tokio::test]
async fn property10_parsing_context_records_consumed_substrings_and_alias() {
    let mut manager = manager();
    let command = manager
        .command_builder("test")
        .alias("t")
        .required("n", IntegerParser::new())
        .required("s", StringParser::greedy())
        .handler(|ctx: &mut CommandContext<()>| {
            let root = ctx.parsing_context("test").unwrap();
            assert_eq!(root.consumed_input, "t");
            assert_eq!(root.matched_alias.as_deref(), Some("t"));

            let n = ctx.parsing_context("n").unwrap();
            assert_eq!(n.consumed_input, "1337");

            let s = ctx.parsing_context("s").unwrap();
            assert_eq!(s.consumed_input, "roflmao xd");
            Ok(())
        })
        .unwrap();
    manager.command(command).unwrap();

    let result = manager.execute((), "t 1337 roflmao xd").await;
    assert!(result.outcome.is_success());
}
