use crate::convert::RewriteResult;
use crate::init_subscriber;
use crate::ir::GuardedOperation;
use crate::ir::Operation;
use crate::parser::DefaultParserDispatch;
use crate::parser::Parser;
use crate::shared::Shared;
use crate::shared::SharedExt;
use crate::transform;
use crate::DefaultTransformDispatch;
use crate::PassOptions;
use crate::Passes;
use std::cmp::max;
use std::panic::Location;
use std::sync::Arc;
use tracing::info;

pub struct Tester;

impl Tester {
    /// Initialize the subscriber for the tests.
    ///
    /// Cannot pass options, since the tests run concurrently.
    pub fn init_tracing() {
        let level = tracing::Level::INFO;
        match init_subscriber(level) {
            Ok(_) => (),
            Err(_e) => (),
        }
    }
    fn point_to_missing_line(expected: &str, index: usize) -> String {
        let mut result = String::new();
        result.push_str("A line is missing from the output:\n");
        result.push_str("```");
        for (i, line) in expected.lines().enumerate() {
            if i == index {
                let msg = format!("{line}   <== missing");
                result.push_str(&format!("\n{msg}"));
            } else {
                result.push_str(&format!("\n{line}"));
            }
        }
        result.push_str("\n```");
        result
    }
    pub fn check_lines_exact(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual = actual.trim();
        let expected = expected.trim();
        let l = max(actual.lines().count(), expected.lines().count());
        for i in 0..l {
            let actual_line = match actual.lines().nth(i) {
                Some(line) => line,
                None => panic!("Output line {i} is missing: called from {caller}"),
            };
            let expected_line = match expected.lines().nth(i) {
                Some(line) => line,
                None => panic!("Output has unexpected line {i}: called from {caller}"),
            };
            assert_eq!(actual_line, expected_line, "called from {}", caller);
        }
    }
    /// Check whether the expected lines are present in the actual output.
    ///
    /// The actual output may contain additional lines that are not in the
    /// expected output.
    pub fn check_lines_contain(actual: &str, expected: &str, caller: &Location<'_>) {
        let actual = actual.trim();
        let expected = expected.trim();
        let actual_lines = actual.lines().collect::<Vec<&str>>();
        let mut actual_index = 0;
        'outer: for (i, expected_line) in expected.lines().enumerate() {
            let expected_line = expected_line.trim();
            // An empty line would match any line.
            if expected_line.is_empty() {
                continue;
            }
            for (j, actual_line) in actual_lines.iter().enumerate().skip(actual_index) {
                if actual_line.contains(expected_line) {
                    actual_index = j + 1;
                    continue 'outer;
                }
            }
            let msg = Self::point_to_missing_line(expected, i);
            panic!("{msg}\nwhen called from {caller}");
        }
    }
    fn print_heading(msg: &str, src: &str) {
        info!("{msg}:\n```\n{src}\n```\n");
    }
    pub fn parse(src: &str) -> (Shared<Operation>, String) {
        let src = src.trim();
        Self::print_heading("Before parse", src);
        let module = Parser::<DefaultParserDispatch>::parse(src).unwrap();
        let actual = format!("{}", module.rd());
        Self::print_heading("After parse", &actual);
        (module, actual)
    }
    /// Run the passes in `arguments` (such as `--convert-stablehlo-to-mhlo`).
    ///
    /// `--allow-partial-conversion` is picked up as option.
    pub fn transform(arguments: Vec<&str>, src: &str) -> (Shared<Operation>, String) {
        let src = src.trim();
        let module = Parser::<DefaultParserDispatch>::parse(src).unwrap();
        let msg = format!("Before (transform {arguments:?})");
        Self::print_heading(&msg, src);

        for arg in arguments.clone() {
            if arg.starts_with("convert-") {
                panic!("conversion passes should be prefixed with `--convert-`");
            }
        }
        let options = PassOptions {
            allow_partial_conversion: arguments.contains(&"--allow-partial-conversion"),
            print_ir_before_all: false,
        };
        let passes = Passes::from_convert_vec(arguments.clone());
        let result = transform::<DefaultTransformDispatch>(module, &passes, &options).unwrap();
        let new_root_op = match result {
            RewriteResult::Changed(changed_op) => changed_op.0,
            RewriteResult::Unchanged => {
                panic!("Expected changes");
            }
        };
        let actual = format!("{}", new_root_op.rd());
        let msg = format!("After (transform {arguments:?})");
        Self::print_heading(&msg, &actual);
        (new_root_op, actual)
    }
    fn verify_core(op: &Shared<Operation>) {
        let operation = op.rd();
        if !operation.is_module() {
            assert!(
                operation.parent().is_some(),
                "op without parent:\n{}",
                operation
            );
        }
        for result in operation.results() {
            let defining_op = match &*result.rd() {
                crate::ir::Value::OpResult(res) => res.defining_op(),
                crate::ir::Value::BlockArgument(_) => None,
            };
            let points_back = defining_op.map(|defining_op| Arc::ptr_eq(&defining_op, op));
            assert_eq!(
                points_back,
                Some(true),
                "result {} does not point to its op:\n{}",
                result.rd(),
                operation
            );
        }
        for region in operation.regions() {
            let parent = region.rd().parent();
            assert!(
                parent.is_some_and(|parent| Arc::ptr_eq(&parent, op)),
                "region does not point to its op:\n{}",
                operation
            );
        }
    }
    /// Run some extra verification on the IR (usually on a module).
    ///
    /// This catches problems that are not visible in the textual
    /// representation, such as a missing back-pointer from an op to its
    /// parent or from a result to its defining op.
    pub fn verify(op: Shared<Operation>) {
        Self::verify_core(&op);
        for op in op.ops() {
            Self::verify(op);
        }
    }
}
