use crate::convert::ConvertStablehloToMhlo;
use crate::convert::Pass;
use crate::convert::RewriteResult;
use crate::ir::Operation;
use crate::shared::Shared;
use crate::shared::SharedExt;
use anyhow::Result;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use std::env::ArgsOs;
use std::fmt;
use std::fmt::Display;
use tracing::info;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;

/// A transformation pass (e.g., `--convert-stablehlo-to-mhlo`).
pub struct SinglePass {
    pass: String,
}

impl Display for SinglePass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pass)
    }
}

impl SinglePass {
    pub fn new(pass: &str) -> SinglePass {
        let pass = pass.strip_prefix("--").unwrap_or(pass);
        SinglePass {
            pass: pass.to_string(),
        }
    }
}

/// A collection of [SinglePass]es.
pub struct Passes {
    passes: Vec<SinglePass>,
}

impl Display for Passes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.passes
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<String>>()
                .join(" ")
        )
    }
}

impl Passes {
    pub fn from_vec(passes: Vec<&str>) -> Passes {
        Passes {
            passes: passes.iter().map(|p| SinglePass::new(p)).collect(),
        }
    }
    pub fn from_convert_vec(args: Vec<&str>) -> Passes {
        let passes = args
            .into_iter()
            .filter(|arg| arg.starts_with("--convert-"))
            .collect();
        Passes::from_vec(passes)
    }
    /// Extract passes (starting with `--convert-`) from the given args.
    pub fn from_convert_args(args: ArgsOs) -> Passes {
        let mut passes = vec![];
        for arg in args {
            let arg = arg.to_string_lossy();
            if arg.starts_with("--convert-") {
                passes.push(SinglePass::new(&arg));
            }
        }
        Passes { passes }
    }
    pub fn vec(&self) -> &Vec<SinglePass> {
        &self.passes
    }
}

/// Options that apply to all passes in a pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassOptions {
    /// Keep operations that could not be legalized instead of failing.
    pub allow_partial_conversion: bool,
    /// Log the IR before each pass.
    pub print_ir_before_all: bool,
}

impl PassOptions {
    /// Read the flags that are declared by [default_arguments].
    pub fn from_matches(matches: &ArgMatches) -> PassOptions {
        PassOptions {
            allow_partial_conversion: matches.get_flag("allow-partial-conversion"),
            print_ir_before_all: matches.get_flag("print-ir-before-all"),
        }
    }
}

/// Interface to add custom passes to the legalizer.
pub trait TransformDispatch {
    fn dispatch(
        op: Shared<Operation>,
        pass: &SinglePass,
        options: &PassOptions,
    ) -> Result<RewriteResult>;
}

/// Default implementation of [TransformDispatch].
///
/// This default implementation knows only the passes that are implemented in
/// this crate.
pub struct DefaultTransformDispatch;

/// Initialize logging with the given level.
pub fn init_subscriber(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_test_writer()
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}

impl TransformDispatch for DefaultTransformDispatch {
    fn dispatch(
        op: Shared<Operation>,
        pass: &SinglePass,
        options: &PassOptions,
    ) -> Result<RewriteResult> {
        let pass = pass.to_string();
        match pass.as_str() {
            ConvertStablehloToMhlo::NAME => ConvertStablehloToMhlo::convert(op, options),
            _ => Err(anyhow::anyhow!("Unknown pass: {}", pass)),
        }
    }
}

/// Default arguments that are available in this crate.
///
/// This includes the passes such as `--convert-stablehlo-to-mhlo` and the
/// flags that end up in [PassOptions]. `--debug` is not included to allow
/// downstream projects to handle the logging differently.
pub fn default_arguments() -> Vec<Arg> {
    vec![
        Arg::new("convert-stablehlo-to-mhlo")
            .long("convert-stablehlo-to-mhlo")
            .help("Legalize StableHLO operations to MHLO")
            .action(ArgAction::SetTrue),
        Arg::new("allow-partial-conversion")
            .long("allow-partial-conversion")
            .help("Keep operations that cannot be legalized instead of failing")
            .action(ArgAction::SetTrue),
        Arg::new("print-ir-before-all")
            .long("print-ir-before-all")
            .help("Print the IR before each pass")
            .action(ArgAction::SetTrue),
    ]
}

/// Transform the given operation via the given passes.
///
/// Passes run in order, each on the root that the previous one returned.
pub fn transform<T: TransformDispatch>(
    op: Shared<Operation>,
    passes: &Passes,
    options: &PassOptions,
) -> Result<RewriteResult> {
    let mut root = op;
    let mut result = RewriteResult::Unchanged;
    for pass in passes.vec() {
        if options.print_ir_before_all {
            info!("// ----- // IR Dump Before {pass} //----- //\n{}", root.rd());
        }
        let new_result = T::dispatch(root.clone(), pass, options)?;
        if let RewriteResult::Changed(changed) = new_result {
            root = changed.0.clone();
            result = RewriteResult::Changed(changed);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Command;

    #[test]
    fn parse_passes() {
        let passes = Passes::from_convert_vec(vec![
            "hlo-opt",
            "--convert-stablehlo-to-mhlo",
            "--print-ir-before-all",
        ]);
        assert_eq!(passes.vec().len(), 1);
        assert_eq!(passes.to_string(), "convert-stablehlo-to-mhlo");
    }

    #[test]
    fn options_from_matches() {
        let cli = Command::new("test").args(default_arguments());
        let matches = cli
            .try_get_matches_from(vec!["test", "--allow-partial-conversion"])
            .unwrap();
        let options = PassOptions::from_matches(&matches);
        assert!(options.allow_partial_conversion);
        assert!(!options.print_ir_before_all);
    }
}
