use anyhow::Result;
use clap::ArgMatches;
use clap::Args;
use clap::Command;
use hlo_legalize::convert::RewriteResult;
use hlo_legalize::parser::DefaultParserDispatch;
use hlo_legalize::parser::Parser;
use hlo_legalize::shared::SharedExt;
use hlo_legalize::transform;
use hlo_legalize::DefaultTransformDispatch;
use hlo_legalize::PassOptions;
use hlo_legalize::Passes;
use std::io::Read;
use tracing::Level;

/// Run legalization passes on StableHLO programs
#[derive(Args, Debug)]
#[command(version, about)]
struct HloOptArgs {
    /// The input file (- is interpreted as stdin)
    #[arg(default_value = "-")]
    input: String,
    /// Print debug logs to stderr
    #[arg(long)]
    debug: bool,
}

fn cli() -> Command {
    let cli = Command::new("hlo-opt").args(hlo_legalize::default_arguments());
    HloOptArgs::augment_args(cli)
}

fn parse_and_transform(src: &str, passes: &Passes, options: &PassOptions) -> Result<String> {
    let module = Parser::<DefaultParserDispatch>::parse(src)?;
    let result = transform::<DefaultTransformDispatch>(module.clone(), passes, options)?;
    let result = match result {
        RewriteResult::Changed(op) => op.0.rd().to_string(),
        RewriteResult::Unchanged => module.rd().to_string(),
    };
    Ok(result)
}

fn read_input(matches: &ArgMatches) -> Result<String> {
    let input = match matches.get_one::<String>("input") {
        Some(input) => input.as_str(),
        None => "-",
    };
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

fn main() -> Result<()> {
    let cli = cli();
    let args = std::env::args_os();
    let passes = Passes::from_convert_args(args);
    let matches = cli.get_matches();

    if matches.get_flag("debug") {
        let level = Level::DEBUG;
        if let Err(e) = hlo_legalize::init_subscriber(level) {
            eprintln!("Failed to initialize logging: {e}");
        }
    }
    let options = PassOptions::from_matches(&matches);
    let input_text = read_input(&matches)?;
    let result = parse_and_transform(&input_text, &passes, &options)?;
    println!("{result}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn run_app(args: Vec<&str>, input_text: &str) -> Result<String> {
        let cli = cli();
        let args_owned: Vec<String> = args.iter().map(|&s| s.to_string()).collect();
        let matches = cli.try_get_matches_from(args_owned)?;
        let options = PassOptions::from_matches(&matches);
        let passes = Passes::from_convert_vec(args);
        parse_and_transform(input_text, &passes, &options)
    }

    #[test]
    fn test_help() {
        let args = vec!["hlo-opt", "--help"];
        let err = match run_app(args, "") {
            Ok(_) => panic!("Expected an error"),
            Err(e) => e,
        };
        let result = err.to_string();
        assert!(result.contains("Usage: hlo-opt"));
        assert!(result.contains("--convert-stablehlo-to-mhlo"));
        assert!(result.contains("--allow-partial-conversion"));
    }

    #[test]
    fn test_invalid_args() {
        let result = run_app(vec!["hlo-opt", "--invalid-flag"], "");
        assert!(result.is_err());
    }

    #[test]
    fn test_convert() {
        let src = indoc! {r#"
        %0 = "stablehlo.constant"() {value = dense<1.0> : tensor<f32>} : () -> tensor<f32>
        %1 = "stablehlo.add"(%0, %0) : (tensor<f32>, tensor<f32>) -> tensor<f32>
        "#};
        let args = vec!["hlo-opt", "--convert-stablehlo-to-mhlo"];
        let result = run_app(args, src).unwrap();
        assert!(result.contains(r#"%1 = "mhlo.add"(%0, %0) : (tensor<f32>, tensor<f32>) -> tensor<f32>"#));
        assert!(!result.contains("stablehlo"));

        // Without passes, the input is printed back.
        let result = run_app(vec!["hlo-opt"], src).unwrap();
        assert!(result.contains(r#""stablehlo.add"(%0, %0)"#));
    }

    #[test]
    fn test_partial_conversion() {
        let src = indoc! {r#"
        %0 = "stablehlo.constant"() {value = dense<1.0> : tensor<f32>, x = #stablehlo.foo<>} : () -> tensor<f32>
        %1 = "stablehlo.add"(%0, %0) : (tensor<f32>, tensor<f32>) -> tensor<f32>
        "#};
        let args = vec!["hlo-opt", "--convert-stablehlo-to-mhlo"];
        let err = run_app(args, src).unwrap_err().to_string();
        assert!(err.contains("failed to legalize operation `stablehlo.constant`"));

        let args = vec![
            "hlo-opt",
            "--convert-stablehlo-to-mhlo",
            "--allow-partial-conversion",
        ];
        let result = run_app(args, src).unwrap();
        assert!(result.contains(r#""stablehlo.constant"()"#));
        assert!(result.contains(r#""mhlo.add"(%0, %0)"#));
    }
}
