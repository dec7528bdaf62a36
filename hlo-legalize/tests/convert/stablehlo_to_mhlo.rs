extern crate hlo_legalize;

use hlo_legalize::convert::apply_conversion;
use hlo_legalize::convert::populate_stablehlo_to_mhlo_patterns;
use hlo_legalize::convert::translate_attribute;
use hlo_legalize::convert::ConversionOutcome;
use hlo_legalize::convert::RewritePatternSet;
use hlo_legalize::convert::StablehloToMhloTypeConverter;
use hlo_legalize::dialect::build_operation;
use hlo_legalize::dialect::mhlo::MhloOp;
use hlo_legalize::dialect::stablehlo;
use hlo_legalize::dialect::stablehlo::StablehloAttr;
use hlo_legalize::dialect::stablehlo::StablehloOp;
use hlo_legalize::dialect::OpKind;
use hlo_legalize::dialect::RegionCount;
use hlo_legalize::dialect::SymbolEnum;
use hlo_legalize::error::ConversionError;
use hlo_legalize::ir::adopt_ops;
use hlo_legalize::ir::into_shared;
use hlo_legalize::ir::Attribute;
use hlo_legalize::ir::Attributes;
use hlo_legalize::ir::Block;
use hlo_legalize::ir::FloatType;
use hlo_legalize::ir::GuardedOperation;
use hlo_legalize::ir::Operation;
use hlo_legalize::ir::OperationName;
use hlo_legalize::ir::Region;
use hlo_legalize::ir::Type;
use hlo_legalize::ir::TypeConverter;
use hlo_legalize::ir::MODULE;
use hlo_legalize::parser::DefaultParserDispatch;
use hlo_legalize::parser::Parser;
use hlo_legalize::shared::Shared;
use hlo_legalize::shared::SharedExt;
use hlo_legalize::tester::Tester;
use indoc::indoc;
use std::panic::Location;
use std::sync::Arc;

fn flags() -> Vec<&'static str> {
    vec!["--convert-stablehlo-to-mhlo"]
}

fn convert(module: Shared<Operation>) -> ConversionOutcome {
    let type_converter: Arc<dyn TypeConverter> = Arc::new(StablehloToMhloTypeConverter);
    let mut patterns = RewritePatternSet::new();
    populate_stablehlo_to_mhlo_patterns(&mut patterns, type_converter.clone());
    apply_conversion(module, &patterns, type_converter.as_ref()).unwrap()
}

/// Wrap `ops` into a module.
fn module(ops: Vec<Shared<Operation>>) -> Shared<Operation> {
    let block = Shared::new(Block::new(None, vec![]).into());
    for op in ops {
        block.wr().push_op(op);
    }
    adopt_ops(&block);
    let region: Shared<Region> = Shared::new(Region::default().into());
    region.wr().set_blocks(vec![block], Arc::downgrade(&region));
    let mut module = Operation::new(OperationName::new(MODULE.to_string()));
    module.add_region(region);
    into_shared(module)
}

#[test]
fn test_compare() {
    Tester::init_tracing();
    let src = indoc! {r#"
    module {
      "func.func"() ({
      ^bb0(%arg0: tensor<4xf32>, %arg1: tensor<4xf32>):
        %0 = "stablehlo.compare"(%arg0, %arg1) {comparison_direction = #stablehlo<comparison_direction GE>} : (tensor<4xf32>, tensor<4xf32>) -> tensor<4xi1>
        "func.return"(%0) : (tensor<4xi1>) -> ()
      }) {function_type = (tensor<4xf32>, tensor<4xf32>) -> tensor<4xi1>, sym_name = "main"} : () -> ()
    }
    "#};
    let expected = indoc! {r#"
    module {
      "func.func"() ({
      ^bb0(%arg0: tensor<4xf32>, %arg1: tensor<4xf32>):
        %0 = "mhlo.compare"(%arg0, %arg1) {comparison_direction = #mhlo<comparison_direction GE>} : (tensor<4xf32>, tensor<4xf32>) -> tensor<4xi1>
        "func.return"(%0) : (tensor<4xi1>) -> ()
      }) {function_type = (tensor<4xf32>, tensor<4xf32>) -> tensor<4xi1>, sym_name = "main"} : () -> ()
    }
    "#};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module.clone());
    Tester::check_lines_exact(&actual, expected, Location::caller());

    // The user of the compare result now refers to the replacement.
    let func = module.ops()[0].clone();
    let ret = func.ops()[1].clone();
    let operand = ret.rd().operands()[0].clone();
    let defining_op = match &*operand.rd() {
        hlo_legalize::ir::Value::OpResult(res) => res.defining_op(),
        _ => None,
    };
    let defining_op = defining_op.unwrap();
    assert_eq!(defining_op.rd().name().as_str(), "mhlo.compare");
}

#[test]
fn test_case() {
    Tester::init_tracing();
    let src = indoc! {r#"
    module {
      "func.func"() ({
      ^bb0(%arg0: tensor<i32>, %arg1: tensor<f32>):
        %0 = "stablehlo.case"(%arg0) ({
          "stablehlo.return"(%arg1) : (tensor<f32>) -> ()
        }, {
          %1 = "stablehlo.negate"(%arg1) : (tensor<f32>) -> tensor<f32>
          "stablehlo.return"(%1) : (tensor<f32>) -> ()
        }, {
          %2 = "stablehlo.abs"(%arg1) : (tensor<f32>) -> tensor<f32>
          "stablehlo.return"(%2) : (tensor<f32>) -> ()
        }) : (tensor<i32>) -> tensor<f32>
        "func.return"(%0) : (tensor<f32>) -> ()
      }) {sym_name = "main"} : () -> ()
    }
    "#};
    let expected = indoc! {r#"
    module {
      "func.func"() ({
      ^bb0(%arg0: tensor<i32>, %arg1: tensor<f32>):
        %0 = "mhlo.case"(%arg0) ({
          "mhlo.return"(%arg1) : (tensor<f32>) -> ()
        }, {
          %1 = "mhlo.negate"(%arg1) : (tensor<f32>) -> tensor<f32>
          "mhlo.return"(%1) : (tensor<f32>) -> ()
        }, {
          %2 = "mhlo.abs"(%arg1) : (tensor<f32>) -> tensor<f32>
          "mhlo.return"(%2) : (tensor<f32>) -> ()
        }) : (tensor<i32>) -> tensor<f32>
        "func.return"(%0) : (tensor<f32>) -> ()
      }) {sym_name = "main"} : () -> ()
    }
    "#};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module.clone());
    Tester::check_lines_exact(&actual, expected, Location::caller());

    let func = module.ops()[0].clone();
    let case = func.ops()[0].clone();
    assert_eq!(case.rd().regions().len(), 3);
}

#[test]
fn test_regions_and_records() {
    Tester::init_tracing();
    let src = indoc! {r#"
    %0 = "foo.input"() : () -> tensor<3x4xf32>
    %1 = "foo.indices"() : () -> tensor<2x1xi64>
    %2 = "stablehlo.gather"(%0, %1) {dimension_numbers = #stablehlo.gather<offset_dims = [1], collapsed_slice_dims = [0], start_index_map = [0], index_vector_dim = 1>, slice_sizes = array<i64: 1, 4>} : (tensor<3x4xf32>, tensor<2x1xi64>) -> tensor<2x4xf32>
    %3 = "stablehlo.constant"() {value = dense<0.0> : tensor<f32>} : () -> tensor<f32>
    %4 = "stablehlo.reduce"(%2, %3) ({
    ^bb0(%arg0: tensor<f32>, %arg1: tensor<f32>):
      %5 = "stablehlo.add"(%arg0, %arg1) : (tensor<f32>, tensor<f32>) -> tensor<f32>
      "stablehlo.return"(%5) : (tensor<f32>) -> ()
    }) {dimensions = array<i64: 1>} : (tensor<2x4xf32>, tensor<f32>) -> tensor<2xf32>
    "#};
    let expected = indoc! {r#"
    %2 = "mhlo.gather"(%0, %1) {dimension_numbers = #mhlo.gather<offset_dims = [1], collapsed_slice_dims = [0], start_index_map = [0], index_vector_dim = 1>, slice_sizes = array<i64: 1, 4>} : (tensor<3x4xf32>, tensor<2x1xi64>) -> tensor<2x4xf32>
    %3 = "mhlo.constant"() {value = dense<0.0> : tensor<f32>} : () -> tensor<f32>
    %4 = "mhlo.reduce"(%2, %3) ({
    ^bb0(%arg0: tensor<f32>, %arg1: tensor<f32>):
      %5 = "mhlo.add"(%arg0, %arg1) : (tensor<f32>, tensor<f32>) -> tensor<f32>
      "mhlo.return"(%5) : (tensor<f32>) -> ()
    }) {dimensions = array<i64: 1>} : (tensor<2x4xf32>, tensor<f32>) -> tensor<2xf32>
    "#};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_contain(&actual, expected, Location::caller());
    assert!(!actual.contains("stablehlo"));
}

#[test]
fn test_tokens() {
    Tester::init_tracing();
    let src = indoc! {r#"
    module {
      "func.func"() ({
      ^bb0(%arg0: !stablehlo.token):
        %0 = "stablehlo.after_all"(%arg0) : (!stablehlo.token) -> !stablehlo.token
        "func.return"(%0) : (!stablehlo.token) -> ()
      }) {function_type = (!stablehlo.token) -> !stablehlo.token, sym_name = "main"} : () -> ()
    }
    "#};
    let expected = indoc! {r#"
    module {
      "func.func"() ({
      ^bb0(%arg0: !mhlo.token):
        %0 = "mhlo.after_all"(%arg0) : (!mhlo.token) -> !mhlo.token
        "func.return"(%0) : (!mhlo.token) -> ()
      }) {function_type = (!mhlo.token) -> !mhlo.token, sym_name = "main"} : () -> ()
    }
    "#};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_exact(&actual, expected, Location::caller());
}

#[test]
fn test_type_extensions() {
    Tester::init_tracing();
    let src = indoc! {r#"
    %0 = "foo.input"() : () -> tensor<?xf32, #stablehlo.type_extensions<bounds = [4]>>
    %1 = "stablehlo.abs"(%0) : (tensor<?xf32, #stablehlo.type_extensions<bounds = [4]>>) -> tensor<?xf32, #stablehlo.type_extensions<bounds = [4]>>
    "#};
    let expected = indoc! {r#"
    %1 = "mhlo.abs"(%0) : (tensor<?xf32, #stablehlo.type_extensions<bounds = [4]>>) -> tensor<?xf32, #mhlo.type_extensions<bounds = [4]>>
    "#};
    let (module, actual) = Tester::transform(flags(), src);
    Tester::verify(module);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

/// Every kind is rewritten into the kind of the same name and every
/// replacement has the operands and as many region slots as its source.
#[test]
fn test_coverage() {
    let mut patterns = RewritePatternSet::new();
    populate_stablehlo_to_mhlo_patterns(&mut patterns, Arc::new(StablehloToMhloTypeConverter));
    assert_eq!(patterns.len(), StablehloOp::ALL.len());

    let scalar = Type::tensor(vec![], Type::Float(FloatType::F32));
    let lhs = build_operation(StablehloOp::Constant, vec![], vec![scalar.clone()], Attributes::new(), 0);
    let rhs = build_operation(StablehloOp::Constant, vec![], vec![scalar.clone()], Attributes::new(), 0);
    let lhs_value = lhs.rd().result(0).unwrap();
    let rhs_value = rhs.rd().result(0).unwrap();
    // Reversed, so that order is observable.
    let operands = vec![rhs_value.clone(), lhs_value.clone()];

    let mut ops = vec![lhs, rhs];
    ops.extend(StablehloOp::ALL.iter().map(|kind| {
        let regions = match kind.regions() {
            RegionCount::Fixed(n) => n,
            RegionCount::Variadic => 3,
        };
        build_operation(*kind, operands.clone(), vec![scalar.clone()], Attributes::new(), regions)
    }));
    let outcome = convert(module(ops));
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.converted, StablehloOp::ALL.len() + 2);

    let converted = outcome.root.ops();
    assert_eq!(converted.len(), StablehloOp::ALL.len() + 2);
    for (kind, op) in StablehloOp::ALL.iter().zip(converted.iter().skip(2)) {
        let op = op.rd();
        let target = MhloOp::from_operation_name(op.name().as_str()).unwrap();
        assert_eq!(target.mnemonic(), kind.mnemonic());
        let expected = match kind.regions() {
            RegionCount::Fixed(n) => n,
            RegionCount::Variadic => 3,
        };
        assert_eq!(op.regions().len(), expected, "{kind}");
        assert_eq!(op.results().len(), 1);
        assert_eq!(op.operands().len(), 2, "{kind}");
        assert!(Arc::ptr_eq(&op.operands()[0], &rhs_value), "{kind}");
        assert!(Arc::ptr_eq(&op.operands()[1], &lhs_value), "{kind}");
    }
}

#[test]
fn test_failure_isolation() {
    Tester::init_tracing();
    let src = indoc! {r#"
    %0 = "stablehlo.constant"() {bad = #stablehlo.foo<>, value = dense<1.0> : tensor<f32>} : () -> tensor<f32>
    %1 = "stablehlo.constant"() {value = dense<2.0> : tensor<f32>} : () -> tensor<f32>
    %2 = "stablehlo.add"(%0, %1) : (tensor<f32>, tensor<f32>) -> tensor<f32>
    "#};
    let module = Parser::<DefaultParserDispatch>::parse(src).unwrap();
    let outcome = convert(module);
    assert_eq!(outcome.converted, 2);
    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.op, "stablehlo.constant");
    let error = failure.conversion_error().unwrap();
    assert!(matches!(error, ConversionError::NamedAttribute { name, .. } if name == "bad"));
    assert!(matches!(
        error.root_cause(),
        ConversionError::UnhandledAttribute { .. }
    ));

    let actual = outcome.root.rd().to_string();
    let expected = indoc! {r#"
    %0 = "stablehlo.constant"() {bad = #stablehlo.foo<>, value = dense<1.0> : tensor<f32>} : () -> tensor<f32>
    %1 = "mhlo.constant"() {value = dense<2.0> : tensor<f32>} : () -> tensor<f32>
    %2 = "mhlo.add"(%0, %1) : (tensor<f32>, tensor<f32>) -> tensor<f32>
    "#};
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn test_region_mismatch() {
    // A `while` whose second region is missing cannot be written in text,
    // so build it directly.
    let scalar = Type::tensor(vec![], Type::int(32));
    let op = build_operation(StablehloOp::While, vec![], vec![scalar], Attributes::new(), 1);
    let outcome = convert(module(vec![op]));
    assert_eq!(outcome.converted, 0);
    let error = outcome.failures[0].conversion_error().unwrap();
    assert_eq!(
        error,
        &ConversionError::RegionMismatch {
            op: "stablehlo.while".to_string(),
            expected: 2,
            found: 1,
        }
    );
    let op = outcome.root.ops()[0].clone();
    assert_eq!(op.rd().name().as_str(), "stablehlo.while");
    assert!(op.rd().parent().is_some());
}

fn argument_types(op: &Shared<Operation>) -> Vec<String> {
    let mut types = vec![];
    for region in op.rd().regions() {
        for block in region.rd().blocks() {
            for argument in block.rd().arguments() {
                types.push(argument.rd().typ().to_string());
            }
        }
    }
    types
}

fn token_loop(attributes: &str) -> String {
    let src = indoc! {r#"
    %0 = "foo.token"() : () -> !stablehlo.token
    %1 = "stablehlo.while"(%0) ({
    ^bb0(%a: !stablehlo.token):
      %2 = "foo.cond"() : () -> tensor<i1>
      "stablehlo.return"(%2) : (tensor<i1>) -> ()
    }, {
    ^bb0(%b: !stablehlo.token):
      "stablehlo.return"(%b) : (!stablehlo.token) -> ()
    }) ATTRIBUTES: (!stablehlo.token) -> !stablehlo.token
    "#};
    src.replace("ATTRIBUTES", attributes)
}

#[test]
fn test_failed_op_keeps_signature() {
    Tester::init_tracing();
    let src = token_loop("{bad = #stablehlo.foo<>}");
    let module = Parser::<DefaultParserDispatch>::parse(&src).unwrap();
    let cond = module.ops()[1].ops()[0].clone();
    let outcome = convert(module);

    // Only the nested returns are converted.
    assert_eq!(outcome.converted, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].op, "stablehlo.while");
    let error = outcome.failures[0].conversion_error().unwrap();
    assert!(matches!(
        error.root_cause(),
        ConversionError::UnhandledAttribute { .. }
    ));

    let op = outcome.root.ops()[1].clone();
    assert_eq!(op.rd().name().as_str(), "stablehlo.while");
    assert_eq!(
        argument_types(&op),
        vec!["!stablehlo.token", "!stablehlo.token"]
    );
    assert!(Arc::ptr_eq(&op.ops()[0], &cond));
    assert_eq!(op.ops().len(), 3);
    Tester::verify(outcome.root.clone());

    let actual = outcome.root.rd().to_string();
    let expected = indoc! {r#"
    %1 = "stablehlo.while"(%0) ({
    ^bb0(%a: !stablehlo.token):
      %2 = "foo.cond"() : () -> tensor<i1>
      "mhlo.return"(%2) : (tensor<i1>) -> ()
    }, {
    ^bb0(%b: !stablehlo.token):
      "mhlo.return"(%b) : (!stablehlo.token) -> ()
    }) {bad = #stablehlo.foo<>} : (!stablehlo.token) -> !stablehlo.token
    "#};
    Tester::check_lines_contain(&actual, expected, Location::caller());
}

#[test]
fn test_converted_op_signature() {
    Tester::init_tracing();
    let src = token_loop("");
    let module = Parser::<DefaultParserDispatch>::parse(&src).unwrap();
    let outcome = convert(module);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.converted, 3);

    let op = outcome.root.ops()[1].clone();
    assert_eq!(op.rd().name().as_str(), "mhlo.while");
    assert_eq!(argument_types(&op), vec!["!mhlo.token", "!mhlo.token"]);
    Tester::verify(outcome.root.clone());
}

#[test]
fn test_failed_signature_skips_rewrite() {
    Tester::init_tracing();
    let src = indoc! {r#"
    %0 = "foo.input"() : () -> tensor<4xf32>
    %1 = "foo.init"() : () -> tensor<f32>
    %2 = "stablehlo.reduce"(%0, %1) ({
    ^bb0(%a: !stablehlo.token, %b: !stablehlo.bogus):
      "stablehlo.return"(%a) : (!stablehlo.token) -> ()
    }) {dimensions = array<i64: 0>} : (tensor<4xf32>, tensor<f32>) -> tensor<f32>
    "#};
    let module = Parser::<DefaultParserDispatch>::parse(src).unwrap();
    let outcome = convert(module);

    assert_eq!(outcome.converted, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].op, "stablehlo.reduce");
    assert_eq!(
        outcome.failures[0].conversion_error(),
        Some(&ConversionError::TypeConversion {
            typ: "!stablehlo.bogus".to_string()
        })
    );

    let op = outcome.root.ops()[2].clone();
    assert_eq!(op.rd().name().as_str(), "stablehlo.reduce");
    // The token argument is not converted either.
    assert_eq!(
        argument_types(&op),
        vec!["!stablehlo.token", "!stablehlo.bogus"]
    );
    Tester::verify(outcome.root.clone());
}

#[test]
fn test_foreign_attributes() {
    let attributes = vec![
        Attribute::Unit,
        Attribute::String("x".to_string()),
        Attribute::Integer(hlo_legalize::ir::IntegerAttr::i64(3)),
        Attribute::SymbolRef("callee".to_string()),
        Attribute::Opaque(hlo_legalize::ir::OpaqueAttr::new("foo", Some("bar"), "1")),
        Attribute::Opaque(hlo_legalize::ir::OpaqueAttr::new("mhlo", None, "x")),
        Attribute::Type(stablehlo::token_type()),
    ];
    for attr in attributes {
        assert_eq!(translate_attribute(&attr).unwrap(), attr);
    }
}

fn check_symbols<S: SymbolEnum>(wrap: fn(S) -> StablehloAttr) {
    for value in S::ALL {
        let attr = Attribute::StableHlo(wrap(*value));
        let translated = translate_attribute(&attr).unwrap();
        let expected = attr.to_string().replace("#stablehlo<", "#mhlo<");
        assert_eq!(translated.to_string(), expected);
        assert_eq!(translated.namespace(), "mhlo");
    }
}

#[test]
fn test_symbol_round_trip() {
    check_symbols(StablehloAttr::ComparisonDirection);
    check_symbols(StablehloAttr::ComparisonType);
    check_symbols(StablehloAttr::CustomCallApiVersion);
    check_symbols(StablehloAttr::FftType);
    check_symbols(StablehloAttr::Precision);
    check_symbols(StablehloAttr::RngAlgorithm);
    check_symbols(StablehloAttr::RngDistribution);
    check_symbols(StablehloAttr::Transpose);
}

#[test]
fn test_containers() {
    let empty = Attribute::Array(vec![]);
    assert_eq!(translate_attribute(&empty).unwrap(), empty);

    let precision = |p| Attribute::StableHlo(StablehloAttr::Precision(p));
    let config = Attribute::Array(vec![
        precision(stablehlo::Precision::Default),
        Attribute::Array(vec![precision(stablehlo::Precision::Highest)]),
        Attribute::Unit,
    ]);
    let translated = translate_attribute(&config).unwrap();
    assert_eq!(
        translated.to_string(),
        "[#mhlo<precision DEFAULT>, [#mhlo<precision HIGHEST>], unit]"
    );
}

#[test]
fn test_partial_conversion() {
    Tester::init_tracing();
    let src = indoc! {r#"
    %0 = "stablehlo.constant"() {value = dense<1.0> : tensor<f32>} : () -> tensor<f32>
    %1 = "stablehlo.abs"(%0) {bad = [#stablehlo.foo<1>]} : (tensor<f32>) -> tensor<f32>
    "#};
    let expected = indoc! {r#"
    %0 = "mhlo.constant"() {value = dense<1.0> : tensor<f32>} : () -> tensor<f32>
    %1 = "stablehlo.abs"(%0) {bad = [#stablehlo.foo<1>]} : (tensor<f32>) -> tensor<f32>
    "#};
    let args = vec!["--convert-stablehlo-to-mhlo", "--allow-partial-conversion"];
    let (module, actual) = Tester::transform(args, src);
    Tester::verify(module);
    Tester::check_lines_contain(&actual, expected, Location::caller());
}
