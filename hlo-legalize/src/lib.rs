//! Legalization of StableHLO programs to the MHLO dialect.
//!
//! StableHLO and MHLO are sibling dialects: nearly every operation, attribute
//! and type in one has a counterpart of the same name in the other. This
//! crate translates a program from the former into the latter while keeping
//! the structure intact. Operations are replaced one by one, attributes are
//! translated (enum symbols are matched by spelling and records are copied
//! field by field) and nested regions are moved into the replacement instead
//! of being copied.
//!
//! The crate contains everything to run the legalization on textual IR:
//!
//! - [ir] holds the generic IR (operations, regions, blocks, values,
//!   attributes and types).
//! - [dialect] declares the closed sets of `stablehlo` and `mhlo` operations
//!   and attributes.
//! - [parser] reads the MLIR generic operation syntax.
//! - [convert] contains the rewrite infrastructure and the
//!   `convert-stablehlo-to-mhlo` pass.
//!
//! ```
//! use hlo_legalize::convert::RewriteResult;
//! use hlo_legalize::parser::DefaultParserDispatch;
//! use hlo_legalize::parser::Parser;
//! use hlo_legalize::shared::SharedExt;
//! use hlo_legalize::transform;
//! use hlo_legalize::DefaultTransformDispatch;
//! use hlo_legalize::PassOptions;
//! use hlo_legalize::Passes;
//!
//! let src = r#"%0 = "stablehlo.constant"() {value = dense<1> : tensor<i32>} : () -> tensor<i32>"#;
//! let module = Parser::<DefaultParserDispatch>::parse(src).unwrap();
//! let passes = Passes::from_convert_vec(vec!["--convert-stablehlo-to-mhlo"]);
//! let options = PassOptions::default();
//! let result = transform::<DefaultTransformDispatch>(module, &passes, &options).unwrap();
//! let RewriteResult::Changed(changed) = result else {
//!     panic!("expected a change");
//! };
//! assert!(changed.0.rd().to_string().contains("\"mhlo.constant\"()"));
//! ```

pub mod convert;
pub mod dialect;
pub mod error;
pub mod ir;
pub mod parser;
pub mod shared;
#[cfg(feature = "test-utils")]
pub mod tester;
mod transform;

pub use transform::default_arguments;
pub use transform::init_subscriber;
pub use transform::transform;
pub use transform::DefaultTransformDispatch;
pub use transform::PassOptions;
pub use transform::Passes;
pub use transform::SinglePass;
pub use transform::TransformDispatch;
