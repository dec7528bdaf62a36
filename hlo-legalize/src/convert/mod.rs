//! Conversion logic for the legalizer.
//!
//! This module contains the generic infrastructure to rewrite operations of
//! one dialect into another: the [Rewrite] trait, sets of rewrites, the
//! conversion target that decides which operations are still illegal and the
//! driver that walks the IR. The actual rewrite rules live in the submodules.

use crate::error::ConversionError;
use crate::ir::spaces;
use crate::ir::Attribute;
use crate::ir::Attributes;
use crate::ir::Operation;
use crate::ir::Type;
use crate::ir::TypeConverter;
use crate::ir::Value;
use crate::shared::Shared;
use crate::shared::SharedExt;
use crate::transform::PassOptions;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;
use tracing::warn;

mod stablehlo_to_mhlo;

pub use stablehlo_to_mhlo::populate_stablehlo_to_mhlo_patterns;
pub use stablehlo_to_mhlo::translate_attribute;
pub use stablehlo_to_mhlo::ConvertStablehloToMhlo;
pub use stablehlo_to_mhlo::StablehloToMhloOpConverter;
pub use stablehlo_to_mhlo::StablehloToMhloTypeConverter;

pub struct ChangedOp(pub Shared<Operation>);

impl PartialEq for ChangedOp {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Whether a rewrite changed the IR.
///
/// If a rewrite changes the IR, it returns the changed operation. For a
/// rewrite rule this is the replacement. For a pass this is the (possibly
/// new) root operation.
#[derive(PartialEq)]
pub enum RewriteResult {
    Changed(ChangedOp),
    Unchanged,
}

impl RewriteResult {
    pub fn is_changed(&self) -> Option<&ChangedOp> {
        match self {
            RewriteResult::Changed(op) => Some(op),
            RewriteResult::Unchanged => None,
        }
    }
}

pub trait Rewrite: Send + Sync {
    /// The name of the rewrite; is used for logging.
    fn name(&self) -> &'static str;
    /// Returns true if the rewrite can be applied to the given operation.
    ///
    /// This method is not allowed to mutate the IR.
    fn is_match(&self, op: &Operation) -> Result<bool>;
    /// Applies the rewrite to the given operation.
    ///
    /// This method is allowed to mutate the IR, but only after everything
    /// that can fail has been checked. An error means that the IR was left
    /// untouched.
    fn rewrite(&self, op: Shared<Operation>) -> Result<RewriteResult>;
}

/// An ordered collection of rewrites. The first rewrite that matches an
/// operation is applied to it.
#[derive(Default)]
pub struct RewritePatternSet {
    patterns: Vec<Box<dyn Rewrite>>,
}

impl RewritePatternSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, pattern: Box<dyn Rewrite>) {
        self.patterns.push(pattern);
    }
    pub fn len(&self) -> usize {
        self.patterns.len()
    }
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &dyn Rewrite> {
        self.patterns.iter().map(|pattern| pattern.as_ref())
    }
    fn find_match(&self, op: &Operation) -> Result<Option<&dyn Rewrite>> {
        for pattern in self.iter() {
            if pattern.is_match(op)? {
                return Ok(Some(pattern));
            }
        }
        Ok(None)
    }
}

/// Decides which operations may remain after a conversion.
#[derive(Default)]
pub struct ConversionTarget {
    illegal_dialects: Vec<&'static str>,
}

impl ConversionTarget {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_illegal_dialect(&mut self, dialect: &'static str) {
        self.illegal_dialects.push(dialect);
    }
    pub fn is_legal(&self, op: &Operation) -> bool {
        let name = op.name();
        !self
            .illegal_dialects
            .iter()
            .any(|dialect| *dialect == name.dialect())
    }
    /// Names of the illegal operations nested in `root` (including `root`).
    pub fn illegal_ops(&self, root: &Shared<Operation>) -> Vec<String> {
        let mut names = vec![];
        if !self.is_legal(&root.rd()) {
            names.push(root.rd().name().name());
        }
        for op in root.rd().ops() {
            names.extend(self.illegal_ops(&op));
        }
        names
    }
}

/// An operation instance that could not be converted.
#[derive(Debug)]
pub struct ConversionFailure {
    /// Name of the operation (for example, `stablehlo.add`).
    pub op: String,
    pub error: anyhow::Error,
}

impl ConversionFailure {
    /// The conversion error, if the failure came from the conversion itself.
    pub fn conversion_error(&self) -> Option<&ConversionError> {
        self.error.downcast_ref::<ConversionError>()
    }
}

pub struct ConversionOutcome {
    /// The root after the conversion; only differs from the input if the
    /// input root itself was replaced.
    pub root: Shared<Operation>,
    /// Number of replaced operations.
    pub converted: usize,
    /// Number of unmatched operations (such as functions) whose region
    /// signatures changed.
    pub updated_signatures: usize,
    pub failures: Vec<ConversionFailure>,
}

impl ConversionOutcome {
    pub fn is_changed(&self) -> bool {
        0 < self.converted || 0 < self.updated_signatures
    }
}

/// New types for the block arguments in the regions of an operation and for
/// its `function_type` attribute.
///
/// The conversion is computed up front and applied separately, so a failure
/// anywhere leaves every type as it was.
#[derive(Default)]
pub struct SignatureConversion {
    arguments: Vec<(Shared<Value>, Type)>,
    function_type: Option<Type>,
}

impl SignatureConversion {
    pub fn new(
        operation: &Operation,
        type_converter: &dyn TypeConverter,
    ) -> Result<Self, ConversionError> {
        let mut arguments = vec![];
        for region in operation.regions() {
            for block in region.rd().blocks() {
                for argument in block.rd().arguments() {
                    let typ = argument.rd().typ().clone();
                    let converted = type_converter.convert_type(&typ)?;
                    if converted != typ {
                        arguments.push((argument.clone(), converted));
                    }
                }
            }
        }
        let mut function_type = None;
        if let Some(Attribute::Type(typ @ Type::Function(_))) =
            operation.attributes().get("function_type")
        {
            let converted = type_converter.convert_type(typ)?;
            if &converted != typ {
                function_type = Some(converted);
            }
        }
        Ok(SignatureConversion {
            arguments,
            function_type,
        })
    }
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty() && self.function_type.is_none()
    }
    /// Put the converted `function_type` (if any) into `attributes`.
    pub fn update_attributes(&self, attributes: &mut Attributes) {
        if let Some(typ) = &self.function_type {
            attributes.insert("function_type", Attribute::Type(typ.clone()));
        }
    }
    /// Set the converted block argument types.
    pub fn update_arguments(&self) {
        for (argument, typ) in &self.arguments {
            argument.wr().set_type(typ.clone());
        }
    }
    /// Apply the whole conversion to `op` in place.
    pub fn apply(&self, op: &Shared<Operation>) {
        if self.function_type.is_some() {
            let mut attributes = op.rd().attributes().clone();
            self.update_attributes(&mut attributes);
            op.wr().set_attributes(attributes);
        }
        self.update_arguments();
    }
}

struct Driver<'a> {
    patterns: &'a RewritePatternSet,
    type_converter: &'a dyn TypeConverter,
    converted: usize,
    updated_signatures: usize,
    failures: Vec<ConversionFailure>,
}

impl Driver<'_> {
    fn fail(&mut self, op: &Shared<Operation>, error: anyhow::Error, indent: i32) {
        let name = op.rd().name().name();
        warn!("{}Failed to legalize {}: {:#}", spaces(indent), name, error);
        self.failures.push(ConversionFailure { op: name, error });
    }
    /// Convert `op` after its nested operations (post-order).
    ///
    /// Returns the replacement if `op` was replaced. An operation that no
    /// pattern matches still gets its region signature converted.
    fn walk(&mut self, op: &Shared<Operation>, indent: i32) -> Result<Option<Shared<Operation>>> {
        let ops = op.rd().ops();
        for nested in ops {
            self.walk(&nested, indent + 1)?;
        }

        let matched = self.patterns.find_match(&op.rd())?;
        let pattern = match matched {
            Some(pattern) => pattern,
            None => {
                self.convert_signature(op, indent);
                return Ok(None);
            }
        };
        debug!(
            "{}Matching {} with {}",
            spaces(indent),
            op.rd().name(),
            pattern.name()
        );
        match pattern.rewrite(op.clone()) {
            Ok(RewriteResult::Changed(new)) => {
                debug!("{}--> Success", spaces(indent));
                self.converted += 1;
                Ok(Some(new.0))
            }
            Ok(RewriteResult::Unchanged) => Ok(None),
            Err(e) => {
                self.fail(op, e, indent);
                Ok(None)
            }
        }
    }
    fn convert_signature(&mut self, op: &Shared<Operation>, indent: i32) {
        let signature = SignatureConversion::new(&op.rd(), self.type_converter);
        match signature {
            Ok(signature) if signature.is_empty() => (),
            Ok(signature) => {
                signature.apply(op);
                self.updated_signatures += 1;
            }
            Err(e) => self.fail(op, e.into(), indent),
        }
    }
}

/// Apply `patterns` to every operation nested in `root` (and to `root`).
///
/// Operations are visited in post-order, so the contents of the regions of an
/// operation are converted before the operation itself. Operands are
/// converted before their users since producers come first in a block.
///
/// A failing operation is recorded in the outcome and left exactly as it
/// was, including the block arguments of its regions; the driver then
/// continues with the next operation. Only internal errors (such
/// as a failing `is_match`) abort the conversion.
pub fn apply_conversion(
    root: Shared<Operation>,
    patterns: &RewritePatternSet,
    type_converter: &dyn TypeConverter,
) -> Result<ConversionOutcome> {
    let mut driver = Driver {
        patterns,
        type_converter,
        converted: 0,
        updated_signatures: 0,
        failures: vec![],
    };
    let replacement = driver.walk(&root, 0)?;
    Ok(ConversionOutcome {
        root: replacement.unwrap_or(root),
        converted: driver.converted,
        updated_signatures: driver.updated_signatures,
        failures: driver.failures,
    })
}

/// A pass is a transformation that can be applied to the IR.
pub trait Pass {
    const NAME: &'static str;
    fn convert(op: Shared<Operation>, options: &PassOptions) -> Result<RewriteResult>;
}
