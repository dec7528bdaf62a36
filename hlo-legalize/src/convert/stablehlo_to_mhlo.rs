use crate::convert::apply_conversion;
use crate::convert::ChangedOp;
use crate::convert::ConversionTarget;
use crate::convert::Pass;
use crate::convert::Rewrite;
use crate::convert::RewritePatternSet;
use crate::convert::RewriteResult;
use crate::convert::SignatureConversion;
use crate::dialect::build_operation;
use crate::dialect::mhlo;
use crate::dialect::mhlo::MhloAttr;
use crate::dialect::mhlo::MhloOp;
use crate::dialect::stablehlo;
use crate::dialect::stablehlo::StablehloAttr;
use crate::dialect::stablehlo::StablehloOp;
use crate::dialect::OpKind;
use crate::dialect::RegionCount;
use crate::dialect::SymbolEnum;
use crate::error::ConversionError;
use crate::ir::replace;
use crate::ir::Attribute;
use crate::ir::Attributes;
use crate::ir::FunctionType;
use crate::ir::Operation;
use crate::ir::TensorType;
use crate::ir::Type;
use crate::ir::TypeConverter;
use crate::shared::Shared;
use crate::shared::SharedExt;
use crate::transform::PassOptions;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

/// Look up the target symbol with the same spelling as `value`.
pub fn translate_symbol<S: SymbolEnum, T: SymbolEnum>(value: S) -> Result<T, ConversionError> {
    T::from_symbol(value.symbol()).ok_or_else(|| ConversionError::UnknownSymbol {
        symbol: value.symbol().to_string(),
        mnemonic: T::MNEMONIC,
    })
}

fn translate_stablehlo_attribute(attr: &StablehloAttr) -> Result<MhloAttr, ConversionError> {
    use StablehloAttr as S;
    let attr = match attr {
        S::ComparisonDirection(v) => MhloAttr::ComparisonDirection(translate_symbol(*v)?),
        S::ComparisonType(v) => MhloAttr::ComparisonType(translate_symbol(*v)?),
        S::CustomCallApiVersion(v) => MhloAttr::CustomCallApiVersion(translate_symbol(*v)?),
        S::FftType(v) => MhloAttr::FftType(translate_symbol(*v)?),
        S::Precision(v) => MhloAttr::Precision(translate_symbol(*v)?),
        S::RngAlgorithm(v) => MhloAttr::RngAlgorithm(translate_symbol(*v)?),
        S::RngDistribution(v) => MhloAttr::RngDistribution(translate_symbol(*v)?),
        S::Transpose(v) => MhloAttr::Transpose(translate_symbol(*v)?),
        S::ChannelHandle(v) => MhloAttr::ChannelHandle(mhlo::ChannelHandle {
            handle: v.handle,
            typ: v.typ,
        }),
        S::ConvDimensionNumbers(v) => MhloAttr::ConvDimensionNumbers(mhlo::ConvDimensionNumbers {
            input_batch_dimension: v.input_batch_dimension,
            input_feature_dimension: v.input_feature_dimension,
            input_spatial_dimensions: v.input_spatial_dimensions.clone(),
            kernel_input_feature_dimension: v.kernel_input_feature_dimension,
            kernel_output_feature_dimension: v.kernel_output_feature_dimension,
            kernel_spatial_dimensions: v.kernel_spatial_dimensions.clone(),
            output_batch_dimension: v.output_batch_dimension,
            output_feature_dimension: v.output_feature_dimension,
            output_spatial_dimensions: v.output_spatial_dimensions.clone(),
        }),
        S::DotDimensionNumbers(v) => MhloAttr::DotDimensionNumbers(mhlo::DotDimensionNumbers {
            lhs_batching_dimensions: v.lhs_batching_dimensions.clone(),
            rhs_batching_dimensions: v.rhs_batching_dimensions.clone(),
            lhs_contracting_dimensions: v.lhs_contracting_dimensions.clone(),
            rhs_contracting_dimensions: v.rhs_contracting_dimensions.clone(),
        }),
        S::GatherDimensionNumbers(v) => {
            MhloAttr::GatherDimensionNumbers(mhlo::GatherDimensionNumbers {
                offset_dims: v.offset_dims.clone(),
                collapsed_slice_dims: v.collapsed_slice_dims.clone(),
                start_index_map: v.start_index_map.clone(),
                index_vector_dim: v.index_vector_dim,
            })
        }
        S::ScatterDimensionNumbers(v) => {
            MhloAttr::ScatterDimensionNumbers(mhlo::ScatterDimensionNumbers {
                update_window_dims: v.update_window_dims.clone(),
                inserted_window_dims: v.inserted_window_dims.clone(),
                scatter_dims_to_operand_dims: v.scatter_dims_to_operand_dims.clone(),
                index_vector_dim: v.index_vector_dim,
            })
        }
        S::TypeExtensions(v) => MhloAttr::TypeExtensions(mhlo::TypeExtensions {
            bounds: v.bounds.clone(),
        }),
    };
    Ok(attr)
}

/// Translate an attribute to its `mhlo` counterpart.
///
/// `stablehlo` attributes are mapped to the `mhlo` attribute of the same kind
/// and arrays are translated element by element. A `stablehlo` attribute
/// that the dialect does not define (kept as opaque by the parser) cannot be
/// translated. All other attributes are returned unchanged.
pub fn translate_attribute(attr: &Attribute) -> Result<Attribute, ConversionError> {
    match attr {
        Attribute::StableHlo(attr) => Ok(Attribute::Mhlo(translate_stablehlo_attribute(attr)?)),
        Attribute::Array(elements) => {
            let elements = elements
                .iter()
                .map(translate_attribute)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Attribute::Array(elements))
        }
        Attribute::Opaque(opaque) if opaque.dialect() == stablehlo::DIALECT => {
            Err(ConversionError::UnhandledAttribute {
                dialect: opaque.dialect().to_string(),
                attribute: opaque.to_string(),
            })
        }
        other => Ok(other.clone()),
    }
}

/// Bind each `stablehlo` kind to the `mhlo` kind with the same name.
///
/// The generated `match` has no wildcard arm, so a `stablehlo` kind without
/// a binding does not compile.
macro_rules! op_bindings {
    ($($kind:ident),* $(,)?) => {
        pub fn target_op(kind: StablehloOp) -> MhloOp {
            match kind {
                $(StablehloOp::$kind => MhloOp::$kind,)*
            }
        }
    };
}

op_bindings! {
    Abs, Add, AfterAll, AllGather, AllReduce, AllToAll, And, Atan2,
    BatchNormGrad, BatchNormInference, BatchNormTraining, BitcastConvert,
    Broadcast, BroadcastInDim, Case, Cbrt, Ceil, Cholesky, Clamp,
    CollectivePermute, Compare, Complex, ComputeReshapeShape, Concatenate,
    Constant, Convert, Convolution, Cosine, CountLeadingZeros, CreateToken,
    CrossReplicaSum, CstrReshapable, CustomCall, Divide, Dot, DotGeneral,
    DynamicBroadcastInDim, DynamicConv, DynamicGather, DynamicIota, DynamicPad,
    DynamicReshape, DynamicSlice, DynamicUpdateSlice, Einsum, Exponential,
    ExponentialMinusOne, Fft, Floor, Gather, GetDimensionSize, GetTupleElement,
    If, Imag, Infeed, Iota, IsFinite, Log, LogPlusOne, Logistic, Map, Maximum,
    Minimum, Multiply, Negate, Not, OptimizationBarrier, Or, Outfeed, Pad,
    PopulationCount, Power, Real, RealDynamicSlice, Recv, Reduce,
    ReducePrecision, ReduceScatter, ReduceWindow, Remainder, ReplicaId, Reshape,
    Return, Reverse, Rng, RngBitGenerator, RoundNearestAfz, Rsqrt, Scatter,
    Select, SelectAndScatter, Send, SetDimensionSize, ShiftLeft,
    ShiftRightArithmetic, ShiftRightLogical, Sign, Sine, Slice, Sort, Sqrt,
    Subtract, Tanh, TorchIndexSelect, Trace, Transpose, TriangularSolve, Tuple,
    UnaryEinsum, UniformDequantize, UniformQuantize, While, Xor,
}

/// How the replacement gets its region slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Construction {
    /// As many as the target kind declares.
    Generic,
    /// As many as the source instance has (one per `case` branch).
    BranchCount,
}

/// Converts every instance of one `stablehlo` kind into the bound `mhlo`
/// kind.
pub struct StablehloToMhloOpConverter {
    source: StablehloOp,
    target: MhloOp,
    construction: Construction,
    type_converter: Arc<dyn TypeConverter>,
}

impl StablehloToMhloOpConverter {
    pub fn new(source: StablehloOp, type_converter: Arc<dyn TypeConverter>) -> Self {
        let construction = match source {
            StablehloOp::Case => Construction::BranchCount,
            _ => Construction::Generic,
        };
        StablehloToMhloOpConverter {
            source,
            target: target_op(source),
            construction,
            type_converter,
        }
    }
    pub fn source(&self) -> StablehloOp {
        self.source
    }
    pub fn target(&self) -> MhloOp {
        self.target
    }
    fn num_regions(&self, op: &Operation) -> usize {
        match (self.construction, self.target.regions()) {
            (Construction::Generic, RegionCount::Fixed(n)) => n,
            _ => op.regions().len(),
        }
    }
    fn convert_attributes(&self, attributes: &Attributes) -> Result<Attributes, ConversionError> {
        attributes
            .iter()
            .map(|(name, attr)| match translate_attribute(attr) {
                Ok(attr) => Ok((name.clone(), attr)),
                Err(e) => Err(ConversionError::NamedAttribute {
                    name: name.clone(),
                    source: Box::new(e),
                }),
            })
            .collect()
    }
}

impl Rewrite for StablehloToMhloOpConverter {
    fn name(&self) -> &'static str {
        self.source.operation_name()
    }
    fn is_match(&self, op: &Operation) -> Result<bool> {
        Ok(op.name().as_str() == self.source.operation_name())
    }
    fn rewrite(&self, op: Shared<Operation>) -> Result<RewriteResult> {
        let (operands, result_types, attributes, signature, found, expected) = {
            let operation = op.rd();
            let result_types = self
                .type_converter
                .convert_types(&operation.result_types())?;
            let mut attributes = self.convert_attributes(operation.attributes())?;
            let signature = SignatureConversion::new(&operation, self.type_converter.as_ref())?;
            signature.update_attributes(&mut attributes);
            (
                operation.operands().to_vec(),
                result_types,
                attributes,
                signature,
                operation.regions().len(),
                self.num_regions(&operation),
            )
        };
        if found != expected {
            return Err(ConversionError::RegionMismatch {
                op: self.source.operation_name().to_string(),
                expected,
                found,
            }
            .into());
        }
        let new_op = build_operation(self.target, operands, result_types, attributes, expected);
        replace(&op, &new_op)?;
        // The blocks now live in `new_op`.
        signature.update_arguments();
        debug!("Replaced {} by {}", self.source, self.target);
        Ok(RewriteResult::Changed(ChangedOp(new_op)))
    }
}

/// Register one [StablehloToMhloOpConverter] per `stablehlo` kind.
pub fn populate_stablehlo_to_mhlo_patterns(
    patterns: &mut RewritePatternSet,
    type_converter: Arc<dyn TypeConverter>,
) {
    for kind in StablehloOp::ALL {
        let converter = StablehloToMhloOpConverter::new(*kind, type_converter.clone());
        patterns.add(Box::new(converter));
    }
}

/// Maps `!stablehlo.token` to `!mhlo.token` and translates tensor encodings.
///
/// Other `stablehlo` types have no `mhlo` counterpart. Types of other
/// dialects are returned unchanged.
pub struct StablehloToMhloTypeConverter;

impl TypeConverter for StablehloToMhloTypeConverter {
    fn convert_type(&self, typ: &Type) -> Result<Type, ConversionError> {
        match typ {
            Type::Dialect(dialect_type) if dialect_type.dialect() == stablehlo::DIALECT => {
                if dialect_type.name() == "token" && dialect_type.body().is_none() {
                    Ok(mhlo::token_type())
                } else {
                    Err(ConversionError::type_conversion(typ))
                }
            }
            Type::RankedTensor(tensor) => {
                let element = self.convert_type(tensor.element())?;
                let encoding = match tensor.encoding() {
                    Some(encoding) => match translate_attribute(encoding) {
                        Ok(encoding) => Some(encoding),
                        Err(_) => return Err(ConversionError::type_conversion(typ)),
                    },
                    None => None,
                };
                let tensor = TensorType::new(tensor.shape().to_vec(), element);
                Ok(Type::RankedTensor(tensor.with_encoding(encoding)))
            }
            Type::UnrankedTensor(element) => {
                Ok(Type::UnrankedTensor(Box::new(self.convert_type(element)?)))
            }
            Type::Complex(element) => Ok(Type::Complex(Box::new(self.convert_type(element)?))),
            Type::Tuple(types) => Ok(Type::Tuple(self.convert_types(types)?)),
            Type::Function(function) => {
                let inputs = self.convert_types(function.inputs())?;
                let results = self.convert_types(function.results())?;
                Ok(Type::Function(FunctionType::new(inputs, results)))
            }
            other => Ok(other.clone()),
        }
    }
}

pub struct ConvertStablehloToMhlo;

impl Pass for ConvertStablehloToMhlo {
    const NAME: &'static str = "convert-stablehlo-to-mhlo";
    fn convert(op: Shared<Operation>, options: &PassOptions) -> Result<RewriteResult> {
        let type_converter: Arc<dyn TypeConverter> = Arc::new(StablehloToMhloTypeConverter);
        let mut patterns = RewritePatternSet::new();
        populate_stablehlo_to_mhlo_patterns(&mut patterns, type_converter.clone());
        let outcome = apply_conversion(op, &patterns, type_converter.as_ref())?;

        if !options.allow_partial_conversion {
            if let Some(failure) = outcome.failures.first() {
                return Err(anyhow::anyhow!(
                    "failed to legalize operation `{}`: {:#}",
                    failure.op,
                    failure.error
                ));
            }
            let mut target = ConversionTarget::new();
            target.add_illegal_dialect(stablehlo::DIALECT);
            if let Some(name) = target.illegal_ops(&outcome.root).first() {
                return Err(anyhow::anyhow!(
                    "failed to legalize operation `{name}` that was explicitly marked illegal"
                ));
            }
        }
        if outcome.is_changed() {
            Ok(RewriteResult::Changed(ChangedOp(outcome.root)))
        } else {
            Ok(RewriteResult::Unchanged)
        }
    }
}
