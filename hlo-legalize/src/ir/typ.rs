use crate::error::ConversionError;
use crate::ir::Attribute;
use std::fmt::Display;
use std::fmt::Formatter;

/// Marker for a dynamic dimension (printed as `?`).
pub const DYNAMIC: i64 = i64::MIN;

pub(crate) fn write_dim(f: &mut Formatter<'_>, dim: i64) -> std::fmt::Result {
    if dim == DYNAMIC {
        write!(f, "?")
    } else {
        write!(f, "{dim}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signedness {
    Signless,
    Signed,
    Unsigned,
}

/// Represent an integer type such as `i32`, `si8` or `ui16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerType {
    num_bits: u64,
    signedness: Signedness,
}

impl IntegerType {
    pub fn new(num_bits: u64) -> Self {
        Self {
            num_bits,
            signedness: Signedness::Signless,
        }
    }
    pub fn with_signedness(num_bits: u64, signedness: Signedness) -> Self {
        Self {
            num_bits,
            signedness,
        }
    }
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }
    /// Parse `i32`, `si32` or `ui32`.
    pub fn from_str(s: &str) -> Option<Self> {
        let (signedness, digits) = if let Some(rest) = s.strip_prefix("si") {
            (Signedness::Signed, rest)
        } else if let Some(rest) = s.strip_prefix("ui") {
            (Signedness::Unsigned, rest)
        } else if let Some(rest) = s.strip_prefix('i') {
            (Signedness::Signless, rest)
        } else {
            return None;
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let num_bits = digits.parse::<u64>().ok()?;
        Some(Self::with_signedness(num_bits, signedness))
    }
}

impl Display for IntegerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.signedness {
            Signedness::Signless => "i",
            Signedness::Signed => "si",
            Signedness::Unsigned => "ui",
        };
        write!(f, "{prefix}{}", self.num_bits)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloatType {
    F16,
    BF16,
    F32,
    F64,
}

impl FloatType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "f16" => Some(FloatType::F16),
            "bf16" => Some(FloatType::BF16),
            "f32" => Some(FloatType::F32),
            "f64" => Some(FloatType::F64),
            _ => None,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            FloatType::F16 => "f16",
            FloatType::BF16 => "bf16",
            FloatType::F32 => "f32",
            FloatType::F64 => "f64",
        }
    }
}

/// A ranked tensor such as `tensor<4x?xf32>`.
///
/// The optional encoding is an attribute such as
/// `#stablehlo.type_extensions<bounds = [?, 16]>`.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorType {
    shape: Vec<i64>,
    element: Box<Type>,
    encoding: Option<Box<Attribute>>,
}

impl TensorType {
    pub fn new(shape: Vec<i64>, element: Type) -> Self {
        Self {
            shape,
            element: Box::new(element),
            encoding: None,
        }
    }
    pub fn with_encoding(mut self, encoding: Option<Attribute>) -> Self {
        self.encoding = encoding.map(Box::new);
        self
    }
    pub fn shape(&self) -> &[i64] {
        &self.shape
    }
    pub fn element(&self) -> &Type {
        &self.element
    }
    pub fn encoding(&self) -> Option<&Attribute> {
        self.encoding.as_deref()
    }
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionType {
    inputs: Vec<Type>,
    results: Vec<Type>,
}

impl FunctionType {
    pub fn new(inputs: Vec<Type>, results: Vec<Type>) -> Self {
        Self { inputs, results }
    }
    pub fn inputs(&self) -> &[Type] {
        &self.inputs
    }
    pub fn results(&self) -> &[Type] {
        &self.results
    }
}

impl Display for FunctionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        write_types(f, &self.inputs)?;
        write!(f, ") -> ")?;
        match self.results.as_slice() {
            [single] if !matches!(single, Type::Function(_)) => write!(f, "{single}"),
            results => {
                write!(f, "(")?;
                write_types(f, results)?;
                write!(f, ")")
            }
        }
    }
}

/// A type defined by a dialect, such as `!stablehlo.token`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialectType {
    dialect: String,
    name: String,
    /// Raw text between the angle brackets, if any.
    body: Option<String>,
}

impl DialectType {
    pub fn new(dialect: &str, name: &str) -> Self {
        Self {
            dialect: dialect.to_string(),
            name: name.to_string(),
            body: None,
        }
    }
    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }
    pub fn dialect(&self) -> &str {
        &self.dialect
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl Display for DialectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{}.{}", self.dialect, self.name)?;
        if let Some(body) = &self.body {
            write!(f, "<{body}>")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Integer(IntegerType),
    Float(FloatType),
    Index,
    Complex(Box<Type>),
    RankedTensor(TensorType),
    /// `tensor<*xf32>`
    UnrankedTensor(Box<Type>),
    Tuple(Vec<Type>),
    Function(FunctionType),
    Dialect(DialectType),
}

impl Type {
    pub fn int(num_bits: u64) -> Type {
        Type::Integer(IntegerType::new(num_bits))
    }
    pub fn tensor(shape: Vec<i64>, element: Type) -> Type {
        Type::RankedTensor(TensorType::new(shape, element))
    }
    /// Namespace of the dialect that owns this type (`builtin` for
    /// the types that belong to no dialect).
    pub fn namespace(&self) -> &str {
        match self {
            Type::Dialect(typ) => typ.dialect(),
            _ => "builtin",
        }
    }
}

pub(crate) fn write_types(f: &mut Formatter<'_>, types: &[Type]) -> std::fmt::Result {
    for (i, typ) in types.iter().enumerate() {
        if 0 < i {
            write!(f, ", ")?;
        }
        write!(f, "{typ}")?;
    }
    Ok(())
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Integer(typ) => write!(f, "{typ}"),
            Type::Float(typ) => write!(f, "{}", typ.name()),
            Type::Index => write!(f, "index"),
            Type::Complex(element) => write!(f, "complex<{element}>"),
            Type::RankedTensor(tensor) => {
                write!(f, "tensor<")?;
                for dim in tensor.shape() {
                    write_dim(f, *dim)?;
                    write!(f, "x")?;
                }
                write!(f, "{}", tensor.element())?;
                if let Some(encoding) = tensor.encoding() {
                    write!(f, ", {encoding}")?;
                }
                write!(f, ">")
            }
            Type::UnrankedTensor(element) => write!(f, "tensor<*x{element}>"),
            Type::Tuple(types) => {
                write!(f, "tuple<")?;
                write_types(f, types)?;
                write!(f, ">")
            }
            Type::Function(typ) => write!(f, "{typ}"),
            Type::Dialect(typ) => write!(f, "{typ}"),
        }
    }
}

/// Interface to convert types from one dialect to another.
///
/// Conversion passes receive the converter as a parameter, so a converter
/// decides on its own which types it maps and which types it rejects.
pub trait TypeConverter: Send + Sync {
    /// Convert a single type or fail.
    fn convert_type(&self, typ: &Type) -> Result<Type, ConversionError>;
    /// Convert all `types`, failing on the first type that cannot be
    /// converted.
    fn convert_types(&self, types: &[Type]) -> Result<Vec<Type>, ConversionError> {
        types.iter().map(|typ| self.convert_type(typ)).collect()
    }
}
