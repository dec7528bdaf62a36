use crate::dialect::mhlo::MhloAttr;
use crate::dialect::stablehlo::StablehloAttr;
use crate::ir::typ::write_dim;
use crate::ir::Type;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fmt::Formatter;

/// Namespace of attributes that do not belong to a dialect.
pub const BUILTIN: &str = "builtin";

/// An attribute containing an integer value such as `42 : i64`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegerAttr {
    typ: Type,
    value: i64,
}

impl IntegerAttr {
    pub fn new(typ: Type, value: i64) -> Self {
        Self { typ, value }
    }
    pub fn i64(value: i64) -> Self {
        Self::new(Type::int(64), value)
    }
    pub fn typ(&self) -> &Type {
        &self.typ
    }
    pub fn value(&self) -> i64 {
        self.value
    }
}

/// An attribute containing a floating point value such as `0.5 : f32`.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatAttr {
    typ: Type,
    value: f64,
}

impl FloatAttr {
    pub fn new(typ: Type, value: f64) -> Self {
        Self { typ, value }
    }
    pub fn typ(&self) -> &Type {
        &self.typ
    }
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// `array<i64: 1, 2>`
#[derive(Clone, Debug, PartialEq)]
pub struct DenseArrayAttr {
    element: Type,
    values: Vec<i64>,
}

impl DenseArrayAttr {
    pub fn new(element: Type, values: Vec<i64>) -> Self {
        Self { element, values }
    }
    pub fn element(&self) -> &Type {
        &self.element
    }
    pub fn values(&self) -> &[i64] {
        &self.values
    }
}

/// `dense<[1.0, 2.0]> : tensor<2xf32>`
///
/// The payload is kept as written; this crate never needs to look inside.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseElementsAttr {
    body: String,
    typ: Type,
}

impl DenseElementsAttr {
    pub fn new(body: &str, typ: Type) -> Self {
        Self {
            body: body.to_string(),
            typ,
        }
    }
    pub fn body(&self) -> &str {
        &self.body
    }
    pub fn typ(&self) -> &Type {
        &self.typ
    }
}

/// A dialect attribute that no dialect parser recognized.
///
/// Kept verbatim so that it can be printed again. Printed as
/// `#dialect<body>` or `#dialect.mnemonic<body>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpaqueAttr {
    dialect: String,
    mnemonic: Option<String>,
    body: String,
}

impl OpaqueAttr {
    pub fn new(dialect: &str, mnemonic: Option<&str>, body: &str) -> Self {
        Self {
            dialect: dialect.to_string(),
            mnemonic: mnemonic.map(|m| m.to_string()),
            body: body.to_string(),
        }
    }
    pub fn dialect(&self) -> &str {
        &self.dialect
    }
    pub fn mnemonic(&self) -> Option<&str> {
        self.mnemonic.as_deref()
    }
    pub fn body(&self) -> &str {
        &self.body
    }
}

impl Display for OpaqueAttr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.dialect)?;
        if let Some(mnemonic) = &self.mnemonic {
            write!(f, ".{mnemonic}")?;
        }
        write!(f, "<{}>", self.body)
    }
}

/// Attributes are known-constant values of operations (a variable is not
/// allowed).
#[derive(Clone, Debug, PartialEq)]
pub enum Attribute {
    Unit,
    Bool(bool),
    Integer(IntegerAttr),
    Float(FloatAttr),
    String(String),
    Type(Type),
    /// `@callee`
    SymbolRef(String),
    DenseArray(DenseArrayAttr),
    DenseElements(DenseElementsAttr),
    /// An ordered sequence of attributes such as `[1 : i64, "foo"]`.
    Array(Vec<Attribute>),
    StableHlo(StablehloAttr),
    Mhlo(MhloAttr),
    Opaque(OpaqueAttr),
}

impl Attribute {
    /// Namespace of the dialect that owns this attribute.
    pub fn namespace(&self) -> &str {
        match self {
            Attribute::StableHlo(_) => crate::dialect::stablehlo::DIALECT,
            Attribute::Mhlo(_) => crate::dialect::mhlo::DIALECT,
            Attribute::Opaque(attr) => attr.dialect(),
            _ => BUILTIN,
        }
    }
    pub fn is_container(&self) -> bool {
        matches!(self, Attribute::Array(_))
    }
}

fn write_string(f: &mut Formatter<'_>, value: &str) -> std::fmt::Result {
    write!(f, "\"")?;
    for c in value.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

fn write_float(f: &mut Formatter<'_>, value: f64) -> std::fmt::Result {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

/// Write `[0, 1, ?]`.
pub(crate) fn write_dims(f: &mut Formatter<'_>, dims: &[i64]) -> std::fmt::Result {
    write!(f, "[")?;
    for (i, dim) in dims.iter().enumerate() {
        if 0 < i {
            write!(f, ", ")?;
        }
        write_dim(f, *dim)?;
    }
    write!(f, "]")
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Attribute::Unit => write!(f, "unit"),
            Attribute::Bool(value) => write!(f, "{value}"),
            Attribute::Integer(attr) => write!(f, "{} : {}", attr.value(), attr.typ()),
            Attribute::Float(attr) => {
                write_float(f, attr.value())?;
                write!(f, " : {}", attr.typ())
            }
            Attribute::String(value) => write_string(f, value),
            Attribute::Type(typ) => write!(f, "{typ}"),
            Attribute::SymbolRef(name) => write!(f, "@{name}"),
            Attribute::DenseArray(attr) => {
                write!(f, "array<{}", attr.element())?;
                let is_bool = attr.element() == &Type::int(1);
                for (i, value) in attr.values().iter().enumerate() {
                    let sep = if i == 0 { ": " } else { ", " };
                    if is_bool {
                        write!(f, "{sep}{}", *value != 0)?;
                    } else {
                        write!(f, "{sep}{value}")?;
                    }
                }
                write!(f, ">")
            }
            Attribute::DenseElements(attr) => {
                write!(f, "dense<{}> : {}", attr.body(), attr.typ())
            }
            Attribute::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if 0 < i {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Attribute::StableHlo(attr) => write!(f, "{attr}"),
            Attribute::Mhlo(attr) => write!(f, "{attr}"),
            Attribute::Opaque(attr) => write!(f, "{attr}"),
        }
    }
}

/// The attribute dictionary of an operation.
///
/// Names are unique and iteration is ordered by name, which keeps the
/// printed IR deterministic.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes {
    map: BTreeMap<String, Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
    pub fn len(&self) -> usize {
        self.map.len()
    }
    /// Insert an attribute and return the previous value under that name.
    pub fn insert(&mut self, name: &str, attribute: Attribute) -> Option<Attribute> {
        self.map.insert(name.to_string(), attribute)
    }
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.map.get(name)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Attribute)> {
        self.map.iter()
    }
}

impl FromIterator<(String, Attribute)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, Attribute)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

impl Display for Attributes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.map.is_empty() {
            write!(f, "{{")?;
            for (i, (name, attribute)) in self.map.iter().enumerate() {
                if 0 < i {
                    write!(f, ", ")?;
                }
                write!(f, "{name} = {attribute}")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

/// A field value inside a record attribute such as
/// `#stablehlo.gather<offset_dims = [1], index_vector_dim = 1>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Ints(Vec<i64>),
}

/// The parsed fields of a record attribute.
///
/// Dialects take the fields they know out of this collection and call
/// [RecordFields::finish] to reject leftovers.
#[derive(Debug, Default)]
pub struct RecordFields {
    fields: Vec<(String, FieldValue)>,
}

impl RecordFields {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, name: &str, value: FieldValue) -> Result<()> {
        if self.fields.iter().any(|(n, _)| n == name) {
            return Err(anyhow::anyhow!("Duplicate field `{name}`"));
        }
        self.fields.push((name.to_string(), value));
        Ok(())
    }
    fn take(&mut self, name: &str) -> Option<FieldValue> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(index).1)
    }
    /// Take a required scalar field.
    pub fn int(&mut self, name: &str) -> Result<i64> {
        match self.take(name) {
            Some(FieldValue::Int(value)) => Ok(value),
            Some(FieldValue::Ints(_)) => Err(anyhow::anyhow!("Expected `{name}` to be a scalar")),
            None => Err(anyhow::anyhow!("Missing field `{name}`")),
        }
    }
    /// Take a list field; a missing list is empty.
    pub fn ints(&mut self, name: &str) -> Result<Vec<i64>> {
        match self.take(name) {
            Some(FieldValue::Ints(values)) => Ok(values),
            Some(FieldValue::Int(_)) => Err(anyhow::anyhow!("Expected `{name}` to be a list")),
            None => Ok(vec![]),
        }
    }
    pub fn finish(self) -> Result<()> {
        match self.fields.first() {
            Some((name, _)) => Err(anyhow::anyhow!("Unknown field `{name}`")),
            None => Ok(()),
        }
    }
}

/// Write a record field list such as `lhs_batching_dimensions = [0]`.
///
/// Empty lists are omitted.
pub(crate) struct FieldWriter<'a, 'b> {
    f: &'a mut Formatter<'b>,
    first: bool,
}

impl<'a, 'b> FieldWriter<'a, 'b> {
    pub(crate) fn new(f: &'a mut Formatter<'b>) -> Self {
        Self { f, first: true }
    }
    fn sep(&mut self) -> std::fmt::Result {
        if !self.first {
            write!(self.f, ", ")?;
        }
        self.first = false;
        Ok(())
    }
    pub(crate) fn int(&mut self, name: &str, value: &i64) -> std::fmt::Result {
        self.sep()?;
        write!(self.f, "{name} = ")?;
        write_dim(self.f, *value)
    }
    pub(crate) fn ints(&mut self, name: &str, values: &[i64]) -> std::fmt::Result {
        if values.is_empty() {
            return Ok(());
        }
        self.sep()?;
        write!(self.f, "{name} = ")?;
        write_dims(self.f, values)
    }
}
