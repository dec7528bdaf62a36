//! Intermediate representation (IR) for the legalizer.
//!
//! The IR is generic: an [Operation] is a name plus operands, results,
//! attributes and regions. Which names exist is decided by the dialects in
//! [crate::dialect].

mod attribute;
mod block;
mod operation;
mod region;
mod typ;
mod value;

pub use attribute::Attribute;
pub use attribute::Attributes;
pub use attribute::DenseArrayAttr;
pub use attribute::DenseElementsAttr;
pub use attribute::FieldValue;
pub use attribute::FloatAttr;
pub use attribute::IntegerAttr;
pub use attribute::OpaqueAttr;
pub use attribute::RecordFields;
pub use attribute::BUILTIN;
pub(crate) use attribute::write_dims;
pub(crate) use attribute::FieldWriter;
pub use block::adopt_ops;
pub use block::Block;
pub use operation::into_shared;
pub use operation::replace;
pub use operation::GuardedOperation;
pub use operation::Operation;
pub use operation::OperationName;
pub use operation::MODULE;
pub use region::Region;
pub use typ::DialectType;
pub use typ::FloatType;
pub use typ::FunctionType;
pub use typ::IntegerType;
pub use typ::Signedness;
pub use typ::TensorType;
pub use typ::Type;
pub use typ::TypeConverter;
pub use typ::DYNAMIC;
pub use value::BlockArgument;
pub use value::OpResult;
pub use value::Value;

pub fn spaces(indent: i32) -> String {
    "  ".repeat(indent.max(0) as usize)
}
