//! The StableHLO dialect (the source of the legalization).

mod attribute;
mod op;

pub use attribute::ChannelHandle;
pub use attribute::ComparisonDirection;
pub use attribute::ComparisonType;
pub use attribute::ConvDimensionNumbers;
pub use attribute::CustomCallApiVersion;
pub use attribute::DotDimensionNumbers;
pub use attribute::FftType;
pub use attribute::GatherDimensionNumbers;
pub use attribute::Precision;
pub use attribute::RngAlgorithm;
pub use attribute::RngDistribution;
pub use attribute::ScatterDimensionNumbers;
pub use attribute::StablehloAttr;
pub use attribute::Transpose;
pub use attribute::TypeExtensions;
pub use op::StablehloOp;

use crate::ir::DialectType;
use crate::ir::Type;

pub const DIALECT: &str = "stablehlo";

/// `!stablehlo.token`
pub fn token_type() -> Type {
    Type::Dialect(DialectType::new(DIALECT, "token"))
}
