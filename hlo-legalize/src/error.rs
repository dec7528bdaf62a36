/// Reasons why a single operation could not be legalized.
///
/// A conversion error is always scoped to one operation instance. The driver
/// records it, leaves the instance untouched and moves on.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The type converter has no target representation for a type.
    #[error("failed to convert type `{typ}`")]
    TypeConversion { typ: String },
    /// An enum symbol of the source dialect does not exist in the target
    /// dialect.
    #[error("`{symbol}` is not a valid `{mnemonic}` symbol in the target dialect")]
    UnknownSymbol {
        symbol: String,
        mnemonic: &'static str,
    },
    /// A source-dialect attribute kind that the translator does not know.
    #[error("unhandled `{dialect}` attribute `{attribute}`")]
    UnhandledAttribute { dialect: String, attribute: String },
    /// Wraps the failure of one named attribute of an operation.
    #[error("failed to convert attribute `{name}`: {source}")]
    NamedAttribute {
        name: String,
        #[source]
        source: Box<ConversionError>,
    },
    /// The replacement does not have as many region slots as the source op
    /// owns regions.
    #[error("`{op}` owns {found} regions, but its replacement has {expected}")]
    RegionMismatch {
        op: String,
        expected: usize,
        found: usize,
    },
}

impl ConversionError {
    pub fn type_conversion(typ: &impl std::fmt::Display) -> Self {
        ConversionError::TypeConversion {
            typ: typ.to_string(),
        }
    }
    /// Return the innermost error (skipping [ConversionError::NamedAttribute]).
    pub fn root_cause(&self) -> &ConversionError {
        match self {
            ConversionError::NamedAttribute { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
