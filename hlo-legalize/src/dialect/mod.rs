//! Dialect definitions.
//!
//! Dialects are collections of operations, attributes and types. Both
//! dialects in this crate are declared with the macros below so that the set
//! of operation kinds and enum symbols is a closed Rust enum.

use crate::ir::into_shared;
use crate::ir::Attributes;
use crate::ir::Operation;
use crate::ir::OperationName;
use crate::ir::RecordFields;
use crate::ir::Region;
use crate::ir::Type;
use crate::ir::Value;
use crate::shared::Shared;
use anyhow::Result;

/// Number of regions that an operation kind owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionCount {
    Fixed(usize),
    /// Decided per instance (for example, one region per `case` branch).
    Variadic,
}

/// A closed set of operation kinds of one dialect.
pub trait OpKind: Copy + Eq + std::fmt::Debug + 'static {
    const DIALECT: &'static str;
    const ALL: &'static [Self];
    /// Name without the dialect prefix (for example, `add`).
    fn mnemonic(&self) -> &'static str;
    /// Full name (for example, `stablehlo.add`).
    fn operation_name(&self) -> &'static str;
    fn regions(&self) -> RegionCount;
    fn from_operation_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.operation_name() == name)
    }
}

/// An enumerated attribute whose values are identified by symbols such as
/// `GE` in `#stablehlo<comparison_direction GE>`.
pub trait SymbolEnum: Copy + Sized + 'static {
    /// Name of the attribute kind (for example, `comparison_direction`).
    const MNEMONIC: &'static str;
    const ALL: &'static [Self];
    fn symbol(&self) -> &'static str;
    fn from_symbol(symbol: &str) -> Option<Self>;
}

/// The attribute sum of a dialect, see `dialect_attributes!`.
pub trait DialectAttribute: Sized {
    const DIALECT: &'static str;
    /// Parse an enumerated attribute such as `comparison_direction GE`.
    ///
    /// Returns `None` if no enumerated attribute has the given mnemonic and
    /// fails if the mnemonic is known but the symbol is not.
    fn from_symbol(mnemonic: &str, symbol: &str) -> Result<Option<Self>>;
    /// Keyword that the record with the given mnemonic prints before its
    /// fields. Returns `None` if there is no such record.
    fn record_prefix(mnemonic: &str) -> Option<Option<&'static str>>;
    /// Parse a record attribute.
    ///
    /// Returns `None` if no record has the given mnemonic.
    fn from_fields(mnemonic: &str, fields: RecordFields) -> Result<Option<Self>>;
}

/// Create an operation of the given kind with `num_regions` empty regions.
pub fn build_operation<K: OpKind>(
    kind: K,
    operands: Vec<Shared<Value>>,
    result_types: Vec<Type>,
    attributes: Attributes,
    num_regions: usize,
) -> Shared<Operation> {
    let name = OperationName::new(kind.operation_name().to_string());
    let mut operation = Operation::new(name);
    operation.set_operands(operands);
    operation.set_anonymous_results(result_types);
    operation.set_attributes(attributes);
    for _ in 0..num_regions {
        operation.add_region(Shared::new(Region::default().into()));
    }
    into_shared(operation)
}

/// Declare the operation kinds of a dialect.
///
/// Kinds own no regions unless `[regions = N]` or `[regions = variadic]` is
/// given.
macro_rules! dialect_ops {
    (
        $(#[$meta:meta])*
        pub enum $name:ident in $dialect:literal {
            $($variant:ident => $mnemonic:literal $([regions = $regions:tt])?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl $crate::dialect::OpKind for $name {
            const DIALECT: &'static str = $dialect;
            const ALL: &'static [Self] = &[$($name::$variant),*];
            fn mnemonic(&self) -> &'static str {
                match self {
                    $($name::$variant => $mnemonic),*
                }
            }
            fn operation_name(&self) -> &'static str {
                match self {
                    $($name::$variant => concat!($dialect, ".", $mnemonic)),*
                }
            }
            fn regions(&self) -> $crate::dialect::RegionCount {
                match self {
                    $($name::$variant => dialect_ops!(@regions $($regions)?)),*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", $crate::dialect::OpKind::operation_name(self))
            }
        }
    };
    (@regions) => {
        $crate::dialect::RegionCount::Fixed(0)
    };
    (@regions variadic) => {
        $crate::dialect::RegionCount::Variadic
    };
    (@regions $n:literal) => {
        $crate::dialect::RegionCount::Fixed($n)
    };
}

/// Declare an enumerated attribute.
macro_rules! symbol_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident in $mnemonic:literal {
            $($variant:ident => $symbol:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl $crate::dialect::SymbolEnum for $name {
            const MNEMONIC: &'static str = $mnemonic;
            const ALL: &'static [Self] = &[$($name::$variant),*];
            fn symbol(&self) -> &'static str {
                match self {
                    $($name::$variant => $symbol),*
                }
            }
            fn from_symbol(symbol: &str) -> Option<Self> {
                match symbol {
                    $($symbol => Some($name::$variant),)*
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", $crate::dialect::SymbolEnum::symbol(self))
            }
        }
    };
}

/// Declare a record attribute whose fields are integers (`int`) or integer
/// lists (`ints`).
///
/// A field can be given a printed name that differs from the Rust name
/// (`typ: int = "type"`). Some records print a keyword before the fields
/// (`with prefix "raw"`).
macro_rules! record_attribute {
    (
        $(#[$meta:meta])*
        pub struct $name:ident in $mnemonic:literal $(with prefix $prefix:literal)? {
            $($field:ident : $kind:ident $(= $key:literal)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: record_attribute!(@type $kind)),*
        }

        impl $name {
            pub const MNEMONIC: &'static str = $mnemonic;
            pub const PREFIX: Option<&'static str> = record_attribute!(@prefix $($prefix)?);
            pub fn from_fields(mut fields: $crate::ir::RecordFields) -> anyhow::Result<Self> {
                let record = Self {
                    $($field: fields.$kind(record_attribute!(@key $field $($key)?))?),*
                };
                fields.finish()?;
                Ok(record)
            }
            pub(crate) fn write_fields(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut writer = $crate::ir::FieldWriter::new(f);
                $(writer.$kind(record_attribute!(@key $field $($key)?), &self.$field)?;)*
                Ok(())
            }
        }
    };
    (@type int) => { i64 };
    (@type ints) => { Vec<i64> };
    (@key $field:ident) => { stringify!($field) };
    (@key $field:ident $key:literal) => { $key };
    (@prefix) => { None };
    (@prefix $prefix:literal) => { Some($prefix) };
}

/// Declare the attribute sum of a dialect from its enumerated and record
/// attributes.
///
/// Enumerated attributes print as `#dialect<mnemonic SYMBOL>` and records as
/// `#dialect.mnemonic<field = value, ...>`.
macro_rules! dialect_attributes {
    (
        $(#[$meta:meta])*
        pub enum $name:ident in $dialect:literal {
            enums { $($enum:ident),* $(,)? }
            records { $($record:ident),* $(,)? }
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum $name {
            $($enum($enum),)*
            $($record($record),)*
        }

        impl $name {
            pub fn mnemonic(&self) -> &'static str {
                match self {
                    $($name::$enum(_) => <$enum as $crate::dialect::SymbolEnum>::MNEMONIC,)*
                    $($name::$record(_) => $record::MNEMONIC,)*
                }
            }
        }

        impl $crate::dialect::DialectAttribute for $name {
            const DIALECT: &'static str = $dialect;
            fn from_symbol(mnemonic: &str, symbol: &str) -> anyhow::Result<Option<Self>> {
                $(
                    if mnemonic == <$enum as $crate::dialect::SymbolEnum>::MNEMONIC {
                        return match <$enum as $crate::dialect::SymbolEnum>::from_symbol(symbol) {
                            Some(value) => Ok(Some($name::$enum(value))),
                            None => Err(anyhow::anyhow!(
                                "Unknown {} symbol `{}` in dialect {}",
                                mnemonic,
                                symbol,
                                $dialect
                            )),
                        };
                    }
                )*
                Ok(None)
            }
            fn record_prefix(mnemonic: &str) -> Option<Option<&'static str>> {
                $(
                    if mnemonic == $record::MNEMONIC {
                        return Some($record::PREFIX);
                    }
                )*
                None
            }
            fn from_fields(
                mnemonic: &str,
                fields: $crate::ir::RecordFields,
            ) -> anyhow::Result<Option<Self>> {
                $(
                    if mnemonic == $record::MNEMONIC {
                        return Ok(Some($name::$record($record::from_fields(fields)?)));
                    }
                )*
                Ok(None)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        $name::$enum(value) => write!(
                            f,
                            "#{}<{} {}>",
                            $dialect,
                            <$enum as $crate::dialect::SymbolEnum>::MNEMONIC,
                            value
                        ),
                    )*
                    $(
                        $name::$record(record) => {
                            write!(f, "#{}.{}<", $dialect, $record::MNEMONIC)?;
                            if let Some(prefix) = $record::PREFIX {
                                write!(f, "{prefix} ")?;
                            }
                            record.write_fields(f)?;
                            write!(f, ">")
                        }
                    )*
                }
            }
        }
    };
}

pub mod mhlo;
pub mod stablehlo;
