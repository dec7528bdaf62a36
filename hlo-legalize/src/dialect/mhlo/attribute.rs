symbol_enum! {
    pub enum ComparisonDirection in "comparison_direction" {
        Equal => "EQ",
        NotEqual => "NE",
        GreaterThanOrEqual => "GE",
        GreaterThan => "GT",
        LessThanOrEqual => "LE",
        LessThan => "LT",
    }
}

symbol_enum! {
    pub enum ComparisonType in "comparison_type" {
        NoType => "NOTYPE",
        Float => "FLOAT",
        TotalOrder => "TOTALORDER",
        Signed => "SIGNED",
        Unsigned => "UNSIGNED",
    }
}

symbol_enum! {
    pub enum CustomCallApiVersion in "custom_call_api_version" {
        Unspecified => "API_VERSION_UNSPECIFIED",
        Original => "API_VERSION_ORIGINAL",
        StatusReturning => "API_VERSION_STATUS_RETURNING",
        StatusReturningUnified => "API_VERSION_STATUS_RETURNING_UNIFIED",
    }
}

symbol_enum! {
    pub enum FftType in "fft_type" {
        Fft => "FFT",
        Ifft => "IFFT",
        Rfft => "RFFT",
        Irfft => "IRFFT",
    }
}

symbol_enum! {
    pub enum Precision in "precision" {
        Default => "DEFAULT",
        High => "HIGH",
        Highest => "HIGHEST",
        PackedNibble => "PACKED_NIBBLE",
    }
}

symbol_enum! {
    pub enum RngAlgorithm in "rng_algorithm" {
        Default => "DEFAULT",
        ThreeFry => "THREE_FRY",
        Philox => "PHILOX",
    }
}

symbol_enum! {
    pub enum RngDistribution in "rng_distribution" {
        Uniform => "UNIFORM",
        Normal => "NORMAL",
    }
}

symbol_enum! {
    /// Whether `triangular_solve` transposes its left-hand side.
    pub enum Transpose in "transpose" {
        Invalid => "TRANSPOSE_INVALID",
        NoTranspose => "NO_TRANSPOSE",
        Transpose => "TRANSPOSE",
        Adjoint => "ADJOINT",
    }
}

record_attribute! {
    /// Identifies a channel of a `send`/`recv` or collective operation.
    pub struct ChannelHandle in "channel_handle" {
        handle: int,
        typ: int = "type",
    }
}

record_attribute! {
    pub struct ConvDimensionNumbers in "conv" with prefix "raw" {
        input_batch_dimension: int,
        input_feature_dimension: int,
        input_spatial_dimensions: ints,
        kernel_input_feature_dimension: int,
        kernel_output_feature_dimension: int,
        kernel_spatial_dimensions: ints,
        output_batch_dimension: int,
        output_feature_dimension: int,
        output_spatial_dimensions: ints,
    }
}

record_attribute! {
    pub struct DotDimensionNumbers in "dot" {
        lhs_batching_dimensions: ints,
        rhs_batching_dimensions: ints,
        lhs_contracting_dimensions: ints,
        rhs_contracting_dimensions: ints,
    }
}

record_attribute! {
    pub struct GatherDimensionNumbers in "gather" {
        offset_dims: ints,
        collapsed_slice_dims: ints,
        start_index_map: ints,
        index_vector_dim: int,
    }
}

record_attribute! {
    pub struct ScatterDimensionNumbers in "scatter" {
        update_window_dims: ints,
        inserted_window_dims: ints,
        scatter_dims_to_operand_dims: ints,
        index_vector_dim: int,
    }
}

record_attribute! {
    /// Upper bounds of the dynamic dimensions of a tensor type (used as
    /// tensor encoding).
    pub struct TypeExtensions in "type_extensions" {
        bounds: ints,
    }
}

dialect_attributes! {
    /// Attributes of the `mhlo` dialect.
    pub enum MhloAttr in "mhlo" {
        enums {
            ComparisonDirection,
            ComparisonType,
            CustomCallApiVersion,
            FftType,
            Precision,
            RngAlgorithm,
            RngDistribution,
            Transpose,
        }
        records {
            ChannelHandle,
            ConvDimensionNumbers,
            DotDimensionNumbers,
            GatherDimensionNumbers,
            ScatterDimensionNumbers,
            TypeExtensions,
        }
    }
}
