dialect_ops! {
    /// Operation kinds of the `mhlo` dialect.
    pub enum MhloOp in "mhlo" {
        Abs => "abs",
        Add => "add",
        AddDependency => "add_dependency",
        AfterAll => "after_all",
        AllGather => "all_gather",
        AllReduce => "all_reduce" [regions = 1],
        AllToAll => "all_to_all",
        And => "and",
        Atan2 => "atan2",
        BatchNormGrad => "batch_norm_grad",
        BatchNormInference => "batch_norm_inference",
        BatchNormTraining => "batch_norm_training",
        Bitcast => "bitcast",
        BitcastConvert => "bitcast_convert",
        Broadcast => "broadcast",
        BroadcastInDim => "broadcast_in_dim",
        Case => "case" [regions = variadic],
        Cbrt => "cbrt",
        Ceil => "ceil",
        Cholesky => "cholesky",
        Clamp => "clamp",
        CollectivePermute => "collective_permute",
        Compare => "compare",
        Complex => "complex",
        ComputeReshapeShape => "compute_reshape_shape",
        Concatenate => "concatenate",
        Constant => "constant",
        Convert => "convert",
        Convolution => "convolution",
        Copy => "copy",
        Cosine => "cosine",
        CountLeadingZeros => "count_leading_zeros",
        CreateToken => "create_token",
        CrossReplicaSum => "cross-replica-sum",
        CstrReshapable => "cstr_reshapable",
        CustomCall => "custom_call",
        Divide => "divide",
        Domain => "domain",
        Dot => "dot",
        DotGeneral => "dot_general",
        DynamicBroadcastInDim => "dynamic_broadcast_in_dim",
        DynamicConv => "dynamic_conv",
        DynamicGather => "dynamic_gather",
        DynamicIota => "dynamic_iota",
        DynamicPad => "dynamic_pad",
        DynamicReshape => "dynamic_reshape",
        DynamicSlice => "dynamic_slice",
        DynamicUpdateSlice => "dynamic_update_slice",
        Einsum => "einsum",
        Exponential => "exponential",
        ExponentialMinusOne => "exponential_minus_one",
        Fft => "fft",
        Floor => "floor",
        Fusion => "fusion" [regions = 1],
        Gather => "gather",
        GetDimensionSize => "get_dimension_size",
        GetTupleElement => "get_tuple_element",
        If => "if" [regions = 2],
        Imag => "imag",
        Infeed => "infeed",
        Iota => "iota",
        IsFinite => "is_finite",
        Log => "log",
        LogPlusOne => "log_plus_one",
        Logistic => "logistic",
        Map => "map" [regions = 1],
        Maximum => "maximum",
        Minimum => "minimum",
        Multiply => "multiply",
        Negate => "negate",
        Not => "not",
        OptimizationBarrier => "optimization_barrier",
        Or => "or",
        Outfeed => "outfeed",
        Pad => "pad",
        PopulationCount => "popcnt",
        Power => "power",
        Real => "real",
        RealDynamicSlice => "real_dynamic_slice",
        Recv => "recv",
        Reduce => "reduce" [regions = 1],
        ReducePrecision => "reduce_precision",
        ReduceScatter => "reduce_scatter" [regions = 1],
        ReduceWindow => "reduce_window" [regions = 1],
        Remainder => "remainder",
        ReplicaId => "replica_id",
        Reshape => "reshape",
        Return => "return",
        Reverse => "reverse",
        Rng => "rng",
        RngBitGenerator => "rng_bit_generator",
        RoundNearestAfz => "round_nearest_afz",
        Rsqrt => "rsqrt",
        Scatter => "scatter" [regions = 1],
        Select => "select",
        SelectAndScatter => "select_and_scatter" [regions = 2],
        Send => "send",
        SetDimensionSize => "set_dimension_size",
        ShiftLeft => "shift_left",
        ShiftRightArithmetic => "shift_right_arithmetic",
        ShiftRightLogical => "shift_right_logical",
        Sign => "sign",
        Sine => "sine",
        Slice => "slice",
        Sort => "sort" [regions = 1],
        Sqrt => "sqrt",
        StochasticConvert => "stochastic_convert",
        Subtract => "subtract",
        Tanh => "tanh",
        TorchIndexSelect => "torch_index_select",
        Trace => "trace",
        Transpose => "transpose",
        TriangularSolve => "triangular_solve",
        Tuple => "tuple",
        UnaryEinsum => "unary_einsum",
        UniformDequantize => "uniform_dequantize",
        UniformQuantize => "uniform_quantize",
        While => "while" [regions = 2],
        Xor => "xor",
        XlaRngGetAndUpdateState => "xla.rng_get_and_update_state",
    }
}
