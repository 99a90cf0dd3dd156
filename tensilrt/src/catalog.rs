//! Catalog of the tensor operation surface and how each entry is served.

use std::fmt;

use crate::sys::Symbols;

/// Native entry point serving an implemented operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeOp {
    Empty,
    Zeros,
    Ones,
    Full,
    Arange,
    ArangeF64,
    FromBlob,
    Stack,
    To,
    Get,
    Reshape,
    Softmax,
    ArgMax,
    ArgMaxDim,
    ArgMin,
    ArgMinDim,
    ArgSort,
    Sort,
    Permute,
    Transpose,
    ContentEqual,
    SubScalar,
    DivScalar,
    SplitSections,
    SplitIndices,
    Squeeze,
    SqueezeDim,
    Unsqueeze,
    Neg,
    Unary(UnaryKind),
    Compare(CompareKind),
    Normalize,
    Resize,
    ToTensor,
    DataView,
}

impl NativeOp {
    pub fn symbol(self) -> &'static str {
        match self {
            NativeOp::Empty => "tensil_tensor_empty",
            NativeOp::Zeros => "tensil_tensor_zeros",
            NativeOp::Ones => "tensil_tensor_ones",
            NativeOp::Full => "tensil_tensor_full",
            NativeOp::Arange => "tensil_tensor_arange",
            NativeOp::ArangeF64 => "tensil_tensor_arange_f64",
            NativeOp::FromBlob => "tensil_tensor_from_blob",
            NativeOp::Stack => "tensil_tensor_stack",
            NativeOp::To => "tensil_tensor_to",
            NativeOp::Get => "tensil_tensor_get",
            NativeOp::Reshape => "tensil_tensor_reshape",
            NativeOp::Softmax => "tensil_tensor_softmax",
            NativeOp::ArgMax => "tensil_tensor_argmax",
            NativeOp::ArgMaxDim => "tensil_tensor_argmax_dim",
            NativeOp::ArgMin => "tensil_tensor_argmin",
            NativeOp::ArgMinDim => "tensil_tensor_argmin_dim",
            NativeOp::ArgSort => "tensil_tensor_argsort",
            NativeOp::Sort => "tensil_tensor_sort",
            NativeOp::Permute => "tensil_tensor_permute",
            NativeOp::Transpose => "tensil_tensor_transpose",
            NativeOp::ContentEqual => "tensil_tensor_content_equal",
            NativeOp::SubScalar => "tensil_tensor_sub_scalar",
            NativeOp::DivScalar => "tensil_tensor_div_scalar",
            NativeOp::SplitSections => "tensil_tensor_split_sections",
            NativeOp::SplitIndices => "tensil_tensor_split_indices",
            NativeOp::Squeeze => "tensil_tensor_squeeze",
            NativeOp::SqueezeDim => "tensil_tensor_squeeze_dim",
            NativeOp::Unsqueeze => "tensil_tensor_unsqueeze",
            NativeOp::Neg => "tensil_tensor_neg",
            NativeOp::Unary(kind) => kind.symbol(),
            NativeOp::Compare(kind) => kind.symbol(),
            NativeOp::Normalize => "tensil_tensor_normalize",
            NativeOp::Resize => "tensil_tensor_resize",
            NativeOp::ToTensor => "tensil_tensor_to_tensor",
            NativeOp::DataView => "tensil_tensor_data_view",
        }
    }
}

type UnaryFn = unsafe extern "C" fn(i64) -> i64;
type BinaryFn = unsafe extern "C" fn(i64, i64) -> i64;

macro_rules! kinds {
    ($kind:ident, $fn_ty:ty, { $($variant:ident => $field:ident),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $kind {
            $($variant),*
        }

        impl $kind {
            pub const ALL: &'static [$kind] = &[$($kind::$variant),*];

            pub fn name(self) -> &'static str {
                match self {
                    $($kind::$variant => stringify!($field)),*
                }
            }

            pub fn symbol(self) -> &'static str {
                match self {
                    $($kind::$variant => concat!("tensil_tensor_", stringify!($field))),*
                }
            }

            pub(crate) fn entry(self, symbols: &Symbols) -> $fn_ty {
                match self {
                    $($kind::$variant => symbols.$field),*
                }
            }
        }
    };
}

kinds!(UnaryKind, UnaryFn, {
    Abs => abs,
    Sqrt => sqrt,
    Floor => floor,
    Ceil => ceil,
    Round => round,
    Trunc => trunc,
    Exp => exp,
    Log => log,
    Log10 => log10,
    Log2 => log2,
    Sin => sin,
    Cos => cos,
    Tan => tan,
    Asin => asin,
    Acos => acos,
    Atan => atan,
    Sinh => sinh,
    Cosh => cosh,
    Tanh => tanh,
    All => all,
    Any => any,
    NoneOf => none,
});

kinds!(CompareKind, BinaryFn, {
    Eq => eq,
    Neq => neq,
    Gt => gt,
    Gte => gte,
    Lt => lt,
    Lte => lte,
});

/// How a catalog entry is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpSupport {
    Implemented(NativeOp),
    Unsupported(&'static str),
}

impl OpSupport {
    pub fn is_implemented(self) -> bool {
        matches!(self, OpSupport::Implemented(_))
    }
}

const NO_KERNEL: &str = "no native kernel is bound for this operation";
const NO_INPLACE: &str = "in-place arithmetic is not supported";
const NO_SPARSE: &str = "sparse layout conversion is not supported";
const NO_MUTATION: &str = "element assignment is not supported";

macro_rules! tensor_ops {
    (
        implemented { $($imp:ident => $iname:literal: $native:expr),* $(,)? }
        unsupported { $($uns:ident => $uname:literal: $reason:expr),* $(,)? }
    ) => {
        /// Every operation of the tensor surface.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TensorOp {
            $($imp,)*
            $($uns,)*
        }

        impl TensorOp {
            pub const ALL: &'static [TensorOp] = &[$(TensorOp::$imp,)* $(TensorOp::$uns,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(TensorOp::$imp => $iname,)*
                    $(TensorOp::$uns => $uname,)*
                }
            }

            pub fn support(self) -> OpSupport {
                match self {
                    $(TensorOp::$imp => OpSupport::Implemented($native),)*
                    $(TensorOp::$uns => OpSupport::Unsupported($reason),)*
                }
            }
        }
    };
}

tensor_ops! {
    implemented {
        ToDevice => "to_device": NativeOp::To,
        ToDtype => "to_dtype": NativeOp::To,
        ToBytes => "to_bytes": NativeOp::DataView,
        Get => "get": NativeOp::Get,
        ContentEquals => "content_equals": NativeOp::ContentEqual,
        Eq => "eq": NativeOp::Compare(CompareKind::Eq),
        Neq => "neq": NativeOp::Compare(CompareKind::Neq),
        Gt => "gt": NativeOp::Compare(CompareKind::Gt),
        Gte => "gte": NativeOp::Compare(CompareKind::Gte),
        Lt => "lt": NativeOp::Compare(CompareKind::Lt),
        Lte => "lte": NativeOp::Compare(CompareKind::Lte),
        SubScalar => "sub_scalar": NativeOp::SubScalar,
        DivScalar => "div_scalar": NativeOp::DivScalar,
        All => "all": NativeOp::Unary(UnaryKind::All),
        Any => "any": NativeOp::Unary(UnaryKind::Any),
        NoneOf => "none": NativeOp::Unary(UnaryKind::NoneOf),
        Neg => "neg": NativeOp::Neg,
        Negi => "negi": NativeOp::Neg,
        Abs => "abs": NativeOp::Unary(UnaryKind::Abs),
        Sqrt => "sqrt": NativeOp::Unary(UnaryKind::Sqrt),
        Floor => "floor": NativeOp::Unary(UnaryKind::Floor),
        Ceil => "ceil": NativeOp::Unary(UnaryKind::Ceil),
        Round => "round": NativeOp::Unary(UnaryKind::Round),
        Trunc => "trunc": NativeOp::Unary(UnaryKind::Trunc),
        Exp => "exp": NativeOp::Unary(UnaryKind::Exp),
        Log => "log": NativeOp::Unary(UnaryKind::Log),
        Log10 => "log10": NativeOp::Unary(UnaryKind::Log10),
        Log2 => "log2": NativeOp::Unary(UnaryKind::Log2),
        Sin => "sin": NativeOp::Unary(UnaryKind::Sin),
        Cos => "cos": NativeOp::Unary(UnaryKind::Cos),
        Tan => "tan": NativeOp::Unary(UnaryKind::Tan),
        Asin => "asin": NativeOp::Unary(UnaryKind::Asin),
        Acos => "acos": NativeOp::Unary(UnaryKind::Acos),
        Atan => "atan": NativeOp::Unary(UnaryKind::Atan),
        Sinh => "sinh": NativeOp::Unary(UnaryKind::Sinh),
        Cosh => "cosh": NativeOp::Unary(UnaryKind::Cosh),
        Tanh => "tanh": NativeOp::Unary(UnaryKind::Tanh),
        SplitSections => "split_sections": NativeOp::SplitSections,
        SplitIndices => "split_indices": NativeOp::SplitIndices,
        Reshape => "reshape": NativeOp::Reshape,
        ExpandDims => "expand_dims": NativeOp::Unsqueeze,
        Squeeze => "squeeze": NativeOp::Squeeze,
        SqueezeAxis => "squeeze_axis": NativeOp::SqueezeDim,
        ArgSort => "arg_sort": NativeOp::ArgSort,
        Sort => "sort": NativeOp::Sort,
        SortAxis => "sort_axis": NativeOp::Sort,
        Softmax => "softmax": NativeOp::Softmax,
        SwapAxes => "swap_axes": NativeOp::Transpose,
        Transpose => "transpose": NativeOp::Permute,
        Permute => "permute": NativeOp::Permute,
        ArgMax => "arg_max": NativeOp::ArgMax,
        ArgMaxAxis => "arg_max_axis": NativeOp::ArgMaxDim,
        ArgMin => "arg_min": NativeOp::ArgMin,
        ArgMinAxis => "arg_min_axis": NativeOp::ArgMinDim,
        Stack => "stack": NativeOp::Stack,
        Normalize => "normalize": NativeOp::Normalize,
        Resize => "resize": NativeOp::Resize,
        ToChwTensor => "to_chw_tensor": NativeOp::ToTensor,
    }
    unsupported {
        Add => "add": NO_KERNEL,
        Sub => "sub": NO_KERNEL,
        Mul => "mul": NO_KERNEL,
        Div => "div": NO_KERNEL,
        Rem => "rem": NO_KERNEL,
        Pow => "pow": NO_KERNEL,
        AddScalar => "add_scalar": NO_KERNEL,
        MulScalar => "mul_scalar": NO_KERNEL,
        RemScalar => "rem_scalar": NO_KERNEL,
        PowScalar => "pow_scalar": NO_KERNEL,
        AddInPlace => "addi": NO_INPLACE,
        SubInPlace => "subi": NO_INPLACE,
        MulInPlace => "muli": NO_INPLACE,
        DivInPlace => "divi": NO_INPLACE,
        RemInPlace => "remi": NO_INPLACE,
        PowInPlace => "powi": NO_INPLACE,
        AddScalarInPlace => "addi_scalar": NO_INPLACE,
        SubScalarInPlace => "subi_scalar": NO_INPLACE,
        MulScalarInPlace => "muli_scalar": NO_INPLACE,
        DivScalarInPlace => "divi_scalar": NO_INPLACE,
        RemScalarInPlace => "remi_scalar": NO_INPLACE,
        PowScalarInPlace => "powi_scalar": NO_INPLACE,
        Maximum => "maximum": NO_KERNEL,
        Minimum => "minimum": NO_KERNEL,
        Square => "square": NO_KERNEL,
        Cbrt => "cbrt": NO_KERNEL,
        Asinh => "asinh": NO_KERNEL,
        Acosh => "acosh": NO_KERNEL,
        Atanh => "atanh": NO_KERNEL,
        ToDegrees => "to_degrees": NO_KERNEL,
        ToRadians => "to_radians": NO_KERNEL,
        Max => "max": NO_KERNEL,
        MaxAxes => "max_axes": NO_KERNEL,
        Min => "min": NO_KERNEL,
        MinAxes => "min_axes": NO_KERNEL,
        Sum => "sum": NO_KERNEL,
        SumAxes => "sum_axes": NO_KERNEL,
        Prod => "prod": NO_KERNEL,
        ProdAxes => "prod_axes": NO_KERNEL,
        Mean => "mean": NO_KERNEL,
        MeanAxes => "mean_axes": NO_KERNEL,
        Trace => "trace": NO_KERNEL,
        Flatten => "flatten": NO_KERNEL,
        SqueezeAxes => "squeeze_axes": NO_KERNEL,
        LogicalAnd => "logical_and": NO_KERNEL,
        LogicalOr => "logical_or": NO_KERNEL,
        LogicalXor => "logical_xor": NO_KERNEL,
        LogicalNot => "logical_not": NO_KERNEL,
        LogSoftmax => "log_softmax": NO_KERNEL,
        CumSum => "cum_sum": NO_KERNEL,
        IsInfinite => "is_infinite": NO_KERNEL,
        IsNan => "is_nan": NO_KERNEL,
        Tile => "tile": NO_KERNEL,
        Repeat => "repeat": NO_KERNEL,
        Dot => "dot": NO_KERNEL,
        Clip => "clip": NO_KERNEL,
        Broadcast => "broadcast": NO_KERNEL,
        Percentile => "percentile": NO_KERNEL,
        Median => "median": NO_KERNEL,
        ToDense => "to_dense": NO_SPARSE,
        ToSparse => "to_sparse": NO_SPARSE,
        Nonzero => "nonzero": NO_KERNEL,
        ZerosLike => "zeros_like": NO_KERNEL,
        OnesLike => "ones_like": NO_KERNEL,
        Set => "set": NO_MUTATION,
        CopyTo => "copy_to": NO_MUTATION,
        BooleanMask => "boolean_mask": NO_KERNEL,
        ContentEqualsScalar => "content_equals_scalar": NO_KERNEL,
        ToMatrix => "to_matrix": NO_KERNEL,
        Gradient => "gradient": "autograd is not supported",
    }
}

impl fmt::Display for TensorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn implemented_entries_name_bound_symbols() {
        for op in TensorOp::ALL {
            if let OpSupport::Implemented(native) = op.support() {
                assert!(
                    Symbols::contains(native.symbol()),
                    "{op} maps to unbound symbol {}",
                    native.symbol()
                );
            }
        }
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = TensorOp::ALL.iter().map(|op| op.name()).collect();
        assert_eq!(names.len(), TensorOp::ALL.len());
    }

    #[test]
    fn kind_tables_cover_their_symbols() {
        for kind in UnaryKind::ALL {
            assert!(Symbols::contains(kind.symbol()));
        }
        for kind in CompareKind::ALL {
            assert!(Symbols::contains(kind.symbol()));
        }
        assert_eq!(UnaryKind::NoneOf.name(), "none");
    }

    #[test]
    fn square_is_a_placeholder() {
        assert!(!TensorOp::Square.support().is_implemented());
        assert!(TensorOp::Sqrt.support().is_implemented());
    }
}
