//! Numeric value kinds and the typed dispatch helper.
//!
//! Attribute slots hold one of ten builtin numeric types. Components that
//! must read a value whose type is only known at runtime (the score floor,
//! the join-key path) go through [`ValueKind`] and the [`for_value_kind!`]
//! macro instead of hand-rolling a switch per call site.

use serde::{Deserialize, Serialize};

/// Rank score type. All attribute kinds coerce into it.
pub type Score = f64;

/// Runtime tag for the builtin numeric types an attribute column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::I8 => "i8",
            ValueKind::I16 => "i16",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::U8 => "u8",
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::U64 => "u64",
            ValueKind::F32 => "f32",
            ValueKind::F64 => "f64",
        }
    }
}

/// Sort orientation for one sort expression.
///
/// Ascending means a smaller value ranks better; the "worse" side of a
/// remembered score floor is therefore the larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortFlag {
    Ascending,
    #[default]
    Descending,
}

impl SortFlag {
    pub fn is_ascending(&self) -> bool {
        matches!(self, SortFlag::Ascending)
    }
}

/// A numeric type an attribute column can be declared over.
pub trait AttrValue: Copy + Default + PartialOrd + std::fmt::Debug + 'static {
    const KIND: ValueKind;

    /// Coerce into the rank score domain.
    fn to_score(self) -> Score;

    /// Stable 64-bit image used as a hash-join key.
    fn key_bits(self) -> u64;
}

macro_rules! impl_attr_value_int {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl AttrValue for $ty {
            const KIND: ValueKind = ValueKind::$kind;

            fn to_score(self) -> Score {
                self as Score
            }

            fn key_bits(self) -> u64 {
                // sign-extend so -1i8 and -1i64 hash alike
                self as i64 as u64
            }
        }
    )*};
}

impl_attr_value_int!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
);

impl AttrValue for f32 {
    const KIND: ValueKind = ValueKind::F32;

    fn to_score(self) -> Score {
        self as Score
    }

    fn key_bits(self) -> u64 {
        u64::from(self.to_bits())
    }
}

impl AttrValue for f64 {
    const KIND: ValueKind = ValueKind::F64;

    fn to_score(self) -> Score {
        self
    }

    fn key_bits(self) -> u64 {
        self.to_bits()
    }
}

/// Expands `$body` once per builtin kind with `$ty` aliased to the concrete
/// type matching `$kind`.
///
/// ```rust
/// use rank_types::{for_value_kind, ValueKind};
///
/// let kind = ValueKind::U16;
/// let width = for_value_kind!(kind, T => std::mem::size_of::<T>());
/// assert_eq!(width, 2);
/// ```
#[macro_export]
macro_rules! for_value_kind {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            $crate::ValueKind::I8 => {
                type $ty = i8;
                $body
            }
            $crate::ValueKind::I16 => {
                type $ty = i16;
                $body
            }
            $crate::ValueKind::I32 => {
                type $ty = i32;
                $body
            }
            $crate::ValueKind::I64 => {
                type $ty = i64;
                $body
            }
            $crate::ValueKind::U8 => {
                type $ty = u8;
                $body
            }
            $crate::ValueKind::U16 => {
                type $ty = u16;
                $body
            }
            $crate::ValueKind::U32 => {
                type $ty = u32;
                $body
            }
            $crate::ValueKind::U64 => {
                type $ty = u64;
                $body
            }
            $crate::ValueKind::F32 => {
                type $ty = f32;
                $body
            }
            $crate::ValueKind::F64 => {
                type $ty = f64;
                $body
            }
        }
    };
}
