//! Element types, attribute values, and flat data blocks.
//! A dataset's payload is a flat vector in row-major order; slice I/O works on
//! hyperslabs expressed as (offset, count) per dimension and is implemented as
//! gather/scatter over contiguous runs along the last axis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use super::ContainerError;

/// Element type of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
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
    Text,
}

impl ElementType {
    /// Narrowing target under the fixed downcast policy: 64-bit floats become
    /// 32-bit floats, 64-bit signed integers become 32-bit signed integers,
    /// everything else is unchanged.
    pub fn downcast(self) -> ElementType {
        match self {
            ElementType::F64 => ElementType::F32,
            ElementType::I64 => ElementType::I32,
            other => other,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::Text => "text",
        };
        f.write_str(s)
    }
}

/// Attribute value attached to a group or dataset node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    TextList(Vec<String>),
}

/// Flat, typed payload for dataset I/O (row-major).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataBlock {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Text(Vec<String>),
}

/// Apply `$body` to the inner vector and rebuild the same variant.
macro_rules! map_block {
    ($block:expr, |$data:ident| $body:expr) => {
        match $block {
            DataBlock::I8($data) => DataBlock::I8($body),
            DataBlock::I16($data) => DataBlock::I16($body),
            DataBlock::I32($data) => DataBlock::I32($body),
            DataBlock::I64($data) => DataBlock::I64($body),
            DataBlock::U8($data) => DataBlock::U8($body),
            DataBlock::U16($data) => DataBlock::U16($body),
            DataBlock::U32($data) => DataBlock::U32($body),
            DataBlock::U64($data) => DataBlock::U64($body),
            DataBlock::F32($data) => DataBlock::F32($body),
            DataBlock::F64($data) => DataBlock::F64($body),
            DataBlock::Text($data) => DataBlock::Text($body),
        }
    };
}

impl DataBlock {
    /// A zero-filled block of `len` elements (empty strings for text).
    pub fn zeroed(ty: ElementType, len: usize) -> DataBlock {
        match ty {
            ElementType::I8 => DataBlock::I8(vec![0; len]),
            ElementType::I16 => DataBlock::I16(vec![0; len]),
            ElementType::I32 => DataBlock::I32(vec![0; len]),
            ElementType::I64 => DataBlock::I64(vec![0; len]),
            ElementType::U8 => DataBlock::U8(vec![0; len]),
            ElementType::U16 => DataBlock::U16(vec![0; len]),
            ElementType::U32 => DataBlock::U32(vec![0; len]),
            ElementType::U64 => DataBlock::U64(vec![0; len]),
            ElementType::F32 => DataBlock::F32(vec![0.0; len]),
            ElementType::F64 => DataBlock::F64(vec![0.0; len]),
            ElementType::Text => DataBlock::Text(vec![String::new(); len]),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            DataBlock::I8(_) => ElementType::I8,
            DataBlock::I16(_) => ElementType::I16,
            DataBlock::I32(_) => ElementType::I32,
            DataBlock::I64(_) => ElementType::I64,
            DataBlock::U8(_) => ElementType::U8,
            DataBlock::U16(_) => ElementType::U16,
            DataBlock::U32(_) => ElementType::U32,
            DataBlock::U64(_) => ElementType::U64,
            DataBlock::F32(_) => ElementType::F32,
            DataBlock::F64(_) => ElementType::F64,
            DataBlock::Text(_) => ElementType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DataBlock::I8(v) => v.len(),
            DataBlock::I16(v) => v.len(),
            DataBlock::I32(v) => v.len(),
            DataBlock::I64(v) => v.len(),
            DataBlock::U8(v) => v.len(),
            DataBlock::U16(v) => v.len(),
            DataBlock::U32(v) => v.len(),
            DataBlock::U64(v) => v.len(),
            DataBlock::F32(v) => v.len(),
            DataBlock::F64(v) => v.len(),
            DataBlock::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect the elements covered by `ranges` (linear indices) into a new
    /// block of the same type. Ranges must lie within the block.
    pub fn gather(&self, ranges: &[Range<usize>]) -> DataBlock {
        map_block!(self, |v| gather_runs(v, ranges))
    }

    /// Write this block's elements into `dst` at the linear `ranges`, in
    /// order. The total range length must equal `self.len()` and the types
    /// must match.
    pub fn scatter_into(
        &self,
        dst: &mut DataBlock,
        ranges: &[Range<usize>],
    ) -> Result<(), ContainerError> {
        let total: usize = ranges.iter().map(|r| r.len()).sum();
        if total != self.len() {
            return Err(ContainerError::ShapeMismatch {
                expected: total,
                found: self.len(),
            });
        }
        match (dst, self) {
            (DataBlock::I8(d), DataBlock::I8(s)) => scatter_runs(d, s, ranges),
            (DataBlock::I16(d), DataBlock::I16(s)) => scatter_runs(d, s, ranges),
            (DataBlock::I32(d), DataBlock::I32(s)) => scatter_runs(d, s, ranges),
            (DataBlock::I64(d), DataBlock::I64(s)) => scatter_runs(d, s, ranges),
            (DataBlock::U8(d), DataBlock::U8(s)) => scatter_runs(d, s, ranges),
            (DataBlock::U16(d), DataBlock::U16(s)) => scatter_runs(d, s, ranges),
            (DataBlock::U32(d), DataBlock::U32(s)) => scatter_runs(d, s, ranges),
            (DataBlock::U64(d), DataBlock::U64(s)) => scatter_runs(d, s, ranges),
            (DataBlock::F32(d), DataBlock::F32(s)) => scatter_runs(d, s, ranges),
            (DataBlock::F64(d), DataBlock::F64(s)) => scatter_runs(d, s, ranges),
            (DataBlock::Text(d), DataBlock::Text(s)) => scatter_runs(d, s, ranges),
            (d, s) => {
                return Err(ContainerError::TypeMismatch {
                    expected: d.element_type(),
                    found: s.element_type(),
                })
            }
        }
        Ok(())
    }

    /// Narrow 64-bit payloads per the fixed downcast policy.
    ///
    /// Conversion uses Rust `as` semantics: f64 -> f32 rounds to nearest and
    /// overflows to +/-inf beyond the f32 range; i64 -> i32 truncates to the
    /// low 32 bits. No saturation, no error.
    pub fn downcast(self) -> DataBlock {
        match self {
            DataBlock::F64(v) => DataBlock::F32(v.into_iter().map(|x| x as f32).collect()),
            DataBlock::I64(v) => DataBlock::I32(v.into_iter().map(|x| x as i32).collect()),
            other => other,
        }
    }
}

fn gather_runs<T: Clone>(data: &[T], ranges: &[Range<usize>]) -> Vec<T> {
    let total: usize = ranges.iter().map(|r| r.len()).sum();
    let mut out = Vec::with_capacity(total);
    for r in ranges {
        out.extend_from_slice(&data[r.clone()]);
    }
    out
}

fn scatter_runs<T: Clone>(dst: &mut [T], src: &[T], ranges: &[Range<usize>]) {
    let mut taken = 0usize;
    for r in ranges {
        let n = r.len();
        dst[r.clone()].clone_from_slice(&src[taken..taken + n]);
        taken += n;
    }
}

/// Number of elements in a shape (1 for a scalar / rank-0 shape).
pub fn element_count(shape: &[u64]) -> u64 {
    shape.iter().product()
}

/// Linear index ranges (contiguous runs along the last axis) covered by the
/// hyperslab `(offset, count)` of a row-major array with `shape`.
///
/// Runs are emitted in row-major order, so gather followed by scatter with the
/// same slab preserves element order.
pub fn slab_ranges(
    shape: &[u64],
    offset: &[u64],
    count: &[u64],
) -> Result<Vec<Range<usize>>, ContainerError> {
    if offset.len() != shape.len() || count.len() != shape.len() {
        return Err(ContainerError::RankMismatch {
            expected: shape.len(),
            found: offset.len().max(count.len()),
        });
    }
    for i in 0..shape.len() {
        if offset[i] + count[i] > shape[i] {
            return Err(ContainerError::OutOfBounds {
                offset: offset.to_vec(),
                count: count.to_vec(),
                shape: shape.to_vec(),
            });
        }
    }

    // Scalar dataset: a single element at linear index 0.
    if shape.is_empty() {
        return Ok(vec![0..1]);
    }
    if count.iter().any(|&c| c == 0) {
        return Ok(Vec::new());
    }

    // Row-major strides.
    let rank = shape.len();
    let mut stride = vec![1u64; rank];
    for i in (0..rank - 1).rev() {
        stride[i] = stride[i + 1] * shape[i + 1];
    }

    let run_len = count[rank - 1] as usize;
    let outer: u64 = count[..rank - 1].iter().product();
    let mut ranges = Vec::with_capacity(outer as usize);

    // Odometer over the leading dimensions; the last axis is one run.
    let mut coord = vec![0u64; rank - 1];
    loop {
        let mut start = offset[rank - 1] * stride[rank - 1];
        for i in 0..rank - 1 {
            start += (offset[i] + coord[i]) * stride[i];
        }
        let start = start as usize;
        ranges.push(start..start + run_len);

        // Advance the odometer; done when it wraps.
        let mut axis = rank - 1;
        loop {
            if axis == 0 {
                return Ok(ranges);
            }
            axis -= 1;
            coord[axis] += 1;
            if coord[axis] < count[axis] {
                break;
            }
            coord[axis] = 0;
        }
    }
}
