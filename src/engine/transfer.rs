//! Dataset transfer between containers.
//!
//! The destination dataset is created with the source's logical shape,
//! max-shape bound, and chunk layout, with the element type optionally
//! narrowed (f64 -> f32, i64 -> i32). Chunked datasets are moved one chunk
//! span at a time so memory stays bounded by the chunk size; unchunked
//! datasets move as a single block.

use anyhow::{Context, Result};
use tracing::{debug, trace};

use super::chunks::ChunkGrid;
use crate::container::Store;
use crate::errors::MigrateError;
use crate::shutdown;

/// Copy the dataset at `path` from `src` into `dst` at the same path.
/// Returns the number of slice transfers issued (1 for unchunked).
pub fn copy_dataset(src: &Store, dst: &mut Store, path: &str, downcast: bool) -> Result<u64> {
    let desc = src
        .dataset(path)
        .with_context(|| format!("describe source dataset '{path}'"))?;
    let out_type = if downcast {
        desc.element_type.downcast()
    } else {
        desc.element_type
    };

    dst.create_dataset(
        path,
        &desc.shape,
        out_type,
        desc.chunk_shape.as_deref(),
        desc.max_shape.as_deref(),
    )
    .with_context(|| format!("create destination dataset '{path}'"))?;

    // Dataset attributes ride along with the leaf.
    for name in src.attr_names(path)? {
        let value = src.get_attr(path, &name)?;
        dst.set_attr(path, &name, value)?;
    }

    let ops = match &desc.chunk_shape {
        Some(chunk) => {
            let grid = ChunkGrid::new(&desc.shape, chunk);
            let expected = grid.span_count();
            debug!(path, spans = expected, "chunked transfer");
            let mut ops = 0u64;
            for span in grid {
                if shutdown::is_requested() {
                    return Err(MigrateError::Interrupted.into());
                }
                let block = src
                    .read_slice(path, &span.offset, &span.count)
                    .with_context(|| format!("read chunk {:?} of '{path}'", span.offset))?;
                let block = if downcast { block.downcast() } else { block };
                dst.write_slice(path, &span.offset, &span.count, &block)
                    .with_context(|| format!("write chunk {:?} of '{path}'", span.offset))?;
                ops += 1;
                trace!(path, offset = ?span.offset, "chunk transferred");
            }
            ops
        }
        None => {
            let block = src
                .read_all(path)
                .with_context(|| format!("read dataset '{path}'"))?;
            let block = if downcast { block.downcast() } else { block };
            dst.write_all(path, &block)
                .with_context(|| format!("write dataset '{path}'"))?;
            1
        }
    };
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{DataBlock, ElementType, Mode};
    use tempfile::tempdir;

    fn pair() -> (tempfile::TempDir, Store, Store) {
        let td = tempdir().unwrap();
        let src = Store::open(td.path().join("src.h5"), Mode::Create).unwrap();
        let dst = Store::open(td.path().join("dst.h5"), Mode::Create).unwrap();
        (td, src, dst)
    }

    #[test]
    fn unchunked_is_one_op() {
        let (_td, mut src, mut dst) = pair();
        src.create_dataset("/d", &[3], ElementType::F64, None, None)
            .unwrap();
        src.write_all("/d", &DataBlock::F64(vec![1.5, 2.5e300, -3.0]))
            .unwrap();

        let ops = copy_dataset(&src, &mut dst, "/d", true).unwrap();
        assert_eq!(ops, 1);
        assert_eq!(
            dst.read_all("/d").unwrap(),
            DataBlock::F32(vec![1.5, f32::INFINITY, -3.0])
        );
    }

    #[test]
    fn chunked_issues_one_op_per_chunk() {
        let (_td, mut src, mut dst) = pair();
        src.create_dataset("/grid", &[100, 100], ElementType::I64, Some(&[10, 10]), None)
            .unwrap();
        let data: Vec<i64> = (0..10_000).collect();
        src.write_all("/grid", &DataBlock::I64(data.clone())).unwrap();

        let ops = copy_dataset(&src, &mut dst, "/grid", true).unwrap();
        assert_eq!(ops, 100);

        let expected: Vec<i32> = data.iter().map(|&v| v as i32).collect();
        assert_eq!(dst.read_all("/grid").unwrap(), DataBlock::I32(expected));

        let desc = dst.dataset("/grid").unwrap();
        assert_eq!(desc.chunk_shape, Some(vec![10, 10]));
        assert_eq!(desc.element_type, ElementType::I32);
    }

    #[test]
    fn non_target_types_pass_through() {
        let (_td, mut src, mut dst) = pair();
        src.create_dataset("/s", &[2], ElementType::I16, None, None)
            .unwrap();
        src.write_all("/s", &DataBlock::I16(vec![-5, 5])).unwrap();
        src.create_dataset("/t", &[1], ElementType::Text, None, None)
            .unwrap();
        src.write_all("/t", &DataBlock::Text(vec!["sample".into()]))
            .unwrap();

        copy_dataset(&src, &mut dst, "/s", true).unwrap();
        copy_dataset(&src, &mut dst, "/t", true).unwrap();
        assert_eq!(dst.read_all("/s").unwrap(), DataBlock::I16(vec![-5, 5]));
        assert_eq!(
            dst.read_all("/t").unwrap(),
            DataBlock::Text(vec!["sample".into()])
        );
    }

    #[test]
    fn max_shape_and_attrs_preserved() {
        let (_td, mut src, mut dst) = pair();
        src.create_dataset(
            "/frames",
            &[4, 2],
            ElementType::U16,
            Some(&[2, 2]),
            Some(&[None, Some(2)]),
        )
        .unwrap();
        src.set_attr(
            "/frames",
            "units",
            crate::container::AttrValue::Text("counts".into()),
        )
        .unwrap();

        copy_dataset(&src, &mut dst, "/frames", false).unwrap();
        let desc = dst.dataset("/frames").unwrap();
        assert_eq!(desc.max_shape, Some(vec![None, Some(2)]));
        assert_eq!(
            dst.get_attr("/frames", "units").unwrap(),
            crate::container::AttrValue::Text("counts".into())
        );
    }
}
