use h5shift::container::{DataBlock, ElementType, Mode, Store};
use h5shift::engine::copy_dataset;
use tempfile::tempdir;

#[test]
fn f64_narrows_with_overflow_to_infinity() {
    let td = tempdir().unwrap();
    let mut src = Store::open(td.path().join("src.h5"), Mode::Create).unwrap();
    src.create_dataset("/v", &[2], ElementType::F64, None, None)
        .unwrap();
    src.write_all("/v", &DataBlock::F64(vec![1.5, 2.5e300]))
        .unwrap();

    let mut dst = Store::open(td.path().join("dst.h5"), Mode::Create).unwrap();
    copy_dataset(&src, &mut dst, "/v", true).unwrap();

    assert_eq!(dst.dataset("/v").unwrap().element_type, ElementType::F32);
    assert_eq!(
        dst.read_all("/v").unwrap(),
        DataBlock::F32(vec![1.5f32, f32::INFINITY])
    );
}

#[test]
fn i64_truncates_to_low_32_bits() {
    let td = tempdir().unwrap();
    let mut src = Store::open(td.path().join("src.h5"), Mode::Create).unwrap();
    src.create_dataset("/v", &[3], ElementType::I64, None, None)
        .unwrap();
    src.write_all("/v", &DataBlock::I64(vec![42, -1, 1 << 40]))
        .unwrap();

    let mut dst = Store::open(td.path().join("dst.h5"), Mode::Create).unwrap();
    copy_dataset(&src, &mut dst, "/v", true).unwrap();

    assert_eq!(
        dst.read_all("/v").unwrap(),
        DataBlock::I32(vec![42, -1, 0])
    );
}

#[test]
fn text_and_short_ints_copied_unchanged() {
    let td = tempdir().unwrap();
    let mut src = Store::open(td.path().join("src.h5"), Mode::Create).unwrap();
    src.create_dataset("/note", &[2], ElementType::Text, None, None)
        .unwrap();
    src.write_all(
        "/note",
        &DataBlock::Text(vec!["alpha".into(), "beta".into()]),
    )
    .unwrap();
    src.create_dataset("/short", &[2], ElementType::I16, None, None)
        .unwrap();
    src.write_all("/short", &DataBlock::I16(vec![-300, 300]))
        .unwrap();

    let mut dst = Store::open(td.path().join("dst.h5"), Mode::Create).unwrap();
    copy_dataset(&src, &mut dst, "/note", true).unwrap();
    copy_dataset(&src, &mut dst, "/short", true).unwrap();

    assert_eq!(dst.dataset("/note").unwrap().element_type, ElementType::Text);
    assert_eq!(dst.dataset("/short").unwrap().element_type, ElementType::I16);
    assert_eq!(
        dst.read_all("/note").unwrap(),
        DataBlock::Text(vec!["alpha".into(), "beta".into()])
    );
    assert_eq!(dst.read_all("/short").unwrap(), DataBlock::I16(vec![-300, 300]));
}

#[test]
fn downcast_off_keeps_64_bit_types() {
    let td = tempdir().unwrap();
    let mut src = Store::open(td.path().join("src.h5"), Mode::Create).unwrap();
    src.create_dataset("/v", &[1], ElementType::F64, None, None)
        .unwrap();
    src.write_all("/v", &DataBlock::F64(vec![2.5e300])).unwrap();

    let mut dst = Store::open(td.path().join("dst.h5"), Mode::Create).unwrap();
    copy_dataset(&src, &mut dst, "/v", false).unwrap();

    assert_eq!(dst.dataset("/v").unwrap().element_type, ElementType::F64);
    assert_eq!(dst.read_all("/v").unwrap(), DataBlock::F64(vec![2.5e300]));
}
