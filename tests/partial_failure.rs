use h5shift::container::{DataBlock, ElementType, Mode, Store};
use h5shift::engine::{Migration, MigrationMode, MigrationPlan};
use std::fs;
use tempfile::tempdir;

fn make_container(path: &std::path::Path, peer: &str) {
    let mut s = Store::open(path, Mode::Create).unwrap();
    s.create_group("/entry").unwrap();
    s.create_dataset("/entry/counts", &[2], ElementType::I64, None, None)
        .unwrap();
    s.write_all("/entry/counts", &DataBlock::I64(vec![1, 2]))
        .unwrap();
    s.create_external_link("/entry", "peer", peer, "/entry")
        .unwrap();
    s.close().unwrap();
}

/// File 2 of 3 is unreadable as a container; files 1 and 3 must still be
/// fully transferred and link-fixed, and the report must name exactly file 2.
#[test]
fn one_bad_file_does_not_abort_the_batch() {
    let td = tempdir().unwrap();
    make_container(&td.path().join("s_1.h5"), "s_2.h5");
    fs::write(td.path().join("s_2.h5"), b"this is not a container").unwrap();
    make_container(&td.path().join("s_3.h5"), "s_1.h5");

    let plan = MigrationPlan::build(td.path(), "s_", "t_", MigrationMode::Copy).unwrap();
    let report = Migration::run(plan, false, |_| true).unwrap().unwrap();

    assert_eq!(report.transferred, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].file, "s_2.h5");
    assert!(!report.is_success());

    // The survivors are complete and their mutual links are rewritten.
    let t1 = Store::open(td.path().join("t_1.h5"), Mode::Read).unwrap();
    assert_eq!(t1.external_link("/entry", "peer").unwrap().target_file, "t_2.h5");
    let t3 = Store::open(td.path().join("t_3.h5"), Mode::Read).unwrap();
    assert_eq!(t3.external_link("/entry", "peer").unwrap().target_file, "t_1.h5");
    assert_eq!(
        t3.read_all("/entry/counts").unwrap(),
        DataBlock::I64(vec![1, 2])
    );

    // The bad file produced no destination.
    assert!(!td.path().join("t_2.h5").exists());
}
