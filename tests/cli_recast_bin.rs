use h5shift::container::{DataBlock, ElementType, Mode, Store};
use std::process::Command;
use tempfile::tempdir;

#[test]
fn recast_narrows_and_keeps_structure() {
    let td = tempdir().unwrap();
    let input = td.path().join("wide.h5");
    let output = td.path().join("narrow.h5");

    let mut s = Store::open(&input, Mode::Create).unwrap();
    s.create_group("/entry").unwrap();
    s.create_dataset("/entry/angles", &[3], ElementType::F64, None, None)
        .unwrap();
    s.write_all("/entry/angles", &DataBlock::F64(vec![0.5, 1.5, 2.5e300]))
        .unwrap();
    s.create_dataset("/entry/ids", &[2], ElementType::U16, None, None)
        .unwrap();
    s.write_all("/entry/ids", &DataBlock::U16(vec![7, 8])).unwrap();
    s.close().unwrap();

    let me = assert_cmd::cargo::cargo_bin!("h5shift");
    let out = Command::new(me)
        .arg("recast")
        .arg(&input)
        .arg(&output)
        .arg("--yes")
        .output()
        .expect("spawn binary");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let narrow = Store::open(&output, Mode::Read).unwrap();
    assert_eq!(
        narrow.dataset("/entry/angles").unwrap().element_type,
        ElementType::F32
    );
    assert_eq!(
        narrow.read_all("/entry/angles").unwrap(),
        DataBlock::F32(vec![0.5, 1.5, f32::INFINITY])
    );
    // Non-64-bit payloads ride through unchanged.
    assert_eq!(narrow.read_all("/entry/ids").unwrap(), DataBlock::U16(vec![7, 8]));

    // The source is untouched.
    let wide = Store::open(&input, Mode::Read).unwrap();
    assert_eq!(
        wide.dataset("/entry/angles").unwrap().element_type,
        ElementType::F64
    );
}

#[test]
fn recast_declined_on_stdin_n() {
    let td = tempdir().unwrap();
    let input = td.path().join("wide.h5");
    let output = td.path().join("narrow.h5");
    Store::open(&input, Mode::Create).unwrap().close().unwrap();

    let me = assert_cmd::cargo::cargo_bin!("h5shift");
    let mut child = Command::new(me)
        .arg("recast")
        .arg(&input)
        .arg(&output)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::null())
        .spawn()
        .expect("spawn binary");
    use std::io::Write;
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"n\n")
        .expect("write stdin");
    let status = child.wait().expect("wait for binary");
    assert!(status.success(), "a declined recast is not an error");
    assert!(!output.exists());
}
