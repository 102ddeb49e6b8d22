use h5shift::container::{Mode, Store};
use std::process::Command;
use tempfile::tempdir;

#[test]
fn links_subcommand_prints_sorted_target_files() {
    let td = tempdir().unwrap();
    let file = td.path().join("master.h5");
    let mut s = Store::open(&file, Mode::Create).unwrap();
    s.create_group("/entry/instrument").unwrap();
    s.create_external_link("/entry", "zdata", "zeta.h5", "/d").unwrap();
    s.create_external_link("/entry/instrument", "adata", "alpha.h5", "/d")
        .unwrap();
    s.close().unwrap();

    let me = assert_cmd::cargo::cargo_bin!("h5shift");
    let out = Command::new(me)
        .arg("links")
        .arg(&file)
        .output()
        .expect("spawn binary");
    assert!(out.status.success(), "links should succeed");

    let stdout = String::from_utf8_lossy(&out.stdout);
    let alpha = stdout.find("alpha.h5").expect("alpha.h5 listed");
    let zeta = stdout.find("zeta.h5").expect("zeta.h5 listed");
    assert!(alpha < zeta, "targets should be sorted: {stdout}");
}

#[test]
fn links_subcommand_fails_on_non_container() {
    let td = tempdir().unwrap();
    let file = td.path().join("plain.h5");
    std::fs::write(&file, b"not a container").unwrap();

    let me = assert_cmd::cargo::cargo_bin!("h5shift");
    let out = Command::new(me)
        .arg("links")
        .arg(&file)
        .output()
        .expect("spawn binary");
    assert!(!out.status.success(), "non-container must be an error");
}
