use h5shift::config::xml::load_config_from_xml_path;
use h5shift::config::LogLevel;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn full_config_round_trip() {
    let td = tempdir().unwrap();
    let p = td.path().join("config.xml");
    fs::write(
        &p,
        r#"<config>
  <log_level>info</log_level>
  <log_file>/var/log/h5shift.log</log_file>
  <assume_yes>true</assume_yes>
</config>
"#,
    )
    .unwrap();

    let cfg = load_config_from_xml_path(&p).unwrap();
    assert_eq!(cfg.log_level, LogLevel::Info);
    assert_eq!(cfg.log_file, Some(PathBuf::from("/var/log/h5shift.log")));
    assert!(cfg.assume_yes);
    assert!(!cfg.dry_run);
}

#[test]
fn whitespace_is_trimmed() {
    let td = tempdir().unwrap();
    let p = td.path().join("config.xml");
    fs::write(
        &p,
        "<config>\n  <log_level>  debug  </log_level>\n  <log_file>  /tmp/x.log  </log_file>\n</config>\n",
    )
    .unwrap();

    let cfg = load_config_from_xml_path(&p).unwrap();
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert_eq!(cfg.log_file, Some(PathBuf::from("/tmp/x.log")));
}

#[test]
fn malformed_xml_is_an_error() {
    let td = tempdir().unwrap();
    let p = td.path().join("config.xml");
    fs::write(&p, "<config><log_level>debug</config>").unwrap();
    assert!(load_config_from_xml_path(&p).is_err());
}
