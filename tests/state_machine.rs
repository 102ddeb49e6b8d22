use h5shift::engine::{Migration, MigrationMode, MigrationPlan, MigrationState};
use h5shift::MigrateError;
use std::fs;
use tempfile::tempdir;

fn plan_in(dir: &std::path::Path) -> MigrationPlan {
    fs::write(dir.join("a_1.run"), b"x").unwrap();
    MigrationPlan::build(dir, "a_", "b_", MigrationMode::InPlace).unwrap()
}

#[test]
fn phases_must_run_in_order() {
    let td = tempdir().unwrap();
    let mut m = Migration::new(plan_in(td.path()), false);
    assert_eq!(*m.state(), MigrationState::Planned);

    // Transfer before confirmation is a state error.
    let err = m.transfer_files().unwrap_err();
    assert!(matches!(err, MigrateError::BadState { .. }));
    assert_eq!(err.code(), "bad_state");

    assert!(m.confirm_with(|_| true).unwrap());
    assert_eq!(*m.state(), MigrationState::Confirmed);

    // Link fixing before the transfer phase is a state error too.
    let err = m.fix_links().unwrap_err();
    assert!(matches!(err, MigrateError::BadState { .. }));

    m.transfer_files().unwrap();
    assert_eq!(*m.state(), MigrationState::FilesTransferred);
    m.fix_links().unwrap();
    assert_eq!(*m.state(), MigrationState::LinksFixed);

    let report = m.finish();
    assert!(report.is_success());
    assert_eq!(report.transferred, 1);
}

#[test]
fn declined_confirmation_absorbs_into_failed() {
    let td = tempdir().unwrap();
    let mut m = Migration::new(plan_in(td.path()), false);
    assert!(!m.confirm_with(|_| false).unwrap());
    assert!(matches!(m.state(), MigrationState::Failed(_)));

    // Failed is absorbing: no phase can run from it.
    let err = m.transfer_files().unwrap_err();
    assert!(matches!(err, MigrateError::BadState { .. }));
}

#[test]
fn confirm_twice_is_rejected() {
    let td = tempdir().unwrap();
    let mut m = Migration::new(plan_in(td.path()), false);
    assert!(m.confirm_with(|_| true).unwrap());
    let err = m.confirm_with(|_| true).unwrap_err();
    assert!(matches!(err, MigrateError::BadState { .. }));
}
