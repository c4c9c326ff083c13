mod common;

use std::fs;

use common::{fast_food_account, savings_account, setup_test_env, temp_base};
use finance_core::{
    config::Config,
    errors::LedgerError,
    storage::{load_session_from_path, save_session_to_path, Session, SessionBackend, TextStorage},
};

fn sample_session() -> Session {
    let accounts = vec![fast_food_account(), savings_account()];
    let outflows = fast_food_account().entries().cloned().collect();
    let inflows = savings_account().entries().cloned().collect();
    Session {
        accounts,
        inflows,
        outflows,
    }
}

#[test]
fn named_sessions_round_trip() {
    let (storage, _config) = setup_test_env();
    let session = sample_session();
    storage.save(&session, "Household 2015").expect("save");

    let path = storage.session_path("Household 2015");
    assert!(path.ends_with("sessions/household_2015.txt"));
    assert_eq!(storage.load("Household 2015").expect("load"), session);
}

#[test]
fn atomic_save_failure_preserves_original_file() {
    let base = temp_base();
    let path = base.join("ledger.txt");
    save_session_to_path(&sample_session(), &path).expect("initial save");
    let original = fs::read_to_string(&path).unwrap();

    // A directory at the temp path makes the temp file impossible to create.
    fs::create_dir_all(base.join("ledger.txt.tmp")).unwrap();
    assert!(save_session_to_path(&Session::default(), &path).is_err());

    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    assert_eq!(load_session_from_path(&path).unwrap(), sample_session());
}

#[test]
fn corrupt_files_surface_the_record() {
    let base = temp_base();
    let path = base.join("broken.txt");
    let mut text = finance_core::storage::codec::encode_session(&sample_session());
    text.push_str("ACCOUNTx{\"budgets\": {2015: {13: {}}}, \"name\": \"X\", \"is_saving\": null}\n");
    fs::write(&path, text).unwrap();

    let err = load_session_from_path(&path).unwrap_err();
    assert!(matches!(err, LedgerError::CorruptRecord { record: 5, .. }), "{err}");
}

#[test]
fn backups_rotate_with_configured_retention() {
    let (_, config_manager) = setup_test_env();
    let config = Config {
        backup_retention: 1,
        ..Config::default()
    };
    config_manager.save(&config).unwrap();

    let base = config_manager.path().parent().unwrap().to_path_buf();
    let storage = TextStorage::with_config(Some(base), &config_manager.load().unwrap()).unwrap();
    assert_eq!(storage.retention(), 1);

    let session = sample_session();
    storage.backup(&session, "trip", Some("first")).unwrap();
    let latest = storage.backup(&session, "trip", Some("second")).unwrap();
    assert_eq!(storage.list_backups("trip").unwrap(), vec![latest.clone()]);

    storage.save(&Session::default(), "trip").unwrap();
    let restored = storage.restore("trip", &latest).unwrap();
    assert_eq!(restored, session);
    assert_eq!(storage.load("trip").unwrap(), session);
}

#[test]
fn restoring_an_unknown_backup_fails() {
    let (storage, _config) = setup_test_env();
    assert!(matches!(
        storage.restore("trip", "trip_20200101_000000.txt"),
        Err(LedgerError::Storage(_))
    ));
}
