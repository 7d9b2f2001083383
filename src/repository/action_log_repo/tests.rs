use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_test_log(action_type: ActionType, checklist_id: i64, minute: u32) -> ActionLog {
    let ts = NaiveDate::from_ymd_opt(2025, 12, 22)
        .unwrap()
        .and_hms_opt(8, minute, 0)
        .unwrap();
    ActionLog::new(action_type, "inspector01", ts)
        .with_checklist(checklist_id, &format!("KBA251222{:04}", checklist_id))
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = make_test_log(ActionType::CreateChecklist, 1, 0)
        .with_payload(&json!({ "fg_code": "FG001" }))
        .with_detail("创建点检表");
    let id = repo.insert(&log).unwrap();

    let found = repo.find_by_id(&id).unwrap().expect("日志应存在");
    assert_eq!(found.action_type, "CreateChecklist");
    assert_eq!(found.checklist_id, Some(1));
    assert_eq!(found.inspect_code.as_deref(), Some("KBA2512220001"));
    assert_eq!(found.payload_json, Some(json!({ "fg_code": "FG001" })));
    assert_eq!(found.detail.as_deref(), Some("创建点检表"));
    assert_eq!(found.action_ts, log.action_ts);
}

#[test]
fn test_find_by_id_missing() {
    let repo = ActionLogRepository::new(setup_test_db());
    assert!(repo.find_by_id("nope").unwrap().is_none());
}

#[test]
fn test_find_by_checklist_newest_first() {
    let repo = ActionLogRepository::new(setup_test_db());

    repo.insert(&make_test_log(ActionType::CreateChecklist, 1, 0)).unwrap();
    repo.insert(&make_test_log(ActionType::SaveInspection, 1, 5)).unwrap();
    repo.insert(&make_test_log(ActionType::CreateChecklist, 2, 6)).unwrap();

    let logs = repo.find_by_checklist(1).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action_type, "SaveInspection");
    assert_eq!(repo.count_by_checklist(1).unwrap(), 2);
}

#[test]
fn test_find_by_action_type_and_recent() {
    let repo = ActionLogRepository::new(setup_test_db());

    for i in 1..=4 {
        repo.insert(&make_test_log(ActionType::SaveInspection, i, i as u32)).unwrap();
    }
    repo.insert(&make_test_log(ActionType::DeleteChecklist, 9, 30)).unwrap();

    assert_eq!(repo.find_by_action_type("SaveInspection", 10).unwrap().len(), 4);
    let recent = repo.find_recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].action_type, "DeleteChecklist");
}
