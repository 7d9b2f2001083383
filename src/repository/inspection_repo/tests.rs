use super::InspectionRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::checklist::NewChecklist;
use crate::domain::inspection::{HeaderUpdate, InspectionBatch, PreparedMeasurement, PreparedRecord};
use crate::domain::types::{MeasurementKind, Shift};
use crate::repository::error::RepositoryError;
use crate::repository::{ActionLogRepository, ChecklistRepository};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn ts(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 12, 22)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn create_checklist(conn: &Arc<Mutex<Connection>>) -> i64 {
    let repo = ChecklistRepository::new(conn.clone());
    repo.insert_with_allocated_code::<RepositoryError, _>(|_| {
        Ok(Some(
            NewChecklist {
                fg_code: "FG001".into(),
                item_name: "Shrink Film".into(),
                customer: "ACME".into(),
                plant: "KB".into(),
                process: "BLOW".into(),
                machine_zone: "A".into(),
                ..Default::default()
            }
            .into_checklist("KBA2512220001".into(), ts(8, 0), None),
        ))
    })
    .unwrap()
    .expect("创建失败")
    .checklist_id
}

fn measurement(param: &str, value: &str, is_pass: bool, is_fail: bool) -> PreparedMeasurement {
    PreparedMeasurement {
        parameter_id: param.to_string(),
        parameter_name: format!("name-{}", param),
        kind: MeasurementKind::Number,
        value: Some(value.to_string()),
        numeric_value: value.parse().ok(),
        unit: Some("mm".to_string()),
        pass_fail_value: None,
        is_pass,
        is_fail,
        min_value: Some(1.0),
        max_value: Some(3.0),
        standard_value: Some(2.0),
    }
}

fn record(shift: Shift, hour: u32, measurements: Vec<PreparedMeasurement>) -> PreparedRecord {
    PreparedRecord {
        shift,
        inspection_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        note: Some(format!("LOT-{}", hour)),
        measurements,
    }
}

fn batch(checklist_id: i64, remark: &str, records: Vec<PreparedRecord>) -> InspectionBatch {
    InspectionBatch {
        checklist_id,
        header: HeaderUpdate {
            remark: Some(remark.to_string()),
            inspector: Some("inspector01".to_string()),
            approver: None,
        },
        records,
        saved_at: ts(9, 0),
        saved_by: Some("inspector01".to_string()),
    }
}

fn audit() -> ActionLog {
    ActionLog::new(ActionType::SaveInspection, "inspector01", ts(9, 0))
}

#[test]
fn test_replace_batch_replaces_previous_records() {
    let conn = setup_test_db();
    let id = create_checklist(&conn);
    let repo = InspectionRepository::new(conn.clone());

    let first = batch(
        id,
        "first",
        vec![
            record(Shift::A, 8, vec![measurement("param_1", "2.0", true, false)]),
            record(Shift::B, 16, vec![measurement("param_1", "5.0", false, true)]),
        ],
    );
    let outcome = repo.replace_batch(&first, audit()).unwrap();
    assert_eq!(outcome.records_written, 2);
    assert_eq!(outcome.measurements_written, 2);
    assert_eq!(outcome.failed_measurements, 1);
    assert_eq!(outcome.inspect_code, "KBA2512220001");

    let second = batch(
        id,
        "second",
        vec![record(
            Shift::C,
            23,
            vec![
                measurement("param_2", "1.5", true, false),
                measurement("param_1", "2.5", true, false),
            ],
        )],
    );
    repo.replace_batch(&second, audit()).unwrap();

    let records = repo.load_records(id).unwrap();
    assert_eq!(records.len(), 1, "旧记录应被整体替换");
    assert_eq!(records[0].shift, Shift::C);
    let params: Vec<&str> = records[0]
        .measurements
        .iter()
        .map(|m| m.parameter_id.as_str())
        .collect();
    assert_eq!(params, vec!["param_1", "param_2"], "测量按参数标识排序");

    let snapshot = repo.load_snapshot(id).unwrap().unwrap();
    assert_eq!(snapshot.checklist.remark.as_deref(), Some("second"));
    assert_eq!(snapshot.checklist.inspector.as_deref(), Some("inspector01"));

    let logs = ActionLogRepository::new(conn).find_by_checklist(id).unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].inspect_code.as_deref(), Some("KBA2512220001"));
}

#[test]
fn test_replace_batch_missing_checklist() {
    let conn = setup_test_db();
    let repo = InspectionRepository::new(conn.clone());

    let err = repo
        .replace_batch(&batch(42, "x", vec![record(Shift::A, 8, vec![])]), audit())
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
    assert_eq!(ActionLogRepository::new(conn).find_recent(10).unwrap().len(), 0);
}

#[test]
fn test_replace_batch_rolls_back_on_mid_batch_failure() {
    let conn = setup_test_db();
    let id = create_checklist(&conn);
    let repo = InspectionRepository::new(conn.clone());

    repo.replace_batch(
        &batch(id, "original", vec![record(Shift::A, 8, vec![measurement("param_1", "2.0", true, false)])]),
        audit(),
    )
    .unwrap();

    // 第 3 条记录的测量同时标记合格/不合格，触发 CHECK 约束
    let bad = batch(
        id,
        "broken",
        vec![
            record(Shift::A, 9, vec![measurement("param_1", "2.0", true, false)]),
            record(Shift::A, 10, vec![measurement("param_1", "2.1", true, false)]),
            record(Shift::B, 11, vec![measurement("param_1", "2.2", true, true)]),
            record(Shift::B, 12, vec![]),
        ],
    );
    let err = repo.replace_batch(&bad, audit()).unwrap_err();
    assert!(matches!(err, RepositoryError::CheckConstraintViolation(_)));

    let snapshot = repo.load_snapshot(id).unwrap().unwrap();
    assert_eq!(snapshot.checklist.remark.as_deref(), Some("original"), "表头更新应回滚");
    assert_eq!(snapshot.records.len(), 1, "原有记录应保留");
    assert_eq!(snapshot.records[0].inspection_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    assert_eq!(
        ActionLogRepository::new(conn).count_by_checklist(id).unwrap(),
        1,
        "失败的保存不写审计"
    );
}

#[test]
fn test_load_snapshot_missing() {
    let repo = InspectionRepository::new(setup_test_db());
    assert!(repo.load_snapshot(7).unwrap().is_none());
}
