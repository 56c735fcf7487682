//! Tests de integración del dominio: taxonomía, registros y calendario.

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use roster_domain::{combination_for, validate_assignment, BranchId, LeaveRequest, LeaveStatus, OrgCalendar,
                    RecordId, ScheduleRecord, ScheduleStatus, ShiftCode, StaffId};

#[test]
fn display_rule_matrix() {
    assert_eq!(combination_for(ShiftCode::Day, 2.0).code, "D+OT");
    assert_eq!(combination_for(ShiftCode::Evening, 1.0).code, "E+OT");
    assert_eq!(combination_for(ShiftCode::Evening, 0.0).code, "E");
    assert_eq!(combination_for(ShiftCode::HalfDay, 0.0).code, "HD");
    let rd = combination_for(ShiftCode::RestDay, 3.0);
    assert_eq!(rd.code, "RD");
    assert_eq!(rd.annotation.as_deref(), Some("OT 3h"));
    let training = combination_for(ShiftCode::Training, 1.5);
    assert_eq!(training.code, "T");
    assert!(training.annotation.is_some());
}

#[test]
fn working_codes_and_validation() {
    assert!(ShiftCode::Day.is_working());
    assert!(ShiftCode::HalfDay.is_working());
    assert!(!ShiftCode::RestDay.is_working());
    assert!(!ShiftCode::Leave.is_working());
    assert!(validate_assignment(ShiftCode::Leave, 0.0).is_ok());
    assert!(validate_assignment(ShiftCode::Overtime, 4.0).is_err());
}

#[test]
fn record_round_trips_through_serde() {
    let rec = ScheduleRecord { id: RecordId::new_temp(),
                               staff_id: StaffId::from("A"),
                               branch: BranchId::from("north"),
                               date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                               shift_code: ShiftCode::Day,
                               overtime_hours: 2.0,
                               status: ScheduleStatus::Pending,
                               updated_at: Utc::now() };
    let json = serde_json::to_string(&rec).expect("serialize");
    let back: ScheduleRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, rec);
    assert!(back.id.is_temporary());
}

#[test]
fn calendar_boundary_normalization() {
    // el mismo instante UTC cae en días distintos según el offset canónico
    let instant = Utc.with_ymd_and_hms(2025, 3, 9, 20, 0, 0).unwrap();
    let utc_cal = OrgCalendar::utc();
    let sgt_cal = OrgCalendar::new(FixedOffset::east_opt(8 * 3600).unwrap());
    assert_eq!(utc_cal.day_of(instant), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    assert_eq!(sgt_cal.day_of(instant), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
}

#[test]
fn pending_leave_does_not_count_as_approved() {
    let leave = LeaveRequest { staff_id: StaffId::from("A"),
                               start_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                               end_date: NaiveDate::from_ymd_opt(2025, 4, 5).unwrap(),
                               status: LeaveStatus::Pending };
    assert!(leave.covers(NaiveDate::from_ymd_opt(2025, 4, 3).unwrap()));
    assert!(!leave.is_approved());
}
