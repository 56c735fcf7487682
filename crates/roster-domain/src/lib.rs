// roster-domain library entry point
pub mod audit;
pub mod calendar;
pub mod error;
pub mod leave;
pub mod schedule;
pub mod shift;
pub mod staff;

pub use audit::AuditEntry;
pub use calendar::OrgCalendar;
pub use error::DomainError;
pub use leave::{LeaveRequest, LeaveStatus};
pub use schedule::{RecordId, ScheduleKey, SchedulePatch, ScheduleRecord, ScheduleStatus};
pub use shift::{combination_for, validate_assignment, DisplayCode, ShiftCode};
pub use staff::{BranchId, StaffId, StaffProfile, StaffRole};
