//! Solicitudes de licencia consultadas por el motor de conflictos.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::StaffId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// Rango de licencia de un miembro del personal. Sólo las aprobadas
/// generan `LeaveOverlap` en la generación de turnos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub staff_id: StaffId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
}

impl LeaveRequest {
    /// Rango inclusivo en ambos extremos.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn is_approved(&self) -> bool {
        self.status == LeaveStatus::Approved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_is_inclusive() {
        let leave = LeaveRequest { staff_id: StaffId::from("A"),
                                   start_date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
                                   end_date: NaiveDate::from_ymd_opt(2025, 4, 4).unwrap(),
                                   status: LeaveStatus::Approved };
        assert!(leave.covers(NaiveDate::from_ymd_opt(2025, 4, 2).unwrap()));
        assert!(leave.covers(NaiveDate::from_ymd_opt(2025, 4, 4).unwrap()));
        assert!(!leave.covers(NaiveDate::from_ymd_opt(2025, 4, 5).unwrap()));
    }
}
