//! Registro de turno por (staff, día) y su identidad provisional/definitiva.
//!
//! Rol en el sistema:
//! - `ScheduleRecord` es la fila que el store cachea y la UI renderiza.
//! - La clave natural `(staff_id, date)` admite a lo sumo un registro vivo;
//!   el store hace cumplir esa unicidad en `upsert`.
//! - `RecordId::Temp` existe sólo entre el apply optimista y la confirmación
//!   del servidor; nunca se persiste como definitivo.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shift::{combination_for, DisplayCode, ShiftCode};
use crate::{BranchId, StaffId};

/// Identidad de un registro: provisional (generada por el cliente para el
/// insert optimista) o asignada por el servidor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum RecordId {
    Temp(Uuid),
    Server(Uuid),
}

impl RecordId {
    pub fn new_temp() -> Self {
        RecordId::Temp(Uuid::new_v4())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, RecordId::Temp(_))
    }

    pub fn uuid(&self) -> Uuid {
        match self {
            RecordId::Temp(u) | RecordId::Server(u) => *u,
        }
    }
}

/// Estado de ciclo de vida de la fila.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Pending,
    Confirmed,
}

/// Clave natural del roster.
pub type ScheduleKey = (StaffId, NaiveDate);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: RecordId,
    pub staff_id: StaffId,
    /// Sucursal dueña de la fila; el stream de notificaciones se filtra por
    /// este campo.
    pub branch: BranchId,
    pub date: NaiveDate,
    pub shift_code: ShiftCode,
    /// Horas extra; sólo significativas para `Day`/`Evening`, el resto de
    /// códigos las muestra como anotación separada.
    pub overtime_hours: f64,
    pub status: ScheduleStatus,
    /// Timestamp del servidor; decide last-writer-wins en la reconciliación.
    pub updated_at: DateTime<Utc>,
}

impl ScheduleRecord {
    pub fn key(&self) -> ScheduleKey {
        (self.staff_id.clone(), self.date)
    }

    pub fn display_code(&self) -> DisplayCode {
        combination_for(self.shift_code, self.overtime_hours)
    }
}

/// Parche de actualización enviado al gateway de persistencia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePatch {
    pub shift_code: ShiftCode,
    pub overtime_hours: f64,
}
