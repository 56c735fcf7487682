//! Gateway de persistencia en memoria: simula el backend relacional.
//!
//! - Asigna ids de servidor y sella `updated_at` autoritativo en cada
//!   escritura, igual que haría el backend real.
//! - Permite inyectar fallos por operación para ejercitar el camino de
//!   rollback del coordinador.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use roster_core::gateway::{DayRange, GatewayError, PersistenceGateway, UpdateAck, WriteAck};
use roster_domain::{BranchId, RecordId, SchedulePatch, ScheduleRecord, ScheduleStatus, StaffId};
use roster_policies::PreferenceSink;

#[derive(Default)]
pub struct InMemoryPersistenceGateway {
    rows: Mutex<HashMap<Uuid, ScheduleRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryPersistenceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hace fallar toda escritura posterior (las queries siguen sirviendo).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Siembra una fila ya confirmada, como si otro cliente la hubiera
    /// escrito antes.
    pub fn seed(&self, mut record: ScheduleRecord) -> Uuid {
        let id = record.id.uuid();
        record.id = RecordId::Server(id);
        record.status = ScheduleStatus::Confirmed;
        self.guard().insert(id, record);
        id
    }

    pub fn row(&self, id: Uuid) -> Option<ScheduleRecord> {
        self.guard().get(&id).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.guard().len()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, ScheduleRecord>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<(), GatewayError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryPersistenceGateway {
    async fn insert(&self, record: &ScheduleRecord) -> Result<WriteAck, GatewayError> {
        self.check_writable()?;
        let id = Uuid::new_v4();
        let updated_at = Utc::now();
        let mut row = record.clone();
        row.id = RecordId::Server(id);
        row.status = ScheduleStatus::Confirmed;
        row.updated_at = updated_at;
        self.guard().insert(id, row);
        Ok(WriteAck { id, updated_at })
    }

    async fn update(&self, id: Uuid, patch: &SchedulePatch) -> Result<UpdateAck, GatewayError> {
        self.check_writable()?;
        let mut rows = self.guard();
        let row = rows.get_mut(&id).ok_or(GatewayError::NotFound)?;
        row.shift_code = patch.shift_code;
        row.overtime_hours = patch.overtime_hours;
        row.updated_at = Utc::now();
        Ok(UpdateAck { updated_at: row.updated_at })
    }

    async fn delete(&self, id: Uuid) -> Result<(), GatewayError> {
        self.check_writable()?;
        self.guard().remove(&id).map(|_| ()).ok_or(GatewayError::NotFound)
    }

    async fn query(&self, staff_ids: &[StaffId], range: DayRange) -> Result<Vec<ScheduleRecord>, GatewayError> {
        let rows = self.guard();
        let mut out: Vec<ScheduleRecord> = rows.values()
                                               .filter(|r| staff_ids.contains(&r.staff_id) && range.contains(r.date))
                                               .cloned()
                                               .collect();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(out)
    }
}

/// Persistencia de la preferencia de sucursal activa: efecto de borde
/// explícito, nunca consultado por la lógica de negocio.
#[derive(Default)]
pub struct InMemoryPreferenceSink {
    prefs: HashMap<StaffId, BranchId>,
}

impl InMemoryPreferenceSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceSink for InMemoryPreferenceSink {
    fn remember_active_branch(&mut self, user: &StaffId, branch: &BranchId) {
        self.prefs.insert(user.clone(), branch.clone());
    }

    fn recall_active_branch(&self, user: &StaffId) -> Option<BranchId> {
        self.prefs.get(user).cloned()
    }
}
