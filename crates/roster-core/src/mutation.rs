//! Coordinador de mutaciones: apply optimista, persistencia y rollback.
//!
//! Máquina de estados por edición de celda:
//! `Idle → OptimisticApplied → Persisting → {Confirmed | RolledBack}`.
//!
//! - La validación (taxonomía) y la autorización (sucursal) ocurren ANTES de
//!   tocar el store; si fallan, el store queda intacto.
//! - El apply optimista escribe el registro provisional de inmediato (id
//!   temporal para creates) y la UI lo refleja con latencia cero.
//! - En confirmación se reemplaza el id temporal por el del servidor y se
//!   agrega exactamente una entrada de auditoría.
//! - En fallo se restaura el snapshot previo con exactitud: un create
//!   fallido no deja nada, un update fallido restaura la fila anterior, un
//!   delete fallido restaura la fila borrada.
//! - A lo sumo una mutación en vuelo por clave natural; una segunda edición
//!   a la misma celda espera detrás de la primera en lugar de competir.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex as AsyncMutex;

use roster_domain::{validate_assignment, AuditEntry, DomainError, OrgCalendar, RecordId, ScheduleKey,
                    SchedulePatch, ScheduleRecord, ScheduleStatus, ShiftCode, StaffId, StaffProfile};
use roster_policies::{BranchAccessPolicy, SessionContext};

use crate::audit::AuditLog;
use crate::errors::RosterError;
use crate::gateway::PersistenceGateway;
use crate::reconcile::RecentMutations;
use crate::store::{lock_store, SharedScheduleStore};

/// Edición de una celda del roster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellEdit {
    Assign { shift_code: ShiftCode, overtime_hours: f64 },
    Clear,
}

/// Fases de la máquina de estados (se registran en el log de debug).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Idle,
    OptimisticApplied,
    Persisting,
    Confirmed,
    RolledBack,
}

/// Resolución del "handle tipo promesa" que recibe la UI.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Confirmed { id: RecordId, updated_at: DateTime<Utc> },
    RolledBack { error: RosterError },
}

pub struct MutationCoordinator {
    store: SharedScheduleStore,
    persistence: Arc<dyn PersistenceGateway>,
    policy: Arc<dyn BranchAccessPolicy + Send + Sync>,
    session: SessionContext,
    directory: HashMap<StaffId, StaffProfile>,
    audit: Arc<StdMutex<dyn AuditLog>>,
    recent: RecentMutations,
    calendar: OrgCalendar,
    cell_locks: StdMutex<HashMap<ScheduleKey, Arc<AsyncMutex<()>>>>,
}

impl MutationCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(store: SharedScheduleStore,
               persistence: Arc<dyn PersistenceGateway>,
               policy: Arc<dyn BranchAccessPolicy + Send + Sync>,
               session: SessionContext,
               directory: HashMap<StaffId, StaffProfile>,
               audit: Arc<StdMutex<dyn AuditLog>>,
               recent: RecentMutations,
               calendar: OrgCalendar)
               -> Self {
        Self { store,
               persistence,
               policy,
               session,
               directory,
               audit,
               recent,
               calendar,
               cell_locks: StdMutex::new(HashMap::new()) }
    }

    /// Aplica una edición de celda: optimista primero, persistencia después.
    ///
    /// `Err` sólo para rechazos locales (validación/autorización, store
    /// intacto); el camino de persistencia siempre resuelve en
    /// `Ok(Confirmed | RolledBack)`.
    pub async fn apply_cell_edit(&self,
                                 staff_id: StaffId,
                                 date: NaiveDate,
                                 edit: CellEdit)
                                 -> Result<EditOutcome, RosterError> {
        if let CellEdit::Assign { shift_code, overtime_hours } = edit {
            validate_assignment(shift_code, overtime_hours)?;
        }
        let profile = self.directory
                          .get(&staff_id)
                          .ok_or_else(|| DomainError::Validation(format!("unknown staff {staff_id}")))?;
        if !self.policy.is_elevated(&self.session)
           && !self.policy.accessible_branches(&self.session).contains(&profile.home_branch)
        {
            return Err(RosterError::Authorization(profile.home_branch.clone()));
        }

        let key: ScheduleKey = (staff_id.clone(), date);
        let cell_lock = self.lock_for(&key);
        // una mutación en vuelo por celda: la segunda espera aquí
        let _serialized = cell_lock.lock().await;

        let snapshot = lock_store(&self.store).get(&staff_id, date).cloned();
        self.transition(&key, EditPhase::Idle);

        match (edit, snapshot) {
            (CellEdit::Assign { shift_code, overtime_hours }, None) => {
                self.create_cell(key, profile.clone(), shift_code, overtime_hours).await
            }
            (CellEdit::Assign { shift_code, overtime_hours }, Some(prior)) => {
                self.update_cell(key, prior, shift_code, overtime_hours).await
            }
            (CellEdit::Clear, Some(prior)) => self.delete_cell(key, prior).await,
            (CellEdit::Clear, None) => {
                Err(DomainError::Validation(format!("no assignment to clear for {staff_id} on {date}")).into())
            }
        }
    }

    async fn create_cell(&self,
                         key: ScheduleKey,
                         profile: StaffProfile,
                         shift_code: ShiftCode,
                         overtime_hours: f64)
                         -> Result<EditOutcome, RosterError> {
        let mut record = ScheduleRecord { id: RecordId::new_temp(),
                                          staff_id: key.0.clone(),
                                          branch: profile.home_branch,
                                          date: key.1,
                                          shift_code,
                                          overtime_hours,
                                          status: ScheduleStatus::Pending,
                                          updated_at: Utc::now() };

        self.transition(&key, EditPhase::OptimisticApplied);
        lock_store(&self.store).upsert(record.clone());
        self.recent.mark_persisting(key.clone());
        self.transition(&key, EditPhase::Persisting);

        match self.persistence.insert(&record).await {
            Ok(ack) => {
                // el id temporal jamás queda como definitivo
                record.id = RecordId::Server(ack.id);
                record.status = ScheduleStatus::Confirmed;
                record.updated_at = ack.updated_at;
                lock_store(&self.store).upsert(record.clone());
                self.recent.mark_confirmed(key.clone(), ack.id, ack.updated_at);
                self.append_audit(format!("Assigned {} shift for {} on {}",
                                          record.display_code(),
                                          key.0,
                                          self.calendar.format_day(key.1)));
                self.transition(&key, EditPhase::Confirmed);
                Ok(EditOutcome::Confirmed { id: record.id, updated_at: ack.updated_at })
            }
            Err(err) => {
                // un create fallido no deja nada atrás
                lock_store(&self.store).remove(&key.0, key.1);
                self.recent.clear(&key);
                self.transition(&key, EditPhase::RolledBack);
                log::warn!("create for {} on {} rolled back: {err}", key.0, key.1);
                Ok(EditOutcome::RolledBack { error: err.into() })
            }
        }
    }

    async fn update_cell(&self,
                         key: ScheduleKey,
                         prior: ScheduleRecord,
                         shift_code: ShiftCode,
                         overtime_hours: f64)
                         -> Result<EditOutcome, RosterError> {
        let mut record = prior.clone();
        record.shift_code = shift_code;
        record.overtime_hours = overtime_hours;
        record.status = ScheduleStatus::Pending;

        self.transition(&key, EditPhase::OptimisticApplied);
        lock_store(&self.store).upsert(record.clone());
        self.recent.mark_persisting(key.clone());
        self.transition(&key, EditPhase::Persisting);

        let patch = SchedulePatch { shift_code, overtime_hours };
        match self.persistence.update(prior.id.uuid(), &patch).await {
            Ok(ack) => {
                record.status = ScheduleStatus::Confirmed;
                record.updated_at = ack.updated_at;
                lock_store(&self.store).upsert(record.clone());
                self.recent.mark_confirmed(key.clone(), prior.id.uuid(), ack.updated_at);
                self.append_audit(format!("Updated shift for {} on {}",
                                          key.0,
                                          self.calendar.format_day(key.1)));
                self.transition(&key, EditPhase::Confirmed);
                Ok(EditOutcome::Confirmed { id: record.id, updated_at: ack.updated_at })
            }
            Err(err) => {
                // restaura la fila anterior exactamente
                lock_store(&self.store).upsert(prior);
                self.recent.clear(&key);
                self.transition(&key, EditPhase::RolledBack);
                log::warn!("update for {} on {} rolled back: {err}", key.0, key.1);
                Ok(EditOutcome::RolledBack { error: err.into() })
            }
        }
    }

    async fn delete_cell(&self, key: ScheduleKey, prior: ScheduleRecord) -> Result<EditOutcome, RosterError> {
        self.transition(&key, EditPhase::OptimisticApplied);
        lock_store(&self.store).remove(&key.0, key.1);
        self.recent.mark_persisting(key.clone());
        self.transition(&key, EditPhase::Persisting);

        match self.persistence.delete(prior.id.uuid()).await {
            Ok(()) => {
                let confirmed_at = Utc::now();
                self.recent.mark_confirmed(key.clone(), prior.id.uuid(), confirmed_at);
                self.append_audit(format!("Cleared shift for {} on {}",
                                          key.0,
                                          self.calendar.format_day(key.1)));
                self.transition(&key, EditPhase::Confirmed);
                Ok(EditOutcome::Confirmed { id: prior.id, updated_at: confirmed_at })
            }
            Err(err) => {
                // restaura la fila borrada exactamente
                lock_store(&self.store).upsert(prior);
                self.recent.clear(&key);
                self.transition(&key, EditPhase::RolledBack);
                log::warn!("delete for {} on {} rolled back: {err}", key.0, key.1);
                Ok(EditOutcome::RolledBack { error: err.into() })
            }
        }
    }

    fn append_audit(&self, action: String) {
        let entry = AuditEntry::new(action, self.session.user_id.as_str());
        self.audit.lock().unwrap_or_else(|p| p.into_inner()).append(entry);
    }

    fn transition(&self, key: &ScheduleKey, phase: EditPhase) {
        log::debug!("cell {} @ {}: {:?}", key.0, key.1, phase);
    }

    fn lock_for(&self, key: &ScheduleKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.cell_locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }
}
