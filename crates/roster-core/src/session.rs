//! Fachada de sesión de roster: la superficie que consume la capa de UI.
//!
//! Las pantallas son consumidores puramente presentacionales de esta
//! interfaz única; toda la lógica de generación, mutación y reconciliación
//! vive detrás.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::NaiveDate;
use tokio::task::JoinHandle;

use roster_domain::{AuditEntry, BranchId, LeaveRequest, OrgCalendar, ScheduleRecord, StaffId, StaffProfile};
use roster_policies::{BranchAccessPolicy, SessionContext};

use crate::audit::AuditLog;
use crate::errors::RosterError;
use crate::gateway::{DayRange, NotificationGateway, PersistenceGateway, ScopeFilter};
use crate::generation::{GenerationAction, GenerationEngine, Proposal};
use crate::mutation::{CellEdit, EditOutcome, MutationCoordinator};
use crate::pattern::ShiftPattern;
use crate::reconcile::{ConnectionState, RealtimeReconciler, RecentMutations};
use crate::store::{lock_store, ListenerHandle, ScheduleStore, SharedScheduleStore, StoreListener};

/// Configuración explícita construida al inicio de la sesión.
pub struct SessionConfig {
    pub session: SessionContext,
    pub calendar: OrgCalendar,
    pub directory: HashMap<StaffId, StaffProfile>,
    pub leaves: Vec<LeaveRequest>,
}

pub struct RosterSession {
    store: SharedScheduleStore,
    coordinator: MutationCoordinator,
    reconciler: Arc<RealtimeReconciler>,
    persistence: Arc<dyn PersistenceGateway>,
    notifications: Arc<dyn NotificationGateway>,
    policy: Arc<dyn BranchAccessPolicy + Send + Sync>,
    session: SessionContext,
    directory: HashMap<StaffId, StaffProfile>,
    leaves: Vec<LeaveRequest>,
    audit: Arc<StdMutex<dyn AuditLog>>,
    epoch: Arc<AtomicU64>,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
    visible: StdMutex<Option<(Vec<BranchId>, DayRange)>>,
}

impl RosterSession {
    pub fn new(config: SessionConfig,
               persistence: Arc<dyn PersistenceGateway>,
               notifications: Arc<dyn NotificationGateway>,
               policy: Arc<dyn BranchAccessPolicy + Send + Sync>,
               audit: Arc<StdMutex<dyn AuditLog>>)
               -> Self {
        let store: SharedScheduleStore = Arc::new(StdMutex::new(ScheduleStore::new()));
        let recent = RecentMutations::new();
        let epoch = Arc::new(AtomicU64::new(0));
        let coordinator = MutationCoordinator::new(store.clone(),
                                                   persistence.clone(),
                                                   policy.clone(),
                                                   config.session.clone(),
                                                   config.directory.clone(),
                                                   audit.clone(),
                                                   recent.clone(),
                                                   config.calendar);
        let reconciler = Arc::new(RealtimeReconciler::new(store.clone(), recent, epoch.clone()));
        Self { store,
               coordinator,
               reconciler,
               persistence,
               notifications,
               policy,
               session: config.session,
               directory: config.directory,
               leaves: config.leaves,
               audit,
               epoch,
               tasks: StdMutex::new(Vec::new()),
               visible: StdMutex::new(None) }
    }

    /// Registros del rango visible, listos para render.
    pub fn visible_schedules(&self, range: DayRange) -> Vec<ScheduleRecord> {
        let branches = match &*self.visible.lock().unwrap_or_else(|p| p.into_inner()) {
            Some((branches, _)) => branches.clone(),
            None => self.policy.accessible_branches(&self.session).into_iter().collect(),
        };
        let staff = self.staff_of(&branches);
        lock_store(&self.store).range(&staff, range)
    }

    /// Propuesta de generación con conflictos no bloqueantes.
    pub fn propose_generation(&self,
                              targets: &[(StaffId, NaiveDate)],
                              pattern: &ShiftPattern,
                              action: GenerationAction)
                              -> Proposal {
        let store = lock_store(&self.store);
        let engine = GenerationEngine::new(&store, &self.directory, &self.leaves, self.policy.as_ref(), &self.session);
        engine.propose(targets, pattern, action)
    }

    /// Edición de una celda; el futuro devuelto resuelve en
    /// `Confirmed`/`RolledBack`.
    pub async fn apply_cell_edit(&self,
                                 staff_id: StaffId,
                                 date: NaiveDate,
                                 edit: CellEdit)
                                 -> Result<EditOutcome, RosterError> {
        self.coordinator.apply_cell_edit(staff_id, date, edit).await
    }

    /// Suscripción de la UI a cambios del store (disparador de re-render).
    pub fn subscribe_store_changes(&self, listener: StoreListener) -> ListenerHandle {
        lock_store(&self.store).subscribe(listener)
    }

    pub fn unsubscribe_store_changes(&self, handle: ListenerHandle) {
        lock_store(&self.store).unsubscribe(handle)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.reconciler.connection_state()
    }

    pub fn audit_trail(&self) -> Vec<AuditEntry> {
        self.audit.lock().unwrap_or_else(|p| p.into_inner()).list()
    }

    /// Cambia el alcance visible (sucursales + rango de días).
    ///
    /// Cancela las suscripciones previas (los eventos en vuelo del alcance
    /// anterior se descartan, no se aplican), hace el fetch inicial del
    /// rango y levanta una suscripción independiente por sucursal (dos en
    /// vista dual).
    pub async fn set_visible_scope(&self, branches: Vec<BranchId>, range: DayRange) -> Result<(), RosterError> {
        if branches.is_empty() || branches.len() > 2 {
            return Err(roster_domain::DomainError::Validation(format!("visible scope needs 1 or 2 branches, got {}",
                                                                      branches.len())).into());
        }
        if branches.len() == 2 && !self.policy.can_use_dual_view(&self.session) {
            return Err(RosterError::Authorization(branches[1].clone()));
        }
        let accessible = self.policy.accessible_branches(&self.session);
        let elevated = self.policy.is_elevated(&self.session);
        for branch in &branches {
            if !elevated && !accessible.contains(branch) {
                return Err(RosterError::Authorization(branch.clone()));
            }
        }

        // invalida la época: todo evento en vuelo del alcance anterior muere
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
            for task in tasks.drain(..) {
                task.abort();
            }
        }

        // fetch inicial del rango visible
        let staff = self.staff_of(&branches);
        let rows = self.persistence.query(&staff, range).await?;
        lock_store(&self.store).replace_range(&staff, range, rows);

        // una suscripción independiente por sucursal
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        for branch in &branches {
            let scope = ScopeFilter { branch: branch.clone(), range };
            let staff_for_branch = self.staff_of(std::slice::from_ref(branch));
            let task = tokio::spawn(self.reconciler.clone().run(self.notifications.clone(),
                                                                self.persistence.clone(),
                                                                scope,
                                                                staff_for_branch,
                                                                epoch));
            tasks.push(task);
        }
        *self.visible.lock().unwrap_or_else(|p| p.into_inner()) = Some((branches, range));
        Ok(())
    }

    fn staff_of(&self, branches: &[BranchId]) -> Vec<StaffId> {
        let mut staff: Vec<StaffId> = self.directory
                                          .values()
                                          .filter(|p| branches.contains(&p.home_branch))
                                          .map(|p| p.id.clone())
                                          .collect();
        staff.sort();
        staff
    }
}

impl Drop for RosterSession {
    fn drop(&mut self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}
