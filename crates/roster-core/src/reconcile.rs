//! Reconciliación en tiempo real.
//!
//! Rol en el sistema:
//! - Suscribe al stream de cambios acotado por sucursal + rango visible y
//!   mezcla cada evento remoto en el store.
//! - Suprime los ecos de las mutaciones que este mismo cliente acaba de
//!   aplicar (ventana corta de de-duplicación).
//! - Para updates que compiten, gana el `updated_at` mayor (last-writer-wins
//!   por timestamp, no por orden de llegada: el stream puede entregar fuera
//!   de orden).
//! - Ante caída del transporte: reconexión con backoff exponencial y, al
//!   reconectar, re-query completo del rango visible (el stream no
//!   garantiza entrega a través de una ventana de desconexión).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use roster_domain::{ScheduleKey, StaffId};

use crate::gateway::{ChangeEvent, ChangeOp, NotificationGateway, PersistenceGateway, ScopeFilter};
use crate::store::{lock_store, SharedScheduleStore};

/// Ventana dentro de la cual un evento entrante puede ser eco de una
/// mutación propia ya confirmada.
pub const ECHO_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

#[derive(Debug, Clone)]
enum MutationMark {
    /// Escritura en vuelo: cualquier evento para la clave se trata como eco.
    Persisting,
    /// Escritura confirmada: eco si coincide id y el evento no es más nuevo.
    Confirmed { id: Uuid, updated_at: DateTime<Utc>, at: Instant },
}

/// Registro compartido de mutaciones propias recientes, escrito por el
/// coordinador y consultado por el reconciliador.
#[derive(Clone, Default)]
pub struct RecentMutations {
    inner: Arc<Mutex<HashMap<ScheduleKey, MutationMark>>>,
}

impl RecentMutations {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, HashMap<ScheduleKey, MutationMark>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn mark_persisting(&self, key: ScheduleKey) {
        self.guard().insert(key, MutationMark::Persisting);
    }

    pub fn mark_confirmed(&self, key: ScheduleKey, id: Uuid, updated_at: DateTime<Utc>) {
        self.guard()
            .insert(key, MutationMark::Confirmed { id, updated_at, at: Instant::now() });
    }

    /// Descarta la marca (rollback: la escritura nunca llegó al servidor).
    pub fn clear(&self, key: &ScheduleKey) {
        self.guard().remove(key);
    }

    /// ¿Es este evento un eco de una mutación propia?
    pub fn is_echo(&self, event: &ChangeEvent) -> bool {
        let key = event.record.key();
        let mut marks = self.guard();
        marks.retain(|_, mark| match mark {
                 MutationMark::Persisting => true,
                 MutationMark::Confirmed { at, .. } => at.elapsed() <= ECHO_WINDOW,
             });
        match marks.get(&key) {
            Some(MutationMark::Persisting) => true,
            Some(MutationMark::Confirmed { id, updated_at, .. }) => {
                event.record.id.uuid() == *id && event.record.updated_at <= *updated_at
            }
            None => false,
        }
    }
}

pub struct RealtimeReconciler {
    store: SharedScheduleStore,
    recent: RecentMutations,
    state: Mutex<ConnectionState>,
    /// Época de alcance visible; cambiar de rango/sucursal la incrementa y
    /// los eventos en vuelo de la época anterior se descartan.
    epoch: Arc<AtomicU64>,
}

impl RealtimeReconciler {
    pub fn new(store: SharedScheduleStore, recent: RecentMutations, epoch: Arc<AtomicU64>) -> Self {
        Self { store,
               recent,
               state: Mutex::new(ConnectionState::Disconnected),
               epoch }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state != next {
            log::info!("notification stream: {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// Mezcla un evento remoto en el store. Devuelve `true` si se aplicó.
    pub fn merge_remote(&self, event: ChangeEvent) -> bool {
        if self.recent.is_echo(&event) {
            log::debug!("dropped echo for {} on {}", event.record.staff_id, event.record.date);
            return false;
        }
        let mut store = lock_store(&self.store);
        match event.op {
            ChangeOp::Insert | ChangeOp::Update => {
                if let Some(existing) = store.get(&event.record.staff_id, event.record.date) {
                    // un evento viejo nunca pisa un registro más nuevo
                    if existing.updated_at >= event.record.updated_at {
                        return false;
                    }
                }
                store.upsert(event.record);
                true
            }
            ChangeOp::Delete => {
                // un delete rezagado tampoco pisa una fila re-establecida
                // por un update más nuevo
                if let Some(existing) = store.get(&event.record.staff_id, event.record.date) {
                    if existing.updated_at > event.record.updated_at {
                        return false;
                    }
                }
                store.remove(&event.record.staff_id, event.record.date).is_some()
            }
        }
    }

    /// Backoff exponencial: base 1s, doblando, tope 30s.
    pub fn backoff_delay(attempt: u32) -> Duration {
        let secs = 1u64 << attempt.min(5);
        Duration::from_secs(secs.min(30))
    }

    fn stale(&self, epoch_at_start: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch_at_start
    }

    /// Bucle de suscripción para un alcance. Corre hasta que la época cambie
    /// (navegación a otro rango/sucursal) o la tarea sea abortada.
    pub async fn run(self: Arc<Self>,
                     notifications: Arc<dyn NotificationGateway>,
                     persistence: Arc<dyn PersistenceGateway>,
                     scope: ScopeFilter,
                     staff_ids: Vec<StaffId>,
                     epoch_at_start: u64) {
        let mut first_connection = true;
        loop {
            if self.stale(epoch_at_start) {
                return;
            }

            // (re)suscripción con backoff
            let mut attempt: u32 = 0;
            let mut subscription = loop {
                match notifications.subscribe(scope.clone()).await {
                    Ok(sub) => break sub,
                    Err(err) => {
                        self.set_state(ConnectionState::Reconnecting);
                        log::warn!("subscribe to {} failed: {err}", scope.branch);
                        tokio::time::sleep(Self::backoff_delay(attempt)).await;
                        attempt = attempt.saturating_add(1);
                        if self.stale(epoch_at_start) {
                            return;
                        }
                    }
                }
            };

            // tras una reconexión el stream pudo perder eventos: el único
            // recovery correcto es re-traer el rango visible completo
            if !first_connection {
                match persistence.query(&staff_ids, scope.range).await {
                    Ok(rows) => {
                        lock_store(&self.store).replace_range(&staff_ids, scope.range, rows);
                        log::info!("resynced {} after reconnect", scope.branch);
                    }
                    Err(err) => {
                        log::warn!("full resync for {} failed: {err}", scope.branch);
                        tokio::time::sleep(Self::backoff_delay(attempt)).await;
                        continue;
                    }
                }
            }
            first_connection = false;
            self.set_state(ConnectionState::Connected);

            while let Some(event) = subscription.events.recv().await {
                if self.stale(epoch_at_start) {
                    let _ = notifications.unsubscribe(subscription.handle).await;
                    return;
                }
                self.merge_remote(event);
            }

            // stream cerrado por el transporte
            self.set_state(ConnectionState::Disconnected);
        }
    }
}
