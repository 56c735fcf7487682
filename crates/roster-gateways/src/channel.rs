//! Gateway de notificaciones sobre canales tokio.
//!
//! Simula el canal push del backend: cada suscripción recibe los eventos
//! publicados que calzan con su alcance (sucursal + rango). Soporta corte
//! forzado del transporte para ejercitar la reconexión con backoff del
//! reconciliador.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use roster_core::gateway::{ChangeEvent, GatewayError, NotificationGateway, ScopeFilter, Subscription,
                           SubscriptionHandle};

const CHANNEL_CAPACITY: usize = 64;

struct Subscriber {
    scope: ScopeFilter,
    tx: mpsc::Sender<ChangeEvent>,
}

struct Inner {
    next_handle: u64,
    subscribers: HashMap<u64, Subscriber>,
    accepting: bool,
}

#[derive(Default)]
pub struct ChannelNotificationGateway {
    inner: Mutex<Inner>,
}

impl Default for Inner {
    fn default() -> Self {
        Self { next_handle: 0, subscribers: HashMap::new(), accepting: true }
    }
}

impl ChannelNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publica un evento remoto; lo reciben las suscripciones cuyo alcance
    /// calza. Las suscripciones cuyo receptor fue soltado se podan aquí.
    pub async fn publish(&self, event: ChangeEvent) {
        let targets: Vec<(u64, mpsc::Sender<ChangeEvent>)> = self.guard()
                                                                 .subscribers
                                                                 .iter()
                                                                 .filter(|(_, s)| s.scope.matches(&event))
                                                                 .map(|(h, s)| (*h, s.tx.clone()))
                                                                 .collect();
        let mut dead = Vec::new();
        for (handle, tx) in targets {
            if tx.send(event.clone()).await.is_err() {
                log::debug!("subscriber {handle} dropped, event not delivered");
                dead.push(handle);
            }
        }
        if !dead.is_empty() {
            let mut inner = self.guard();
            for handle in dead {
                inner.subscribers.remove(&handle);
            }
        }
    }

    /// Corta el transporte: cierra todos los streams vivos. Con
    /// `accepting = false` además rechaza nuevas suscripciones hasta
    /// `restore()`.
    pub fn drop_connections(&self, accepting: bool) {
        let mut inner = self.guard();
        inner.subscribers.clear();
        inner.accepting = accepting;
    }

    pub fn restore(&self) {
        self.guard().accepting = true;
    }

    pub fn subscriber_count(&self) -> usize {
        self.guard().subscribers.len()
    }
}

#[async_trait]
impl NotificationGateway for ChannelNotificationGateway {
    async fn subscribe(&self, scope: ScopeFilter) -> Result<Subscription, GatewayError> {
        let mut inner = self.guard();
        if !inner.accepting {
            return Err(GatewayError::Unavailable("notification transport down".to_string()));
        }
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = SubscriptionHandle(inner.next_handle);
        inner.next_handle += 1;
        inner.subscribers.insert(handle.0, Subscriber { scope, tx });
        Ok(Subscription { handle, events: rx })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), GatewayError> {
        self.guard().subscribers.remove(&handle.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use roster_core::gateway::{ChangeOp, DayRange};
    use roster_domain::{BranchId, RecordId, ScheduleRecord, ScheduleStatus, ShiftCode, StaffId};

    fn scope(branch: &str) -> ScopeFilter {
        ScopeFilter { branch: BranchId::from(branch),
                      range: DayRange::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                                           NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()) }
    }

    fn event(branch: &str, day: u32) -> ChangeEvent {
        ChangeEvent { op: ChangeOp::Insert,
                      record: ScheduleRecord { id: RecordId::Server(uuid::Uuid::new_v4()),
                                               staff_id: StaffId::from("A"),
                                               branch: BranchId::from(branch),
                                               date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                                               shift_code: ShiftCode::Day,
                                               overtime_hours: 0.0,
                                               status: ScheduleStatus::Confirmed,
                                               updated_at: Utc::now() } }
    }

    #[tokio::test]
    async fn events_reach_only_matching_scopes() {
        let gw = ChannelNotificationGateway::new();
        let mut north = gw.subscribe(scope("north")).await.unwrap();
        let mut south = gw.subscribe(scope("south")).await.unwrap();

        gw.publish(event("north", 10)).await;
        assert_eq!(north.events.recv().await.unwrap().record.branch, BranchId::from("north"));
        assert!(south.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_transport_closes_streams_and_rejects_resubscribe() {
        let gw = ChannelNotificationGateway::new();
        let mut sub = gw.subscribe(scope("north")).await.unwrap();
        gw.drop_connections(false);
        assert!(sub.events.recv().await.is_none(), "stream must close on transport drop");
        assert!(gw.subscribe(scope("north")).await.is_err());
        gw.restore();
        assert!(gw.subscribe(scope("north")).await.is_ok());
    }

    #[tokio::test]
    async fn dropped_subscription_is_pruned_on_next_publish() {
        let gw = ChannelNotificationGateway::new();
        let sub = gw.subscribe(scope("north")).await.unwrap();
        drop(sub); // el cliente suelta el receptor sin des-suscribirse
        assert_eq!(gw.subscriber_count(), 1);
        gw.publish(event("north", 10)).await;
        assert_eq!(gw.subscriber_count(), 0, "dead subscriber must be pruned");
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let gw = ChannelNotificationGateway::new();
        let sub = gw.subscribe(scope("north")).await.unwrap();
        gw.unsubscribe(sub.handle).await.unwrap();
        assert_eq!(gw.subscriber_count(), 0);
    }
}
