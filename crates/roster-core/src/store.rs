//! Store de turnos en memoria: la única fuente de verdad que la UI
//! renderiza.
//!
//! Rol en el sistema:
//! - Colección keyed por la clave natural `(staff_id, date)`; `upsert`
//!   reemplaza in-place ante colisión de clave, nunca duplica.
//! - Tanto el coordinador de mutaciones como el reconciliador escriben a
//!   través de `upsert`/`remove`, jamás por mutación directa de campos.
//! - Los listeners registrados reciben cada cambio para disparar re-render.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use roster_domain::{ScheduleKey, ScheduleRecord, StaffId};

use crate::gateway::DayRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChangeKind {
    Upserted,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: ScheduleKey,
    pub kind: StoreChangeKind,
}

pub type StoreListener = Box<dyn Fn(&StoreChange) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerHandle(u64);

#[derive(Default)]
pub struct ScheduleStore {
    records: BTreeMap<ScheduleKey, ScheduleRecord>,
    listeners: Vec<(u64, StoreListener)>,
    next_listener: u64,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, staff_id: &StaffId, date: chrono::NaiveDate) -> Option<&ScheduleRecord> {
        self.records.get(&(staff_id.clone(), date))
    }

    /// Inserta o reemplaza por clave natural. Devuelve el registro previo si
    /// la clave ya estaba ocupada (reemplazo in-place, invariante de
    /// unicidad).
    pub fn upsert(&mut self, record: ScheduleRecord) -> Option<ScheduleRecord> {
        let key = record.key();
        let prior = self.records.insert(key.clone(), record);
        self.notify(&StoreChange { key, kind: StoreChangeKind::Upserted });
        prior
    }

    pub fn remove(&mut self, staff_id: &StaffId, date: chrono::NaiveDate) -> Option<ScheduleRecord> {
        let key = (staff_id.clone(), date);
        let removed = self.records.remove(&key);
        if removed.is_some() {
            self.notify(&StoreChange { key, kind: StoreChangeKind::Removed });
        }
        removed
    }

    /// Registros de los staff dados dentro del rango (inclusive), en orden
    /// de clave.
    pub fn range(&self, staff_ids: &[StaffId], range: DayRange) -> Vec<ScheduleRecord> {
        let mut out = Vec::new();
        for staff in staff_ids {
            let lo = (staff.clone(), range.start);
            let hi = (staff.clone(), range.end);
            for (_, rec) in self.records.range(lo..=hi) {
                out.push(rec.clone());
            }
        }
        out
    }

    /// Reemplaza el contenido del rango visible con el resultado autoritativo
    /// de un re-query (recuperación tras reconexión).
    pub fn replace_range(&mut self, staff_ids: &[StaffId], range: DayRange, records: Vec<ScheduleRecord>) {
        for staff in staff_ids {
            let keys: Vec<ScheduleKey> = self.records
                                             .range((staff.clone(), range.start)..=(staff.clone(), range.end))
                                             .map(|(k, _)| k.clone())
                                             .collect();
            for key in keys {
                self.records.remove(&key);
                self.notify(&StoreChange { key, kind: StoreChangeKind::Removed });
            }
        }
        for rec in records {
            self.upsert(rec);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn subscribe(&mut self, listener: StoreListener) -> ListenerHandle {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, listener));
        ListenerHandle(id)
    }

    pub fn unsubscribe(&mut self, handle: ListenerHandle) {
        self.listeners.retain(|(id, _)| *id != handle.0);
    }

    fn notify(&self, change: &StoreChange) {
        for (_, listener) in &self.listeners {
            listener(change);
        }
    }
}

impl std::fmt::Debug for ScheduleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleStore")
         .field("records", &self.records.len())
         .field("listeners", &self.listeners.len())
         .finish()
    }
}

/// El store es el único recurso mutable compartido del core; el mutex
/// serializa a los dos escritores (coordinador y reconciliador) y nunca se
/// retiene a través de un await.
pub type SharedScheduleStore = Arc<Mutex<ScheduleStore>>;

pub fn lock_store(store: &SharedScheduleStore) -> MutexGuard<'_, ScheduleStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use roster_domain::{BranchId, RecordId, ScheduleStatus, ShiftCode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(staff: &str, day: u32, code: ShiftCode) -> ScheduleRecord {
        ScheduleRecord { id: RecordId::new_temp(),
                         staff_id: StaffId::from(staff),
                         branch: BranchId::from("north"),
                         date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                         shift_code: code,
                         overtime_hours: 0.0,
                         status: ScheduleStatus::Pending,
                         updated_at: Utc::now() }
    }

    #[test]
    fn upsert_replaces_in_place_never_duplicates() {
        let mut store = ScheduleStore::new();
        assert!(store.upsert(record("A", 10, ShiftCode::Day)).is_none());
        let prior = store.upsert(record("A", 10, ShiftCode::Evening));
        assert_eq!(prior.map(|r| r.shift_code), Some(ShiftCode::Day));
        assert_eq!(store.len(), 1, "at most one record per natural key");
        let got = store.get(&StaffId::from("A"), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(got.map(|r| r.shift_code), Some(ShiftCode::Evening));
    }

    #[test]
    fn range_scans_per_staff_within_bounds() {
        let mut store = ScheduleStore::new();
        store.upsert(record("A", 10, ShiftCode::Day));
        store.upsert(record("A", 12, ShiftCode::Evening));
        store.upsert(record("B", 11, ShiftCode::Day));
        store.upsert(record("C", 11, ShiftCode::Day)); // fuera de la consulta

        let range = DayRange::new(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                                  NaiveDate::from_ymd_opt(2025, 3, 11).unwrap());
        let rows = store.range(&[StaffId::from("A"), StaffId::from("B")], range);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.date <= range.end));
    }

    #[test]
    fn listeners_fire_on_upsert_and_remove() {
        static FIRED: AtomicUsize = AtomicUsize::new(0);
        let mut store = ScheduleStore::new();
        let handle = store.subscribe(Box::new(|_change| {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }));
        store.upsert(record("A", 10, ShiftCode::Day));
        store.remove(&StaffId::from("A"), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        // remove de una celda vacía no notifica
        store.remove(&StaffId::from("A"), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(FIRED.load(Ordering::SeqCst), 2);
        store.unsubscribe(handle);
        store.upsert(record("A", 11, ShiftCode::Day));
        assert_eq!(FIRED.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn replace_range_discards_stale_local_rows() {
        let mut store = ScheduleStore::new();
        store.upsert(record("A", 10, ShiftCode::Day));
        store.upsert(record("A", 20, ShiftCode::Day)); // fuera del rango visible

        let range = DayRange::new(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
                                  NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        store.replace_range(&[StaffId::from("A")], range, vec![record("A", 11, ShiftCode::Evening)]);

        assert!(store.get(&StaffId::from("A"), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()).is_none());
        assert!(store.get(&StaffId::from("A"), NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()).is_some());
        assert!(store.get(&StaffId::from("A"), NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()).is_some());
    }
}
