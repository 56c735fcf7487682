//! roster-core: motor de roster. Store de turnos, generación con
//! conflictos, mutaciones optimistas y reconciliación en tiempo real.
pub mod audit;
pub mod errors;
pub mod gateway;
pub mod generation;
pub mod mutation;
pub mod pattern;
pub mod reconcile;
pub mod session;
pub mod store;

pub use audit::{AuditLog, InMemoryAuditLog};
pub use errors::RosterError;
pub use gateway::{ChangeEvent, ChangeOp, DayRange, GatewayError, NotificationGateway, PersistenceGateway,
                  ScopeFilter, Subscription, SubscriptionHandle, UpdateAck, WriteAck};
pub use generation::{ConflictDescriptor, ConflictKind, GenerationAction, GenerationEngine, Proposal,
                     ProposedMutation};
pub use mutation::{CellEdit, EditOutcome, EditPhase, MutationCoordinator};
pub use pattern::{PatternDay, ShiftPattern};
pub use reconcile::{ConnectionState, RealtimeReconciler, RecentMutations, ECHO_WINDOW};
pub use session::{RosterSession, SessionConfig};
pub use store::{lock_store, ListenerHandle, ScheduleStore, SharedScheduleStore, StoreChange, StoreChangeKind,
                StoreListener};
