//! Taxonomía de errores del motor.
//!
//! `Validation` y `Authorization` se rechazan localmente sin tocar el store.
//! `Persistence` dispara el rollback del coordinador y se muestra al usuario
//! con opción de reintento. `StreamDisconnected` es un indicador pasivo de
//! conectividad; la reconexión es automática. Los conflictos de generación
//! NUNCA son errores: viajan como datos dentro del `Proposal`.

use thiserror::Error;

use crate::gateway::GatewayError;
use roster_domain::{BranchId, DomainError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RosterError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("branch {0} is not accessible to this session")]
    Authorization(BranchId),
    #[error("persistence failure: {0}")]
    Persistence(#[from] GatewayError),
    #[error("notification stream disconnected")]
    StreamDisconnected,
}
