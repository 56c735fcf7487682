//! Errores del dominio (validación de valores, nunca de IO).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid calendar day: {0}")]
    InvalidDay(String),
}
