//! Taxonomía de turnos y reglas de combinación con horas extra.
//!
//! Rol en el sistema:
//! - `ShiftCode` es el contrato estable de códigos de turno.
//! - `combination_for` es la ÚNICA implementación de la regla de display
//!   `base + OT`: las pantallas nunca la reimplementan, sólo la consumen.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::DomainError;

/// Códigos de turno soportados.
///
/// Invariante: `Overtime` nunca se almacena como asignación independiente;
/// sólo modifica `Day` o `Evening` vía `overtime_hours`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftCode {
    Day,
    Evening,
    HalfDay,
    RestDay,
    Leave,
    Overtime,
    Training,
}

impl ShiftCode {
    /// Etiqueta corta usada por las celdas del roster.
    pub fn label(&self) -> &'static str {
        match self {
            ShiftCode::Day => "D",
            ShiftCode::Evening => "E",
            ShiftCode::HalfDay => "HD",
            ShiftCode::RestDay => "RD",
            ShiftCode::Leave => "L",
            ShiftCode::Overtime => "OT",
            ShiftCode::Training => "T",
        }
    }

    /// Turnos que cuentan como jornada laboral (para solape con licencias).
    pub fn is_working(&self) -> bool {
        matches!(self, ShiftCode::Day | ShiftCode::Evening | ShiftCode::HalfDay | ShiftCode::Overtime)
    }

    /// Sólo `Day` y `Evening` admiten fusión `+OT` en el código mostrado.
    pub fn fuses_overtime(&self) -> bool {
        matches!(self, ShiftCode::Day | ShiftCode::Evening)
    }
}

impl fmt::Display for ShiftCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Código de display compuesto: el código de celda más una anotación
/// opcional que nunca se fusiona con el código.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayCode {
    pub code: String,
    pub annotation: Option<String>,
}

impl fmt::Display for DisplayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.annotation {
            Some(a) => write!(f, "{} ({})", self.code, a),
            None => f.write_str(&self.code),
        }
    }
}

/// Regla central de combinación turno + horas extra.
///
/// - `overtime_hours == 0` → etiqueta base tal cual.
/// - base ∈ {Day, Evening} y horas > 0 → código fusionado `"D+OT"` / `"E+OT"`.
/// - cualquier otro base con horas > 0 → etiqueta base intacta y las horas
///   como anotación separada, nunca fusionadas.
pub fn combination_for(base: ShiftCode, overtime_hours: f64) -> DisplayCode {
    if overtime_hours <= 0.0 {
        return DisplayCode { code: base.label().to_string(), annotation: None };
    }
    if base.fuses_overtime() {
        return DisplayCode { code: format!("{}+OT", base.label()), annotation: None };
    }
    DisplayCode { code: base.label().to_string(),
                  annotation: Some(format!("OT {}h", overtime_hours)) }
}

/// Valida una asignación antes de tocar el store o la red.
pub fn validate_assignment(code: ShiftCode, overtime_hours: f64) -> Result<(), DomainError> {
    if matches!(code, ShiftCode::Overtime) {
        return Err(DomainError::Validation(
            "overtime is a modifier, not a standalone assignment".to_string(),
        ));
    }
    if !overtime_hours.is_finite() || overtime_hours < 0.0 {
        return Err(DomainError::Validation(format!("invalid overtime hours: {overtime_hours}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_with_overtime_fuses() {
        let d = combination_for(ShiftCode::Day, 2.0);
        assert_eq!(d.code, "D+OT");
        assert!(d.annotation.is_none());
    }

    #[test]
    fn evening_without_overtime_is_plain() {
        let d = combination_for(ShiftCode::Evening, 0.0);
        assert_eq!(d.code, "E");
        assert!(d.annotation.is_none());
    }

    #[test]
    fn rest_day_overtime_never_fuses() {
        let d = combination_for(ShiftCode::RestDay, 3.0);
        assert_eq!(d.code, "RD");
        assert_eq!(d.annotation.as_deref(), Some("OT 3h"));
    }

    #[test]
    fn standalone_overtime_is_rejected() {
        assert!(validate_assignment(ShiftCode::Overtime, 0.0).is_err());
        assert!(validate_assignment(ShiftCode::Day, -1.0).is_err());
        assert!(validate_assignment(ShiftCode::Day, f64::NAN).is_err());
        assert!(validate_assignment(ShiftCode::Training, 2.0).is_ok());
    }
}
