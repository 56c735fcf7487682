//! Normalización de días calendario a la zona horaria canónica de la
//! organización.
//!
//! Toda conversión fecha↔día pasa por aquí, en el borde: tanto al convertir
//! una fecha de UI en clave de lookup como al parsear una fecha persistida.
//! La ambigüedad de zona horaria es la fuente clásica de bugs de "el turno
//! desapareció".

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::DomainError;

/// Calendario de la organización: un offset fijo configurado una vez al
/// inicio de la sesión, nunca un global mutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgCalendar {
    offset: FixedOffset,
}

impl OrgCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Calendario en UTC, útil en tests.
    pub fn utc() -> Self {
        Self { offset: FixedOffset::east_opt(0).expect("zero offset is valid") }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Día calendario (hora local de la organización) de un instante UTC.
    pub fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Parsea un día persistido en formato ISO `YYYY-MM-DD`.
    pub fn parse_day(&self, raw: &str) -> Result<NaiveDate, DomainError> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| DomainError::InvalidDay(raw.to_string()))
    }

    /// Formato canónico de un día para persistencia y auditoría.
    pub fn format_day(&self, day: NaiveDate) -> String {
        day.format("%Y-%m-%d").to_string()
    }
}
