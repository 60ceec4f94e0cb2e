//! Compiled-in fallback records, used whenever the hosted store is
//! unreachable or has nothing for a date.

use chrono::{Datelike, NaiveDate};

use crate::ephemeris::{Category, Ephemeris, date_key};

struct StaticEphemeris {
    /// Zero-padded `MM-DD` key; at most one entry per key.
    date: &'static str,
    title: &'static str,
    description: &'static str,
    category: Category,
    year: Option<i32>,
    constellation: Option<&'static str>,
    magnitude: Option<f32>,
}

impl StaticEphemeris {
    fn to_ephemeris(&self) -> Ephemeris {
        Ephemeris {
            date: self.date.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            category: self.category,
            year: self.year,
            constellation: self.constellation.map(str::to_string),
            magnitude: self.magnitude,
        }
    }
}

const FALLBACK_TABLE: [StaticEphemeris; 7] = [
    StaticEphemeris {
        date: "01-01",
        title: "Conjunción de Júpiter y Saturno",
        description: "En esta fecha histórica, Júpiter y Saturno aparecen muy cerca en el cielo nocturno, un evento conocido como la 'Gran Conjunción' que ocurre aproximadamente cada 20 años.",
        category: Category::ConjuncionPlanetaria,
        year: Some(2020),
        constellation: Some("Acuario"),
        magnitude: Some(-2.0),
    },
    StaticEphemeris {
        date: "01-02",
        title: "Perihelio de la Tierra",
        description: "La Tierra alcanza su punto más cercano al Sol en su órbita elíptica, aproximadamente 147 millones de kilómetros. Paradójicamente, esto ocurre durante el invierno en el hemisferio norte.",
        category: Category::EventoOrbital,
        year: Some(2024),
        constellation: None,
        magnitude: None,
    },
    StaticEphemeris {
        date: "01-03",
        title: "Lluvia de meteoros Cuadrántidas",
        description: "Una de las lluvias de meteoros más intensas del año, con hasta 120 meteoros por hora en su pico. Originada por los restos del asteroide 2003 EH1.",
        category: Category::LluviaDeMeteoros,
        year: None,
        constellation: Some("Boyero"),
        magnitude: None,
    },
    StaticEphemeris {
        date: "01-04",
        title: "Descubrimiento de Ceres",
        description: "Giuseppe Piazzi descubrió Ceres, el primer asteroide conocido y ahora clasificado como planeta enano, desde el Observatorio de Palermo en Sicilia.",
        category: Category::Descubrimiento,
        year: Some(1801),
        constellation: Some("Tauro"),
        magnitude: None,
    },
    StaticEphemeris {
        date: "01-05",
        title: "Lanzamiento del Surveyor 7",
        description: "La NASA lanzó la sonda Surveyor 7, la última de la serie Surveyor, que aterrizó cerca del cráter Tycho en la Luna para estudiar su composición.",
        category: Category::ExploracionEspacial,
        year: Some(1968),
        constellation: None,
        magnitude: None,
    },
    StaticEphemeris {
        date: "01-06",
        title: "Descubrimiento de las lunas de Júpiter",
        description: "Galileo Galilei observó por primera vez las cuatro lunas más grandes de Júpiter: Ío, Europa, Ganimedes y Calisto, conocidas como las lunas galileanas.",
        category: Category::DescubrimientoHistorico,
        year: Some(1610),
        constellation: Some("Géminis"),
        magnitude: None,
    },
    StaticEphemeris {
        date: "01-07",
        title: "Oposición de Marte",
        description: "Marte se encuentra en oposición, apareciendo más brillante y grande en el cielo nocturno. Es el momento ideal para la observación del planeta rojo.",
        category: Category::OposicionPlanetaria,
        year: None,
        constellation: Some("Cáncer"),
        magnitude: Some(-1.6),
    },
];

/// The immutable fallback table. Lookup is total: every date maps to exactly
/// one record.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackTable;

impl FallbackTable {
    /// Record for a date: exact `MM-DD` match when present, otherwise a
    /// deterministic index into the table.
    pub fn for_date(&self, date: NaiveDate) -> Ephemeris {
        let key = date_key(date.month(), date.day());
        if let Some(entry) = FALLBACK_TABLE.iter().find(|entry| entry.date == key) {
            return entry.to_ephemeris();
        }

        let index = (date.month0() as usize * 31 + date.day() as usize) % FALLBACK_TABLE.len();
        FALLBACK_TABLE[index].to_ephemeris()
    }

    /// Every fallback record, already in `(month, day)` order.
    pub fn all(&self) -> Vec<Ephemeris> {
        FALLBACK_TABLE
            .iter()
            .map(StaticEphemeris::to_ephemeris)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn exact_key_match_wins() {
        let ephemeris = FallbackTable.for_date(date(2026, 1, 4));
        assert_eq!(ephemeris.title, "Descubrimiento de Ceres");
        assert_eq!(ephemeris.category, Category::Descubrimiento);
    }

    #[test]
    fn unlisted_date_uses_deterministic_index() {
        // June 15: month index 5, so (5 * 31 + 15) % 7 == 2.
        let ephemeris = FallbackTable.for_date(date(2026, 6, 15));
        assert_eq!(ephemeris, FALLBACK_TABLE[2].to_ephemeris());
        assert_eq!(ephemeris.title, "Lluvia de meteoros Cuadrántidas");
    }

    #[test]
    fn lookup_is_total_over_the_calendar() {
        for month in 1..=12u32 {
            for day in 1..=31u32 {
                let Some(d) = NaiveDate::from_ymd_opt(2024, month, day) else {
                    continue;
                };
                let ephemeris = FallbackTable.for_date(d);
                assert!(!ephemeris.title.is_empty());
                assert!(!ephemeris.description.is_empty());
                assert_eq!(ephemeris.date.len(), 5, "key must be MM-DD");
            }
        }
    }

    #[test]
    fn same_date_always_yields_same_record() {
        let first = FallbackTable.for_date(date(2024, 9, 23));
        let second = FallbackTable.for_date(date(2025, 9, 23));
        assert_eq!(first, second);
    }
}
