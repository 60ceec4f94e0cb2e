//! Shared data shapes: rows in the hosted store, the display card, and the
//! conversion between them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Separator between title and description inside the `event` field.
pub const EVENT_SEPARATOR: &str = " - ";

/// Spanish month names, indexed by zero-based month.
pub const MONTH_NAMES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// A row of the hosted `ephemerides` table.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredEphemeris {
    pub id: i64,
    pub day: u32,
    pub month: u32,
    /// Year the row was generated for, not necessarily the year of the fact.
    pub year: i32,
    /// Free text, `"Title - Description"` by convention.
    pub event: String,
    /// `YYYY-MM-DD` of the calendar date the row was generated for.
    pub display_date: String,
    #[serde(default)]
    pub historical_day: Option<u32>,
    #[serde(default)]
    pub historical_month: Option<u32>,
    /// Year the fact actually refers to, when it could be recovered.
    #[serde(default)]
    pub historical_year: Option<i32>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Insert shape for new rows; the store assigns `id` and timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct NewEphemeris {
    pub day: u32,
    pub month: u32,
    pub year: i32,
    pub event: String,
    pub display_date: String,
    pub historical_day: u32,
    pub historical_month: u32,
    pub historical_year: i32,
}

/// The card displayed for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ephemeris {
    /// Zero-padded `MM-DD`, the year-independent lookup key.
    pub date: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constellation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f32>,
}

/// Closed set of card categories. Serialises as the Spanish label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    #[serde(rename = "Conjunción Planetaria")]
    ConjuncionPlanetaria,
    #[serde(rename = "Lluvia de Meteoros")]
    LluviaDeMeteoros,
    #[serde(rename = "Oposición Planetaria")]
    OposicionPlanetaria,
    #[serde(rename = "Exploración Espacial")]
    ExploracionEspacial,
    #[serde(rename = "Descubrimiento Histórico")]
    DescubrimientoHistorico,
    #[serde(rename = "Descubrimiento")]
    Descubrimiento,
    #[serde(rename = "Evento Orbital")]
    EventoOrbital,
    #[serde(rename = "Efeméride Astronómica")]
    EfemerideAstronomica,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::ConjuncionPlanetaria => "Conjunción Planetaria",
            Category::LluviaDeMeteoros => "Lluvia de Meteoros",
            Category::OposicionPlanetaria => "Oposición Planetaria",
            Category::ExploracionEspacial => "Exploración Espacial",
            Category::DescubrimientoHistorico => "Descubrimiento Histórico",
            Category::Descubrimiento => "Descubrimiento",
            Category::EventoOrbital => "Evento Orbital",
            Category::EfemerideAstronomica => "Efeméride Astronómica",
        }
    }

    /// Keyword classifier over the event title, case-insensitive.
    ///
    /// Rule order matters: the first match wins, so a title naming both a
    /// meteor shower and an opposition classifies as Lluvia de Meteoros.
    pub fn classify(title: &str) -> Self {
        let title = title.to_lowercase();
        if title.contains("conjunción") {
            Category::ConjuncionPlanetaria
        } else if title.contains("lluvia") || title.contains("meteoros") {
            Category::LluviaDeMeteoros
        } else if title.contains("oposición") {
            Category::OposicionPlanetaria
        } else if title.contains("alunizaje")
            || title.contains("caminata lunar")
            || title.contains("apollo")
        {
            Category::ExploracionEspacial
        } else if title.contains("descubrimiento") {
            Category::DescubrimientoHistorico
        } else if title.contains("lanzamiento")
            || title.contains("misión")
            || title.contains("telescopio")
        {
            Category::ExploracionEspacial
        } else {
            Category::EfemerideAstronomica
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Split an event string on the first `" - "`. Without a separator both
/// halves are the whole string.
pub fn split_event(event: &str) -> (&str, &str) {
    match event.split_once(EVENT_SEPARATOR) {
        Some((title, description)) => (title, description),
        None => (event, event),
    }
}

/// Name of a 1-based month. Out-of-range input clamps to the nearest month
/// rather than panicking; store rows are constrained to 1-12 upstream.
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month.saturating_sub(1) as usize).min(11)]
}

/// Zero-padded `MM-DD` lookup key.
pub fn date_key(month: u32, day: u32) -> String {
    format!("{month:02}-{day:02}")
}

/// `YYYY-MM-DD` string for a calendar date.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl From<StoredEphemeris> for Ephemeris {
    fn from(row: StoredEphemeris) -> Self {
        let (title, base_description) = split_event(&row.event);

        let year = row.historical_year.unwrap_or(row.year);
        let month = row.historical_month.unwrap_or(row.month);
        let day = row.historical_day.unwrap_or(row.day);

        let description = format!(
            "El {day} de {} de {year}, {}",
            month_name(month),
            base_description.to_lowercase(),
        );

        Ephemeris {
            date: date_key(row.month, row.day),
            title: title.to_string(),
            description,
            category: Category::classify(title),
            year: Some(year),
            constellation: None,
            magnitude: None,
        }
    }
}
