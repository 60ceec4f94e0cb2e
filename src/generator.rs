//! Write path: ask the model for a fact for a calendar day, validate it, and
//! persist it to the hosted store.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDate, Utc};
use regex::Regex;

use crate::ephemeris::{NewEphemeris, StoredEphemeris, display_date, month_name, split_event};
use crate::error::{InvalidGeneration, Result};
use crate::llm::FactModel;
use crate::store::EphemerisStore;

/// Fixed system role sent with every generation request.
const SYSTEM_PERSONA: &str = "Eres un experto en astronomía e historia espacial que genera \
    efemérides astronómicas precisas y educativas en español. Siempre respetas el límite de \
    200 palabras máximo y usas un lenguaje científico apropiado pero accesible.";

/// Pause between consecutive model calls in batch mode.
const INTER_CALL_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on accepted event text. The prompt asks for at most 200
/// words; anything far beyond that is a malformed completion.
const MAX_EVENT_CHARS: usize = 2_000;

/// Four-digit years worth trusting in generated text: 1000-1999 or 2000-2099.
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(1\d{3}|20\d{2})\b").expect("valid year pattern"));

/// Result of a single-date generation.
#[derive(Debug)]
pub enum GenerationOutcome {
    Created(StoredEphemeris),
    /// A row for the target date already existed; nothing was generated.
    AlreadyExists,
}

/// Per-day status collected during a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Success,
    Skipped,
    /// The store rejected the insert.
    Failed,
    /// Generation, parsing, or the existence check failed.
    Error,
}

impl std::fmt::Display for DayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DayStatus::Success => "success",
            DayStatus::Skipped => "skipped",
            DayStatus::Failed => "failed",
            DayStatus::Error => "error",
        })
    }
}

/// One line of the batch summary.
#[derive(Debug)]
pub struct DayReport {
    pub date: NaiveDate,
    pub status: DayStatus,
    /// Generated event text, when generation got that far.
    pub event: Option<String>,
}

/// Drafts facts with a model and persists them through a store. Both
/// collaborators are injected so the flow is testable with fakes.
pub struct Generator<S, M> {
    store: S,
    model: M,
    delay: Duration,
}

impl<S: EphemerisStore, M: FactModel> Generator<S, M> {
    pub fn new(store: S, model: M) -> Self {
        Self {
            store,
            model,
            delay: INTER_CALL_DELAY,
        }
    }

    /// Override the inter-call pause. Tests run with `Duration::ZERO`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Generate and persist a fact for one date. Idempotent: an existing row
    /// for `(day, month, year)` reports success without generating.
    pub async fn generate_for_date(&self, date: NaiveDate) -> Result<GenerationOutcome> {
        let (day, month, year) = (date.day(), date.month(), date.year());

        if self.store.exists(day, month, year).await? {
            tracing::info!(day, month, year, "ephemeris already exists, skipping");
            return Ok(GenerationOutcome::AlreadyExists);
        }

        let draft = self.draft(date).await?;
        let stored = self.store.insert(draft).await?;
        tracing::info!(id = stored.id, day, month, year, "ephemeris inserted");
        Ok(GenerationOutcome::Created(stored))
    }

    /// Generate facts for the next `days` consecutive days, one at a time.
    ///
    /// Strictly sequential, with a pause between model calls. Errors are
    /// contained to the day they occur on; partial completion is reported,
    /// never rolled back.
    pub async fn generate_upcoming(&self, days: u32) -> Vec<DayReport> {
        self.generate_upcoming_from(Utc::now().date_naive(), days)
            .await
    }

    /// Batch run starting the day after `start`.
    pub async fn generate_upcoming_from(&self, start: NaiveDate, days: u32) -> Vec<DayReport> {
        let mut reports = Vec::with_capacity(days as usize);

        for offset in 1..=days {
            let date = start + Days::new(u64::from(offset));
            let (day, month, year) = (date.day(), date.month(), date.year());

            match self.store.exists(day, month, year).await {
                Ok(true) => {
                    tracing::info!(day, month, year, "already exists, skipping");
                    reports.push(DayReport {
                        date,
                        status: DayStatus::Skipped,
                        event: None,
                    });
                    continue;
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(%error, day, month, year, "existence check failed");
                    reports.push(DayReport {
                        date,
                        status: DayStatus::Error,
                        event: None,
                    });
                    continue;
                }
            }

            match self.draft(date).await {
                Ok(draft) => {
                    let event = draft.event.clone();
                    let status = match self.store.insert(draft).await {
                        Ok(stored) => {
                            tracing::info!(id = stored.id, day, month, year, "ephemeris inserted");
                            DayStatus::Success
                        }
                        Err(error) => {
                            tracing::warn!(%error, day, month, year, "insert failed");
                            DayStatus::Failed
                        }
                    };
                    reports.push(DayReport {
                        date,
                        status,
                        event: Some(event),
                    });

                    if offset < days {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, day, month, year, "generation failed");
                    reports.push(DayReport {
                        date,
                        status: DayStatus::Error,
                        event: None,
                    });
                }
            }
        }

        reports
    }

    async fn draft(&self, date: NaiveDate) -> Result<NewEphemeris> {
        let prompt = build_prompt(date);
        tracing::info!(
            day = date.day(),
            month = date.month(),
            year = date.year(),
            "requesting fact from model"
        );
        let text = self.model.complete(SYSTEM_PERSONA, &prompt).await?;
        Ok(parse_generated(&text, date)?)
    }
}

/// Instruction for one astronomy fact on an exact calendar day, in the
/// `"Título - Descripción"` shape the parser expects.
fn build_prompt(date: NaiveDate) -> String {
    format!(
        "Genera una efeméride astronómica precisa y educativa para el {day} de {month} de {year}.\n\
         \n\
         REQUISITOS IMPORTANTES:\n\
         1. La efeméride debe ser históricamente precisa y verificable\n\
         2. Debe estar relacionada con astronomía, exploración espacial, o eventos celestiales\n\
         3. Si no hay un evento específico para esta fecha exacta, puedes usar eventos que \
         ocurrieron en fechas cercanas o eventos astronómicos regulares\n\
         4. El formato debe ser: \"[Título del evento] - [Descripción educativa de 1-2 oraciones]\"\n\
         5. Incluye el año histórico cuando sea relevante\n\
         6. La descripción debe ser interesante y educativa\n\
         7. MÁXIMO 200 PALABRAS en total\n\
         8. Escribe EXCLUSIVAMENTE en español con vocabulario científico apropiado\n\
         \n\
         EJEMPLOS de buenos formatos:\n\
         - \"Conjunción de Venus y Marte - Evento astronómico donde Venus y Marte aparecen muy \
         cerca en el cielo nocturno, ofreciendo una excelente oportunidad de observación para \
         astrónomos aficionados\"\n\
         - \"Alunizaje del Apollo 11 (1969) - Neil Armstrong y Buzz Aldrin se convirtieron en los \
         primeros humanos en caminar sobre la superficie lunar, marcando un hito histórico en la \
         exploración espacial\"\n\
         - \"Lluvia de meteoros Perseidas - Máximo de actividad de esta lluvia de meteoros \
         originada por los restos del cometa Swift-Tuttle, visible desde el hemisferio norte\"\n\
         \n\
         TIPOS DE EVENTOS que puedes usar:\n\
         - Eventos de exploración espacial (lanzamientos, alunizajes, misiones)\n\
         - Fenómenos astronómicos (conjunciones, oposiciones, eclipses, lluvias de meteoros)\n\
         - Descubrimientos astronómicos importantes\n\
         - Aniversarios de observatorios o telescopios importantes\n\
         - Eventos relacionados con planetas, asteroides, cometas\n\
         \n\
         Responde SOLO con el evento en el formato solicitado, sin explicaciones adicionales. \
         Asegúrate de que sea educativo y no exceda 200 palabras.",
        day = date.day(),
        month = month_name(date.month()),
        year = date.year(),
    )
}

/// Validate generated text and assemble the row to insert.
///
/// The model's output is untrusted: it must be non-empty on both sides of
/// the separator and bounded in length. The historical year is recovered
/// from the first plausible four-digit token, defaulting to the target year.
fn parse_generated(
    text: &str,
    date: NaiveDate,
) -> std::result::Result<NewEphemeris, InvalidGeneration> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InvalidGeneration("empty completion".to_string()));
    }
    if text.chars().count() > MAX_EVENT_CHARS {
        return Err(InvalidGeneration(format!(
            "completion exceeds {MAX_EVENT_CHARS} characters"
        )));
    }

    let (title, description) = split_event(text);
    if title.trim().is_empty() || description.trim().is_empty() {
        return Err(InvalidGeneration(
            "missing title or description around separator".to_string(),
        ));
    }

    let historical_year = YEAR_PATTERN
        .find(description)
        .and_then(|token| token.as_str().parse::<i32>().ok())
        .unwrap_or_else(|| date.year());

    Ok(NewEphemeris {
        day: date.day(),
        month: date.month(),
        year: date.year(),
        event: text.to_string(),
        display_date: display_date(date),
        historical_day: date.day(),
        historical_month: date.month(),
        historical_year,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::Ephemeris;
    use crate::error::{LlmError, StoreError};

    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[derive(Default)]
    struct FakeStore {
        existing: HashSet<(u32, u32, i32)>,
        inserted: Mutex<Vec<NewEphemeris>>,
        fail_inserts: bool,
        fail_exists: bool,
    }

    impl EphemerisStore for FakeStore {
        async fn exists(
            &self,
            day: u32,
            month: u32,
            year: i32,
        ) -> std::result::Result<bool, StoreError> {
            if self.fail_exists {
                return Err(StoreError::EmptyInsert);
            }
            Ok(self.existing.contains(&(day, month, year)))
        }

        async fn insert(
            &self,
            row: NewEphemeris,
        ) -> std::result::Result<StoredEphemeris, StoreError> {
            if self.fail_inserts {
                return Err(StoreError::EmptyInsert);
            }
            let mut inserted = self.inserted.lock().unwrap();
            let stored = StoredEphemeris {
                id: inserted.len() as i64 + 1,
                day: row.day,
                month: row.month,
                year: row.year,
                event: row.event.clone(),
                display_date: row.display_date.clone(),
                historical_day: Some(row.historical_day),
                historical_month: Some(row.historical_month),
                historical_year: Some(row.historical_year),
                created_at: None,
                updated_at: None,
            };
            inserted.push(row);
            Ok(stored)
        }
    }

    struct FakeModel {
        calls: AtomicUsize,
        response: std::result::Result<String, ()>,
    }

    impl FakeModel {
        fn answering(text: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Ok(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Err(()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FactModel for FakeModel {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
        ) -> std::result::Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(LlmError::EmptyCompletion),
            }
        }
    }

    fn generator(store: FakeStore, model: FakeModel) -> Generator<FakeStore, FakeModel> {
        Generator::new(store, model).with_delay(Duration::ZERO)
    }

    const SAMPLE_EVENT: &str =
        "Alunizaje del Apollo 11 - Neil Armstrong caminó sobre la Luna en 1969";

    #[test]
    fn parse_splits_on_first_separator() {
        let draft = parse_generated(
            "Conjunción de Venus y Marte - Evento astronómico - doble separador",
            date(2025, 6, 15),
        )
        .unwrap();

        assert_eq!(draft.event, "Conjunción de Venus y Marte - Evento astronómico - doble separador");
        assert_eq!(draft.day, 15);
        assert_eq!(draft.month, 6);
        assert_eq!(draft.year, 2025);
        assert_eq!(draft.display_date, "2025-06-15");
    }

    #[test]
    fn parse_recovers_historical_year() {
        let draft = parse_generated(SAMPLE_EVENT, date(2025, 7, 20)).unwrap();
        assert_eq!(draft.historical_year, 1969);
        assert_eq!(draft.historical_day, 20);
        assert_eq!(draft.historical_month, 7);
    }

    #[test]
    fn parse_defaults_year_when_no_token_found() {
        let draft = parse_generated(
            "Oposición de Marte - El planeta rojo brilla toda la noche",
            date(2025, 6, 15),
        )
        .unwrap();
        assert_eq!(draft.historical_year, 2025);
    }

    #[test]
    fn parse_ignores_years_outside_plausible_range() {
        // 2150 does not match 1xxx/20xx; 150 is not four digits.
        let draft = parse_generated(
            "Evento futuro - Predicho para el año 2150 a 150 días vista",
            date(2025, 6, 15),
        )
        .unwrap();
        assert_eq!(draft.historical_year, 2025);
    }

    #[test]
    fn parse_rejects_empty_and_overlong_text() {
        assert!(parse_generated("   ", date(2025, 6, 15)).is_err());

        let overlong = "a".repeat(MAX_EVENT_CHARS + 1);
        assert!(parse_generated(&overlong, date(2025, 6, 15)).is_err());
    }

    #[test]
    fn prompt_names_the_target_date_and_format() {
        let prompt = build_prompt(date(2025, 6, 15));
        assert!(prompt.contains("15 de junio de 2025"));
        assert!(prompt.contains("[Título del evento] - [Descripción educativa"));
        assert!(prompt.contains("200 PALABRAS"));
    }

    #[tokio::test]
    async fn single_date_inserts_parsed_row() {
        let generator = generator(FakeStore::default(), FakeModel::answering(SAMPLE_EVENT));

        let outcome = generator.generate_for_date(date(2025, 7, 20)).await.unwrap();
        let GenerationOutcome::Created(stored) = outcome else {
            panic!("expected a created row");
        };
        assert_eq!(stored.event, SAMPLE_EVENT);
        assert_eq!(stored.display_date, "2025-07-20");
        assert_eq!(stored.historical_year, Some(1969));

        let inserted = generator.store.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].day, 20);
        assert_eq!(inserted[0].month, 7);
        assert_eq!(inserted[0].year, 2025);
    }

    #[tokio::test]
    async fn single_date_is_idempotent() {
        let mut store = FakeStore::default();
        store.existing.insert((20, 7, 2025));
        let generator = generator(store, FakeModel::answering(SAMPLE_EVENT));

        let outcome = generator.generate_for_date(date(2025, 7, 20)).await.unwrap();
        assert!(matches!(outcome, GenerationOutcome::AlreadyExists));
        assert_eq!(generator.model.call_count(), 0);
        assert!(generator.store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exists_matches_exact_triple_only() {
        let mut store = FakeStore::default();
        store.existing.insert((15, 6, 2025));

        assert!(store.exists(15, 6, 2025).await.unwrap());
        assert!(!store.exists(16, 6, 2025).await.unwrap());
        assert!(!store.exists(15, 7, 2025).await.unwrap());
        assert!(!store.exists(15, 6, 2024).await.unwrap());
    }

    #[tokio::test]
    async fn batch_skips_existing_day_and_limits_model_calls() {
        let start = date(2025, 6, 14);
        let mut store = FakeStore::default();
        // Day 2 of the run (June 16) already has a row.
        store.existing.insert((16, 6, 2025));
        let generator = generator(store, FakeModel::answering(SAMPLE_EVENT));

        let reports = generator.generate_upcoming_from(start, 3).await;

        assert_eq!(reports.len(), 3);
        let statuses: Vec<DayStatus> = reports.iter().map(|report| report.status).collect();
        assert_eq!(
            statuses,
            vec![DayStatus::Success, DayStatus::Skipped, DayStatus::Success]
        );
        assert_eq!(generator.model.call_count(), 2);
        assert_eq!(generator.store.inserted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn batch_contains_model_failures_to_their_day() {
        let generator = generator(FakeStore::default(), FakeModel::failing());

        let reports = generator.generate_upcoming_from(date(2025, 6, 14), 2).await;

        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|report| report.status == DayStatus::Error));
        assert!(generator.store.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_marks_store_rejections_as_failed() {
        let store = FakeStore {
            fail_inserts: true,
            ..FakeStore::default()
        };
        let generator = generator(store, FakeModel::answering(SAMPLE_EVENT));

        let reports = generator.generate_upcoming_from(date(2025, 6, 14), 1).await;
        assert_eq!(reports[0].status, DayStatus::Failed);
        assert_eq!(reports[0].event.as_deref(), Some(SAMPLE_EVENT));
    }

    #[tokio::test]
    async fn batch_marks_existence_check_errors() {
        let store = FakeStore {
            fail_exists: true,
            ..FakeStore::default()
        };
        let generator = generator(store, FakeModel::answering(SAMPLE_EVENT));

        let reports = generator.generate_upcoming_from(date(2025, 6, 14), 1).await;
        assert_eq!(reports[0].status, DayStatus::Error);
        assert_eq!(generator.model.call_count(), 0);
    }

    #[tokio::test]
    async fn generated_row_round_trips_through_display_conversion() {
        let generator = generator(FakeStore::default(), FakeModel::answering(SAMPLE_EVENT));

        let outcome = generator.generate_for_date(date(2025, 7, 20)).await.unwrap();
        let GenerationOutcome::Created(stored) = outcome else {
            panic!("expected a created row");
        };

        let (title, description) = split_event(SAMPLE_EVENT);
        let card = Ephemeris::from(stored);
        assert_eq!(card.title, title);
        assert!(card.description.ends_with(&description.to_lowercase()));
        assert_eq!(card.date, "07-20");
    }
}
