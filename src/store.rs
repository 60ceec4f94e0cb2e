//! PostgREST client for the hosted `ephemerides` table.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::config::Config;
use crate::ephemeris::{Ephemeris, NewEphemeris, StoredEphemeris, display_date};
use crate::error::StoreError;
use crate::resolver::EphemerisSource;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Rows are created by the generator and only ever read afterwards.
#[allow(async_fn_in_trait)]
pub trait EphemerisStore {
    /// Whether a row already exists for exactly `(day, month, year)`.
    async fn exists(&self, day: u32, month: u32, year: i32) -> Result<bool, StoreError>;

    /// Insert a new row and return it as stored.
    async fn insert(&self, row: NewEphemeris) -> Result<StoredEphemeris, StoreError>;
}

/// Client for the hosted store, constructed once at process start and reused
/// for every call.
pub struct SupabaseStore {
    client: reqwest::Client,
    table_url: String,
    anon_key: String,
}

/// Shape of `select=id` probe responses.
#[derive(Debug, Deserialize)]
struct IdRow {
    #[allow(dead_code)]
    id: i64,
}

/// PostgREST equality filter value.
fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl SupabaseStore {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/ephemerides", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
        })
    }

    /// First row generated for `(month, day)`, any year.
    pub async fn find_by_month_day(
        &self,
        month: u32,
        day: u32,
    ) -> Result<Option<StoredEphemeris>, StoreError> {
        let rows = self
            .select(&[
                ("month", eq(month)),
                ("day", eq(day)),
                ("limit", "1".to_string()),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Row stored under an exact `YYYY-MM-DD` display date.
    pub async fn find_by_display_date(
        &self,
        date: &str,
    ) -> Result<Option<StoredEphemeris>, StoreError> {
        let rows = self
            .select(&[("display_date", eq(date)), ("limit", "1".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Every row, ordered by `(month, day)`.
    pub async fn list_all(&self) -> Result<Vec<StoredEphemeris>, StoreError> {
        self.select(&[("order", "month,day".to_string())]).await
    }

    async fn select(&self, query: &[(&str, String)]) -> Result<Vec<StoredEphemeris>, StoreError> {
        let response = self
            .client
            .get(&self.table_url)
            .query(query)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .await?;

        let body = Self::successful_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn successful_body(response: reqwest::Response) -> Result<String, StoreError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Rejected { status, body });
        }
        Ok(body)
    }
}

impl EphemerisStore for SupabaseStore {
    async fn exists(&self, day: u32, month: u32, year: i32) -> Result<bool, StoreError> {
        let response = self
            .client
            .get(&self.table_url)
            .query(&[
                ("select", "id".to_string()),
                ("day", eq(day)),
                ("month", eq(month)),
                ("year", eq(year)),
                ("limit", "1".to_string()),
            ])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .await?;

        let body = Self::successful_body(response).await?;
        let rows: Vec<IdRow> = serde_json::from_str(&body)?;
        Ok(!rows.is_empty())
    }

    async fn insert(&self, row: NewEphemeris) -> Result<StoredEphemeris, StoreError> {
        let response = self
            .client
            .post(&self.table_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        let body = Self::successful_body(response).await?;
        let mut rows: Vec<StoredEphemeris> = serde_json::from_str(&body)?;
        rows.pop().ok_or(StoreError::EmptyInsert)
    }
}

impl EphemerisSource for SupabaseStore {
    /// Two query strategies in order: `(month, day)`, then the exact
    /// `display_date` for the date's year. A failure of the first strategy
    /// is logged and the second is still attempted.
    async fn for_date(&self, date: NaiveDate) -> Result<Option<Ephemeris>, StoreError> {
        match self.find_by_month_day(date.month(), date.day()).await {
            Ok(Some(row)) => return Ok(Some(row.into())),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(%error, "month/day lookup failed, trying display_date");
            }
        }

        let row = self.find_by_display_date(&display_date(date)).await?;
        Ok(row.map(Ephemeris::from))
    }

    async fn all(&self) -> Result<Vec<Ephemeris>, StoreError> {
        let rows = self.list_all().await?;
        Ok(rows.into_iter().map(Ephemeris::from).collect())
    }
}
