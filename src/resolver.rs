//! Read path: resolve one ephemeris per calendar date, no matter what.

use chrono::NaiveDate;

use crate::ephemeris::Ephemeris;
use crate::error::StoreError;
use crate::fallback::FallbackTable;

/// A backend that may know an ephemeris for a calendar date.
///
/// Two implementations exist: the hosted store and the compiled-in fallback
/// table. The resolver composes a primary source with the fallback so the
/// recovery path stays independently testable.
#[allow(async_fn_in_trait)]
pub trait EphemerisSource {
    /// Look up the ephemeris for one calendar date.
    async fn for_date(&self, date: NaiveDate) -> Result<Option<Ephemeris>, StoreError>;

    /// Every known ephemeris, ordered by month then day.
    async fn all(&self) -> Result<Vec<Ephemeris>, StoreError>;
}

/// Fallback lookups never fail and always yield a record.
impl EphemerisSource for FallbackTable {
    async fn for_date(&self, date: NaiveDate) -> Result<Option<Ephemeris>, StoreError> {
        Ok(Some(FallbackTable::for_date(self, date)))
    }

    async fn all(&self) -> Result<Vec<Ephemeris>, StoreError> {
        Ok(FallbackTable::all(self))
    }
}

/// Composes a primary source with the static fallback table.
pub struct Resolver<S> {
    primary: S,
    fallback: FallbackTable,
}

impl<S: EphemerisSource> Resolver<S> {
    pub fn new(primary: S) -> Self {
        Self {
            primary,
            fallback: FallbackTable,
        }
    }

    /// Total resolution: never returns an error to the caller. Store
    /// failures are logged and routed to the fallback table.
    pub async fn resolve(&self, date: NaiveDate) -> Ephemeris {
        match self.primary.for_date(date).await {
            Ok(Some(ephemeris)) => ephemeris,
            Ok(None) => {
                tracing::debug!(%date, "no stored ephemeris, using fallback");
                self.fallback.for_date(date)
            }
            Err(error) => {
                tracing::warn!(%error, %date, "store lookup failed, using fallback");
                self.fallback.for_date(date)
            }
        }
    }

    /// Full-table export. A store failure yields the fallback table instead.
    pub async fn resolve_all(&self) -> Vec<Ephemeris> {
        match self.primary.all().await {
            Ok(all) => all,
            Err(error) => {
                tracing::warn!(%error, "store export failed, using fallback table");
                self.fallback.all()
            }
        }
    }
}
