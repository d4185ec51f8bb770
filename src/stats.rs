//! Soft-delete statistics for the admin dashboards.
//!
//! Raw counts only — no provenance logic. The uncached fetch is the
//! consistency source of truth (`active + deleted = total` for every
//! scope); `StatsCache` serves dashboards within a stated staleness
//! bound and is never consulted by the cascade engine itself.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{Datelike, Duration as ChronoDuration, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cascade::LifecycleError;
use crate::config;
use crate::db::repository::get_entity;
use crate::db::DatabaseError;
use crate::hierarchy::collect_subtree;

/// Active/deleted counts and calendar-bucketed deletion rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeleteStats {
    pub total: u32,
    /// Non-deleted entities; `active + deleted = total` always holds.
    pub active: u32,
    pub deleted: u32,
    pub deleted_today: u32,
    pub deleted_this_week: u32,
    pub deleted_this_month: u32,
}

/// Compute stats for one organization's subtree (scope inclusive) or
/// system-wide (`None`). Reads the entity store directly, bypassing any
/// cache.
pub fn fetch_soft_delete_stats(
    conn: &Connection,
    scope_id: Option<&Uuid>,
) -> Result<SoftDeleteStats, LifecycleError> {
    let now = Utc::now().naive_utc();
    fetch_stats_at(conn, scope_id, now)
}

/// Same as `fetch_soft_delete_stats` with an explicit "now" for the
/// calendar buckets (UTC day / ISO week / calendar month).
pub(crate) fn fetch_stats_at(
    conn: &Connection,
    scope_id: Option<&Uuid>,
    now: NaiveDateTime,
) -> Result<SoftDeleteStats, LifecycleError> {
    let rows = match scope_id {
        None => all_deletion_rows(conn)?,
        Some(id) => {
            get_entity(conn, id)?.ok_or(LifecycleError::NotFound(*id))?;
            scoped_deletion_rows(conn, id)?
        }
    };

    let today = now.date();
    let day_start = today.and_hms_opt(0, 0, 0).unwrap_or(now);
    let week_start = (today
        - ChronoDuration::days(today.weekday().num_days_from_monday() as i64))
    .and_hms_opt(0, 0, 0)
    .unwrap_or(now);
    let month_start = today
        .with_day(1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(now);

    let mut stats = SoftDeleteStats {
        total: rows.len() as u32,
        ..Default::default()
    };
    for (is_deleted, deleted_at) in rows {
        if !is_deleted {
            stats.active += 1;
            continue;
        }
        stats.deleted += 1;
        if let Some(at) = deleted_at {
            if at >= day_start {
                stats.deleted_today += 1;
            }
            if at >= week_start {
                stats.deleted_this_week += 1;
            }
            if at >= month_start {
                stats.deleted_this_month += 1;
            }
        }
    }
    Ok(stats)
}

type DeletionRow = (bool, Option<NaiveDateTime>);

fn all_deletion_rows(conn: &Connection) -> Result<Vec<DeletionRow>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT is_deleted, deleted_at FROM entities")?;
    let rows = stmt
        .query_map([], deletion_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn scoped_deletion_rows(
    conn: &Connection,
    scope_id: &Uuid,
) -> Result<Vec<DeletionRow>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT is_deleted, deleted_at FROM entities WHERE id = ?1")?;
    let mut rows: Vec<DeletionRow> = stmt
        .query_map(params![scope_id.to_string()], deletion_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for node in collect_subtree(conn, scope_id)? {
        let row = conn.query_row(
            "SELECT is_deleted, deleted_at FROM entities WHERE id = ?1",
            params![node.id.to_string()],
            deletion_row,
        )?;
        rows.push(row);
    }
    Ok(rows)
}

fn deletion_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeletionRow> {
    let is_deleted: i32 = row.get(0)?;
    let deleted_at: Option<String> = row.get(1)?;
    Ok((
        is_deleted != 0,
        deleted_at.and_then(|s| {
            NaiveDateTime::from_str(&s)
                .or_else(|_| NaiveDateTime::parse_from_str(&s, crate::db::repository::TS_FORMAT))
                .ok()
        }),
    ))
}

// ═══════════════════════════════════════════════════════════
// StatsCache — short-lived per-scope cache for dashboards
// ═══════════════════════════════════════════════════════════

struct CachedStats {
    fetched_at: Instant,
    stats: SoftDeleteStats,
}

/// Per-scope stats cache with a TTL staleness bound.
///
/// Dashboards poll this; the cascade engine never reads it, so a stale
/// entry can mislead a chart for at most the TTL, never a decision.
pub struct StatsCache {
    ttl: Duration,
    entries: Mutex<HashMap<Option<Uuid>, CachedStats>>,
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached stats for the scope, refreshed from the store when the
    /// entry is missing or older than the TTL.
    pub fn get(
        &self,
        conn: &Connection,
        scope_id: Option<&Uuid>,
    ) -> Result<SoftDeleteStats, LifecycleError> {
        let key = scope_id.copied();
        if let Ok(entries) = self.entries.lock() {
            if let Some(cached) = entries.get(&key) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.stats);
                }
            }
        }

        let stats = fetch_soft_delete_stats(conn, scope_id)?;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                CachedStats {
                    fetched_at: Instant::now(),
                    stats,
                },
            );
        }
        Ok(stats)
    }

    /// Drop all cached entries (e.g. right after a cascade commit, when
    /// a dashboard wants fresh numbers before the TTL lapses).
    pub fn invalidate(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new(config::STATS_CACHE_TTL)
    }
}
