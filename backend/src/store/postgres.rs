//! PostgreSQL implementation of [`RoastStore`]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    DecomposedImport, DerivedFields, ExtraDeviceRow, MilestoneFlags, MilestoneIndices,
    MilestoneSet, PhaseSet, ProfileSummary, RoastEventRow, RoastPhaseRow, TemperatureLogRow,
    TemperatureUnit, TotalTimeSource,
};
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{RoastProfile, RoastStore, StoredSample, StoredSeries};
use crate::error::{AppError, AppResult};

/// Postgres caps a statement at 65535 bind parameters
const BIND_LIMIT: usize = 65_535;

/// Columns written from an import summary, in bind order of `bind_summary`
const SUMMARY_COLUMNS: [&str; 30] = [
    "title",
    "roaster_type",
    "roaster_size",
    "temperature_unit",
    "weight_in",
    "weight_out",
    "weight_unit",
    "weight_loss_percent",
    "beans",
    "notes",
    "roast_date",
    "sample_count",
    "charge_bean_temp",
    "drop_bean_temp",
    "milestone_indices",
    "charge_seconds",
    "dry_end_seconds",
    "fc_start_seconds",
    "fc_end_seconds",
    "sc_start_seconds",
    "sc_end_seconds",
    "drop_seconds",
    "cool_seconds",
    "drying_percent",
    "maillard_percent",
    "development_percent",
    "total_time_seconds",
    "total_time_source",
    "data_cleared_at",
    "updated_at",
];

const PROFILE_COLUMNS: &str = r#"
    id, user_id, title, roaster_type, roaster_size, temperature_unit,
    weight_in, weight_out, weight_unit, weight_loss_percent, beans, notes, roast_date,
    sample_count, charge_bean_temp, drop_bean_temp, milestone_indices,
    charge_seconds, dry_end_seconds, fc_start_seconds, fc_end_seconds,
    sc_start_seconds, sc_end_seconds, drop_seconds, cool_seconds,
    drying_percent, maillard_percent, development_percent,
    total_time_seconds, total_time_source,
    data_cleared_at, created_at, updated_at
"#;

/// Roast store over a connection pool
#[derive(Clone)]
pub struct PgRoastStore {
    db: PgPool,
}

impl PgRoastStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromRow)]
struct ProfileRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    roaster_type: Option<String>,
    roaster_size: Option<f64>,
    temperature_unit: String,
    weight_in: Option<Decimal>,
    weight_out: Option<Decimal>,
    weight_unit: Option<String>,
    weight_loss_percent: Option<Decimal>,
    beans: Option<String>,
    notes: Option<String>,
    roast_date: Option<NaiveDate>,
    sample_count: i64,
    charge_bean_temp: Option<f64>,
    drop_bean_temp: Option<f64>,
    milestone_indices: Json<MilestoneIndices>,
    charge_seconds: Option<f64>,
    dry_end_seconds: Option<f64>,
    fc_start_seconds: Option<f64>,
    fc_end_seconds: Option<f64>,
    sc_start_seconds: Option<f64>,
    sc_end_seconds: Option<f64>,
    drop_seconds: Option<f64>,
    cool_seconds: Option<f64>,
    drying_percent: Option<f64>,
    maillard_percent: Option<f64>,
    development_percent: Option<f64>,
    total_time_seconds: Option<f64>,
    total_time_source: Option<String>,
    data_cleared_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    fn derived(&self) -> Option<DerivedFields> {
        let total_time_seconds = self.total_time_seconds?;
        let total_time_source = self
            .total_time_source
            .as_deref()
            .and_then(TotalTimeSource::from_str)
            .unwrap_or(TotalTimeSource::SeriesFallback);

        Some(DerivedFields {
            milestones: MilestoneSet {
                charge: self.charge_seconds,
                dry_end: self.dry_end_seconds,
                fc_start: self.fc_start_seconds,
                fc_end: self.fc_end_seconds,
                sc_start: self.sc_start_seconds,
                sc_end: self.sc_end_seconds,
                drop: self.drop_seconds,
                cool: self.cool_seconds,
            },
            phases: PhaseSet {
                drying_percent: self.drying_percent.unwrap_or(0.0),
                maillard_percent: self.maillard_percent.unwrap_or(0.0),
                development_percent: self.development_percent.unwrap_or(0.0),
                total_time_seconds,
                total_time_source,
            },
        })
    }
}

impl TryFrom<ProfileRecord> for RoastProfile {
    type Error = AppError;

    fn try_from(record: ProfileRecord) -> Result<Self, Self::Error> {
        let temperature_unit = TemperatureUnit::from_mode(&record.temperature_unit).ok_or_else(|| {
            AppError::Internal(format!(
                "roast {} has unknown temperature unit {}",
                record.id, record.temperature_unit
            ))
        })?;
        let derived = record.derived();

        Ok(RoastProfile {
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            roaster_type: record.roaster_type,
            roaster_size: record.roaster_size,
            temperature_unit,
            weight_in: record.weight_in,
            weight_out: record.weight_out,
            weight_unit: record.weight_unit,
            weight_loss_percent: record.weight_loss_percent,
            beans: record.beans,
            notes: record.notes,
            roast_date: record.roast_date,
            sample_count: record.sample_count,
            charge_bean_temp: record.charge_bean_temp,
            drop_bean_temp: record.drop_bean_temp,
            milestone_indices: record.milestone_indices.0,
            derived,
            data_cleared_at: record.data_cleared_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LogPointRecord {
    time_seconds: f64,
    is_charge: bool,
    is_dry_end: bool,
    is_fc_start: bool,
    is_fc_end: bool,
    is_sc_start: bool,
    is_sc_end: bool,
    is_drop: bool,
    is_cool: bool,
}

impl From<LogPointRecord> for StoredSample {
    fn from(record: LogPointRecord) -> Self {
        StoredSample {
            time_seconds: record.time_seconds,
            flags: MilestoneFlags {
                charge: record.is_charge,
                dry_end: record.is_dry_end,
                fc_start: record.is_fc_start,
                fc_end: record.is_fc_end,
                sc_start: record.is_sc_start,
                sc_end: record.is_sc_end,
                drop: record.is_drop,
                cool: record.is_cool,
                ..Default::default()
            },
        }
    }
}

/// Push summary values in `SUMMARY_COLUMNS` order
fn bind_summary(b: &mut Separated<'_, '_, Postgres, &'static str>, summary: &ProfileSummary) {
    let milestones = summary.derived.milestones;
    let phases = summary.derived.phases;

    b.push_bind(summary.title.clone())
        .push_bind(summary.roaster_type.clone())
        .push_bind(summary.roaster_size)
        .push_bind(summary.temperature_unit.as_str())
        .push_bind(summary.weight_in)
        .push_bind(summary.weight_out)
        .push_bind(summary.weight_unit.clone())
        .push_bind(summary.weight_loss_percent)
        .push_bind(summary.beans.clone())
        .push_bind(summary.notes.clone())
        .push_bind(summary.roast_date)
        .push_bind(summary.sample_count as i64)
        .push_bind(summary.charge_bean_temp)
        .push_bind(summary.drop_bean_temp)
        .push_bind(Json(summary.milestone_indices))
        .push_bind(milestones.charge)
        .push_bind(milestones.dry_end)
        .push_bind(milestones.fc_start)
        .push_bind(milestones.fc_end)
        .push_bind(milestones.sc_start)
        .push_bind(milestones.sc_end)
        .push_bind(milestones.drop)
        .push_bind(milestones.cool)
        .push_bind(phases.drying_percent)
        .push_bind(phases.maillard_percent)
        .push_bind(phases.development_percent)
        .push_bind(phases.total_time_seconds)
        .push_bind(phases.total_time_source.as_str())
        .push_bind(None::<DateTime<Utc>>)
        .push_bind(Utc::now());
}

/// Insert or overwrite the profile row of an import
async fn upsert_profile(
    tx: &mut Transaction<'_, Postgres>,
    roast_id: Uuid,
    user_id: Uuid,
    summary: &ProfileSummary,
) -> AppResult<RoastProfile> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO roast_profiles (id, user_id, {}) ",
        SUMMARY_COLUMNS.join(", ")
    ));
    builder.push_values(std::iter::once(summary), |mut b, summary| {
        b.push_bind(roast_id).push_bind(user_id);
        bind_summary(&mut b, summary);
    });
    let assignments = SUMMARY_COLUMNS
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    builder.push(format!(
        " ON CONFLICT (id) DO UPDATE SET {} RETURNING {}",
        assignments, PROFILE_COLUMNS
    ));

    let record = builder
        .build_query_as::<ProfileRecord>()
        .fetch_one(&mut **tx)
        .await?;
    record.try_into()
}

async fn insert_log_rows(
    tx: &mut Transaction<'_, Postgres>,
    roast_id: Uuid,
    rows: &[TemperatureLogRow],
) -> AppResult<()> {
    const COLUMNS: usize = 21;
    let chunk_size = BIND_LIMIT / COLUMNS;

    for (chunk_no, chunk) in rows.chunks(chunk_size).enumerate() {
        let offset = chunk_no * chunk_size;
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO roast_temperature_logs (roast_id, sample_index, time_seconds, \
             bean_temp, env_temp, fan_setting, heat_setting, \
             is_charge, is_dry_end, is_fc_start, is_fc_end, is_sc_start, is_sc_end, is_drop, is_cool, \
             in_drying, in_maillard, in_development, in_fc_rolling, in_sc_rolling, in_cooling) ",
        );
        builder.push_values(chunk.iter().enumerate(), |mut b, (i, row)| {
            let f = row.flags;
            b.push_bind(roast_id)
                .push_bind((offset + i) as i32)
                .push_bind(row.time_seconds)
                .push_bind(row.bean_temp)
                .push_bind(row.env_temp)
                .push_bind(row.fan_setting)
                .push_bind(row.heat_setting)
                .push_bind(f.charge)
                .push_bind(f.dry_end)
                .push_bind(f.fc_start)
                .push_bind(f.fc_end)
                .push_bind(f.sc_start)
                .push_bind(f.sc_end)
                .push_bind(f.drop)
                .push_bind(f.cool)
                .push_bind(f.drying)
                .push_bind(f.maillard)
                .push_bind(f.development)
                .push_bind(f.fc_rolling)
                .push_bind(f.sc_rolling)
                .push_bind(f.cooling);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_event_rows(
    tx: &mut Transaction<'_, Postgres>,
    roast_id: Uuid,
    rows: &[RoastEventRow],
) -> AppResult<()> {
    const COLUMNS: usize = 8;

    for chunk in rows.chunks(BIND_LIMIT / COLUMNS) {
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO roast_events (roast_id, time_seconds, event_type, label, \
             category, subcategory, value, user_generated) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(roast_id)
                .push_bind(row.time_seconds)
                .push_bind(row.event_type.clone())
                .push_bind(row.label.clone())
                .push_bind(row.category.clone())
                .push_bind(row.subcategory.clone())
                .push_bind(row.value)
                .push_bind(row.user_generated);
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn insert_phase_rows(
    tx: &mut Transaction<'_, Postgres>,
    roast_id: Uuid,
    rows: &[RoastPhaseRow],
) -> AppResult<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO roast_phases (roast_id, phase, start_seconds, end_seconds, \
         duration_seconds, percent, confidence) ",
    );
    builder.push_values(rows, |mut b, row| {
        b.push_bind(roast_id)
            .push_bind(row.phase.as_str())
            .push_bind(row.start_seconds)
            .push_bind(row.end_seconds)
            .push_bind(row.duration_seconds)
            .push_bind(row.percent)
            .push_bind(row.confidence);
    });
    builder.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_device_rows(
    tx: &mut Transaction<'_, Postgres>,
    roast_id: Uuid,
    rows: &[ExtraDeviceRow],
) -> AppResult<()> {
    const COLUMNS: usize = 8;

    for chunk in rows.chunks(BIND_LIMIT / COLUMNS) {
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO roast_extra_device_readings (roast_id, device_id, device_name, \
             sensor_type, time_seconds, value, unit, quality) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(roast_id)
                .push_bind(row.device_id)
                .push_bind(row.device_name.clone())
                .push_bind(row.sensor_type.as_str())
                .push_bind(row.time_seconds)
                .push_bind(row.value)
                .push_bind(row.unit.clone())
                .push_bind(row.quality.as_str());
        });
        builder.build().execute(&mut **tx).await?;
    }
    Ok(())
}

async fn delete_children(tx: &mut Transaction<'_, Postgres>, roast_id: Uuid) -> AppResult<()> {
    for table in [
        "roast_temperature_logs",
        "roast_events",
        "roast_phases",
        "roast_extra_device_readings",
    ] {
        sqlx::query(&format!("DELETE FROM {} WHERE roast_id = $1", table))
            .bind(roast_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn insert_children(
    tx: &mut Transaction<'_, Postgres>,
    roast_id: Uuid,
    rows: &DecomposedImport,
) -> AppResult<()> {
    insert_log_rows(tx, roast_id, &rows.log_rows).await?;
    insert_event_rows(tx, roast_id, &rows.event_rows).await?;
    insert_phase_rows(tx, roast_id, &rows.phase_rows).await?;
    insert_device_rows(tx, roast_id, &rows.device_rows).await?;
    Ok(())
}

#[async_trait]
impl RoastStore for PgRoastStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid, roast_id: Uuid) -> AppResult<Option<RoastProfile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {} FROM roast_profiles WHERE id = $1 AND user_id = $2",
            PROFILE_COLUMNS
        ))
        .bind(roast_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        record.map(RoastProfile::try_from).transpose()
    }

    async fn create_import(&self, user_id: Uuid, rows: &DecomposedImport) -> AppResult<RoastProfile> {
        let roast_id = Uuid::new_v4();
        let mut tx = self.db.begin().await?;
        let profile = upsert_profile(&mut tx, roast_id, user_id, &rows.profile).await?;
        insert_children(&mut tx, roast_id, rows).await?;
        tx.commit().await?;
        Ok(profile)
    }

    async fn replace_import(&self, roast_id: Uuid, rows: &DecomposedImport) -> AppResult<RoastProfile> {
        let mut tx = self.db.begin().await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM roast_profiles WHERE id = $1 FOR UPDATE",
        )
        .bind(roast_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Roast profile".to_string()))?;

        delete_children(&mut tx, roast_id).await?;
        let profile = upsert_profile(&mut tx, roast_id, user_id, &rows.profile).await?;
        insert_children(&mut tx, roast_id, rows).await?;
        tx.commit().await?;
        Ok(profile)
    }

    async fn clear_roast_data(&self, roast_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        delete_children(&mut tx, roast_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE roast_profiles SET
                charge_seconds = NULL, dry_end_seconds = NULL,
                fc_start_seconds = NULL, fc_end_seconds = NULL,
                sc_start_seconds = NULL, sc_end_seconds = NULL,
                drop_seconds = NULL, cool_seconds = NULL,
                drying_percent = NULL, maillard_percent = NULL, development_percent = NULL,
                total_time_seconds = NULL, total_time_source = NULL,
                data_cleared_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(roast_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Roast profile".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_backfill_candidates(&self, after: Option<Uuid>, limit: i64) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT p.id FROM roast_profiles p
            WHERE p.total_time_seconds IS NULL
              AND p.data_cleared_at IS NULL
              AND ($1::uuid IS NULL OR p.id > $1)
              AND EXISTS (SELECT 1 FROM roast_temperature_logs l WHERE l.roast_id = p.id)
            ORDER BY p.id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(ids)
    }

    async fn load_series(&self, roast_id: Uuid) -> AppResult<StoredSeries> {
        let Json(milestone_indices) = sqlx::query_scalar::<_, Json<MilestoneIndices>>(
            "SELECT milestone_indices FROM roast_profiles WHERE id = $1",
        )
        .bind(roast_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Roast profile".to_string()))?;

        let samples = sqlx::query_as::<_, LogPointRecord>(
            r#"
            SELECT time_seconds, is_charge, is_dry_end, is_fc_start, is_fc_end,
                   is_sc_start, is_sc_end, is_drop, is_cool
            FROM roast_temperature_logs
            WHERE roast_id = $1
            ORDER BY sample_index
            "#,
        )
        .bind(roast_id)
        .fetch_all(&self.db)
        .await?;

        Ok(StoredSeries {
            samples: samples.into_iter().map(StoredSample::from).collect(),
            milestone_indices,
        })
    }

    async fn update_derived_fields(&self, roast_id: Uuid, derived: &DerivedFields) -> AppResult<()> {
        let m = derived.milestones;
        let p = derived.phases;

        let result = sqlx::query(
            r#"
            UPDATE roast_profiles SET
                charge_seconds = $2, dry_end_seconds = $3,
                fc_start_seconds = $4, fc_end_seconds = $5,
                sc_start_seconds = $6, sc_end_seconds = $7,
                drop_seconds = $8, cool_seconds = $9,
                drying_percent = $10, maillard_percent = $11, development_percent = $12,
                total_time_seconds = $13, total_time_source = $14,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(roast_id)
        .bind(m.charge)
        .bind(m.dry_end)
        .bind(m.fc_start)
        .bind(m.fc_end)
        .bind(m.sc_start)
        .bind(m.sc_end)
        .bind(m.drop)
        .bind(m.cool)
        .bind(p.drying_percent)
        .bind(p.maillard_percent)
        .bind(p.development_percent)
        .bind(p.total_time_seconds)
        .bind(p.total_time_source.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Roast profile".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_columns_fit_one_statement() {
        assert_eq!(SUMMARY_COLUMNS.len(), 30);
        assert!(PROFILE_COLUMNS.contains("milestone_indices"));
        for column in SUMMARY_COLUMNS {
            assert!(PROFILE_COLUMNS.contains(column), "{column} not selected");
        }
    }

    #[test]
    fn test_weight_columns_have_no_precision_limit() {
        let schema = include_str!("../../migrations/0001_roast_import.sql");
        for column in ["weight_in", "weight_out", "weight_loss_percent"] {
            let line = schema
                .lines()
                .find(|l| l.trim_start().starts_with(column))
                .unwrap();
            assert_eq!(line.trim(), format!("{column} NUMERIC,"));
        }

        // Green 0.001 g roasted to 1 g
        let loss = shared::calculate_weight_loss(
            "0.001".parse().unwrap(),
            rust_decimal::Decimal::ONE,
        );
        assert_eq!(loss, rust_decimal::Decimal::from(-99900));
    }

    #[test]
    fn test_record_without_total_has_no_derived_fields() {
        let record = ProfileRecord {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: "Untitled roast".into(),
            roaster_type: None,
            roaster_size: None,
            temperature_unit: "C".into(),
            weight_in: None,
            weight_out: None,
            weight_unit: None,
            weight_loss_percent: None,
            beans: None,
            notes: None,
            roast_date: None,
            sample_count: 0,
            charge_bean_temp: None,
            drop_bean_temp: None,
            milestone_indices: Json(MilestoneIndices::default()),
            charge_seconds: Some(0.0),
            dry_end_seconds: None,
            fc_start_seconds: None,
            fc_end_seconds: None,
            sc_start_seconds: None,
            sc_end_seconds: None,
            drop_seconds: None,
            cool_seconds: None,
            drying_percent: None,
            maillard_percent: None,
            development_percent: None,
            total_time_seconds: None,
            total_time_source: None,
            data_cleared_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let profile = RoastProfile::try_from(record).unwrap();
        assert_eq!(profile.temperature_unit, TemperatureUnit::Celsius);
        assert!(profile.derived.is_none());
    }
}
