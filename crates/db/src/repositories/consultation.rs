use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::Row;

use grantline_core::domain::consultation::{
    BonusItem, ConsultationId, ConsultationRecord, MarketingChannel, PlanId,
};
use grantline_core::domain::session::SessionId;

use super::{ConsultationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConsultationRepository {
    pool: DbPool,
}

impl SqlConsultationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, session_id, project_type, budget, people, capital, \
     revenue, growth_revenue, has_certification, has_gov_award, is_mit, has_industry_academia, \
     has_factory_registration, bonus_count, bonus_details, marketing_channels, data_confirmed, \
     grant_min, grant_max, recommended_plans, status, created_at, updated_at FROM consultations";

fn get_string(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{value}`: {e}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    raw: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid json in `{column}`: {e}")))
}

fn encode_json<T: serde::Serialize>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|e| RepositoryError::Decode(format!("could not encode `{column}`: {e}")))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ConsultationRecord, RepositoryError> {
    let project_type: Option<String> =
        row.try_get("project_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let project_type = project_type
        .map(|raw| raw.parse().map_err(|e| RepositoryError::Decode(format!("{e}"))))
        .transpose()?;

    let bonus_count: i64 =
        row.try_get("bonus_count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let bonus_details: Vec<BonusItem> =
        decode_json("bonus_details", &get_string(row, "bonus_details")?)?;
    let marketing_channels: BTreeSet<MarketingChannel> =
        decode_json("marketing_channels", &get_string(row, "marketing_channels")?)?;
    let recommended_plans: Vec<PlanId> =
        decode_json("recommended_plans", &get_string(row, "recommended_plans")?)?;

    let status = get_string(row, "status")?
        .parse()
        .map_err(|e| RepositoryError::Decode(format!("{e}")))?;

    let opt_i64 = |column: &str| -> Result<Option<i64>, RepositoryError> {
        row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    };
    let opt_bool = |column: &str| -> Result<Option<bool>, RepositoryError> {
        row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
    };

    Ok(ConsultationRecord {
        id: ConsultationId(get_string(row, "id")?),
        session_id: SessionId(get_string(row, "session_id")?),
        project_type,
        budget: opt_i64("budget")?,
        people: opt_i64("people")?,
        capital: opt_i64("capital")?,
        revenue: opt_i64("revenue")?,
        growth_revenue: opt_i64("growth_revenue")?,
        has_certification: opt_bool("has_certification")?,
        has_gov_award: opt_bool("has_gov_award")?,
        is_mit: opt_bool("is_mit")?,
        has_industry_academia: opt_bool("has_industry_academia")?,
        has_factory_registration: opt_bool("has_factory_registration")?,
        bonus_count: bonus_count as u8,
        bonus_details,
        marketing_channels,
        data_confirmed: row
            .try_get("data_confirmed")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?,
        grant_min: opt_i64("grant_min")?,
        grant_max: opt_i64("grant_max")?,
        recommended_plans,
        status,
        created_at: parse_timestamp(&get_string(row, "created_at")?)?,
        updated_at: parse_timestamp(&get_string(row, "updated_at")?)?,
    })
}

#[async_trait::async_trait]
impl ConsultationRepository for SqlConsultationRepository {
    async fn find_by_id(
        &self,
        id: &ConsultationId,
    ) -> Result<Option<ConsultationRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_record(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<ConsultationRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE session_id = ?"))
            .bind(&session_id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_record(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: ConsultationRecord) -> Result<(), RepositoryError> {
        let bonus_details = encode_json("bonus_details", &record.bonus_details)?;
        let marketing_channels = encode_json("marketing_channels", &record.marketing_channels)?;
        let recommended_plans = encode_json("recommended_plans", &record.recommended_plans)?;

        sqlx::query(
            "INSERT INTO consultations (id, session_id, project_type, budget, people, capital,
                                        revenue, growth_revenue, has_certification, has_gov_award,
                                        is_mit, has_industry_academia, has_factory_registration,
                                        bonus_count, bonus_details, marketing_channels,
                                        data_confirmed, grant_min, grant_max, recommended_plans,
                                        status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 project_type = excluded.project_type,
                 budget = excluded.budget,
                 people = excluded.people,
                 capital = excluded.capital,
                 revenue = excluded.revenue,
                 growth_revenue = excluded.growth_revenue,
                 has_certification = excluded.has_certification,
                 has_gov_award = excluded.has_gov_award,
                 is_mit = excluded.is_mit,
                 has_industry_academia = excluded.has_industry_academia,
                 has_factory_registration = excluded.has_factory_registration,
                 bonus_count = excluded.bonus_count,
                 bonus_details = excluded.bonus_details,
                 marketing_channels = excluded.marketing_channels,
                 data_confirmed = excluded.data_confirmed,
                 grant_min = excluded.grant_min,
                 grant_max = excluded.grant_max,
                 recommended_plans = excluded.recommended_plans,
                 status = excluded.status,
                 updated_at = excluded.updated_at",
        )
        .bind(&record.id.0)
        .bind(&record.session_id.0)
        .bind(record.project_type.map(|p| p.as_str()))
        .bind(record.budget)
        .bind(record.people)
        .bind(record.capital)
        .bind(record.revenue)
        .bind(record.growth_revenue)
        .bind(record.has_certification)
        .bind(record.has_gov_award)
        .bind(record.is_mit)
        .bind(record.has_industry_academia)
        .bind(record.has_factory_registration)
        .bind(record.bonus_count as i64)
        .bind(bonus_details)
        .bind(marketing_channels)
        .bind(record.data_confirmed)
        .bind(record.grant_min)
        .bind(record.grant_max)
        .bind(recommended_plans)
        .bind(record.status.as_str())
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
