use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use lovebug_common::{
    DistrictSummary, HotSpot, KeywordCount, Location, Platform, Report, Severity, StatsSummary,
};

use crate::StoreClient;

/// Numeric severity weight used inside SQL aggregations.
const SEVERITY_WEIGHT_SQL: &str = "CASE severity \
     WHEN 'low' THEN 1 WHEN 'medium' THEN 2 WHEN 'high' THEN 3 WHEN 'critical' THEN 4 \
     ELSE 1 END";

/// Filters for the report listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub severity: Option<Severity>,
    pub platform: Option<Platform>,
    pub since: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

/// Parameters for the search endpoint.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub severity: Option<Severity>,
    pub platform: Option<Platform>,
    pub since: Option<DateTime<Utc>>,
    /// (center_lat, center_lng, radius_km) bounding box filter.
    pub center: Option<(f64, f64, f64)>,
    pub limit: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    post_id: String,
    platform: String,
    content: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    address: Option<String>,
    district: Option<String>,
    city: Option<String>,
    severity: String,
    confidence: f64,
    sentiment: f64,
    keywords: serde_json::Value,
    image_urls: serde_json::Value,
    author: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
                address: row.address,
                district: row.district,
                city: row.city,
            }),
            _ => None,
        };

        Report {
            id: Some(row.id),
            post_id: row.post_id,
            platform: Platform::parse(&row.platform).unwrap_or(Platform::Twitter),
            content: row.content,
            location,
            severity: Severity::parse(&row.severity).unwrap_or(Severity::Low),
            confidence: row.confidence,
            sentiment: row.sentiment,
            keywords: string_array(row.keywords),
            image_urls: string_array(row.image_urls),
            author: row.author,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn string_array(value: serde_json::Value) -> Vec<String> {
    serde_json::from_value(value).unwrap_or_default()
}

/// Read side of the report store. Used by the web server.
pub struct ReportReader {
    client: StoreClient,
}

impl ReportReader {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Liveness probe, surfaced by the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        self.client.ping().await
    }

    /// Most recent reports, filtered and paginated, newest first.
    pub async fn recent(&self, filter: &ReportFilter) -> Result<Vec<Report>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM lovebug_reports WHERE TRUE");

        if let Some(severity) = filter.severity {
            qb.push(" AND severity = ").push_bind(severity.as_str());
        }
        if let Some(platform) = filter.platform {
            qb.push(" AND platform = ").push_bind(platform.as_str());
        }
        if let Some(since) = filter.since {
            qb.push(" AND created_at >= ").push_bind(since);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<ReportRow> = qb.build_query_as().fetch_all(&self.client.pool).await?;
        Ok(rows.into_iter().map(Report::from).collect())
    }

    /// Single report by store id.
    pub async fn by_id(&self, id: Uuid) -> Result<Option<Report>, sqlx::Error> {
        let row: Option<ReportRow> =
            sqlx::query_as("SELECT * FROM lovebug_reports WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.client.pool)
                .await?;
        Ok(row.map(Report::from))
    }

    /// Keyword / severity / platform / time / bounding-box search.
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<Report>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM lovebug_reports WHERE TRUE");

        if let Some(keyword) = &params.keyword {
            let pattern = format!("%{keyword}%");
            qb.push(" AND (content ILIKE ")
                .push_bind(pattern)
                .push(" OR keywords @> ")
                .push_bind(serde_json::Value::from(vec![keyword.clone()]))
                .push(")");
        }
        if let Some(severity) = params.severity {
            qb.push(" AND severity = ").push_bind(severity.as_str());
        }
        if let Some(platform) = params.platform {
            qb.push(" AND platform = ").push_bind(platform.as_str());
        }
        if let Some(since) = params.since {
            qb.push(" AND created_at >= ").push_bind(since);
        }
        if let Some((lat, lng, radius_km)) = params.center {
            // ~1 degree lat ≈ 111km, 1 degree lng ≈ 111km * cos(lat)
            let lat_delta = radius_km / 111.0;
            let lng_delta = radius_km / (111.0 * lat.to_radians().cos());
            qb.push(" AND latitude >= ").push_bind(lat - lat_delta);
            qb.push(" AND latitude <= ").push_bind(lat + lat_delta);
            qb.push(" AND longitude >= ").push_bind(lng - lng_delta);
            qb.push(" AND longitude <= ").push_bind(lng + lng_delta);
        }

        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(params.limit);

        let rows: Vec<ReportRow> = qb.build_query_as().fetch_all(&self.client.pool).await?;
        Ok(rows.into_iter().map(Report::from).collect())
    }

    /// Aggregated statistics for reports created since the given instant.
    pub async fn stats(&self, since: DateTime<Utc>) -> Result<StatsSummary, sqlx::Error> {
        let total_reports: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lovebug_reports WHERE created_at >= $1")
                .bind(since)
                .fetch_one(&self.client.pool)
                .await?;

        let hour_rows: Vec<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT EXTRACT(HOUR FROM created_at)::bigint AS hour, COUNT(*)
            FROM lovebug_reports
            WHERE created_at >= $1
            GROUP BY hour
            "#,
        )
        .bind(since)
        .fetch_all(&self.client.pool)
        .await?;
        let reports_by_hour: BTreeMap<i64, i64> = hour_rows.into_iter().collect();

        let district_rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT district, COUNT(*)
            FROM lovebug_reports
            WHERE created_at >= $1 AND district IS NOT NULL
            GROUP BY district
            "#,
        )
        .bind(since)
        .fetch_all(&self.client.pool)
        .await?;
        let reports_by_district: BTreeMap<String, i64> = district_rows.into_iter().collect();

        let severity_rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT severity, COUNT(*)
            FROM lovebug_reports
            WHERE created_at >= $1
            GROUP BY severity
            "#,
        )
        .bind(since)
        .fetch_all(&self.client.pool)
        .await?;
        let severity_distribution: BTreeMap<String, i64> = severity_rows.into_iter().collect();

        let keyword_rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT k AS keyword, COUNT(*) AS count
            FROM lovebug_reports, jsonb_array_elements_text(keywords) AS k
            WHERE created_at >= $1
            GROUP BY k
            ORDER BY count DESC
            LIMIT 10
            "#,
        )
        .bind(since)
        .fetch_all(&self.client.pool)
        .await?;
        let top_keywords = keyword_rows
            .into_iter()
            .map(|(keyword, count)| KeywordCount { keyword, count })
            .collect();

        let average_sentiment: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(sentiment)::double precision FROM lovebug_reports WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.client.pool)
        .await?;

        Ok(StatsSummary {
            total_reports,
            reports_by_hour,
            reports_by_district,
            severity_distribution,
            top_keywords,
            average_sentiment: average_sentiment.unwrap_or(0.0),
            last_updated: Utc::now(),
        })
    }

    /// Report clusters around coordinates rounded to two decimals (~1km cells).
    /// Only cells with at least two reports qualify.
    pub async fn hotspots(
        &self,
        since: DateTime<Utc>,
        limit: i64,
        radius_km: f64,
    ) -> Result<Vec<HotSpot>, sqlx::Error> {
        let rows: Vec<(Option<String>, f64, f64, i64, f64, DateTime<Utc>)> = sqlx::query_as(&format!(
            r#"
            SELECT district,
                   ROUND(latitude::numeric, 2)::double precision AS lat,
                   ROUND(longitude::numeric, 2)::double precision AS lng,
                   COUNT(*) AS report_count,
                   AVG({SEVERITY_WEIGHT_SQL})::double precision AS avg_severity,
                   MAX(created_at) AS last_activity
            FROM lovebug_reports
            WHERE created_at >= $1 AND latitude IS NOT NULL AND longitude IS NOT NULL
            GROUP BY 1, 2, 3
            HAVING COUNT(*) >= 2
            ORDER BY report_count DESC
            LIMIT $2
            "#,
        ))
        .bind(since)
        .bind(limit)
        .fetch_all(&self.client.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(district, lat, lng, report_count, average_severity, last_activity)| HotSpot {
                location: Location {
                    latitude: lat,
                    longitude: lng,
                    address: None,
                    district,
                    city: None,
                },
                report_count,
                average_severity,
                radius_km,
                last_activity,
            })
            .collect())
    }

    /// Per-district counts, average severity and latest activity.
    pub async fn districts(&self, since: DateTime<Utc>) -> Result<Vec<DistrictSummary>, sqlx::Error> {
        let rows: Vec<(String, i64, f64, DateTime<Utc>)> = sqlx::query_as(&format!(
            r#"
            SELECT district,
                   COUNT(*) AS count,
                   AVG({SEVERITY_WEIGHT_SQL})::double precision AS avg_severity,
                   MAX(created_at) AS last_activity
            FROM lovebug_reports
            WHERE created_at >= $1 AND district IS NOT NULL
            GROUP BY district
            ORDER BY count DESC
            "#,
        ))
        .bind(since)
        .fetch_all(&self.client.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(district, count, average_severity, last_activity)| DistrictSummary {
                district,
                count,
                average_severity,
                last_activity,
            })
            .collect())
    }
}
