use lovebug_common::Report;
use uuid::Uuid;

use crate::StoreClient;

/// Write side of the report store. Used by the ingest pipeline only.
pub struct ReportWriter {
    client: StoreClient,
}

impl ReportWriter {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Run the embedded SQL migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.client.pool).await
    }

    /// Idempotent upsert keyed by the platform post id. Re-ingesting a post
    /// updates the existing row (last write wins); it never duplicates.
    pub async fn upsert_report(&self, report: &Report) -> Result<Uuid, sqlx::Error> {
        let (latitude, longitude, address, district, city) = match &report.location {
            Some(loc) => (
                Some(loc.latitude),
                Some(loc.longitude),
                loc.address.clone(),
                loc.district.clone(),
                loc.city.clone(),
            ),
            None => (None, None, None, None, None),
        };

        let keywords = serde_json::Value::from(report.keywords.clone());
        let image_urls = serde_json::Value::from(report.image_urls.clone());

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO lovebug_reports
                (post_id, platform, content, latitude, longitude, address, district, city,
                 severity, confidence, sentiment, keywords, image_urls, author,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (post_id) DO UPDATE SET
                platform = EXCLUDED.platform,
                content = EXCLUDED.content,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                address = EXCLUDED.address,
                district = EXCLUDED.district,
                city = EXCLUDED.city,
                severity = EXCLUDED.severity,
                confidence = EXCLUDED.confidence,
                sentiment = EXCLUDED.sentiment,
                keywords = EXCLUDED.keywords,
                image_urls = EXCLUDED.image_urls,
                author = EXCLUDED.author,
                updated_at = EXCLUDED.updated_at
            RETURNING id
            "#,
        )
        .bind(&report.post_id)
        .bind(report.platform.as_str())
        .bind(&report.content)
        .bind(latitude)
        .bind(longitude)
        .bind(address)
        .bind(district)
        .bind(city)
        .bind(report.severity.as_str())
        .bind(report.confidence)
        .bind(report.sentiment)
        .bind(keywords)
        .bind(image_urls)
        .bind(&report.author)
        .bind(report.created_at)
        .bind(report.updated_at)
        .fetch_one(&self.client.pool)
        .await?;

        Ok(id)
    }

    /// Delete everything. Used by the seed tool before inserting fixtures.
    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM lovebug_reports")
            .execute(&self.client.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
