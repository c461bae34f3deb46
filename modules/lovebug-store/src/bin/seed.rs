//! Dev fixture loader: wipes the reports table and inserts 50 randomized
//! reports spread over the last 72 hours, then prints a district/severity
//! breakdown. Not part of the service runtime.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lovebug_common::{Location, Platform, Report, Severity};
use lovebug_store::{ReportReader, ReportWriter, StoreClient};

const SEOUL_DISTRICTS: &[(&str, f64, f64)] = &[
    ("강남구", 37.5172, 127.0473),
    ("서초구", 37.4837, 127.0324),
    ("송파구", 37.5145, 127.1065),
    ("마포구", 37.5663, 126.9019),
    ("용산구", 37.5384, 126.9654),
    ("중구", 37.5641, 126.9979),
    ("종로구", 37.5735, 126.9788),
    ("성동구", 37.5636, 127.0366),
    ("광진구", 37.5384, 127.0822),
    ("동대문구", 37.5744, 127.0396),
];

const SAMPLE_CONTENT: &[&str] = &[
    "러브버그가 너무 많아요 😱 공원에서 산책하기 힘들어요",
    "오늘 아침에 러브버그 떼를 만났어요. 정말 깜짝 놀랐네요!",
    "러브버그 때문에 창문을 열 수가 없어요 ㅠㅠ",
    "산책로에 러브버그가 엄청 많네요. 조심하세요!",
    "러브버그 시즌이 시작된 것 같아요. 외출 시 주의하세요",
    "공원 벤치에 앉을 수가 없을 정도로 러브버그가 많아요",
    "러브버그 때문에 빨래를 밖에 널기 힘들어요",
    "오늘 러브버그 상황이 심각해요. 마스크 착용 필수!",
    "러브버그가 차에 달라붙어서 운전이 힘들어요",
    "공원에서 러브버그 떼를 피해 다니고 있어요",
];

const SEVERITIES: &[Severity] = &[
    Severity::Low,
    Severity::Medium,
    Severity::High,
    Severity::Critical,
];

const PLATFORMS: &[Platform] = &[
    Platform::Twitter,
    Platform::Instagram,
    Platform::NaverBlog,
    Platform::KakaoTalk,
];

const EXTRA_KEYWORDS: &[&str] = &["공원", "산책", "외출", "주의", "많음"];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("seed=info".parse()?))
        .init();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL environment variable is required");
    let client = StoreClient::connect(&database_url).await?;

    let writer = ReportWriter::new(client.clone());
    writer.run_migrations().await?;

    let deleted = writer.delete_all().await?;
    info!(deleted, "Cleared existing reports");

    let mut rng = rand::rng();
    let now = Utc::now();

    for i in 1..=50u32 {
        let (district, base_lat, base_lng) = *SEOUL_DISTRICTS.choose(&mut rng).unwrap();
        let lat = base_lat + rng.random_range(-0.01..0.01);
        let lng = base_lng + rng.random_range(-0.01..0.01);
        let created_at = now - Duration::hours(rng.random_range(1..=72));

        let mut keywords: Vec<String> =
            vec!["러브버그".to_string(), "벌레".to_string(), "곤충".to_string()];
        keywords.push(EXTRA_KEYWORDS.choose(&mut rng).unwrap().to_string());

        let report = Report {
            id: None,
            post_id: format!("seed_{i}"),
            platform: *PLATFORMS.choose(&mut rng).unwrap(),
            content: SAMPLE_CONTENT.choose(&mut rng).unwrap().to_string(),
            location: Some(Location {
                latitude: lat,
                longitude: lng,
                address: Some(format!("{district} 일대")),
                district: Some(district.to_string()),
                city: Some("서울특별시".to_string()),
            }),
            severity: *SEVERITIES.choose(&mut rng).unwrap(),
            confidence: rng.random_range(0.5..1.0),
            sentiment: rng.random_range(-1.0..1.0),
            keywords,
            image_urls: Vec::new(),
            author: Some(format!("테스트사용자{i}")),
            created_at,
            updated_at: now,
        };

        writer.upsert_report(&report).await?;
    }
    info!("Inserted 50 seed reports");

    let reader = ReportReader::new(client);
    let since = now - Duration::hours(72);

    let districts = reader.districts(since).await?;
    info!("Reports by district:");
    for d in &districts {
        info!("  {}: {}", d.district, d.count);
    }

    let stats = reader.stats(since).await?;
    info!("Severity distribution:");
    for (severity, count) in &stats.severity_distribution {
        info!("  {severity}: {count}");
    }

    Ok(())
}
