use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Geo types ---

/// Location guess attached to a report. Coordinates are approximate —
/// most come from a name-to-coordinate table, not device GPS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

// --- Enums ---

/// Outbreak intensity reported in a post. Ordered: Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric weight used by aggregations (averages over mixed severities).
    pub fn weight(&self) -> i32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Social platform a report originated from. Only Twitter has a shipped
/// fetcher; the rest exist so stored data from other ingests round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Instagram,
    NaverBlog,
    KakaoTalk,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::NaverBlog => "naver_blog",
            Platform::KakaoTalk => "kakao_talk",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "twitter" => Some(Platform::Twitter),
            "instagram" => Some(Platform::Instagram),
            "naver_blog" => Some(Platform::NaverBlog),
            "kakao_talk" => Some(Platform::KakaoTalk),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Report ---

/// One normalized lovebug observation derived from a single source post.
/// `post_id` is the idempotent upsert key: re-ingesting the same post
/// updates the stored row in place instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Store-assigned id; None until the report has been persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub post_id: String,
    pub platform: Platform,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub severity: Severity,
    /// Extraction confidence, 0.0-1.0.
    pub confidence: f64,
    /// Sentiment score, -1.0 (negative) to 1.0 (positive).
    pub sentiment: f64,
    pub keywords: Vec<String>,
    pub image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Live update envelope ---

/// Message envelope pushed to WebSocket clients.
///
/// Wire format is `{"type": ..., "data": ...}`. Serialized once per
/// broadcast and reused for every send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

impl UpdateMessage {
    /// Envelope carrying a batch of freshly ingested reports.
    pub fn lovebug_update(reports: &[Report]) -> Self {
        Self {
            kind: "lovebug_update".to_string(),
            data: serde_json::to_value(reports).unwrap_or_else(|_| serde_json::Value::Array(vec![])),
        }
    }

    /// Keepalive reply sent to a single client in response to any inbound frame.
    pub fn pong(status: &str) -> Self {
        Self {
            kind: "pong".to_string(),
            data: serde_json::Value::String(status.to_string()),
        }
    }

    /// Serialize to the text frame sent over the socket.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// --- Aggregation DTOs ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: i64,
}

/// Aggregated statistics over a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_reports: i64,
    /// Hour of day (0-23) to report count.
    pub reports_by_hour: BTreeMap<i64, i64>,
    pub reports_by_district: BTreeMap<String, i64>,
    pub severity_distribution: BTreeMap<String, i64>,
    pub top_keywords: Vec<KeywordCount>,
    pub average_sentiment: f64,
    pub last_updated: DateTime<Utc>,
}

/// Cluster of reports around a rounded coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotSpot {
    pub location: Location,
    pub report_count: i64,
    /// Mean severity weight (1.0 = all low, 4.0 = all critical).
    pub average_severity: f64,
    pub radius_km: f64,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictSummary {
    pub district: String,
    pub count: i64,
    pub average_severity: f64,
    pub last_activity: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse("meh"), None);
    }

    #[test]
    fn update_envelope_wire_format() {
        let msg = UpdateMessage::lovebug_update(&[]);
        assert_eq!(msg.to_frame(), r#"{"type":"lovebug_update","data":[]}"#);

        let pong = UpdateMessage::pong("연결 유지됨");
        let value: serde_json::Value = serde_json::from_str(&pong.to_frame()).unwrap();
        assert_eq!(value["type"], "pong");
        assert_eq!(value["data"], "연결 유지됨");
    }

    #[test]
    fn haversine_seoul_distances() {
        // Gangnam station to Hongdae is roughly 12km.
        let d = haversine_km(37.4979, 127.0276, 37.5516, 126.9226);
        assert!(d > 10.0 && d < 13.0, "unexpected distance: {d}");
        // Zero distance for identical points.
        assert!(haversine_km(37.5, 127.0, 37.5, 127.0) < 1e-9);
    }
}
