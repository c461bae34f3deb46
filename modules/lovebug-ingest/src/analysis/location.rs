use std::sync::LazyLock;

use regex::Regex;

use lovebug_common::{haversine_km, Location};

/// Curated name → coordinate table, Seoul-centric. Checked before any
/// pattern matching so well-known places get exact coordinates.
struct Place {
    name: &'static str,
    lat: f64,
    lng: f64,
    address: &'static str,
}

#[rustfmt::skip]
static PLACES: &[Place] = &[
    // Major stations and neighborhoods
    Place { name: "강남역", lat: 37.4979, lng: 127.0276, address: "서울특별시 강남구 강남대로 지하396" },
    Place { name: "홍대", lat: 37.5516, lng: 126.9226, address: "서울특별시 마포구 홍익로" },
    Place { name: "홍대입구역", lat: 37.5516, lng: 126.9226, address: "서울특별시 마포구 홍익로" },
    Place { name: "신촌", lat: 37.5596, lng: 126.9361, address: "서울특별시 서대문구 신촌동" },
    Place { name: "신촌역", lat: 37.5596, lng: 126.9361, address: "서울특별시 서대문구 신촌동" },
    Place { name: "명동", lat: 37.5636, lng: 126.9826, address: "서울특별시 중구 명동" },
    Place { name: "명동역", lat: 37.5636, lng: 126.9826, address: "서울특별시 중구 명동" },
    Place { name: "종로", lat: 37.5704, lng: 126.9826, address: "서울특별시 종로구 종로" },
    Place { name: "종로3가역", lat: 37.5704, lng: 126.9826, address: "서울특별시 종로구 종로" },
    Place { name: "이태원", lat: 37.5346, lng: 126.9942, address: "서울특별시 용산구 이태원동" },
    Place { name: "이태원역", lat: 37.5346, lng: 126.9942, address: "서울특별시 용산구 이태원동" },
    Place { name: "잠실", lat: 37.5134, lng: 127.1000, address: "서울특별시 송파구 잠실동" },
    Place { name: "잠실역", lat: 37.5134, lng: 127.1000, address: "서울특별시 송파구 잠실동" },
    Place { name: "건대", lat: 37.5404, lng: 127.0696, address: "서울특별시 광진구 화양동" },
    Place { name: "건대입구역", lat: 37.5404, lng: 127.0696, address: "서울특별시 광진구 화양동" },
    Place { name: "노원", lat: 37.6547, lng: 127.0613, address: "서울특별시 노원구" },
    Place { name: "노원역", lat: 37.6547, lng: 127.0613, address: "서울특별시 노원구" },
    Place { name: "수원", lat: 37.2636, lng: 127.0286, address: "경기도 수원시" },
    Place { name: "수원역", lat: 37.2636, lng: 127.0286, address: "경기도 수원시" },
    Place { name: "인천", lat: 37.4563, lng: 126.7052, address: "인천광역시" },
    Place { name: "인천역", lat: 37.4563, lng: 126.7052, address: "인천광역시" },
    // District centroids
    Place { name: "강남구", lat: 37.5172, lng: 127.0473, address: "서울특별시 강남구" },
    Place { name: "서초구", lat: 37.4836, lng: 127.0327, address: "서울특별시 서초구" },
    Place { name: "송파구", lat: 37.5145, lng: 127.1065, address: "서울특별시 송파구" },
    Place { name: "강동구", lat: 37.5301, lng: 127.1238, address: "서울특별시 강동구" },
    Place { name: "마포구", lat: 37.5663, lng: 126.9019, address: "서울특별시 마포구" },
    Place { name: "영등포구", lat: 37.5264, lng: 126.8962, address: "서울특별시 영등포구" },
    Place { name: "용산구", lat: 37.5384, lng: 126.9646, address: "서울특별시 용산구" },
    Place { name: "성동구", lat: 37.5634, lng: 127.0367, address: "서울특별시 성동구" },
    Place { name: "광진구", lat: 37.5481, lng: 127.0857, address: "서울특별시 광진구" },
    Place { name: "동대문구", lat: 37.5838, lng: 127.0507, address: "서울특별시 동대문구" },
    Place { name: "중랑구", lat: 37.6066, lng: 127.0925, address: "서울특별시 중랑구" },
    Place { name: "성북구", lat: 37.6066, lng: 127.0181, address: "서울특별시 성북구" },
    Place { name: "강북구", lat: 37.6398, lng: 127.0256, address: "서울특별시 강북구" },
    Place { name: "도봉구", lat: 37.6687, lng: 127.0471, address: "서울특별시 도봉구" },
    Place { name: "노원구", lat: 37.6542, lng: 127.0568, address: "서울특별시 노원구" },
    Place { name: "은평구", lat: 37.6177, lng: 126.9227, address: "서울특별시 은평구" },
    Place { name: "서대문구", lat: 37.5791, lng: 126.9368, address: "서울특별시 서대문구" },
    Place { name: "종로구", lat: 37.5729, lng: 126.9792, address: "서울특별시 종로구" },
    Place { name: "중구", lat: 37.5637, lng: 126.9975, address: "서울특별시 중구" },
    Place { name: "관악구", lat: 37.4784, lng: 126.9516, address: "서울특별시 관악구" },
    Place { name: "동작구", lat: 37.5125, lng: 126.9399, address: "서울특별시 동작구" },
    Place { name: "금천구", lat: 37.4569, lng: 126.8955, address: "서울특별시 금천구" },
    Place { name: "구로구", lat: 37.4955, lng: 126.8875, address: "서울특별시 구로구" },
    Place { name: "양천구", lat: 37.5170, lng: 126.8664, address: "서울특별시 양천구" },
    Place { name: "강서구", lat: 37.5510, lng: 126.8495, address: "서울특별시 강서구" },
];

// Place-name patterns: a Hangul run ending in a known suffix, followed by a
// particle that marks it as a location reference (에서/근처/앞/일대).
static PLACE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"([가-힣]+역)\s*(?:에서?|근처|앞)",
        r"([가-힣]+구)\s*(?:에서?|근처|일대)",
        r"([가-힣]+동)\s*(?:에서?|근처)",
        r"([가-힣]+로)\s*(?:에서?|근처)",
        r"([가-힣]+거리)\s*(?:에서?|근처)",
        r"([가-힣]+공원)\s*(?:에서?|근처)",
        r"([가-힣]+대학교?)\s*(?:에서?|근처|앞)",
        r"([가-힣]+시장)\s*(?:에서?|근처)",
        r"([가-힣]+병원)\s*(?:에서?|근처|앞)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static DISTRICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([가-힣]+구|[가-힣]+군)").unwrap());
static CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([가-힣]+시|[가-힣]+도|[가-힣]+특별시|[가-힣]+광역시)").unwrap());

// Seoul city hall; anchor for pseudo-coordinates of unmapped names.
const SEOUL_CENTER: (f64, f64) = (37.5665, 126.9780);

/// Best-effort location guess for a post. Table hits win over pattern
/// matches; unmapped 역/구/동 names get a deterministic pseudo-coordinate
/// near the city center.
pub fn extract_location(text: &str) -> Option<Location> {
    // Direct table hit.
    for place in PLACES {
        if text.contains(place.name) {
            return Some(location_from(place.lat, place.lng, place.address.to_string()));
        }
    }

    // Pattern-extracted name, resolved through the table or the fallback.
    for name in place_names(text) {
        if let Some(place) = PLACES.iter().find(|p| p.name == name) {
            return Some(location_from(place.lat, place.lng, place.address.to_string()));
        }
        if let Some((lat, lng, address)) = fallback_coordinates(&name) {
            return Some(location_from(lat, lng, address));
        }
    }

    None
}

/// Whether the text references a place at all. Used as a confidence signal.
pub fn has_place_reference(text: &str) -> bool {
    PLACE_RES.iter().any(|re| re.is_match(text))
}

/// Names from the curated table within `radius_km` of a point.
pub fn nearby_location_names(lat: f64, lng: f64, radius_km: f64) -> Vec<String> {
    PLACES
        .iter()
        .filter(|p| haversine_km(p.lat, p.lng, lat, lng) <= radius_km)
        .map(|p| p.name.to_string())
        .collect()
}

fn location_from(lat: f64, lng: f64, address: String) -> Location {
    let district = DISTRICT_RE
        .captures(&address)
        .map(|c| c[1].to_string());
    let city = CITY_RE.captures(&address).map(|c| c[1].to_string());
    Location {
        latitude: lat,
        longitude: lng,
        address: Some(address),
        district,
        city,
    }
}

fn place_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    for re in PLACE_RES.iter() {
        for cap in re.captures_iter(text) {
            let name = cap[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Pseudo-coordinates for an unmapped name that still looks like a Seoul
/// place (역/구/동 suffix). The FNV-1a hash keeps the offset stable across
/// runs, so repeated mentions of the same name land on the same spot.
fn fallback_coordinates(name: &str) -> Option<(f64, f64, String)> {
    if !(name.ends_with('역') || name.ends_with('구') || name.ends_with('동')) {
        return None;
    }
    let offset = (fnv1a(name) % 1000) as f64 / 10_000.0;
    Some((
        SEOUL_CENTER.0 + offset,
        SEOUL_CENTER.1 + offset,
        format!("서울특별시 {name}"),
    ))
}

fn fnv1a(s: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for byte in s.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_hit_resolves_exact_coordinates() {
        let loc = extract_location("강남역에서 러브버그 진짜 많아요").unwrap();
        assert!((loc.latitude - 37.4979).abs() < 1e-6);
        assert!((loc.longitude - 127.0276).abs() < 1e-6);
        assert_eq!(loc.district.as_deref(), Some("강남구"));
        assert_eq!(loc.city.as_deref(), Some("서울특별시"));
    }

    #[test]
    fn district_mention_resolves_centroid() {
        let loc = extract_location("마포구 일대 벌레 장난 아니네요").unwrap();
        assert_eq!(loc.district.as_deref(), Some("마포구"));
        assert!((loc.latitude - 37.5663).abs() < 1e-6);
    }

    #[test]
    fn unknown_station_gets_deterministic_fallback() {
        let text = "가상의없는역 근처에 벌레가 많아요";
        let first = extract_location(text).unwrap();
        let second = extract_location(text).unwrap();
        assert_eq!(first, second);
        // Near the Seoul center, never more than 0.1 degrees away.
        assert!((first.latitude - SEOUL_CENTER.0).abs() < 0.1);
        assert!((first.longitude - SEOUL_CENTER.1).abs() < 0.1);
        assert_eq!(first.city.as_deref(), Some("서울특별시"));
    }

    #[test]
    fn no_place_reference_yields_none() {
        assert!(extract_location("오늘 벌레가 정말 많다").is_none());
        assert!(!has_place_reference("오늘 벌레가 정말 많다"));
    }

    #[test]
    fn nearby_names_use_great_circle_distance() {
        // Right on Gangnam station: the station itself plus nearby entries.
        let names = nearby_location_names(37.4979, 127.0276, 1.0);
        assert!(names.iter().any(|n| n == "강남역"));
        // Hongdae is ~12km away, outside a 1km radius.
        assert!(!names.iter().any(|n| n == "홍대"));
        // A 15km radius pulls it in.
        let wide = nearby_location_names(37.4979, 127.0276, 15.0);
        assert!(wide.iter().any(|n| n == "홍대"));
    }
}
