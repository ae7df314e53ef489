use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::utils::geo::GeoPoint;

#[derive(Debug, Error, PartialEq)]
pub enum MapsLinkError {
    #[error("empty coordinates text")]
    Empty,
    #[error("could not extract coordinates from text or link")]
    NotFound,
}

/// Query keys that carry a `lat,lng` pair in Google Maps links
const QUERY_KEYS: [&str; 5] = ["q", "query", "ll", "center", "destination"];

const NUM: &str = r"-?\d+(?:\.\d+)?";

fn pattern(template: &str) -> Regex {
    Regex::new(&template.replace("{num}", NUM)).expect("coordinate patterns are valid regexes")
}

static PAIR: Lazy<Regex> = Lazy::new(|| pattern(r"({num})\s*,\s*({num})"));
static PLACE: Lazy<Regex> = Lazy::new(|| pattern(r"/place/({num})\s*,\s*({num})"));
static VIEWPORT: Lazy<Regex> = Lazy::new(|| pattern(r"@\s*({num})\s*,\s*({num})\s*,"));
static LAT_LNG_DATA: Lazy<Regex> = Lazy::new(|| pattern(r"!3d({num})!4d({num})"));
static LNG_LAT_DATA: Lazy<Regex> = Lazy::new(|| pattern(r"!2d({num})!3d({num})"));

/// Extracts a coordinate from a Google Maps link or free text.
///
/// The input is percent-decoded first. Then tried in order: query
/// parameters, `/place/LAT,LNG`, `@LAT,LNG,zoom`, `!3dLAT!4dLNG`,
/// `!2dLNG!3dLAT`, and finally the first `LAT,LNG` pair anywhere.
/// The result is range-checked and rounded to 5 decimals.
pub fn parse_maps_link(text: &str) -> Result<GeoPoint, MapsLinkError> {
    let s = percent_decode_str(text.trim()).decode_utf8_lossy();
    let s = s.trim();
    if s.is_empty() {
        return Err(MapsLinkError::Empty);
    }

    if let Ok(url) = Url::parse(s) {
        for key in QUERY_KEYS {
            let found = url
                .query_pairs()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| captured(&PAIR, &v, false));
            if let Some(p) = found {
                return Ok(p);
            }
        }
    }

    captured(&PLACE, s, false)
        .or_else(|| captured(&VIEWPORT, s, false))
        .or_else(|| captured(&LAT_LNG_DATA, s, false))
        .or_else(|| captured(&LNG_LAT_DATA, s, true))
        .or_else(|| captured(&PAIR, s, false))
        .ok_or(MapsLinkError::NotFound)
}

/// First match of `re` in `s` as a valid point; `swapped` means `lng` comes first
fn captured(re: &Regex, s: &str, swapped: bool) -> Option<GeoPoint> {
    let caps = re.captures(s)?;
    let a: f64 = caps.get(1)?.as_str().parse().ok()?;
    let b: f64 = caps.get(2)?.as_str().parse().ok()?;
    let (lat, lng) = if swapped { (b, a) } else { (a, b) };
    valid(GeoPoint::new(lat, lng))
}

fn valid(p: GeoPoint) -> Option<GeoPoint> {
    if !p.is_valid() {
        return None;
    }
    Some(GeoPoint::new(round5(p.lat), round5(p.lng)))
}

fn round5(v: f64) -> f64 {
    (v * 100_000.0).round() / 100_000.0
}
