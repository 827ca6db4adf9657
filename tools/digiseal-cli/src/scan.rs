//! QR payload decoding.
//!
//! Product labels carry one of three payload shapes:
//!
//! - a bare product id: `BAG-001`
//! - a verification URL: `https://digiseal.example/verify/BAG-001` or
//!   `https://digiseal.example/verify?productId=BAG-001`
//! - a JSON object: `{"productId": "BAG-001", ...}`

use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("QR payload is empty")]
    Empty,
    #[error("no product id in QR payload: {0}")]
    NoProductId(String),
}

/// Extracts the product id from a scanned QR payload.
pub fn product_id_from_payload(payload: &str) -> Result<String, ScanError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ScanError::Empty);
    }

    if payload.starts_with('{') {
        return from_json(payload);
    }

    if let Ok(url) = Url::parse(payload) {
        if matches!(url.scheme(), "http" | "https") {
            return from_url(&url).ok_or_else(|| ScanError::NoProductId(payload.to_string()));
        }
    }

    Ok(payload.to_string())
}

fn from_json(payload: &str) -> Result<String, ScanError> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|_| ScanError::NoProductId(payload.to_string()))?;

    value
        .get("productId")
        .and_then(|id| id.as_str())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ScanError::NoProductId(payload.to_string()))
}

/// `productId` query parameter first, then the last path segment.
fn from_url(url: &Url) -> Option<String> {
    if let Some((_, id)) = url
        .query_pairs()
        .find(|(key, value)| key == "productId" && !value.trim().is_empty())
    {
        return Some(id.trim().to_string());
    }

    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
