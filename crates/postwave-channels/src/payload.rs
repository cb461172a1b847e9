//! Wire payloads for the downstream posting automation.
//!
//! The receiving end is field-name sensitive: kebab-case keys, image
//! URLs joined into one comma-separated string.

use serde::{Deserialize, Serialize};

/// One outbound post. Exactly one of `product_image` / `video_urls` is
/// set; the variant decides which webhook endpoint receives it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePayload {
    #[serde(rename = "promotional-paragraph")]
    pub promotional_paragraph: String,

    #[serde(rename = "product-image", skip_serializing_if = "Option::is_none")]
    pub product_image: Option<String>,

    #[serde(rename = "video-urls", skip_serializing_if = "Option::is_none")]
    pub video_urls: Option<String>,

    pub footer: String,
}

impl WirePayload {
    pub fn standard(paragraph: String, image_urls: &[String], footer: String) -> Self {
        Self {
            promotional_paragraph: paragraph,
            product_image: Some(image_urls.join(",")),
            video_urls: None,
            footer,
        }
    }

    pub fn video(paragraph: String, video_urls: &[String], footer: String) -> Self {
        Self {
            promotional_paragraph: paragraph,
            product_image: None,
            video_urls: Some(video_urls.join(",")),
            footer,
        }
    }

    pub fn is_video(&self) -> bool {
        self.video_urls.is_some()
    }
}

/// Webhook acknowledgement. The full response body is kept so a
/// rejection can be persisted verbatim; anything other than a
/// `success` status is a delivery failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ack {
    pub body: serde_json::Value,
}

impl Ack {
    pub fn success() -> Self {
        Self {
            body: serde_json::json!({ "status": "success" }),
        }
    }

    pub fn status(&self) -> &str {
        self.body
            .get("status")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.status().eq_ignore_ascii_case("success")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_payload_uses_kebab_fields_and_joins_images() {
        let p = WirePayload::standard(
            "New drop!".into(),
            &[
                "https://img.test/1.png".to_string(),
                "https://img.test/2.png".to_string(),
            ],
            "Order link in comments".into(),
        );
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["promotional-paragraph"], "New drop!");
        assert_eq!(
            v["product-image"],
            "https://img.test/1.png,https://img.test/2.png"
        );
        assert_eq!(v["footer"], "Order link in comments");
        assert!(v.get("video-urls").is_none());
    }

    #[test]
    fn video_payload_carries_video_urls() {
        let p = WirePayload::video(
            "Watch this".into(),
            &["https://cdn.test/AB123.mp4".to_string()],
            "".into(),
        );
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["video-urls"], "https://cdn.test/AB123.mp4");
        assert!(v.get("product-image").is_none());
        assert!(p.is_video());
    }

    #[test]
    fn ack_success_is_case_insensitive() {
        let ack: Ack = serde_json::from_str(r#"{"status":"Success"}"#).unwrap();
        assert!(ack.is_success());
        let ack: Ack = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert!(!ack.is_success());
    }

    #[test]
    fn ack_keeps_fields_beyond_status() {
        let raw = r#"{"status":"error","reason":"quota exceeded","request_id":"r-17"}"#;
        let ack: Ack = serde_json::from_str(raw).unwrap();
        assert!(!ack.is_success());
        assert_eq!(ack.body["reason"], "quota exceeded");
        let round: serde_json::Value = serde_json::to_value(&ack).unwrap();
        assert_eq!(round["request_id"], "r-17");
    }
}
