use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::client::{ApiClient, ApiError};
use super::types::{CropRect, GalleryFilter, GalleryImage, GalleryKind, GalleryPage, GalleryStatus};

/// Aspect ratios the backend serves assets in. Shown in help text; the
/// client forwards whatever the operator supplies and lets the store decide.
pub const KNOWN_RATIOS: &[&str] = &["16:9", "19:6", "8:1", "1:1", "16:5", "4:3"];

/// Upload payloads larger than this are rejected before any bytes are sent.
pub const MAX_UPLOAD_SIZE: usize = 8 * 1024 * 1024; // 8MB

#[derive(Debug, Serialize)]
struct FilterBody<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<GalleryKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<GalleryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyword: Option<&'a str>,
    page: u32,
    limit: u32,
}

/// Request body for registering an uploaded asset in the gallery.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewGalleryEntry {
    pub image_uri: String,
    #[serde(rename = "type")]
    pub kind: GalleryKind,
    pub path: String,
    pub ratio: String,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct UploadedImage {
    image_uri: String,
}

impl ApiClient {
    /// `POST /gallery/filter`: one page of gallery rows. Read-only despite
    /// the verb; participates in read retry.
    pub async fn filter_gallery(
        &self,
        filter: &GalleryFilter,
        page: u32,
        limit: u32,
    ) -> Result<GalleryPage, ApiError> {
        let body = FilterBody {
            kind: filter.kind,
            ratio: filter.ratio.as_deref(),
            status: filter.status,
            keyword: filter.keyword.as_deref(),
            page,
            limit,
        };
        self.request_json(Method::POST, &["gallery", "filter"], Some(&body), true)
            .await
    }

    /// `POST /gallery`: registers an entry for an already-uploaded asset.
    pub async fn create_gallery_entry(
        &self,
        entry: &NewGalleryEntry,
    ) -> Result<GalleryImage, ApiError> {
        self.request_json(Method::POST, &["gallery"], Some(entry), false)
            .await
    }

    /// `POST /gallery/upload`: ships raw image bytes (multipart `file` part)
    /// with optional crop and ratio fields, returning the minted `image_uri`.
    ///
    /// The bytes are forwarded untouched; cropping happens server-side.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        ratio: Option<&str>,
        crop: Option<CropRect>,
    ) -> Result<String, ApiError> {
        let part = Part::bytes(bytes).file_name(file_name.to_owned());
        let mut form = Form::new().part("file", part);
        if let Some(ratio) = ratio {
            form = form.text("ratio", ratio.to_owned());
        }
        if let Some(crop) = crop {
            form = form
                .text("crop_x", crop.x.to_string())
                .text("crop_y", crop.y.to_string())
                .text("crop_width", crop.width.to_string())
                .text("crop_height", crop.height.to_string());
        }

        let uploaded: UploadedImage = self.post_multipart(&["gallery", "upload"], form).await?;
        Ok(uploaded.image_uri)
    }
}
