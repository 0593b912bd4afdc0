use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque category identifier minted by the store.
///
/// The client never parses, orders, or fabricates these; they only flow back
/// into request paths and bodies. Wire representation is a bare JSON string
/// (the store exposes it as `_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

/// One category row exactly as the store reports it.
///
/// `slug` and `level` are server-computed; the client treats every field as
/// authoritative and never edits a row in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Absent on root categories (`level == 1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    pub level: u32,
}

/// Operator-supplied fields for a new category.
///
/// Identifier, slug, `parent_id`, and `level` are never part of a draft: the
/// first two are server-minted, the latter two are derived from the subject
/// the draft is attached to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDraft {
    pub name: String,
    pub description: Option<String>,
    pub image_uri: Option<String>,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Placement kind of a gallery asset (wire field `type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryKind {
    Category,
    Banner,
    Card,
}

impl FromStr for GalleryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(Self::Category),
            "banner" => Ok(Self::Banner),
            "card" => Ok(Self::Card),
            other => Err(format!(
                "unknown gallery kind '{other}' (expected category, banner, or card)"
            )),
        }
    }
}

impl fmt::Display for GalleryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Category => "category",
            Self::Banner => "banner",
            Self::Card => "card",
        };
        f.write_str(s)
    }
}

/// Scheduling state of a gallery asset, derived server-side from its
/// start/end dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryStatus {
    Upcoming,
    Ongoing,
    Expired,
}

impl FromStr for GalleryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "expired" => Ok(Self::Expired),
            other => Err(format!(
                "unknown gallery status '{other}' (expected upcoming, ongoing, or expired)"
            )),
        }
    }
}

impl fmt::Display for GalleryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// One gallery row as the service reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: GalleryKind,
    pub image_uri: String,
    /// Click-through target attached to the asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub ratio: String,
    pub status: GalleryStatus,
    #[serde(
        rename = "startDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "endDate", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

/// Operator-chosen gallery filters. Unset fields are omitted from the
/// request entirely; the keyword is forwarded opaquely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GalleryFilter {
    pub kind: Option<GalleryKind>,
    pub ratio: Option<String>,
    pub status: Option<GalleryStatus>,
    pub keyword: Option<String>,
}

impl GalleryFilter {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.ratio.is_none() && self.status.is_none() && self.keyword.is_none()
    }
}

/// One page of filtered gallery rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryPage {
    pub images: Vec<GalleryImage>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

/// Crop rectangle forwarded verbatim to the upload endpoint.
/// Pixel coordinates, origin at the top-left of the source image; the client
/// never decodes or crops the image itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for CropRect {
    type Err = String;

    /// Parses `x,y,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(|p| p.trim().parse::<u32>());
        let mut next = |what: &str| -> Result<u32, String> {
            parts
                .next()
                .ok_or_else(|| format!("crop is missing {what}"))?
                .map_err(|_| format!("crop {what} is not a whole number"))
        };
        let rect = Self {
            x: next("x")?,
            y: next("y")?,
            width: next("width")?,
            height: next("height")?,
        };
        if s.split(',').count() != 4 {
            return Err("crop must be x,y,width,height".to_owned());
        }
        if rect.width == 0 || rect.height == 0 {
            return Err("crop width and height must be non-zero".to_owned());
        }
        Ok(rect)
    }
}
