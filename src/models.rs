// Core data structures for the fetchr pipeline

use serde::{Deserialize, Deserializer, Serialize};

const STATIC_HOST: &str = "staticflickr.com";

/// Thumbnail size suffix for the 150x150 square
const THUMBNAIL_SIZE_L: &str = "q";

/// Thumbnail size suffix for the 75x75 square
const THUMBNAIL_SIZE_S: &str = "s";

/// Fields shared by listing summaries and detailed photo info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PhotoCommon {
    pub id: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub server: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub farm: u32,
    #[serde(default, rename = "originalsecret")]
    pub original_secret: String,
    #[serde(default, rename = "originalformat")]
    pub original_format: String,
}

/// One photo as returned by a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PhotoSummary {
    #[serde(flatten)]
    pub common: PhotoCommon,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "ispublic")]
    pub is_public: u8,
    #[serde(default, rename = "isfriend")]
    pub is_friend: u8,
    #[serde(default, rename = "isfamily")]
    pub is_family: u8,
}

impl PhotoSummary {
    /// Secret needed for the detail lookup
    pub fn secret(&self) -> &str {
        &self.common.secret
    }
}

/// Detailed photo info, the enriched record written to the output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PhotoInfo {
    #[serde(flatten)]
    pub common: PhotoCommon,
    #[serde(default)]
    pub title: Content,
    #[serde(default)]
    pub description: Content,
}

/// `{"_content": "..."}` wrapper used by the detail endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(rename = "_content", default)]
    pub content: String,
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self {
            content: s.to_string(),
        }
    }
}

/// One page of listing results
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchPage {
    /// Current page number (1-based)
    #[serde(deserialize_with = "lenient_u32")]
    pub page: u32,
    /// Total number of pages
    #[serde(deserialize_with = "lenient_u32")]
    pub pages: u32,
    #[serde(rename = "photo", default)]
    pub photos: Vec<PhotoSummary>,
}

/// Identity and derived locators shared by every photo record
pub trait Photo {
    fn common(&self) -> &PhotoCommon;

    fn title(&self) -> &str;

    fn id(&self) -> &str {
        &self.common().id
    }

    /// URL of the original-size photo
    fn original_url(&self) -> String {
        let c = self.common();
        format!(
            "http://farm{}.{STATIC_HOST}/{}/{}_{}_o.{}",
            c.farm, c.server, c.id, c.original_secret, c.original_format
        )
    }

    /// URL of the large square thumbnail (150 x 150)
    fn large_thumbnail_url(&self) -> String {
        thumbnail_url(self.common(), THUMBNAIL_SIZE_L)
    }

    /// URL of the small square thumbnail (75 x 75)
    fn small_thumbnail_url(&self) -> String {
        thumbnail_url(self.common(), THUMBNAIL_SIZE_S)
    }
}

/// A photo record carrying its description as well
pub trait FullPhoto: Photo {
    fn description(&self) -> &str;
}

fn thumbnail_url(c: &PhotoCommon, size: &str) -> String {
    format!(
        "http://farm{}.{STATIC_HOST}/{}/{}_{}_{size}.jpg",
        c.farm, c.server, c.id, c.secret
    )
}

impl Photo for PhotoSummary {
    fn common(&self) -> &PhotoCommon {
        &self.common
    }

    fn title(&self) -> &str {
        &self.title
    }
}

impl Photo for PhotoInfo {
    fn common(&self) -> &PhotoCommon {
        &self.common
    }

    fn title(&self) -> &str {
        &self.title.content
    }
}

impl FullPhoto for PhotoInfo {
    fn description(&self) -> &str {
        &self.description.content
    }
}

/// Persisted shape of one photo in the output array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPhoto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub urls: SavedUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedUrls {
    pub original: String,
    #[serde(rename = "thumbnailL")]
    pub thumbnail_l: String,
    #[serde(rename = "thumbnailS")]
    pub thumbnail_s: String,
}

impl SavedPhoto {
    pub fn from_photo<P: FullPhoto + ?Sized>(photo: &P) -> Self {
        Self {
            id: photo.id().to_string(),
            title: photo.title().to_string(),
            description: photo.description().to_string(),
            urls: SavedUrls {
                original: photo.original_url(),
                thumbnail_l: photo.large_thumbnail_url(),
                thumbnail_s: photo.small_thumbnail_url(),
            },
        }
    }
}

/// One detail lookup that failed while the run kept going
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub photo_id: String,
    pub error: String,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Summaries returned by the listing stage
    pub listed: usize,
    /// Records written to the output file
    pub saved: usize,
    /// Detail lookups that failed (tolerant mode only)
    pub failed: Vec<ItemFailure>,
    /// Output file, absent when nothing was listed
    pub output: Option<std::path::PathBuf>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.saved == self.listed
    }
}

// The API is inconsistent about numbers: `farm` is an int, `total` is a
// string, and some mirrors quote everything.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u32),
        Str(String),
    }

    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
