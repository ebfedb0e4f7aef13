//! Choosing which size of a photo to download.
//!
//! Photos come with several variants. The original is often gone, so the
//! download loop works down the quality ladder until one succeeds.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use super::context::TraversalContext;
use super::error::ArchiveError;

/// Quality rank of a photo variant, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhotoQuality {
    /// `tn`
    Thumbnail,
    /// `sn`
    Standard,
    /// `hr`
    HighRes,
    /// `or`
    Original,
}

impl PhotoQuality {
    /// Parses the service's two-letter tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "tn" => Some(Self::Thumbnail),
            "sn" => Some(Self::Standard),
            "hr" => Some(Self::HighRes),
            "or" => Some(Self::Original),
            _ => None,
        }
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Thumbnail => "tn",
            Self::Standard => "sn",
            Self::HighRes => "hr",
            Self::Original => "or",
        }
    }
}

impl fmt::Display for PhotoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One downloadable size of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoVariant {
    #[serde(rename = "photoType")]
    pub photo_type: String,
    #[serde(rename = "displayURL")]
    pub display_url: String,
}

impl PhotoVariant {
    #[must_use]
    pub fn quality(&self) -> Option<PhotoQuality> {
        PhotoQuality::from_tag(&self.photo_type)
    }
}

/// Picks the highest-ranked variant whose quality is not excluded.
///
/// Unknown tags are logged and ignored. When two variants share the top
/// rank, the one listed last wins.
///
/// ```
/// use archiver_core::archive::{PhotoQuality, PhotoVariant, pick_best};
///
/// let variants: Vec<PhotoVariant> = ["tn", "or", "sn"]
///     .iter()
///     .map(|t| PhotoVariant { photo_type: t.to_string(), display_url: format!("https://x/{t}") })
///     .collect();
/// assert_eq!(pick_best(&variants, &[]).unwrap().photo_type, "or");
/// assert_eq!(pick_best(&variants, &[PhotoQuality::Original]).unwrap().photo_type, "sn");
/// ```
#[must_use]
pub fn pick_best<'a>(
    variants: &'a [PhotoVariant],
    excluded: &[PhotoQuality],
) -> Option<&'a PhotoVariant> {
    let mut best: Option<(PhotoQuality, &PhotoVariant)> = None;
    for variant in variants {
        let Some(quality) = variant.quality() else {
            error!(photo_type = %variant.photo_type, "unknown photo type");
            continue;
        };
        if excluded.contains(&quality) {
            continue;
        }
        if best.is_none_or(|(top, _)| quality >= top) {
            best = Some((quality, variant));
        }
    }
    best.map(|(_, variant)| variant)
}

/// How a variant download loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantOutcome {
    /// A variant of this quality was saved.
    Saved(PhotoQuality),
    /// The origin refused the file; no other variant was tried.
    Rejected,
    /// Every usable variant failed, or none was listed.
    Exhausted,
}

/// Downloads the best available variant to `path`, downgrading on failure.
///
/// Client errors exclude the failed quality and reselect. Store errors are
/// returned since a different size will not fix a full disk.
///
/// # Errors
///
/// Only [`ArchiveError`]s not caused by the client.
pub async fn download_best_variant(
    ctx: &TraversalContext<'_>,
    variants: &[PhotoVariant],
    path: &Path,
) -> Result<VariantOutcome, ArchiveError> {
    let mut excluded = Vec::new();
    loop {
        let Some(variant) = pick_best(variants, &excluded) else {
            error!(path = %path.display(), "no viable copy of this photo");
            return Ok(VariantOutcome::Exhausted);
        };
        let Some(quality) = variant.quality() else {
            return Ok(VariantOutcome::Exhausted);
        };

        match ctx.download_to(&variant.display_url, path).await {
            Ok(true) => return Ok(VariantOutcome::Saved(quality)),
            Ok(false) => return Ok(VariantOutcome::Rejected),
            Err(ArchiveError::Api(e)) => {
                error!(
                    url = %variant.display_url,
                    variant = %quality,
                    error = %e,
                    "variant download failed"
                );
                info!(variant = %quality, "excluding variant and reselecting");
                excluded.push(quality);
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn variants(tags: &[&str]) -> Vec<PhotoVariant> {
        tags.iter()
            .enumerate()
            .map(|(i, tag)| PhotoVariant {
                photo_type: (*tag).to_string(),
                display_url: format!("https://photos.example.com/{i}/{tag}.jpg"),
            })
            .collect()
    }

    #[test]
    fn test_pick_best_prefers_original() {
        let all = variants(&["tn", "sn", "hr", "or"]);
        assert_eq!(pick_best(&all, &[]).unwrap().photo_type, "or");
    }

    #[test]
    fn test_pick_best_with_original_excluded() {
        let all = variants(&["tn", "sn", "hr", "or"]);
        assert_eq!(
            pick_best(&all, &[PhotoQuality::Original]).unwrap().photo_type,
            "hr"
        );
    }

    #[test]
    fn test_pick_best_all_excluded_is_none() {
        let all = variants(&["tn", "sn", "hr", "or"]);
        let excluded = [
            PhotoQuality::Thumbnail,
            PhotoQuality::Standard,
            PhotoQuality::HighRes,
            PhotoQuality::Original,
        ];
        assert!(pick_best(&all, &excluded).is_none());
    }

    #[test]
    fn test_pick_best_ignores_unknown_tags() {
        let all = variants(&["xx", "sn", "zz"]);
        assert_eq!(pick_best(&all, &[]).unwrap().photo_type, "sn");
        assert!(pick_best(&variants(&["xx"]), &[]).is_none());
        assert!(pick_best(&[], &[]).is_none());
    }

    #[test]
    fn test_pick_best_tie_goes_to_last_listed() {
        let all = variants(&["hr", "hr"]);
        let best = pick_best(&all, &[]).unwrap();
        assert!(best.display_url.contains("/1/"), "{}", best.display_url);
    }

    #[test]
    fn test_quality_ordering() {
        assert!(PhotoQuality::Thumbnail < PhotoQuality::Standard);
        assert!(PhotoQuality::Standard < PhotoQuality::HighRes);
        assert!(PhotoQuality::HighRes < PhotoQuality::Original);
        assert_eq!(PhotoQuality::from_tag("hr"), Some(PhotoQuality::HighRes));
        assert_eq!(PhotoQuality::Original.to_string(), "or");
    }
}
