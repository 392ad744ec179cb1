//! Photo metadata tags read from EXIF.
//!
//! Tag keys keep their historical spellings ("Lense", "Aperature") so
//! objects tagged earlier are still matched and replaced.

use std::collections::BTreeMap;
use std::io::Cursor;

use async_trait::async_trait;
use exif::{Exif, Field, In, Reader, Tag as ExifTag, Value};
use tracing::debug;

use crate::app::runner::{FeatureContext, FeatureResult, FeatureStrategy};
use crate::domain::errors::ArchiveError;
use crate::domain::tags::Tag;

pub const CAMERA_AND_LENS_KEY: &str = "Camera and Lense Information";
pub const PHOTO_INFORMATION_KEY: &str = "Photo Information";
pub const PHOTO_DATE_KEY: &str = "Photo Date";

pub const TAG_KEYS: [&str; 3] = [CAMERA_AND_LENS_KEY, PHOTO_INFORMATION_KEY, PHOTO_DATE_KEY];

pub const PHOTO_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "dng"];

const UNKNOWN: &str = "Unknown";

/// Text values of the primary image's EXIF fields, keyed by tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifSummary {
    fields: BTreeMap<String, String>,
}

impl ExifSummary {
    /// Unreadable or absent EXIF yields an empty summary.
    pub fn read(body: &[u8]) -> Self {
        let mut cursor = Cursor::new(body);
        match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => Self::from_exif(&exif),
            Err(err) => {
                debug!(error = %err, "no readable EXIF");
                Self::default()
            }
        }
    }

    fn from_exif(exif: &Exif) -> Self {
        let fields = exif
            .fields()
            .filter(|f| f.ifd_num == In::PRIMARY)
            .map(|f| (f.tag.to_string(), field_text(f)))
            .collect();
        Self { fields }
    }

    fn value(&self, tag: ExifTag) -> &str {
        self.fields
            .get(&tag.to_string())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn tags(&self) -> Vec<Tag> {
        vec![
            Tag::truncated(
                CAMERA_AND_LENS_KEY,
                format!(
                    "{} {} - {}",
                    self.value(ExifTag::Make),
                    self.value(ExifTag::Model),
                    self.value(ExifTag::LensModel)
                ),
            ),
            Tag::truncated(
                PHOTO_INFORMATION_KEY,
                format!(
                    "Shutter: {} Aperature: {} ISO: {} Resolution: {}x{} Focal Length: {}",
                    self.value(ExifTag::ExposureTime),
                    self.value(ExifTag::ApertureValue),
                    self.value(ExifTag::PhotographicSensitivity),
                    self.value(ExifTag::XResolution),
                    self.value(ExifTag::YResolution),
                    self.value(ExifTag::FocalLength)
                ),
            ),
            Tag::truncated(PHOTO_DATE_KEY, self.value(ExifTag::DateTime)),
        ]
    }
}

/// ASCII values without the quotes `display_value` puts around them.
fn field_text(field: &Field) -> String {
    match &field.value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|p| String::from_utf8_lossy(p).trim_end_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        _ => field.display_value().to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExifStrategy;

#[async_trait]
impl FeatureStrategy for ExifStrategy {
    fn tag_keys(&self) -> &[&'static str] {
        &TAG_KEYS
    }

    async fn apply(&self, ctx: FeatureContext<'_>) -> Result<FeatureResult, ArchiveError> {
        match ctx.object.extension() {
            Some(ext) if PHOTO_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Ok(FeatureResult::NotApplicable {
                    reason: format!("'{}' is not a photo", ctx.object.key),
                });
            }
        }

        let body = ctx.store.get_object(ctx.object).await?;
        let summary = ExifSummary::read(&body);
        Ok(FeatureResult::Applied {
            tags: summary.tags(),
            data: serde_json::to_value(summary.fields())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::ObjectLocator;
    use crate::domain::tags::{MAX_TAG_VALUE_LEN, TagSet};
    use crate::impls::InMemoryObjectStore;
    use rstest::rstest;

    /// Smallest JPEG carrying an EXIF block with only `Make = Canon`.
    fn jpeg_with_make() -> Vec<u8> {
        jpeg_with_make_text("Canon")
    }

    /// JPEG whose only EXIF field is an ASCII `Make`.
    fn jpeg_with_make_text(make: &str) -> Vec<u8> {
        let mut text = make.as_bytes().to_vec();
        text.push(0);
        let count = text.len() as u32;

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08");
        tiff.extend_from_slice(&[0x00, 0x01]);
        // Make, ASCII, value at offset 26
        tiff.extend_from_slice(&[0x01, 0x0F, 0x00, 0x02]);
        tiff.extend_from_slice(&count.to_be_bytes());
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x1A]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        tiff.extend_from_slice(&text);

        let mut payload = b"Exif\x00\x00".to_vec();
        payload.extend_from_slice(&tiff);
        let len = (payload.len() + 2) as u16;

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&len.to_be_bytes());
        jpeg.extend_from_slice(&payload);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    #[test]
    fn missing_values_render_unknown() {
        let tags = ExifSummary::read(b"not an image").tags();
        assert_eq!(tags[0].value, "Unknown Unknown - Unknown");
        assert_eq!(
            tags[1].value,
            "Shutter: Unknown Aperature: Unknown ISO: Unknown Resolution: UnknownxUnknown Focal Length: Unknown"
        );
        assert_eq!(tags[2].value, "Unknown");
    }

    #[test]
    fn reads_make_from_jpeg() {
        let summary = ExifSummary::read(&jpeg_with_make());
        assert_eq!(summary.tags()[0].value, "Canon Unknown - Unknown");
        assert_eq!(summary.fields().get("Make").map(String::as_str), Some("Canon"));
    }

    #[test]
    fn long_exif_text_fits_the_tag_value_limit() {
        let summary = ExifSummary::read(&jpeg_with_make_text(&"X".repeat(300)));
        assert_eq!(summary.fields().get("Make").map(|m| m.len()), Some(300));

        let tags = summary.tags();
        assert!(tags.iter().all(|t| t.value.chars().count() <= MAX_TAG_VALUE_LEN));
        assert!(tags[0].value.starts_with("XXX"));
        assert!(TagSet::default().replace_keys(&TAG_KEYS, tags).is_ok());
    }

    #[rstest]
    #[case::text("notes.txt")]
    #[case::no_extension("README")]
    #[case::video("clip.MOV")]
    #[tokio::test]
    async fn non_photos_are_not_applicable(#[case] key: &str) {
        let store = InMemoryObjectStore::new();
        let object = ObjectLocator::new("photos", "arn", key);
        let result = ExifStrategy
            .apply(FeatureContext {
                object: &object,
                store: &store,
            })
            .await
            .unwrap();
        assert!(matches!(result, FeatureResult::NotApplicable { .. }));
    }

    #[tokio::test]
    async fn photo_without_exif_is_tagged_unknown() {
        let store = InMemoryObjectStore::new();
        store.put_object("photos", "raw.DNG", b"\x00\x01".to_vec()).await;
        let object = ObjectLocator::new("photos", "arn", "raw.DNG");

        let result = ExifStrategy
            .apply(FeatureContext {
                object: &object,
                store: &store,
            })
            .await
            .unwrap();
        match result {
            FeatureResult::Applied { tags, data } => {
                assert_eq!(tags.len(), 3);
                assert_eq!(data, serde_json::json!({}));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
