//! Content hash tags (MD5 / SHA1 / SHA256 / SHA512).

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use serde_json::json;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::app::runner::{FeatureContext, FeatureResult, FeatureStrategy};
use crate::domain::errors::ArchiveError;
use crate::domain::tags::Tag;

pub const TAG_KEYS: [&str; 4] = ["MD5", "SHA1", "SHA256", "SHA512"];

/// Digests of a whole object, each URL-safe base64 with padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHashes {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
    pub sha512: String,
}

impl ContentHashes {
    pub fn of(body: &[u8]) -> Self {
        Self {
            md5: URL_SAFE.encode(md5::compute(body).0),
            sha1: URL_SAFE.encode(Sha1::digest(body)),
            sha256: URL_SAFE.encode(Sha256::digest(body)),
            sha512: URL_SAFE.encode(Sha512::digest(body)),
        }
    }

    pub fn tags(&self) -> Vec<Tag> {
        vec![
            Tag::new("MD5", &self.md5),
            Tag::new("SHA1", &self.sha1),
            Tag::new("SHA256", &self.sha256),
            Tag::new("SHA512", &self.sha512),
        ]
    }
}

/// Applies to every object regardless of type.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashStrategy;

#[async_trait]
impl FeatureStrategy for HashStrategy {
    fn tag_keys(&self) -> &[&'static str] {
        &TAG_KEYS
    }

    async fn apply(&self, ctx: FeatureContext<'_>) -> Result<FeatureResult, ArchiveError> {
        let body = ctx.store.get_object(ctx.object).await?;
        let hashes = ContentHashes::of(&body);
        Ok(FeatureResult::Applied {
            data: json!({
                "MD5": hashes.md5,
                "SHA1": hashes.sha1,
                "SHA256": hashes.sha256,
                "SHA512": hashes.sha512,
            }),
            tags: hashes.tags(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::ObjectLocator;
    use crate::impls::InMemoryObjectStore;

    #[test]
    fn empty_input_digests() {
        let hashes = ContentHashes::of(b"");
        assert_eq!(hashes.md5, "1B2M2Y8AsgTpgAmY7PhCfg==");
        assert_eq!(hashes.sha1, "2jmj7l5rSw0yVb_vlWAYkK_YBwk=");
        assert_eq!(hashes.sha256, "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU=");
        // 64 bytes -> 88 chars
        assert_eq!(hashes.sha512.len(), 88);
    }

    #[tokio::test]
    async fn applies_to_any_object() {
        let store = InMemoryObjectStore::new();
        store.put_object("photos", "notes.txt", b"hello".to_vec()).await;
        let object = ObjectLocator::new("photos", "arn", "notes.txt");

        let result = HashStrategy
            .apply(FeatureContext {
                object: &object,
                store: &store,
            })
            .await
            .unwrap();

        match result {
            FeatureResult::Applied { tags, data } => {
                let keys: Vec<&str> = tags.iter().map(|t| t.key.as_str()).collect();
                assert_eq!(keys, TAG_KEYS);
                assert_eq!(data["MD5"], tags[0].value);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_object_fails() {
        let store = InMemoryObjectStore::new();
        let object = ObjectLocator::new("photos", "arn", "gone.jpg");
        let result = HashStrategy
            .apply(FeatureContext {
                object: &object,
                store: &store,
            })
            .await;
        assert!(result.is_err());
    }
}
