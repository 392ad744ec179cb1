//! Features - enrichment strategies run by `app::runner::FeatureRunner`
//!
//! - **hash**: content digests, every object
//! - **meta**: EXIF camera / exposure / date, photos only
//! - **rekognition**: detected labels, jpg / png only

pub mod hash;
pub mod meta;
pub mod rekognition;

pub use self::hash::HashStrategy;
pub use self::meta::ExifStrategy;
pub use self::rekognition::RekognitionStrategy;
