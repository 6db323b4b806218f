mod canonical;
mod extract;
mod normalize;
mod variants;

pub use canonical::{canonicalize, is_recognized};
pub use extract::extract_link;
pub use normalize::ShapeNormalizer;
pub use variants::VariantSet;

use crate::constants::STANDARD_HOST;
use crate::core::VideoId;

/// `https://www.tiktok.com/@<author>/video/<id>`
pub fn standard_link(author: &str, id: &VideoId) -> String {
    format!("https://{STANDARD_HOST}/@{author}/video/{id}")
}
