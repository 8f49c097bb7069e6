use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::canonical_combining_class;

/// Prefix shared by every per-person collection.
pub const COLLECTION_PREFIX: &str = "cv-";

/// Normalize a person's name for lookup: strip accents, lowercase, hyphenate spaces.
///
/// `"José Pérez"` and `"jose perez"` both become `"jose-perez"`.
pub fn normalize(name: &str) -> String {
    let stripped: String = name
        .nfkd()
        .filter(|c| canonical_combining_class(*c) == 0)
        .collect();

    stripped.to_lowercase().replace(' ', "-")
}

/// Collection identifier for a person. Index building and retrieval both go
/// through here so the two sides always agree.
pub fn collection_id(name: &str) -> String {
    format!("{}{}", COLLECTION_PREFIX, normalize(name))
}
