//! Storage key generation shared by every unit.
//!
//! Primary artifact: `{prefix}/{product_id}/{media_id}{ext}`.
//! Thumbnail: the primary key with its extension replaced by `-{W}x{H}_thumbnail.png`.

use uuid::Uuid;

const MAX_EXTENSION_LENGTH: usize = 10;

/// Fresh opaque media id: 32 lowercase hex characters.
pub fn generate_media_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Extension of `filename` including the dot, lower-cased.
///
/// Returns an empty string when the filename has no usable extension.
pub fn file_extension(filename: &str) -> String {
    let name = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) if idx > 0 => {
            let ext = &name[idx + 1..];
            if ext.is_empty()
                || ext.len() > MAX_EXTENSION_LENGTH
                || !ext.chars().all(|c| c.is_ascii_alphanumeric())
            {
                String::new()
            } else {
                format!(".{}", ext.to_ascii_lowercase())
            }
        }
        _ => String::new(),
    }
}

/// Key of the primary artifact.
pub fn media_storage_key(prefix: &str, product_id: &str, media_id: &str, filename: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let ext = file_extension(filename);
    if prefix.is_empty() {
        format!("{}/{}{}", product_id, media_id, ext)
    } else {
        format!("{}/{}/{}{}", prefix, product_id, media_id, ext)
    }
}

/// Key of the thumbnail derived from `source_key`.
pub fn thumbnail_key(source_key: &str, width: u32, height: u32) -> String {
    let segment_start = source_key.rfind('/').map(|i| i + 1).unwrap_or(0);
    let stem = match source_key[segment_start..].rfind('.') {
        Some(dot) if dot > 0 => &source_key[..segment_start + dot],
        _ => source_key,
    };
    format!("{}-{}x{}_thumbnail.png", stem, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_id_is_simple_hex() {
        let id = generate_media_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, generate_media_id());
    }

    #[test]
    fn extension_is_normalised() {
        assert_eq!(file_extension("photo.JPG"), ".jpg");
        assert_eq!(file_extension("archive.tar.gz"), ".gz");
        assert_eq!(file_extension("noext"), "");
        assert_eq!(file_extension(".hidden"), "");
        assert_eq!(file_extension("weird.j p g"), "");
        assert_eq!(file_extension("dir.d/file"), "");
    }

    #[test]
    fn primary_key_layout() {
        assert_eq!(
            media_storage_key("media", "P1", "abc", "cat.jpeg"),
            "media/P1/abc.jpeg"
        );
        assert_eq!(media_storage_key("/media/", "P1", "abc", "clip"), "media/P1/abc");
        assert_eq!(media_storage_key("", "P1", "abc", "a.png"), "P1/abc.png");
    }

    #[test]
    fn thumbnail_key_replaces_extension() {
        assert_eq!(
            thumbnail_key("media/P1/abc.jpg", 200, 150),
            "media/P1/abc-200x150_thumbnail.png"
        );
        assert_eq!(
            thumbnail_key("media/P1/abc", 64, 64),
            "media/P1/abc-64x64_thumbnail.png"
        );
        assert_eq!(
            thumbnail_key("media.v2/P1/abc", 10, 10),
            "media.v2/P1/abc-10x10_thumbnail.png"
        );
    }
}
