//! Item identifiers derived from image URLs.
//!
//! The export refers to each annotated item by the URL of its image. The item
//! id is the file name at the end of the URL path with its extension removed,
//! so the same image always maps to the same id no matter which host or
//! signed query string served it.
//!
//! # Examples
//!
//! - `https://cdn.example.com/img/000123.jpg` → `000123`
//! - `https://cdn.example.com/a/photo.v2.png?sig=abc#top` → `photo.v2`
//! - `/local/images/0042.jpeg` → `0042`
//! - `https://cdn.example.com/img/` → none (no file name)

/// Derive the item id from an image URL.
///
/// Input: absolute URL or bare path, e.g. `https://host/dir/img_0001.jpg`
/// Output: file name without extension, e.g. `img_0001`
///
/// # Algorithm
///
/// 1. Drop the fragment (`#...`) and the query (`?...`)
/// 2. Drop `scheme://authority` when present
/// 3. Take the segment after the final `/`
/// 4. Strip the final extension; leading dots belong to the name
///    (`.hidden` stays `.hidden`)
///
/// Returns `None` when no file name remains.
pub fn image_id_from_url(url: &str) -> Option<String> {
    let url = url.trim();

    // `split` always yields at least one piece.
    let url = url.split('#').next().unwrap_or_default();
    let url = url.split('?').next().unwrap_or_default();

    let path = match url.find("://") {
        Some(i) => {
            let rest = &url[i + 3..];
            rest.find('/').map_or("", |j| &rest[j..])
        }
        None => url,
    };

    let name = path.rsplit('/').next().unwrap_or_default();
    let stem = strip_extension(name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

fn strip_extension(name: &str) -> &str {
    let body = name.trim_start_matches('.');
    let leading = name.len() - body.len();
    match body.rfind('.') {
        Some(dot) => &name[..leading + dot],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_url() {
        assert_eq!(
            image_id_from_url("https://cdn.example.com/img/000123.jpg").as_deref(),
            Some("000123")
        );
    }

    #[test]
    fn query_and_fragment_dropped() {
        assert_eq!(
            image_id_from_url("https://cdn.example.com/a/b.png?sig=x/y.z#frag").as_deref(),
            Some("b")
        );
    }

    #[test]
    fn only_final_extension_stripped() {
        assert_eq!(
            image_id_from_url("https://host/photo.v2.png").as_deref(),
            Some("photo.v2")
        );
    }

    #[test]
    fn bare_path() {
        assert_eq!(image_id_from_url("/local/images/0042.jpeg").as_deref(), Some("0042"));
        assert_eq!(image_id_from_url("0042.jpeg").as_deref(), Some("0042"));
    }

    #[test]
    fn no_extension() {
        assert_eq!(image_id_from_url("https://host/img/abc").as_deref(), Some("abc"));
    }

    #[test]
    fn leading_dot_is_part_of_name() {
        assert_eq!(image_id_from_url("https://host/.hidden").as_deref(), Some(".hidden"));
        assert_eq!(image_id_from_url("https://host/.hidden.jpg").as_deref(), Some(".hidden"));
    }

    #[test]
    fn trailing_slash_has_no_name() {
        assert_eq!(image_id_from_url("https://host/img/"), None);
        assert_eq!(image_id_from_url("https://host"), None);
        assert_eq!(image_id_from_url(""), None);
    }

    #[test]
    fn same_url_same_id() {
        let url = "https://cdn.example.com/bicycles/7f3a.jpg?token=1";
        assert_eq!(image_id_from_url(url), image_id_from_url(url));
    }

    #[test]
    fn host_does_not_matter() {
        assert_eq!(
            image_id_from_url("https://a.example.com/x/img_1.jpg"),
            image_id_from_url("http://b.example.org/y/z/img_1.jpg"),
        );
    }

    #[test]
    fn id_never_contains_separator() {
        for url in [
            "https://host/a/b/c.jpg",
            "s3://bucket/key/with/many/parts.png",
            "relative/dir/file.tar.gz",
            "https://host/a.b/c",
        ] {
            let id = image_id_from_url(url).unwrap();
            assert!(!id.contains('/'), "{url} -> {id}");
            assert!(!id.ends_with(".jpg") && !id.ends_with(".png") && !id.ends_with(".gz"));
        }
    }
}
