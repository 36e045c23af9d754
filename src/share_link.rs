// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Share links handed from a bank employee to a vendor.
//!
//! Format: `{base}/decrypt?file_id={id}#k={base64 key}`.
//!
//! The key travels only in the fragment, which HTTP clients never send to
//! a server. A `k` parameter found in the query string is ignored rather
//! than trusted, so a mangled link cannot leak a key into server logs
//! by being "accepted".

use url::{form_urlencoded, Url};

use crate::crypto::FileKey;

const FILE_ID_PARAM: &str = "file_id";
const KEY_PARAM: &str = "k";
const DECRYPT_SEGMENT: &str = "decrypt";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("Malformed share link: {0}")]
    MalformedLink(String),
    #[error("Invalid vendor portal base URL: {0}")]
    InvalidBase(String),
    #[error("Share link carries an invalid key")]
    InvalidKey,
}

/// Decoded share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub file_id: String,
    /// Absent when the link was shared without its fragment.
    pub key: Option<FileKey>,
}

/// Build the vendor link for `file_id`, carrying `key` in the fragment.
pub fn build_link(base: &str, file_id: &str, key: &FileKey) -> Result<String, LinkError> {
    let mut url = Url::parse(base).map_err(|e| LinkError::InvalidBase(format!("{base}: {e}")))?;

    url.path_segments_mut()
        .map_err(|_| LinkError::InvalidBase(format!("{base}: cannot be a base")))?
        .pop_if_empty()
        .push(DECRYPT_SEGMENT);
    url.query_pairs_mut().append_pair(FILE_ID_PARAM, file_id);

    let encoded_key: String = form_urlencoded::byte_serialize(key.to_base64().as_bytes()).collect();
    url.set_fragment(Some(&format!("{KEY_PARAM}={encoded_key}")));

    Ok(url.into())
}

/// Parse a vendor link.
///
/// `file_id` comes from the query, or from a trailing `/decrypt/{id}` path
/// segment. The key comes from the fragment only.
pub fn parse_link(link: &str) -> Result<ShareLink, LinkError> {
    let url = Url::parse(link.trim()).map_err(|e| LinkError::MalformedLink(e.to_string()))?;

    let file_id = url
        .query_pairs()
        .find(|(name, _)| name == FILE_ID_PARAM)
        .map(|(_, value)| value.into_owned())
        .or_else(|| file_id_from_path(&url))
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| LinkError::MalformedLink("missing file_id".to_string()))?;

    let key = match url.fragment() {
        Some(fragment) => key_from_fragment(fragment)?,
        None => None,
    };

    Ok(ShareLink { file_id, key })
}

fn file_id_from_path(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [.., DECRYPT_SEGMENT, id] => Some((*id).to_string()),
        _ => None,
    }
}

fn key_from_fragment(fragment: &str) -> Result<Option<FileKey>, LinkError> {
    let Some((_, value)) = form_urlencoded::parse(fragment.as_bytes()).find(|(n, _)| n == KEY_PARAM)
    else {
        return Ok(None);
    };
    if value.is_empty() {
        return Ok(None);
    }

    // An unescaped '+' from a hand-edited link decodes as a space.
    let value = value.replace(' ', "+");
    FileKey::from_base64(&value)
        .map(Some)
        .map_err(|_| LinkError::InvalidKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> FileKey {
        // 0xfb bytes encode to '+' and '/' heavy base64.
        FileKey::from_bytes(&[0xfb; 32]).unwrap()
    }

    #[test]
    fn link_keeps_key_out_of_path_and_query() {
        let link = build_link("http://localhost:3000/third-party-vendor", "f-1", &key()).unwrap();
        let url = Url::parse(&link).unwrap();

        assert_eq!(url.path(), "/third-party-vendor/decrypt");
        assert_eq!(url.query(), Some("file_id=f-1"));
        assert!(url.fragment().unwrap().starts_with("k="));

        let before_fragment = link.split('#').next().unwrap();
        assert!(!before_fragment.contains(&key().to_base64()));
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let link = build_link("https://vendors.example/portal/", "abc", &key()).unwrap();
        assert!(link.starts_with("https://vendors.example/portal/decrypt?file_id=abc#k="));
    }

    #[test]
    fn build_then_parse() {
        let link = build_link("https://vendors.example", "f-42", &key()).unwrap();
        let parsed = parse_link(&link).unwrap();
        assert_eq!(parsed.file_id, "f-42");
        assert_eq!(parsed.key, Some(key()));
    }

    #[test]
    fn key_may_be_absent() {
        let parsed = parse_link("https://vendors.example/decrypt?file_id=f-1").unwrap();
        assert_eq!(parsed.file_id, "f-1");
        assert!(parsed.key.is_none());

        let empty = parse_link("https://vendors.example/decrypt?file_id=f-1#k=").unwrap();
        assert!(empty.key.is_none());
    }

    #[test]
    fn missing_file_id_is_malformed() {
        assert!(matches!(
            parse_link("https://vendors.example/decrypt#k=abc"),
            Err(LinkError::MalformedLink(_))
        ));
        assert!(matches!(
            parse_link("https://vendors.example/decrypt?file_id=#k=abc"),
            Err(LinkError::MalformedLink(_))
        ));
        assert!(matches!(parse_link("not a url"), Err(LinkError::MalformedLink(_))));
    }

    #[test]
    fn key_in_query_is_ignored() {
        let encoded: String =
            form_urlencoded::byte_serialize(key().to_base64().as_bytes()).collect();
        let link = format!("https://vendors.example/decrypt?file_id=f-1&k={encoded}");
        assert!(parse_link(&link).unwrap().key.is_none());
    }

    #[test]
    fn path_form_and_extra_fragment_params() {
        let raw = key().to_base64();
        let link = format!("https://vendors.example/decrypt/f-9#k={raw}&iv=AAAA");
        let parsed = parse_link(&link).unwrap();
        assert_eq!(parsed.file_id, "f-9");
        assert_eq!(parsed.key, Some(key()));
    }

    #[test]
    fn bad_key_and_bad_base_are_reported() {
        assert_eq!(
            parse_link("https://vendors.example/decrypt?file_id=f#k=short"),
            Err(LinkError::InvalidKey)
        );
        assert!(matches!(
            build_link("not a base", "f", &key()),
            Err(LinkError::InvalidBase(_))
        ));
        assert!(matches!(
            build_link("mailto:ops@bank.com", "f", &key()),
            Err(LinkError::InvalidBase(_))
        ));
    }
}
