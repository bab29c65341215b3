//! Per-file upload preparation: computed attributes, hashes, remote keys.
//!
//! This is the file-attribute collaborator the reconciliation engine relies
//! on: both digests are deterministic functions of the file bytes and the
//! resolved rules, and the engine only ever compares them for equality.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::rules::Rules;

const HASH_READ_BLOCK: usize = 64 * 1024;

/// Media types that get a charset parameter by default.
const TEXT_MEDIA_TYPES: &[&str] = &[
    "text/css",
    "text/csv",
    "text/html",
    "text/javascript",
    "text/ecmascript",
    "application/json",
    "application/javascript",
    "application/ecmascript",
    "application/rtf",
    "application/x-sh",
    "application/x-c",
    "application/x-latex",
    "image/svg+xml",
    "text/plain",
    "text/yaml",
    "application/yaml",
    "application/x-yaml",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
    "application/vnd.mozilla.xul+xml",
];

fn dotted_extension(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

fn encoding_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        ".gz" => Some("gzip"),
        ".br" => Some("br"),
        ".bz2" => Some("bzip2"),
        ".xz" => Some("xz"),
        _ => None,
    }
}

/// Join an optional remote prefix with a relative path to form an object
/// key.
#[must_use]
pub fn join_key(prefix: Option<&str>, rel_path: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}/{rel_path}"),
        None => rel_path.to_string(),
    }
}

/// The resolved upload attributes for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAttributes {
    pub acl: String,
    pub content_type: String,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub storage_class: Option<String>,
    pub website_redirect_location: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl RemoteAttributes {
    /// Compute the attributes for a relative path under the given rules.
    #[must_use]
    pub fn compute(rel_path: &str, rules: &Rules) -> Self {
        let directives = rules.directives_for(rel_path);
        let outer_ext = dotted_extension(rel_path);

        // A compressed extension sets Content-Encoding; the media type is
        // then guessed from the inner name (style.css.gz -> text/css).
        let mut guess_source = rel_path;
        let mut content_encoding = None;
        if let Some(ext) = outer_ext.as_deref() {
            if let Some(encoding) = encoding_for_extension(ext) {
                content_encoding = Some(encoding.to_string());
                guess_source = &rel_path[..rel_path.len() - ext.len()];
            }
        }

        let media_type = outer_ext
            .as_deref()
            .and_then(|ext| rules.mimetype_overrides.get(ext).cloned())
            .or_else(|| {
                mime_guess::from_path(guess_source)
                    .first_raw()
                    .map(str::to_string)
            });

        let mut charset = None;
        if let Some(media_type) = media_type.as_deref() {
            if TEXT_MEDIA_TYPES.contains(&media_type) {
                charset = Some(
                    rules
                        .charset
                        .clone()
                        .unwrap_or_else(|| "utf-8".to_string()),
                );
            }
        }
        if directives.charset.is_some() {
            charset = directives.charset.clone();
        }

        let content_type = match &directives.content_type {
            Some(explicit) => explicit.clone(),
            None => match media_type {
                Some(media_type) => match charset {
                    Some(charset) => format!("{media_type}; charset={charset}"),
                    None => media_type,
                },
                None => "application/octet-stream".to_string(),
            },
        };

        Self {
            acl: directives
                .acl
                .clone()
                .unwrap_or_else(|| "public-read".to_string()),
            content_type,
            cache_control: Some(
                directives
                    .cache_control
                    .clone()
                    .unwrap_or_else(|| "max-age=10".to_string()),
            ),
            content_disposition: directives.content_disposition.clone(),
            content_encoding: directives.content_encoding.clone().or(content_encoding),
            content_language: directives.content_language.clone(),
            storage_class: directives.storage_class.clone(),
            website_redirect_location: directives.website_redirect_location.clone(),
            metadata: directives.s3_metadata.clone().unwrap_or_default(),
        }
    }

    /// Attributes for sitesync's own bookkeeping objects: private, no
    /// caching directives.
    #[must_use]
    pub fn private(content_type: &str) -> Self {
        Self {
            acl: "private".to_string(),
            content_type: content_type.to_string(),
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            content_language: None,
            storage_class: None,
            website_redirect_location: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attributes as key-sorted pairs, the canonical form used for both
    /// display and hashing.
    #[must_use]
    pub fn as_sorted_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("ACL".to_string(), self.acl.clone()),
            ("Content-Type".to_string(), self.content_type.clone()),
        ];
        let optional = [
            ("Cache-Control", &self.cache_control),
            ("Content-Disposition", &self.content_disposition),
            ("Content-Encoding", &self.content_encoding),
            ("Content-Language", &self.content_language),
            ("StorageClass", &self.storage_class),
            ("WebsiteRedirectLocation", &self.website_redirect_location),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key.to_string(), value.clone()));
            }
        }
        for (key, value) in &self.metadata {
            pairs.push((format!("S3Metadata:{key}"), value.clone()));
        }
        pairs.sort();
        pairs
    }

    fn canonical_lines(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.as_sorted_pairs() {
            out.push_str(&key);
            out.push('\n');
            out.push_str(&value);
            out.push('\n');
        }
        out
    }
}

/// A local file resolved against the rules: its computed attributes, remote
/// key, and content.
#[derive(Debug, Clone)]
pub struct PreparedFile {
    rel_path: String,
    abs_path: PathBuf,
    remote_key: String,
    attributes: RemoteAttributes,
}

impl PreparedFile {
    #[must_use]
    pub fn new(root: &Path, rel_path: &str, rules: &Rules) -> Self {
        Self {
            rel_path: rel_path.to_string(),
            abs_path: root.join(rel_path),
            remote_key: join_key(rules.remote_prefix(), rel_path),
            attributes: RemoteAttributes::compute(rel_path, rules),
        }
    }

    #[must_use]
    pub fn rel_path(&self) -> &str {
        &self.rel_path
    }

    /// Object key on the remote store, including the project prefix.
    #[must_use]
    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }

    #[must_use]
    pub fn attributes(&self) -> &RemoteAttributes {
        &self.attributes
    }

    /// Size of the local file in bytes.
    ///
    /// # Errors
    /// Returns an error if the file cannot be inspected.
    pub fn size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.abs_path)?.len())
    }

    /// Read the full file content for upload.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn content(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.abs_path)?)
    }

    /// SHA-256 of the file content as a hex string, streamed in fixed-size
    /// blocks.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn content_hash(&self) -> Result<String> {
        let mut file = File::open(&self.abs_path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; HASH_READ_BLOCK];
        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// SHA-256 of the canonical attribute serialization as a hex string.
    #[must_use]
    pub fn attributes_hash(&self) -> String {
        hex::encode(Sha256::digest(self.attributes.canonical_lines()))
    }

    /// Both digests, content first.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn hashes(&self) -> Result<(String, String)> {
        Ok((self.content_hash()?, self.attributes_hash()))
    }
}
