//! sitesync configuration file parsing (sitesync.toml).
//!
//! The rules file names the target bucket and carries per-path upload
//! directives. `[[path_specific]]` entries are matched as anchored regular
//! expressions against the relative path; when several entries match, their
//! directives merge with the last matching entry winning per directive.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Config file name, expected at the project root.
pub const CONFIG_FILE: &str = "sitesync.toml";

#[derive(Debug, Clone, Deserialize)]
struct RulesFile {
    aws: AwsRules,
    #[serde(default)]
    charset: Option<String>,
    #[serde(default)]
    preserve_deleted_files: bool,
    #[serde(default)]
    mimetype_overrides: BTreeMap<String, String>,
    #[serde(default)]
    path_specific: Vec<PathSpecific>,
}

/// Bucket coordinates for the project.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsRules {
    #[serde(default)]
    pub region_name: Option<String>,
    pub s3_bucket_name: String,
    #[serde(default)]
    pub s3_endpoint_url: Option<String>,
    #[serde(default)]
    pub s3_project_root: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PathSpecific {
    path: String,
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,
    #[serde(flatten)]
    directives: Directives,
}

/// Upload directives attached to a path rule. All fields optional; unset
/// fields fall back to computed defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Directives {
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(rename = "Content-Type", default)]
    pub content_type: Option<String>,
    #[serde(rename = "Cache-Control", default)]
    pub cache_control: Option<String>,
    #[serde(rename = "Content-Disposition", default)]
    pub content_disposition: Option<String>,
    #[serde(rename = "Content-Language", default)]
    pub content_language: Option<String>,
    #[serde(rename = "Content-Encoding", default)]
    pub content_encoding: Option<String>,
    #[serde(rename = "ACL", default)]
    pub acl: Option<String>,
    #[serde(rename = "StorageClass", default)]
    pub storage_class: Option<String>,
    #[serde(rename = "WebsiteRedirectLocation", default)]
    pub website_redirect_location: Option<String>,
    #[serde(rename = "S3Metadata", default)]
    pub s3_metadata: Option<BTreeMap<String, String>>,
}

impl Directives {
    /// Overlay another rule's directives onto this one. Set fields in
    /// `other` win; unset fields leave the current value alone.
    fn merge_from(&mut self, other: &Directives) {
        macro_rules! overlay {
            ($($field:ident),+ $(,)?) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })+
            };
        }
        overlay!(
            charset,
            content_type,
            cache_control,
            content_disposition,
            content_language,
            content_encoding,
            acl,
            storage_class,
            website_redirect_location,
            s3_metadata,
        );
    }
}

/// Loaded and compiled project rules.
#[derive(Debug, Clone)]
pub struct Rules {
    pub aws: AwsRules,
    pub charset: Option<String>,
    pub preserve_deleted_files: bool,
    pub mimetype_overrides: BTreeMap<String, String>,
    path_specific: Vec<(Regex, Directives)>,
}

impl Rules {
    /// Load `sitesync.toml` from a project root.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the file is missing, fails to parse, or
    /// contains an invalid path pattern.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config {
                    path: config_path.clone(),
                    reason: format!(
                        "not a sitesync project directory (no {CONFIG_FILE} found). \
                         Change to a project directory, pass one with \
                         -p/--projectdir, or create one with \"sitesync init\""
                    ),
                }
            } else {
                Error::Config {
                    path: config_path.clone(),
                    reason: e.to_string(),
                }
            }
        })?;
        Self::parse(&content, &config_path)
    }

    /// Parse rules from TOML text.
    ///
    /// # Errors
    /// Returns [`Error::Config`] on parse or pattern-compilation failure.
    pub fn parse(content: &str, config_path: &Path) -> Result<Self> {
        let file: RulesFile = toml::from_str(content).map_err(|e| Error::Config {
            path: config_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut path_specific = Vec::with_capacity(file.path_specific.len());
        for rule in file.path_specific {
            // Patterns match from the start of the path, as the config
            // examples assume.
            let anchored = format!("\\A(?:{})", rule.path);
            let matcher = Regex::new(&anchored).map_err(|e| Error::Config {
                path: config_path.to_path_buf(),
                reason: format!("invalid path pattern {:?}: {e}", rule.path),
            })?;
            path_specific.push((matcher, rule.directives));
        }

        Ok(Self {
            aws: file.aws,
            charset: file.charset,
            preserve_deleted_files: file.preserve_deleted_files,
            mimetype_overrides: file.mimetype_overrides,
            path_specific,
        })
    }

    /// Merged directives for one relative path.
    #[must_use]
    pub fn directives_for(&self, path: &str) -> Directives {
        let mut merged = Directives::default();
        for (matcher, directives) in &self.path_specific {
            if matcher.is_match(path) {
                merged.merge_from(directives);
            }
        }
        merged
    }

    /// The remote key prefix for this project, trimmed of surrounding
    /// slashes; `None` when the project sits at the bucket root.
    #[must_use]
    pub fn remote_prefix(&self) -> Option<&str> {
        let prefix = self.aws.s3_project_root.as_deref()?.trim_matches('/');
        if prefix.is_empty() {
            None
        } else {
            Some(prefix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Rules {
        Rules::parse(content, Path::new("sitesync.toml")).unwrap()
    }

    #[test]
    fn test_parse_minimal_config() {
        let rules = parse(
            r#"
[aws]
s3_bucket_name = 'www.test.com'
"#,
        );
        assert_eq!(rules.aws.s3_bucket_name, "www.test.com");
        assert!(rules.aws.region_name.is_none());
        assert!(!rules.preserve_deleted_files);
        assert!(rules.remote_prefix().is_none());
    }

    #[test]
    fn test_remote_prefix_trimmed() {
        let rules = parse(
            r#"
[aws]
s3_bucket_name = 'www.test.com'
s3_project_root = '/staging/'
"#,
        );
        assert_eq!(rules.remote_prefix(), Some("staging"));
    }

    #[test]
    fn test_empty_project_root_is_no_prefix() {
        let rules = parse(
            r#"
[aws]
s3_bucket_name = 'www.test.com'
s3_project_root = ''
"#,
        );
        assert!(rules.remote_prefix().is_none());
    }

    #[test]
    fn test_path_specific_last_match_wins_per_directive() {
        let rules = parse(
            r#"
[aws]
s3_bucket_name = 'www.test.com'

[[path_specific]]
path = '^.*$'
Cache-Control = 'max-age=60'
ACL = 'public-read'

[[path_specific]]
path = '^downloads/'
Cache-Control = 'max-age=120'
Content-Disposition = 'attachment'
"#,
        );

        let general = rules.directives_for("index.html");
        assert_eq!(general.cache_control.as_deref(), Some("max-age=60"));
        assert!(general.content_disposition.is_none());

        let download = rules.directives_for("downloads/paper.pdf");
        assert_eq!(download.cache_control.as_deref(), Some("max-age=120"));
        assert_eq!(download.content_disposition.as_deref(), Some("attachment"));
        // Directives from earlier matching rules are kept when the later
        // rule does not set them.
        assert_eq!(download.acl.as_deref(), Some("public-read"));
    }

    #[test]
    fn test_path_patterns_anchored_at_start() {
        let rules = parse(
            r#"
[aws]
s3_bucket_name = 'www.test.com'

[[path_specific]]
path = 'assets/'
Cache-Control = 'max-age=3600'
"#,
        );
        assert!(rules
            .directives_for("assets/logo.png")
            .cache_control
            .is_some());
        assert!(rules
            .directives_for("deep/assets/logo.png")
            .cache_control
            .is_none());
    }

    #[test]
    fn test_mimetype_overrides_and_charset() {
        let rules = parse(
            r#"
charset = 'iso-8859-1'

[aws]
s3_bucket_name = 'www.test.com'

[mimetype_overrides]
'.woff2' = 'font/woff2'
"#,
        );
        assert_eq!(
            rules.mimetype_overrides.get(".woff2").map(String::as_str),
            Some("font/woff2")
        );
        assert_eq!(rules.charset.as_deref(), Some("iso-8859-1"));
    }

    #[test]
    fn test_s3_metadata_table() {
        let rules = parse(
            r#"
[aws]
s3_bucket_name = 'www.test.com'

[[path_specific]]
path = '^index.html$'
[path_specific.S3Metadata]
owner = 'web-team'
"#,
        );
        let directives = rules.directives_for("index.html");
        let metadata = directives.s3_metadata.unwrap();
        assert_eq!(metadata.get("owner").map(String::as_str), Some("web-team"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = Rules::parse(
            r#"
[aws]
s3_bucket_name = 'www.test.com'

[[path_specific]]
path = '('
"#,
            Path::new("sitesync.toml"),
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_unknown_aws_key_rejected() {
        let result = Rules::parse(
            r#"
[aws]
s3_bucket_name = 'www.test.com'
bucket = 'typo'
"#,
            Path::new("sitesync.toml"),
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_has_project_hint() {
        let dir = tempfile::tempdir().unwrap();
        match Rules::load(dir.path()) {
            Err(Error::Config { reason, .. }) => {
                assert!(reason.contains("sitesync init"), "{reason}");
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_preserve_deleted_files_flag() {
        let rules = parse(
            r#"
preserve_deleted_files = true

[aws]
s3_bucket_name = 'www.test.com'
"#,
        );
        assert!(rules.preserve_deleted_files);
    }
}
