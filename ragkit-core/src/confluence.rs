//! Confluence ingestion
//!
//! Spaces are configured through parallel comma-separated `CONFLUENCE_*`
//! environment lists, materialized here as one record per space. The
//! loader runs all configured spaces through the regular source pipeline
//! in the background; only one load may run at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info};

use crate::error::{Error, Result};
use crate::piece::KeyValuePair;
use crate::settings::{env_var, parse_bool};
use crate::upload::SourceUploader;

/// Source type tag for confluence uploads
const CONFLUENCE_SOURCE_TYPE: &str = "confluence";

/// Configuration of one Confluence space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfluenceSpace {
    /// Base URL of the Confluence instance
    pub url: String,
    /// API token
    pub token: String,
    /// Space key to load
    pub space_key: String,
    /// Display name override; the space key when empty
    pub document_name: String,
    /// Whether to verify TLS certificates
    pub verify_ssl: bool,
    /// Whether to include attachments
    pub include_attachments: bool,
    /// Whether to keep markdown formatting
    pub keep_markdown_format: bool,
    /// Whether to keep newlines
    pub keep_newlines: bool,
    /// Page limit; 0 means no limit
    pub max_pages: u32,
}

impl ConfluenceSpace {
    /// Name the resulting source is registered under
    pub fn display_name(&self) -> &str {
        if self.document_name.is_empty() {
            &self.space_key
        } else {
            &self.document_name
        }
    }

    /// Extractor parameters for this space
    pub fn kwargs(&self) -> Result<Vec<KeyValuePair>> {
        Ok(vec![
            KeyValuePair::encode("url", &self.url)?,
            KeyValuePair::encode("token", &self.token)?,
            KeyValuePair::encode("space_key", &self.space_key)?,
            KeyValuePair::encode("verify_ssl", &self.verify_ssl)?,
            KeyValuePair::encode("include_attachments", &self.include_attachments)?,
            KeyValuePair::encode("keep_markdown_format", &self.keep_markdown_format)?,
            KeyValuePair::encode("keep_newlines", &self.keep_newlines)?,
            KeyValuePair::encode("max_pages", &self.max_pages)?,
        ])
    }
}

/// All configured Confluence spaces
#[derive(Debug, Clone, Default)]
pub struct ConfluenceSettings {
    /// One record per configured space
    pub spaces: Vec<ConfluenceSpace>,
}

impl ConfluenceSettings {
    /// Load from `CONFLUENCE_*` environment variables.
    ///
    /// `url`, `token` and `space_key` must have the same number of entries;
    /// the optional lists are either empty (defaults apply) or equally long.
    pub fn from_env() -> Result<Self> {
        let urls = split_list(env_var("CONFLUENCE_URL"));
        let tokens = split_list(env_var("CONFLUENCE_TOKEN"));
        let space_keys = split_list(env_var("CONFLUENCE_SPACE_KEY"));

        if urls.is_empty() {
            return Ok(Self::default());
        }
        let n = urls.len();
        for (key, list) in [
            ("CONFLUENCE_TOKEN", &tokens),
            ("CONFLUENCE_SPACE_KEY", &space_keys),
        ] {
            if list.len() != n {
                return Err(Error::validation(format!(
                    "confluence settings length mismatch: expected {} entries in {}, got {}",
                    n,
                    key,
                    list.len()
                )));
            }
        }

        let document_names = optional_list("CONFLUENCE_DOCUMENT_NAME", n, String::new(), |v| {
            Some(v.to_string())
        })?;
        let verify_ssl = optional_list("CONFLUENCE_VERIFY_SSL", n, true, parse_bool)?;
        let include_attachments =
            optional_list("CONFLUENCE_INCLUDE_ATTACHMENTS", n, false, parse_bool)?;
        let keep_markdown_format =
            optional_list("CONFLUENCE_KEEP_MARKDOWN_FORMAT", n, true, parse_bool)?;
        let keep_newlines = optional_list("CONFLUENCE_KEEP_NEWLINES", n, true, parse_bool)?;
        let max_pages = optional_list("CONFLUENCE_MAX_PAGES", n, 0u32, |v| v.parse().ok())?;

        let spaces = (0..n)
            .map(|i| ConfluenceSpace {
                url: urls[i].clone(),
                token: tokens[i].clone(),
                space_key: space_keys[i].clone(),
                document_name: document_names[i].clone(),
                verify_ssl: verify_ssl[i],
                include_attachments: include_attachments[i],
                keep_markdown_format: keep_markdown_format[i],
                keep_newlines: keep_newlines[i],
                max_pages: max_pages[i],
            })
            .collect();

        Ok(Self { spaces })
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}

/// Parse an optional parallel list: absent means `default` everywhere,
/// present means one parseable entry per configured space
fn optional_list<T: Clone>(
    key: &str,
    n: usize,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>> {
    let raw = split_list(env_var(key));
    if raw.is_empty() {
        return Ok(vec![default; n]);
    }
    if raw.len() != n {
        return Err(Error::validation(format!(
            "confluence settings length mismatch: expected {} entries in {}, got {}",
            n,
            key,
            raw.len()
        )));
    }
    raw.iter()
        .map(|v| {
            if v.is_empty() {
                Ok(default.clone())
            } else {
                parse(v).ok_or_else(|| {
                    Error::validation(format!("invalid value '{}' in {}", v, key))
                })
            }
        })
        .collect()
}

/// Background loader for all configured spaces
pub struct ConfluenceLoader {
    uploader: Arc<SourceUploader>,
    settings: ConfluenceSettings,
    running: Arc<AtomicBool>,
}

impl ConfluenceLoader {
    /// Create a loader over the shared source uploader
    pub fn new(uploader: Arc<SourceUploader>, settings: ConfluenceSettings) -> Self {
        Self {
            uploader,
            settings,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start loading every configured space in the background.
    ///
    /// Fails when no space is configured or when a load is still running;
    /// otherwise returns as soon as the work is scheduled. Each space task
    /// owns its settings record.
    pub async fn load(&self, base_url: &str) -> Result<()> {
        if self.settings.spaces.is_empty() {
            return Err(Error::unconfigured("no confluence spaces configured"));
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::locked("a confluence load is already running"));
        }

        info!(spaces = self.settings.spaces.len(), "starting confluence load");
        let uploader = Arc::clone(&self.uploader);
        let running = Arc::clone(&self.running);
        let spaces = self.settings.spaces.clone();
        let base_url = base_url.to_string();

        tokio::spawn(async move {
            let jobs = spaces.into_iter().map(|space| {
                let uploader = Arc::clone(&uploader);
                let base_url = base_url.clone();
                async move {
                    let name = space.display_name().to_string();
                    let kwargs = match space.kwargs() {
                        Ok(kwargs) => kwargs,
                        Err(e) => {
                            error!(space = %name, error = %e, "invalid confluence space settings");
                            return;
                        }
                    };
                    if let Err(e) = uploader
                        .upload_source(&base_url, CONFLUENCE_SOURCE_TYPE, &name, kwargs, None)
                        .await
                    {
                        error!(space = %name, error = %e, "confluence space load failed");
                    }
                }
            });
            futures::future::join_all(jobs).await;
            running.store(false, Ordering::SeqCst);
            info!("confluence load finished");
        });

        Ok(())
    }

    /// Whether a load is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
