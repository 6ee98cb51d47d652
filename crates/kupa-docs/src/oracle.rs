//! Documentation oracle.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use kupa_domain::{ChangeKind, KubeVersion, Oracle, OracleResponse, Resource};

use crate::api_reference::{scan_api_reference, ApiVersionInfo};
use crate::changelog::{parse_changelog, ChangelogBucket, ChangelogDigest};
use crate::config::DocsConfig;
use crate::fetch::TextFetcher;

const DEFAULT_CHANGELOG_ACTION: &str = "Check documentation for the new format";

/// Oracle backed by the published changelog and API reference.
///
/// Fetched documents are cached for the lifetime of the oracle: one changelog
/// per target version and one reference page, however many resources ask.
pub struct DocsOracle<F> {
    fetcher: F,
    config: DocsConfig,
    changelogs: Mutex<HashMap<String, Option<Arc<ChangelogDigest>>>>,
    reference: OnceCell<Option<Arc<str>>>,
}

impl<F: TextFetcher> DocsOracle<F> {
    pub fn new(fetcher: F, config: DocsConfig) -> Self {
        Self {
            fetcher,
            config,
            changelogs: Mutex::new(HashMap::new()),
            reference: OnceCell::new(),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Bucketed changelog for the target, from the first template that fetches.
    pub async fn changelog(&self, target: &KubeVersion) -> Option<Arc<ChangelogDigest>> {
        // Held across the fetch so concurrent lookups share one download.
        let mut cache = self.changelogs.lock().await;
        if let Some(cached) = cache.get(target.numeric()) {
            return cached.clone();
        }

        let mut digest = None;
        for url in self.config.changelog_urls(target) {
            match self.fetcher.fetch(&url).await {
                Ok(text) => {
                    let parsed = parse_changelog(&text);
                    debug!(url = %url, bullets = parsed.len(), "Parsed changelog");
                    digest = Some(Arc::new(parsed));
                    break;
                }
                Err(e) => debug!(url = %url, error = %e, "Changelog candidate unavailable"),
            }
        }
        if digest.is_none() {
            warn!(version = %target, "Could not fetch changelog");
        }

        cache.insert(target.numeric().to_string(), digest.clone());
        digest
    }

    /// Raw HTML of the API reference page.
    pub async fn api_reference(&self) -> Option<Arc<str>> {
        self.reference
            .get_or_init(|| async {
                let url = &self.config.api_reference_url;
                match self.fetcher.fetch(url).await {
                    Ok(html) => Some(Arc::from(html)),
                    Err(e) => {
                        warn!(url = %url, error = %e, "Could not fetch API reference");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    /// Everything the documentation says about one resource.
    pub async fn lookup(&self, resource: &Resource, target: &KubeVersion) -> OracleResponse {
        info!(resource = %resource, target = %target, "Checking documentation");

        let changelog = self.changelog(target).await;
        let api_info = match self.api_reference().await {
            Some(html) => match scan_api_reference(&html, &resource.kind) {
                Ok(info) => info,
                Err(e) => {
                    warn!(error = %e, "Could not scan API reference");
                    None
                }
            },
            None => None,
        };

        assemble_verdict(resource, api_info.as_ref(), changelog.as_deref())
    }
}

#[async_trait]
impl<F: TextFetcher> Oracle for DocsOracle<F> {
    fn name(&self) -> &str {
        "docs"
    }

    async fn consult(&self, resource: &Resource, target: &KubeVersion) -> OracleResponse {
        self.lookup(resource, target).await
    }
}

/// Combine the API reference and changelog findings for one resource.
///
/// The reference check runs first; a changelog match overwrites it. Within
/// the changelog each bucket contributes at most its first matching bullet,
/// and later buckets overwrite earlier ones.
pub fn assemble_verdict(
    resource: &Resource,
    api_info: Option<&ApiVersionInfo>,
    changelog: Option<&ChangelogDigest>,
) -> OracleResponse {
    let mut found: Option<(ChangeKind, String, String)> = None;
    let mut fixed_api_version: Option<String> = None;

    if let Some(info) = api_info.filter(|info| info.is_deprecated(&resource.api_version)) {
        let action = match &info.replacement {
            Some(replacement) => format!("Use {replacement} instead"),
            None => "Update to a supported version".to_string(),
        };
        found = Some((
            ChangeKind::ApiDeprecated,
            format!("API version {} is deprecated", resource.api_version),
            action,
        ));
        fixed_api_version = info.replacement.clone();
    }

    if let Some(digest) = changelog {
        let kind = resource.kind.to_lowercase();
        let api_version = resource.api_version.to_lowercase();
        for bucket in ChangelogBucket::ALL {
            let Some(bullet) = digest.bucket(bucket).iter().find(|bullet| {
                let lower = bullet.to_lowercase();
                lower.contains(&kind) || lower.contains(&api_version)
            }) else {
                continue;
            };
            found = Some((
                bucket.change_kind(),
                bullet.clone(),
                recommended_action(bullet),
            ));
            if let Some(version) = replacement_api_version(bullet, &resource.api_version) {
                fixed_api_version = Some(version);
            }
        }
    }

    match found {
        Some((kind, description, action)) => {
            let fixed = fixed_api_version.map(|v| resource.body_with_api_version(&v));
            OracleResponse::breaking(kind, description, action, fixed)
        }
        None => OracleResponse::no_change(),
    }
}

/// `Use <x>` from a "use <x>" phrase in the bullet.
fn recommended_action(bullet: &str) -> String {
    static USE_PHRASE: OnceLock<Option<Regex>> = OnceLock::new();
    USE_PHRASE
        .get_or_init(|| Regex::new(r"(?i)\buse\s+([^\s,;]+)").ok())
        .as_ref()
        .and_then(|re| re.captures(bullet))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches(|c: char| matches!(c, '`' | '.' | ')' | '(' | '"')))
        .filter(|target| !target.is_empty())
        .map(|target| format!("Use {target}"))
        .unwrap_or_else(|| DEFAULT_CHANGELOG_ACTION.to_string())
}

/// First `group/vN` token in the bullet that is not the current apiVersion.
fn replacement_api_version(bullet: &str, current: &str) -> Option<String> {
    static GROUP_VERSION: OnceLock<Option<Regex>> = OnceLock::new();
    GROUP_VERSION
        .get_or_init(|| Regex::new(r"[A-Za-z0-9.\-]+/v[0-9][0-9A-Za-z]*").ok())
        .as_ref()?
        .find_iter(bullet)
        .map(|m| m.as_str().trim_end_matches('.'))
        .find(|token| !token.eq_ignore_ascii_case(current))
        .map(str::to_string)
}
