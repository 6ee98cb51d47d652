//! Kubernetes changelog mining.
//!
//! A changelog is split into sections at Markdown headings. Sections whose
//! heading talks about deprecations, removals, breaking changes or API changes
//! contribute their bullet lines, sorted into four buckets.

use kupa_domain::ChangeKind;

/// Heading fragments that mark a section as relevant (matched lowercase).
const RELEVANT_HEADINGS: &[&str] = &["deprecat", "breaking", "removal", "api change"];

/// The four buckets, in the order the documentation oracle consults them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogBucket {
    ApiChanges,
    Deprecations,
    Removals,
    OtherChanges,
}

impl ChangelogBucket {
    pub const ALL: [ChangelogBucket; 4] = [
        ChangelogBucket::ApiChanges,
        ChangelogBucket::Deprecations,
        ChangelogBucket::Removals,
        ChangelogBucket::OtherChanges,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangelogBucket::ApiChanges => "api_changes",
            ChangelogBucket::Deprecations => "deprecations",
            ChangelogBucket::Removals => "removals",
            ChangelogBucket::OtherChanges => "other_changes",
        }
    }

    /// Bucket name upper-cased with the plural `S` dropped (`API_CHANGE`).
    pub fn change_kind(&self) -> ChangeKind {
        let tag = self.as_str().to_ascii_uppercase();
        ChangeKind::from_tag(tag.trim_end_matches('S'))
    }

    /// Bucket for one bullet. `API`/`apiVersion` are matched case-sensitively
    /// and win over everything else.
    pub fn classify(bullet: &str) -> Self {
        if bullet.contains("API") || bullet.contains("apiVersion") {
            return ChangelogBucket::ApiChanges;
        }
        let lower = bullet.to_lowercase();
        if lower.contains("deprecat") {
            ChangelogBucket::Deprecations
        } else if lower.contains("remov") {
            ChangelogBucket::Removals
        } else {
            ChangelogBucket::OtherChanges
        }
    }
}

/// Bullets of one changelog, bucketed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangelogDigest {
    pub api_changes: Vec<String>,
    pub deprecations: Vec<String>,
    pub removals: Vec<String>,
    pub other_changes: Vec<String>,
}

impl ChangelogDigest {
    pub fn bucket(&self, bucket: ChangelogBucket) -> &[String] {
        match bucket {
            ChangelogBucket::ApiChanges => &self.api_changes,
            ChangelogBucket::Deprecations => &self.deprecations,
            ChangelogBucket::Removals => &self.removals,
            ChangelogBucket::OtherChanges => &self.other_changes,
        }
    }

    fn push(&mut self, bullet: String) {
        let target = match ChangelogBucket::classify(&bullet) {
            ChangelogBucket::ApiChanges => &mut self.api_changes,
            ChangelogBucket::Deprecations => &mut self.deprecations,
            ChangelogBucket::Removals => &mut self.removals,
            ChangelogBucket::OtherChanges => &mut self.other_changes,
        };
        target.push(bullet);
    }

    pub fn is_empty(&self) -> bool {
        ChangelogBucket::ALL
            .iter()
            .all(|bucket| self.bucket(*bucket).is_empty())
    }

    pub fn len(&self) -> usize {
        ChangelogBucket::ALL
            .iter()
            .map(|bucket| self.bucket(*bucket).len())
            .sum()
    }
}

/// Bucket the bullets of every relevant section.
pub fn parse_changelog(text: &str) -> ChangelogDigest {
    let mut digest = ChangelogDigest::default();
    let mut relevant = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(heading) = heading_text(trimmed) {
            let heading = heading.to_lowercase();
            relevant = RELEVANT_HEADINGS.iter().any(|term| heading.contains(term));
            continue;
        }
        if !relevant {
            continue;
        }
        if let Some(bullet) = bullet_text(trimmed) {
            digest.push(bullet.to_string());
        }
    }

    digest
}

/// Text of a Markdown ATX heading (`## Deprecation`), if the line is one.
fn heading_text(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches('#');
    if rest.len() == line.len() || !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

fn bullet_text(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('*').or_else(|| line.strip_prefix('-'))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGELOG: &str = "\
# v1.25.0

## Changelog since v1.24.0

- Fixed a crash in kubelet when the node restarts

### Deprecation

- The `extensions/v1beta1` apiVersion of Ingress is no longer served, use networking.k8s.io/v1.
* PodSecurityPolicy is deprecated and will be removed
- kube-proxy flag --cleanup-ipvs is deprecated

### Removals
- Removed the in-tree GlusterFS volume plugin
- Dropped support for the `--foo` flag

### Feature
- Added a shiny new thing
";

    #[test]
    fn test_only_relevant_sections_contribute() {
        let digest = parse_changelog(CHANGELOG);
        assert_eq!(digest.len(), 5);
        let all: Vec<&String> = ChangelogBucket::ALL
            .iter()
            .flat_map(|b| digest.bucket(*b))
            .collect();
        assert!(!all.iter().any(|b| b.contains("kubelet")));
        assert!(!all.iter().any(|b| b.contains("shiny")));
    }

    #[test]
    fn test_bullet_classification_precedence() {
        let digest = parse_changelog(CHANGELOG);
        assert_eq!(digest.api_changes.len(), 1);
        assert!(digest.api_changes[0].starts_with("The `extensions/v1beta1` apiVersion"));
        assert_eq!(
            digest.deprecations,
            vec![
                "PodSecurityPolicy is deprecated and will be removed",
                "kube-proxy flag --cleanup-ipvs is deprecated",
            ]
        );
        assert_eq!(digest.removals, vec!["Removed the in-tree GlusterFS volume plugin"]);
        assert_eq!(digest.other_changes, vec!["Dropped support for the `--foo` flag"]);
    }

    #[test]
    fn test_api_match_is_case_sensitive() {
        assert_eq!(
            ChangelogBucket::classify("The api server was removed"),
            ChangelogBucket::Removals
        );
        assert_eq!(
            ChangelogBucket::classify("Deprecated the old API"),
            ChangelogBucket::ApiChanges
        );
    }

    #[test]
    fn test_bucket_change_kinds() {
        let tags: Vec<String> = ChangelogBucket::ALL
            .iter()
            .map(|b| b.change_kind().to_string())
            .collect();
        assert_eq!(tags, vec!["API_CHANGE", "DEPRECATION", "REMOVAL", "OTHER_CHANGE"]);
    }

    #[test]
    fn test_non_headings_and_non_bullets_are_ignored() {
        let text = "#hashtag deprecation\n- not collected\n## Breaking Changes\n-no-space\n- kept\n";
        let digest = parse_changelog(text);
        assert_eq!(digest.other_changes, vec!["kept"]);
        assert!(parse_changelog("").is_empty());
    }
}
