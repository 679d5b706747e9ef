//! Post-action redirect resolution.
//!
//! # Responsibility
//! - Decide whether a caller-supplied return URL stays on this site.
//! - Build canonical record URLs used as the fallback destination.
//!
//! # Invariants
//! - An unsafe or unparsable candidate is never an error; it is replaced by
//!   the fallback.
//! - A candidate is returned verbatim when accepted.

use crate::model::record::Record;
use crate::model::xref::TreeName;
use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*):)?(?://(?:(?P<user>[^@/?#]*)@)?(?P<host>\[[^\]]*\]|[^:/?#]*)(?::(?P<port>[0-9]*))?)?(?P<path>[^?#]*)(?:\?[^#]*)?(?:#.*)?$",
    )
    .expect("valid url regex")
});
static SLUG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid slug regex"));

const DEFAULT_SCHEME: &str = "http";
const DEFAULT_PATH: &str = "/";

/// HTTP redirect produced at the end of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: u16,
}

impl Redirect {
    /// `302 Found` redirect to `location`.
    pub fn found(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            status: 302,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct UrlParts {
    scheme: String,
    user: String,
    host: String,
    port: String,
    path: String,
}

fn split_url(value: &str) -> Option<UrlParts> {
    if value.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
        return None;
    }
    let caps = URL_RE.captures(value)?;
    let group = |name: &str| caps.name(name).map(|m| m.as_str());
    let path = group("path").filter(|path| !path.is_empty());

    Some(UrlParts {
        scheme: group("scheme")
            .unwrap_or(DEFAULT_SCHEME)
            .to_ascii_lowercase(),
        user: group("user").unwrap_or_default().to_string(),
        host: group("host").unwrap_or_default().to_ascii_lowercase(),
        port: group("port").unwrap_or_default().to_string(),
        path: path.unwrap_or(DEFAULT_PATH).to_string(),
    })
}

/// Returns whether `candidate` points inside the site rooted at `base_url`.
///
/// Scheme, user info, host and port must match (missing scheme counts as
/// `http`, missing path as `/`), and the candidate path must be the base
/// path or lie beneath it.
pub fn is_local_url(candidate: &str, base_url: &str) -> bool {
    let Some(base) = split_url(base_url.trim()) else {
        return false;
    };
    let Some(target) = split_url(candidate) else {
        return false;
    };

    target.scheme == base.scheme
        && target.user == base.user
        && target.host == base.host
        && target.port == base.port
        && path_within(&target.path, &base.path)
}

fn path_within(path: &str, base_path: &str) -> bool {
    if path == base_path || (base_path.ends_with('/') && path.starts_with(base_path)) {
        return true;
    }
    path.strip_prefix(base_path)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Picks the accepted candidate, or `fallback_url` when the candidate is
/// absent, blank or not local.
pub fn resolve_destination(candidate: Option<&str>, base_url: &str, fallback_url: &str) -> String {
    match candidate {
        Some(url) if !url.trim().is_empty() && is_local_url(url, base_url) => url.to_string(),
        _ => fallback_url.to_string(),
    }
}

/// Canonical page URL for an individual:
/// `{base}/tree/{tree}/individual/{xref}/{slug}`.
pub fn canonical_individual_url(base_url: &str, tree: &TreeName, individual: &Record) -> String {
    let mut url = format!(
        "{}/tree/{}/individual/{}",
        base_url.trim().trim_end_matches('/'),
        tree,
        individual.xref
    );
    if let Some(slug) = individual.display_name().map(|name| slugify(&name)) {
        if !slug.is_empty() {
            url.push('/');
            url.push_str(&slug);
        }
    }
    url
}

fn slugify(value: &str) -> String {
    SLUG_SEPARATOR_RE
        .replace_all(value, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{canonical_individual_url, is_local_url, resolve_destination, slugify, Redirect};
    use crate::model::fact::{FactLine, Tag};
    use crate::model::record::{Fact, Record, RecordKind};
    use crate::model::xref::{TreeName, Xref};

    const BASE: &str = "https://family.example.org/site";

    #[test]
    fn accepts_urls_under_base_path() {
        assert!(is_local_url("https://family.example.org/site", BASE));
        assert!(is_local_url(
            "https://family.example.org/site/tree/demo/family/F1?x=1#top",
            BASE
        ));
        assert!(is_local_url("HTTPS://Family.Example.org/site/", BASE));
    }

    #[test]
    fn rejects_other_origins() {
        assert!(!is_local_url("https://evil.example.com/site", BASE));
        assert!(!is_local_url("http://family.example.org/site", BASE));
        assert!(!is_local_url("https://family.example.org:8443/site", BASE));
        assert!(!is_local_url("https://family.example.org@evil.example.com/site", BASE));
        assert!(!is_local_url("//evil.example.com/site", BASE));
        assert!(!is_local_url("javascript:alert(1)", BASE));
    }

    #[test]
    fn rejects_sibling_paths_and_relative_urls() {
        assert!(!is_local_url("https://family.example.org/site-admin", BASE));
        assert!(!is_local_url("https://family.example.org/", BASE));
        assert!(!is_local_url("/site/tree/demo", BASE));
        assert!(!is_local_url("https://family.example.org/site/\nx", BASE));
    }

    #[test]
    fn host_root_base_accepts_any_path() {
        assert!(is_local_url("https://family.example.org/anything", "https://family.example.org"));
        assert!(is_local_url("https://family.example.org", "https://family.example.org/"));
    }

    #[test]
    fn resolve_destination_falls_back_silently() {
        let fallback = "https://family.example.org/site/tree/demo/individual/I2";
        let local = "https://family.example.org/site/tree/demo/individual/I1";
        assert_eq!(resolve_destination(Some(local), BASE, fallback), local);
        assert_eq!(resolve_destination(None, BASE, fallback), fallback);
        assert_eq!(resolve_destination(Some("  "), BASE, fallback), fallback);
        assert_eq!(
            resolve_destination(Some("https://evil.example.com/"), BASE, fallback),
            fallback
        );
        assert_eq!(resolve_destination(Some(local), "not a url", fallback), fallback);
    }

    #[test]
    fn canonical_url_includes_name_slug() {
        let tree = TreeName::parse("demo").expect("tree");
        let mut person = Record {
            tree: tree.clone(),
            xref: Xref::parse("I7").expect("xref"),
            kind: RecordKind::Individual,
            facts: vec![Fact {
                seq: 0,
                line: FactLine::new(1, Tag::parse("NAME").expect("tag"), "Ada /King-Lovelace/"),
            }],
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(
            canonical_individual_url("https://family.example.org/site/", &tree, &person),
            "https://family.example.org/site/tree/demo/individual/I7/Ada-King-Lovelace"
        );

        person.facts.clear();
        assert_eq!(
            canonical_individual_url(BASE, &tree, &person),
            "https://family.example.org/site/tree/demo/individual/I7"
        );
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Jean-Luc  O'Brien "), "Jean-Luc-O-Brien");
        assert_eq!(slugify("***"), "");
        assert_eq!(Redirect::found("/x").status, 302);
    }
}
