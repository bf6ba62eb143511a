//! Repository URL handling
//!
//! Three concerns live here:
//!
//! - **Detection**: [`SchemeConfig`] holds the rules mapping a url to a
//!   [`VcsKind`]. Explicit rules (`git+`, `hg+`, `svn+`, `git://`, `svn://`)
//!   settle the question on their own; the others (a `.git` suffix, scp-style
//!   `user@host:path`) are only hints.
//! - **pip-style urls**: `git+https://host/repo.git@v1.0` splits into the
//!   url git understands and a revision, see [`convert_pip_url`].
//! - **Normalization**: [`chomp_protocol`] strips the VCS prefix and any
//!   revision before a url is handed to the binary or compared with what the
//!   binary reports.
//!
//! The configuration is an ordinary value passed to each call. Nothing is
//! registered process-wide.
//!
//! ```rust
//! use vcsync::sync::VcsKind;
//! use vcsync::url::{SchemeConfig, convert_pip_url};
//!
//! let config = SchemeConfig::default();
//! assert_eq!(config.detect("git+https://github.com/vcs-python/libvcs", true), vec![VcsKind::Git]);
//!
//! let location = convert_pip_url("git+https://github.com/vcs-python/libvcs@v0.13.0", &config)?;
//! assert_eq!(location.url, "https://github.com/vcs-python/libvcs");
//! assert_eq!(location.rev.as_deref(), Some("v0.13.0"));
//! # Ok::<(), vcsync::core::VcsError>(())
//! ```

use regex::Regex;

use crate::core::{Result, VcsError};
use crate::sync::VcsKind;

/// One url pattern that points at a VCS.
#[derive(Debug, Clone)]
pub struct SchemeRule {
    pub vcs: VcsKind,
    /// Short description, e.g. `"git+ prefix"`
    pub label: &'static str,
    pub pattern: Regex,
    /// Whether a match alone is enough to pick `vcs`
    pub is_explicit: bool,
}

impl SchemeRule {
    /// # Errors
    ///
    /// [`VcsError::Config`] for an invalid pattern.
    pub fn new(vcs: VcsKind, label: &'static str, pattern: &str, is_explicit: bool) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| VcsError::Config {
            message: format!("invalid url pattern '{pattern}': {e}"),
        })?;
        Ok(Self {
            vcs,
            label,
            pattern,
            is_explicit,
        })
    }
}

/// Url detection rules and the `<vcs>+<scheme>` forms accepted in pip-style urls.
#[derive(Debug, Clone)]
pub struct SchemeConfig {
    rules: Vec<SchemeRule>,
    pip_schemes: Vec<String>,
}

const BUILTIN_RULES: &[(VcsKind, &str, &str, bool)] = &[
    (VcsKind::Git, "git+ prefix", r"^git\+", true),
    (VcsKind::Git, "git protocol", r"^git://", true),
    (VcsKind::Git, ".git suffix", r"^(https?|file|ssh)://.+\.git/?$", false),
    (VcsKind::Git, "scp-style", r"^[\w.-]+@[\w.-]+:[^/].*$", false),
    (VcsKind::Hg, "hg+ prefix", r"^hg\+", true),
    (VcsKind::Svn, "svn+ prefix", r"^svn\+", true),
    (VcsKind::Svn, "svn protocol", r"^svn://", true),
];

const BUILTIN_PIP_SCHEMES: &[&str] = &[
    "git+http",
    "git+https",
    "git+ssh",
    "git+git",
    "git+file",
    "hg+http",
    "hg+https",
    "hg+ssh",
    "hg+static-http",
    "hg+file",
    "svn+http",
    "svn+https",
    "svn+ssh",
    "svn+svn",
    "svn+file",
];

impl Default for SchemeConfig {
    fn default() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .filter_map(|(vcs, label, pattern, explicit)| {
                SchemeRule::new(*vcs, label, pattern, *explicit).ok()
            })
            .collect();
        Self {
            rules,
            pip_schemes: BUILTIN_PIP_SCHEMES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SchemeConfig {
    /// A configuration with no rules and no pip schemes.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            rules: Vec::new(),
            pip_schemes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: SchemeRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Accept `scheme` (e.g. `"git+gitlab"`) in pip-style urls.
    #[must_use]
    pub fn with_pip_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.pip_schemes.push(scheme.into());
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[SchemeRule] {
        &self.rules
    }

    /// Distinct VCS kinds whose rules match `url`, in rule order.
    #[must_use]
    pub fn detect(&self, url: &str, explicit_only: bool) -> Vec<VcsKind> {
        let mut found = Vec::new();
        for rule in &self.rules {
            if (rule.is_explicit || !explicit_only)
                && rule.pattern.is_match(url)
                && !found.contains(&rule.vcs)
            {
                found.push(rule.vcs);
            }
        }
        found
    }

    /// Pick the one VCS for `url`.
    ///
    /// Explicit rules are tried first; only when none match are the hints
    /// consulted.
    ///
    /// # Errors
    ///
    /// [`VcsError::NoVcsForUrl`] when nothing matches and
    /// [`VcsError::MultipleVcsForUrl`] when the match is ambiguous.
    pub fn detect_one(&self, url: &str) -> Result<VcsKind> {
        let mut found = self.detect(url, true);
        if found.is_empty() {
            found = self.detect(url, false);
        }
        match found.as_slice() {
            [] => Err(VcsError::NoVcsForUrl {
                url: url.to_string(),
            }),
            [vcs] => Ok(*vcs),
            _ => Err(VcsError::MultipleVcsForUrl {
                url: url.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn accepts_pip_scheme(&self, scheme: &str) -> bool {
        self.pip_schemes.iter().any(|known| known == scheme)
    }
}

/// A url the VCS binary accepts, plus the revision split off a pip-style url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsLocation {
    pub url: String,
    pub rev: Option<String>,
}

/// Pieces of `scheme://netloc/path?query#fragment`.
#[derive(Debug, Default, PartialEq, Eq)]
struct UrlParts<'a> {
    scheme: &'a str,
    netloc: &'a str,
    path: &'a str,
    query: &'a str,
}

impl<'a> UrlParts<'a> {
    /// Split `url`, dropping any fragment.
    fn split(url: &'a str) -> Self {
        let url = url.split_once('#').map_or(url, |(before, _)| before);
        let (url, query) = url.split_once('?').unwrap_or((url, ""));
        match url.split_once("://") {
            Some((scheme, rest)) => {
                let (netloc, path) = rest.find('/').map_or((rest, ""), |at| rest.split_at(at));
                Self {
                    scheme,
                    netloc,
                    path,
                    query,
                }
            }
            None => Self {
                path: url,
                query,
                ..Self::default()
            },
        }
    }

    /// Remove a trailing `@rev` from the path.
    fn take_rev(&mut self) -> Option<String> {
        let (path, rev) = self.path.rsplit_once('@')?;
        self.path = path;
        Some(rev.to_string())
    }

    fn join(&self) -> String {
        let mut url = String::new();
        if !self.scheme.is_empty() {
            url.push_str(self.scheme);
            url.push_str("://");
        }
        url.push_str(self.netloc);
        url.push_str(self.path);
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(self.query);
        }
        url
    }
}

/// Split `url@rev` into url and revision, keeping the url's own scheme.
fn split_rev(url: &str) -> VcsLocation {
    let mut parts = UrlParts::split(url);
    let rev = parts.take_rev();
    VcsLocation {
        url: parts.join(),
        rev,
    }
}

/// The VCS named by a `git+`, `hg+` or `svn+` prefix.
fn vcs_prefix(url: &str) -> Option<(VcsKind, &str)> {
    let (prefix, rest) = url.split_once('+')?;
    let vcs = prefix.parse::<VcsKind>().ok()?;
    Some((vcs, rest))
}

/// Split a pip-style `<vcs>+<url>[@rev]` into a plain url and revision.
///
/// Git additionally accepts the scp form `git+git@host:path[@rev]`. A
/// `github.com:` inside a url that already has a scheme is rejected.
///
/// # Errors
///
/// [`VcsError::MalformedUrl`] when there is no VCS prefix, the
/// `<vcs>+<scheme>` pair is not accepted by `config`, or the url mixes a
/// scheme with the scp form.
pub fn convert_pip_url(pip_url: &str, config: &SchemeConfig) -> Result<VcsLocation> {
    let malformed = |reason: &str| VcsError::MalformedUrl {
        url: pip_url.to_string(),
        reason: reason.to_string(),
    };
    let (vcs, url) = vcs_prefix(pip_url)
        .ok_or_else(|| malformed("expected the form <vcs>+<protocol>://<url>[@rev]"))?;

    if vcs == VcsKind::Git && !url.contains("://") {
        if url.starts_with("file:") {
            return Err(malformed("file urls need a scheme"));
        }
        // scp form: parse as ssh, then drop the scheme again
        let location = split_rev(&format!("ssh://{url}"));
        return Ok(VcsLocation {
            url: location.url.trim_start_matches("ssh://").to_string(),
            rev: location.rev,
        });
    }
    if vcs == VcsKind::Git && pip_url.contains("github.com:") {
        return Err(malformed("scp-style host inside a url with a scheme"));
    }

    let scheme = url.split_once("://").map_or("", |(scheme, _)| scheme);
    let pip_scheme = format!("{vcs}+{scheme}");
    if !config.accepts_pip_scheme(&pip_scheme) {
        return Err(malformed(&format!("unsupported scheme '{pip_scheme}'")));
    }
    Ok(split_rev(url))
}

/// Url in the form the VCS binary accepts.
///
/// Strips a `git+`/`hg+`/`svn+` prefix, an `@rev` suffix and any fragment.
/// Urls without a scheme (local paths, scp-style `user@host:path`) are
/// returned unchanged apart from the prefix.
///
/// ```rust
/// use vcsync::url::chomp_protocol;
///
/// assert_eq!(chomp_protocol("git+https://example.com/r.git@main#egg=r"), "https://example.com/r.git");
/// assert_eq!(chomp_protocol("git@github.com:vcs-python/libvcs.git"), "git@github.com:vcs-python/libvcs.git");
/// assert_eq!(chomp_protocol("ssh://git@github.com/vcs-python/libvcs"), "git+ssh://git@github.com/vcs-python/libvcs");
/// ```
#[must_use]
pub fn chomp_protocol(url: &str) -> String {
    let url = vcs_prefix(url).map_or(url, |(_, rest)| rest);
    if !url.contains("://") {
        return url.to_string();
    }
    let url = split_rev(url).url;
    match url.strip_prefix("ssh://git@github.com/") {
        Some(rest) => format!("git+ssh://git@github.com/{rest}"),
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SchemeConfig {
        SchemeConfig::default()
    }

    #[test]
    fn test_detect_explicit_prefixes() {
        let config = config();
        assert_eq!(config.detect("git+https://example.com/r", true), vec![VcsKind::Git]);
        assert_eq!(config.detect("git://example.com/r", true), vec![VcsKind::Git]);
        assert_eq!(config.detect("hg+https://example.com/r", true), vec![VcsKind::Hg]);
        assert_eq!(config.detect("svn+ssh://example.com/r", true), vec![VcsKind::Svn]);
        assert_eq!(config.detect("svn://example.com/r", true), vec![VcsKind::Svn]);
        assert!(config.detect("https://example.com/r.git", true).is_empty());
    }

    #[test]
    fn test_detect_hints_only_when_not_explicit() {
        let config = config();
        assert_eq!(config.detect("https://example.com/r.git", false), vec![VcsKind::Git]);
        assert_eq!(config.detect("git@github.com:user/r.git", false), vec![VcsKind::Git]);
        assert_eq!(config.detect_one("https://example.com/r.git").unwrap(), VcsKind::Git);
    }

    #[test]
    fn test_detect_one_errors() {
        let config = config();
        assert!(matches!(
            config.detect_one("https://example.com/plain").unwrap_err(),
            VcsError::NoVcsForUrl { .. }
        ));

        let ambiguous = config.with_rule(
            SchemeRule::new(VcsKind::Hg, "everything", r"^git\+", true).unwrap(),
        );
        assert!(matches!(
            ambiguous.detect_one("git+https://example.com/r").unwrap_err(),
            VcsError::MultipleVcsForUrl { .. }
        ));
    }

    #[test]
    fn test_convert_pip_url_with_rev() {
        let location =
            convert_pip_url("git+https://github.com/vcs-python/libvcs.git@v1.0#egg=libvcs", &config())
                .unwrap();
        assert_eq!(location.url, "https://github.com/vcs-python/libvcs.git");
        assert_eq!(location.rev.as_deref(), Some("v1.0"));
    }

    #[test]
    fn test_convert_pip_url_keeps_userinfo() {
        let location = convert_pip_url("hg+https://user@hg.example.org/repo", &config()).unwrap();
        assert_eq!(location.url, "https://user@hg.example.org/repo");
        assert!(location.rev.is_none());
    }

    #[test]
    fn test_convert_pip_url_scp_form() {
        let location = convert_pip_url("git+git@github.com:vcs-python/libvcs.git@main", &config()).unwrap();
        assert_eq!(location.url, "git@github.com:vcs-python/libvcs.git");
        assert_eq!(location.rev.as_deref(), Some("main"));
    }

    #[test]
    fn test_convert_pip_url_rejects_malformed() {
        let config = config();
        for bad in [
            "https://github.com/vcs-python/libvcs",
            "git+ssh://github.com:vcs-python/libvcs",
            "git+ftp://example.com/r",
        ] {
            assert!(
                matches!(convert_pip_url(bad, &config).unwrap_err(), VcsError::MalformedUrl { .. }),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_custom_pip_scheme() {
        let config = SchemeConfig::empty().with_pip_scheme("git+gitlab");
        let location = convert_pip_url("git+gitlab://example.com/r@dev", &config).unwrap();
        assert_eq!(location.url, "gitlab://example.com/r");
        assert_eq!(location.rev.as_deref(), Some("dev"));
    }

    #[test]
    fn test_chomp_protocol() {
        assert_eq!(chomp_protocol("https://example.com/r.git"), "https://example.com/r.git");
        assert_eq!(chomp_protocol("file:///tmp/remote"), "file:///tmp/remote");
        assert_eq!(chomp_protocol("hg+https://example.com/r@tip"), "https://example.com/r");
        assert_eq!(chomp_protocol("git+file:///tmp/remote?x=1"), "file:///tmp/remote?x=1");
        assert_eq!(chomp_protocol("/srv/repos/local"), "/srv/repos/local");
    }
}
