//! Deep-link resolver
//!
//! Every incoming URI is first classified into a [`LinkKind`] and then
//! normalized by the function for that variant. All variants end in the same
//! target resolution, so a query-parameter encoding and its path-suffix
//! equivalent always produce the same [`CanonicalPath`].

use std::collections::HashMap;

use tracing::debug;
use url::{form_urlencoded, Url};

use crate::error::LinkError;
use crate::path::{parse_id, CanonicalPath};

/// Separator development tunnels put between the bundler address and the route
const DEV_SEPARATOR: &str = "/--/";

/// Which URIs the resolver accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Custom scheme registered by the app, e.g. `parentline://`
    pub app_scheme: String,
    /// Hosts serving universal links
    pub universal_hosts: Vec<String>,
    /// Path prefix stripped from universal links before normalization
    pub universal_prefix: String,
    /// Schemes used by development tunnels
    pub dev_schemes: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            app_scheme: "parentline".to_string(),
            universal_hosts: vec!["parentline.app".to_string(), "www.parentline.app".to_string()],
            universal_prefix: "/app".to_string(),
            dev_schemes: vec!["exp".to_string(), "exps".to_string()],
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), LinkError> {
        let scheme_ok = self
            .app_scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && self
                .app_scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok || matches!(self.app_scheme.as_str(), "http" | "https") {
            return Err(LinkError::InvalidScheme(self.app_scheme.clone()));
        }

        if let Some(host) = self
            .universal_hosts
            .iter()
            .find(|h| h.is_empty() || h.contains(['/', ':', ' ']))
        {
            return Err(LinkError::InvalidHost(host.clone()));
        }

        if !self.universal_prefix.is_empty() && !self.universal_prefix.starts_with('/') {
            return Err(LinkError::InvalidPrefix(self.universal_prefix.clone()));
        }

        Ok(())
    }
}

/// The four URI families the app can be opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// In-app path such as `/student/7`
    Direct(String),
    /// `parentline://student/7/message/99`
    Scheme(Url),
    /// `https://parentline.app/app/student/7`
    Universal(Url),
    /// `exp://10.0.0.5:8081/--/student/7` or its query-parameter forms
    DevTunnel(Url),
}

/// Normalizes external URIs into canonical paths
#[derive(Debug, Clone)]
pub struct DeepLinkResolver {
    config: LinkConfig,
}

impl DeepLinkResolver {
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Resolve any supported URI. Never fails; bad input yields `CanonicalPath::Error`.
    pub fn resolve(&self, uri: &str) -> CanonicalPath {
        match self.classify(uri) {
            Some(kind) => {
                let path = self.normalize(&kind);
                debug!("Resolved {} -> {}", uri, path);
                path
            }
            None => {
                debug!("Unrecognized deep link: {}", uri);
                CanonicalPath::Error
            }
        }
    }

    /// Decide which URI family `uri` belongs to
    pub fn classify(&self, uri: &str) -> Option<LinkKind> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            return Some(LinkKind::Direct(trimmed.to_string()));
        }

        let url = Url::parse(trimmed).ok()?;
        let scheme = url.scheme();

        if scheme.eq_ignore_ascii_case(&self.config.app_scheme) {
            return Some(LinkKind::Scheme(url));
        }
        if self
            .config
            .dev_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
        {
            return Some(LinkKind::DevTunnel(url));
        }
        if matches!(scheme, "http" | "https") {
            if url.path().contains(DEV_SEPARATOR) || url.path().ends_with("/--") {
                return Some(LinkKind::DevTunnel(url));
            }
            let host = url.host_str()?;
            if self
                .config
                .universal_hosts
                .iter()
                .any(|h| h.eq_ignore_ascii_case(host))
            {
                return Some(LinkKind::Universal(url));
            }
        }

        None
    }

    pub fn normalize(&self, kind: &LinkKind) -> CanonicalPath {
        match kind {
            LinkKind::Direct(path) => normalize_direct(path),
            LinkKind::Scheme(url) => normalize_scheme(url),
            LinkKind::Universal(url) => self.normalize_universal(url),
            LinkKind::DevTunnel(url) => normalize_dev_tunnel(url),
        }
    }

    fn normalize_universal(&self, url: &Url) -> CanonicalPath {
        let prefix = self.config.universal_prefix.trim_end_matches('/');
        let path = url.path();
        let stripped = if prefix.is_empty() {
            path
        } else if path == prefix {
            "/"
        } else {
            match path.strip_prefix(prefix) {
                Some(rest) if rest.starts_with('/') => rest,
                _ => path,
            }
        };
        resolve_target(stripped, url.query())
    }
}

fn normalize_direct(raw: &str) -> CanonicalPath {
    let (path, query) = match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    };
    resolve_target(path, query)
}

fn normalize_scheme(url: &Url) -> CanonicalPath {
    // `parentline://student/7` parses "student" as the host
    let path = match url.host_str().filter(|h| !h.is_empty()) {
        Some(host) => format!("/{}{}", host, url.path()),
        None => url.path().to_string(),
    };
    resolve_target(&path, url.query())
}

fn normalize_dev_tunnel(url: &Url) -> CanonicalPath {
    let path = url.path();
    let route = match path.find(DEV_SEPARATOR) {
        Some(idx) => &path[idx + DEV_SEPARATOR.len() - 1..],
        None if path.ends_with("/--") => "/",
        None => path,
    };
    resolve_target(route, url.query())
}

/// A non-root path wins; a root path defers to the query parameters
fn resolve_target(path: &str, query: Option<&str>) -> CanonicalPath {
    match CanonicalPath::parse(path) {
        CanonicalPath::Root => query
            .and_then(target_from_query)
            .unwrap_or(CanonicalPath::Root),
        other => other,
    }
}

/// Query-parameter encodings:
/// `studentId` (+ `messageId`), `studentPage`, `type=student&id=`, `page=`
fn target_from_query(query: &str) -> Option<CanonicalPath> {
    let params: HashMap<String, String> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let id_param = |key: &str| params.get(key).map(|v| parse_id(v.trim()));

    match (id_param("studentId"), id_param("messageId")) {
        (Some(Some(student_id)), Some(Some(message_id))) => {
            return Some(CanonicalPath::Message {
                student_id,
                message_id,
            })
        }
        (Some(Some(student_id)), None) => return Some(CanonicalPath::Student { student_id }),
        (Some(_), _) | (None, Some(_)) => return Some(CanonicalPath::Error),
        (None, None) => {}
    }

    if let Some(page) = id_param("studentPage") {
        return Some(page.map_or(CanonicalPath::Error, |student_id| {
            CanonicalPath::Student { student_id }
        }));
    }

    if let Some(kind) = params.get("type") {
        return Some(match kind.as_str() {
            "student" => id_param("id")
                .flatten()
                .map_or(CanonicalPath::Error, |student_id| CanonicalPath::Student {
                    student_id,
                }),
            "settings" => CanonicalPath::Settings,
            "home" => CanonicalPath::Root,
            _ => CanonicalPath::Error,
        });
    }

    if let Some(page) = params.get("page") {
        let page = page.trim();
        return Some(if page.starts_with('/') {
            CanonicalPath::parse(page)
        } else {
            CanonicalPath::parse(&format!("/{}", page))
        });
    }

    None
}

/// With exactly one student on the device, home is that student's screen
pub fn rewrite_for_single_student(path: CanonicalPath, known_students: &[i64]) -> CanonicalPath {
    match (path, known_students) {
        (CanonicalPath::Root, [only]) => CanonicalPath::Student { student_id: *only },
        (path, _) => path,
    }
}
