use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use cfgsync_core::{CfgError, Format, Provider, Result, SourceKind};

/// A resolved configuration source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Source {
    Local { path: PathBuf },
    Remote(RemoteDescriptor),
}

/// Everything needed to fetch and decode a remote document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteDescriptor {
    pub provider: Provider,
    /// `protocol://host[:port]`
    pub endpoint: String,
    /// Key in the remote store, verbatim from the locator.
    pub path: String,
    /// Lowercase file extension of `path`, without the dot.
    pub encoding_type: String,
}

impl Source {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Local { .. } => SourceKind::Local,
            Self::Remote(_) => SourceKind::Remote,
        }
    }

    /// Decoder for the source's content, picked from its extension.
    pub fn format(&self) -> Result<Format> {
        let ext = match self {
            Self::Local { path } => extension_of(&path.to_string_lossy()),
            Self::Remote(desc) => desc.encoding_type.clone(),
        };
        Format::from_extension(&ext).ok_or_else(|| {
            CfgError::decode(
                if ext.is_empty() { "none" } else { ext.as_str() },
                format!("no decoder for config source {self}"),
            )
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "{}", path.display()),
            Self::Remote(desc) => write!(f, "{desc}"),
        }
    }
}

impl fmt::Display for RemoteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}{}", self.provider, self.endpoint, self.path)
    }
}

/// Resolve a locator into a local path or a remote descriptor.
pub fn resolve(locator: &str) -> Result<Source> {
    resolve_with(locator, false)
}

/// Like [`resolve`], but `force_remote` rejects locators that carry no scheme
/// instead of falling back to a local path.
pub fn resolve_with(locator: &str, force_remote: bool) -> Result<Source> {
    let url = match url::Url::parse(locator) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            if force_remote {
                return Err(CfgError::UnsupportedProvider(format!(
                    "remote config requested but locator '{locator}' has no provider scheme"
                )));
            }
            debug!(locator, "locator has no scheme, treating as local file");
            return Ok(Source::local(locator));
        }
        Err(e) => {
            return Err(CfgError::InvalidLocator {
                locator: locator.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let scheme = url.scheme();
    let Some((provider, protocol)) = scheme.split_once('+') else {
        return Err(CfgError::UnsupportedProvider(format!(
            "scheme '{scheme}' must be of the form provider+protocol"
        )));
    };
    let provider: Provider = provider.parse().map_err(CfgError::UnsupportedProvider)?;
    if !provider.transports().contains(&protocol) {
        return Err(CfgError::UnsupportedProvider(format!(
            "provider '{provider}' does not support transport '{protocol}'"
        )));
    }

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => {
            return Err(CfgError::InvalidLocator {
                locator: locator.to_string(),
                reason: "remote locator has no host".into(),
            });
        }
    };
    let endpoint = match url.port() {
        Some(port) => format!("{protocol}://{host}:{port}"),
        None => format!("{protocol}://{host}"),
    };

    let path = url.path().to_string();
    let encoding_type = extension_of(&path);
    if encoding_type.is_empty() {
        return Err(CfgError::MissingEncoding(path));
    }

    let desc = RemoteDescriptor {
        provider,
        endpoint,
        path,
        encoding_type,
    };
    info!(
        provider = %desc.provider,
        endpoint = %desc.endpoint,
        path = %desc.path,
        encoding = %desc.encoding_type,
        "using remote config provider"
    );
    Ok(Source::Remote(desc))
}

/// Extension of the final `/`-separated segment, lowercased, without the dot.
fn extension_of(path: &str) -> String {
    let segment = path.rsplit(['/', '\\']).next().unwrap_or("");
    match segment.rfind('.') {
        Some(idx) => segment[idx + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Ordered directories searched for `<name>.<ext>` when no locator is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    /// System dir, home dir, then three working-directory-relative dirs.
    pub fn for_app(app: &str) -> Self {
        let mut dirs = vec![PathBuf::from("/etc").join(app)];
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join(format!(".{app}")));
        }
        dirs.extend(
            ["./config", "../../config", "../../../config"]
                .into_iter()
                .map(PathBuf::from),
        );
        Self { dirs }
    }

    pub fn new(dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First existing `<dir>/<name>.<ext>`; directories take priority over extensions.
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        for dir in &self.dirs {
            for ext in Format::SEARCH_EXTENSIONS {
                let candidate = dir.join(format!("{name}.{ext}"));
                if candidate.is_file() {
                    info!(path = %candidate.display(), "found configuration file");
                    return Ok(candidate);
                }
            }
        }
        let searched: Vec<String> = self.dirs.iter().map(|d| d.display().to_string()).collect();
        Err(CfgError::unreadable(
            name,
            format!("config file not found in [{}]", searched.join(", ")),
        ))
    }
}

/// Turn the optional locator into a source, falling back to discovery.
pub fn locate(
    locator: Option<&str>,
    force_remote: bool,
    name: &str,
    search: &SearchPaths,
) -> Result<Source> {
    match locator.filter(|l| !l.is_empty()) {
        Some(locator) => resolve_with(locator, force_remote),
        None if force_remote => Err(CfgError::UnsupportedProvider(
            "remote config requested but no locator was given".into(),
        )),
        None => search.find(name).map(Source::local),
    }
}

