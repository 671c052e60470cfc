use indexmap::IndexMap;

use crate::error::Result;
use crate::sources::{self, SourceReader};

const YUM_MARKER: &str = "Installed Packages";

/// Installed-package listing formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    /// `apt list --installed`: `name/suite version arch [flags]`
    Apt,
    /// `yum list installed`: `name.arch version repo`
    Yum,
}

impl PackageManager {
    pub fn source(self) -> &'static str {
        match self {
            PackageManager::Apt => sources::APT_LIST,
            PackageManager::Yum => sources::YUM_LIST,
        }
    }

    /// Rows after the listing header.
    ///
    /// apt prints one `Listing...` line. yum may print plugin and repo
    /// chatter before its `Installed Packages` marker, so everything up to
    /// the marker is skipped.
    fn body(self, lines: &[String]) -> &[String] {
        let header = match self {
            PackageManager::Apt => 1,
            PackageManager::Yum => lines
                .iter()
                .position(|line| line.trim_start().starts_with(YUM_MARKER))
                .map_or(1, |idx| idx + 1),
        };
        lines.get(header..).unwrap_or_default()
    }

    fn package_name(self, token: &str) -> Option<String> {
        match self {
            PackageManager::Apt => token.split('/').next().map(str::to_string),
            PackageManager::Yum => token.rsplit_once('.').map(|(name, _arch)| name.to_string()),
        }
    }
}

/// Pick the listing to read. apt takes precedence when both were captured.
pub fn detect_package_manager<S: SourceReader>(source: &S) -> Option<PackageManager> {
    let apt = source.exists(sources::APT_LIST);
    let yum = source.exists(sources::YUM_LIST);
    if apt && yum {
        tracing::warn!(
            "Both {} and {} present, using {}",
            sources::APT_LIST,
            sources::YUM_LIST,
            sources::APT_LIST
        );
    }
    match (apt, yum) {
        (true, _) => Some(PackageManager::Apt),
        (false, true) => Some(PackageManager::Yum),
        (false, false) => None,
    }
}

pub fn collect_packages<S: SourceReader>(source: &S) -> Result<IndexMap<String, String>> {
    let Some(manager) = detect_package_manager(source) else {
        tracing::info!("No package listing captured");
        return Ok(IndexMap::new());
    };
    let packages = parse_package_list(manager, &source.lines(manager.source())?);
    tracing::info!("Packages: {} from {:?} listing", packages.len(), manager);
    Ok(packages)
}

/// Name to version map; a repeated name keeps the last version seen.
pub fn parse_package_list(manager: PackageManager, lines: &[String]) -> IndexMap<String, String> {
    let mut packages = IndexMap::new();
    let mut rows = manager.body(lines).iter().peekable();

    while let Some(line) = rows.next() {
        if line.trim().is_empty() || line.starts_with(char::is_whitespace) {
            tracing::debug!("Stray package line: {}", line);
            continue;
        }
        let mut words = line.split_whitespace();
        let Some(name_token) = words.next() else {
            continue;
        };

        // Long names wrap: the version sits on the next, indented line
        let version = match words.next() {
            Some(version) => version.to_string(),
            None => match rows.next_if(|next| next.starts_with(char::is_whitespace)) {
                Some(next) => match next.split_whitespace().next() {
                    Some(version) => version.to_string(),
                    None => continue,
                },
                None => {
                    tracing::debug!("Package without version: {}", name_token);
                    continue;
                }
            },
        };

        match manager.package_name(name_token) {
            Some(name) => {
                packages.insert(name, clean_version(&version));
            }
            None => tracing::debug!("Package name without arch: {}", name_token),
        }
    }

    packages
}

/// Strip the `epoch:` prefix and the packaging release after the last `-`.
pub fn clean_version(version: &str) -> String {
    let version = version.split_once(':').map_or(version, |(_, rest)| rest);
    version
        .rsplit_once('-')
        .map_or(version, |(upstream, _release)| upstream)
        .to_string()
}
