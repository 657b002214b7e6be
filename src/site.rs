use crate::config::SiteRoot;
use std::path::{Path, PathBuf};

/// Virtual host to site root mapping
#[derive(Debug, Clone, Default)]
pub struct SiteMap {
    sites: Vec<(String, PathBuf)>,
}

impl SiteMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roots(roots: &[SiteRoot]) -> Self {
        let mut map = Self::new();
        for site in roots {
            map.add(&site.host, site.root.clone());
        }
        map
    }

    /// Add a host. Adding a known host replaces its root.
    pub fn add(&mut self, host: &str, root: impl Into<PathBuf>) {
        let root = root.into();
        match self
            .sites
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(host))
        {
            Some(entry) => entry.1 = root,
            None => self.sites.push((host.to_string(), root)),
        }
    }

    /// The root for a server name, falling back to the first site
    pub fn resolve(&self, server_name: &str) -> Option<&Path> {
        self.sites
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(server_name))
            .or_else(|| self.sites.first())
            .map(|(_, root)| root.as_path())
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }
}
