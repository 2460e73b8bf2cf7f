//! Mapping between editor paths and the resource-relative paths the debug
//! server uses.

use std::path::Path;

const RESOURCES_DIR: &str = "mods/deathmatch/resources/";

/// Lexically normalize a path to forward slashes, dropping `.` and empty
/// segments and folding `..`.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/') && path.len() > 1;

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut normalized = segments.join("/");
    if absolute {
        normalized.insert(0, '/');
    }
    if trailing && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// The path of a script relative to the resources directory, e.g.
/// `[gamemodes]/race/server.lua`. Paths outside any resources directory are
/// returned unchanged.
pub fn relative_resource_path(absolute: &Path) -> String {
    let raw = absolute.to_string_lossy();
    let normalized = normalize(&raw);

    normalized
        .match_indices(RESOURCES_DIR)
        .map(|(at, _)| &normalized[at + RESOURCES_DIR.len()..])
        // resource directory plus file at the very least
        .find(|relative| relative.contains('/'))
        .map(str::to_string)
        .unwrap_or_else(|| raw.into_owned())
}

/// Last segment of a `/` or `\` separated path.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// `<serverpath>/mods/deathmatch/resources/`, the directory relative script
/// paths reported by the debug server are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoot(String);

impl ResourceRoot {
    pub fn from_server_path(serverpath: &Path) -> Self {
        let root = normalize(&format!("{}/{RESOURCES_DIR}", serverpath.to_string_lossy()));
        Self(root)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute editor path of a resource-relative script path.
    pub fn resolve(&self, relative: &str) -> String {
        normalize(&format!("{}{relative}", self.0))
    }
}
