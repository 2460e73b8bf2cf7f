use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use backend::BreakpointLocation;

use crate::paths::relative_resource_path;

const FIRST_BREAKPOINT_ID: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredBreakpoint {
    pub id: i64,
    pub line: i64,
}

/// Every breakpoint of the session, keyed by absolute source path.
///
/// The debug server only accepts the complete set, so the registry is the
/// source of truth and [`BreakpointRegistry::locations`] is re-sent after
/// every change.
#[derive(Debug)]
pub struct BreakpointRegistry {
    by_path: BTreeMap<PathBuf, Vec<RegisteredBreakpoint>>,
    next_id: i64,
}

impl Default for BreakpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self {
            by_path: BTreeMap::new(),
            next_id: FIRST_BREAKPOINT_ID,
        }
    }

    /// Replace all breakpoints of `path`. Every breakpoint gets a new id.
    pub fn replace(
        &mut self,
        path: impl Into<PathBuf>,
        lines: impl IntoIterator<Item = i64>,
    ) -> Vec<RegisteredBreakpoint> {
        let registered: Vec<_> = lines
            .into_iter()
            .map(|line| {
                let id = self.next_id;
                self.next_id += 1;
                RegisteredBreakpoint { id, line }
            })
            .collect();

        let path = path.into();
        if registered.is_empty() {
            self.by_path.remove(&path);
        } else {
            self.by_path.insert(path, registered.clone());
        }
        registered
    }

    pub fn get(&self, path: &Path) -> &[RegisteredBreakpoint] {
        self.by_path.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_path.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// The full set in the form the debug server expects.
    pub fn locations(&self) -> Vec<BreakpointLocation> {
        self.by_path
            .iter()
            .flat_map(|(path, breakpoints)| {
                let file = relative_resource_path(path);
                breakpoints.iter().map(move |bp| BreakpointLocation {
                    file: file.clone(),
                    line: bp.line,
                })
            })
            .collect()
    }
}

/// Move a 1-based `line` forward past blank lines and `--` comments, since
/// the debug server never stops there. The result never passes the last line.
pub fn verify_line(lines: &[&str], line: i64) -> i64 {
    let count = lines.len() as i64;
    if line < 1 || line >= count {
        return line;
    }

    let skippable = |l: i64| {
        let text = lines[(l - 1) as usize].trim();
        text.is_empty() || text.starts_with("--")
    };

    let mut l = line;
    while l < count && skippable(l) {
        l += 1;
    }
    l
}

/// [`verify_line`] over the lines of a source file.
pub fn verify_lines(source: &str, requested: &[i64]) -> Vec<i64> {
    let lines: Vec<&str> = source.split('\n').collect();
    requested
        .iter()
        .map(|&line| verify_line(&lines, line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        let lines = ["", "", "x=1", "", ""];
        assert_eq!(verify_line(&lines, 1), 3);
    }

    #[test]
    fn comments_are_skipped() {
        let source = "local a = 1\n  -- note\n--[[ block\n\nprint(a)\n";
        assert_eq!(verify_lines(source, &[2]), vec![5]);
    }

    #[test]
    fn valid_line_is_unchanged_and_idempotent() {
        let lines = ["local a = 1", "", "print(a)"];
        for line in 1..=3 {
            let verified = verify_line(&lines, line);
            assert_eq!(verify_line(&lines, verified), verified);
        }
        assert_eq!(verify_line(&lines, 1), 1);
    }

    #[test]
    fn trailing_blank_lines_clamp_to_end() {
        let lines = ["x = 1", "", "", ""];
        assert_eq!(verify_line(&lines, 2), 4);
    }

    #[test]
    fn out_of_range_lines_are_left_alone() {
        let lines = ["x = 1", ""];
        assert_eq!(verify_line(&lines, 0), 0);
        assert_eq!(verify_line(&lines, 7), 7);
    }

    #[test]
    fn replacing_a_file_keeps_only_the_new_set() {
        let mut registry = BreakpointRegistry::new();
        let path = PathBuf::from("/srv/mods/deathmatch/resources/res/server.lua");

        let first = registry.replace(&path, [3, 8]);
        let second = registry.replace(&path, [5]);

        assert_eq!(registry.get(&path), second.as_slice());
        assert_eq!(registry.len(), 1);
        assert!(second[0].id > first[1].id);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut registry = BreakpointRegistry::new();
        let a = registry.replace("/a.lua", [1, 2]);
        registry.replace("/a.lua", []);
        let b = registry.replace("/b.lua", [1]);

        assert_eq!(a[0].id, 1000);
        assert_eq!(a[1].id, 1001);
        assert_eq!(b[0].id, 1002);
        assert!(registry.get(Path::new("/a.lua")).is_empty());
    }

    #[test]
    fn locations_cover_every_file() {
        let mut registry = BreakpointRegistry::new();
        registry.replace("/mta/mods/deathmatch/resources/[g]/res/a.lua", [4]);
        registry.replace("/mta/mods/deathmatch/resources/res/b.lua", [1, 9]);

        let locations = registry.locations();
        assert_eq!(
            locations,
            vec![
                BreakpointLocation {
                    file: "[g]/res/a.lua".to_string(),
                    line: 4
                },
                BreakpointLocation {
                    file: "res/b.lua".to_string(),
                    line: 1
                },
                BreakpointLocation {
                    file: "res/b.lua".to_string(),
                    line: 9
                },
            ]
        );
    }
}
