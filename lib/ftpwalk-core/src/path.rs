/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

/// Join a remote base path and a child name with exactly one `/`.
///
/// An empty base stands for the server side current directory.
pub fn join_remote(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Resolve `path` against the tracked working directory.
pub(crate) fn resolve_remote(cwd: Option<&str>, path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }
    match cwd {
        Some(cwd) if path.is_empty() => cwd.to_string(),
        Some(cwd) => join_remote(cwd, path.trim_start_matches("./")),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join() {
        assert_eq!(join_remote("", "a"), "a");
        assert_eq!(join_remote("/", "a"), "/a");
        assert_eq!(join_remote("/pub", "a.txt"), "/pub/a.txt");
        assert_eq!(join_remote("/pub/", "a.txt"), "/pub/a.txt");
        assert_eq!(join_remote("sub", "b.txt"), "sub/b.txt");
    }

    #[test]
    fn resolve() {
        assert_eq!(resolve_remote(Some("/home"), "/etc"), "/etc");
        assert_eq!(resolve_remote(Some("/home"), ""), "/home");
        assert_eq!(resolve_remote(Some("/home"), "data"), "/home/data");
        assert_eq!(resolve_remote(Some("/"), "./data"), "/data");
        assert_eq!(resolve_remote(None, "data"), "data");
        assert_eq!(resolve_remote(None, ""), "");
    }
}
