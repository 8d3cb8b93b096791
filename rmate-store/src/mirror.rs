//! Mirror-path derivation.
//!
//! A mirror path always lives strictly under the base directory: the host
//! component is sanitized to a fixed character set, and remote-path
//! components that could escape (`..`) or collapse (`.`, empty) are
//! dropped before joining.

use std::path::{Path, PathBuf};

/// Host directory name restricted to `[A-Za-z0-9._-]`; every other byte
/// maps to `_`. An empty host — or one that would be a relative path
/// component (`.`, `..`) — becomes `unknown`.
pub fn sanitize_host(host: &str) -> String {
    let sanitized: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match sanitized.as_str() {
        "" | "." | ".." => "unknown".to_owned(),
        _ => sanitized,
    }
}

/// Derive the local mirror path for `remote_path` on `host`.
///
/// Remote-path components equal to `""`, `.`, or `..` are dropped; the
/// rest are joined below `<base>/<sanitized-host>/`.
pub fn mirror_path(base: &Path, host: &str, remote_path: &str) -> PathBuf {
    let mut path = base.join(sanitize_host(host));
    for component in remote_path.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            continue;
        }
        path.push(component);
    }
    path
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Component;

    #[rstest]
    #[case("web-1", "web-1")]
    #[case("host.example.com", "host.example.com")]
    #[case("user@host", "user_host")]
    #[case("a b/c", "a_b_c")]
    #[case("héllo", "h_llo")]
    #[case("", "unknown")]
    #[case(".", "unknown")]
    #[case("..", "unknown")]
    fn host_sanitization(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_host(input), expected);
    }

    #[rstest]
    #[case("/var/../log/app.log", "web-1/var/log/app.log")]
    #[case("/var/log/app.log", "web-1/var/log/app.log")]
    #[case("relative/file", "web-1/relative/file")]
    #[case("/./a//b/.", "web-1/a/b")]
    #[case("/../../../../etc/passwd", "web-1/etc/passwd")]
    fn mirror_paths_stay_under_base(#[case] remote: &str, #[case] expected_tail: &str) {
        let base = Path::new("/h/.rmate_launcher");
        let path = mirror_path(base, "web-1", remote);
        assert_eq!(path, base.join(expected_tail));
        assert!(path.starts_with(base));
    }

    #[rstest]
    #[case("h", "/a/../../b")]
    #[case("..", "/etc/passwd")]
    #[case("evil/../host", "../../f")]
    fn derived_paths_never_contain_dot_dot(#[case] host: &str, #[case] remote: &str) {
        let base = Path::new("/base");
        let path = mirror_path(base, host, remote);
        assert!(path.starts_with(base));
        assert!(
            path.components().all(|c| c != Component::ParentDir),
            "no `..` component may survive: {}",
            path.display()
        );
    }

    #[test]
    fn remote_with_no_usable_components_maps_to_host_dir() {
        let base = Path::new("/base");
        assert_eq!(mirror_path(base, "h", "/../."), base.join("h"));
    }
}
