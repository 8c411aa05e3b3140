//! SD-card path helpers
//!
//! Plain string manipulation; SD paths are always absolute, `/`-separated
//! and never OS paths, so `std::path` is the wrong tool here.

/// Collapse runs of slashes and strip a trailing slash (except for `/`).
pub fn remove_redundant_slashes(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut last_was_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !last_was_slash {
                result.push(ch);
            }
            last_was_slash = true;
        } else {
            result.push(ch);
            last_was_slash = false;
        }
    }
    if result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}

/// A valid upload destination is absolute and does not name a directory.
pub fn is_dest_path_valid(path: &str) -> bool {
    path.starts_with('/') && !path.ends_with('/')
}

/// Whether `path` lies inside `dir_path`.
pub fn path_is_in_directory(path: &str, dir_path: &str) -> bool {
    if dir_path.ends_with('/') {
        path.starts_with(dir_path)
    } else {
        path.len() > dir_path.len()
            && path.starts_with(dir_path)
            && path.as_bytes()[dir_path.len()] == b'/'
    }
}

/// Parent of a normalized path; the parent of a top-level entry is `/`.
pub fn parent_directory(path: &str) -> String {
    let parent = match path.rfind('/') {
        Some(idx) if idx + 1 < path.len() => &path[..idx],
        _ => path,
    };
    if !path.is_empty() && parent.is_empty() {
        "/".to_string()
    } else {
        parent.to_string()
    }
}

/// Join a directory and an entry name.
pub fn join_dir(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}
