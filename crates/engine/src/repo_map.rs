//! Repository map: a compact listing of files not loaded into the chat.

use crate::token::estimate_tokens;

const HEADER: &str = "Other files in the repository (not loaded into the chat):\n";

/// Build a map over `paths`, adding lines while the map fits in `max_tokens`.
///
/// Returns `None` when the budget is zero or no line fits.
pub fn build_repo_map<S: AsRef<str>>(paths: &[S], max_tokens: usize) -> Option<String> {
    if max_tokens == 0 || paths.is_empty() {
        return None;
    }

    let mut map = String::from(HEADER);
    let mut listed = 0usize;
    for path in paths {
        let line = format!("{}\n", path.as_ref());
        if estimate_tokens(&map) + estimate_tokens(&line) > max_tokens {
            break;
        }
        map.push_str(&line);
        listed += 1;
    }

    if listed == 0 {
        return None;
    }
    tracing::trace!(listed, total = paths.len(), "Repository map built");
    Some(map)
}
