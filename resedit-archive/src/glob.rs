//! Glob matching over `/`-separated archive paths: `**` matches any number
//! of path segments, `*` matches one segment, `?` matches a single
//! non-`/` character.

pub fn matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let path: Vec<char> = path.chars().collect();
    match_from(&pattern, &path)
}

fn match_from(pattern: &[char], path: &[char]) -> bool {
    if pattern.is_empty() {
        return path.is_empty();
    }

    if pattern.starts_with(&['*', '*']) {
        let rest = &pattern[2..];
        let rest = if rest.starts_with(&['/']) { &rest[1..] } else { rest };
        if match_from(rest, path) {
            return true;
        }
        if path.is_empty() {
            return false;
        }
        // Consume one path char and keep trying; if we cross a `/`, the
        // remaining text after it is also a valid continuation point.
        return match_from(pattern, &path[1..]);
    }

    match pattern[0] {
        '*' => {
            for split in 0..=path.len() {
                if path[..split].contains(&'/') {
                    break;
                }
                if match_from(&pattern[1..], &path[split..]) {
                    return true;
                }
            }
            false
        }
        '?' => {
            if path.is_empty() || path[0] == '/' {
                false
            } else {
                match_from(&pattern[1..], &path[1..])
            }
        }
        c => path.first() == Some(&c) && match_from(&pattern[1..], &path[1..]),
    }
}
