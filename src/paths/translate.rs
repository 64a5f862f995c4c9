//! Relative path navigation

/// Resolve `path` against the current and previous paths.
///
/// `.` is a no-op, `..` pops a segment, a leading `-` starts from the
/// previous path and the first segment `P`, `L` or `O` expands to
/// `Physical`, `Logical` or `Organisation`.
pub fn translate_path(path: &str, accept_selection: bool, curr_path: &str, prev_path: &str) -> String {
    let path = if path.is_empty() { "." } else { path };
    if path == "_" && accept_selection {
        return "_".to_string();
    }
    if path == "-" {
        return prev_path.to_string();
    }

    let mut output: Vec<String> = Vec::new();
    let input = match path.strip_prefix('/') {
        Some(rest) => rest,
        None => {
            let base = if path.starts_with('-') { prev_path } else { curr_path };
            output.extend(
                base.split('/')
                    .filter(|w| !w.is_empty())
                    .map(str::to_string),
            );
            path
        }
    };

    for (i, word) in input.split('/').enumerate() {
        match word {
            "" | "." => {}
            "-" if i == 0 => {}
            ".." => {
                output.pop();
            }
            _ => output.push(word.to_string()),
        }
    }

    if let Some(first) = output.first_mut() {
        match first.as_str() {
            "P" => *first = "Physical".to_string(),
            "L" => *first = "Logical".to_string(),
            "O" => *first = "Organisation".to_string(),
            _ => {}
        }
    }
    format!("/{}", output.join("/"))
}
