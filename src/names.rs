use std::path::{Path, PathBuf};

/// Expands a binary class name into itself followed by each enclosing class,
/// most specific first: `A$B$C` becomes `[A$B$C, A$B, A]`.
///
/// A `$` at position 0 is not treated as a separator.
pub fn expand_nested(name: &str) -> Vec<String> {
    let mut chain = vec![name.to_string()];
    let mut current = name;
    while let Some(pos) = current.rfind('$')
        && pos > 0
    {
        current = &current[..pos];
        chain.push(current.to_string());
    }
    chain
}

/// Normalizes a user supplied class name (`com.example.Foo`,
/// `import com.example.Foo;`, `com/example/Foo.class`) into its binary form.
pub fn normalize_entry_class(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("import ") {
        s = rest.trim();
    }
    s = s.trim_end_matches(';').trim();
    if let Some(rest) = s.strip_suffix(".class") {
        s = rest;
    }
    s.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '.' { '/' } else { c })
        .collect()
}

/// Returns true when `name` maps to a path strictly inside an extraction root.
pub fn is_safe_binary_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('/') || name.contains('\\') || name.contains('\0') {
        return false;
    }
    name.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

pub fn class_file_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.class"))
}

/// Inverse of [`class_file_path`]: the binary name for a path relative to the
/// extraction root, if it is a `.class` file.
pub fn binary_name_from_relative(relative: &Path) -> Option<String> {
    let s = relative.to_str()?.replace('\\', "/");
    s.strip_suffix(".class").map(str::to_string)
}
