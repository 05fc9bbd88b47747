/// A reference line inside a chunk body: `<indent><<name>>`.
///
/// Both fields borrow from the line they were parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    /// Leading whitespace of the reference line, prepended to every substituted line.
    pub indent: &'a str,
    /// Name of the referenced chunk, without delimiters.
    pub name: &'a str,
}

impl<'a> Reference<'a> {
    /// Parse a body line. Returns `None` for literal lines, including lines
    /// where the marker shares the line with other text.
    pub fn parse(line: &'a str) -> Option<Self> {
        let body = line.trim_start();
        let indent = &line[..line.len() - body.len()];
        let name = parse_marker(body.trim_end())?;
        Some(Reference { indent, name })
    }

    /// Apply this reference's indentation to one line of the referenced body.
    pub fn indent_line(&self, line: &str) -> String {
        let mut out = String::with_capacity(self.indent.len() + line.len());
        out.push_str(self.indent);
        out.push_str(line);
        out
    }
}

/// Strip the `<<` / `>>` delimiters from a single marker token.
///
/// The name must be non-empty and must not itself contain `>>`, so
/// `<<a>> <<b>>` is not a marker.
pub fn parse_marker(token: &str) -> Option<&str> {
    let name = token.strip_prefix("<<")?.strip_suffix(">>")?;
    if name.is_empty() || name.contains(">>") {
        None
    } else {
        Some(name)
    }
}
