//! Flat renderings of raw extraction output.

use crate::extractor::KeyOccurrence;

const CSV_HEADER: [&str; 5] = ["key", "file", "line", "type", "context"];

fn csv_field(value: &str) -> String {
    let flattened = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!("\"{}\"", flattened.replace('"', "\"\""))
}

fn csv_row<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(csv_field).collect::<Vec<_>>().join(",")
}

/// One row per occurrence; every field is quoted.
pub fn render_csv(occurrences: &[KeyOccurrence]) -> String {
    let mut out = csv_row(CSV_HEADER);
    out.push('\n');
    for occ in occurrences {
        let line = occ.line.to_string();
        out.push_str(&csv_row([
            occ.key.as_str(),
            occ.file.as_deref().unwrap_or(""),
            line.as_str(),
            occ.kind.as_str(),
            occ.context.as_str(),
        ]));
        out.push('\n');
    }
    out
}

/// Escape for a PO string literal
fn po_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// gettext template with a `#: file:line` reference for every occurrence
/// that came from a file.
pub fn render_pot(occurrences: &[KeyOccurrence]) -> String {
    let mut out = String::from(
        "# Translation template\n\
         msgid \"\"\n\
         msgstr \"\"\n\
         \"Content-Type: text/plain; charset=UTF-8\\n\"\n\
         \"Content-Transfer-Encoding: 8bit\\n\"\n",
    );
    for occ in occurrences {
        out.push('\n');
        if let Some(file) = occ.file.as_deref() {
            out.push_str(&format!("#: {}:{}\n", file, occ.line));
        }
        out.push_str(&format!("msgid \"{}\"\nmsgstr \"\"\n", po_escape(&occ.key)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occ(key: &str, file: Option<&str>, line: usize, context: &str) -> KeyOccurrence {
        KeyOccurrence {
            key: key.to_string(),
            file: file.map(String::from),
            line,
            kind: "server".to_string(),
            pattern: "translate_helper".to_string(),
            context: context.to_string(),
        }
    }

    #[test]
    fn test_csv_quotes_and_flattens() {
        let csv = render_csv(&[occ(
            "auth.failed",
            Some("app/a.php"),
            3,
            "echo \"hi\";\n__('auth.failed')",
        )]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], r#""key","file","line","type","context""#);
        assert_eq!(
            lines[1],
            r#""auth.failed","app/a.php","3","server","echo ""hi""; __('auth.failed')""#
        );
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_csv_without_file() {
        let csv = render_csv(&[occ("a", None, 1, "")]);
        assert!(csv.ends_with("\"a\",\"\",\"1\",\"server\",\"\"\n"));
    }

    #[test]
    fn test_pot_header_and_references() {
        let pot = render_pot(&[
            occ("auth.failed", Some("app/a.php"), 7, ""),
            occ("say \"hi\"", None, 1, ""),
        ]);
        assert!(pot.contains("\"Content-Type: text/plain; charset=UTF-8\\n\"\n"));
        assert!(pot.contains("#: app/a.php:7\nmsgid \"auth.failed\"\nmsgstr \"\"\n"));
        assert!(pot.contains("\nmsgid \"say \\\"hi\\\"\"\nmsgstr \"\"\n"));
        assert_eq!(pot.matches("#: ").count(), 1);
    }
}
