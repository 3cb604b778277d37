//! Deterministic text layout for generated modules.

/// Substitute `{{key}}` markers. Markers without a value are left in place.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

/// Remove the indentation shared by every non-blank line.
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|l| if l.trim().is_empty() { "" } else { &l[margin..] })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every non-blank line with `levels` indentation steps.
pub fn indent(text: &str, levels: usize) -> String {
    let pad = "    ".repeat(levels);
    text.lines()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dedent a block and re-indent it at `levels`.
pub fn block(text: &str, levels: usize) -> String {
    indent(&dedent(text), levels)
}

/// Greedy word wrap for lines longer than `width`. Words are never split.
pub fn wrap_long_lines(text: &str, width: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in text.split('\n') {
        if line.chars().count() <= width {
            out.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in line.split(' ') {
            let fits = current.chars().count() + 1 + word.chars().count() <= width;
            if current.is_empty() {
                current.push_str(word);
            } else if fits {
                current.push(' ');
                current.push_str(word);
            } else {
                out.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        out.push(current);
    }
    out.join("\n")
}

/// Strip trailing whitespace, keep at most two consecutive blank lines, and
/// end the module with a single newline.
pub fn tidy(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut blanks = 0usize;
    let mut started = false;
    for line in source.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blanks += 1;
            continue;
        }
        if started {
            for _ in 0..blanks.min(2) {
                out.push('\n');
            }
        }
        blanks = 0;
        started = true;
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_replaces_known_markers() {
        let out = fill("def {{name}}(): return {{value}} {{missing}}", &[("name", "f"), ("value", "1")]);
        assert_eq!(out, "def f(): return 1 {{missing}}");
    }

    #[test]
    fn dedent_and_indent_round_blocks() {
        let text = "\n        if x:\n            y()\n\n        z()\n";
        assert_eq!(dedent(text), "\nif x:\n    y()\n\nz()");
        assert_eq!(block(text, 1), "\n    if x:\n        y()\n\n    z()");
    }

    #[test]
    fn wrap_breaks_on_spaces_only() {
        let text = "aaaa bbbb cccc\nshort";
        assert_eq!(wrap_long_lines(text, 9), "aaaa bbbb\ncccc\nshort");
        assert_eq!(wrap_long_lines("unbreakableword", 4), "unbreakableword");
    }

    #[test]
    fn tidy_collapses_blank_runs() {
        let src = "\n\nimport os   \n\n\n\n\nx = 1\n\n";
        assert_eq!(tidy(src), "import os\n\n\nx = 1\n");
    }
}
