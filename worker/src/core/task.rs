//! Parsing and rewriting of the `tasks.md` checklist document.
//!
//! A pending task is an unchecked markdown checklist item (`- [ ] text`).
//! Tasks are identified by content plus position so that two textually
//! identical pending lines stay distinct: marking one done rewrites only the
//! originating line, never every occurrence.

use std::sync::LazyLock;

use regex::Regex;

/// One pending checklist item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Task description (the text after the unchecked marker).
    pub text: String,
    /// Trimmed source line, used as the replace anchor.
    pub line: String,
    /// Zero-based line number in the document at parse time.
    pub index: usize,
}

static PENDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s*\[\s*\]\s*(.+)$").expect("pending task pattern"));

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*\]").expect("unchecked marker pattern"));

/// Extract pending tasks from a checklist document, in document order.
///
/// Checked items (`- [x]`) and non-checklist lines are ignored. Leading
/// whitespace before the `-` is tolerated. A document with zero matches
/// yields an empty list.
pub fn parse_tasks(doc: &str) -> Vec<Task> {
    let mut tasks = Vec::new();
    for (index, raw) in doc.lines().enumerate() {
        let line = raw.trim();
        if let Some(caps) = PENDING_RE.captures(line) {
            tasks.push(Task {
                text: caps[1].trim().to_string(),
                line: line.to_string(),
                index,
            });
        }
    }
    tasks
}

/// Rewrite the unchecked marker of `task`'s line to `[x]`.
///
/// The line is located by stored index first; if the document shifted since
/// parse time, falls back to the first line whose trimmed text matches the
/// anchor. Returns the rewritten document, or `None` when the line can no
/// longer be found (already marked, edited away, or anchor mismatch).
pub fn mark_line_done(doc: &str, task: &Task) -> Option<String> {
    let mut lines: Vec<String> = doc.lines().map(str::to_string).collect();
    let index = locate_line(&lines, task)?;
    lines[index] = MARKER_RE.replace(&lines[index], "[x]").into_owned();

    let mut updated = lines.join("\n");
    if doc.ends_with('\n') {
        updated.push('\n');
    }
    Some(updated)
}

fn locate_line(lines: &[String], task: &Task) -> Option<usize> {
    if lines.get(task.index).map(|l| l.trim()) == Some(task.line.as_str()) {
        return Some(task.index);
    }
    lines.iter().position(|l| l.trim() == task.line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pending_items_in_document_order() {
        let doc = "- [ ] A\n- [x] B\n- [ ] C\nnot a task\n";
        let tasks = parse_tasks(doc);
        let texts: Vec<&str> = tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "C"]);
    }

    #[test]
    fn tolerates_leading_whitespace_and_padded_marker() {
        let doc = "  - [  ] indented task\n";
        let tasks = parse_tasks(doc);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "indented task");
        assert_eq!(tasks[0].index, 0);
    }

    #[test]
    fn empty_document_yields_no_tasks() {
        assert!(parse_tasks("").is_empty());
        assert!(parse_tasks("# heading\nplain text\n").is_empty());
    }

    #[test]
    fn mark_rewrites_only_the_originating_line_among_duplicates() {
        let doc = "- [ ] dup\n- [ ] dup\n";
        let tasks = parse_tasks(doc);
        let updated = mark_line_done(doc, &tasks[1]).expect("mark");
        assert_eq!(updated, "- [ ] dup\n- [x] dup\n");
    }

    #[test]
    fn mark_falls_back_to_text_match_when_lines_shift() {
        let doc = "- [ ] keep\n";
        let tasks = parse_tasks(doc);
        let shifted = format!("# new heading\n{doc}");
        let updated = mark_line_done(&shifted, &tasks[0]).expect("mark");
        assert_eq!(updated, "# new heading\n- [x] keep\n");
    }

    #[test]
    fn marked_task_no_longer_parses_as_pending() {
        let doc = "- [ ] only\n";
        let tasks = parse_tasks(doc);
        let updated = mark_line_done(doc, &tasks[0]).expect("mark");
        assert!(parse_tasks(&updated).is_empty());
    }

    #[test]
    fn mark_returns_none_when_line_is_gone() {
        let doc = "- [ ] gone\n";
        let tasks = parse_tasks(doc);
        assert!(mark_line_done("- [x] gone\n", &tasks[0]).is_none());
    }
}
