//! Unified diff parsing.
//!
//! Parses `git diff` output into file sections, hunks and body lines. Hunk
//! bodies are consumed by the line counts in their `@@` headers, so a removed
//! line that happens to start with `-- ` is never mistaken for a file header.
//!
//! Headerless fragments (only `+`, `-` and ` ` lines, no `@@` header anywhere)
//! are accepted as a single implicit hunk.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::BumpGateError;

static HUNK_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap()
});

/// Extended header lines git may emit between `diff --git` and the hunks.
const EXTENDED_HEADERS: &[&str] = &[
    "index ",
    "old mode ",
    "new mode ",
    "deleted file mode ",
    "new file mode ",
    "similarity index ",
    "dissimilarity index ",
    "rename from ",
    "rename to ",
    "copy from ",
    "copy to ",
    "Binary files ",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Added(String),
    Removed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
    pub lines: Vec<DiffLine>,
}

/// One file section of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// Path on the old side, `None` for `/dev/null` or when no header exists.
    pub old_path: Option<String>,
    /// Path on the new side, `None` for `/dev/null` or when no header exists.
    pub new_path: Option<String>,
    pub is_new_file: bool,
    pub is_deleted_file: bool,
    /// 1-based line where this section starts.
    pub header_line: usize,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// The path this section describes, preferring the new side.
    pub fn path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }

    pub fn added_lines(&self) -> impl Iterator<Item = &str> {
        self.hunks.iter().flat_map(|h| &h.lines).filter_map(|l| match l {
            DiffLine::Added(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn removed_lines(&self) -> impl Iterator<Item = &str> {
        self.hunks.iter().flat_map(|h| &h.lines).filter_map(|l| match l {
            DiffLine::Removed(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn context_lines(&self) -> impl Iterator<Item = &str> {
        self.hunks.iter().flat_map(|h| &h.lines).filter_map(|l| match l {
            DiffLine::Context(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedDiff {
    pub files: Vec<FileDiff>,
}

impl UnifiedDiff {
    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|f| f.hunks.iter().all(|h| h.lines.is_empty()))
    }

    /// Parses unified diff text.
    ///
    /// # Errors
    ///
    /// Returns [`BumpGateError::MalformedDiff`] with the 1-based line number
    /// for a broken hunk header, an unexpected line inside or between hunks,
    /// or a hunk whose body does not match its declared line counts.
    pub fn parse(text: &str) -> Result<Self, BumpGateError> {
        let headerless = !text.lines().any(|l| l.starts_with("@@"));
        let mut parser = Parser::default();

        for (idx, line) in text.lines().enumerate() {
            parser.line(idx + 1, line, headerless)?;
        }
        parser.finish(text.lines().count())
    }
}

#[derive(Debug, Default)]
struct Parser {
    files: Vec<FileDiff>,
    /// Remaining (old, new) body lines of the open hunk.
    open: Option<(u32, u32)>,
    /// Whether the current section already had its `---` line.
    old_header_seen: bool,
}

impl Parser {
    fn current_file(&mut self, line_no: usize) -> &mut FileDiff {
        if self.files.is_empty() {
            self.files.push(FileDiff {
                header_line: line_no,
                ..FileDiff::default()
            });
        }
        let last = self.files.len() - 1;
        &mut self.files[last]
    }

    fn current_hunk(&mut self, line_no: usize) -> &mut Hunk {
        let file = self.current_file(line_no);
        if file.hunks.is_empty() {
            file.hunks.push(Hunk::default());
        }
        let last = file.hunks.len() - 1;
        &mut file.hunks[last]
    }

    fn line(&mut self, line_no: usize, line: &str, headerless: bool) -> Result<(), BumpGateError> {
        if let Some((old_left, new_left)) = self.open {
            return self.hunk_body(line_no, line, old_left, new_left);
        }

        if line.starts_with("\\") {
            // "\ No newline at end of file" after the last body line.
            return Ok(());
        }
        if let Some(rest) = line.strip_prefix("diff ") {
            self.files.push(FileDiff {
                header_line: line_no,
                ..FileDiff::default()
            });
            self.old_header_seen = false;
            if let Some((old, new)) = parse_git_header_paths(rest) {
                let file = self.current_file(line_no);
                file.old_path = Some(old);
                file.new_path = Some(new);
            }
            return Ok(());
        }
        if line.starts_with("@@") {
            return self.hunk_header(line_no, line);
        }
        if let Some(path) = line.strip_prefix("--- ") {
            if !headerless || looks_like_header_path(path) {
                let reuse = !self.old_header_seen
                    && self.files.last().is_some_and(|f| f.hunks.is_empty());
                if !reuse {
                    self.files.push(FileDiff {
                        header_line: line_no,
                        ..FileDiff::default()
                    });
                }
                self.old_header_seen = true;
                let file = self.current_file(line_no);
                file.old_path = header_path(path, "a/");
                if file.old_path.is_none() {
                    file.is_new_file = true;
                }
                return Ok(());
            }
        }
        if let Some(path) = line.strip_prefix("+++ ") {
            if !headerless || looks_like_header_path(path) {
                let file = self.current_file(line_no);
                file.new_path = header_path(path, "b/");
                if file.new_path.is_none() {
                    file.is_deleted_file = true;
                }
                return Ok(());
            }
        }
        if line.starts_with("new file mode ") {
            self.current_file(line_no).is_new_file = true;
            return Ok(());
        }
        if line.starts_with("deleted file mode ") {
            self.current_file(line_no).is_deleted_file = true;
            return Ok(());
        }
        if EXTENDED_HEADERS.iter().any(|h| line.starts_with(h)) {
            return Ok(());
        }

        if headerless {
            let body = match line.chars().next() {
                Some('+') => DiffLine::Added(line[1..].to_string()),
                Some('-') => DiffLine::Removed(line[1..].to_string()),
                Some(' ') => DiffLine::Context(line[1..].to_string()),
                None => return Ok(()),
                Some(_) => {
                    return Err(BumpGateError::malformed(
                        line_no,
                        format!("expected a diff line, found '{}'", truncate(line)),
                    ));
                }
            };
            self.current_hunk(line_no).lines.push(body);
            return Ok(());
        }

        if line.trim().is_empty() {
            return Ok(());
        }

        Err(BumpGateError::malformed(
            line_no,
            format!("unexpected line outside a hunk: '{}'", truncate(line)),
        ))
    }

    fn hunk_header(&mut self, line_no: usize, line: &str) -> Result<(), BumpGateError> {
        let caps = HUNK_HEADER_RE.captures(line).ok_or_else(|| {
            BumpGateError::malformed(line_no, format!("invalid hunk header '{}'", truncate(line)))
        })?;

        let number = |i: usize, default: u32| -> Result<u32, BumpGateError> {
            match caps.get(i) {
                Some(m) => m.as_str().parse::<u32>().map_err(|_| {
                    BumpGateError::malformed(line_no, "hunk header number out of range")
                }),
                None => Ok(default),
            }
        };

        let hunk = Hunk {
            old_start: number(1, 0)?,
            old_len: number(2, 1)?,
            new_start: number(3, 0)?,
            new_len: number(4, 1)?,
            lines: Vec::new(),
        };

        if hunk.old_len > 0 || hunk.new_len > 0 {
            self.open = Some((hunk.old_len, hunk.new_len));
        }
        self.current_file(line_no).hunks.push(hunk);
        Ok(())
    }

    fn hunk_body(
        &mut self,
        line_no: usize,
        line: &str,
        old_left: u32,
        new_left: u32,
    ) -> Result<(), BumpGateError> {
        let overflow = || BumpGateError::malformed(line_no, "hunk body longer than its header declares");

        let (body, old_left, new_left) = match line.chars().next() {
            // Some tools strip the single space from empty context lines.
            None => (DiffLine::Context(String::new()), old_left.checked_sub(1), new_left.checked_sub(1)),
            Some(' ') => (DiffLine::Context(line[1..].to_string()), old_left.checked_sub(1), new_left.checked_sub(1)),
            Some('+') => (DiffLine::Added(line[1..].to_string()), Some(old_left), new_left.checked_sub(1)),
            Some('-') => (DiffLine::Removed(line[1..].to_string()), old_left.checked_sub(1), Some(new_left)),
            Some('\\') => return Ok(()),
            Some(_) => {
                return Err(BumpGateError::malformed(
                    line_no,
                    format!(
                        "hunk ended early ({old_left} old / {new_left} new lines missing) at '{}'",
                        truncate(line)
                    ),
                ));
            }
        };

        let (Some(old_left), Some(new_left)) = (old_left, new_left) else {
            return Err(overflow());
        };

        self.current_hunk(line_no).lines.push(body);
        self.open = if old_left == 0 && new_left == 0 {
            None
        } else {
            Some((old_left, new_left))
        };
        Ok(())
    }

    fn finish(self, last_line: usize) -> Result<UnifiedDiff, BumpGateError> {
        if let Some((old_left, new_left)) = self.open {
            return Err(BumpGateError::malformed(
                last_line,
                format!("diff truncated: hunk is missing {old_left} old / {new_left} new lines"),
            ));
        }
        Ok(UnifiedDiff { files: self.files })
    }
}

fn looks_like_header_path(path: &str) -> bool {
    path.starts_with("a/") || path.starts_with("b/") || path.starts_with("/dev/null")
}

/// Strips the `a/` or `b/` prefix; `None` for `/dev/null`.
fn header_path(raw: &str, prefix: &str) -> Option<String> {
    // git appends a tab before timestamps in some formats.
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    if raw == "/dev/null" {
        return None;
    }
    let raw = raw.trim_matches('"');
    Some(raw.strip_prefix(prefix).unwrap_or(raw).to_string())
}

/// Splits the `a/... b/...` part of a `diff --git` line.
fn parse_git_header_paths(rest: &str) -> Option<(String, String)> {
    let rest = rest.strip_prefix("--git ")?;
    let rest = rest.strip_prefix("a/")?;
    let split = rest.find(" b/")?;
    Some((rest[..split].to_string(), rest[split + 3..].to_string()))
}

fn truncate(line: &str) -> String {
    const MAX: usize = 60;
    if line.chars().count() <= MAX {
        line.to_string()
    } else {
        let cut: String = line.chars().take(MAX).collect();
        format!("{cut}...")
    }
}
