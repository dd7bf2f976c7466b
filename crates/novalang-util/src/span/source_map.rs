use std::sync::Arc;

use super::FileId;

/// A single source file registered with a [`SourceMap`].
///
/// `line_starts` records the byte offset of the first character of every
/// line (line 0 always starts at offset 0), enabling O(log n) offset-to-
/// line/column lookups via binary search.
pub struct SourceFile {
    id: FileId,
    name: String,
    content: Arc<str>,
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    pub fn new(id: FileId, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let mut line_starts = vec![0usize];
        for (offset, ch) in content.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            id,
            name: name.into(),
            content,
            line_starts: line_starts.into(),
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_start(&self, line: u32) -> Option<usize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Binary search over `line_starts` to find `(line, column)` for a byte offset.
    pub fn offset_to_line_col(&self, offset: usize) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let start = self.line_starts[line];
        let column = self.content[start..offset.min(self.content.len())]
            .chars()
            .count();
        (line as u32, column as u32)
    }

    pub fn line_at_offset(&self, offset: usize) -> &str {
        let (line, _) = self.offset_to_line_col(offset);
        self.line_at(line).unwrap_or("")
    }

    pub fn line_at(&self, line: u32) -> Option<&str> {
        let start = *self.line_starts.get(line as usize)?;
        let end = self
            .line_starts
            .get(line as usize + 1)
            .copied()
            .unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches('\n'))
    }

    pub fn extract(&self, start: usize, end: usize) -> Option<&str> {
        self.content.get(start..end)
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("lines", &self.line_count())
            .finish()
    }
}

/// Registry of source files, used by the diagnostic renderer to turn a
/// [`Span`](super::Span) into a printable snippet.
#[derive(Default)]
pub struct SourceMap {
    files: Vec<Arc<SourceFile>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let id = FileId::new(self.files.len());
        self.files.push(Arc::new(SourceFile::new(id, name, content)));
        id
    }

    pub fn get(&self, id: FileId) -> Option<&Arc<SourceFile>> {
        self.files.get(id.index())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Render a `--> file:line:col` header plus the offending line and a
    /// caret underline, matching the style diagnostic output uses everywhere
    /// in this pipeline.
    pub fn format_span(&self, span: super::Span) -> String {
        let Some(file) = self.get(span.file_id) else {
            return format!("<unknown file>:{}:{}", span.line, span.column);
        };
        let line_text = file.line_at(span.line).unwrap_or("");
        let caret_count = span.len().max(1);
        format!(
            "--> {}:{}:{}\n{}\n{}{}",
            file.name(),
            span.line + 1,
            span.column + 1,
            line_text,
            " ".repeat(span.column as usize),
            "^".repeat(caret_count)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_starts_are_computed() {
        let file = SourceFile::new(FileId::new(0), "t.nova", "fun a() {}\nfun b() {}\n");
        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line_at(0), Some("fun a() {}"));
        assert_eq!(file.line_at(1), Some("fun b() {}"));
    }

    #[test]
    fn empty_file_has_one_line() {
        let file = SourceFile::new(FileId::new(0), "empty.nova", "");
        assert_eq!(file.line_count(), 1);
        assert_eq!(file.line_at(0), Some(""));
    }

    #[test]
    fn offset_to_line_col_resolves_multiline() {
        let file = SourceFile::new(FileId::new(0), "t.nova", "class A {\n  val x = 1\n}");
        let (line, col) = file.offset_to_line_col(13);
        assert_eq!(line, 1);
        assert_eq!(col, 2);
    }

    #[test]
    fn source_map_round_trips_spans() {
        let mut map = SourceMap::new();
        let id = map.add_file("t.nova", "val x = 1\n");
        let span = super::super::Span::new(4, 5, 0, 4, id);
        let rendered = map.format_span(span);
        assert!(rendered.contains("t.nova:1:5"));
        assert!(rendered.contains('^'));
    }
}
