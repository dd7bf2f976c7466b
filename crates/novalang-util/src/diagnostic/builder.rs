use crate::span::Span;

use super::codes::DiagnosticCode;
use super::{Diagnostic, Handler, Level};

/// A labeled excerpt of source text attached to a diagnostic, rendered
/// underneath the primary message.
#[derive(Debug, Clone)]
pub struct SourceSnippet {
    pub line: String,
    pub line_number: u32,
    pub start_column: u32,
    pub end_column: u32,
    pub label: Option<String>,
}

impl SourceSnippet {
    pub fn new(line: impl Into<String>, line_number: u32, start_column: u32, end_column: u32) -> Self {
        SourceSnippet {
            line: line.into(),
            line_number,
            start_column,
            end_column,
            label: None,
        }
    }

    pub fn point(line: impl Into<String>, line_number: u32, column: u32) -> Self {
        SourceSnippet::new(line, line_number, column, column + 1)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn format(&self) -> String {
        let underline_len = self
            .end_column
            .saturating_sub(self.start_column)
            .max(1) as usize;
        let mut out = format!(
            "{:>4} | {}\n     | {}{}",
            self.line_number + 1,
            self.line,
            " ".repeat(self.start_column as usize),
            "^".repeat(underline_len)
        );
        if let Some(label) = &self.label {
            out.push(' ');
            out.push_str(label);
        }
        out
    }
}

/// Fluent builder for a [`Diagnostic`], mirroring the call style used
/// throughout `AstToHir`'s resolution diagnostics: `builder.error(...)
/// .span(...).code(...).note(...).build()`.
pub struct DiagnosticBuilder {
    level: Level,
    message: String,
    span: Option<Span>,
    code: Option<DiagnosticCode>,
    notes: Vec<String>,
    helps: Vec<String>,
    snippets: Vec<SourceSnippet>,
}

impl DiagnosticBuilder {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        DiagnosticBuilder {
            level,
            message: message.into(),
            span: None,
            code: None,
            notes: Vec::new(),
            helps: Vec::new(),
            snippets: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        DiagnosticBuilder::new(Level::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        DiagnosticBuilder::new(Level::Warning, message)
    }

    pub fn code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.helps.push(help.into());
        self
    }

    pub fn with_note(self, note: impl Into<String>) -> Self {
        self.note(note)
    }

    pub fn with_help(self, help: impl Into<String>) -> Self {
        self.help(help)
    }

    pub fn snippet(mut self, snippet: SourceSnippet) -> Self {
        self.snippets.push(snippet);
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            level: self.level,
            message: self.message,
            span: self.span,
            code: self.code,
            notes: self.notes,
            helps: self.helps,
            snippets: self.snippets,
        }
    }

    pub fn emit(self, handler: &Handler) {
        handler.emit_diagnostic(self.build());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    #[test]
    fn builder_collects_notes_and_helps() {
        let diag = DiagnosticBuilder::error("unresolved symbol `foo`")
            .code(super::super::codes::E_UNRESOLVED_SYMBOL)
            .note("checked all imports")
            .help("did you mean `food`?")
            .build();
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.helps.len(), 1);
        assert_eq!(diag.level, Level::Error);
    }

    #[test]
    fn snippet_formats_caret_underline() {
        let snippet = SourceSnippet::new("val x = foo", 3, 8, 11).with_label("not found");
        let formatted = snippet.format();
        assert!(formatted.contains("^^^"));
        assert!(formatted.contains("not found"));
    }

    #[test]
    fn builder_attaches_span() {
        let span = Span::new(0, 3, 0, 0, FileId::new(0));
        let diag = DiagnosticBuilder::warning("unused variable").span(span).build();
        assert_eq!(diag.span, Some(span));
    }
}
