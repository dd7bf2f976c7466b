use thiserror::Error;

/// Errors from the `Symbol`/`StringTable` interner.
#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("failed to intern string: {0}")]
    InternFailed(String),
    #[error("symbol index {index} not found in string table")]
    NotFound { index: u32 },
}

pub type SymbolResult<T> = Result<T, SymbolError>;

/// Errors from `SourceMap`/`SourceFile` lookups.
#[derive(Debug, Error)]
pub enum SourceMapError {
    #[error("source file not found: {0}")]
    FileNotFound(String),
    #[error("invalid span: start {start} > end {end}")]
    InvalidSpan { start: u32, end: u32 },
    #[error("span [{span_start}, {span_end}) out of bounds for file of length {file_len}")]
    SpanOutOfBounds {
        file_len: usize,
        span_start: u32,
        span_end: u32,
    },
    #[error("invalid line number {line}, file has {max_lines} lines")]
    InvalidLineNumber { line: u32, max_lines: usize },
    #[error("failed to extract source text: {0}")]
    ExtractFailed(String),
}

pub type SourceMapResult<T> = Result<T, SourceMapError>;

/// Errors from `IndexVec` bounds checks exposed via fallible accessors.
#[derive(Debug, Error)]
pub enum IndexVecError {
    #[error("index {index} out of bounds for vector of length {length}")]
    OutOfBounds { index: usize, length: usize },
    #[error("invalid index: {0}")]
    InvalidIndex(String),
}

pub type IndexVecResult<T> = Result<T, IndexVecError>;

/// Errors from diagnostic construction/formatting.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error("failed to format diagnostic: {0}")]
    FormatFailed(String),
    #[error("invalid diagnostic code: {0}")]
    InvalidCode(String),
}

pub type DiagnosticResult<T> = Result<T, DiagnosticError>;

/// Fatal lowering failures: malformed-AST invariant violations that abort
/// the module rather than degrading to a conservative fallback (spec §7 —
/// everything else a resolution pass can fail at is non-fatal and handled
/// by fallback values, not this error type).
#[derive(Debug, Error)]
pub enum LoweringError {
    #[error("malformed AST: {0}")]
    MalformedAst(String),
    #[error("internal invariant violated during lowering: {0}")]
    InvariantViolation(String),
}

pub type LoweringResult<T> = Result<T, LoweringError>;
