/// A stable, documentation-linkable error/warning code, e.g. `E1002`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    prefix: &'static str,
    number: u32,
}

impl DiagnosticCode {
    pub const fn new(prefix: &'static str, number: u32) -> Self {
        DiagnosticCode { prefix, number }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn as_str(&self) -> String {
        format!("{}{:04}", self.prefix, self.number)
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// General resolution errors (spec §7: unresolved symbol / unknown type /
// ambiguous constructor delegation / unknown method descriptor are all
// non-fatal during lowering — these codes are attached to the diagnostics
// AstToHir emits, not raised as Rust errors).
pub const E_UNRESOLVED_SYMBOL: DiagnosticCode = DiagnosticCode::new("E", 1001);
pub const E_UNKNOWN_TYPE: DiagnosticCode = DiagnosticCode::new("E", 1002);
pub const E_AMBIGUOUS_CTOR_DELEGATION: DiagnosticCode = DiagnosticCode::new("E", 1003);
pub const E_UNKNOWN_METHOD_DESCRIPTOR: DiagnosticCode = DiagnosticCode::new("E", 1004);
pub const E_DUPLICATE_DECLARATION: DiagnosticCode = DiagnosticCode::new("E", 1005);

// Lexer/parser boundary codes (kept as named-interface placeholders since
// novalang-ast has no lexer/parser logic of its own, but the AstToHir
// diagnostic surface still needs codes a future parser integration can
// reuse without renumbering).
pub const E_PARSER_UNEXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new("E", 2001);
pub const E_PARSER_EXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new("E", 2002);
pub const E_PARSER_UNEXPECTED_EOF: DiagnosticCode = DiagnosticCode::new("E", 2003);

// Warnings.
pub const W_UNUSED_VARIABLE: DiagnosticCode = DiagnosticCode::new("W", 1);
pub const W_UNUSED_FUNCTION: DiagnosticCode = DiagnosticCode::new("W", 2);
pub const W_UNREACHABLE_CODE: DiagnosticCode = DiagnosticCode::new("W", 3);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_prefix_plus_zero_padded_number() {
        assert_eq!(E_UNRESOLVED_SYMBOL.as_str(), "E1001");
        assert_eq!(W_UNUSED_VARIABLE.as_str(), "W0001");
    }

    #[test]
    fn codes_with_same_prefix_and_number_are_equal() {
        assert_eq!(DiagnosticCode::new("E", 1001), E_UNRESOLVED_SYMBOL);
    }
}
