//! Named-interface stubs for the two consumers of a lowered module: a
//! bytecode emitter and a tree-walking interpreter. Neither does any real
//! codegen here — that surface is out of scope for this pipeline — but the
//! trait boundary is real so a downstream crate can implement it without
//! reaching back into `novalang-mir`'s internals.

use novalang_mir::MirModule;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend does not support this target yet")]
    Unsupported,
}

pub trait Backend {
    fn name(&self) -> &'static str;
    fn emit(&self, module: &MirModule) -> Result<(), BackendError>;
}

/// Stands in for a JVM-style bytecode emitter reading `MirInst`/`Opcode`
/// directly off of a `MirModule`.
pub struct BytecodeBackend;

impl Backend for BytecodeBackend {
    fn name(&self) -> &'static str {
        "bytecode"
    }

    fn emit(&self, _module: &MirModule) -> Result<(), BackendError> {
        Err(BackendError::Unsupported)
    }
}

/// Stands in for a tree-walking/MIR-walking interpreter.
pub struct InterpreterBackend;

impl Backend for InterpreterBackend {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn emit(&self, _module: &MirModule) -> Result<(), BackendError> {
        Err(BackendError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_backends_report_their_name() {
        assert_eq!(BytecodeBackend.name(), "bytecode");
        assert_eq!(InterpreterBackend.name(), "interpreter");
    }

    #[test]
    fn stub_backends_refuse_to_emit() {
        let module = MirModule::default();
        assert!(matches!(BytecodeBackend.emit(&module), Err(BackendError::Unsupported)));
        assert!(matches!(InterpreterBackend.emit(&module), Err(BackendError::Unsupported)));
    }
}
