use novalang_util::{IndexVec, Span, Symbol, Idx};

use crate::mir::*;

/// Accumulates one `MirFunction`'s locals and basic blocks as the lowering
/// pass walks a HIR body, grounded on the straight-line accumulate-then-build
/// pattern used by every stage of this pipeline.
pub struct Builder {
    function: MirFunction,
    current_block: BlockId,
}

impl Builder {
    pub fn new(name: Symbol, return_type: MirType) -> Self {
        Builder {
            function: MirFunction::new(name, return_type),
            current_block: BlockId::from_usize(0),
        }
    }

    pub fn add_local(&mut self, ty: MirType, name: Option<Symbol>) -> LocalId {
        self.function.locals.push(MirLocal { name, ty })
    }

    pub fn fresh_temp(&mut self, ty: MirType) -> LocalId {
        self.add_local(ty, None)
    }

    pub fn new_block(&mut self) -> BlockId {
        self.function.blocks.push(BasicBlock {
            id: BlockId::from_usize(self.function.blocks.len()),
            instructions: Vec::new(),
            terminator: Terminator::Unreachable,
        })
    }

    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    pub fn set_current_block(&mut self, block: BlockId) {
        self.current_block = block;
    }

    pub fn push(&mut self, inst: MirInst) {
        self.function.blocks[self.current_block].instructions.push(inst);
    }

    pub fn emit(
        &mut self,
        opcode: Opcode,
        destination: Option<LocalId>,
        operands: Vec<LocalId>,
        immediate: Option<Immediate>,
        span: Span,
    ) {
        self.push(MirInst {
            opcode,
            destination,
            operands,
            immediate,
            span,
        });
    }

    pub fn terminate(&mut self, terminator: Terminator) {
        self.function.blocks[self.current_block].terminator = terminator;
    }

    /// Inspects the current block's terminator without closing it. Lowering
    /// uses this to tell whether a nested construct (try body, when arm)
    /// already diverged, so the caller knows whether to append a `Goto`.
    pub fn peek_terminator(&self) -> Terminator {
        self.function.blocks[self.current_block].terminator.clone()
    }

    pub fn add_try_catch(&mut self, entry: TryCatchEntry) {
        self.function.try_catch_entries.push(entry);
    }

    pub fn set_body_start(&mut self, block: BlockId) {
        self.function.body_start_block_id = Some(block);
    }

    pub fn set_super_init_args(&mut self, locals: Vec<LocalId>) {
        self.function.super_init_arg_locals = Some(locals);
    }

    pub fn set_delegation_args(&mut self, locals: Vec<LocalId>) {
        self.function.delegation_arg_locals = Some(locals);
    }

    pub fn locals_mut(&mut self) -> &mut IndexVec<LocalId, MirLocal> {
        &mut self.function.locals
    }

    /// Finishes the function, filling in a trivial entry block if the body
    /// never allocated one (an abstract method, for instance).
    pub fn build(mut self) -> MirFunction {
        if self.function.blocks.is_empty() {
            self.new_block();
        }
        self.function
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_ids_are_dense_starting_at_zero() {
        let mut builder = Builder::new(Symbol::intern("f"), MirType::Void);
        let b0 = builder.new_block();
        let b1 = builder.new_block();
        assert_eq!(b0.as_u32(), 0);
        assert_eq!(b1.as_u32(), 1);
    }

    #[test]
    fn build_synthesizes_an_entry_block_when_none_was_allocated() {
        let builder = Builder::new(Symbol::intern("f"), MirType::Void);
        let function = builder.build();
        assert_eq!(function.blocks.len(), 1);
    }
}
