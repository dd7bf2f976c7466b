//! Successor/predecessor analysis over a lowered function's basic blocks.
//! No dominator computation — nothing downstream of this crate needs it
//! (see DESIGN.md); reachability is enough to let tests and a pretty-printer
//! sanity-check a lowering without walking raw terminators by hand.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::mir::{BlockId, MirFunction, Terminator};

pub struct ControlFlowGraph {
    pub predecessors: HashMap<BlockId, HashSet<BlockId>>,
    pub successors: HashMap<BlockId, HashSet<BlockId>>,
}

impl ControlFlowGraph {
    pub fn new(function: &MirFunction) -> Self {
        let mut predecessors: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
        let mut successors: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();

        for (block_id, _) in function.blocks.iter_enumerated() {
            predecessors.entry(block_id).or_default();
            successors.entry(block_id).or_default();
        }

        for (block_id, block) in function.blocks.iter_enumerated() {
            for target in terminator_targets(&block.terminator) {
                successors.entry(block_id).or_default().insert(target);
                predecessors.entry(target).or_default().insert(block_id);
            }
        }

        ControlFlowGraph {
            predecessors,
            successors,
        }
    }

    pub fn is_reachable(&self, block: BlockId, entry: BlockId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(entry);
        visited.insert(entry);

        while let Some(current) = queue.pop_front() {
            if current == block {
                return true;
            }
            if let Some(succs) = self.successors.get(&current) {
                for &succ in succs {
                    if visited.insert(succ) {
                        queue.push_back(succ);
                    }
                }
            }
        }
        false
    }
}

fn terminator_targets(term: &Terminator) -> Vec<BlockId> {
    match term {
        Terminator::Goto(target) => vec![*target],
        Terminator::Branch { then_block, else_block, .. } => vec![*then_block, *else_block],
        Terminator::Switch { targets, default, .. } => {
            let mut out: Vec<BlockId> = targets.iter().map(|(_, id)| *id).collect();
            out.push(*default);
            out
        }
        Terminator::Return(_) | Terminator::ReturnVoid | Terminator::Throw(_) | Terminator::Unreachable => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novalang_util::{Idx, Symbol};

    use crate::mir::MirType;

    #[test]
    fn linear_goto_chain_is_fully_reachable() {
        let mut function = MirFunction::new(Symbol::intern("f"), MirType::Void);
        let b0 = function.blocks.push(crate::mir::BasicBlock {
            id: BlockId::from_usize(0),
            instructions: vec![],
            terminator: Terminator::Goto(BlockId::from_usize(1)),
        });
        let b1 = function.blocks.push(crate::mir::BasicBlock {
            id: BlockId::from_usize(1),
            instructions: vec![],
            terminator: Terminator::ReturnVoid,
        });
        let cfg = ControlFlowGraph::new(&function);
        assert!(cfg.is_reachable(b1, b0));
    }

    #[test]
    fn unreferenced_block_is_unreachable() {
        let mut function = MirFunction::new(Symbol::intern("f"), MirType::Void);
        let b0 = function.blocks.push(crate::mir::BasicBlock {
            id: BlockId::from_usize(0),
            instructions: vec![],
            terminator: Terminator::ReturnVoid,
        });
        let dead = function.blocks.push(crate::mir::BasicBlock {
            id: BlockId::from_usize(1),
            instructions: vec![],
            terminator: Terminator::Unreachable,
        });
        let cfg = ControlFlowGraph::new(&function);
        assert!(!cfg.is_reachable(dead, b0));
    }
}
