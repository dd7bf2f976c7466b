//! A human-readable rendering of a lowered module, useful for golden-file
//! tests and for reading a lowering's output without attaching a debugger.

use std::fmt::Write as _;

use crate::mir::*;

pub fn print_module(module: &MirModule) -> String {
    let mut out = String::new();
    if let Some(package) = &module.package {
        let _ = writeln!(out, "package {package}");
    }
    for class in &module.classes {
        print_class(&mut out, class);
    }
    for function in &module.functions {
        print_function(&mut out, function, 0);
    }
    out
}

fn print_class(out: &mut String, class: &MirClass) {
    let _ = writeln!(out, "{:?} {} : {} {{", class.kind, class.internal_name, class.super_class);
    for field in &class.fields {
        let _ = writeln!(out, "  field {} {}", field.name, field.ty.descriptor_char());
    }
    for method in &class.methods {
        print_function(out, method, 1);
    }
    let _ = writeln!(out, "}}");
}

fn print_function(out: &mut String, function: &MirFunction, indent: usize) {
    let pad = "  ".repeat(indent);
    let descriptor = function.descriptor.clone().unwrap_or_default();
    let _ = writeln!(out, "{pad}fn {}{descriptor} {{", function.name);
    for (id, local) in function.locals.iter_enumerated() {
        let name = local.name.map(|n| n.to_string()).unwrap_or_else(|| "_".to_string());
        let _ = writeln!(out, "{pad}  local %{} : {} = {}", id.as_u32(), local.ty.descriptor_char(), name);
    }
    for (id, block) in function.blocks.iter_enumerated() {
        let _ = writeln!(out, "{pad}  block{}:", id.as_u32());
        for inst in &block.instructions {
            print_inst(out, inst, indent + 2);
        }
        print_terminator(out, &block.terminator, indent + 2);
    }
    for entry in &function.try_catch_entries {
        let exc = entry.exception_internal_name.as_deref().unwrap_or("*");
        let _ = writeln!(
            out,
            "{pad}  try block{}..block{} -> block{} catch {exc}",
            entry.start_block.as_u32(),
            entry.end_block.as_u32(),
            entry.handler_block.as_u32()
        );
    }
    let _ = writeln!(out, "{pad}}}");
}

fn print_inst(out: &mut String, inst: &MirInst, indent: usize) {
    let pad = "  ".repeat(indent);
    let dest = inst.destination.map(|d| format!("%{} = ", d.as_u32())).unwrap_or_default();
    let operands: Vec<String> = inst.operands.iter().map(|o| format!("%{}", o.as_u32())).collect();
    let _ = writeln!(out, "{pad}{dest}{:?}({})", inst.opcode, operands.join(", "));
}

fn print_terminator(out: &mut String, term: &Terminator, indent: usize) {
    let pad = "  ".repeat(indent);
    match term {
        Terminator::Return(local) => {
            let _ = writeln!(out, "{pad}return %{}", local.as_u32());
        }
        Terminator::ReturnVoid => {
            let _ = writeln!(out, "{pad}return");
        }
        Terminator::Goto(target) => {
            let _ = writeln!(out, "{pad}goto block{}", target.as_u32());
        }
        Terminator::Branch { cond, then_block, else_block } => {
            let _ = writeln!(out, "{pad}branch %{} ? block{} : block{}", cond.as_u32(), then_block.as_u32(), else_block.as_u32());
        }
        Terminator::Switch { discriminant, targets, default } => {
            let _ = writeln!(out, "{pad}switch %{}", discriminant.as_u32());
            for (key, target) in targets {
                let _ = writeln!(out, "{pad}  {key:?} -> block{}", target.as_u32());
            }
            let _ = writeln!(out, "{pad}  else -> block{}", default.as_u32());
        }
        Terminator::Throw(local) => {
            let _ = writeln!(out, "{pad}throw %{}", local.as_u32());
        }
        Terminator::Unreachable => {
            let _ = writeln!(out, "{pad}unreachable");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novalang_util::Symbol;

    #[test]
    fn prints_an_empty_function_signature() {
        let mut builder = crate::builder::Builder::new(Symbol::intern("main"), MirType::Void);
        let entry = builder.new_block();
        builder.set_current_block(entry);
        builder.terminate(Terminator::ReturnVoid);
        let func = builder.build();
        let rendered = {
            let mut out = String::new();
            print_function(&mut out, &func, 0);
            out
        };
        assert!(rendered.contains("fn main"));
        assert!(rendered.contains("return"));
    }
}
