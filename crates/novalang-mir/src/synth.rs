//! Synthetic method generation (spec §4.4): bodies the source program never
//! wrote but every backend expects — field-init constructors, enum
//! bookkeeping, and property accessor shims.

use novalang_hir::{HirAccessor, HirClass, HirField};
use novalang_util::{Span, Symbol};

use crate::builder::Builder;
use crate::lower::LoweringContext;
use crate::mir::*;

/// A class with parameter-backed fields and no declared constructor gets one
/// that stores each field from an identically-named, identically-typed
/// parameter, in declaration order.
pub fn field_init_constructor(ctx: &mut LoweringContext, class: &HirClass) -> MirFunction {
    let mut builder = Builder::new(Symbol::intern("<init>"), MirType::Void);
    let this_local = builder.add_local(MirType::Object(class.internal_name.clone()), Some(Symbol::KW_THIS));

    let mut params = Vec::new();
    for field in &class.fields {
        let local = builder.add_local(MirType::from_hir(&field.ty), Some(field.name));
        params.push(local);
    }

    let entry = builder.new_block();
    builder.set_current_block(entry);
    builder.set_body_start(entry);

    for (field, local) in class.fields.iter().zip(&params) {
        builder.emit(
            Opcode::SetField,
            None,
            vec![this_local, *local],
            Some(Immediate::Member(class.internal_name.clone(), field.name)),
            Span::DUMMY,
        );
    }
    builder.terminate(Terminator::ReturnVoid);

    let mut func = builder.build();
    func.params = params.into_iter().map(|l| func.locals[l].clone()).collect();
    func.descriptor = Some(method_descriptor(
        &class.fields.iter().map(|f| MirType::from_hir(&f.ty)).collect::<Vec<_>>(),
        &MirType::Void,
    ));
    let _ = ctx;
    func
}

/// Enum static initializer: allocates every entry via its declared
/// constructor and stashes the result in a `$VALUES` static array, in
/// declaration order (ordinal matches index).
pub fn enum_clinit(ctx: &mut LoweringContext, class: &HirClass) -> MirFunction {
    let mut builder = Builder::new(Symbol::ID_CLINIT, MirType::Void);
    let entry = builder.new_block();
    builder.set_current_block(entry);
    builder.set_body_start(entry);

    let mut entry_locals = Vec::new();
    for (ordinal, entry_decl) in class.enum_entries.iter().enumerate() {
        let name_local = builder.fresh_temp(MirType::Object("nova/String".to_string()));
        builder.emit(Opcode::ConstString, Some(name_local), vec![], Some(Immediate::Str(entry_decl.name)), Span::DUMMY);

        let ordinal_local = builder.fresh_temp(MirType::Int);
        builder.emit(Opcode::ConstInt, Some(ordinal_local), vec![], Some(Immediate::Int(ordinal as i64)), Span::DUMMY);

        let mut ctor_args = vec![name_local, ordinal_local];
        for arg in &entry_decl.args {
            ctor_args.push(crate::lower::lower_expr(ctx, &mut builder, arg));
        }

        let instance = builder.fresh_temp(MirType::Object(class.internal_name.clone()));
        builder.emit(
            Opcode::NewObject,
            Some(instance),
            ctor_args,
            Some(Immediate::ClassName(class.internal_name.clone())),
            Span::DUMMY,
        );
        builder.emit(
            Opcode::SetStatic,
            None,
            vec![instance],
            Some(Immediate::Member(class.internal_name.clone(), entry_decl.name)),
            Span::DUMMY,
        );
        entry_locals.push(instance);
    }

    let array_local = builder.fresh_temp(MirType::array_of(&MirType::Object(class.internal_name.clone())));
    builder.emit(
        Opcode::NewTypedArray,
        Some(array_local),
        entry_locals,
        Some(Immediate::ElementType(MirType::Object(class.internal_name.clone()))),
        Span::DUMMY,
    );
    builder.emit(
        Opcode::SetStatic,
        None,
        vec![array_local],
        Some(Immediate::Member(class.internal_name.clone(), Symbol::ID_VALUES)),
        Span::DUMMY,
    );
    builder.terminate(Terminator::ReturnVoid);
    builder.build()
}

pub fn enum_name_accessor(class: &HirClass) -> MirFunction {
    field_accessor_shim(class, Symbol::ID_NAME, Symbol::intern("$name"), MirType::Object("nova/String".to_string()))
}

pub fn enum_ordinal_accessor(class: &HirClass) -> MirFunction {
    field_accessor_shim(class, Symbol::ID_ORDINAL, Symbol::intern("$ordinal"), MirType::Int)
}

fn field_accessor_shim(class: &HirClass, method_name: Symbol, backing_field: Symbol, ty: MirType) -> MirFunction {
    let mut builder = Builder::new(method_name, ty.clone());
    let this_local = builder.add_local(MirType::Object(class.internal_name.clone()), Some(Symbol::KW_THIS));
    let entry = builder.new_block();
    builder.set_current_block(entry);
    builder.set_body_start(entry);
    let dest = builder.fresh_temp(ty.clone());
    builder.emit(
        Opcode::GetField,
        Some(dest),
        vec![this_local],
        Some(Immediate::Member(class.internal_name.clone(), backing_field)),
        Span::DUMMY,
    );
    builder.terminate(Terminator::Return(dest));
    let mut func = builder.build();
    func.descriptor = Some(method_descriptor(&[], &ty));
    func
}

/// `get$<name>`: a plain field read unless the source declared a custom
/// getter body, which is lowered in place of the field read.
pub fn property_getter(ctx: &mut LoweringContext, class: &HirClass, field: &HirField, accessor: &HirAccessor) -> MirFunction {
    let ty = MirType::from_hir(&field.ty);
    let mut builder = Builder::new(Symbol::intern(&format!("get${}", field.name.as_str())), ty.clone());
    let this_local = builder.add_local(MirType::Object(class.internal_name.clone()), Some(Symbol::KW_THIS));
    let entry = builder.new_block();
    builder.set_current_block(entry);
    builder.set_body_start(entry);

    let result = crate::lower::lower_block(ctx, &mut builder, &accessor.body);
    match result {
        Some(local) => builder.terminate(Terminator::Return(local)),
        None => {
            let dest = builder.fresh_temp(ty.clone());
            builder.emit(
                Opcode::GetField,
                Some(dest),
                vec![this_local],
                Some(Immediate::Member(class.internal_name.clone(), field.name)),
                Span::DUMMY,
            );
            builder.terminate(Terminator::Return(dest));
        }
    }
    let mut func = builder.build();
    func.descriptor = Some(method_descriptor(&[], &ty));
    func
}

pub fn property_setter(ctx: &mut LoweringContext, class: &HirClass, field: &HirField, accessor: &HirAccessor) -> MirFunction {
    let ty = MirType::from_hir(&field.ty);
    let mut builder = Builder::new(Symbol::intern(&format!("set${}", field.name.as_str())), MirType::Void);
    let this_local = builder.add_local(MirType::Object(class.internal_name.clone()), Some(Symbol::KW_THIS));
    let value_local = builder.add_local(ty.clone(), Some(Symbol::intern("value")));
    if let Some(def_id) = accessor.param {
        ctx.bind_local(def_id, value_local);
    }
    let entry = builder.new_block();
    builder.set_current_block(entry);
    builder.set_body_start(entry);

    let handled = crate::lower::lower_block(ctx, &mut builder, &accessor.body);
    if handled.is_none() {
        builder.emit(
            Opcode::SetField,
            None,
            vec![this_local, value_local],
            Some(Immediate::Member(class.internal_name.clone(), field.name)),
            Span::DUMMY,
        );
    }
    builder.terminate(Terminator::ReturnVoid);
    let mut func = builder.build();
    func.params = vec![func.locals[value_local].clone()];
    func.descriptor = Some(method_descriptor(&[MirType::from_hir(&field.ty)], &MirType::Void));
    func
}

pub fn lambda_constructor(class_name: &str, fields: &[MirField]) -> MirFunction {
    let mut builder = Builder::new(Symbol::intern("<init>"), MirType::Void);
    let this_local = builder.add_local(MirType::Object(class_name.to_string()), Some(Symbol::KW_THIS));
    let mut params = Vec::new();
    for field in fields {
        let local = builder.add_local(field.ty.clone(), Some(field.name));
        params.push(local);
    }
    let entry = builder.new_block();
    builder.set_current_block(entry);
    builder.set_body_start(entry);
    for (field, local) in fields.iter().zip(&params) {
        builder.emit(
            Opcode::SetField,
            None,
            vec![this_local, *local],
            Some(Immediate::Member(class_name.to_string(), field.name)),
            Span::DUMMY,
        );
    }
    builder.terminate(Terminator::ReturnVoid);
    let mut func = builder.build();
    func.params = params.into_iter().map(|l| func.locals[l].clone()).collect();
    func.descriptor = Some(method_descriptor(&fields.iter().map(|f| f.ty.clone()).collect::<Vec<_>>(), &MirType::Void));
    func
}
