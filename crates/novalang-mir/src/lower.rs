//! HIR-to-MIR lowering (spec §4.3) — the heart of this pipeline. Three
//! phases per module: global discovery into `TypeTable`, override
//! propagation, then per-declaration lowering into `MirFunction`/`MirClass`.

use std::collections::{HashMap, HashSet};

use novalang_ast::{BinOp as AstBinOp, Literal, UnOp as AstUnOp};
use novalang_hir::{
    DescriptorResolver, ForBinding, HirBlock, HirCatch, HirClass, HirConstructor, HirDelegation,
    HirExpr, HirExprKind, HirFor, HirFunction, HirIf, HirInitializer, HirLambda,
    HirModule, HirStmt, HirTry, HirWhen, HirWhenCondition, HirWhile, Type as HirType, TypeTable,
};
use novalang_util::{DefId, Idx, Span, Symbol};

use crate::builder::Builder;
use crate::mir::*;
use crate::synth;

/// Loop-context stack entry for `break`/`continue` resolution (spec §4.3.3).
struct LoopContext {
    label: Option<Symbol>,
    header_block: BlockId,
    exit_block: BlockId,
    /// `for`-loop increment block; `continue` targets this instead of the header.
    continue_block: BlockId,
}

/// One pending `finally` block, inlined along every exit path (spec §4.3.4).
#[derive(Clone)]
struct FinallyContext {
    body: HirBlock,
}

/// Active closure-conversion scope (spec §4.3.6): maps each captured
/// declaration to the field holding it on the synthesized lambda class's
/// `this`, so reads/writes inside the `invoke` body redirect to `GetField`/
/// `SetField` instead of a `LocalId` meaningless outside the enclosing
/// function's own `Builder`.
struct CaptureScope {
    class_name: String,
    fields: HashMap<DefId, Symbol>,
    /// Captures boxed as `Object[1]` cells because the lambda body mutates
    /// them — a `GetField` yields the box, which still needs `IndexGet`/
    /// `IndexSet` to reach the value.
    boxed: HashSet<Symbol>,
}

/// State threaded through a single `lower` call; not shared across modules
/// except the two explicit carry-overs noted in spec §5.
pub struct LoweringContext<'a> {
    pub type_table: &'a TypeTable,
    resolver: DescriptorResolver<'a>,
    pub anonymous_class_counter: u32,
    pub interpreter_mode: bool,
    loop_stack: Vec<LoopContext>,
    finally_stack: Vec<FinallyContext>,
    lambda_capture_stack: Vec<CaptureScope>,
    synthesized_classes: Vec<MirClass>,
    /// `DefId`s are unique per binding (no shadowing collisions), so a flat
    /// map suffices in place of a rib-shaped lookup.
    locals: HashMap<DefId, LocalId>,
    /// Captured-and-mutated names boxed as `Object[1]` cells (spec §4.3.6).
    /// Keyed on the enclosing function's `Builder`; lambda bodies reach the
    /// same cell through their own capture field instead of this map.
    mutable_capture_boxes: HashMap<DefId, LocalId>,
    current_class: Option<String>,
    /// `this` in the function/constructor currently being lowered, tracked
    /// explicitly rather than guessed from `locals`' iteration order.
    current_this: Option<LocalId>,
}

impl<'a> LoweringContext<'a> {
    pub fn new(type_table: &'a TypeTable, anonymous_class_counter: u32, interpreter_mode: bool) -> Self {
        LoweringContext {
            type_table,
            resolver: DescriptorResolver::new(type_table),
            anonymous_class_counter,
            interpreter_mode,
            loop_stack: Vec::new(),
            finally_stack: Vec::new(),
            lambda_capture_stack: Vec::new(),
            synthesized_classes: Vec::new(),
            locals: HashMap::new(),
            mutable_capture_boxes: HashMap::new(),
            current_class: None,
            current_this: None,
        }
    }

    /// Binds a resolved declaration to the local slot lowering just
    /// allocated for it. Exposed to synthetic-method generation, which
    /// lowers accessor bodies outside the normal function-lowering path.
    pub(crate) fn bind_local(&mut self, def_id: DefId, local: LocalId) {
        self.locals.insert(def_id, local);
    }

    fn next_anonymous_name(&mut self, enclosing: &str, kind: &str) -> String {
        let n = self.anonymous_class_counter;
        self.anonymous_class_counter += 1;
        format!("{enclosing}${kind}${n}")
    }
}

/// Entry point: `lower(hirModule) -> MirModule` (spec §4.3).
pub fn lower(hir: &HirModule, interpreter_mode: bool) -> MirModule {
    let mut type_table = TypeTable::new();
    discover(hir, &mut type_table);
    propagate_overrides(hir, &mut type_table);

    let mut ctx = LoweringContext::new(&type_table, 0, interpreter_mode);

    let mut classes: Vec<MirClass> = hir.classes.iter().map(|c| lower_class(&mut ctx, c)).collect();
    let functions: Vec<MirFunction> = hir.functions.iter().map(|f| lower_function(&mut ctx, f)).collect();
    classes.extend(ctx.synthesized_classes.drain(..));

    MirModule {
        package: hir.package.clone(),
        classes,
        functions,
        extension_properties: Vec::new(),
        extension_functions: hir
            .functions
            .iter()
            .filter(|f| f.is_extension)
            .filter_map(|f| {
                f.receiver.as_ref().map(|r| ExtensionFunctionInfo {
                    receiver_internal_name: hir_type_internal_name(r),
                    function_name: f.name,
                })
            })
            .collect(),
        native_foreign_imports: hir.imports.native_foreign.clone(),
        static_imports: hir.imports.static_imports.clone(),
        wildcard_imports: hir.imports.wildcard_imports.clone(),
        source_imports: hir
            .imports
            .source_imports
            .iter()
            .map(|s| SourceImportInfo {
                qualified_name: s.qualified_name.clone(),
                alias: s.alias,
                is_wildcard: s.is_wildcard,
            })
            .collect(),
    }
}

/// Phase 1: populate every `TypeTable` map before any body is lowered.
fn discover(hir: &HirModule, table: &mut TypeTable) {
    for class in &hir.classes {
        match class.kind {
            novalang_hir::ClassKind::Interface => table.register_interface(&class.internal_name),
            novalang_hir::ClassKind::Object => table.register_object(&class.internal_name),
            novalang_hir::ClassKind::Enum => table.register_enum(&class.internal_name),
            novalang_hir::ClassKind::Class => table.register_class(&class.internal_name),
        }
        if class.is_data {
            table.mark_data_class(&class.internal_name);
        }
        if let Some(super_class) = &class.super_class {
            table.set_super_class(&class.internal_name, super_class);
        }
        if !class.interfaces.is_empty() {
            table.interfaces.insert(class.internal_name.clone(), class.interfaces.clone());
        }
        for field in &class.fields {
            table.add_field(&class.internal_name, field.name.as_str());
        }
        for method in &class.methods {
            let params: Vec<HirType> = method.params.iter().map(|p| p.ty.clone()).collect();
            let descriptor = novalang_hir::method_descriptor(&params, &method.return_type);
            table.add_method(&class.internal_name, method.name.as_str(), descriptor);
        }
    }
}

/// Phase 2: for every `override`-annotated method, rewrite its stored
/// descriptor to the nearest ancestor's (spec §4.1 "override propagation"),
/// so an overriding method's descriptor is bit-exact with what it overrides
/// rather than whatever the overriding declaration's own signature says.
fn propagate_overrides(hir: &HirModule, table: &mut TypeTable) {
    let resolver = DescriptorResolver::new(table);
    let mut rewrites = Vec::new();
    for class in &hir.classes {
        for method in &class.methods {
            if method.modifiers.contains(&novalang_hir::Modifier::Override) {
                if let Some(descriptor) = resolver.propagate_override(&class.internal_name, method.name.as_str()) {
                    rewrites.push((class.internal_name.clone(), method.name.as_str().to_string(), descriptor));
                }
            }
        }
    }
    for (owner, name, descriptor) in rewrites {
        table.add_method(&owner, &name, descriptor);
    }
}

fn hir_type_internal_name(ty: &HirType) -> String {
    match ty {
        HirType::Class(name, _) | HirType::Generic(name, _) => name.clone(),
        HirType::Nullable(inner) => hir_type_internal_name(inner),
        _ => HirType::OBJECT.to_string(),
    }
}

fn lower_class(ctx: &mut LoweringContext, class: &HirClass) -> MirClass {
    ctx.current_class = Some(class.internal_name.clone());
    ctx.locals.clear();

    let kind = match class.kind {
        novalang_hir::ClassKind::Class => ClassKind::Class,
        novalang_hir::ClassKind::Interface => ClassKind::Interface,
        novalang_hir::ClassKind::Object => ClassKind::Object,
        novalang_hir::ClassKind::Enum => ClassKind::Enum,
    };

    let fields: Vec<MirField> = class
        .fields
        .iter()
        .map(|f| MirField {
            name: f.name,
            ty: MirType::from_hir(&f.ty),
            modifiers: lower_modifiers(&f.modifiers),
        })
        .collect();

    let mut methods: Vec<MirFunction> = class.methods.iter().map(|m| lower_function(ctx, m)).collect();

    let mut constructors: Vec<MirFunction> = if class.constructors.is_empty() && !class.fields.is_empty() {
        vec![synth::field_init_constructor(ctx, class)]
    } else {
        class
            .constructors
            .iter()
            .map(|c| lower_constructor(ctx, class, c))
            .collect()
    };

    if class.kind == novalang_hir::ClassKind::Enum {
        constructors.push(synth::enum_clinit(ctx, class));
        methods.push(synth::enum_name_accessor(class));
        methods.push(synth::enum_ordinal_accessor(class));
    }

    for field in &class.fields {
        if let Some(getter) = &field.getter {
            methods.push(synth::property_getter(ctx, class, field, getter));
        }
        if let Some(setter) = &field.setter {
            methods.push(synth::property_setter(ctx, class, field, setter));
        }
    }

    methods.append(&mut constructors.drain(..).collect());

    ctx.current_class = None;

    MirClass {
        internal_name: class.internal_name.clone(),
        kind,
        modifiers: lower_modifiers(&class.modifiers),
        super_class: class.super_class.clone().unwrap_or_else(|| MirType::OBJECT.to_string()),
        interfaces: class.interfaces.clone(),
        fields,
        methods,
        annotations: Vec::new(),
    }
}

fn lower_modifiers(mods: &[novalang_hir::Modifier]) -> Vec<Modifier> {
    mods.iter()
        .map(|m| match m {
            novalang_hir::Modifier::Public => Modifier::Public,
            novalang_hir::Modifier::Private => Modifier::Private,
            novalang_hir::Modifier::Protected => Modifier::Protected,
            novalang_hir::Modifier::Internal => Modifier::Internal,
            novalang_hir::Modifier::Open => Modifier::Open,
            novalang_hir::Modifier::Abstract => Modifier::Abstract,
            novalang_hir::Modifier::Sealed => Modifier::Sealed,
            novalang_hir::Modifier::Override => Modifier::Override,
            novalang_hir::Modifier::Operator => Modifier::Operator,
            novalang_hir::Modifier::Inline => Modifier::Inline,
            novalang_hir::Modifier::Suspend => Modifier::Suspend,
        })
        .collect()
}

/// Function lowering (spec §4.3.1): `this` at index 0 (if a method), then
/// declared parameters, then default-value prologue.
fn lower_function(ctx: &mut LoweringContext, func: &HirFunction) -> MirFunction {
    ctx.locals.clear();
    ctx.current_this = None;
    let return_ty = MirType::from_hir(&func.return_type);
    let mut builder = Builder::new(func.name, return_ty.clone());

    if func.enclosing_class.is_some() && !func.is_extension {
        let this_ty = MirType::Object(ctx.current_class.clone().unwrap_or_else(|| MirType::OBJECT.to_string()));
        let this_local = builder.add_local(this_ty, Some(Symbol::KW_THIS));
        ctx.current_this = Some(this_local);
    } else if func.is_extension {
        // Extension `$this` aliases the receiver (spec §4.2, §9 "'This' ambiguity").
        let receiver_ty = func.receiver.as_ref().map(MirType::from_hir).unwrap_or_else(MirType::object);
        let this_local = builder.add_local(receiver_ty, Some(Symbol::KW_THIS));
        ctx.current_this = Some(this_local);
    }

    let mut params = Vec::new();
    for param in &func.params {
        let local = builder.add_local(MirType::from_hir(&param.ty), Some(param.name));
        ctx.locals.insert(param.def_id, local);
        params.push(local);
    }

    let entry = builder.new_block();
    builder.set_current_block(entry);
    builder.set_body_start(entry);

    // Default-parameter prologue: `param == null` test, assign default on true.
    for (param, local) in func.params.iter().zip(&params) {
        if let Some(default) = &param.default {
            let is_null = builder.fresh_temp(MirType::Boolean);
            builder.emit(
                Opcode::BinOp,
                Some(is_null),
                vec![*local],
                Some(Immediate::BinOp(BinOp::Eq)),
                param.ty_span(),
            );
            let assign_block = builder.new_block();
            let join_block = builder.new_block();
            builder.terminate(Terminator::Branch {
                cond: is_null,
                then_block: assign_block,
                else_block: join_block,
            });
            builder.set_current_block(assign_block);
            let default_val = lower_expr(ctx, &mut builder, default);
            builder.emit(Opcode::Move, Some(*local), vec![default_val], None, param.ty_span());
            builder.terminate(Terminator::Goto(join_block));
            builder.set_current_block(join_block);
            builder.set_body_start(join_block);
        }
    }

    let result = func.body.as_ref().map(|body| lower_block(ctx, &mut builder, body));
    finish_function_body(&mut builder, result, &return_ty);

    let mut mir_func = builder.build();
    mir_func.params = params.into_iter().map(|l| mir_func.locals[l].clone()).collect();
    mir_func.descriptor = Some(novalang_hir::method_descriptor(&func.params.iter().map(|p| p.ty.clone()).collect::<Vec<_>>(), &func.return_type));
    mir_func.type_params = func.type_params.clone();
    mir_func.modifiers = lower_modifiers(&func.modifiers);
    mir_func
}

trait SpanOf {
    fn ty_span(&self) -> Span;
}
impl SpanOf for novalang_hir::HirParam {
    fn ty_span(&self) -> Span {
        Span::DUMMY
    }
}

fn finish_function_body(builder: &mut Builder, result: Option<Option<LocalId>>, return_ty: &MirType) {
    let last_block_unterminated = matches!(builder_current_terminator(builder), Terminator::Unreachable);
    if !last_block_unterminated {
        return;
    }
    match (return_ty, result.flatten()) {
        (MirType::Void, _) => builder.terminate(Terminator::ReturnVoid),
        (_, Some(local)) => builder.terminate(Terminator::Return(local)),
        (_, None) => builder.terminate(Terminator::ReturnVoid),
    }
}

fn builder_current_terminator(builder: &Builder) -> Terminator {
    builder.peek_terminator()
}

/// Constructor lowering (spec §4.3.2): parameter-backed field stores, then
/// merged instance initializers, then the user-written body.
fn lower_constructor(ctx: &mut LoweringContext, class: &HirClass, ctor: &HirConstructor) -> MirFunction {
    ctx.locals.clear();
    let mut builder = Builder::new(Symbol::intern("<init>"), MirType::Void);
    let this_local = builder.add_local(MirType::Object(class.internal_name.clone()), Some(Symbol::KW_THIS));
    ctx.current_this = Some(this_local);

    let mut params = Vec::new();
    for param in &ctor.params {
        let local = builder.add_local(MirType::from_hir(&param.ty), Some(param.name));
        ctx.locals.insert(param.def_id, local);
        params.push(local);
    }

    let entry = builder.new_block();
    builder.set_current_block(entry);
    builder.set_body_start(entry);

    if ctor.is_primary {
        // Store parameter-backed fields before any user code runs.
        for (param, local) in ctor.params.iter().zip(&params) {
            if class.fields.iter().any(|f| f.is_parameter_backed && f.name == param.name) {
                builder.emit(
                    Opcode::SetField,
                    None,
                    vec![this_local, *local],
                    Some(Immediate::Member(class.internal_name.clone(), param.name)),
                    Span::DUMMY,
                );
            }
        }

        for init in &class.instance_initializers {
            match init {
                HirInitializer::FieldInit(name, expr) => {
                    let value = lower_expr(ctx, &mut builder, expr);
                    builder.emit(
                        Opcode::SetField,
                        None,
                        vec![this_local, value],
                        Some(Immediate::Member(class.internal_name.clone(), *name)),
                        expr.span,
                    );
                }
                HirInitializer::InitBlock(block) => {
                    lower_block(ctx, &mut builder, block);
                }
            }
        }

        if !ctor.super_init_args.is_empty() {
            let arg_locals: Vec<LocalId> = ctor
                .super_init_args
                .iter()
                .map(|arg| lower_expr(ctx, &mut builder, arg))
                .collect();
            builder.set_super_init_args(arg_locals);
        }

        lower_block(ctx, &mut builder, &ctor.body);
    } else {
        lower_secondary_constructor(ctx, &mut builder, class, ctor, this_local, &params);
    }

    finish_function_body(&mut builder, Some(None), &MirType::Void);
    let mut func = builder.build();
    func.params = params.into_iter().map(|l| func.locals[l].clone()).collect();
    func
}

/// Secondary constructor with `this(...)` delegation (spec §4.3.2): lower
/// the body, then attempt delegation-chain inlining; fall back to an
/// explicit delegation block when the chain is ambiguous or non-trivial.
fn lower_secondary_constructor(
    ctx: &mut LoweringContext,
    builder: &mut Builder,
    class: &HirClass,
    ctor: &HirConstructor,
    this_local: LocalId,
    params: &[LocalId],
) {
    let body_entry = builder.current_block();
    lower_block(ctx, builder, &ctor.body);

    let Some(delegation) = &ctor.delegation else {
        return;
    };

    if delegation.kind == novalang_hir::DelegationKind::ThisCall && can_inline_delegation(delegation) {
        // Every argument is a literal or a renamed parameter: splice the
        // primary's field stores and initializers directly, no call needed.
        for arg in &delegation.args {
            let _ = lower_expr(ctx, builder, arg);
        }
        for (param, local) in ctor.params.iter().zip(params) {
            if class.fields.iter().any(|f| f.is_parameter_backed && f.name == param.name) {
                builder.emit(
                    Opcode::SetField,
                    None,
                    vec![this_local, *local],
                    Some(Immediate::Member(class.internal_name.clone(), param.name)),
                    Span::DUMMY,
                );
            }
        }
        for init in &class.instance_initializers {
            if let HirInitializer::FieldInit(name, expr) = init {
                let value = lower_expr(ctx, builder, expr);
                builder.emit(
                    Opcode::SetField,
                    None,
                    vec![this_local, value],
                    Some(Immediate::Member(class.internal_name.clone(), *name)),
                    expr.span,
                );
            }
        }
    } else {
        let delegation_block = builder.new_block();
        let saved = builder.current_block();
        builder.set_current_block(delegation_block);
        let arg_locals: Vec<LocalId> = delegation.args.iter().map(|a| lower_expr(ctx, builder, a)).collect();
        builder.terminate(Terminator::Goto(body_entry));
        builder.set_delegation_args(arg_locals);
        // Execution must start at the delegation call, not at block 0.
        builder.set_body_start(delegation_block);
        builder.set_current_block(saved);
    }
}

/// An inlinable delegation: every argument is a bare identifier or a literal
/// (spec §4.3.2 step 4). Anything else keeps the delegation block.
fn can_inline_delegation(delegation: &HirDelegation) -> bool {
    delegation.args.iter().all(|arg| matches!(&arg.kind, HirExprKind::Literal(_) | HirExprKind::Local(_, _)))
}

pub(crate) fn lower_block(ctx: &mut LoweringContext, builder: &mut Builder, block: &HirBlock) -> Option<LocalId> {
    let mut last = None;
    for stmt in &block.stmts {
        last = lower_stmt(ctx, builder, stmt);
    }
    last
}

fn lower_stmt(ctx: &mut LoweringContext, builder: &mut Builder, stmt: &HirStmt) -> Option<LocalId> {
    match stmt {
        HirStmt::Expr(e) => Some(lower_expr(ctx, builder, e)),
        HirStmt::Local(local) => {
            let ty = MirType::from_hir(&local.ty);
            let slot = builder.add_local(ty, Some(local.name));
            ctx.locals.insert(local.def_id, slot);
            if let Some(init) = &local.initializer {
                let value = lower_expr(ctx, builder, init);
                builder.emit(Opcode::Move, Some(slot), vec![value], None, local.span);
            }
            None
        }
        HirStmt::If(if_stmt) => lower_if(ctx, builder, if_stmt),
        HirStmt::When(when) => lower_when(ctx, builder, when),
        HirStmt::For(for_stmt) => {
            lower_for(ctx, builder, for_stmt);
            None
        }
        HirStmt::While(w) => {
            lower_while(ctx, builder, w, false);
            None
        }
        HirStmt::DoWhile(w) => {
            lower_while(ctx, builder, w, true);
            None
        }
        HirStmt::Try(t) => lower_try(ctx, builder, t),
        HirStmt::Return(value, _span) => {
            let inlined = inline_finally_stack(ctx, builder);
            if inlined {
                // each finally body may itself diverge; re-check current block state is fine.
            }
            match value {
                Some(expr) => {
                    let local = lower_expr(ctx, builder, expr);
                    builder.terminate(Terminator::Return(local));
                }
                None => builder.terminate(Terminator::ReturnVoid),
            }
            None
        }
        HirStmt::Break(label, _span) => {
            if let Some(exit) = resolve_loop_target(ctx, *label, |l| l.exit_block) {
                builder.terminate(Terminator::Goto(exit));
            }
            None
        }
        HirStmt::Continue(label, _span) => {
            if let Some(target) = resolve_loop_target(ctx, *label, |l| l.continue_block) {
                builder.terminate(Terminator::Goto(target));
            }
            None
        }
        HirStmt::Throw(expr, span) => {
            let local = lower_expr(ctx, builder, expr);
            builder.terminate(Terminator::Throw(local));
            let _ = span;
            None
        }
    }
}

fn resolve_loop_target(ctx: &LoweringContext, label: Option<Symbol>, pick: impl Fn(&LoopContext) -> BlockId) -> Option<BlockId> {
    match label {
        Some(name) => ctx.loop_stack.iter().rev().find(|l| l.label == Some(name)).map(pick),
        None => ctx.loop_stack.last().map(pick),
    }
}

/// Inlines every pending `finally` body along the current normal-exit path
/// (spec §4.3.4, strategy 1), innermost first.
fn inline_finally_stack(ctx: &mut LoweringContext, builder: &mut Builder) -> bool {
    if ctx.finally_stack.is_empty() {
        return false;
    }
    let pending: Vec<FinallyContext> = ctx.finally_stack.iter().rev().cloned().collect();
    for finally in pending {
        lower_block(ctx, builder, &finally.body);
    }
    true
}

fn lower_if(ctx: &mut LoweringContext, builder: &mut Builder, if_stmt: &HirIf) -> Option<LocalId> {
    let cond = lower_expr(ctx, builder, &if_stmt.cond);
    let then_block = builder.new_block();
    let else_block = builder.new_block();
    let merge_block = builder.new_block();
    builder.terminate(Terminator::Branch { cond, then_block, else_block });

    let is_void = matches!(
        &if_stmt.then_branch.ty,
        HirType::Primitive(novalang_hir::Primitive::Unit | novalang_hir::Primitive::Nothing)
    );
    let result_local = if is_void {
        None
    } else {
        Some(builder.fresh_temp(MirType::from_hir(&if_stmt.then_branch.ty)))
    };

    builder.set_current_block(then_block);
    let then_val = lower_expr(ctx, builder, &if_stmt.then_branch);
    if let Some(result) = result_local {
        builder.emit(Opcode::Move, Some(result), vec![then_val], None, if_stmt.then_branch.span);
    }
    builder.terminate(Terminator::Goto(merge_block));

    builder.set_current_block(else_block);
    if let Some(else_branch) = &if_stmt.else_branch {
        let else_val = lower_expr(ctx, builder, else_branch);
        if let Some(result) = result_local {
            builder.emit(Opcode::Move, Some(result), vec![else_val], None, else_branch.span);
        }
    }
    builder.terminate(Terminator::Goto(merge_block));

    builder.set_current_block(merge_block);
    result_local
}

/// `when` lowering (spec §4.3.3): switch-optimize when every arm tests the
/// same subject against a constant; otherwise fall back to nested ifs.
fn lower_when(ctx: &mut LoweringContext, builder: &mut Builder, when: &HirWhen) -> Option<LocalId> {
    let Some(subject_expr) = &when.subject else {
        return lower_when_as_nested_if(ctx, builder, when);
    };

    let switchable = when.arms.iter().filter(|a| !a.is_else).all(|arm| {
        arm.conditions.iter().all(|c| matches!(c, HirWhenCondition::Equals(e) if is_constant_expr(e)))
    });

    let distinct_cases: usize = when
        .arms
        .iter()
        .filter(|a| !a.is_else)
        .map(|a| a.conditions.len())
        .sum();

    if !switchable || distinct_cases < 2 {
        return lower_when_as_nested_if(ctx, builder, when);
    }

    let subject = lower_expr(ctx, builder, subject_expr);
    let merge_block = builder.new_block();
    let default_block = builder.new_block();
    let result_local = builder.fresh_temp(MirType::object());

    let mut targets = Vec::new();
    for arm in &when.arms {
        if arm.is_else {
            continue;
        }
        let arm_block = builder.new_block();
        for cond in &arm.conditions {
            if let HirWhenCondition::Equals(e) = cond {
                if let Some(key) = switch_key(e) {
                    targets.push((key, arm_block));
                }
            }
        }
        let saved = builder.current_block();
        builder.set_current_block(arm_block);
        let val = lower_expr(ctx, builder, &arm.body);
        builder.emit(Opcode::Move, Some(result_local), vec![val], None, arm.body.span);
        builder.terminate(Terminator::Goto(merge_block));
        builder.set_current_block(saved);
    }

    builder.set_current_block(default_block);
    if let Some(else_arm) = when.arms.iter().find(|a| a.is_else) {
        let val = lower_expr(ctx, builder, &else_arm.body);
        builder.emit(Opcode::Move, Some(result_local), vec![val], None, else_arm.body.span);
    }
    builder.terminate(Terminator::Goto(merge_block));

    let entry = builder.current_block();
    builder.set_current_block(entry);
    builder.terminate(Terminator::Switch {
        discriminant: subject,
        targets,
        default: default_block,
    });

    builder.set_current_block(merge_block);
    Some(result_local)
}

fn is_constant_expr(expr: &HirExpr) -> bool {
    matches!(&expr.kind, HirExprKind::Literal(_))
}

fn switch_key(expr: &HirExpr) -> Option<SwitchKey> {
    match &expr.kind {
        HirExprKind::Literal(Literal::Int(i)) | HirExprKind::Literal(Literal::Long(i)) => Some(SwitchKey::Int(*i)),
        HirExprKind::Literal(Literal::String(s)) => Some(SwitchKey::Str(s.as_str().to_string())),
        _ => None,
    }
}

fn lower_when_as_nested_if(ctx: &mut LoweringContext, builder: &mut Builder, when: &HirWhen) -> Option<LocalId> {
    let merge_block = builder.new_block();
    let result_local = builder.fresh_temp(MirType::object());
    lower_when_arms(ctx, builder, &when.subject, &when.arms, 0, merge_block, result_local);
    builder.set_current_block(merge_block);
    Some(result_local)
}

fn lower_when_arms(
    ctx: &mut LoweringContext,
    builder: &mut Builder,
    subject: &Option<Box<HirExpr>>,
    arms: &[novalang_hir::HirWhenArm],
    index: usize,
    merge_block: BlockId,
    result_local: LocalId,
) {
    if index >= arms.len() {
        builder.terminate(Terminator::Goto(merge_block));
        return;
    }
    let arm = &arms[index];
    if arm.is_else || arm.conditions.is_empty() {
        let val = lower_expr(ctx, builder, &arm.body);
        builder.emit(Opcode::Move, Some(result_local), vec![val], None, arm.body.span);
        builder.terminate(Terminator::Goto(merge_block));
        return;
    }

    let cond = lower_when_condition(ctx, builder, subject, &arm.conditions[0]);
    let then_block = builder.new_block();
    let next_block = builder.new_block();
    builder.terminate(Terminator::Branch { cond, then_block, else_block: next_block });

    builder.set_current_block(then_block);
    let val = lower_expr(ctx, builder, &arm.body);
    builder.emit(Opcode::Move, Some(result_local), vec![val], None, arm.body.span);
    builder.terminate(Terminator::Goto(merge_block));

    builder.set_current_block(next_block);
    lower_when_arms(ctx, builder, subject, arms, index + 1, merge_block, result_local);
}

fn lower_when_condition(
    ctx: &mut LoweringContext,
    builder: &mut Builder,
    subject: &Option<Box<HirExpr>>,
    condition: &HirWhenCondition,
) -> LocalId {
    match condition {
        HirWhenCondition::Equals(expr) => {
            let rhs = lower_expr(ctx, builder, expr);
            match subject {
                Some(subj) => {
                    let lhs = lower_expr(ctx, builder, subj);
                    let dest = builder.fresh_temp(MirType::Boolean);
                    builder.emit(Opcode::BinOp, Some(dest), vec![lhs, rhs], Some(Immediate::BinOp(BinOp::Eq)), expr.span);
                    dest
                }
                None => rhs,
            }
        }
        HirWhenCondition::In(expr) => lower_expr(ctx, builder, expr),
        HirWhenCondition::Is(ty_name) => {
            let subj = subject.as_ref().expect("type-test when arm requires a subject");
            let operand = lower_expr(ctx, builder, subj);
            let dest = builder.fresh_temp(MirType::Boolean);
            builder.emit(Opcode::TypeCheck, Some(dest), vec![operand], Some(Immediate::ClassName(ty_name.clone())), subj.span);
            dest
        }
    }
}

fn lower_while(ctx: &mut LoweringContext, builder: &mut Builder, w: &HirWhile, is_do_while: bool) {
    let header = builder.new_block();
    let body = builder.new_block();
    let exit = builder.new_block();

    if is_do_while {
        builder.terminate(Terminator::Goto(body));
    } else {
        builder.terminate(Terminator::Goto(header));
    }

    builder.set_current_block(header);
    let cond = lower_expr(ctx, builder, &w.cond);
    builder.terminate(Terminator::Branch { cond, then_block: body, else_block: exit });

    ctx.loop_stack.push(LoopContext {
        label: w.label,
        header_block: header,
        exit_block: exit,
        continue_block: header,
    });
    builder.set_current_block(body);
    lower_block(ctx, builder, &w.body);
    builder.terminate(Terminator::Goto(header));
    ctx.loop_stack.pop();

    builder.set_current_block(exit);
}

/// `for (i in a..b)` lowers to a counter loop; any other iterable goes
/// through `iterator()`/`hasNext()`/`next()` (spec §4.3.3).
fn lower_for(ctx: &mut LoweringContext, builder: &mut Builder, for_stmt: &HirFor) {
    if let HirExprKind::Range(start, end, inclusive) = &for_stmt.iterable.kind {
        lower_counter_for(ctx, builder, for_stmt, start, end, *inclusive);
        return;
    }

    let iterable = lower_expr(ctx, builder, &for_stmt.iterable);
    let iterator = builder.fresh_temp(MirType::object());
    builder.emit(
        Opcode::InvokeVirtual,
        Some(iterator),
        vec![iterable],
        Some(Immediate::Member(MirType::OBJECT.to_string(), Symbol::OP_ITERATOR)),
        Span::DUMMY,
    );

    let header = builder.new_block();
    let body = builder.new_block();
    let exit = builder.new_block();
    builder.terminate(Terminator::Goto(header));

    builder.set_current_block(header);
    let has_next = builder.fresh_temp(MirType::Boolean);
    builder.emit(
        Opcode::InvokeVirtual,
        Some(has_next),
        vec![iterator],
        Some(Immediate::Member(MirType::OBJECT.to_string(), Symbol::intern("hasNext"))),
        Span::DUMMY,
    );
    builder.terminate(Terminator::Branch { cond: has_next, then_block: body, else_block: exit });

    builder.set_current_block(body);
    let next_val = builder.fresh_temp(MirType::object());
    builder.emit(
        Opcode::InvokeVirtual,
        Some(next_val),
        vec![iterator],
        Some(Immediate::Member(MirType::OBJECT.to_string(), Symbol::intern("next"))),
        Span::DUMMY,
    );
    bind_for_binding(ctx, builder, &for_stmt.binding, next_val);

    ctx.loop_stack.push(LoopContext {
        label: for_stmt.label,
        header_block: header,
        exit_block: exit,
        continue_block: header,
    });
    lower_block(ctx, builder, &for_stmt.body);
    builder.terminate(Terminator::Goto(header));
    ctx.loop_stack.pop();

    builder.set_current_block(exit);
}

fn lower_counter_for(
    ctx: &mut LoweringContext,
    builder: &mut Builder,
    for_stmt: &HirFor,
    start: &HirExpr,
    end: &HirExpr,
    inclusive: bool,
) {
    let start_val = lower_expr(ctx, builder, start);
    let counter = builder.fresh_temp(MirType::Int);
    builder.emit(Opcode::Move, Some(counter), vec![start_val], None, start.span);

    let end_val = lower_expr(ctx, builder, end);
    let end_local = builder.fresh_temp(MirType::Int);
    builder.emit(Opcode::Move, Some(end_local), vec![end_val], None, end.span);

    match &for_stmt.binding {
        ForBinding::Single(def_id, _) => {
            ctx.locals.insert(*def_id, counter);
        }
        ForBinding::Destructured(_) => {}
    }

    let header = builder.new_block();
    let body = builder.new_block();
    let increment = builder.new_block();
    let exit = builder.new_block();
    builder.terminate(Terminator::Goto(header));

    builder.set_current_block(header);
    let cond = builder.fresh_temp(MirType::Boolean);
    let cmp = if inclusive { BinOp::Le } else { BinOp::Lt };
    builder.emit(Opcode::BinOp, Some(cond), vec![counter, end_local], Some(Immediate::BinOp(cmp)), for_stmt.span);
    builder.terminate(Terminator::Branch { cond, then_block: body, else_block: exit });

    ctx.loop_stack.push(LoopContext {
        label: for_stmt.label,
        header_block: header,
        exit_block: exit,
        continue_block: increment,
    });
    builder.set_current_block(body);
    lower_block(ctx, builder, &for_stmt.body);
    builder.terminate(Terminator::Goto(increment));
    ctx.loop_stack.pop();

    builder.set_current_block(increment);
    let one = builder.fresh_temp(MirType::Int);
    builder.emit(Opcode::ConstInt, Some(one), vec![], Some(Immediate::Int(1)), for_stmt.span);
    let incremented = builder.fresh_temp(MirType::Int);
    builder.emit(Opcode::BinOp, Some(incremented), vec![counter, one], Some(Immediate::BinOp(BinOp::Add)), for_stmt.span);
    builder.emit(Opcode::Move, Some(counter), vec![incremented], None, for_stmt.span);
    builder.terminate(Terminator::Goto(header));

    builder.set_current_block(exit);
}

fn bind_for_binding(ctx: &mut LoweringContext, builder: &mut Builder, binding: &ForBinding, value: LocalId) {
    match binding {
        ForBinding::Single(def_id, _) => {
            ctx.locals.insert(*def_id, value);
        }
        ForBinding::Destructured(names) => {
            for (i, (def_id, _name)) in names.iter().enumerate() {
                let component_method = match i {
                    0 => Symbol::ID_COMPONENT1,
                    1 => Symbol::ID_COMPONENT2,
                    _ => Symbol::ID_COMPONENT3,
                };
                let slot = builder.fresh_temp(MirType::object());
                builder.emit(
                    Opcode::InvokeVirtual,
                    Some(slot),
                    vec![value],
                    Some(Immediate::Member(MirType::OBJECT.to_string(), component_method)),
                    Span::DUMMY,
                );
                ctx.locals.insert(*def_id, slot);
            }
        }
    }
}

/// Try/catch/finally lowering (spec §4.3.4), dual strategy: inline along
/// normal paths (handled by `finally_stack` + `inline_finally_stack`) and a
/// catch-all rethrow handler along exceptional paths.
fn lower_try(ctx: &mut LoweringContext, builder: &mut Builder, try_stmt: &HirTry) -> Option<LocalId> {
    let try_start = builder.new_block();
    let merge = builder.new_block();
    builder.terminate(Terminator::Goto(try_start));

    if let Some(finally) = &try_stmt.finally {
        ctx.finally_stack.push(FinallyContext { body: finally.clone() });
    }

    builder.set_current_block(try_start);
    lower_block(ctx, builder, &try_stmt.body);
    let ran_to_completion = matches!(builder.peek_terminator(), Terminator::Unreachable);
    if ran_to_completion {
        if try_stmt.finally.is_some() {
            inline_finally_stack(ctx, builder);
        }
        builder.terminate(Terminator::Goto(merge));
    }

    for catch in &try_stmt.catches {
        lower_catch(ctx, builder, try_start, merge, catch, try_stmt.finally.is_some());
    }

    if let Some(finally) = &try_stmt.finally {
        let finally_handler = builder.new_block();
        builder.set_current_block(finally_handler);
        let exc_local = builder.fresh_temp(MirType::object());
        lower_block(ctx, builder, &finally.clone());
        builder.terminate(Terminator::Throw(exc_local));
        builder.add_try_catch(TryCatchEntry {
            start_block: try_start,
            end_block: merge,
            handler_block: finally_handler,
            exception_internal_name: None,
            exception_local: exc_local,
        });
        ctx.finally_stack.pop();
    }

    builder.set_current_block(merge);
    None
}

fn lower_catch(
    ctx: &mut LoweringContext,
    builder: &mut Builder,
    try_start: BlockId,
    merge: BlockId,
    catch: &HirCatch,
    has_finally: bool,
) {
    let handler = builder.new_block();
    builder.set_current_block(handler);
    let exc_local = builder.add_local(MirType::Object(catch.exception_type.clone()), Some(Symbol::intern(&format!("$catch${}", catch.name.as_str()))));
    ctx.locals.insert(catch.param, exc_local);

    lower_block(ctx, builder, &catch.body);
    if has_finally {
        inline_finally_stack(ctx, builder);
    }
    if matches!(builder.peek_terminator(), Terminator::Unreachable) {
        builder.terminate(Terminator::Goto(merge));
    }

    builder.add_try_catch(TryCatchEntry {
        start_block: try_start,
        end_block: merge,
        handler_block: handler,
        exception_internal_name: Some(catch.exception_type.clone()),
        exception_local: exc_local,
    });
}

pub(crate) fn lower_expr(ctx: &mut LoweringContext, builder: &mut Builder, expr: &HirExpr) -> LocalId {
    match &expr.kind {
        HirExprKind::Literal(lit) => lower_literal(builder, lit, expr.span),
        HirExprKind::Local(def_id, _name) => resolve_local(ctx, builder, *def_id, expr.span),
        HirExprKind::Unresolved(_name) => {
            // spec §7: degrades to a conservative fallback, never fatal.
            let dest = builder.fresh_temp(MirType::object());
            builder.emit(Opcode::ConstNull, Some(dest), vec![], None, expr.span);
            dest
        }
        HirExprKind::Binary(left, op, right) => lower_binary(ctx, builder, left, *op, right, expr.span),
        HirExprKind::Unary(op, operand) => lower_unary(ctx, builder, *op, operand, expr.span),
        HirExprKind::Call(call) => lower_call(ctx, builder, call, expr.span),
        HirExprKind::Index(receiver, index) => {
            let recv = lower_expr(ctx, builder, receiver);
            let idx = lower_expr(ctx, builder, index);
            let dest = builder.fresh_temp(MirType::object());
            builder.emit(Opcode::IndexGet, Some(dest), vec![recv, idx], None, expr.span);
            dest
        }
        HirExprKind::Member(receiver, name, _is_safe) => lower_member_get(ctx, builder, receiver, *name, expr.span),
        HirExprKind::Assign(target, op, value) => lower_assign(ctx, builder, target, *op, value, expr.span),
        HirExprKind::Lambda(lambda) => lower_lambda(ctx, builder, lambda, expr.span),
        HirExprKind::If(if_expr) => lower_if(ctx, builder, if_expr).unwrap_or_else(|| builder.fresh_temp(MirType::Void)),
        HirExprKind::When(when) => lower_when(ctx, builder, when).unwrap_or_else(|| builder.fresh_temp(MirType::Void)),
        HirExprKind::Try(t) => lower_try(ctx, builder, t).unwrap_or_else(|| builder.fresh_temp(MirType::Void)),
        HirExprKind::TypeCheck(operand, ty_name, negated) => {
            let value = lower_expr(ctx, builder, operand);
            let check = builder.fresh_temp(MirType::Boolean);
            builder.emit(Opcode::TypeCheck, Some(check), vec![value], Some(Immediate::ClassName(ty_name.clone())), expr.span);
            if *negated {
                let negated_local = builder.fresh_temp(MirType::Boolean);
                builder.emit(Opcode::UnaryOp, Some(negated_local), vec![check], Some(Immediate::UnOp(UnOp::Not)), expr.span);
                negated_local
            } else {
                check
            }
        }
        HirExprKind::TypeCast(operand, ty_name, is_safe) => {
            let value = lower_expr(ctx, builder, operand);
            let dest = builder.fresh_temp(MirType::Object(ty_name.clone()));
            let name = if *is_safe { format!("?|{ty_name}") } else { ty_name.clone() };
            builder.emit(Opcode::TypeCast, Some(dest), vec![value], Some(Immediate::ClassName(name)), expr.span);
            dest
        }
        HirExprKind::Range(start, end, _inclusive) => {
            let s = lower_expr(ctx, builder, start);
            let e = lower_expr(ctx, builder, end);
            let dest = builder.fresh_temp(MirType::object());
            builder.emit(
                Opcode::InvokeStatic,
                Some(dest),
                vec![s, e],
                Some(Immediate::Member("nova/Range".to_string(), Symbol::intern("of"))),
                expr.span,
            );
            dest
        }
        HirExprKind::StringInterpolation(parts) => lower_string_interpolation(ctx, builder, parts, expr.span),
        HirExprKind::Elvis(left, right) => {
            let l = lower_expr(ctx, builder, left);
            let is_null = builder.fresh_temp(MirType::Boolean);
            builder.emit(Opcode::TypeCheck, Some(is_null), vec![l], Some(Immediate::ClassName("<null>".to_string())), expr.span);
            let then_block = builder.new_block();
            let else_block = builder.new_block();
            let merge = builder.new_block();
            let dest = builder.fresh_temp(MirType::object());
            builder.terminate(Terminator::Branch { cond: is_null, then_block, else_block });
            builder.set_current_block(then_block);
            let r = lower_expr(ctx, builder, right);
            builder.emit(Opcode::Move, Some(dest), vec![r], None, expr.span);
            builder.terminate(Terminator::Goto(merge));
            builder.set_current_block(else_block);
            builder.emit(Opcode::Move, Some(dest), vec![l], None, expr.span);
            builder.terminate(Terminator::Goto(merge));
            builder.set_current_block(merge);
            dest
        }
        HirExprKind::SafeCall(receiver, call) => {
            let recv = lower_expr(ctx, builder, receiver);
            let is_null = builder.fresh_temp(MirType::Boolean);
            builder.emit(Opcode::TypeCheck, Some(is_null), vec![recv], Some(Immediate::ClassName("<null>".to_string())), expr.span);
            let then_block = builder.new_block();
            let else_block = builder.new_block();
            let merge = builder.new_block();
            let dest = builder.fresh_temp(MirType::object());
            builder.terminate(Terminator::Branch { cond: is_null, then_block, else_block });
            builder.set_current_block(then_block);
            builder.emit(Opcode::ConstNull, Some(dest), vec![], None, expr.span);
            builder.terminate(Terminator::Goto(merge));
            builder.set_current_block(else_block);
            let result = lower_expr(ctx, builder, call);
            builder.emit(Opcode::Move, Some(dest), vec![result], None, expr.span);
            builder.terminate(Terminator::Goto(merge));
            builder.set_current_block(merge);
            dest
        }
        HirExprKind::NotNullAssert(operand) => lower_expr(ctx, builder, operand),
        HirExprKind::ErrorPropagation(operand) => lower_error_propagation(ctx, builder, operand, expr.span),
        HirExprKind::Block(block) => lower_block(ctx, builder, block).unwrap_or_else(|| builder.fresh_temp(MirType::Void)),
    }
}

fn lower_literal(builder: &mut Builder, lit: &Literal, span: Span) -> LocalId {
    let (ty, opcode, immediate) = match lit {
        Literal::Int(v) => (MirType::Int, Opcode::ConstInt, Immediate::Int(*v)),
        Literal::Long(v) => (MirType::Long, Opcode::ConstLong, Immediate::Long(*v)),
        Literal::Float(v) => (MirType::Float, Opcode::ConstFloat, Immediate::Float(*v)),
        Literal::Double(v) => (MirType::Double, Opcode::ConstDouble, Immediate::Double(*v)),
        Literal::Char(v) => (MirType::Char, Opcode::ConstChar, Immediate::Char(*v)),
        Literal::String(v) => (MirType::Object("nova/String".to_string()), Opcode::ConstString, Immediate::Str(*v)),
        Literal::Boolean(v) => (MirType::Boolean, Opcode::ConstBool, Immediate::Bool(*v)),
        Literal::Null => (MirType::object(), Opcode::ConstNull, Immediate::Bool(false)),
    };
    let dest = builder.fresh_temp(ty);
    let imm = if matches!(lit, Literal::Null) { None } else { Some(immediate) };
    builder.emit(opcode, Some(dest), vec![], imm, span);
    dest
}

fn resolve_local(ctx: &mut LoweringContext, builder: &mut Builder, def_id: DefId, span: Span) -> LocalId {
    if let Some((owner, field_name, is_boxed)) = current_capture_field(ctx, def_id) {
        let this_local = LocalId::from_usize(0);
        let dest = builder.fresh_temp(MirType::object());
        builder.emit(Opcode::GetField, Some(dest), vec![this_local], Some(Immediate::Member(owner, field_name)), span);
        if is_boxed {
            let unboxed = builder.fresh_temp(MirType::object());
            builder.emit(Opcode::IndexGet, Some(unboxed), vec![dest], Some(Immediate::Int(0)), span);
            return unboxed;
        }
        return dest;
    }
    if let Some(&boxed) = ctx.mutable_capture_boxes.get(&def_id) {
        let dest = builder.fresh_temp(MirType::object());
        builder.emit(Opcode::IndexGet, Some(dest), vec![boxed], Some(Immediate::Int(0)), span);
        return dest;
    }
    *ctx.locals.get(&def_id).unwrap_or_else(|| {
        panic!("internal error: DefId {def_id:?} resolved in HIR but never bound to a local")
    })
}

/// If `def_id` is a capture of the innermost lambda currently being lowered,
/// returns the owning class name, the field it lives in, and whether that
/// field holds a mutable-capture box rather than the value directly.
fn current_capture_field(ctx: &LoweringContext, def_id: DefId) -> Option<(String, Symbol, bool)> {
    let scope = ctx.lambda_capture_stack.last()?;
    let field_name = *scope.fields.get(&def_id)?;
    Some((scope.class_name.clone(), field_name, scope.boxed.contains(&field_name)))
}

/// The value to copy into a newly synthesized lambda's capture field: the
/// box itself for a mutated capture (so the cell is shared, not snapshotted),
/// otherwise the same resolution an ordinary read would use — which already
/// redirects through an enclosing lambda's own capture field when this
/// lambda is nested inside another one.
fn resolve_capture_value(ctx: &mut LoweringContext, builder: &mut Builder, def_id: DefId, span: Span) -> LocalId {
    if let Some(&boxed) = ctx.mutable_capture_boxes.get(&def_id) {
        if current_capture_field(ctx, def_id).is_none() {
            return boxed;
        }
    }
    resolve_local(ctx, builder, def_id, span)
}

fn ast_binop_to_mir(op: AstBinOp) -> BinOp {
    match op {
        AstBinOp::Add => BinOp::Add,
        AstBinOp::Sub => BinOp::Sub,
        AstBinOp::Mul => BinOp::Mul,
        AstBinOp::Div => BinOp::Div,
        AstBinOp::Rem => BinOp::Rem,
        AstBinOp::Eq => BinOp::Eq,
        AstBinOp::Ne => BinOp::Ne,
        AstBinOp::Lt => BinOp::Lt,
        AstBinOp::Le => BinOp::Le,
        AstBinOp::Gt => BinOp::Gt,
        AstBinOp::Ge => BinOp::Ge,
        AstBinOp::And => BinOp::And,
        AstBinOp::Or => BinOp::Or,
        AstBinOp::BitAnd => BinOp::BitAnd,
        AstBinOp::BitOr => BinOp::BitOr,
        AstBinOp::BitXor => BinOp::BitXor,
        AstBinOp::Shl => BinOp::Shl,
        AstBinOp::Shr => BinOp::Shr,
        AstBinOp::In | AstBinOp::NotIn => BinOp::Eq,
    }
}

/// Operator-method dispatch (spec §4.3.11): a user class declaring the
/// matching method name dispatches virtually instead of a native arithmetic
/// instruction. Comparisons on a `compareTo`-declaring class compare the
/// int result against zero.
fn lower_binary(ctx: &mut LoweringContext, builder: &mut Builder, left: &HirExpr, op: AstBinOp, right: &HirExpr, span: Span) -> LocalId {
    let lhs = lower_expr(ctx, builder, left);
    let rhs = lower_expr(ctx, builder, right);

    if let HirType::Class(owner, _) = &left.ty {
        if let Some(method) = operator_method_name(op) {
            if ctx.resolver.resolve(owner, method.as_str()).is_some() {
                let dest = builder.fresh_temp(MirType::object());
                builder.emit(
                    Opcode::InvokeVirtual,
                    Some(dest),
                    vec![lhs, rhs],
                    Some(Immediate::Member(owner.clone(), method)),
                    span,
                );
                return comparison_result(builder, op, dest, span);
            }
        }
    }

    let dest = builder.fresh_temp(MirType::from_hir(&left.ty));
    builder.emit(Opcode::BinOp, Some(dest), vec![lhs, rhs], Some(Immediate::BinOp(ast_binop_to_mir(op))), span);
    dest
}

fn operator_method_name(op: AstBinOp) -> Option<Symbol> {
    Some(match op {
        AstBinOp::Add => Symbol::OP_PLUS,
        AstBinOp::Sub => Symbol::OP_MINUS,
        AstBinOp::Mul => Symbol::OP_TIMES,
        AstBinOp::Div => Symbol::OP_DIV,
        AstBinOp::Rem => Symbol::OP_REM,
        AstBinOp::Lt | AstBinOp::Le | AstBinOp::Gt | AstBinOp::Ge => Symbol::OP_COMPARE_TO,
        AstBinOp::In => Symbol::OP_CONTAINS,
        _ => return None,
    })
}

fn comparison_result(builder: &mut Builder, op: AstBinOp, compare_to_result: LocalId, span: Span) -> LocalId {
    let comparator = match op {
        AstBinOp::Lt => BinOp::Lt,
        AstBinOp::Le => BinOp::Le,
        AstBinOp::Gt => BinOp::Gt,
        AstBinOp::Ge => BinOp::Ge,
        _ => return compare_to_result,
    };
    let zero = builder.fresh_temp(MirType::Int);
    builder.emit(Opcode::ConstInt, Some(zero), vec![], Some(Immediate::Int(0)), span);
    let dest = builder.fresh_temp(MirType::Boolean);
    builder.emit(Opcode::BinOp, Some(dest), vec![compare_to_result, zero], Some(Immediate::BinOp(comparator)), span);
    dest
}

fn lower_unary(ctx: &mut LoweringContext, builder: &mut Builder, op: AstUnOp, operand: &HirExpr, span: Span) -> LocalId {
    let value = lower_expr(ctx, builder, operand);
    match op {
        AstUnOp::Neg => {
            let dest = builder.fresh_temp(MirType::from_hir(&operand.ty));
            builder.emit(Opcode::UnaryOp, Some(dest), vec![value], Some(Immediate::UnOp(UnOp::Neg)), span);
            dest
        }
        AstUnOp::Not => {
            let dest = builder.fresh_temp(MirType::Boolean);
            builder.emit(Opcode::UnaryOp, Some(dest), vec![value], Some(Immediate::UnOp(UnOp::Not)), span);
            dest
        }
        AstUnOp::PreInc | AstUnOp::PostInc | AstUnOp::PreDec | AstUnOp::PostDec => {
            let is_inc = matches!(op, AstUnOp::PreInc | AstUnOp::PostInc);
            let one = builder.fresh_temp(MirType::Int);
            builder.emit(Opcode::ConstInt, Some(one), vec![], Some(Immediate::Int(1)), span);
            let updated = builder.fresh_temp(MirType::from_hir(&operand.ty));
            let binop = if is_inc { BinOp::Add } else { BinOp::Sub };
            builder.emit(Opcode::BinOp, Some(updated), vec![value, one], Some(Immediate::BinOp(binop)), span);
            builder.emit(Opcode::Move, Some(value), vec![updated], None, span);
            if matches!(op, AstUnOp::PreInc | AstUnOp::PreDec) {
                value
            } else {
                let snapshot = builder.fresh_temp(MirType::from_hir(&operand.ty));
                builder.emit(Opcode::Move, Some(snapshot), vec![value], None, span);
                snapshot
            }
        }
    }
}

/// Error propagation `expr?` (spec §4.3.5): null short-circuits, a `Result`
/// tests `isErr()` and returns on error, anything else binds directly.
fn lower_error_propagation(ctx: &mut LoweringContext, builder: &mut Builder, operand: &HirExpr, span: Span) -> LocalId {
    let value = lower_expr(ctx, builder, operand);

    if !operand.ty.is_nullable() && !matches!(&operand.ty, HirType::Class(name, _) if name == "nova/Result") {
        return value;
    }

    if operand.ty.is_nullable() {
        let is_null = builder.fresh_temp(MirType::Boolean);
        builder.emit(Opcode::TypeCheck, Some(is_null), vec![value], Some(Immediate::ClassName("<null>".to_string())), span);
        let return_block = builder.new_block();
        let continue_block = builder.new_block();
        builder.terminate(Terminator::Branch { cond: is_null, then_block: return_block, else_block: continue_block });
        builder.set_current_block(return_block);
        builder.terminate(Terminator::Return(value));
        builder.set_current_block(continue_block);
        return value;
    }

    let is_err = builder.fresh_temp(MirType::Boolean);
    builder.emit(
        Opcode::InvokeVirtual,
        Some(is_err),
        vec![value],
        Some(Immediate::Member("nova/Result".to_string(), Symbol::intern("isErr"))),
        span,
    );
    let return_block = builder.new_block();
    let unwrap_block = builder.new_block();
    let merge = builder.new_block();
    builder.terminate(Terminator::Branch { cond: is_err, then_block: return_block, else_block: unwrap_block });

    builder.set_current_block(return_block);
    builder.terminate(Terminator::Return(value));

    builder.set_current_block(unwrap_block);
    let dest = builder.fresh_temp(MirType::object());
    builder.emit(
        Opcode::InvokeVirtual,
        Some(dest),
        vec![value],
        Some(Immediate::Member("nova/Result".to_string(), Symbol::intern("getValue"))),
        span,
    );
    builder.terminate(Terminator::Goto(merge));
    builder.set_current_block(merge);
    dest
}

fn lower_member_get(ctx: &mut LoweringContext, builder: &mut Builder, receiver: &HirExpr, name: Symbol, span: Span) -> LocalId {
    let recv = lower_expr(ctx, builder, receiver);
    let owner = hir_type_internal_name(&receiver.ty);
    let dest = builder.fresh_temp(MirType::object());
    if ctx.type_table.has_field(&owner, name.as_str()) {
        builder.emit(Opcode::GetField, Some(dest), vec![recv], Some(Immediate::Member(owner, name)), span);
    } else {
        builder.emit(
            Opcode::InvokeVirtual,
            Some(dest),
            vec![recv],
            Some(Immediate::Member(owner, name)),
            span,
        );
    }
    dest
}

/// Assignments (spec §4.3.9): mutable-capture box, then local, then field.
fn lower_assign(ctx: &mut LoweringContext, builder: &mut Builder, target: &HirExpr, op: Option<AstBinOp>, value: &HirExpr, span: Span) -> LocalId {
    let rhs_raw = lower_expr(ctx, builder, value);
    let rhs = match (op, &target.kind) {
        (Some(bin_op), HirExprKind::Local(def_id, _)) => {
            let current = resolve_local(ctx, builder, *def_id, span);
            let dest = builder.fresh_temp(MirType::from_hir(&target.ty));
            builder.emit(Opcode::BinOp, Some(dest), vec![current, rhs_raw], Some(Immediate::BinOp(ast_binop_to_mir(bin_op))), span);
            dest
        }
        _ => rhs_raw,
    };

    match &target.kind {
        HirExprKind::Local(def_id, _) => {
            if let Some((owner, field_name, is_boxed)) = current_capture_field(ctx, *def_id) {
                let this_local = LocalId::from_usize(0);
                if is_boxed {
                    let boxed = builder.fresh_temp(MirType::object());
                    builder.emit(Opcode::GetField, Some(boxed), vec![this_local], Some(Immediate::Member(owner, field_name)), span);
                    builder.emit(Opcode::IndexSet, None, vec![boxed, rhs], Some(Immediate::Int(0)), span);
                } else {
                    builder.emit(Opcode::SetField, None, vec![this_local, rhs], Some(Immediate::Member(owner, field_name)), span);
                }
            } else if let Some(&boxed) = ctx.mutable_capture_boxes.get(def_id) {
                builder.emit(Opcode::IndexSet, None, vec![boxed, rhs], Some(Immediate::Int(0)), span);
            } else {
                let slot = resolve_local(ctx, builder, *def_id, span);
                builder.emit(Opcode::Move, Some(slot), vec![rhs], None, span);
            }
        }
        HirExprKind::Member(receiver, name, _) => {
            let recv = lower_expr(ctx, builder, receiver);
            let owner = hir_type_internal_name(&receiver.ty);
            builder.emit(Opcode::SetField, None, vec![recv, rhs], Some(Immediate::Member(owner, *name)), span);
        }
        HirExprKind::Index(receiver, index) => {
            let recv = lower_expr(ctx, builder, receiver);
            let idx = lower_expr(ctx, builder, index);
            builder.emit(Opcode::IndexSet, None, vec![recv, idx, rhs], None, span);
        }
        _ => {}
    }
    rhs
}

/// Call resolution (spec §4.3.7): a condensed priority chain covering the
/// architecturally distinguishing cases — self-method dispatch, top-level
/// static calls, field-vs-method disambiguation on an explicit receiver,
/// function-type invocation, and the `$PipeCall` fallback for anything
/// unresolved at lowering time.
fn lower_call(ctx: &mut LoweringContext, builder: &mut Builder, call: &novalang_hir::HirCall, span: Span) -> LocalId {
    let args: Vec<LocalId> = call.args.iter().map(|a| lower_expr(ctx, builder, &a.value)).collect();

    match &call.callee.kind {
        // Step 11: self-method call inside a method body.
        HirExprKind::Local(_, name) if ctx.current_class.is_some() && is_method_name(ctx, name) => {
            let owner = ctx.current_class.clone().unwrap();
            let this_local = ctx.current_this.unwrap_or_else(|| builder.fresh_temp(MirType::object()));
            let mut call_args = vec![this_local];
            call_args.extend(args);
            let dest = builder.fresh_temp(MirType::object());
            builder.emit(Opcode::InvokeVirtual, Some(dest), call_args, Some(Immediate::Member(owner, *name)), span);
            dest
        }
        // Step 12: `obj.method(args)` field-access call.
        HirExprKind::Member(receiver, name, _) => {
            let recv = lower_expr(ctx, builder, receiver);
            let owner = hir_type_internal_name(&receiver.ty);
            let mut call_args = vec![recv];
            call_args.extend(args);
            let dest = builder.fresh_temp(MirType::object());
            builder.emit(Opcode::InvokeVirtual, Some(dest), call_args, Some(Immediate::Member(owner, *name)), span);
            dest
        }
        // Step 8: bare identifier naming a top-level function.
        HirExprKind::Local(_, name) => {
            let dest = builder.fresh_temp(MirType::object());
            builder.emit(
                Opcode::InvokeStatic,
                Some(dest),
                args,
                Some(Immediate::Member("$Module".to_string(), *name)),
                span,
            );
            dest
        }
        HirExprKind::Unresolved(name) => {
            // Step 14: default fallback, `$PipeCall`.
            let dest = builder.fresh_temp(MirType::object());
            builder.emit(
                Opcode::InvokeStatic,
                Some(dest),
                args,
                Some(Immediate::Member("$PipeCall".to_string(), *name)),
                span,
            );
            dest
        }
        // Step 13: function-type invocation, `fn(args)`.
        _ => {
            let callee = lower_expr(ctx, builder, &call.callee);
            let mut call_args = vec![callee];
            call_args.extend(args);
            let dest = builder.fresh_temp(MirType::object());
            builder.emit(
                Opcode::InvokeVirtual,
                Some(dest),
                call_args,
                Some(Immediate::Member(MirType::OBJECT.to_string(), Symbol::OP_INVOKE)),
                span,
            );
            dest
        }
    }
}

fn is_method_name(ctx: &LoweringContext, name: &Symbol) -> bool {
    ctx.current_class
        .as_ref()
        .map(|owner| ctx.resolver.resolve(owner, name.as_str()).is_some())
        .unwrap_or(false)
}

fn lower_string_interpolation(ctx: &mut LoweringContext, builder: &mut Builder, parts: &[novalang_hir::HirStringPart], span: Span) -> LocalId {
    let mut acc: Option<LocalId> = None;
    for part in parts {
        let piece = match part {
            novalang_hir::HirStringPart::Literal(s) => {
                let dest = builder.fresh_temp(MirType::Object("nova/String".to_string()));
                builder.emit(Opcode::ConstString, Some(dest), vec![], Some(Immediate::Str(*s)), span);
                dest
            }
            novalang_hir::HirStringPart::Expr(e) => lower_expr(ctx, builder, e),
        };
        acc = Some(match acc {
            None => piece,
            Some(prev) => {
                let dest = builder.fresh_temp(MirType::Object("nova/String".to_string()));
                builder.emit(Opcode::BinOp, Some(dest), vec![prev, piece], Some(Immediate::BinOp(BinOp::Add)), span);
                dest
            }
        });
    }
    acc.unwrap_or_else(|| {
        let dest = builder.fresh_temp(MirType::Object("nova/String".to_string()));
        builder.emit(Opcode::ConstString, Some(dest), vec![], Some(Immediate::Str(Symbol::intern(""))), span);
        dest
    })
}

/// Closure conversion (spec §4.3.6): each lambda becomes a synthesized
/// `<Enclosing>$Lambda$<n>` class with one field per capture, a
/// capture-storing constructor and an `invoke` method.
fn lower_lambda(ctx: &mut LoweringContext, builder: &mut Builder, lambda: &HirLambda, span: Span) -> LocalId {
    let enclosing = ctx.current_class.clone().unwrap_or_else(|| "$Module".to_string());
    let class_name = ctx.next_anonymous_name(&enclosing, "Lambda");

    let captures = capture_analysis(ctx, lambda);
    let mutated_names = mutable_captures(lambda);
    let mutated: HashSet<Symbol> = captures
        .iter()
        .filter(|(name, _)| mutated_names.contains(name))
        .map(|(name, _)| *name)
        .collect();

    // Box every mutated capture in the enclosing scope before reading its
    // current value, so later reads/writes to the same binding (inside this
    // function, and inside the lambda body itself) all see one shared cell.
    for (name, def_id) in &captures {
        if mutated.contains(name) && !ctx.mutable_capture_boxes.contains_key(def_id) {
            let current = resolve_local(ctx, builder, *def_id, span);
            let boxed = builder.fresh_temp(MirType::array_of(&MirType::object()));
            builder.emit(Opcode::NewTypedArray, Some(boxed), vec![current], Some(Immediate::ElementType(MirType::object())), span);
            ctx.mutable_capture_boxes.insert(*def_id, boxed);
        }
    }

    let mut fields = Vec::new();
    for (name, _) in &captures {
        fields.push(MirField {
            name: *name,
            ty: MirType::object(),
            modifiers: Vec::new(),
        });
    }

    let ctor_args: Vec<LocalId> = captures
        .iter()
        .map(|(_, def_id)| resolve_capture_value(ctx, builder, *def_id, span))
        .collect();

    let field_map: HashMap<DefId, Symbol> = captures.iter().map(|(name, def_id)| (*def_id, *name)).collect();
    ctx.lambda_capture_stack.push(CaptureScope {
        class_name: class_name.clone(),
        fields: field_map,
        boxed: mutated,
    });

    let mut invoke_builder = Builder::new(Symbol::OP_INVOKE, MirType::object());
    invoke_builder.add_local(MirType::Object(class_name.clone()), Some(Symbol::KW_THIS));
    for param in &lambda.params {
        let local = invoke_builder.add_local(MirType::from_hir(&param.ty), Some(param.name));
        ctx.locals.insert(param.def_id, local);
    }
    let entry = invoke_builder.new_block();
    invoke_builder.set_current_block(entry);
    invoke_builder.set_body_start(entry);

    let result = lower_expr(ctx, &mut invoke_builder, &lambda.body);
    if matches!(invoke_builder.peek_terminator(), Terminator::Unreachable) {
        invoke_builder.terminate(Terminator::Return(result));
    }
    let invoke_method = invoke_builder.build();

    ctx.lambda_capture_stack.pop();

    let ctor = synth::lambda_constructor(&class_name, &fields);

    ctx.synthesized_classes.push(MirClass {
        internal_name: class_name.clone(),
        kind: ClassKind::Class,
        modifiers: Vec::new(),
        super_class: MirType::OBJECT.to_string(),
        interfaces: vec![format!("nova/Function{}", lambda.params.len())],
        fields,
        methods: vec![ctor, invoke_method],
        annotations: Vec::new(),
    });

    let dest = builder.fresh_temp(MirType::Object(class_name.clone()));
    builder.emit(Opcode::NewObject, Some(dest), ctor_args, Some(Immediate::ClassName(class_name)), span);
    dest
}

/// Deep capture discovery (spec §4.3.6): every identifier reachable from the
/// lambda body, excluding parameters and anything that is a known
/// class/function name — recurses into nested lambdas so transitive
/// captures are included. Keeps the first `DefId` seen per name; a lambda
/// body never observes two distinct bindings under one free identifier.
fn capture_analysis(ctx: &LoweringContext, lambda: &HirLambda) -> Vec<(Symbol, DefId)> {
    let mut captured = HashMap::new();
    let bound: HashSet<Symbol> = lambda.params.iter().map(|p| p.name).collect();
    collect_identifiers(&lambda.body, &bound, &mut captured);
    let _ = ctx;
    let mut result: Vec<(Symbol, DefId)> = captured.into_iter().collect();
    result.sort_by_key(|(name, _)| name.as_str().to_string());
    result
}

fn collect_identifiers(expr: &HirExpr, bound: &HashSet<Symbol>, out: &mut HashMap<Symbol, DefId>) {
    match &expr.kind {
        HirExprKind::Local(def_id, name) if !bound.contains(name) && *name != Symbol::KW_THIS => {
            out.entry(*name).or_insert(*def_id);
        }
        HirExprKind::Binary(l, _, r) => {
            collect_identifiers(l, bound, out);
            collect_identifiers(r, bound, out);
        }
        HirExprKind::Unary(_, o) => collect_identifiers(o, bound, out),
        HirExprKind::Call(call) => {
            collect_identifiers(&call.callee, bound, out);
            for arg in &call.args {
                collect_identifiers(&arg.value, bound, out);
            }
        }
        HirExprKind::Member(r, _, _) => collect_identifiers(r, bound, out),
        HirExprKind::Assign(t, _, v) => {
            collect_identifiers(t, bound, out);
            collect_identifiers(v, bound, out);
        }
        HirExprKind::Lambda(nested) => {
            let mut nested_bound = bound.clone();
            nested_bound.extend(nested.params.iter().map(|p| p.name));
            collect_identifiers(&nested.body, &nested_bound, out);
        }
        HirExprKind::If(if_expr) => {
            collect_identifiers(&if_expr.cond, bound, out);
            collect_identifiers(&if_expr.then_branch, bound, out);
            if let Some(e) = &if_expr.else_branch {
                collect_identifiers(e, bound, out);
            }
        }
        HirExprKind::Block(block) => {
            for stmt in &block.stmts {
                if let HirStmt::Expr(e) = stmt {
                    collect_identifiers(e, bound, out);
                }
            }
        }
        _ => {}
    }
}

/// Identifiers assigned to directly in the lambda body, not descending into
/// nested lambdas (spec §4.3.6 "mutable captures").
fn mutable_captures(lambda: &HirLambda) -> HashSet<Symbol> {
    let mut out = HashSet::new();
    collect_assign_targets(&lambda.body, &mut out);
    out
}

fn collect_assign_targets(expr: &HirExpr, out: &mut HashSet<Symbol>) {
    if let HirExprKind::Assign(target, _, value) = &expr.kind {
        if let HirExprKind::Local(_, name) = &target.kind {
            out.insert(*name);
        }
        collect_assign_targets(value, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novalang_hir::{ClassKind as HirClassKind, HirField, HirFunction as HF, HirParam};
    use novalang_util::FileId;

    fn span() -> Span {
        Span::new(0, 1, 0, 0, FileId::new(0))
    }

    fn int_local(def_id: DefId, name: &str) -> HirParam {
        HirParam {
            def_id,
            name: Symbol::intern(name),
            ty: HirType::Primitive(novalang_hir::Primitive::Int),
            default: None,
            is_vararg: false,
        }
    }

    #[test]
    fn simple_add_function_lowers_to_one_binop_and_a_return() {
        let table = TypeTable::new();
        let mut ctx = LoweringContext::new(&table, 0, false);
        let a = DefId(0);
        let b = DefId(1);
        let func = HF {
            def_id: DefId(2),
            name: Symbol::intern("add"),
            enclosing_class: None,
            receiver: None,
            type_params: vec![],
            params: vec![int_local(a, "a"), int_local(b, "b")],
            return_type: HirType::Primitive(novalang_hir::Primitive::Int),
            body: Some(HirBlock {
                stmts: vec![HirStmt::Return(
                    Some(HirExpr {
                        kind: HirExprKind::Binary(
                            Box::new(HirExpr { kind: HirExprKind::Local(a, Symbol::intern("a")), ty: HirType::Primitive(novalang_hir::Primitive::Int), span: span() }),
                            AstBinOp::Add,
                            Box::new(HirExpr { kind: HirExprKind::Local(b, Symbol::intern("b")), ty: HirType::Primitive(novalang_hir::Primitive::Int), span: span() }),
                        ),
                        ty: HirType::Primitive(novalang_hir::Primitive::Int),
                        span: span(),
                    }),
                    span(),
                )],
            }),
            modifiers: vec![],
            is_extension: false,
            span: span(),
        };

        // Pre-seed locals the way `lower_function` does, since params are bound there.
        let mir_func = lower_function(&mut ctx, &func);
        assert_eq!(mir_func.descriptor.as_deref(), Some("(II)I"));
        let entry = &mir_func.blocks[BlockId::from_usize(0)];
        assert!(matches!(entry.terminator, Terminator::Return(_)));
    }

    #[test]
    fn data_class_with_no_explicit_constructor_gets_a_synthesized_one() {
        let table = TypeTable::new();
        let mut ctx = LoweringContext::new(&table, 0, false);
        let class = HirClass {
            def_id: DefId(0),
            name: Symbol::intern("Point"),
            internal_name: "Point".to_string(),
            kind: HirClassKind::Class,
            modifiers: vec![],
            type_params: vec![],
            super_class: None,
            interfaces: vec![],
            is_data: true,
            fields: vec![HirField {
                def_id: DefId(1),
                name: Symbol::intern("x"),
                ty: HirType::Primitive(novalang_hir::Primitive::Int),
                modifiers: vec![],
                is_mutable: false,
                is_parameter_backed: true,
                is_static: false,
                getter: None,
                setter: None,
            }],
            constructors: vec![],
            instance_initializers: vec![],
            methods: vec![],
            enum_entries: vec![],
            span: span(),
        };
        let mir_class = lower_class(&mut ctx, &class);
        assert!(mir_class.methods.iter().any(|m| m.name.as_str() == "<init>"));
    }

    #[test]
    fn self_method_call_dispatches_against_the_enclosing_this() {
        let mut table = TypeTable::new();
        table.register_class("Greeter");
        table.add_method("Greeter", "helper", "()I".to_string());
        let mut ctx = LoweringContext::new(&table, 0, false);

        let greet = HF {
            def_id: DefId(10),
            name: Symbol::intern("greet"),
            enclosing_class: Some(DefId(0)),
            receiver: None,
            type_params: vec![],
            params: vec![],
            return_type: HirType::Primitive(novalang_hir::Primitive::Int),
            body: Some(HirBlock {
                stmts: vec![HirStmt::Return(
                    Some(HirExpr {
                        kind: HirExprKind::Call(novalang_hir::HirCall {
                            callee: Box::new(HirExpr {
                                kind: HirExprKind::Local(DefId(11), Symbol::intern("helper")),
                                ty: HirType::Unresolved,
                                span: span(),
                            }),
                            args: vec![],
                            trailing_lambda: None,
                        }),
                        ty: HirType::Primitive(novalang_hir::Primitive::Int),
                        span: span(),
                    }),
                    span(),
                )],
            }),
            modifiers: vec![],
            is_extension: false,
            span: span(),
        };

        let class = HirClass {
            def_id: DefId(0),
            name: Symbol::intern("Greeter"),
            internal_name: "Greeter".to_string(),
            kind: HirClassKind::Class,
            modifiers: vec![],
            type_params: vec![],
            super_class: None,
            interfaces: vec![],
            is_data: false,
            fields: vec![],
            constructors: vec![],
            instance_initializers: vec![],
            methods: vec![greet],
            enum_entries: vec![],
            span: span(),
        };

        let mir_class = lower_class(&mut ctx, &class);
        let greet_mir = mir_class.methods.iter().find(|m| m.name.as_str() == "greet").unwrap();
        let invoke = greet_mir
            .blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .find(|i| i.opcode == Opcode::InvokeVirtual)
            .expect("self-call lowers to an InvokeVirtual");
        assert_eq!(invoke.operands[0], LocalId::from_usize(0), "receiver must be `this`, not an arbitrary local");
    }

    #[test]
    fn lambda_capture_reads_through_getfield_not_an_arbitrary_local() {
        let table = TypeTable::new();
        let mut ctx = LoweringContext::new(&table, 0, false);

        let factor = DefId(1);
        let x = DefId(2);
        let func = HF {
            def_id: DefId(0),
            name: Symbol::intern("makeMultiplier"),
            enclosing_class: None,
            receiver: None,
            type_params: vec![],
            params: vec![],
            return_type: HirType::Unresolved,
            body: Some(HirBlock {
                stmts: vec![
                    HirStmt::Local(novalang_hir::HirLocal {
                        def_id: factor,
                        name: Symbol::intern("factor"),
                        ty: HirType::Primitive(novalang_hir::Primitive::Int),
                        is_mutable: false,
                        initializer: Some(HirExpr { kind: HirExprKind::Literal(Literal::Int(5)), ty: HirType::Primitive(novalang_hir::Primitive::Int), span: span() }),
                        span: span(),
                    }),
                    HirStmt::Return(
                        Some(HirExpr {
                            kind: HirExprKind::Lambda(HirLambda {
                                params: vec![int_local(x, "x")],
                                implicit_it: false,
                                body: Box::new(HirExpr {
                                    kind: HirExprKind::Binary(
                                        Box::new(HirExpr { kind: HirExprKind::Local(x, Symbol::intern("x")), ty: HirType::Primitive(novalang_hir::Primitive::Int), span: span() }),
                                        AstBinOp::Mul,
                                        Box::new(HirExpr { kind: HirExprKind::Local(factor, Symbol::intern("factor")), ty: HirType::Primitive(novalang_hir::Primitive::Int), span: span() }),
                                    ),
                                    ty: HirType::Primitive(novalang_hir::Primitive::Int),
                                    span: span(),
                                }),
                            }),
                            ty: HirType::Unresolved,
                            span: span(),
                        }),
                        span(),
                    ),
                ],
            }),
            modifiers: vec![],
            is_extension: false,
            span: span(),
        };

        let mir_func = lower_function(&mut ctx, &func);

        let factor_slot = mir_func
            .blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .find(|i| i.opcode == Opcode::Move)
            .and_then(|i| i.destination)
            .expect("`factor`'s initializer lowers to a Move into its local");

        let new_object = mir_func
            .blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .find(|i| i.opcode == Opcode::NewObject)
            .expect("lambda creation lowers to a NewObject");
        assert_eq!(new_object.operands, vec![factor_slot], "constructor arg must be `factor`'s own local, not an arbitrary one");

        assert_eq!(ctx.synthesized_classes.len(), 1);
        let lambda_class = &ctx.synthesized_classes[0];
        assert_eq!(lambda_class.fields.len(), 1);
        assert_eq!(lambda_class.fields[0].name.as_str(), "factor");

        let invoke = lambda_class.methods.iter().find(|m| m.name.as_str() == "invoke").unwrap();
        let get_field = invoke
            .blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .find(|i| i.opcode == Opcode::GetField)
            .expect("captured read lowers to a GetField on `this`");
        assert_eq!(get_field.operands, vec![LocalId::from_usize(0)]);
        assert!(matches!(&get_field.immediate, Some(Immediate::Member(owner, name)) if owner == &lambda_class.internal_name && name.as_str() == "factor"));
    }
}
