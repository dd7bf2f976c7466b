use novalang_ast as ast;
use novalang_util::{DefId, DefIdGenerator, DiagnosticBuilder, Handler, Span, Symbol};

use crate::hir::*;
use crate::scope::{RibKind, ScopeTree};
use crate::type_table::TypeTable;
use crate::types::{FunctionType, Primitive, Type};

fn internal_name(path: &ast::Path) -> String {
    path.segments
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn ast_type_to_hir(ty: &ast::TypeRef) -> Type {
    match ty {
        ast::TypeRef::Simple(path, _) => match path.last().as_str() {
            "Int" => Type::Primitive(Primitive::Int),
            "Long" => Type::Primitive(Primitive::Long),
            "Float" => Type::Primitive(Primitive::Float),
            "Double" => Type::Primitive(Primitive::Double),
            "Boolean" => Type::Primitive(Primitive::Boolean),
            "Char" => Type::Primitive(Primitive::Char),
            "Unit" => Type::Primitive(Primitive::Unit),
            "Nothing" => Type::Primitive(Primitive::Nothing),
            _ => Type::Class(internal_name(path), Vec::new()),
        },
        ast::TypeRef::Nullable(inner, _) => Type::Nullable(Box::new(ast_type_to_hir(inner))),
        ast::TypeRef::Generic(path, args, _) => Type::Generic(
            internal_name(path),
            args.iter().map(|a| ast_type_to_hir(&a.ty)).collect(),
        ),
        ast::TypeRef::Function(f) => Type::Function(FunctionType {
            receiver: f.receiver.as_ref().map(|r| Box::new(ast_type_to_hir(r))),
            params: f.params.iter().map(ast_type_to_hir).collect(),
            ret: Box::new(ast_type_to_hir(&f.return_type)),
            is_suspend: f.is_suspend,
        }),
        ast::TypeRef::TypeParam(_, _, _) => Type::Unresolved,
    }
}

fn ast_modifiers_to_hir(mods: &[ast::Modifier]) -> Vec<Modifier> {
    mods.iter()
        .filter_map(|m| match m {
            ast::Modifier::Public => Some(Modifier::Public),
            ast::Modifier::Private => Some(Modifier::Private),
            ast::Modifier::Protected => Some(Modifier::Protected),
            ast::Modifier::Internal => Some(Modifier::Internal),
            ast::Modifier::Open => Some(Modifier::Open),
            ast::Modifier::Abstract => Some(Modifier::Abstract),
            ast::Modifier::Sealed => Some(Modifier::Sealed),
            ast::Modifier::Override => Some(Modifier::Override),
            ast::Modifier::Operator => Some(Modifier::Operator),
            ast::Modifier::Inline => Some(Modifier::Inline),
            ast::Modifier::Suspend => Some(Modifier::Suspend),
            ast::Modifier::Companion | ast::Modifier::Vararg | ast::Modifier::Const => None,
        })
        .collect()
}

/// Resolves names and desugars AST into HIR (spec §4.2). Two passes: a
/// `collect_items` pass that populates `TypeTable` with every declared
/// name before any body is resolved (so forward references work), then
/// `analyze_item` which walks each declaration's body.
pub struct AstToHir<'a> {
    pub type_table: TypeTable,
    pub scope_tree: ScopeTree,
    pub def_ids: &'a DefIdGenerator,
    pub handler: &'a Handler,
}

impl<'a> AstToHir<'a> {
    pub fn new(def_ids: &'a DefIdGenerator, handler: &'a Handler) -> Self {
        AstToHir {
            type_table: TypeTable::new(),
            scope_tree: ScopeTree::new(),
            def_ids,
            handler,
        }
    }

    fn unresolved(&self, name: Symbol, span: Span) {
        DiagnosticBuilder::error(format!("unresolved symbol `{}`", name))
            .span(span)
            .emit(self.handler);
    }

    pub fn lower_program(&mut self, program: &ast::Program) -> HirModule {
        self.collect_items(program);

        let mut classes = Vec::new();
        let mut functions = Vec::new();
        for item in &program.items {
            match item {
                ast::Item::Class(decl) => classes.push(self.lower_class(decl)),
                ast::Item::Interface(decl) => classes.push(self.lower_interface(decl)),
                ast::Item::Object(decl) => classes.push(self.lower_object(decl, false)),
                ast::Item::Enum(decl) => classes.push(self.lower_enum(decl)),
                ast::Item::Function(decl) => functions.push(self.lower_function(decl, None)),
                ast::Item::Property(_) | ast::Item::TypeAlias(_) => {}
            }
        }

        HirModule {
            package: program.package.as_ref().map(internal_name),
            imports: self.lower_imports(&program.imports),
            classes,
            functions,
        }
    }

    /// Phase 1 (spec §4.3 "global discovery" as it applies to name
    /// collection): populate the class/interface/enum/object name sets and
    /// field sets before resolving any bodies, so sibling and forward
    /// references resolve.
    fn collect_items(&mut self, program: &ast::Program) {
        for item in &program.items {
            match item {
                ast::Item::Class(decl) => {
                    let name = internal_name(&ast::Path::single(decl.name));
                    self.type_table.register_class(&name);
                    if decl.is_data {
                        self.type_table.mark_data_class(&name);
                    }
                    if let Some(ctor) = &decl.primary_constructor {
                        for param in &ctor.params {
                            if param.is_field {
                                self.type_table.add_field(&name, param.name.as_str());
                            }
                        }
                    }
                }
                ast::Item::Interface(decl) => {
                    self.type_table.register_interface(&internal_name(&ast::Path::single(decl.name)));
                }
                ast::Item::Object(decl) => {
                    self.type_table.register_object(&internal_name(&ast::Path::single(decl.name)));
                }
                ast::Item::Enum(decl) => {
                    self.type_table.register_enum(&internal_name(&ast::Path::single(decl.name)));
                }
                _ => {}
            }
        }
    }

    fn lower_imports(&self, imports: &[ast::ImportDecl]) -> ResolvedImports {
        let mut resolved = ResolvedImports::default();
        for import in imports {
            resolved.source_imports.push(SourceImport {
                qualified_name: internal_name(&import.path),
                alias: import.alias,
                is_wildcard: import.is_wildcard,
            });
        }
        resolved
    }

    fn lower_class(&mut self, decl: &ast::ClassDecl) -> HirClass {
        let def_id = self.def_ids.next();
        let internal = internal_name(&ast::Path::single(decl.name));
        self.scope_tree.enter_scope(RibKind::Class);

        let mut fields = Vec::new();
        let mut instance_initializers = Vec::new();
        let mut constructors = Vec::new();

        if let Some(ctor) = &decl.primary_constructor {
            let params: Vec<HirParam> = ctor
                .params
                .iter()
                .map(|p| {
                    let param_def = self.def_ids.next();
                    self.scope_tree.add_binding(p.name, param_def);
                    HirParam {
                        def_id: param_def,
                        name: p.name,
                        ty: ast_type_to_hir(&p.ty),
                        default: p.default.as_ref().map(|e| self.lower_expr(e)),
                        is_vararg: false,
                    }
                })
                .collect();

            // Parameter-backed fields (spec §4.2): `val`/`var` constructor
            // params double as declared fields, stored before user code runs.
            for (param, hir_param) in ctor.params.iter().zip(&params) {
                if param.is_field {
                    fields.push(HirField {
                        def_id: self.def_ids.next(),
                        name: param.name,
                        ty: hir_param.ty.clone(),
                        modifiers: ast_modifiers_to_hir(&param.modifiers),
                        is_mutable: param.is_mutable,
                        is_parameter_backed: true,
                        is_static: false,
                        getter: None,
                        setter: None,
                    });
                }
            }

            constructors.push(HirConstructor {
                def_id: self.def_ids.next(),
                params,
                is_primary: true,
                delegation: None,
                super_init_args: Vec::new(),
                body: HirBlock::default(),
                span: ctor.span,
            });
        }

        for member in &decl.members {
            self.lower_class_member(member, &internal, &mut fields, &mut instance_initializers, &mut constructors);
        }

        let methods = decl
            .members
            .iter()
            .filter_map(|m| match m {
                ast::ClassMember::Function(f) => Some(self.lower_function(f, Some(def_id))),
                _ => None,
            })
            .collect();

        self.scope_tree.exit_scope();

        HirClass {
            def_id,
            name: decl.name,
            internal_name: internal,
            kind: ClassKind::Class,
            modifiers: ast_modifiers_to_hir(&decl.modifiers),
            type_params: decl.type_params.iter().map(|t| t.name).collect(),
            super_class: decl.supertypes.first().map(|s| internal_name(path_of(&s.ty))),
            interfaces: decl.supertypes.iter().skip(1).map(|s| internal_name(path_of(&s.ty))).collect(),
            is_data: decl.is_data,
            fields,
            constructors,
            instance_initializers,
            methods,
            enum_entries: Vec::new(),
            span: decl.span,
        }
    }

    fn lower_class_member(
        &mut self,
        member: &ast::ClassMember,
        _owner: &str,
        fields: &mut Vec<HirField>,
        instance_initializers: &mut Vec<HirInitializer>,
        _constructors: &mut [HirConstructor],
    ) {
        match member {
            ast::ClassMember::Property(prop) => {
                // Property initializer participates in `instanceInitializers`
                // merged in source order (spec §4.2); field itself tracked separately.
                if let Some(init) = &prop.initializer {
                    instance_initializers.push(HirInitializer::FieldInit(prop.name, self.lower_expr(init)));
                }
                fields.push(HirField {
                    def_id: self.def_ids.next(),
                    name: prop.name,
                    ty: prop.ty.as_ref().map(ast_type_to_hir).unwrap_or(Type::Unresolved),
                    modifiers: ast_modifiers_to_hir(&prop.modifiers),
                    is_mutable: prop.is_mutable,
                    is_parameter_backed: false,
                    is_static: false,
                    getter: prop.getter.as_ref().map(|a| self.lower_accessor(a)),
                    setter: prop.setter.as_ref().map(|a| self.lower_accessor(a)),
                });
            }
            ast::ClassMember::Init(init) => {
                instance_initializers.push(HirInitializer::InitBlock(self.lower_block(&init.body)));
            }
            ast::ClassMember::Function(_) => {}
            ast::ClassMember::SecondaryConstructor(_) => {}
            ast::ClassMember::NestedClass(_) => {}
            ast::ClassMember::CompanionObject(_) => {}
        }
    }

    fn lower_accessor(&mut self, accessor: &ast::Accessor) -> HirAccessor {
        let param = accessor.param.map(|_| self.def_ids.next());
        let body = match &accessor.body {
            ast::FunctionBody::Block(b) => self.lower_block(b),
            ast::FunctionBody::Expr(e) => HirBlock {
                stmts: vec![HirStmt::Return(Some(self.lower_expr(e)), e.span())],
            },
        };
        HirAccessor { param, body }
    }

    fn lower_interface(&mut self, decl: &ast::InterfaceDecl) -> HirClass {
        let def_id = self.def_ids.next();
        HirClass {
            def_id,
            name: decl.name,
            internal_name: internal_name(&ast::Path::single(decl.name)),
            kind: ClassKind::Interface,
            modifiers: Vec::new(),
            type_params: decl.type_params.iter().map(|t| t.name).collect(),
            super_class: None,
            interfaces: decl.supertypes.iter().map(|s| internal_name(path_of(&s.ty))).collect(),
            is_data: false,
            fields: Vec::new(),
            constructors: Vec::new(),
            instance_initializers: Vec::new(),
            methods: Vec::new(),
            enum_entries: Vec::new(),
            span: decl.span,
        }
    }

    fn lower_object(&mut self, decl: &ast::ObjectDecl, _is_companion: bool) -> HirClass {
        HirClass {
            def_id: self.def_ids.next(),
            name: decl.name,
            internal_name: internal_name(&ast::Path::single(decl.name)),
            kind: ClassKind::Object,
            modifiers: Vec::new(),
            type_params: Vec::new(),
            super_class: None,
            interfaces: decl.supertypes.iter().map(|s| internal_name(path_of(&s.ty))).collect(),
            is_data: false,
            fields: Vec::new(),
            constructors: Vec::new(),
            instance_initializers: Vec::new(),
            methods: Vec::new(),
            enum_entries: Vec::new(),
            span: decl.span,
        }
    }

    /// Enum declarations record their entry list and synthesize two hidden
    /// fields `$name`/`$ordinal` (spec §4.2).
    fn lower_enum(&mut self, decl: &ast::EnumDecl) -> HirClass {
        let def_id = self.def_ids.next();
        let entries = decl
            .entries
            .iter()
            .enumerate()
            .map(|(ordinal, entry)| HirEnumEntry {
                def_id: self.def_ids.next(),
                name: entry.name,
                ordinal: ordinal as u32,
                args: entry.args.iter().map(|a| self.lower_expr(&a.value)).collect(),
            })
            .collect();

        let hidden_fields = vec![
            HirField {
                def_id: self.def_ids.next(),
                name: Symbol::intern("$name"),
                ty: Type::Class("nova/String".to_string(), Vec::new()),
                modifiers: Vec::new(),
                is_mutable: false,
                is_parameter_backed: false,
                is_static: false,
                getter: None,
                setter: None,
            },
            HirField {
                def_id: self.def_ids.next(),
                name: Symbol::intern("$ordinal"),
                ty: Type::Primitive(Primitive::Int),
                modifiers: Vec::new(),
                is_mutable: false,
                is_parameter_backed: false,
                is_static: false,
                getter: None,
                setter: None,
            },
        ];

        HirClass {
            def_id,
            name: decl.name,
            internal_name: internal_name(&ast::Path::single(decl.name)),
            kind: ClassKind::Enum,
            modifiers: Vec::new(),
            type_params: decl.type_params.iter().map(|t| t.name).collect(),
            super_class: None,
            interfaces: decl.supertypes.iter().map(|s| internal_name(path_of(&s.ty))).collect(),
            is_data: false,
            fields: hidden_fields,
            constructors: Vec::new(),
            instance_initializers: Vec::new(),
            methods: Vec::new(),
            enum_entries: entries,
            span: decl.span,
        }
    }

    /// Extension functions (`fun T.foo(...)`) lower to static functions with
    /// an implicit first parameter `$this: T`; references to `this` inside
    /// the body resolve to that parameter (spec §4.2).
    fn lower_function(&mut self, decl: &ast::FunctionDecl, enclosing_class: Option<DefId>) -> HirFunction {
        self.scope_tree.enter_scope(RibKind::Function);

        let receiver_ty = decl.receiver.as_ref().map(ast_type_to_hir);
        if decl.receiver.is_some() {
            let this_def = self.def_ids.next();
            self.scope_tree.add_binding(Symbol::KW_THIS, this_def);
        }

        let params: Vec<HirParam> = decl
            .params
            .iter()
            .map(|p| {
                let param_def = self.def_ids.next();
                self.scope_tree.add_binding(p.name, param_def);
                HirParam {
                    def_id: param_def,
                    name: p.name,
                    ty: ast_type_to_hir(&p.ty),
                    default: p.default.as_ref().map(|e| self.lower_expr(e)),
                    is_vararg: p.is_vararg,
                }
            })
            .collect();

        let body = decl.body.as_ref().map(|b| match b {
            ast::FunctionBody::Block(block) => self.lower_block(block),
            ast::FunctionBody::Expr(expr) => HirBlock {
                stmts: vec![HirStmt::Return(Some(self.lower_expr(expr)), expr.span())],
            },
        });

        self.scope_tree.exit_scope();

        HirFunction {
            def_id: self.def_ids.next(),
            name: decl.name,
            enclosing_class,
            receiver: receiver_ty,
            type_params: decl.type_params.iter().map(|t| t.name).collect(),
            params,
            return_type: decl.return_type.as_ref().map(ast_type_to_hir).unwrap_or(Type::Primitive(Primitive::Unit)),
            body,
            modifiers: ast_modifiers_to_hir(&decl.modifiers),
            is_extension: decl.receiver.is_some(),
            span: decl.span,
        }
    }

    fn lower_block(&mut self, block: &ast::Block) -> HirBlock {
        self.scope_tree.enter_scope(RibKind::Block);
        let stmts = block.stmts.iter().map(|s| self.lower_stmt(s)).collect();
        self.scope_tree.exit_scope();
        HirBlock { stmts }
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> HirStmt {
        match stmt {
            ast::Stmt::Expr(e) => HirStmt::Expr(self.lower_expr(e)),
            ast::Stmt::Property(prop) => {
                let def_id = self.def_ids.next();
                self.scope_tree.add_binding(prop.name, def_id);
                HirStmt::Local(HirLocal {
                    def_id,
                    name: prop.name,
                    ty: prop.ty.as_ref().map(ast_type_to_hir).unwrap_or(Type::Unresolved),
                    is_mutable: prop.is_mutable,
                    initializer: prop.initializer.as_ref().map(|e| self.lower_expr(e)),
                    span: prop.span,
                })
            }
            ast::Stmt::If(if_expr) => HirStmt::If(self.lower_if(if_expr)),
            ast::Stmt::When(when_expr) => HirStmt::When(self.lower_when(when_expr)),
            ast::Stmt::For(for_stmt) => {
                self.scope_tree.enter_scope(RibKind::Loop(for_stmt.label));
                let binding = match &for_stmt.binding {
                    ast::ForBinding::Single(name) => {
                        let def_id = self.def_ids.next();
                        self.scope_tree.add_binding(*name, def_id);
                        ForBinding::Single(def_id, *name)
                    }
                    ast::ForBinding::Destructured(names) => ForBinding::Destructured(
                        names
                            .iter()
                            .map(|name| {
                                let def_id = self.def_ids.next();
                                self.scope_tree.add_binding(*name, def_id);
                                (def_id, *name)
                            })
                            .collect(),
                    ),
                };
                let iterable = Box::new(self.lower_expr(&for_stmt.iterable));
                let body = self.lower_block(&for_stmt.body);
                self.scope_tree.exit_scope();
                HirStmt::For(HirFor {
                    binding,
                    iterable,
                    body,
                    label: for_stmt.label,
                    span: for_stmt.span,
                })
            }
            ast::Stmt::While(w) => {
                self.scope_tree.enter_scope(RibKind::Loop(w.label));
                let cond = Box::new(self.lower_expr(&w.cond));
                let body = self.lower_block(&w.body);
                self.scope_tree.exit_scope();
                HirStmt::While(HirWhile {
                    cond,
                    body,
                    label: w.label,
                    span: w.span,
                })
            }
            ast::Stmt::DoWhile(w) => {
                self.scope_tree.enter_scope(RibKind::Loop(w.label));
                let body = self.lower_block(&w.body);
                let cond = Box::new(self.lower_expr(&w.cond));
                self.scope_tree.exit_scope();
                HirStmt::DoWhile(HirWhile {
                    cond,
                    body,
                    label: w.label,
                    span: w.span,
                })
            }
            ast::Stmt::Try(t) => HirStmt::Try(self.lower_try(t)),
            ast::Stmt::Return(e, span) => HirStmt::Return(e.as_ref().map(|e| self.lower_expr(e)), *span),
            ast::Stmt::Break(label, span) => HirStmt::Break(*label, *span),
            ast::Stmt::Continue(label, span) => HirStmt::Continue(*label, *span),
            ast::Stmt::Throw(e, span) => HirStmt::Throw(self.lower_expr(e), *span),
            ast::Stmt::Guard(g) => {
                // Desugars to `if (!cond) { elseBlock }` (no separate HIR node;
                // the negated test matches §4.3.3's `if`-statement lowering).
                HirStmt::If(HirIf {
                    cond: Box::new(HirExpr {
                        kind: HirExprKind::Unary(novalang_ast::UnOp::Not, Box::new(self.lower_expr(&g.cond))),
                        ty: Type::Primitive(Primitive::Boolean),
                        span: g.span,
                    }),
                    then_branch: Box::new(HirExpr {
                        kind: HirExprKind::Block(self.lower_block(&g.else_block)),
                        ty: Type::Primitive(Primitive::Unit),
                        span: g.span,
                    }),
                    else_branch: None,
                })
            }
            ast::Stmt::Resource(r) => {
                // Lowered as a plain block; the backend applies try/finally
                // close semantics around resource lifetime.
                HirStmt::Expr(HirExpr {
                    kind: HirExprKind::Block(self.lower_block(&r.body)),
                    ty: Type::Primitive(Primitive::Unit),
                    span: r.span,
                })
            }
            ast::Stmt::Item(_) => HirStmt::Expr(HirExpr {
                kind: HirExprKind::Literal(novalang_ast::Literal::Null),
                ty: Type::Primitive(Primitive::Unit),
                span: Span::DUMMY,
            }),
        }
    }

    fn lower_if(&mut self, if_expr: &ast::IfExpr) -> HirIf {
        HirIf {
            cond: Box::new(self.lower_expr(&if_expr.cond)),
            then_branch: Box::new(self.lower_expr(&if_expr.then_branch)),
            else_branch: if_expr.else_branch.as_ref().map(|e| Box::new(self.lower_expr(e))),
        }
    }

    fn lower_when(&mut self, when_expr: &ast::WhenExpr) -> HirWhen {
        HirWhen {
            subject: when_expr.subject.as_ref().map(|e| Box::new(self.lower_expr(e))),
            arms: when_expr
                .arms
                .iter()
                .map(|arm| HirWhenArm {
                    conditions: arm
                        .conditions
                        .iter()
                        .map(|c| match c {
                            ast::WhenCondition::Equals(e) => HirWhenCondition::Equals(self.lower_expr(e)),
                            ast::WhenCondition::In(e) => HirWhenCondition::In(self.lower_expr(e)),
                            ast::WhenCondition::Is(ty) => HirWhenCondition::Is(type_internal_name(ty)),
                        })
                        .collect(),
                    is_else: arm.is_else,
                    body: Box::new(self.lower_expr(&arm.body)),
                })
                .collect(),
        }
    }

    fn lower_try(&mut self, try_expr: &ast::TryExpr) -> HirTry {
        HirTry {
            body: self.lower_block(&try_expr.body),
            catches: try_expr
                .catches
                .iter()
                .map(|c| {
                    self.scope_tree.enter_scope(RibKind::Block);
                    let param = self.def_ids.next();
                    self.scope_tree.add_binding(c.param, param);
                    let body = self.lower_block(&c.body);
                    self.scope_tree.exit_scope();
                    HirCatch {
                        param,
                        name: c.param,
                        exception_type: type_internal_name(&c.ty),
                        body,
                    }
                })
                .collect(),
            finally: try_expr.finally.as_ref().map(|b| self.lower_block(b)),
        }
    }

    fn lower_expr(&mut self, expr: &ast::Expr) -> HirExpr {
        let span = expr.span();
        match expr {
            ast::Expr::Literal(lit, _) => HirExpr {
                kind: HirExprKind::Literal(lit.clone()),
                ty: literal_type(lit),
                span,
            },
            ast::Expr::Ident(name, _) => {
                let kind = match self.scope_tree.resolve(*name) {
                    Some(def_id) => HirExprKind::Local(def_id, *name),
                    None => {
                        self.unresolved(*name, span);
                        HirExprKind::Unresolved(*name)
                    }
                };
                HirExpr {
                    kind,
                    ty: Type::Unresolved,
                    span,
                }
            }
            ast::Expr::Binary(b) => HirExpr {
                kind: HirExprKind::Binary(Box::new(self.lower_expr(&b.left)), b.op, Box::new(self.lower_expr(&b.right))),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Unary(u) => HirExpr {
                kind: HirExprKind::Unary(u.op, Box::new(self.lower_expr(&u.operand))),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Call(c) => HirExpr {
                kind: HirExprKind::Call(HirCall {
                    callee: Box::new(self.lower_expr(&c.callee)),
                    args: c
                        .args
                        .iter()
                        .map(|a| HirArg {
                            name: a.name,
                            value: self.lower_expr(&a.value),
                            is_spread: a.is_spread,
                        })
                        .collect(),
                    trailing_lambda: c.trailing_lambda.as_ref().map(|l| Box::new(self.lower_lambda(l))),
                }),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Index(i) => HirExpr {
                kind: HirExprKind::Index(Box::new(self.lower_expr(&i.receiver)), Box::new(self.lower_expr(&i.index))),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Member(m) => HirExpr {
                kind: HirExprKind::Member(Box::new(self.lower_expr(&m.receiver)), m.name, m.is_safe),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Assign(a) => HirExpr {
                kind: HirExprKind::Assign(Box::new(self.lower_expr(&a.target)), a.op, Box::new(self.lower_expr(&a.value))),
                ty: Type::Primitive(Primitive::Unit),
                span,
            },
            ast::Expr::Lambda(l) => HirExpr {
                kind: HirExprKind::Lambda(self.lower_lambda(l)),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::If(i) => HirExpr {
                kind: HirExprKind::If(self.lower_if(i)),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::When(w) => HirExpr {
                kind: HirExprKind::When(self.lower_when(w)),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Try(t) => HirExpr {
                kind: HirExprKind::Try(self.lower_try(t)),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Async(a) => HirExpr {
                kind: HirExprKind::Block(self.lower_block(&a.body)),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Await(e, _) => self.lower_expr(e),
            ast::Expr::TypeCheck(t) => HirExpr {
                kind: HirExprKind::TypeCheck(Box::new(self.lower_expr(&t.operand)), type_internal_name(&t.ty), t.negated),
                ty: Type::Primitive(Primitive::Boolean),
                span,
            },
            ast::Expr::TypeCast(t) => HirExpr {
                kind: HirExprKind::TypeCast(Box::new(self.lower_expr(&t.operand)), type_internal_name(&t.ty), t.is_safe),
                ty: ast_type_to_hir(&t.ty),
                span,
            },
            ast::Expr::Range(r) => HirExpr {
                kind: HirExprKind::Range(Box::new(self.lower_expr(&r.start)), Box::new(self.lower_expr(&r.end)), r.inclusive),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Spread(e, _) => self.lower_expr(e),
            ast::Expr::MethodRef(_) => HirExpr {
                kind: HirExprKind::Unresolved(Symbol::intern("<method-ref>")),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::ObjectLiteral(o) => HirExpr {
                kind: HirExprKind::Block(HirBlock {
                    stmts: o
                        .members
                        .iter()
                        .filter_map(|m| match m {
                            ast::ClassMember::Init(init) => Some(HirStmt::Expr(HirExpr {
                                kind: HirExprKind::Block(self.lower_block(&init.body)),
                                ty: Type::Primitive(Primitive::Unit),
                                span: init.span,
                            })),
                            _ => None,
                        })
                        .collect(),
                }),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::CollectionLiteral(c) => HirExpr {
                kind: HirExprKind::Block(HirBlock {
                    stmts: collection_elements(c).into_iter().map(|e| HirStmt::Expr(self.lower_expr(e))).collect(),
                }),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::StringInterpolation(s) => HirExpr {
                kind: HirExprKind::StringInterpolation(
                    s.parts
                        .iter()
                        .map(|p| match p {
                            ast::StringPart::Literal(sym) => HirStringPart::Literal(*sym),
                            ast::StringPart::Expr(e) => HirStringPart::Expr(self.lower_expr(e)),
                        })
                        .collect(),
                ),
                ty: Type::Class("nova/String".to_string(), Vec::new()),
                span,
            },
            ast::Expr::Placeholder(_) => HirExpr {
                kind: HirExprKind::Unresolved(Symbol::intern("_")),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Elvis(e) => HirExpr {
                kind: HirExprKind::Elvis(Box::new(self.lower_expr(&e.left)), Box::new(self.lower_expr(&e.right))),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::SafeCall(s) => HirExpr {
                kind: HirExprKind::SafeCall(Box::new(self.lower_expr(&s.receiver)), Box::new(self.lower_expr(&s.call))),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::NotNullAssert(e, _) => HirExpr {
                kind: HirExprKind::NotNullAssert(Box::new(self.lower_expr(e))),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::ErrorPropagation(e, _) => HirExpr {
                kind: HirExprKind::ErrorPropagation(Box::new(self.lower_expr(e))),
                ty: Type::Unresolved,
                span,
            },
            ast::Expr::Block(b) => HirExpr {
                kind: HirExprKind::Block(self.lower_block(b)),
                ty: Type::Unresolved,
                span,
            },
        }
    }

    fn lower_lambda(&mut self, lambda: &ast::LambdaExpr) -> HirLambda {
        self.scope_tree.enter_scope(RibKind::Lambda);
        let implicit_it = lambda.params.is_empty();
        if implicit_it {
            let it_def = self.def_ids.next();
            self.scope_tree.add_binding(Symbol::KW_IT, it_def);
        }
        let params: Vec<HirParam> = lambda
            .params
            .iter()
            .map(|p| {
                let param_def = self.def_ids.next();
                self.scope_tree.add_binding(p.name, param_def);
                HirParam {
                    def_id: param_def,
                    name: p.name,
                    ty: ast_type_to_hir(&p.ty),
                    default: None,
                    is_vararg: false,
                }
            })
            .collect();
        let body = Box::new(self.lower_expr(&lambda.body));
        self.scope_tree.exit_scope();
        HirLambda {
            params,
            implicit_it,
            body,
        }
    }
}

fn path_of(ty: &ast::TypeRef) -> &ast::Path {
    match ty {
        ast::TypeRef::Simple(p, _) => p,
        ast::TypeRef::Generic(p, _, _) => p,
        _ => panic!("malformed AST: supertype must be a simple or generic type reference"),
    }
}

fn type_internal_name(ty: &ast::TypeRef) -> String {
    match ty {
        ast::TypeRef::Simple(p, _) | ast::TypeRef::Generic(p, _, _) => internal_name(p),
        ast::TypeRef::Nullable(inner, _) => type_internal_name(inner),
        ast::TypeRef::Function(_) | ast::TypeRef::TypeParam(_, _, _) => Type::OBJECT.to_string(),
    }
}

fn literal_type(lit: &novalang_ast::Literal) -> Type {
    use novalang_ast::Literal as L;
    match lit {
        L::Int(_) => Type::Primitive(Primitive::Int),
        L::Long(_) => Type::Primitive(Primitive::Long),
        L::Float(_) => Type::Primitive(Primitive::Float),
        L::Double(_) => Type::Primitive(Primitive::Double),
        L::Char(_) => Type::Primitive(Primitive::Char),
        L::String(_) => Type::Class("nova/String".to_string(), Vec::new()),
        L::Boolean(_) => Type::Primitive(Primitive::Boolean),
        L::Null => Type::Nullable(Box::new(Type::Unresolved)),
    }
}

fn collection_elements(c: &ast::CollectionLiteralExpr) -> Vec<&ast::Expr> {
    match c {
        ast::CollectionLiteralExpr::List(items, _) | ast::CollectionLiteralExpr::Set(items, _) => items.iter().collect(),
        ast::CollectionLiteralExpr::Map(pairs, _) => pairs.iter().flat_map(|(k, v)| vec![k, v]).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use novalang_util::FileId;

    fn span() -> Span {
        Span::new(0, 1, 0, 0, FileId::new(0))
    }

    fn program_with(items: Vec<ast::Item>) -> ast::Program {
        ast::Program {
            package: None,
            imports: Vec::new(),
            items,
            span: span(),
        }
    }

    #[test]
    fn function_with_add_body_lowers_to_binary_hir() {
        let def_ids = DefIdGenerator::new();
        let handler = Handler::new();
        let mut lowerer = AstToHir::new(&def_ids, &handler);

        let func = ast::FunctionDecl {
            name: Symbol::intern("add"),
            type_params: vec![],
            receiver: None,
            params: vec![
                ast::Param {
                    name: Symbol::intern("a"),
                    ty: ast::TypeRef::Simple(ast::Path::single(Symbol::intern("Int")), span()),
                    default: None,
                    is_vararg: false,
                    span: span(),
                },
                ast::Param {
                    name: Symbol::intern("b"),
                    ty: ast::TypeRef::Simple(ast::Path::single(Symbol::intern("Int")), span()),
                    default: None,
                    is_vararg: false,
                    span: span(),
                },
            ],
            return_type: None,
            body: Some(ast::FunctionBody::Expr(Box::new(ast::Expr::Binary(ast::BinaryExpr {
                left: Box::new(ast::Expr::Ident(Symbol::intern("a"), span())),
                op: ast::BinOp::Add,
                right: Box::new(ast::Expr::Ident(Symbol::intern("b"), span())),
                span: span(),
            })))),
            modifiers: vec![],
            annotations: vec![],
            span: span(),
        };

        let module = lowerer.lower_program(&program_with(vec![ast::Item::Function(func)]));
        assert_eq!(module.functions.len(), 1);
        let body = module.functions[0].body.as_ref().unwrap();
        assert_eq!(body.stmts.len(), 1);
        match &body.stmts[0] {
            HirStmt::Return(Some(expr), _) => {
                assert!(matches!(expr.kind, HirExprKind::Binary(_, ast::BinOp::Add, _)));
            }
            other => panic!("expected return statement, got {:?}", other),
        }
    }

    #[test]
    fn unresolved_identifier_reports_a_diagnostic() {
        let def_ids = DefIdGenerator::new();
        let handler = Handler::new();
        let mut lowerer = AstToHir::new(&def_ids, &handler);
        let expr = ast::Expr::Ident(Symbol::intern("ghost"), span());
        let hir = lowerer.lower_expr(&expr);
        assert!(matches!(hir.kind, HirExprKind::Unresolved(_)));
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn data_class_constructor_params_become_parameter_backed_fields() {
        let def_ids = DefIdGenerator::new();
        let handler = Handler::new();
        let mut lowerer = AstToHir::new(&def_ids, &handler);

        let class = ast::ClassDecl {
            name: Symbol::intern("P"),
            type_params: vec![],
            modifiers: vec![],
            annotations: vec![],
            is_data: true,
            primary_constructor: Some(ast::PrimaryConstructor {
                params: vec![
                    ast::ConstructorParam {
                        name: Symbol::intern("x"),
                        ty: ast::TypeRef::Simple(ast::Path::single(Symbol::intern("Int")), span()),
                        is_field: true,
                        is_mutable: false,
                        default: None,
                        modifiers: vec![],
                        span: span(),
                    },
                    ast::ConstructorParam {
                        name: Symbol::intern("y"),
                        ty: ast::TypeRef::Simple(ast::Path::single(Symbol::intern("Int")), span()),
                        is_field: true,
                        is_mutable: false,
                        default: None,
                        modifiers: vec![],
                        span: span(),
                    },
                ],
                modifiers: vec![],
                span: span(),
            }),
            supertypes: vec![],
            members: vec![],
            span: span(),
        };

        let module = lowerer.lower_program(&program_with(vec![ast::Item::Class(class)]));
        let hir_class = &module.classes[0];
        assert_eq!(hir_class.fields.len(), 2);
        assert!(hir_class.fields.iter().all(|f| f.is_parameter_backed));
        assert!(hir_class.is_data);
    }
}
