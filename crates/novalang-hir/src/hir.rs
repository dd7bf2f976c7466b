use novalang_ast::{BinOp, Literal, UnOp};
use novalang_util::{DefId, Span, Symbol};

use crate::types::Type;

/// A fully resolved module, ready for `HirToMir::lower` (spec §3 "HIR").
#[derive(Debug, Clone, Default)]
pub struct HirModule {
    pub package: Option<String>,
    pub imports: ResolvedImports,
    pub classes: Vec<HirClass>,
    pub functions: Vec<HirFunction>,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedImports {
    /// simple name -> internal name, for native-foreign (e.g. JVM/host) imports.
    pub native_foreign: Vec<(Symbol, String)>,
    pub static_imports: Vec<(Symbol, String)>,
    pub wildcard_imports: Vec<String>,
    pub source_imports: Vec<SourceImport>,
}

#[derive(Debug, Clone)]
pub struct SourceImport {
    pub qualified_name: String,
    pub alias: Option<Symbol>,
    pub is_wildcard: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Object,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Internal,
    Open,
    Abstract,
    Sealed,
    Override,
    Operator,
    Inline,
    Suspend,
}

#[derive(Debug, Clone)]
pub struct HirClass {
    pub def_id: DefId,
    pub name: Symbol,
    pub internal_name: String,
    pub kind: ClassKind,
    pub modifiers: Vec<Modifier>,
    pub type_params: Vec<Symbol>,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub is_data: bool,
    pub fields: Vec<HirField>,
    pub constructors: Vec<HirConstructor>,
    /// Merged `init` blocks and field initializers in source order (spec §4.2).
    pub instance_initializers: Vec<HirInitializer>,
    pub methods: Vec<HirFunction>,
    pub enum_entries: Vec<HirEnumEntry>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum HirInitializer {
    FieldInit(Symbol, HirExpr),
    InitBlock(HirBlock),
}

#[derive(Debug, Clone)]
pub struct HirField {
    pub def_id: DefId,
    pub name: Symbol,
    pub ty: Type,
    pub modifiers: Vec<Modifier>,
    pub is_mutable: bool,
    /// Set for primary-constructor `val`/`var` parameters that also declare a field.
    pub is_parameter_backed: bool,
    pub is_static: bool,
    pub getter: Option<HirAccessor>,
    pub setter: Option<HirAccessor>,
}

#[derive(Debug, Clone)]
pub struct HirAccessor {
    pub param: Option<DefId>,
    pub body: HirBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationKind {
    ThisCall,
    SuperCall,
}

#[derive(Debug, Clone)]
pub struct HirDelegation {
    pub kind: DelegationKind,
    pub args: Vec<HirExpr>,
}

#[derive(Debug, Clone)]
pub struct HirConstructor {
    pub def_id: DefId,
    pub params: Vec<HirParam>,
    pub is_primary: bool,
    pub delegation: Option<HirDelegation>,
    pub super_init_args: Vec<HirExpr>,
    pub body: HirBlock,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct HirEnumEntry {
    pub def_id: DefId,
    pub name: Symbol,
    pub ordinal: u32,
    pub args: Vec<HirExpr>,
}

#[derive(Debug, Clone)]
pub struct HirParam {
    pub def_id: DefId,
    pub name: Symbol,
    pub ty: Type,
    pub default: Option<HirExpr>,
    pub is_vararg: bool,
}

#[derive(Debug, Clone)]
pub struct HirFunction {
    pub def_id: DefId,
    pub name: Symbol,
    pub enclosing_class: Option<DefId>,
    /// `Some` for extension functions — the explicit receiver type that
    /// `this` inside the body is aliased to (spec §4.2, §9 "'This' ambiguity").
    pub receiver: Option<Type>,
    pub type_params: Vec<Symbol>,
    pub params: Vec<HirParam>,
    pub return_type: Type,
    pub body: Option<HirBlock>,
    pub modifiers: Vec<Modifier>,
    pub is_extension: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct HirBlock {
    pub stmts: Vec<HirStmt>,
}

#[derive(Debug, Clone)]
pub enum HirStmt {
    Expr(HirExpr),
    Local(HirLocal),
    If(HirIf),
    When(HirWhen),
    For(HirFor),
    While(HirWhile),
    DoWhile(HirWhile),
    Try(HirTry),
    Return(Option<HirExpr>, Span),
    Break(Option<Symbol>, Span),
    Continue(Option<Symbol>, Span),
    Throw(HirExpr, Span),
}

#[derive(Debug, Clone)]
pub struct HirLocal {
    pub def_id: DefId,
    pub name: Symbol,
    pub ty: Type,
    pub is_mutable: bool,
    pub initializer: Option<HirExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ForBinding {
    Single(DefId, Symbol),
    Destructured(Vec<(DefId, Symbol)>),
}

#[derive(Debug, Clone)]
pub struct HirFor {
    pub binding: ForBinding,
    pub iterable: Box<HirExpr>,
    pub body: HirBlock,
    pub label: Option<Symbol>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct HirWhile {
    pub cond: Box<HirExpr>,
    pub body: HirBlock,
    pub label: Option<Symbol>,
    pub span: Span,
}

/// A resolved HIR expression. Every variant carries the type inference/
/// propagation assigned it (`ty`), per spec §3 "each expression carries a
/// resolved type".
#[derive(Debug, Clone)]
pub struct HirExpr {
    pub kind: HirExprKind,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum HirExprKind {
    Literal(Literal),
    /// A resolved local/parameter/field reference.
    Local(DefId, Symbol),
    /// Resolution could not classify this identifier (spec §7 "unresolved symbol").
    Unresolved(Symbol),
    Binary(Box<HirExpr>, BinOp, Box<HirExpr>),
    Unary(UnOp, Box<HirExpr>),
    Call(HirCall),
    Index(Box<HirExpr>, Box<HirExpr>),
    Member(Box<HirExpr>, Symbol, bool),
    Assign(Box<HirExpr>, Option<BinOp>, Box<HirExpr>),
    Lambda(HirLambda),
    If(HirIf),
    When(HirWhen),
    Try(HirTry),
    TypeCheck(Box<HirExpr>, String, bool),
    TypeCast(Box<HirExpr>, String, bool),
    Range(Box<HirExpr>, Box<HirExpr>, bool),
    StringInterpolation(Vec<HirStringPart>),
    Elvis(Box<HirExpr>, Box<HirExpr>),
    SafeCall(Box<HirExpr>, Box<HirExpr>),
    NotNullAssert(Box<HirExpr>),
    ErrorPropagation(Box<HirExpr>),
    Block(HirBlock),
}

#[derive(Debug, Clone)]
pub enum HirStringPart {
    Literal(Symbol),
    Expr(HirExpr),
}

#[derive(Debug, Clone)]
pub struct HirArg {
    pub name: Option<Symbol>,
    pub value: HirExpr,
    pub is_spread: bool,
}

#[derive(Debug, Clone)]
pub struct HirCall {
    pub callee: Box<HirExpr>,
    pub args: Vec<HirArg>,
    pub trailing_lambda: Option<Box<HirLambda>>,
}

#[derive(Debug, Clone)]
pub struct HirLambda {
    pub params: Vec<HirParam>,
    /// `true` when no parameters were declared but the body references `it`.
    pub implicit_it: bool,
    pub body: Box<HirExpr>,
}

#[derive(Debug, Clone)]
pub struct HirIf {
    pub cond: Box<HirExpr>,
    pub then_branch: Box<HirExpr>,
    pub else_branch: Option<Box<HirExpr>>,
}

#[derive(Debug, Clone)]
pub struct HirWhen {
    pub subject: Option<Box<HirExpr>>,
    pub arms: Vec<HirWhenArm>,
}

#[derive(Debug, Clone)]
pub struct HirWhenArm {
    pub conditions: Vec<HirWhenCondition>,
    pub is_else: bool,
    pub body: Box<HirExpr>,
}

#[derive(Debug, Clone)]
pub enum HirWhenCondition {
    Equals(HirExpr),
    In(HirExpr),
    Is(String),
}

#[derive(Debug, Clone)]
pub struct HirTry {
    pub body: HirBlock,
    pub catches: Vec<HirCatch>,
    pub finally: Option<HirBlock>,
}

#[derive(Debug, Clone)]
pub struct HirCatch {
    pub param: DefId,
    pub name: Symbol,
    pub exception_type: String,
    pub body: HirBlock,
}
