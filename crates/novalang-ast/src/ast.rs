//! novalang-ast - AST Node Definitions
//!
//! Node definitions handed off by the parser; no parsing logic lives here.

use novalang_util::{Span, Symbol};

/// A source file: optional package declaration, imports, then top-level items.
#[derive(Debug, Clone)]
pub struct Program {
    pub package: Option<Path>,
    pub imports: Vec<ImportDecl>,
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: Path,
    pub alias: Option<Symbol>,
    pub is_wildcard: bool,
    pub span: Span,
}

/// Top-level declaration.
#[derive(Debug, Clone)]
pub enum Item {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Object(ObjectDecl),
    Enum(EnumDecl),
    Function(FunctionDecl),
    Property(PropertyDecl),
    TypeAlias(TypeAliasDecl),
}

impl Item {
    pub fn name(&self) -> Symbol {
        match self {
            Item::Class(d) => d.name,
            Item::Interface(d) => d.name,
            Item::Object(d) => d.name,
            Item::Enum(d) => d.name,
            Item::Function(d) => d.name,
            Item::Property(d) => d.name,
            Item::TypeAlias(d) => d.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
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
    Companion,
    Vararg,
    Const,
}

#[derive(Debug, Clone)]
pub struct Annotation {
    pub name: Symbol,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    Invariant,
    In,
    Out,
}

#[derive(Debug, Clone)]
pub struct TypeParam {
    pub name: Symbol,
    pub bound: Option<TypeRef>,
    pub reified: bool,
    pub variance: Variance,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Symbol,
    pub type_params: Vec<TypeParam>,
    pub modifiers: Vec<Modifier>,
    pub annotations: Vec<Annotation>,
    pub is_data: bool,
    pub primary_constructor: Option<PrimaryConstructor>,
    pub supertypes: Vec<Supertype>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PrimaryConstructor {
    pub params: Vec<ConstructorParam>,
    pub modifiers: Vec<Modifier>,
    pub span: Span,
}

/// A primary-constructor parameter. `is_field` is set for `val`/`var`
/// prefixed parameters, which declare a property in addition to a parameter
/// (spec §4.2: "parameter-backed fields").
#[derive(Debug, Clone)]
pub struct ConstructorParam {
    pub name: Symbol,
    pub ty: TypeRef,
    pub is_field: bool,
    pub is_mutable: bool,
    pub default: Option<Expr>,
    pub modifiers: Vec<Modifier>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Supertype {
    pub ty: TypeRef,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Property(PropertyDecl),
    Function(FunctionDecl),
    SecondaryConstructor(SecondaryConstructor),
    Init(InitBlock),
    NestedClass(Box<ClassDecl>),
    CompanionObject(ObjectDecl),
}

#[derive(Debug, Clone)]
pub struct SecondaryConstructor {
    pub params: Vec<Param>,
    pub delegation: Option<ConstructorDelegation>,
    pub body: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationKind {
    ThisCall,
    SuperCall,
}

#[derive(Debug, Clone)]
pub struct ConstructorDelegation {
    pub kind: DelegationKind,
    pub args: Vec<Argument>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InitBlock {
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: Symbol,
    pub type_params: Vec<TypeParam>,
    pub supertypes: Vec<Supertype>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectDecl {
    pub name: Symbol,
    pub supertypes: Vec<Supertype>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Symbol,
    pub type_params: Vec<TypeParam>,
    pub supertypes: Vec<Supertype>,
    pub entries: Vec<EnumEntry>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumEntry {
    pub name: Symbol,
    pub args: Vec<Argument>,
    pub body: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub type_params: Vec<TypeParam>,
    /// `Some` for `fun T.foo(...)` extension functions; `T` is the receiver.
    pub receiver: Option<TypeRef>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
    pub body: Option<FunctionBody>,
    pub modifiers: Vec<Modifier>,
    pub annotations: Vec<Annotation>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Block),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub ty: TypeRef,
    pub default: Option<Expr>,
    pub is_vararg: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: Symbol,
    pub ty: Option<TypeRef>,
    pub initializer: Option<Expr>,
    pub is_mutable: bool,
    pub getter: Option<Accessor>,
    pub setter: Option<Accessor>,
    pub modifiers: Vec<Modifier>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Accessor {
    /// Setter's value parameter name (`set(v)`); `None` for getters.
    pub param: Option<Symbol>,
    pub body: FunctionBody,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeAliasDecl {
    pub name: Symbol,
    pub type_params: Vec<TypeParam>,
    pub target: TypeRef,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Property(PropertyDecl),
    If(IfExpr),
    When(WhenExpr),
    For(ForStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    Try(TryExpr),
    Return(Option<Expr>, Span),
    Break(Option<Symbol>, Span),
    Continue(Option<Symbol>, Span),
    Throw(Expr, Span),
    Guard(GuardStmt),
    Resource(ResourceStmt),
    Item(Item),
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub binding: ForBinding,
    pub iterable: Expr,
    pub body: Block,
    pub label: Option<Symbol>,
    pub span: Span,
}

/// `for (x in ...)` binds one name; `for ((k, v) in ...)` destructures via
/// `componentN()` calls (spec §4.3.3).
#[derive(Debug, Clone)]
pub enum ForBinding {
    Single(Symbol),
    Destructured(Vec<Symbol>),
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Block,
    pub label: Option<Symbol>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DoWhileStmt {
    pub body: Block,
    pub cond: Expr,
    pub label: Option<Symbol>,
    pub span: Span,
}

/// `guard <cond> else { <early-exit> }` — inverse of `if`, always exits the
/// enclosing scope on the else branch.
#[derive(Debug, Clone)]
pub struct GuardStmt {
    pub cond: Expr,
    pub else_block: Block,
    pub span: Span,
}

/// `use (r1 = expr1, r2 = expr2) { ... }` scoped-resource statement.
#[derive(Debug, Clone)]
pub struct ResourceStmt {
    pub resources: Vec<(Symbol, Expr)>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(Symbol),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal, Span),
    Ident(Symbol, Span),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Call(CallExpr),
    Index(IndexExpr),
    Member(MemberExpr),
    Assign(AssignExpr),
    Lambda(LambdaExpr),
    If(IfExpr),
    When(WhenExpr),
    Try(TryExpr),
    Async(AsyncExpr),
    Await(Box<Expr>, Span),
    TypeCheck(TypeCheckExpr),
    TypeCast(TypeCastExpr),
    Range(RangeExpr),
    Spread(Box<Expr>, Span),
    MethodRef(MethodRefExpr),
    ObjectLiteral(ObjectLiteralExpr),
    CollectionLiteral(CollectionLiteralExpr),
    StringInterpolation(StringInterpolationExpr),
    Placeholder(Span),
    Elvis(ElvisExpr),
    SafeCall(SafeCallExpr),
    NotNullAssert(Box<Expr>, Span),
    ErrorPropagation(Box<Expr>, Span),
    Block(Block),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, s) => *s,
            Expr::Ident(_, s) => *s,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Assign(e) => e.span,
            Expr::Lambda(e) => e.span,
            Expr::If(e) => e.span,
            Expr::When(e) => e.span,
            Expr::Try(e) => e.span,
            Expr::Async(e) => e.span,
            Expr::Await(_, s) => *s,
            Expr::TypeCheck(e) => e.span,
            Expr::TypeCast(e) => e.span,
            Expr::Range(e) => e.span,
            Expr::Spread(_, s) => *s,
            Expr::MethodRef(e) => e.span,
            Expr::ObjectLiteral(e) => e.span,
            Expr::CollectionLiteral(e) => e.span(),
            Expr::StringInterpolation(e) => e.span,
            Expr::Placeholder(s) => *s,
            Expr::Elvis(e) => e.span,
            Expr::SafeCall(e) => e.span,
            Expr::NotNullAssert(_, s) => *s,
            Expr::ErrorPropagation(_, s) => *s,
            Expr::Block(b) => b.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinOp,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    In,
    NotIn,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub name: Option<Symbol>,
    pub value: Expr,
    pub is_spread: bool,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub type_args: Vec<TypeRef>,
    pub args: Vec<Argument>,
    /// A trailing lambda syntactically placed after the closing paren:
    /// `items.filter { it > 0 }` or, with no explicit arg list, `run { ... }`.
    pub trailing_lambda: Option<Box<LambdaExpr>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub receiver: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub receiver: Box<Expr>,
    pub name: Symbol,
    pub is_safe: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub target: Box<Expr>,
    /// `None` for plain `=`; `Some(op)` for compound forms (`+=`, `-=`, ...).
    pub op: Option<BinOp>,
    pub value: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub params: Vec<Param>,
    pub body: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfExpr {
    pub cond: Box<Expr>,
    pub then_branch: Box<Expr>,
    pub else_branch: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhenExpr {
    pub subject: Option<Box<Expr>>,
    pub arms: Vec<WhenArm>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhenArm {
    pub conditions: Vec<WhenCondition>,
    pub is_else: bool,
    pub body: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum WhenCondition {
    Equals(Expr),
    In(Expr),
    Is(TypeRef),
}

#[derive(Debug, Clone)]
pub struct TryExpr {
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Symbol,
    pub ty: TypeRef,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AsyncExpr {
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeCheckExpr {
    pub operand: Box<Expr>,
    pub ty: TypeRef,
    pub negated: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeCastExpr {
    pub operand: Box<Expr>,
    pub ty: TypeRef,
    pub is_safe: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RangeExpr {
    pub start: Box<Expr>,
    pub end: Box<Expr>,
    pub inclusive: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodRefExpr {
    pub receiver: Option<Box<Expr>>,
    pub name: Symbol,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ObjectLiteralExpr {
    pub supertypes: Vec<Supertype>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum CollectionLiteralExpr {
    List(Vec<Expr>, Span),
    Set(Vec<Expr>, Span),
    Map(Vec<(Expr, Expr)>, Span),
}

impl CollectionLiteralExpr {
    pub fn span(&self) -> Span {
        match self {
            CollectionLiteralExpr::List(_, s) => *s,
            CollectionLiteralExpr::Set(_, s) => *s,
            CollectionLiteralExpr::Map(_, s) => *s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StringInterpolationExpr {
    pub parts: Vec<StringPart>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StringPart {
    Literal(Symbol),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct ElvisExpr {
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SafeCallExpr {
    pub receiver: Box<Expr>,
    pub call: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub segments: Vec<Symbol>,
}

impl Path {
    pub fn single(name: Symbol) -> Self {
        Path {
            segments: vec![name],
        }
    }

    pub fn last(&self) -> Symbol {
        *self.segments.last().expect("path has at least one segment")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Simple(Path, Span),
    Nullable(Box<TypeRef>, Span),
    Generic(Path, Vec<TypeArg>, Span),
    Function(Box<FunctionType>),
    /// A reference to an in-scope type parameter, carrying its upper bound
    /// if declared (`<T : Comparable<T>>`).
    TypeParam(Symbol, Option<Box<TypeRef>>, Span),
}

impl TypeRef {
    pub fn span(&self) -> Span {
        match self {
            TypeRef::Simple(_, s) => *s,
            TypeRef::Nullable(_, s) => *s,
            TypeRef::Generic(_, _, s) => *s,
            TypeRef::Function(f) => f.span,
            TypeRef::TypeParam(_, _, s) => *s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeArg {
    pub ty: TypeRef,
    pub variance: Variance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub receiver: Option<Box<TypeRef>>,
    pub params: Vec<TypeRef>,
    pub return_type: Box<TypeRef>,
    pub is_suspend: bool,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;
    use novalang_util::FileId;

    fn dummy_span() -> Span {
        Span::new(0, 1, 0, 0, FileId::new(0))
    }

    #[test]
    fn expr_span_dispatches_through_every_boxed_variant() {
        let span = dummy_span();
        let lit = Expr::Literal(Literal::Int(1), span);
        assert_eq!(lit.span(), span);

        let not_null = Expr::NotNullAssert(Box::new(lit), span);
        assert_eq!(not_null.span(), span);
    }

    #[test]
    fn path_last_returns_final_segment() {
        let path = Path {
            segments: vec![Symbol::intern("nova"), Symbol::intern("util"), Symbol::intern("List")],
        };
        assert_eq!(path.last().as_str(), "List");
    }

    #[test]
    fn item_name_covers_every_declaration_kind() {
        let span = dummy_span();
        let func = Item::Function(FunctionDecl {
            name: Symbol::intern("main"),
            type_params: vec![],
            receiver: None,
            params: vec![],
            return_type: None,
            body: None,
            modifiers: vec![],
            annotations: vec![],
            span,
        });
        assert_eq!(func.name().as_str(), "main");
    }
}
