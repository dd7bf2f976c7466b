//! The runtime-facing IR produced by `HirToMir::lower` (spec §3 "MIR",
//! §6 "External interfaces"). Basic blocks of three-address instructions,
//! explicit terminators, typed locals and try/catch tables — bit-exact in
//! its descriptor format and opcode set so any backend can consume it.

use novalang_util::{Idx, IndexVec, Span, Symbol};

novalang_util::define_idx!(pub struct LocalId);
novalang_util::define_idx!(pub struct BlockId);

/// A lowered, fully resolved compilation unit. Immutable once returned from
/// `lower` — any number of backends may read the same `MirModule`.
#[derive(Debug, Clone, Default)]
pub struct MirModule {
    pub package: Option<String>,
    pub classes: Vec<MirClass>,
    pub functions: Vec<MirFunction>,
    pub extension_properties: Vec<ExtensionPropertyInfo>,
    pub extension_functions: Vec<ExtensionFunctionInfo>,
    pub native_foreign_imports: Vec<(Symbol, String)>,
    pub static_imports: Vec<(Symbol, String)>,
    pub wildcard_imports: Vec<String>,
    pub source_imports: Vec<SourceImportInfo>,
}

#[derive(Debug, Clone)]
pub struct SourceImportInfo {
    pub qualified_name: String,
    pub alias: Option<Symbol>,
    pub is_wildcard: bool,
}

#[derive(Debug, Clone)]
pub struct ExtensionPropertyInfo {
    pub receiver_internal_name: String,
    pub property_name: Symbol,
    pub getter_func_name: String,
}

#[derive(Debug, Clone)]
pub struct ExtensionFunctionInfo {
    pub receiver_internal_name: String,
    pub function_name: Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Object,
    Enum,
    Annotation,
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
    Static,
}

#[derive(Debug, Clone)]
pub struct MirClass {
    pub internal_name: String,
    pub kind: ClassKind,
    pub modifiers: Vec<Modifier>,
    /// `"java/lang/Object"` unless an explicit superclass is declared.
    pub super_class: String,
    pub interfaces: Vec<String>,
    pub fields: Vec<MirField>,
    pub methods: Vec<MirFunction>,
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MirField {
    pub name: Symbol,
    pub ty: MirType,
    pub modifiers: Vec<Modifier>,
}

/// A single function or method, lowered to a control-flow graph.
#[derive(Debug, Clone)]
pub struct MirFunction {
    pub name: Symbol,
    pub return_type: MirType,
    pub params: Vec<MirLocal>,
    pub modifiers: Vec<Modifier>,
    pub locals: IndexVec<LocalId, MirLocal>,
    pub blocks: IndexVec<BlockId, BasicBlock>,
    pub try_catch_entries: Vec<TryCatchEntry>,
    /// Locals holding the lowered superclass-constructor-call arguments
    /// (spec §4.3.2), in order.
    pub super_init_arg_locals: Option<Vec<LocalId>>,
    /// Locals holding a secondary constructor's delegation-call arguments,
    /// present only when delegation-chain inlining did not apply.
    pub delegation_arg_locals: Option<Vec<LocalId>>,
    /// The entry block once default-parameter prologue handling has run
    /// (spec §4.3.1); synthetic field stores are inserted here, not at
    /// block 0, when they differ.
    pub body_start_block_id: Option<BlockId>,
    pub descriptor: Option<String>,
    pub type_params: Vec<Symbol>,
}

impl MirFunction {
    pub fn new(name: Symbol, return_type: MirType) -> Self {
        MirFunction {
            name,
            return_type,
            params: Vec::new(),
            modifiers: Vec::new(),
            locals: IndexVec::new(),
            blocks: IndexVec::new(),
            try_catch_entries: Vec::new(),
            super_init_arg_locals: None,
            delegation_arg_locals: None,
            body_start_block_id: None,
            descriptor: None,
            type_params: Vec::new(),
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry_block(&self) -> BlockId {
        self.body_start_block_id.unwrap_or(BlockId::from_usize(0))
    }
}

#[derive(Debug, Clone)]
pub struct MirLocal {
    pub name: Option<Symbol>,
    pub ty: MirType,
}

/// Tag set for a MIR-level type (spec §3 "MirType", §6 descriptor format).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirType {
    Void,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
    /// `class_name` starting with `[` encodes an array type.
    Object(String),
}

impl MirType {
    pub const OBJECT: &'static str = "java/lang/Object";

    pub fn object() -> MirType {
        MirType::Object(MirType::OBJECT.to_string())
    }

    pub fn array_of(element: &MirType) -> MirType {
        MirType::Object(format!("[{}", element.descriptor_char()))
    }

    /// Bit-exact per spec §4.1/§6: primitives get a single character, object
    /// types are `L<internal-name>;`, arrays keep their `[` prefix verbatim.
    pub fn descriptor_char(&self) -> String {
        match self {
            MirType::Void => "V".to_string(),
            MirType::Int => "I".to_string(),
            MirType::Long => "J".to_string(),
            MirType::Float => "F".to_string(),
            MirType::Double => "D".to_string(),
            MirType::Boolean => "Z".to_string(),
            MirType::Char => "C".to_string(),
            MirType::Object(name) if name.starts_with('[') => name.clone(),
            MirType::Object(name) => format!("L{};", name),
        }
    }

    pub fn from_hir(ty: &novalang_hir::Type) -> MirType {
        use novalang_hir::Primitive as P;
        use novalang_hir::Type as T;
        match ty {
            T::Primitive(P::Int) => MirType::Int,
            T::Primitive(P::Long) => MirType::Long,
            T::Primitive(P::Float) => MirType::Float,
            T::Primitive(P::Double) => MirType::Double,
            T::Primitive(P::Boolean) => MirType::Boolean,
            T::Primitive(P::Char) => MirType::Char,
            T::Primitive(P::Unit) | T::Primitive(P::Nothing) => MirType::Void,
            T::Class(name, _) => MirType::Object(name.clone()),
            T::Nullable(inner) => MirType::from_hir(inner),
            T::Function(_) | T::Generic(_, _) | T::Unresolved => MirType::object(),
        }
    }
}

/// A bit-exact method descriptor, `(<params>)<ret>` (spec §4.1/§6).
pub fn method_descriptor(params: &[MirType], ret: &MirType) -> String {
    let mut out = String::from("(");
    for param in params {
        out.push_str(&param.descriptor_char());
    }
    out.push(')');
    out.push_str(&ret.descriptor_char());
    out
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instructions: Vec<MirInst>,
    pub terminator: Terminator,
}

/// A single three-address instruction (spec §3 "MirInst", §6 opcode list).
#[derive(Debug, Clone)]
pub struct MirInst {
    pub opcode: Opcode,
    /// `None` for void-producing instructions.
    pub destination: Option<LocalId>,
    pub operands: Vec<LocalId>,
    pub immediate: Option<Immediate>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Immediate {
    Int(i64),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(char),
    Str(Symbol),
    /// `owner#name` for field/static/invoke opcodes.
    Member(String, Symbol),
    /// Internal class name, for `NEW_OBJECT`/`TYPE_CHECK`/`TYPE_CAST`/`CONST_CLASS`.
    ClassName(String),
    /// Element type descriptor for `NEW_TYPED_ARRAY`.
    ElementType(MirType),
    Descriptor(String),
    BinOp(BinOp),
    UnOp(UnOp),
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    ConstInt,
    ConstLong,
    ConstFloat,
    ConstDouble,
    ConstString,
    ConstBool,
    ConstChar,
    ConstNull,
    ConstClass,
    Move,
    NewObject,
    NewArray,
    NewTypedArray,
    GetField,
    SetField,
    GetStatic,
    SetStatic,
    IndexGet,
    IndexSet,
    InvokeStatic,
    InvokeVirtual,
    InvokeInterface,
    BinOp,
    UnaryOp,
    TypeCheck,
    TypeCast,
}

/// Control transfer out of a basic block (spec §3 "BasicBlock", §6 terminators).
#[derive(Debug, Clone)]
pub enum Terminator {
    Return(LocalId),
    ReturnVoid,
    Goto(BlockId),
    Branch {
        cond: LocalId,
        then_block: BlockId,
        else_block: BlockId,
    },
    Switch {
        discriminant: LocalId,
        targets: Vec<(SwitchKey, BlockId)>,
        default: BlockId,
    },
    Throw(LocalId),
    Unreachable,
}

/// A `when` switch-optimization case key (spec §4.3.3): enum entry name,
/// integer literal, or string literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SwitchKey {
    Int(i64),
    Str(String),
    EnumEntry(String),
}

/// One exception-table row (spec §3 "TryCatchEntry", §4.3.4).
#[derive(Debug, Clone)]
pub struct TryCatchEntry {
    pub start_block: BlockId,
    pub end_block: BlockId,
    pub handler_block: BlockId,
    /// `None` is a catch-all (finally rethrow handlers, bare `catch (e: Throwable)`).
    pub exception_internal_name: Option<String>,
    pub exception_local: LocalId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_bit_exact_for_primitives_and_objects() {
        let params = vec![MirType::Int, MirType::Object("nova/String".to_string())];
        assert_eq!(
            method_descriptor(&params, &MirType::Boolean),
            "(ILnova/String;)Z"
        );
    }

    #[test]
    fn array_type_keeps_bracket_prefix_verbatim() {
        let arr = MirType::array_of(&MirType::Int);
        assert_eq!(arr.descriptor_char(), "[I");
    }

    #[test]
    fn unresolved_hir_type_collapses_to_object() {
        let mir_ty = MirType::from_hir(&novalang_hir::Type::Unresolved);
        assert_eq!(mir_ty, MirType::object());
    }
}
