use serde::Serialize;

use crate::span::Spanned;

/// Every AST node is an expression with a source span; a program is a list of them.
pub type Node = Spanned<Expr>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expr {
    Literal { value: Literal },
    Identifier { name: String },
    BinaryOp {
        op: BinOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Node>,
    },
    /// `target := value`; the target is an identifier or a destructuring pattern.
    Assignment {
        target: Box<Node>,
        value: Box<Node>,
    },
    FieldAccess {
        object: Box<Node>,
        field: Spanned<String>,
    },
    /// `receiver.method(args)`, or a global call `method(args)` when `receiver` is `None`.
    MethodCall {
        receiver: Option<Box<Node>>,
        method: Spanned<String>,
        args: Vec<Node>,
    },
    Block {
        params: Vec<Param>,
        body: Vec<Node>,
    },
    MatchExpression {
        scrutinee: Box<Node>,
        arms: Vec<PatternArm>,
    },
    TypeInstance {
        name: Spanned<String>,
        fields: Vec<(Spanned<String>, Node)>,
    },
    TypeDeclaration { decl: TypeDecl },
    FunctionDeclaration { decl: FunctionDecl },
    /// `?` (binds nothing) or `?name`, optionally refined by a nested pattern.
    CapturePattern {
        name: Option<String>,
        pattern: Option<Box<Node>>,
    },
    QuotedForm { body: Box<Node> },
    Array { elements: Vec<Node> },
    Object { entries: Vec<(Spanned<String>, Node)> },
    /// Produced by the `:` infix operator inside `[...]`; folded into `Object` by the parser.
    KeyValue {
        key: Box<Node>,
        value: Box<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::LtEq => "<=",
            BinOp::GtEq => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// A function or closure parameter, optionally annotated with `: Type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub annotation: Option<Spanned<TypeExpr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeExpr {
    Named(String),
    Applied { name: String, args: Vec<Spanned<TypeExpr>> },
}

impl TypeExpr {
    pub fn name(&self) -> &str {
        match self {
            TypeExpr::Named(name) | TypeExpr::Applied { name, .. } => name,
        }
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{name}"),
            TypeExpr::Applied { name, args } => {
                write!(f, "{name}[")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a.node)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// `T` or `T <: Constraint` in a declaration's type parameter list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeParam {
    pub name: Spanned<String>,
    pub constraint: Option<Spanned<TypeExpr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternArm {
    pub pattern: Node,
    pub body: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Spanned<String>,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDecl {
    pub name: Spanned<String>,
    pub type_params: Vec<TypeParam>,
    pub parent: Option<Spanned<TypeExpr>>,
    pub body: TypeDeclBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeDeclBody {
    /// `abstract Name`
    Abstract,
    /// `type Name <: Parent` with no fields or variants.
    Concrete,
    Struct { fields: Vec<FieldDecl> },
    Adt { variants: Vec<AdtVariant> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name: Spanned<String>,
    pub ty: Spanned<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdtVariant {
    pub name: Spanned<String>,
    pub fields: Vec<FieldDecl>,
}

impl Expr {
    /// True if this node (recursively) contains a capture pattern.
    pub fn contains_capture(&self) -> bool {
        match self {
            Expr::CapturePattern { .. } => true,
            Expr::TypeInstance { fields, .. } => fields.iter().any(|(_, v)| v.node.contains_capture()),
            _ => false,
        }
    }
}
