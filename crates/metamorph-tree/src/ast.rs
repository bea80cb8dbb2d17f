use serde::{Deserialize, Serialize};

/// One parsed `.mm` source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    pub path: String,
    pub items: Vec<UnitItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitItem {
    Comment(CommentDef),
    Class(ClassDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub members: Vec<MemberDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberDef {
    Comment(CommentDef),
    Method(MethodDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<ParamDef>,
    pub return_type: Option<String>,
    pub body: Vec<StmtDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtDef {
    Comment(CommentDef),
    Let {
        name: String,
        ty: String,
        init: String,
    },
    Return(Option<String>),
    If {
        condition: String,
        then_body: Vec<StmtDef>,
        else_body: Option<Vec<StmtDef>>,
    },
    Expr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStyle {
    /// `// text`
    Line,
    /// `/* text */`
    Block,
    /// `/// text`
    Doc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDef {
    pub style: CommentStyle,
    pub text: String,
}

impl CommentDef {
    pub fn new(style: CommentStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}
