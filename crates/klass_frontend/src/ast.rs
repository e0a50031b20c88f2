// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub classes: Vec<ClassDef>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,           // ID
    pub parent: Option<String>, // TYPE | ID
    pub variables: Vec<VarDec>,
    // `None` when the class has no `init` section
    pub constructor: Option<Constructor>,
    pub methods: Vec<MethodDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDec {
    pub var_type: String, // TYPE | ID
    pub name: String,     // ID
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub parameters: Vec<VarDec>,
    pub super_call: Option<SuperCall>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperCall {
    pub arguments: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub parameters: Vec<VarDec>,
    pub return_type: String,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Block(Vec<Stmt>),

    Expr(Expr),

    VarDec(VarDec),

    Assign {
        variable: String,
        expression: Expr,
    },

    While {
        condition: Expr,
        body: Box<Stmt>,
    },

    Break,

    Return(Option<Expr>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Variable(String),

    Literal(Literal),

    New {
        class_name: String,
        args: Vec<Expr>,
    },

    Call {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },

    Println(Box<Expr>),

    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },

    This,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// Digits exactly as written.
    Int(String),
    Str(String),
    Bool(bool),
}

impl Literal {
    /// The nominal type name a literal checks as.
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "Int",
            Literal::Str(_) => "String",
            Literal::Bool(_) => "Boolean",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "+" => Some(BinOp::Add),
            "-" => Some(BinOp::Sub),
            "*" => Some(BinOp::Mul),
            "/" => Some(BinOp::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }

    /// Binding strength: multiplicative binds tighter than additive.
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
