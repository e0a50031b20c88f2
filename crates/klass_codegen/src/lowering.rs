// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use std::fmt::{self, Write};

use klass_frontend::{BinOp, ClassDef, Expr, Literal, Stmt, VarDec};

use crate::host::{DECLARE, INDENT, PRINT_FN, ROOT_CLASS, SELF_REF};

/// Lower a class to a constructor function, the prototype link (derived
/// classes only) and one prototype method per declared method. No trailing newline.
pub fn lower_class<W: Write>(out: &mut W, class: &ClassDef) -> fmt::Result {
    let name = class.name.as_str();
    let parent = class.parent.as_deref();

    let (params, super_call, statements) = match &class.constructor {
        Some(ctor) => (
            ctor.parameters.as_slice(),
            ctor.super_call.as_ref(),
            ctor.statements.as_slice(),
        ),
        None => (&[][..], None, &[][..]),
    };

    write!(out, "function {name}(")?;
    lower_params(out, params)?;
    out.write_str(") {\n")?;

    if let Some(call) = super_call {
        write!(out, "{INDENT}{}.call({SELF_REF}", parent.unwrap_or(ROOT_CLASS))?;
        for arg in &call.arguments {
            out.write_str(", ")?;
            lower_expr(out, arg)?;
        }
        out.write_str(");\n")?;
    }
    lower_body(out, statements)?;
    out.write_char('}')?;

    if let Some(parent) = parent {
        write!(
            out,
            "\n{name}.prototype = Object.create({parent}.prototype);\n{name}.prototype.constructor = {name};"
        )?;
    }

    for method in &class.methods {
        write!(out, "\n{name}.prototype.{} = function(", method.name)?;
        lower_params(out, &method.parameters)?;
        out.write_str(") {\n")?;
        lower_body(out, &method.statements)?;
        out.write_str("};")?;
    }

    Ok(())
}

fn lower_params<W: Write>(out: &mut W, params: &[VarDec]) -> fmt::Result {
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        out.write_str(&p.name)?;
    }
    Ok(())
}

fn lower_body<W: Write>(out: &mut W, stmts: &[Stmt]) -> fmt::Result {
    for stmt in stmts {
        out.write_str(INDENT)?;
        lower_stmt(out, stmt)?;
        out.write_char('\n')?;
    }
    Ok(())
}

/// Lower one statement. Multi-line output (blocks) is not re-indented.
pub fn lower_stmt<W: Write>(out: &mut W, stmt: &Stmt) -> fmt::Result {
    match stmt {
        Stmt::Block(stmts) => {
            out.write_str("{\n")?;
            for s in stmts {
                lower_stmt(out, s)?;
                out.write_char('\n')?;
            }
            out.write_char('}')
        }

        Stmt::Expr(e) => {
            lower_expr(out, e)?;
            out.write_char(';')
        }

        // the declared type survives only as a comment
        Stmt::VarDec(decl) => write!(out, "{DECLARE} {}; // {}", decl.name, decl.var_type),

        Stmt::Assign {
            variable,
            expression,
        } => {
            write!(out, "{variable} = ")?;
            lower_expr(out, expression)?;
            out.write_char(';')
        }

        Stmt::While { condition, body } => {
            out.write_str("while (")?;
            lower_expr(out, condition)?;
            out.write_str(") ")?;
            lower_branch(out, body)
        }

        Stmt::Break => out.write_str("break;"),

        Stmt::Return(None) => out.write_str("return;"),
        Stmt::Return(Some(e)) => {
            out.write_str("return ")?;
            lower_expr(out, e)?;
            out.write_char(';')
        }

        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.write_str("if (")?;
            lower_expr(out, condition)?;
            out.write_str(") ")?;
            lower_branch(out, then_branch)?;
            if let Some(else_branch) = else_branch {
                out.write_str(" else ")?;
                lower_branch(out, else_branch)?;
            }
            Ok(())
        }
    }
}

// A declaration ends in a line comment and `let` cannot stand alone as a body.
fn lower_branch<W: Write>(out: &mut W, s: &Stmt) -> fmt::Result {
    if let Stmt::VarDec(_) = s {
        out.write_str("{\n")?;
        lower_stmt(out, s)?;
        out.write_str("\n}")
    } else {
        lower_stmt(out, s)
    }
}

pub fn lower_expr<W: Write>(out: &mut W, e: &Expr) -> fmt::Result {
    match e {
        Expr::Variable(name) => out.write_str(name),

        Expr::Literal(lit) => lower_literal(out, lit),

        Expr::New { class_name, args } => {
            write!(out, "new {class_name}(")?;
            lower_args(out, args)?;
            out.write_char(')')
        }

        Expr::Call {
            object,
            method,
            args,
        } => {
            if matches!(**object, Expr::Binary { .. }) {
                out.write_char('(')?;
                lower_expr(out, object)?;
                out.write_char(')')?;
            } else {
                lower_expr(out, object)?;
            }
            write!(out, ".{method}(")?;
            lower_args(out, args)?;
            out.write_char(')')
        }

        Expr::Println(arg) => {
            write!(out, "{PRINT_FN}(")?;
            lower_expr(out, arg)?;
            out.write_char(')')
        }

        Expr::Binary { left, op, right } => {
            lower_operand(out, left, *op, false)?;
            write!(out, " {op} ")?;
            lower_operand(out, right, *op, true)
        }

        Expr::This => out.write_str(SELF_REF),
    }
}

// Parenthesize a child that binds looser than its parent, or an equal-precedence
// right child, so left-associative evaluation order survives.
fn lower_operand<W: Write>(out: &mut W, e: &Expr, parent: BinOp, is_right: bool) -> fmt::Result {
    let needs_parens = match e {
        Expr::Binary { op, .. } => {
            op.precedence() < parent.precedence()
                || (is_right && op.precedence() == parent.precedence())
        }
        _ => false,
    };
    if needs_parens {
        out.write_char('(')?;
        lower_expr(out, e)?;
        out.write_char(')')
    } else {
        lower_expr(out, e)
    }
}

fn lower_args<W: Write>(out: &mut W, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        lower_expr(out, arg)?;
    }
    Ok(())
}

fn lower_literal<W: Write>(out: &mut W, lit: &Literal) -> fmt::Result {
    match lit {
        Literal::Int(n) => write!(out, "{n}"),
        Literal::Bool(b) => write!(out, "{b}"),
        Literal::Str(s) => quote_string(out, s),
    }
}

/// Double-quote `s` with JSON escaping.
pub fn quote_string<W: Write>(out: &mut W, s: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use klass_frontend::{Constructor, MethodDef, SuperCall};

    fn stmt_text(stmt: &Stmt) -> String {
        let mut s = String::new();
        lower_stmt(&mut s, stmt).unwrap();
        s
    }

    fn expr_text(e: &Expr) -> String {
        let mut s = String::new();
        lower_expr(&mut s, e).unwrap();
        s
    }

    fn class_text(class: &ClassDef) -> String {
        let mut s = String::new();
        lower_class(&mut s, class).unwrap();
        s
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn int(n: u32) -> Expr {
        Expr::Literal(Literal::Int(n.to_string()))
    }

    fn bin(left: Expr, op: BinOp, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    fn param(ty: &str, name: &str) -> VarDec {
        VarDec {
            var_type: ty.into(),
            name: name.into(),
        }
    }

    #[test]
    fn class_without_init_gets_empty_constructor() {
        let class = ClassDef {
            name: "A".into(),
            parent: None,
            variables: vec![param("Int", "x")],
            constructor: None,
            methods: vec![],
        };
        assert_eq!(class_text(&class), "function A() {\n}");
    }

    #[test]
    fn derived_class_with_arguments() {
        let class = ClassDef {
            name: "Circle".into(),
            parent: Some("Shape".into()),
            variables: vec![],
            constructor: Some(Constructor {
                parameters: vec![param("Int", "x"), param("Int", "r")],
                super_call: Some(SuperCall {
                    arguments: vec![var("x"), int(0)],
                }),
                statements: vec![Stmt::Assign {
                    variable: "radius".into(),
                    expression: var("r"),
                }],
            }),
            methods: vec![
                MethodDef {
                    name: "grow".into(),
                    parameters: vec![param("Int", "by"), param("Int", "times")],
                    return_type: "Void".into(),
                    statements: vec![],
                },
                MethodDef {
                    name: "self".into(),
                    parameters: vec![],
                    return_type: "Circle".into(),
                    statements: vec![Stmt::Return(Some(Expr::This))],
                },
            ],
        };
        let expected = "function Circle(x, r) {\n\
                        \tShape.call(this, x, 0);\n\
                        \tradius = r;\n\
                        }\n\
                        Circle.prototype = Object.create(Shape.prototype);\n\
                        Circle.prototype.constructor = Circle;\n\
                        Circle.prototype.grow = function(by, times) {\n\
                        };\n\
                        Circle.prototype.self = function() {\n\
                        \treturn this;\n\
                        };";
        assert_eq!(class_text(&class), expected);
    }

    #[test]
    fn root_class_super_call_chains_to_object() {
        let class = ClassDef {
            name: "A".into(),
            parent: None,
            variables: vec![],
            constructor: Some(Constructor {
                parameters: vec![],
                super_call: Some(SuperCall { arguments: vec![] }),
                statements: vec![],
            }),
            methods: vec![],
        };
        let text = class_text(&class);
        assert_eq!(text, "function A() {\n\tObject.call(this);\n}");
        assert!(!text.contains("prototype"));
    }

    #[test]
    fn statements() {
        assert_eq!(
            stmt_text(&Stmt::VarDec(param("Animal", "cat"))),
            "let cat; // Animal"
        );
        assert_eq!(stmt_text(&Stmt::Return(None)), "return;");
        assert_eq!(stmt_text(&Stmt::Break), "break;");
        assert_eq!(
            stmt_text(&Stmt::Block(vec![Stmt::Break, Stmt::Expr(var("x"))])),
            "{\nbreak;\nx;\n}"
        );
        assert_eq!(stmt_text(&Stmt::Block(vec![])), "{\n}");

        let while_ = Stmt::While {
            condition: Expr::Literal(Literal::Bool(true)),
            body: Box::new(Stmt::Block(vec![Stmt::Break])),
        };
        assert_eq!(stmt_text(&while_), "while (true) {\nbreak;\n}");

        let if_ = Stmt::If {
            condition: var("b"),
            then_branch: Box::new(Stmt::Return(Some(int(1)))),
            else_branch: Some(Box::new(Stmt::Return(Some(int(2))))),
        };
        assert_eq!(stmt_text(&if_), "if (b) return 1; else return 2;");
    }

    #[test]
    fn declaration_as_branch_is_braced() {
        let decl = Stmt::VarDec(param("Int", "y"));
        let if_ = Stmt::If {
            condition: var("b"),
            then_branch: Box::new(decl.clone()),
            else_branch: Some(Box::new(Stmt::Assign {
                variable: "b".into(),
                expression: Expr::Literal(Literal::Bool(false)),
            })),
        };
        assert_eq!(stmt_text(&if_), "if (b) {\nlet y; // Int\n} else b = false;");

        let while_ = Stmt::While {
            condition: var("b"),
            body: Box::new(decl.clone()),
        };
        assert_eq!(stmt_text(&while_), "while (b) {\nlet y; // Int\n}");

        assert_eq!(stmt_text(&decl), "let y; // Int");
    }

    #[test]
    fn expressions() {
        let call = Expr::Call {
            object: Box::new(Expr::New {
                class_name: "Cat".into(),
                args: vec![int(1), Expr::Literal(Literal::Bool(false))],
            }),
            method: "speak".into(),
            args: vec![var("a"), var("b")],
        };
        assert_eq!(expr_text(&call), "new Cat(1, false).speak(a, b)");
        assert_eq!(
            expr_text(&Expr::Println(Box::new(Expr::This))),
            "console.log(this)"
        );
    }

    #[test]
    fn binary_operands_are_parenthesized_only_when_needed() {
        assert_eq!(expr_text(&bin(int(5), BinOp::Add, int(3))), "5 + 3");
        assert_eq!(
            expr_text(&bin(bin(int(1), BinOp::Add, int(2)), BinOp::Mul, int(3))),
            "(1 + 2) * 3"
        );
        assert_eq!(
            expr_text(&bin(int(1), BinOp::Add, bin(int(2), BinOp::Mul, int(3)))),
            "1 + 2 * 3"
        );
        assert_eq!(
            expr_text(&bin(bin(int(1), BinOp::Sub, int(2)), BinOp::Sub, int(3))),
            "1 - 2 - 3"
        );
        assert_eq!(
            expr_text(&bin(int(1), BinOp::Sub, bin(int(2), BinOp::Sub, int(3)))),
            "1 - (2 - 3)"
        );
    }

    #[test]
    fn strings_are_requoted_with_escapes() {
        let mut s = String::new();
        quote_string(&mut s, "say \"hi\"\\\n\t\r\u{1}").unwrap();
        assert_eq!(s, r#""say \"hi\"\\\n\t\r\u0001""#);

        let lit = Expr::Literal(Literal::Str("it's".into()));
        assert_eq!(expr_text(&lit), "\"it's\"");
    }
}
