// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use chumsky::extra;
use chumsky::prelude::*;
use chumsky::primitive::select;

use crate::ast::*;
use crate::lexer::{Token, TokenKind};

/// chumsky 1.0 errors are lifetime-parameterized
pub type ParseError<'src> = chumsky::error::Simple<'src, Token>;
pub type PExtra<'src> = extra::Err<ParseError<'src>>;

type TokParser<'src, O> = Boxed<'src, 'src, &'src [Token], O, PExtra<'src>>;

/// Public API: parse a token slice into a Program.
pub fn parse_program<'src>(tokens: &'src [Token]) -> Result<Program, Vec<ParseError<'src>>> {
    program_parser().parse(tokens).into_result()
}

/// All-or-nothing entry point: any structural error is logged and the whole
/// program is discarded.
pub fn parse(tokens: &[Token]) -> Option<Program> {
    match parse_program(tokens) {
        Ok(program) => Some(program),
        Err(errs) => {
            for err in &errs {
                log::error!("{}", describe(err));
            }
            None
        }
    }
}

/// Human-readable message for a parse error.
pub fn describe(err: &ParseError<'_>) -> String {
    match err.found() {
        Some(tok) => format!("Unexpected token {} at {:?}", tok, err.span()),
        None => "Unexpected end of input".to_string(),
    }
}

pub fn program_parser<'src>() -> impl Parser<'src, &'src [Token], Program, PExtra<'src>> {
    let expr = expr_parser().boxed();
    let stmt = stmt_parser(expr.clone()).boxed();

    class_parser(stmt.clone(), expr)
        .repeated()
        .collect::<Vec<_>>()
        .then(stmt.repeated().collect::<Vec<_>>())
        .then_ignore(end())
        .map(|(classes, statements)| Program {
            classes,
            statements,
        })
}

fn class_parser<'src>(
    stmt: TokParser<'src, Stmt>,
    expr: TokParser<'src, Expr>,
) -> impl Parser<'src, &'src [Token], ClassDef, PExtra<'src>> {
    let super_call = keyword("super")
        .ignore_then(kind(TokenKind::LParen))
        .ignore_then(expr.separated_by(kind(TokenKind::Comma)).collect::<Vec<_>>())
        .then_ignore(kind(TokenKind::RParen))
        .then_ignore(kind(TokenKind::Semicolon))
        .map(|arguments| SuperCall { arguments });

    let constructor = keyword("init")
        .ignore_then(parameters())
        .then_ignore(kind(TokenKind::LCurlyBracket))
        .then(super_call.or_not())
        .then(stmt.clone().repeated().collect::<Vec<_>>())
        .then_ignore(kind(TokenKind::RCurlyBracket))
        .map(|((parameters, super_call), statements)| Constructor {
            parameters,
            super_call,
            statements,
        });

    let method = keyword("method")
        .ignore_then(ident())
        .then(parameters())
        .then(type_name())
        .then_ignore(kind(TokenKind::LCurlyBracket))
        .then(stmt.repeated().collect::<Vec<_>>())
        .then_ignore(kind(TokenKind::RCurlyBracket))
        .map(|(((name, parameters), return_type), statements)| MethodDef {
            name,
            parameters,
            return_type,
            statements,
        });

    keyword("class")
        .ignore_then(ident())
        .then(keyword("extends").ignore_then(type_name()).or_not())
        .then_ignore(kind(TokenKind::LCurlyBracket))
        .then(var_dec().repeated().collect::<Vec<_>>())
        .then(constructor.or_not())
        .then(method.repeated().collect::<Vec<_>>())
        .then_ignore(kind(TokenKind::RCurlyBracket))
        .map(
            |((((name, parent), variables), constructor), methods)| ClassDef {
                name,
                parent,
                variables,
                constructor,
                methods,
            },
        )
}

/// `(TYPE|ID) ID ';'`
fn var_dec<'src>() -> impl Parser<'src, &'src [Token], VarDec, PExtra<'src>> + Clone {
    parameter().then_ignore(kind(TokenKind::Semicolon))
}

fn parameter<'src>() -> impl Parser<'src, &'src [Token], VarDec, PExtra<'src>> + Clone {
    type_name()
        .then(ident())
        .map(|(var_type, name)| VarDec { var_type, name })
}

fn parameters<'src>() -> impl Parser<'src, &'src [Token], Vec<VarDec>, PExtra<'src>> + Clone {
    kind(TokenKind::LParen)
        .ignore_then(
            parameter()
                .separated_by(kind(TokenKind::Comma))
                .collect::<Vec<_>>(),
        )
        .then_ignore(kind(TokenKind::RParen))
}

pub fn stmt_parser<'src>(
    expr: TokParser<'src, Expr>,
) -> impl Parser<'src, &'src [Token], Stmt, PExtra<'src>> + Clone {
    recursive(|stmt| {
        let semi = kind(TokenKind::Semicolon);

        let block = kind(TokenKind::LCurlyBracket)
            .ignore_then(stmt.clone().repeated().collect::<Vec<_>>())
            .then_ignore(kind(TokenKind::RCurlyBracket))
            .map(Stmt::Block);

        let condition = kind(TokenKind::LParen)
            .ignore_then(expr.clone())
            .then_ignore(kind(TokenKind::RParen))
            .boxed();

        let while_ = keyword("while")
            .ignore_then(condition.clone())
            .then(stmt.clone())
            .map(|(condition, body)| Stmt::While {
                condition,
                body: Box::new(body),
            });

        let break_ = keyword("break").then_ignore(semi.clone()).to(Stmt::Break);

        let return_ = keyword("return")
            .ignore_then(expr.clone().or_not())
            .then_ignore(semi.clone())
            .map(Stmt::Return);

        let if_ = keyword("if")
            .ignore_then(condition)
            .then(stmt.clone())
            .then(keyword("else").ignore_then(stmt.clone()).or_not())
            .map(|((condition, then_branch), else_branch)| Stmt::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch: else_branch.map(Box::new),
            });

        // Ordered choice with backtracking: `T x;` / `C x;` is a declaration,
        // `x = e;` an assignment, anything else an expression statement.
        let declaration = var_dec().map(Stmt::VarDec);

        let assign = ident()
            .then_ignore(kind(TokenKind::Equals))
            .then(expr.clone())
            .then_ignore(semi.clone())
            .map(|(variable, expression)| Stmt::Assign {
                variable,
                expression,
            });

        let expr_stmt = expr.clone().then_ignore(semi).map(Stmt::Expr);

        choice((
            block,
            while_,
            break_,
            return_,
            if_,
            declaration,
            assign,
            expr_stmt,
        ))
        .boxed()
    })
}

pub fn expr_parser<'src>() -> impl Parser<'src, &'src [Token], Expr, PExtra<'src>> + Clone {
    recursive(|expr| {
        let args = kind(TokenKind::LParen)
            .ignore_then(
                expr.clone()
                    .separated_by(kind(TokenKind::Comma))
                    .collect::<Vec<_>>(),
            )
            .then_ignore(kind(TokenKind::RParen))
            .boxed();

        let println = keyword("println")
            .ignore_then(kind(TokenKind::LParen))
            .ignore_then(expr.clone())
            .then_ignore(kind(TokenKind::RParen))
            .map(|arg| Expr::Println(Box::new(arg)));

        let new_ = keyword("new")
            .ignore_then(type_name())
            .then(args.clone())
            .map(|(class_name, args)| Expr::New { class_name, args });

        let paren = kind(TokenKind::LParen)
            .ignore_then(expr.clone())
            .then_ignore(kind(TokenKind::RParen));

        let primary = choice((
            literal(),
            println,
            new_,
            paren,
            ident().map(Expr::Variable),
        ));

        // primary ('.' ID '(' args ')')*
        let call_step = kind(TokenKind::Dot).ignore_then(ident()).then(args);

        let call = primary
            .then(call_step.repeated().collect::<Vec<_>>())
            .map(|(base, steps)| {
                steps.into_iter().fold(base, |object, (method, args)| Expr::Call {
                    object: Box::new(object),
                    method,
                    args,
                })
            })
            .boxed();

        let product = call
            .clone()
            .then(bin_op(&[BinOp::Mul, BinOp::Div]).then(call).repeated().collect::<Vec<_>>())
            .map(fold_binary)
            .boxed();

        let sum = product
            .clone()
            .then(bin_op(&[BinOp::Add, BinOp::Sub]).then(product).repeated().collect::<Vec<_>>())
            .map(fold_binary);

        sum.boxed()
    })
}

// Left-associative fold of `first (op operand)*`.
fn fold_binary((first, rest): (Expr, Vec<(BinOp, Expr)>)) -> Expr {
    rest.into_iter().fold(first, |left, (op, right)| Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

fn literal<'src>() -> impl Parser<'src, &'src [Token], Expr, PExtra<'src>> + Clone {
    select! {
        Token { kind: TokenKind::IntegerLiteral, data } => Expr::Literal(Literal::Int(data)),
        Token { kind: TokenKind::StringLiteral, data } => Expr::Literal(Literal::Str(data)),
        Token { kind: TokenKind::Keyword, data } if data == "true" => Expr::Literal(Literal::Bool(true)),
        Token { kind: TokenKind::Keyword, data } if data == "false" => Expr::Literal(Literal::Bool(false)),
        Token { kind: TokenKind::Keyword, data } if data == "this" => Expr::This,
    }
}

fn bin_op<'src>(
    allowed: &'static [BinOp],
) -> impl Parser<'src, &'src [Token], BinOp, PExtra<'src>> + Clone {
    select(move |tok: Token, _| match tok.kind {
        TokenKind::Op => BinOp::from_symbol(&tok.data).filter(|op| allowed.contains(op)),
        _ => None,
    })
}

fn kind<'src>(k: TokenKind) -> impl Parser<'src, &'src [Token], Token, PExtra<'src>> + Clone {
    any().filter(move |tok: &Token| tok.kind == k)
}

fn keyword<'src>(word: &'static str) -> impl Parser<'src, &'src [Token], (), PExtra<'src>> + Clone {
    any().filter(move |tok: &Token| tok.is_keyword(word)).ignored()
}

fn ident<'src>() -> impl Parser<'src, &'src [Token], String, PExtra<'src>> + Clone {
    select! { Token { kind: TokenKind::Identifier, data } => data }
}

/// A built-in type token or a class name.
fn type_name<'src>() -> impl Parser<'src, &'src [Token], String, PExtra<'src>> + Clone {
    select! {
        Token { kind: TokenKind::Type, data } => data,
        Token { kind: TokenKind::Identifier, data } => data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> Program {
        let toks = tokenize(src);
        parse_program(&toks).unwrap()
    }

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn int(n: u32) -> Expr {
        Expr::Literal(Literal::Int(n.to_string()))
    }

    #[test]
    fn parses_class_with_parent_ctor_and_methods() {
        let prog = parse_src(
            r#"
            class Cat extends Animal {
              Int lives;
              init(Int l, String name) { super(name); lives = l; }
              method speak() Void { return println(1); }
              method getLives() Int { return lives; }
            }
            "#,
        );
        assert_eq!(prog.classes.len(), 1);
        let class = &prog.classes[0];
        assert_eq!(class.name, "Cat");
        assert_eq!(class.parent.as_deref(), Some("Animal"));
        assert_eq!(
            class.variables,
            vec![VarDec {
                var_type: "Int".into(),
                name: "lives".into()
            }]
        );

        let ctor = class.constructor.as_ref().unwrap();
        assert_eq!(ctor.parameters.len(), 2);
        assert_eq!(ctor.parameters[1].var_type, "String");
        assert_eq!(
            ctor.super_call,
            Some(SuperCall {
                arguments: vec![var("name")]
            })
        );
        assert_eq!(ctor.statements.len(), 1);

        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].return_type, "Void");
        assert_eq!(class.methods[1].name, "getLives");
    }

    #[test]
    fn class_without_init_has_no_constructor() {
        let prog = parse_src("class A { method f() Int { return 1; } }");
        assert!(prog.classes[0].constructor.is_none());
        assert!(prog.classes[0].parent.is_none());
    }

    #[test]
    fn multiplicative_binds_tighter_and_is_left_associative() {
        let prog = parse_src("x = 1 + 2 * 3 - 4;");
        let expected = Expr::Binary {
            left: Box::new(Expr::Binary {
                left: Box::new(int(1)),
                op: BinOp::Add,
                right: Box::new(Expr::Binary {
                    left: Box::new(int(2)),
                    op: BinOp::Mul,
                    right: Box::new(int(3)),
                }),
            }),
            op: BinOp::Sub,
            right: Box::new(int(4)),
        };
        assert_eq!(
            prog.statements,
            vec![Stmt::Assign {
                variable: "x".into(),
                expression: expected
            }]
        );
    }

    #[test]
    fn parenthesized_expression_overrides_precedence() {
        let prog = parse_src("(1 + 2) * 3;");
        match &prog.statements[0] {
            Stmt::Expr(Expr::Binary { left, op, .. }) => {
                assert_eq!(*op, BinOp::Mul);
                assert!(matches!(**left, Expr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn chained_calls_fold_left() {
        let prog = parse_src("a.b().c(1, this);");
        let expected = Expr::Call {
            object: Box::new(Expr::Call {
                object: Box::new(var("a")),
                method: "b".into(),
                args: vec![],
            }),
            method: "c".into(),
            args: vec![int(1), Expr::This],
        };
        assert_eq!(prog.statements, vec![Stmt::Expr(expected)]);
    }

    #[test]
    fn disambiguates_declaration_assignment_and_expression() {
        let prog = parse_src("Animal a; Int n; a = new Cat(); a.speak();");
        assert!(matches!(&prog.statements[0], Stmt::VarDec(d) if d.var_type == "Animal"));
        assert!(matches!(&prog.statements[1], Stmt::VarDec(d) if d.var_type == "Int"));
        assert!(matches!(
            &prog.statements[2],
            Stmt::Assign { variable, expression: Expr::New { class_name, .. } }
                if variable == "a" && class_name == "Cat"
        ));
        assert!(matches!(&prog.statements[3], Stmt::Expr(Expr::Call { .. })));
    }

    #[test]
    fn parses_control_flow() {
        let prog = parse_src(
            r#"
            while (true) { if (done) break; else { return; } }
            if (false) x = 1;
            "#,
        );
        match &prog.statements[0] {
            Stmt::While { body, .. } => match &**body {
                Stmt::Block(stmts) => match &stmts[0] {
                    Stmt::If {
                        then_branch,
                        else_branch: Some(else_branch),
                        ..
                    } => {
                        assert_eq!(**then_branch, Stmt::Break);
                        assert_eq!(**else_branch, Stmt::Block(vec![Stmt::Return(None)]));
                    }
                    other => panic!("unexpected statement {other:?}"),
                },
                other => panic!("unexpected body {other:?}"),
            },
            other => panic!("unexpected statement {other:?}"),
        }
        assert!(matches!(&prog.statements[1], Stmt::If { else_branch: None, .. }));
    }

    #[test]
    fn literals() {
        let prog = parse_src(r#"println("hi"); println(true); println(false); println(42);"#);
        let args: Vec<Expr> = prog
            .statements
            .into_iter()
            .map(|s| match s {
                Stmt::Expr(Expr::Println(arg)) => *arg,
                other => panic!("unexpected statement {other:?}"),
            })
            .collect();
        assert_eq!(
            args,
            vec![
                Expr::Literal(Literal::Str("hi".into())),
                Expr::Literal(Literal::Bool(true)),
                Expr::Literal(Literal::Bool(false)),
                int(42),
            ]
        );
    }

    #[test]
    fn integer_literal_keeps_digits_beyond_i64() {
        let prog = parse_src("n = 99999999999999999999;");
        assert_eq!(
            prog.statements,
            vec![Stmt::Assign {
                variable: "n".into(),
                expression: Expr::Literal(Literal::Int("99999999999999999999".into())),
            }]
        );
    }

    #[test]
    fn new_accepts_builtin_type_names() {
        let prog = parse_src("o = new String();");
        assert_eq!(
            prog.statements,
            vec![Stmt::Assign {
                variable: "o".into(),
                expression: Expr::New {
                    class_name: "String".into(),
                    args: vec![],
                },
            }]
        );
    }

    #[test]
    fn builtin_type_name_cannot_name_a_class() {
        assert!(parse_program(&tokenize("class String {}")).is_err());
        assert!(parse_program(&tokenize("class Int {}")).is_err());
    }

    #[test]
    fn comparison_operators_are_not_expressions() {
        let toks = tokenize("if (i > 10) { x = 1; }");
        assert!(parse_program(&toks).is_err());
        assert!(parse(&toks).is_none());
    }

    #[test]
    fn missing_semicolon_fails_whole_program() {
        let toks = tokenize("class A { } Int x; x = 1");
        assert!(parse(&toks).is_none());
    }

    #[test]
    fn empty_program_parses() {
        let prog = parse_src("");
        assert!(prog.classes.is_empty());
        assert!(prog.statements.is_empty());
    }
}
