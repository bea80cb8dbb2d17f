use winnow::ascii::{multispace0, till_line_ending};
use winnow::combinator::{cut_err, opt};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::token::{literal, take_until, take_while};
use winnow::{ModalResult, Parser};

use metamorph_types::{MetamorphError, Result};

use crate::ast::*;

fn make_cut_error(desc: &'static str) -> ErrMode<ContextError<StrContext>> {
    let mut e = ContextError::new();
    e.push(StrContext::Expected(StrContextValue::Description(desc)));
    ErrMode::Cut(e)
}

fn expected(desc: &'static str) -> StrContext {
    StrContext::Expected(StrContextValue::Description(desc))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `true` if `input` starts with `kw` followed by a non-identifier character.
fn at_keyword(input: &str, kw: &str) -> bool {
    input
        .strip_prefix(kw)
        .is_some_and(|rest| !rest.starts_with(is_ident_char))
}

/// Whitespace consumer (including newlines).
fn ws<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    multispace0.parse_next(input)
}

/// Parse an identifier: [A-Za-z_][A-Za-z0-9_]*
fn identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .take()
        .parse_next(input)
}

/// A type name is an identifier with optional array suffixes, e.g. `int[]`.
fn type_name<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (identifier, take_while(0.., |c: char| c == '[' || c == ']'))
        .take()
        .parse_next(input)
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

fn doc_comment(input: &mut &str) -> ModalResult<CommentDef> {
    let _ = literal("///").parse_next(input)?;
    let text = till_line_ending.parse_next(input)?;
    Ok(CommentDef::new(CommentStyle::Doc, text.trim()))
}

fn line_comment(input: &mut &str) -> ModalResult<CommentDef> {
    let _ = literal("//").parse_next(input)?;
    let text = till_line_ending.parse_next(input)?;
    Ok(CommentDef::new(CommentStyle::Line, text.trim()))
}

fn block_comment(input: &mut &str) -> ModalResult<CommentDef> {
    let _ = literal("/*").parse_next(input)?;
    let text = cut_err(take_until(0.., "*/"))
        .context(expected("'*/' to close the block comment"))
        .parse_next(input)?;
    let _ = literal("*/").parse_next(input)?;
    Ok(CommentDef::new(CommentStyle::Block, text.trim()))
}

fn comment(input: &mut &str) -> ModalResult<CommentDef> {
    if input.starts_with("///") {
        doc_comment(input)
    } else if input.starts_with("//") {
        line_comment(input)
    } else {
        block_comment(input)
    }
}

fn at_comment(input: &str) -> bool {
    input.starts_with("//") || input.starts_with("/*")
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// Consume raw expression text up to (not including) `terminator` at nesting
/// depth zero. Parentheses, brackets and string/char literals are respected.
/// Braces at depth zero end the scan with an error.
fn raw_expr<'i>(input: &mut &'i str, terminator: char) -> ModalResult<&'i str> {
    let source: &'i str = input;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in source.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        if c == terminator && depth == 0 {
            let (expr, rest) = source.split_at(idx);
            *input = rest;
            return Ok(expr.trim());
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => {
                if depth == 0 {
                    return Err(make_cut_error("balanced parentheses in expression"));
                }
                depth -= 1;
            }
            '{' | '}' if depth == 0 => {
                return Err(make_cut_error("expression terminator"));
            }
            _ => {}
        }
    }
    Err(make_cut_error("expression terminator"))
}

fn non_empty_expr<'i>(
    input: &mut &'i str,
    terminator: char,
    desc: &'static str,
) -> ModalResult<&'i str> {
    let expr = raw_expr(input, terminator)?;
    if expr.is_empty() {
        return Err(make_cut_error(desc));
    }
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// 'let' IDENT ':' TYPE '=' EXPR ';'
fn let_stmt(input: &mut &str) -> ModalResult<StmtDef> {
    let _ = literal("let").parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let name = cut_err(identifier)
        .context(expected("variable name"))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = cut_err(':')
        .context(expected("':' before the variable type"))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let ty = cut_err(type_name)
        .context(expected("variable type"))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = cut_err('=')
        .context(expected("'=' and an initializer"))
        .parse_next(input)?;
    let init = non_empty_expr(input, ';', "initializer expression")?;
    let _ = ';'.parse_next(input)?;
    Ok(StmtDef::Let {
        name: name.to_string(),
        ty: ty.to_string(),
        init: init.to_string(),
    })
}

/// 'return' EXPR? ';'
fn return_stmt(input: &mut &str) -> ModalResult<StmtDef> {
    let _ = literal("return").parse_next(input)?;
    let value = raw_expr(input, ';')?;
    let _ = ';'.parse_next(input)?;
    let value = (!value.is_empty()).then(|| value.to_string());
    Ok(StmtDef::Return(value))
}

/// 'if' '(' EXPR ')' block ('else' block)?
fn if_stmt(input: &mut &str) -> ModalResult<StmtDef> {
    let _ = literal("if").parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = cut_err('(')
        .context(expected("'(' after 'if'"))
        .parse_next(input)?;
    let condition = non_empty_expr(input, ')', "if condition")?;
    let _ = ')'.parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let then_body = block(input)?;

    let _ = ws.parse_next(input)?;
    let else_body = if at_keyword(input, "else") {
        let _ = literal("else").parse_next(input)?;
        let _ = ws.parse_next(input)?;
        Some(block(input)?)
    } else {
        None
    };

    Ok(StmtDef::If {
        condition: condition.to_string(),
        then_body,
        else_body,
    })
}

fn expr_stmt(input: &mut &str) -> ModalResult<StmtDef> {
    let expr = non_empty_expr(input, ';', "statement")?;
    let _ = ';'.parse_next(input)?;
    Ok(StmtDef::Expr(expr.to_string()))
}

fn statement(input: &mut &str) -> ModalResult<StmtDef> {
    if at_comment(input) {
        comment.map(StmtDef::Comment).parse_next(input)
    } else if at_keyword(input, "let") {
        let_stmt(input)
    } else if at_keyword(input, "return") {
        return_stmt(input)
    } else if at_keyword(input, "if") {
        if_stmt(input)
    } else {
        expr_stmt(input)
    }
}

/// '{' stmt* '}'
fn block(input: &mut &str) -> ModalResult<Vec<StmtDef>> {
    let _ = cut_err('{')
        .context(expected("'{' to open a block"))
        .parse_next(input)?;
    let mut body = Vec::new();
    loop {
        let _ = ws.parse_next(input)?;
        if input.starts_with('}') {
            break;
        }
        if input.is_empty() {
            return Err(make_cut_error("'}' to close the block"));
        }
        body.push(statement(input)?);
    }
    let _ = '}'.parse_next(input)?;
    Ok(body)
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// IDENT ':' TYPE
fn param(input: &mut &str) -> ModalResult<ParamDef> {
    let name = identifier.parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = cut_err(':')
        .context(expected("':' after parameter name"))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let ty = cut_err(type_name)
        .context(expected("parameter type"))
        .parse_next(input)?;
    Ok(ParamDef {
        name: name.to_string(),
        ty: ty.to_string(),
    })
}

fn params(input: &mut &str) -> ModalResult<Vec<ParamDef>> {
    let mut params = Vec::new();
    let _ = ws.parse_next(input)?;
    if let Some(first) = opt(param).parse_next(input)? {
        params.push(first);
        loop {
            let _ = ws.parse_next(input)?;
            if opt(',').parse_next(input)?.is_none() {
                break;
            }
            let _ = ws.parse_next(input)?;
            let next = cut_err(param)
                .context(expected("parameter after ','"))
                .parse_next(input)?;
            params.push(next);
        }
    }
    Ok(params)
}

/// 'fn' IDENT '(' params ')' ('->' TYPE)? block
fn method(input: &mut &str) -> ModalResult<MethodDef> {
    let _ = literal("fn").parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let name = cut_err(identifier)
        .context(expected("method name"))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = cut_err('(')
        .context(expected("'(' to open the parameter list"))
        .parse_next(input)?;
    let params = params(input)?;
    let _ = ws.parse_next(input)?;
    let _ = cut_err(')')
        .context(expected("')' to close the parameter list"))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;

    let return_type = if opt(literal("->")).parse_next(input)?.is_some() {
        let _ = ws.parse_next(input)?;
        let ty = cut_err(type_name)
            .context(expected("return type"))
            .parse_next(input)?;
        let _ = ws.parse_next(input)?;
        Some(ty.to_string())
    } else {
        None
    };

    let body = block(input)?;
    Ok(MethodDef {
        name: name.to_string(),
        params,
        return_type,
        body,
    })
}

/// 'class' IDENT '{' (comment | method)* '}'
fn class(input: &mut &str) -> ModalResult<ClassDef> {
    let _ = literal("class").parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let name = cut_err(identifier)
        .context(expected("class name"))
        .parse_next(input)?;
    let _ = ws.parse_next(input)?;
    let _ = cut_err('{')
        .context(expected("'{' to open the class body"))
        .parse_next(input)?;

    let mut members = Vec::new();
    loop {
        let _ = ws.parse_next(input)?;
        if input.starts_with('}') {
            break;
        }
        if at_comment(input) {
            members.push(MemberDef::Comment(comment(input)?));
        } else if at_keyword(input, "fn") {
            members.push(MemberDef::Method(method(input)?));
        } else {
            return Err(make_cut_error("'fn' declaration, comment or '}' in class body"));
        }
    }
    let _ = '}'.parse_next(input)?;

    Ok(ClassDef {
        name: name.to_string(),
        members,
    })
}

fn unit_items(input: &mut &str) -> ModalResult<Vec<UnitItem>> {
    let mut items = Vec::new();
    loop {
        let _ = ws.parse_next(input)?;
        if input.is_empty() {
            break;
        }
        if at_comment(input) {
            items.push(UnitItem::Comment(comment(input)?));
        } else if at_keyword(input, "class") {
            items.push(UnitItem::Class(class(input)?));
        } else {
            return Err(make_cut_error("'class' declaration or comment"));
        }
    }
    Ok(items)
}

/// Compute (line, col) from the number of bytes consumed.
fn offset_to_line_col(original: &str, consumed: usize) -> (usize, usize) {
    let prefix = &original[..consumed.min(original.len())];
    let line = prefix.matches('\n').count() + 1;
    let col = match prefix.rfind('\n') {
        Some(pos) => prefix[pos + 1..].chars().count() + 1,
        None => prefix.chars().count() + 1,
    };
    (line, col)
}

/// Public entry point. `path` is only used for error reporting and is stored
/// on the returned unit.
pub fn parse(path: &str, input: &str) -> Result<UnitDef> {
    let mut remaining = input;

    let items = unit_items.parse_next(&mut remaining).map_err(|e| {
        let (line, col) = offset_to_line_col(input, input.len() - remaining.len());
        let message = format!("{}", e);

        let snippet = remaining.chars().take(40).collect::<String>();
        let source_snippet = if snippet.is_empty() {
            None
        } else {
            Some(snippet)
        };

        MetamorphError::ParseError {
            path: path.to_string(),
            line,
            col,
            message,
            source_snippet,
        }
    })?;

    Ok(UnitDef {
        path: path.to_string(),
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_method(unit: &UnitDef) -> &MethodDef {
        let UnitItem::Class(class) = &unit.items[0] else {
            panic!("expected class");
        };
        class
            .members
            .iter()
            .find_map(|m| match m {
                MemberDef::Method(m) => Some(m),
                MemberDef::Comment(_) => None,
            })
            .expect("class has a method")
    }

    #[test]
    fn parse_class_with_method() {
        let src = "class Calc {\n    fn add(a: int, b: int) -> int {\n        return a + b;\n    }\n}\n";
        let unit = parse("calc.mm", src).unwrap();
        assert_eq!(unit.path, "calc.mm");
        let m = first_method(&unit);
        assert_eq!(m.name, "add");
        assert_eq!(m.params.len(), 2);
        assert_eq!(m.params[1].ty, "int");
        assert_eq!(m.return_type.as_deref(), Some("int"));
        assert_eq!(m.body, vec![StmtDef::Return(Some("a + b".into()))]);
    }

    #[test]
    fn parse_let_if_else_and_expr() {
        let src = r#"class A {
            fn f(x: int) {
                let y: int = max(x, 3);
                if (y > (x + 1)) {
                    print("a;b");
                } else {
                    return;
                }
            }
        }"#;
        let unit = parse("a.mm", src).unwrap();
        let m = first_method(&unit);
        assert_eq!(m.return_type, None);
        assert_eq!(
            m.body[0],
            StmtDef::Let {
                name: "y".into(),
                ty: "int".into(),
                init: "max(x, 3)".into()
            }
        );
        match &m.body[1] {
            StmtDef::If {
                condition,
                then_body,
                else_body,
            } => {
                assert_eq!(condition, "y > (x + 1)");
                assert_eq!(then_body, &vec![StmtDef::Expr("print(\"a;b\")".into())]);
                assert_eq!(else_body, &Some(vec![StmtDef::Return(None)]));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn comments_are_kept() {
        let src = r#"
            // header
            /* block
               text */
            class A {
                /// docs
                fn f() {
                    // inside
                    run();
                }
            }
        "#;
        let unit = parse("a.mm", src).unwrap();
        assert_eq!(
            unit.items[0],
            UnitItem::Comment(CommentDef::new(CommentStyle::Line, "header"))
        );
        assert!(matches!(
            &unit.items[1],
            UnitItem::Comment(CommentDef { style: CommentStyle::Block, .. })
        ));
        let UnitItem::Class(class) = &unit.items[2] else {
            panic!("expected class");
        };
        assert_eq!(
            class.members[0],
            MemberDef::Comment(CommentDef::new(CommentStyle::Doc, "docs"))
        );
        let m = first_method(&unit);
        assert_eq!(
            m.body[0],
            StmtDef::Comment(CommentDef::new(CommentStyle::Line, "inside"))
        );
    }

    #[test]
    fn keyword_prefix_is_an_identifier() {
        let src = "class A { fn f() { letter = 1; returned(); iffy(); } }";
        let unit = parse("a.mm", src).unwrap();
        let m = first_method(&unit);
        assert_eq!(
            m.body,
            vec![
                StmtDef::Expr("letter = 1".into()),
                StmtDef::Expr("returned()".into()),
                StmtDef::Expr("iffy()".into()),
            ]
        );
    }

    #[test]
    fn array_types() {
        let src = "class A { fn f(xs: int[]) -> string[] { return xs; } }";
        let unit = parse("a.mm", src).unwrap();
        let m = first_method(&unit);
        assert_eq!(m.params[0].ty, "int[]");
        assert_eq!(m.return_type.as_deref(), Some("string[]"));
    }

    #[test]
    fn empty_input_is_an_empty_unit() {
        let unit = parse("empty.mm", "  \n ").unwrap();
        assert!(unit.items.is_empty());
    }

    #[test]
    fn error_includes_path_line_and_col() {
        let src = "class A {\n    fn f( {\n}\n";
        let err = parse("broken.mm", src).unwrap_err();
        match err {
            MetamorphError::ParseError {
                path, line, col, ..
            } => {
                assert_eq!(path, "broken.mm");
                assert_eq!(line, 2);
                assert!(col >= 1);
            }
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn reject_top_level_statement() {
        let err = parse("a.mm", "let x: int = 1;").unwrap_err();
        assert!(matches!(err, MetamorphError::ParseError { line: 1, col: 1, .. }));
    }

    #[test]
    fn reject_missing_semicolon() {
        assert!(parse("a.mm", "class A { fn f() { run() } }").is_err());
    }

    #[test]
    fn reject_unbalanced_parens() {
        assert!(parse("a.mm", "class A { fn f() { run()); } }").is_err());
    }

    #[test]
    fn reject_unterminated_block_comment() {
        assert!(parse("a.mm", "/* never closed").is_err());
    }
}
