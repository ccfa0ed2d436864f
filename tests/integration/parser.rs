use sift::parser::ast::*;
use sift::parser::parse;

fn single(source: &str) -> Expr {
    let mut nodes = parse(source).unwrap_or_else(|e| panic!("parse failed for {source:?}: {e}"));
    assert_eq!(nodes.len(), 1, "expected one statement in {source:?}");
    nodes.remove(0).node
}

fn parse_err(source: &str) -> String {
    match parse(source) {
        Ok(nodes) => panic!("expected a parse error for {source:?}, got {nodes:?}"),
        Err(e) => e.to_string(),
    }
}

fn binop(expr: &Expr) -> (BinOp, &Expr, &Expr) {
    match expr {
        Expr::BinaryOp { op, left, right } => (*op, &left.node, &right.node),
        other => panic!("expected a binary op, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = single("1 + 2 * 3");
    let (op, _, right) = binop(&expr);
    assert_eq!(op, BinOp::Add);
    assert_eq!(binop(right).0, BinOp::Mul);
}

#[test]
fn parentheses_override_precedence() {
    let expr = single("(1 + 2) * 3");
    let (op, left, _) = binop(&expr);
    assert_eq!(op, BinOp::Mul);
    assert_eq!(binop(left).0, BinOp::Add);
}

#[test]
fn subtraction_is_left_associative() {
    let expr = single("10 - 4 - 3");
    let (_, left, right) = binop(&expr);
    assert_eq!(binop(left).0, BinOp::Sub);
    assert!(matches!(right, Expr::Literal { value: Literal::Int(3) }));
}

#[test]
fn power_is_right_associative() {
    let expr = single("2 ^ 3 ^ 2");
    let (op, left, right) = binop(&expr);
    assert_eq!(op, BinOp::Pow);
    assert!(matches!(left, Expr::Literal { value: Literal::Int(2) }));
    assert_eq!(binop(right).0, BinOp::Pow);
}

#[test]
fn logical_operators_bind_loosest() {
    let expr = single("a < 1 || b == 2 && c");
    let (op, left, right) = binop(&expr);
    assert_eq!(op, BinOp::Or);
    assert_eq!(binop(left).0, BinOp::Lt);
    assert_eq!(binop(right).0, BinOp::And);
}

#[test]
fn unary_minus_binds_tighter_than_multiplication() {
    let expr = single("-a * b");
    let (op, left, _) = binop(&expr);
    assert_eq!(op, BinOp::Mul);
    assert!(matches!(left, Expr::UnaryOp { op: UnaryOp::Neg, .. }));
}

#[test]
fn assignment_is_right_associative() {
    let Expr::Assignment { target, value } = single("a := b := 3") else { panic!("not an assignment") };
    assert!(matches!(target.node, Expr::Identifier { ref name } if name == "a"));
    assert!(matches!(value.node, Expr::Assignment { .. }));
}

#[test]
fn global_and_method_calls() {
    let Expr::MethodCall { receiver, method, args } = single("print(1, 2)") else { panic!() };
    assert!(receiver.is_none());
    assert_eq!(method.node, "print");
    assert_eq!(args.len(), 2);

    let Expr::MethodCall { receiver, method, args } = single("[1, 2].join(\",\")") else { panic!() };
    assert!(matches!(receiver.map(|r| r.node), Some(Expr::Array { .. })));
    assert_eq!(method.node, "join");
    assert_eq!(args.len(), 1);
}

#[test]
fn index_is_sugar_for_at() {
    let Expr::MethodCall { receiver, method, args } = single("xs[0]") else { panic!() };
    assert_eq!(method.node, "at");
    assert!(receiver.is_some());
    assert!(matches!(args[0].node, Expr::Literal { value: Literal::Int(0) }));
}

#[test]
fn field_access_chains() {
    let Expr::FieldAccess { object, field } = single("a.b.c") else { panic!() };
    assert_eq!(field.node, "c");
    assert!(matches!(object.node, Expr::FieldAccess { .. }));
}

#[test]
fn list_literals() {
    assert!(matches!(single("[]"), Expr::Array { ref elements } if elements.is_empty()));
    assert!(matches!(single("[:]"), Expr::Object { ref entries } if entries.is_empty()));
    let Expr::Object { entries } = single("[a: 1, \"b c\": 2]") else { panic!() };
    let keys: Vec<&str> = entries.iter().map(|(k, _)| k.node.as_str()).collect();
    assert_eq!(keys, ["a", "b c"]);
}

#[test]
fn closures_and_blocks() {
    let Expr::Block { params, body } = single("{ x, y: Int | x + y }") else { panic!() };
    assert_eq!(params.len(), 2);
    assert!(params[0].annotation.is_none());
    assert_eq!(params[1].annotation.as_ref().map(|a| a.node.to_string()), Some("Int".to_string()));
    assert_eq!(body.len(), 1);

    let Expr::Block { params, body } = single("{ a := 1; a + 1 }") else { panic!() };
    assert!(params.is_empty());
    assert_eq!(body.len(), 2);
}

#[test]
fn function_declarations() {
    let Expr::FunctionDeclaration { decl } = single("fn add(a: Int, b: Int) := a + b") else { panic!() };
    assert_eq!(decl.name.node, "add");
    assert_eq!(decl.params.len(), 2);

    let Expr::FunctionDeclaration { decl } = single("fn square x := x * x") else { panic!() };
    assert_eq!(decl.params.len(), 1);
    assert!(decl.params[0].annotation.is_none());

    let Expr::FunctionDeclaration { decl } = single("fn first[T <: Any](xs: Array[T]) := xs[0]") else { panic!() };
    assert_eq!(decl.type_params.len(), 1);
    assert_eq!(decl.type_params[0].name.node, "T");
    assert_eq!(decl.params[0].annotation.as_ref().map(|a| a.node.to_string()), Some("Array[T]".to_string()));
}

#[test]
fn type_declarations() {
    let Expr::TypeDeclaration { decl } = single("abstract Shape") else { panic!() };
    assert_eq!(decl.body, TypeDeclBody::Abstract);

    let Expr::TypeDeclaration { decl } = single("type Circle <: Shape { radius: Float }") else { panic!() };
    assert_eq!(decl.parent.as_ref().map(|p| p.node.name().to_string()), Some("Shape".to_string()));
    let TypeDeclBody::Struct { fields } = &decl.body else { panic!() };
    assert_eq!(fields[0].name.node, "radius");

    let Expr::TypeDeclaration { decl } = single("type Option = Some(value: Any) | None") else { panic!() };
    let TypeDeclBody::Adt { variants } = &decl.body else { panic!() };
    let names: Vec<&str> = variants.iter().map(|v| v.name.node.as_str()).collect();
    assert_eq!(names, ["Some", "None"]);
    assert!(variants[1].fields.is_empty());
}

#[test]
fn match_expressions() {
    let src = "match shape {\n  Circle { radius: ?r } => r\n  ?other => 0\n}";
    let Expr::MatchExpression { arms, .. } = single(src) else { panic!() };
    assert_eq!(arms.len(), 2);
    assert!(matches!(arms[0].pattern.node, Expr::TypeInstance { .. }));
    assert!(matches!(arms[1].pattern.node, Expr::CapturePattern { name: Some(ref n), .. } if n == "other"));
}

#[test]
fn literal_and_negative_patterns() {
    let Expr::MatchExpression { arms, .. } = single("match n { 0 => \"zero\", -1 => \"neg\", ? => \"other\" }") else {
        panic!()
    };
    assert!(matches!(arms[0].pattern.node, Expr::Literal { value: Literal::Int(0) }));
    assert!(matches!(arms[1].pattern.node, Expr::Literal { value: Literal::Int(-1) }));
    assert!(matches!(arms[2].pattern.node, Expr::CapturePattern { name: None, pattern: None }));
}

#[test]
fn destructuring_assignment() {
    let Expr::Assignment { target, .. } = single("Point { x: ?a, y: ?b } := p") else { panic!() };
    assert!(matches!(target.node, Expr::TypeInstance { .. }));
}

#[test]
fn quoted_forms() {
    let Expr::QuotedForm { body } = single("#(1 + 2)") else { panic!() };
    assert!(matches!(body.node, Expr::BinaryOp { op: BinOp::Add, .. }));
}

#[test]
fn ast_serializes_with_kind_tags() {
    let nodes = parse("x := 1").unwrap();
    let json = serde_json::to_value(&nodes).unwrap();
    assert_eq!(json[0]["node"]["kind"], "assignment");
    assert_eq!(json[0]["node"]["value"]["node"]["kind"], "literal");
    assert_eq!(json[0]["span"]["line"], 1);
}

#[test]
fn single_equals_is_rejected() {
    assert!(parse_err("x = 1").contains("use ':=' for assignment"));
}

#[test]
fn invalid_assignment_target() {
    assert!(parse_err("1 := 2").contains("invalid assignment target"));
}

#[test]
fn reserved_keywords_cannot_start_expressions() {
    assert!(parse_err("trait Foo").contains("reserved keyword"));
    assert!(parse_err("for x").contains("reserved keyword"));
}

#[test]
fn unclosed_delimiters() {
    assert!(parse_err("{ 1 + 2").contains("unclosed block"));
    assert!(parse_err("match x { 1 => 2,").contains("unclosed match"));
    assert!(parse_err("(1 + 2").contains("expected"));
}

#[test]
fn errors_name_the_token_and_position() {
    let msg = parse_err("x := 1\ny := )");
    assert!(msg.starts_with("Syntax error:"), "{msg}");
    assert!(msg.contains("')'"), "{msg}");
    assert!(msg.contains("line 2, column 6"), "{msg}");
}

#[test]
fn mixed_list_is_rejected() {
    assert!(parse_err("[a: 1, 2]").contains("cannot mix"));
}

#[test]
fn type_followed_by_paren_is_the_builtin_call() {
    let Expr::MethodCall { receiver, method, args } = single("type(x)") else { panic!() };
    assert!(receiver.is_none());
    assert_eq!(method.node, "type");
    assert_eq!(args.len(), 1);
    assert!(matches!(single("type(1).upper()"), Expr::MethodCall { receiver: Some(_), .. }));
    assert!(matches!(single("type T { a: Int }"), Expr::TypeDeclaration { .. }));
}

#[test]
fn oversized_integer_literal_is_reported() {
    let msg = parse_err("x := 99999999999999999999 + 1");
    assert!(msg.contains("99999999999999999999"), "{msg}");
    assert!(msg.contains("out of range"), "{msg}");
}
