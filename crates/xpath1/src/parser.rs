//! A `nom`-based parser for the XPath 1.0 expression language.

use super::ast::*;
use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, multispace0, satisfy},
    combinator::{map, map_res, not, opt, recognize, value},
    error::{Error as NomError, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

// --- Main Public Parser ---

pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    let syntax_error = |reason: String| XPathError::Syntax {
        expression: input.to_string(),
        reason,
    };
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(syntax_error(format!("unexpected input at '{}'", rem))),
        Err(e) => Err(syntax_error(e.to_string())),
    }
}

// --- Combinators & Helpers ---

type ExprParser = for<'a> fn(&'a str) -> IResult<&'a str, Expression>;
type OpParser = for<'a> fn(&'a str) -> IResult<&'a str, BinaryOperator>;

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// An operator name such as `div`; must not run on into a longer name like `divider`.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = NomError<&'a str>> {
    terminated(tag(word), not(satisfy(is_name_char)))
}

fn fail<O>(input: &str) -> IResult<&str, O> {
    Err(nom::Err::Error(NomError::new(input, ErrorKind::Verify)))
}

/// Parses `operand (operator operand)*` and folds the result to the left.
fn left_assoc(input: &str, operand: ExprParser, operator: OpParser) -> IResult<&str, Expression> {
    let (input, first) = operand(input)?;
    let (input, rest) = many0(pair(ws(operator), operand)).parse(input)?;
    let folded = rest
        .into_iter()
        .fold(first, |left, (op, right)| Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        });
    Ok((input, folded))
}

// --- Expression Parsers (in order of precedence) ---

fn expression(input: &str) -> IResult<&str, Expression> {
    or_expr(input)
}

fn or_op(input: &str) -> IResult<&str, BinaryOperator> {
    value(BinaryOperator::Or, keyword("or")).parse(input)
}

fn and_op(input: &str) -> IResult<&str, BinaryOperator> {
    value(BinaryOperator::And, keyword("and")).parse(input)
}

fn equality_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        value(BinaryOperator::NotEquals, tag("!=")),
        value(BinaryOperator::Equals, char('=')),
    ))
    .parse(input)
}

fn relational_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        value(BinaryOperator::LessThanOrEqual, tag("<=")),
        value(BinaryOperator::GreaterThanOrEqual, tag(">=")),
        value(BinaryOperator::LessThan, char('<')),
        value(BinaryOperator::GreaterThan, char('>')),
    ))
    .parse(input)
}

fn additive_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        value(BinaryOperator::Plus, char('+')),
        value(BinaryOperator::Minus, char('-')),
    ))
    .parse(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        value(BinaryOperator::Multiply, char('*')),
        value(BinaryOperator::Divide, keyword("div")),
        value(BinaryOperator::Modulo, keyword("mod")),
    ))
    .parse(input)
}

fn union_op(input: &str) -> IResult<&str, BinaryOperator> {
    value(BinaryOperator::Union, char('|')).parse(input)
}

fn or_expr(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, and_expr, or_op)
}

fn and_expr(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, equality_expr, and_op)
}

fn equality_expr(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, relational_expr, equality_op)
}

fn relational_expr(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, additive_expr, relational_op)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, multiplicative_expr, additive_op)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, unary_expr, multiplicative_op)
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    alt((
        map(preceded(ws(char('-')), unary_expr), |expr| Expression::UnaryOp {
            op: UnaryOperator::Minus,
            expr: Box::new(expr),
        }),
        union_expr,
    ))
    .parse(input)
}

fn union_expr(input: &str) -> IResult<&str, Expression> {
    left_assoc(input, path_expr, union_op)
}

/// A filter expression optionally continued by a relative path, or a plain location path.
///
/// Primary expressions are tried first: `position()` would otherwise be read as a step
/// named `position` before the function parser sees the parentheses.
fn path_expr(input: &str) -> IResult<&str, Expression> {
    let (input, _) = multispace0(input)?;
    if let Ok((rest, head)) = filter_expr(input) {
        let (rest, steps) = relative_steps(rest)?;
        if steps.is_empty() {
            return Ok((rest, head));
        }
        let path = LocationPath {
            start_point: Some(Box::new(head)),
            is_absolute: false,
            steps,
        };
        return Ok((rest, Expression::LocationPath(path)));
    }
    map(location_path, Expression::LocationPath).parse(input)
}

fn filter_expr(input: &str) -> IResult<&str, Expression> {
    let (input, base) = primary_expr(input)?;
    let (input, predicates) = many0(predicate).parse(input)?;
    if predicates.is_empty() {
        return Ok((input, base));
    }
    Ok((
        input,
        Expression::Filter {
            base: Box::new(base),
            predicates,
        },
    ))
}

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    alt((
        variable_reference,
        number_literal,
        map(string_literal, Expression::Literal),
        function_call,
        delimited(
            pair(char('('), multispace0),
            expression,
            pair(multispace0, char(')')),
        ),
    ))
    .parse(input)
}

// --- Literal Parsers ---

fn number_literal(input: &str) -> IResult<&str, Expression> {
    map_res(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        |digits: &str| digits.parse::<f64>().map(Expression::Number),
    )
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

fn variable_reference(input: &str) -> IResult<&str, Expression> {
    map(preceded(char('$'), q_name), |(prefix, local)| {
        Expression::Variable(join_qname(prefix, local))
    })
    .parse(input)
}

// --- Name and NodeTest Parsers ---

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_name_start), take_while(is_name_char))).parse(input)
}

/// `prefix:local` or `local`. A following `::` is left alone for the axis parser.
fn q_name(input: &str) -> IResult<&str, (Option<&str>, &str)> {
    let (rest, first) = nc_name(input)?;
    match preceded(char(':'), nc_name).parse(rest) {
        Ok((rest, local)) => Ok((rest, (Some(first), local))),
        Err(nom::Err::Error(_)) => Ok((rest, (None, first))),
        Err(e) => Err(e),
    }
}

fn join_qname(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => local.to_string(),
    }
}

fn node_type_name(name: &str) -> bool {
    matches!(name, "text" | "node" | "comment" | "processing-instruction")
}

fn node_type_test(input: &str) -> IResult<&str, NodeTest> {
    let (rest, name) = nc_name(input)?;
    if !node_type_name(name) {
        return fail(input);
    }
    let (rest, _) = preceded(multispace0, char('(')).parse(rest)?;
    let (rest, target) = if name == "processing-instruction" {
        opt(ws(string_literal)).parse(rest)?
    } else {
        (rest, None)
    };
    let (rest, _) = preceded(multispace0, char(')')).parse(rest)?;

    let test = match name {
        "text" => NodeTypeTest::Text,
        "comment" => NodeTypeTest::Comment,
        "processing-instruction" => NodeTypeTest::ProcessingInstruction(target),
        _ => NodeTypeTest::Node,
    };
    Ok((rest, NodeTest::NodeType(test)))
}

fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        value(NodeTest::Wildcard, char('*')),
        node_type_test,
        map(terminated(nc_name, tag(":*")), |prefix: &str| {
            NodeTest::PrefixWildcard(prefix.to_string())
        }),
        map(q_name, |(prefix, local)| NodeTest::Name {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        }),
    ))
    .parse(input)
}

// --- Path Parsers ---

fn axis_from_name(name: &str) -> Result<Axis, ()> {
    Ok(match name {
        "child" => Axis::Child,
        "descendant" => Axis::Descendant,
        "descendant-or-self" => Axis::DescendantOrSelf,
        "attribute" => Axis::Attribute,
        "parent" => Axis::Parent,
        "ancestor" => Axis::Ancestor,
        "ancestor-or-self" => Axis::AncestorOrSelf,
        "self" => Axis::SelfAxis,
        "following-sibling" => Axis::FollowingSibling,
        "preceding-sibling" => Axis::PrecedingSibling,
        "following" => Axis::Following,
        "preceding" => Axis::Preceding,
        _ => return Err(()),
    })
}

fn axis_specifier(input: &str) -> IResult<&str, Axis> {
    map_res(
        terminated(nc_name, preceded(multispace0, tag("::"))),
        axis_from_name,
    )
    .parse(input)
}

fn predicate(input: &str) -> IResult<&str, Expression> {
    delimited(ws(char('[')), expression, ws(char(']'))).parse(input)
}

fn step(input: &str) -> IResult<&str, Step> {
    let any_node = NodeTest::NodeType(NodeTypeTest::Node);
    let (input, (axis, node_test)) = alt((
        value((Axis::Parent, any_node.clone()), tag("..")),
        value((Axis::SelfAxis, any_node), char('.')),
        map(preceded(char('@'), node_test), |test| (Axis::Attribute, test)),
        map(pair(opt(axis_specifier), preceded(multispace0, node_test)), |(axis, test)| {
            (axis.unwrap_or(Axis::Child), test)
        }),
    ))
    .parse(input)?;
    let (input, predicates) = many0(predicate).parse(input)?;
    Ok((
        input,
        Step {
            axis,
            node_test,
            predicates,
        },
    ))
}

/// Steps following a path head, each introduced by `/` or `//`.
fn relative_steps(input: &str) -> IResult<&str, Vec<Step>> {
    let (input, parts) = many0(pair(ws(alt((tag("//"), tag("/")))), step)).parse(input)?;
    let mut steps = Vec::with_capacity(parts.len());
    for (separator, next) in parts {
        if separator == "//" {
            steps.push(Step::descendant_or_self());
        }
        steps.push(next);
    }
    Ok((input, steps))
}

fn location_path(input: &str) -> IResult<&str, LocationPath> {
    let (rest, is_absolute, mut steps) = if let Some(rest) = input.strip_prefix("//") {
        let (rest, first) = step(rest)?;
        (rest, true, vec![Step::descendant_or_self(), first])
    } else if let Some(rest) = input.strip_prefix('/') {
        match step(rest) {
            Ok((rest, first)) => (rest, true, vec![first]),
            // A lone "/" selects the root node.
            Err(nom::Err::Error(_)) => (rest, true, vec![]),
            Err(e) => return Err(e),
        }
    } else {
        let (rest, first) = step(input)?;
        (rest, false, vec![first])
    };

    let (rest, more) = relative_steps(rest)?;
    steps.extend(more);
    Ok((
        rest,
        LocationPath {
            start_point: None,
            is_absolute,
            steps,
        },
    ))
}

fn function_call(input: &str) -> IResult<&str, Expression> {
    let (rest, (prefix, local)) = q_name(input)?;
    // Node-type tests like text() look like calls but belong to the step parser.
    if prefix.is_none() && node_type_name(local) {
        return fail(input);
    }
    let (rest, _) = preceded(multispace0, char('(')).parse(rest)?;
    let (rest, args) = separated_list0(ws(char(',')), expression).parse(rest)?;
    let (rest, _) = preceded(multispace0, char(')')).parse(rest)?;
    Ok((
        rest,
        Expression::FunctionCall {
            name: join_qname(prefix, local),
            args,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step {
            axis: Axis::Child,
            node_test: NodeTest::name(name),
            predicates: vec![],
        }
    }

    fn relative(steps: Vec<Step>) -> Expression {
        Expression::LocationPath(LocationPath {
            start_point: None,
            is_absolute: false,
            steps,
        })
    }

    #[test]
    fn test_parse_simple_path() {
        let result = parse_expression("foo/bar").unwrap();
        assert_eq!(result, relative(vec![child("foo"), child("bar")]));
    }

    #[test]
    fn test_parse_absolute_and_root_paths() {
        let result = parse_expression("/a/b").unwrap();
        if let Expression::LocationPath(lp) = result {
            assert!(lp.is_absolute);
            assert_eq!(lp.steps, vec![child("a"), child("b")]);
        } else {
            panic!("Expected LocationPath");
        }

        let root = parse_expression("/").unwrap();
        assert_eq!(
            root,
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![],
            })
        );
    }

    #[test]
    fn test_parse_descendant_or_self() {
        let result = parse_expression("//foo").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: true,
                steps: vec![Step::descendant_or_self(), child("foo")],
            })
        );

        let nested = parse_expression("a//b").unwrap();
        assert_eq!(
            nested,
            relative(vec![child("a"), Step::descendant_or_self(), child("b")])
        );
    }

    #[test]
    fn test_parse_unary_minus() {
        let result = parse_expression("-5").unwrap();
        assert_eq!(
            result,
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(Expression::Number(5.0))
            }
        );

        let result2 = parse_expression("10 - -5").unwrap();
        if let Expression::BinaryOp { left, op, right } = result2 {
            assert_eq!(op, BinaryOperator::Minus);
            assert_eq!(*left, Expression::Number(10.0));
            assert!(matches!(*right, Expression::UnaryOp { .. }));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_axes() {
        let cases = [
            ("following-sibling::foo", Axis::FollowingSibling),
            ("preceding::*", Axis::Preceding),
            ("ancestor-or-self::node()", Axis::AncestorOrSelf),
            ("descendant-or-self::x", Axis::DescendantOrSelf),
            ("attribute::id", Axis::Attribute),
        ];
        for (text, axis) in cases {
            match parse_expression(text).unwrap() {
                Expression::LocationPath(lp) => assert_eq!(lp.steps[0].axis, axis, "{}", text),
                other => panic!("Expected LocationPath for {}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_parse_abbreviated_steps() {
        let result = parse_expression("./..").unwrap();
        if let Expression::LocationPath(lp) = result {
            assert_eq!(lp.steps.len(), 2);
            assert_eq!(lp.steps[0].axis, Axis::SelfAxis);
            assert_eq!(lp.steps[1].axis, Axis::Parent);
            assert_eq!(lp.steps[1].node_test, NodeTest::NodeType(NodeTypeTest::Node));
        } else {
            panic!("Expected location path");
        }
    }

    #[test]
    fn test_parse_predicate() {
        let result = parse_expression("foo[@id = 'a']").unwrap();
        let attribute_path = LocationPath {
            start_point: None,
            is_absolute: false,
            steps: vec![Step {
                axis: Axis::Attribute,
                node_test: NodeTest::name("id"),
                predicates: vec![],
            }],
        };
        let mut expected = child("foo");
        expected.predicates.push(Expression::BinaryOp {
            left: Box::new(Expression::LocationPath(attribute_path)),
            op: BinaryOperator::Equals,
            right: Box::new(Expression::Literal("a".into())),
        });
        assert_eq!(result, relative(vec![expected]));
    }

    #[test]
    fn test_parse_numeric_predicate() {
        let result = parse_expression("foo[1]").unwrap();
        let mut expected = child("foo");
        expected.predicates.push(Expression::Number(1.0));
        assert_eq!(result, relative(vec![expected]));
    }

    #[test]
    fn test_parse_function_in_predicate() {
        match parse_expression("para[position()=1]").unwrap() {
            Expression::LocationPath(lp) => {
                assert_eq!(lp.steps[0].predicates.len(), 1);
                assert!(matches!(lp.steps[0].predicates[0], Expression::BinaryOp { .. }));
            }
            other => panic!("Expected a LocationPath, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_node_type_tests() {
        let result = parse_expression("foo/text()").unwrap();
        if let Expression::LocationPath(lp) = result {
            assert_eq!(lp.steps[1].node_test, NodeTest::NodeType(NodeTypeTest::Text));
        } else {
            panic!("Expected location path");
        }

        let pi = parse_expression("processing-instruction('style')").unwrap();
        if let Expression::LocationPath(lp) = pi {
            assert_eq!(
                lp.steps[0].node_test,
                NodeTest::NodeType(NodeTypeTest::ProcessingInstruction(Some("style".into())))
            );
        } else {
            panic!("Expected location path");
        }
    }

    #[test]
    fn test_parse_prefixed_names() {
        let result = parse_expression("/soap:Envelope/soap:*").unwrap();
        if let Expression::LocationPath(lp) = result {
            assert_eq!(
                lp.steps[0].node_test,
                NodeTest::Name {
                    prefix: Some("soap".into()),
                    local: "Envelope".into()
                }
            );
            assert_eq!(lp.steps[1].node_test, NodeTest::PrefixWildcard("soap".into()));
        } else {
            panic!("Expected location path");
        }
    }

    #[test]
    fn test_parse_filter_expression_with_path() {
        let result = parse_expression("(//item)[2]/name").unwrap();
        if let Expression::LocationPath(lp) = result {
            assert!(matches!(
                lp.start_point.as_deref(),
                Some(Expression::Filter { .. })
            ));
            assert_eq!(lp.steps, vec![child("name")]);
        } else {
            panic!("Expected location path");
        }
    }

    #[test]
    fn test_parse_path_starting_with_variable() {
        let result = parse_expression("$myVar/foo").unwrap();
        assert_eq!(
            result,
            Expression::LocationPath(LocationPath {
                start_point: Some(Box::new(Expression::Variable("myVar".to_string()))),
                is_absolute: false,
                steps: vec![child("foo")],
            })
        );
    }

    #[test]
    fn test_parse_operator_precedence() {
        let result = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(Expression::Number(1.0)),
                op: BinaryOperator::Plus,
                right: Box::new(Expression::BinaryOp {
                    left: Box::new(Expression::Number(2.0)),
                    op: BinaryOperator::Multiply,
                    right: Box::new(Expression::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_boolean_logic() {
        let path = |name: &str| Box::new(relative(vec![child(name)]));
        let eq = |l: &str, r: &str| Expression::BinaryOp {
            left: path(l),
            op: BinaryOperator::Equals,
            right: path(r),
        };

        let result = parse_expression("a = b or c = d and e = f").unwrap();
        assert_eq!(
            result,
            Expression::BinaryOp {
                left: Box::new(eq("a", "b")),
                op: BinaryOperator::Or,
                right: Box::new(Expression::BinaryOp {
                    left: Box::new(eq("c", "d")),
                    op: BinaryOperator::And,
                    right: Box::new(eq("e", "f")),
                }),
            }
        );
    }

    #[test]
    fn test_keywords_do_not_split_names() {
        let result = parse_expression("order").unwrap();
        assert_eq!(result, relative(vec![child("order")]));

        let result = parse_expression("//info | //nan").unwrap();
        assert!(matches!(
            result,
            Expression::BinaryOp {
                op: BinaryOperator::Union,
                ..
            }
        ));

        let result = parse_expression("6 div 2 mod 2").unwrap();
        assert!(matches!(
            result,
            Expression::BinaryOp {
                op: BinaryOperator::Modulo,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_function_with_arguments() {
        let result = parse_expression("concat('a', \"b\", count(//x))").unwrap();
        if let Expression::FunctionCall { name, args } = result {
            assert_eq!(name, "concat");
            assert_eq!(args.len(), 3);
            assert_eq!(args[1], Expression::Literal("b".into()));
        } else {
            panic!("Expected FunctionCall");
        }
    }

    #[test]
    fn test_invalid_expressions_report_source() {
        for bad in ["", "//", "a[", "1 +", "foo)", "@", "bogus::x", "'unterminated"] {
            match parse_expression(bad) {
                Err(XPathError::Syntax { expression, .. }) => assert_eq!(expression, bad),
                other => panic!("Expected syntax error for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_visit_function_calls() {
        let expr = parse_expression("//a[count(b) > 1]/c[not(d)]").unwrap();
        let mut seen = Vec::new();
        expr.visit_function_calls(&mut |name, arity| seen.push((name.to_string(), arity)));
        assert_eq!(seen, vec![("count".to_string(), 1), ("not".to_string(), 1)]);
    }
}
