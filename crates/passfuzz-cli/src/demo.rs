//! A small expression language and a three-pass pipeline over it.
//!
//! ```text
//! top   := (let | print)+
//! let   := ident expr        binds ident in top
//! print := expr
//! expr  := int | ref | add
//! add   := expr expr
//! ```
//!
//! `fold` folds constant additions, `print_to_call` lowers `print` into a
//! call, and `emit` has no output schema, so it is never fuzzed.

use std::sync::Arc;

use passfuzz::{
    ident, int_literal, Change, Field, Generators, Node, PassDef, PassRef, PassRun, Prop,
    PropResult, Rewriter, SchemaRef, Shape, Token, Wellformed, TOP,
};

pub const LET: Token = Token::new("let");
pub const PRINT: Token = Token::new("print");
pub const CALL: Token = Token::new("call");
pub const FUNC: Token = Token::new("func");
pub const IDENT: Token = Token::new("ident");
pub const REF: Token = Token::new("ref");
pub const INT: Token = Token::new("int");
pub const ADD: Token = Token::new("add");
pub const EXPR: Token = Token::new("expr");
pub const LHS: Token = Token::new("lhs");
pub const RHS: Token = Token::new("rhs");

const OPERAND: [Token; 3] = [INT, REF, ADD];

/// A deliberate defect to plant in `fold`, for seeing failures reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Bug {
    /// No defect.
    None,
    /// Drop the right operand instead of folding (malformed output).
    Arity,
    /// Report an error for additions involving a reference (not checked).
    Error,
    /// Leave additions with a negative left operand unfolded (property
    /// failure).
    Prop,
}

pub fn input_wf() -> Wellformed {
    Wellformed::new()
        .shape(TOP, Shape::seq([LET, PRINT]).at_least(1))
        .shape(
            LET,
            Shape::fields([Field::new(IDENT), Field::named(EXPR, OPERAND)]),
        )
        .shape(PRINT, Shape::fields([Field::named(EXPR, OPERAND)]))
        .shape(
            ADD,
            Shape::fields([Field::named(LHS, OPERAND), Field::named(RHS, OPERAND)]),
        )
        .binding_shadowing(LET, IDENT)
        .scope(TOP)
}

fn call_wf() -> Wellformed {
    input_wf().merge(
        &Wellformed::new()
            .shape(TOP, Shape::seq([LET, CALL]).at_least(1))
            .shape(
                CALL,
                Shape::fields([Field::new(FUNC), Field::named(EXPR, OPERAND)]),
            ),
    )
}

pub fn generators() -> Generators {
    Generators::new()
        .with(IDENT, ident("x", 6))
        .with(REF, ident("x", 6))
        .with(INT, int_literal(-100..=100))
        .with(FUNC, |_| "print".to_string())
}

pub fn pipeline(bug: Bug) -> Rewriter {
    let input: SchemaRef = Arc::new(input_wf());
    Rewriter::new(
        "calc",
        input.clone(),
        vec![fold(bug, input), print_to_call(), emit()],
    )
}

// ============================================================================
// fold
// ============================================================================

fn int_value(node: Option<&Node>) -> Option<i64> {
    node.filter(|n| n.is(INT))?.text().parse().ok()
}

/// Value of a reference-free expression.
fn eval(node: &Node) -> Option<i64> {
    match node.token() {
        t if t == INT => node.text().parse().ok(),
        t if t == ADD => eval(node.child(0)?)?.checked_add(eval(node.child(1)?)?),
        _ => None,
    }
}

fn fold_node(node: Node, bug: Bug, changes: &mut Vec<Change>) -> Node {
    let token = node.token();
    let location = node.location().clone();
    let children: Vec<Node> = node
        .into_children()
        .into_iter()
        .map(|child| fold_node(child, bug, changes))
        .collect();
    let node = Node::new(token)
        .with_location(location)
        .with_children(children);

    if !node.is(ADD) {
        return node;
    }
    if bug == Bug::Error && node.children().iter().any(|c| c.is(REF)) {
        return Node::error_at("cannot fold a reference", node);
    }
    let (Some(lhs), Some(rhs)) = (int_value(node.child(0)), int_value(node.child(1))) else {
        return node;
    };
    if bug == Bug::Prop && lhs < 0 {
        return node;
    }
    if bug == Bug::Arity {
        let mut node = node;
        node.children_mut().truncate(1);
        return node;
    }

    match lhs.checked_add(rhs) {
        Some(sum) => {
            changes.push(Change {
                token: ADD,
                location: node.location().clone(),
            });
            Node::leaf(INT, sum.to_string())
        }
        None => Node::error_at("integer overflow", node),
    }
}

/// First addition of two literals, outermost first.
fn foldable(node: &Node) -> Option<&Node> {
    if node.is(ADD) && int_value(node.child(0)).is_some() && int_value(node.child(1)).is_some() {
        return Some(node);
    }
    node.children().iter().find_map(foldable)
}

fn same_len() -> Prop {
    Prop::new("statement count preserved", |before: &Node, after: &Node| {
        PropResult::check(before.len() == after.len())
    })
}

fn fold(bug: Bug, wf: SchemaRef) -> PassRef {
    PassDef::new("fold", move |ast| {
        let mut changes = Vec::new();
        let ast = fold_node(ast, bug, &mut changes);
        PassRun {
            ast,
            count: 1,
            changes,
        }
    })
    .with_shared_wf(wf)
    .prop(TOP, same_len())
    .prop(
        TOP,
        Prop::new("no foldable addition left", |_: &Node, after: &Node| {
            foldable(after).map_or(PropResult::Ok, PropResult::fail_at)
        }),
    )
    .prop(
        ADD,
        Prop::new("value preserved", |before: &Node, after: &Node| {
            match eval(before) {
                Some(value) => PropResult::check(eval(after) == Some(value)),
                None => PropResult::Ok,
            }
        }),
    )
    .into_ref()
}

// ============================================================================
// print_to_call
// ============================================================================

fn print_to_call() -> PassRef {
    PassDef::new("print_to_call", |ast: Node| {
        let mut changes = Vec::new();
        let token = ast.token();
        let location = ast.location().clone();
        let children: Vec<Node> = ast
            .into_children()
            .into_iter()
            .map(|stmt| {
                if !stmt.is(PRINT) {
                    return stmt;
                }
                changes.push(Change {
                    token: PRINT,
                    location: stmt.location().clone(),
                });
                Node::new(CALL)
                    .with(Node::leaf(FUNC, "print"))
                    .with_children(stmt.into_children())
            })
            .collect();
        let count = usize::from(!changes.is_empty());
        PassRun {
            ast: Node::new(token)
                .with_location(location)
                .with_children(children),
            count,
            changes,
        }
    })
    .with_wf(call_wf())
    .prop(TOP, same_len())
    .prop(
        TOP,
        Prop::new("no print left", |_: &Node, after: &Node| {
            after
                .children()
                .iter()
                .find(|stmt| stmt.is(PRINT))
                .map_or(PropResult::Ok, PropResult::fail_at)
        }),
    )
    .into_ref()
}

// ============================================================================
// emit
// ============================================================================

/// Final stage producing output text; its output has no schema.
fn emit() -> PassRef {
    PassDef::map("emit", |ast: Node| ast).into_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use passfuzz::unit_test::Test;
    use passfuzz::{Fuzzer, NullSink, Pass};

    fn int(value: &str) -> Node {
        Node::leaf(INT, value)
    }

    fn add(lhs: Node, rhs: Node) -> Node {
        Node::new(ADD).with(lhs).with(rhs)
    }

    fn print(expr: Node) -> Node {
        Node::new(PRINT).with(expr)
    }

    fn fuzz(bug: Bug, check_props: bool) -> passfuzz::FuzzResult {
        Fuzzer::from_rewriter(&pipeline(bug), generators())
            .with_start_seed(0)
            .with_seed_count(40)
            .with_max_depth(6)
            .with_check_props(check_props)
            .with_sink(Arc::new(NullSink))
            .run()
    }

    #[test]
    fn test_fold_examples() {
        let pipeline = pipeline(Bug::None);
        let report = Test::new("fold")
            .rewrites_into(print(add(int("1"), int("2"))), print(int("3")))
            .rewrites_into(
                print(add(add(int("1"), int("2")), int("-4"))),
                print(int("-1")),
            )
            .rewrites_into(
                print(add(Node::leaf(REF, "x"), int("2"))),
                print(add(Node::leaf(REF, "x"), int("2"))),
            )
            .rewrites_into_err(print(add(int(&i64::MAX.to_string()), int("1"))))
            .run(pipeline.passes[0].as_ref());
        assert!(report.passed(), "{report}");
    }

    #[test]
    fn test_print_to_call_examples() {
        let pipeline = pipeline(Bug::None);
        let pass = pipeline.passes[1].as_ref();
        assert_eq!(pass.name(), "print_to_call");
        let report = Test::new("print_to_call")
            .rewrites_into(
                print(int("1")),
                Node::new(CALL)
                    .with(Node::leaf(FUNC, "print"))
                    .with(int("1")),
            )
            .run(pass);
        assert!(report.passed(), "{report}");
    }

    #[test]
    fn test_pipeline_is_clean() {
        let result = fuzz(Bug::None, true);
        assert_eq!(result.status(), 0, "{:?}", result.failures);
        assert_eq!(result.stages_tested, vec![1, 2]);
    }

    #[test]
    fn test_planted_bugs_are_found() {
        let result = fuzz(Bug::Arity, false);
        assert!(result
            .failures
            .iter()
            .all(|f| matches!(f.cause, passfuzz::FailureCause::Structural { .. })));
        assert_eq!(result.status(), 1);

        let result = fuzz(Bug::Error, true);
        assert_eq!(result.status(), 0);
        assert!(result.not_applicable > 0);

        let result = fuzz(Bug::Prop, true);
        assert_eq!(result.status(), 1);
        assert!(result
            .failures
            .iter()
            .all(|f| matches!(f.cause, passfuzz::FailureCause::Property { .. })));
    }

    #[test]
    fn test_emit_stage_is_skipped() {
        let result = Fuzzer::from_rewriter(&pipeline(Bug::None), generators())
            .with_start_seed(0)
            .with_seed_count(5)
            .with_start_index(3)
            .and_then(|f| f.with_end_index(3))
            .map(|f| f.with_sink(Arc::new(NullSink)).run());
        let result = result.unwrap();
        assert_eq!(result.stages_skipped, vec![3]);
        assert!(result.stages_tested.is_empty());
    }
}
