//! Parser-to-graph tests: the node shapes built for expressions, branches,
//! loops and calls, and the export table.

use seanode::ir::{Arm, BinOp, Node, NodeId, NodeKind, UnOp, Unit, Value, DEAD, FUNCTION_TAG};
use seanode::parse_unit;
use seanode::pass::reachability::live_nodes;

fn unit(src: &str) -> Unit {
    parse_unit(src).unwrap_or_else(|e| panic!("build failed for {:?}: {}", src, e))
}

fn main_fn(body: &str) -> Unit {
    unit(&format!("main:= (arg:int)->int {{ {} }}", body))
}

/// `(control, value)` of the only `Return` of `name`.
fn single_return(unit: &Unit, name: &str) -> (NodeId, NodeId) {
    let stop = unit.stop(name).expect("function is exported");
    let returns = unit.graph.returns_of(stop);
    assert_eq!(returns.len(), 1, "expected one return, got {:?}", returns);
    match unit.graph.node(returns[0]) {
        Node::Return { control, value } => (*control, *value),
        other => panic!("expected Return, got {:?}", other),
    }
}

/// Id of the first node equal to `node`.
fn find(unit: &Unit, node: &Node) -> NodeId {
    let index = unit
        .graph
        .nodes()
        .iter()
        .position(|n| n == node)
        .unwrap_or_else(|| panic!("no node {:?}", node));
    NodeId(index as u32)
}

fn start_of(unit: &Unit, name: &str) -> NodeId {
    let stop = unit.stop(name).expect("function is exported");
    unit.graph.start_of(stop).expect("stop has a start")
}

// ---------------------------------------------------------------------------
// 1. Straight-line code
// ---------------------------------------------------------------------------

#[test]
fn test_param_plus_constants_is_canonical_add() {
    let u = main_fn("return 2+arg+3");
    let (control, value) = single_return(&u, "main");
    assert_eq!(control, start_of(&u, "main"));
    let Node::Binary { op: BinOp::Add, lhs, rhs } = u.graph.node(value) else {
        panic!("expected Add, got {:?}", u.graph.node(value));
    };
    assert_eq!(
        u.graph.node(*lhs),
        &Node::DataProject { start: control, index: 1 }
    );
    assert_eq!(u.graph.node(*rhs).as_int(), Some(5));
}

#[test]
fn test_separators_are_optional() {
    let u = main_fn("a:=1; b:=2;; return a+b+arg;");
    let (_, value) = single_return(&u, "main");
    let Node::Binary { op: BinOp::Add, rhs, .. } = u.graph.node(value) else {
        panic!("expected Add, got {:?}", u.graph.node(value));
    };
    assert_eq!(u.graph.node(*rhs).as_int(), Some(3));
}

#[test]
fn test_typed_and_inferred_declarations_agree() {
    let a = main_fn("x:int = arg*2 return x");
    let b = main_fn("x := arg*2 return x");
    let (_, va) = single_return(&a, "main");
    let (_, vb) = single_return(&b, "main");
    assert_eq!(a.graph.node(va), b.graph.node(vb));
}

#[test]
fn test_unary_binds_tighter_than_binary() {
    let u = main_fn("return -arg*2");
    let (_, value) = single_return(&u, "main");
    let Node::Binary { op: BinOp::Mul, lhs, .. } = u.graph.node(value) else {
        panic!("expected Mul, got {:?}", u.graph.node(value));
    };
    assert!(matches!(u.graph.node(*lhs), Node::Unary { op: UnOp::Neg, .. }));
}

// ---------------------------------------------------------------------------
// 2. Branches
// ---------------------------------------------------------------------------

#[test]
fn test_if_else_builds_region_and_phi() {
    let u = main_fn("a:int=0 if arg<0 a=-arg else a=2*arg return a");
    let g = &u.graph;
    let start = start_of(&u, "main");
    let (region, phi) = single_return(&u, "main");

    let Node::Region { preds: [Some(p0), Some(p1)] } = g.node(region) else {
        panic!("expected Region, got {:?}", g.node(region));
    };
    let Node::ControlProject { ifelse, arm: Arm::Then } = g.node(*p0) else {
        panic!("expected then projection, got {:?}", g.node(*p0));
    };
    assert_eq!(g.node(*p1), &Node::ControlProject { ifelse: *ifelse, arm: Arm::Else });
    let Node::IfElse { control, cond } = g.node(*ifelse) else {
        panic!("expected IfElse, got {:?}", g.node(*ifelse));
    };
    assert_eq!(*control, start);
    assert_eq!(g.node(*cond).kind(), NodeKind::Lt);

    let Node::Phi { region: r, values: [Some(v0), Some(v1)] } = g.node(phi) else {
        panic!("expected Phi, got {:?}", g.node(phi));
    };
    assert_eq!(*r, region);
    assert_eq!(g.node(*v0).kind(), NodeKind::Neg);
    assert_eq!(g.node(*v1).kind(), NodeKind::Mul);
}

#[test]
fn test_if_without_else_merges_with_entry_values() {
    let u = main_fn("a:=1 if arg a=2 return a");
    let g = &u.graph;
    let (_, phi) = single_return(&u, "main");
    let Node::Phi { values: [Some(v0), Some(v1)], .. } = g.node(phi) else {
        panic!("expected Phi, got {:?}", g.node(phi));
    };
    assert_eq!(g.node(*v0).as_int(), Some(2));
    assert_eq!(g.node(*v1).as_int(), Some(1));
}

#[test]
fn test_constant_condition_removes_the_dead_arm() {
    let u = main_fn("a:=1 if 1 a=26 else a=arg return a");
    let (control, value) = single_return(&u, "main");
    assert_eq!(control, start_of(&u, "main"));
    assert_eq!(u.graph.node(value).as_int(), Some(26));

    let stop = u.stop("main").expect("main");
    let kinds: Vec<NodeKind> = live_nodes(&u.graph, stop)
        .into_iter()
        .map(|id| u.graph.node(id).kind())
        .collect();
    assert_eq!(
        kinds,
        vec![NodeKind::Start, NodeKind::Stop, NodeKind::Term, NodeKind::Return],
        "only the taken arm survives"
    );
}

#[test]
fn test_constant_folded_condition_through_variable() {
    let u = main_fn("a:int=13 if a<0 a=-a else a=2*a return a");
    let (_, value) = single_return(&u, "main");
    assert_eq!(u.graph.node(value).as_int(), Some(26));
    let stop = u.stop("main").expect("main");
    assert!(live_nodes(&u.graph, stop)
        .iter()
        .all(|id| !matches!(u.graph.node(*id), Node::IfElse { .. } | Node::Region { .. } | Node::Phi { .. })));
}

#[test]
fn test_identical_bindings_need_no_phi() {
    let u = main_fn("a:=arg if arg<3 a=arg else a=arg return a");
    let (_, value) = single_return(&u, "main");
    assert!(
        matches!(u.graph.node(value), Node::DataProject { index: 1, .. }),
        "got {:?}",
        u.graph.node(value)
    );
}

#[test]
fn test_return_in_both_arms_records_two_returns() {
    let u = main_fn("if arg return 1 else return 2");
    let stop = u.stop("main").expect("main");
    assert_eq!(u.graph.returns_of(stop).len(), 2);
}

// ---------------------------------------------------------------------------
// 3. Loops
// ---------------------------------------------------------------------------

#[test]
fn test_while_builds_header_with_backedge_and_phi() {
    let u = main_fn("while arg<10 arg=arg+1 return arg");
    let g = &u.graph;
    let start = start_of(&u, "main");
    let (exit, phi) = single_return(&u, "main");

    let Node::ControlProject { ifelse, arm: Arm::Else } = g.node(exit) else {
        panic!("expected else projection, got {:?}", g.node(exit));
    };
    let Node::IfElse { control: header, cond } = g.node(*ifelse) else {
        panic!("expected IfElse, got {:?}", g.node(*ifelse));
    };
    let Node::Region { preds: [Some(entry), Some(back)] } = g.node(*header) else {
        panic!("expected loop header, got {:?}", g.node(*header));
    };
    assert_eq!(*entry, start);
    assert_eq!(g.node(*back), &Node::ControlProject { ifelse: *ifelse, arm: Arm::Then });

    let Node::Phi { region, values: [Some(init), Some(latch)] } = g.node(phi) else {
        panic!("expected Phi, got {:?}", g.node(phi));
    };
    assert_eq!(region, header);
    assert!(matches!(g.node(*init), Node::DataProject { index: 1, .. }));
    let Node::Binary { op: BinOp::Add, lhs, rhs } = g.node(*latch) else {
        panic!("expected Add, got {:?}", g.node(*latch));
    };
    assert_eq!(*lhs, phi);
    assert_eq!(g.node(*rhs).as_int(), Some(1));
    assert_eq!(
        g.node(*cond),
        &Node::Binary { op: BinOp::Lt, lhs: phi, rhs: find(&u, &Node::Term(Value::Int(10))) }
    );
}

#[test]
fn test_break_leaves_dead_backedge_and_exit_phi() {
    let u = main_fn("while arg<10 { arg=5 break } return arg");
    let g = &u.graph;
    let (region, phi) = single_return(&u, "main");

    let Node::Region { preds: [Some(exit), Some(brk)] } = g.node(region) else {
        panic!("expected exit region, got {:?}", g.node(region));
    };
    assert!(matches!(g.node(*exit), Node::ControlProject { arm: Arm::Else, .. }));
    let Node::ControlProject { ifelse, arm: Arm::Then } = g.node(*brk) else {
        panic!("expected then projection, got {:?}", g.node(*brk));
    };
    let Node::IfElse { control: header, .. } = g.node(*ifelse) else {
        panic!("expected IfElse, got {:?}", g.node(*ifelse));
    };
    assert!(
        matches!(g.node(*header), Node::Region { preds: [_, Some(DEAD)] }),
        "every body path breaks, so the back-edge is dead: {:?}",
        g.node(*header)
    );

    let Node::Phi { values: [Some(stay), Some(five)], .. } = g.node(phi) else {
        panic!("expected Phi, got {:?}", g.node(phi));
    };
    assert!(matches!(g.node(*stay), Node::Phi { region, .. } if region == header));
    assert_eq!(g.node(*five).as_int(), Some(5));
}

#[test]
fn test_continue_becomes_the_backedge() {
    let u = main_fn("while arg<10 { arg=arg+1 continue } return arg");
    let g = &u.graph;
    let (exit, _) = single_return(&u, "main");
    let Node::ControlProject { ifelse, .. } = g.node(exit) else {
        panic!("expected projection, got {:?}", g.node(exit));
    };
    let Node::IfElse { control: header, .. } = g.node(*ifelse) else {
        panic!("expected IfElse, got {:?}", g.node(*ifelse));
    };
    let body = find(&u, &Node::ControlProject { ifelse: *ifelse, arm: Arm::Then });
    assert_eq!(
        g.node(*header),
        &Node::Region { preds: [Some(start_of(&u, "main")), Some(body)] }
    );
}

#[test]
fn test_infinite_loop_header_is_kept_alive() {
    let u = main_fn("while 1 {} return 0");
    let stop = u.stop("main").expect("main");
    let Node::Stop { returns, loops, .. } = u.graph.node(stop) else {
        panic!("expected Stop");
    };
    assert!(returns.is_empty(), "code after an endless loop is dead");
    assert_eq!(loops.len(), 1);
    assert!(live_nodes(&u.graph, stop).contains(&loops[0]));
}

#[test]
fn test_loop_after_return_is_not_registered() {
    let u = main_fn("return arg while arg<10 arg=arg+1");
    let stop = u.stop("main").expect("main");
    let Node::Stop { loops, .. } = u.graph.node(stop) else {
        panic!("expected Stop");
    };
    assert!(loops.is_empty());
}

// ---------------------------------------------------------------------------
// 4. Functions and exports
// ---------------------------------------------------------------------------

#[test]
fn test_exports_keep_declaration_order_and_share_one_arena() {
    let u = unit(
        "second:= (x:int)->int { return x }
         first:= (x:int, y:int)->int { return second(x)+y }",
    );
    let names: Vec<&str> = u.exports.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["second", "first"]);

    let second = u.function("second").expect("second");
    let first = u.function("first").expect("first");
    assert_eq!(second.arity, 1);
    assert_eq!(first.arity, 2);
    assert_ne!(second.stop, first.stop);
    for term in u.exports.values() {
        assert_eq!(u.graph.node(*term).tag(), FUNCTION_TAG);
    }
}

#[test]
fn test_call_node_refers_to_the_callee_term() {
    let u = unit(
        "inc:= (x:int)->int { return x+1 }
         main:= (arg:int)->int { return inc(arg) }",
    );
    let (_, value) = single_return(&u, "main");
    let Node::Call { callee, args } = u.graph.node(value) else {
        panic!("expected Call, got {:?}", u.graph.node(value));
    };
    assert_eq!(Some(callee), u.exports.get("inc"));
    assert_eq!(args.len(), 1);
    assert!(matches!(u.graph.node(args[0]), Node::DataProject { index: 1, .. }));
}

#[test]
fn test_recursive_call_uses_own_export() {
    let u = unit("f:= (n:int)->int { if n return f(n-1) return 0 }");
    let term = *u.exports.get("f").expect("f");
    let stop = u.stop("f").expect("f");
    let calls: Vec<NodeId> = live_nodes(&u.graph, stop)
        .into_iter()
        .filter(|id| matches!(u.graph.node(*id), Node::Call { callee, .. } if *callee == term))
        .collect();
    assert_eq!(calls.len(), 1);
}
