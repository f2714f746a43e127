//! Backend tests: graph text, LLVM IR (straight-line lowering and stubs),
//! JSON export, and the `compile()` entry point.

use pretty_assertions::assert_eq;
use seanode::codegen::{emit_graph_text, emit_json, emit_llvm_ir, emit_llvm_ir_with_driver, export_unit};
use seanode::error::CodegenError;
use seanode::ir::{NodeKind, Unit};
use seanode::{compile, parse_unit, CompileOptions, EmitKind};

fn unit(src: &str) -> Unit {
    parse_unit(src).unwrap_or_else(|e| panic!("build failed for {:?}: {}", src, e))
}

fn main_fn(body: &str) -> Unit {
    unit(&format!("main:= (arg:int)->int {{ {} }}", body))
}

fn llvm(u: &Unit) -> String {
    emit_llvm_ir(u).expect("llvm emission")
}

// ---------------------------------------------------------------------------
// 1. Graph text
// ---------------------------------------------------------------------------

#[test]
fn test_graph_text_lists_live_nodes() {
    let text = emit_graph_text(&main_fn("return 2+arg+3")).expect("graph text");
    assert_eq!(
        text,
        "// seanode graph\n\
         \n\
         fn main/1 {\n\
         \x20 %1 = Start(params=1)\n\
         \x20 %2 = Stop(%10)\n\
         \x20 %3 = DataProject#1(%1)\n\
         \x20 %8 = Term 5\n\
         \x20 %9 = Add(%3, %8)\n\
         \x20 %10 = Return(%1, %9)\n\
         }\n"
    );
}

#[test]
fn test_graph_text_shows_region_anchor_and_phi() {
    let text = emit_graph_text(&main_fn("if arg<0 arg=-arg return arg")).expect("graph text");
    assert!(text.contains("= Region(_, %"), "got:\n{}", text);
    assert!(text.contains("= Phi(%"), "got:\n{}", text);
    assert!(text.contains("= ControlProject#0(%"), "got:\n{}", text);
    assert!(text.contains("= ControlProject#1(%"), "got:\n{}", text);
    assert!(!text.contains('?'), "a finished graph has no open slots:\n{}", text);
}

#[test]
fn test_graph_text_has_one_section_per_export() {
    let u = unit(
        "one:= ()->int { return 1 }
         two:= ()->int { return 2 }",
    );
    let text = emit_graph_text(&u).expect("graph text");
    let one = text.find("fn one/0 {").expect("one");
    let two = text.find("fn two/0 {").expect("two");
    assert!(one < two, "exports print in declaration order");
}

// ---------------------------------------------------------------------------
// 2. LLVM IR
// ---------------------------------------------------------------------------

#[test]
fn test_llvm_straight_line_function() {
    assert_eq!(
        llvm(&main_fn("return 2+arg+3")),
        "; seanode LLVM IR\n\
         ; straight-line functions only; others are emitted as stubs\n\
         \n\
         define i64 @main(i64 %p1) {\n\
         entry:\n\
         \x20 %v9 = add i64 %p1, 5\n\
         \x20 ret i64 %v9\n\
         }\n"
    );
}

#[test]
fn test_llvm_constant_return() {
    let text = llvm(&main_fn("return 6*7"));
    assert!(text.contains("entry:\n  ret i64 42\n}"), "got:\n{}", text);
}

#[test]
fn test_llvm_operators() {
    let text = llvm(&unit("f:= (x:int y:int)->int { return -(x-y)/2 + (x<y) + !x }"));
    assert!(text.contains("define i64 @f(i64 %p1, i64 %p2) {"), "got:\n{}", text);
    assert!(text.contains("= sub i64 %p1, %p2"), "got:\n{}", text);
    assert!(text.contains("= sub i64 0, %v"), "got:\n{}", text);
    assert!(text.contains("= sdiv i64 %v"), "got:\n{}", text);
    assert!(text.contains("icmp slt i64 %p1, %p2"), "got:\n{}", text);
    assert!(text.contains("icmp eq i64 %p1, 0"), "got:\n{}", text);
    assert!(text.contains("zext i1 %c"), "got:\n{}", text);
}

#[test]
fn test_llvm_stubs_for_unsupported_constructs() {
    let cases = [
        ("if arg<0 arg=-arg return arg", "unsupported: conditional branches"),
        ("while arg<10 arg=arg+1 return arg", "unsupported: control-flow merges"),
        ("if arg return 1 else return 2", "unsupported: conditional branches"),
        ("return main(arg)", "unsupported: calls"),
        ("while 1 {}", "unsupported: control-flow merges"),
    ];
    for (body, reason) in cases {
        let text = llvm(&main_fn(body));
        assert!(text.contains(reason), "{}: got:\n{}", body, text);
        assert!(text.contains("  unreachable\n"), "{}: got:\n{}", body, text);
    }
}

#[test]
fn test_llvm_driver_runs_the_entry_from_argv() {
    let text = emit_llvm_ir_with_driver(&main_fn("return arg*2"), "main").expect("llvm emission");
    assert!(text.contains("declare i64 @atol(ptr)\n"), "got:\n{}", text);
    assert!(text.contains("define i32 @main(i32 %argc, ptr %argv) {\n"), "got:\n{}", text);
    assert!(text.contains("  %enough = icmp eq i32 %argc, 2\n"), "got:\n{}", text);
    assert!(text.contains("  %a1 = call i64 @atol(ptr %a1.str)\n"), "got:\n{}", text);
    assert!(text.contains("  %result = call i64 @sn.main(i64 %a1)\n"), "got:\n{}", text);
    assert!(text.contains("define i64 @sn.main(i64 %p1) {"), "got:\n{}", text);
    assert!(!text.contains("define i64 @main("), "the export must not clash with the driver");

    let driver = text.find("define i32 @main").expect("driver");
    let export = text.find("define i64 @sn.main").expect("export");
    assert!(driver < export, "the driver comes first");
}

#[test]
fn test_llvm_driver_passes_every_parameter() {
    let u = unit("add:= (x:int y:int)->int { return x+y }");
    let text = emit_llvm_ir_with_driver(&u, "add").expect("llvm emission");
    assert!(text.contains("icmp eq i32 %argc, 3"), "got:\n{}", text);
    assert!(text.contains("%result = call i64 @sn.add(i64 %a1, i64 %a2)"), "got:\n{}", text);
}

#[test]
fn test_llvm_driver_needs_an_existing_entry() {
    let err = emit_llvm_ir_with_driver(&main_fn("return arg"), "nope").unwrap_err();
    assert!(matches!(err, CodegenError::Unsupported { .. }), "got {:?}", err);
}

// ---------------------------------------------------------------------------
// 3. JSON
// ---------------------------------------------------------------------------

#[test]
fn test_json_export_structure() {
    let u = main_fn("return 2+arg+3");
    let text = emit_json(&u).expect("json");
    assert!(text.ends_with('\n'));
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid json");

    let func = &json["functions"][0];
    assert_eq!(func["name"], "main");
    assert_eq!(func["arity"], 1);
    assert_eq!(func["start"], 1);
    assert_eq!(func["stop"], 2);
    assert_eq!(func["returns"], serde_json::json!([10]));

    let ids: Vec<u64> = func["nodes"]
        .as_array()
        .expect("nodes array")
        .iter()
        .map(|n| n["id"].as_u64().expect("id"))
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 8, 9, 10]);

    let term = &func["nodes"][3];
    assert_eq!(term["kind"], "Term");
    assert_eq!(term["value"], serde_json::json!({ "type": "int", "value": 5 }));
    let add = &func["nodes"][4];
    assert_eq!(add["kind"], "Add");
    assert_eq!(add["inputs"], serde_json::json!([3, 8]));
    assert!(add.get("value").is_none());
    assert_eq!(func["nodes"][2]["tag"], 1);
}

#[test]
fn test_json_region_anchor_is_null() {
    let u = main_fn("if arg<0 arg=-arg return arg");
    let export = export_unit(&u);
    let region = export.functions[0]
        .nodes
        .iter()
        .find(|n| n.kind == NodeKind::Region)
        .expect("region is live");
    assert_eq!(region.inputs.len(), 3);
    assert!(region.inputs[0].is_none());
    assert!(region.inputs[1].is_some() && region.inputs[2].is_some());
}

// ---------------------------------------------------------------------------
// 4. compile()
// ---------------------------------------------------------------------------

#[test]
fn test_compile_each_emit_kind() {
    let src = "main:= (arg:int)->int { return arg*2 }";
    let mut options = CompileOptions::default();
    assert!(compile(src, &options).expect("graph").starts_with("// seanode graph"));

    options.emit = EmitKind::Llvm;
    assert!(compile(src, &options).expect("llvm").contains("mul i64 %p1, 2"));

    options.emit = EmitKind::Json;
    assert!(compile(src, &options).expect("json").trim_start().starts_with('{'));

    options.emit = EmitKind::Eval;
    options.args = vec![21];
    assert_eq!(compile(src, &options).expect("eval"), "42\n");
}

#[test]
fn test_compile_llvm_with_driver() {
    let options = CompileOptions {
        emit: EmitKind::Llvm,
        llvm_driver: true,
        ..CompileOptions::default()
    };
    let text = compile("main:= (arg:int)->int { return arg+1 }", &options).expect("llvm");
    assert!(text.contains("define i32 @main(i32 %argc, ptr %argv)"), "got:\n{}", text);
    assert!(text.contains("define i64 @sn.main(i64 %p1)"), "got:\n{}", text);
}

#[test]
fn test_compile_eval_with_named_entry() {
    let src = "add:= (x:int, y:int)->int { return x+y }";
    let options = CompileOptions {
        emit: EmitKind::Eval,
        entry: "add".to_owned(),
        args: vec![40, 2],
        ..CompileOptions::default()
    };
    assert_eq!(compile(src, &options).expect("eval"), "42\n");
}
