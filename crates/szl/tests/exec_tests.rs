//! End-to-end execution tests over the public interpreter API.

use pretty_assertions::assert_eq;
use szl::{Interp, Status};

/// Runs a script in a fresh interpreter and returns the status plus the
/// final `last` value's string form.
fn run(code: &str) -> (Status, String) {
    let mut interp = Interp::new();
    let status = interp.run(code);
    let last = interp.last_string().unwrap();
    (status, last)
}

// =============================================================================
// 1. Basic statements, variables, and `_`
// =============================================================================

/// `set` both binds in the caller's scope and reads back.
#[test]
fn set_binds_and_reads_back() {
    assert_eq!(run("set a 5\nset a"), (Status::Ok, "5".to_owned()));
}

/// Variables substitute with `$`, and `+` adds integers.
#[test]
fn dollar_substitution_and_addition() {
    assert_eq!(run("set a 1\nset b 2\n+ $a $b"), (Status::Ok, "3".to_owned()));
}

/// `$_` names the previous statement's return value.
#[test]
fn underscore_holds_previous_result() {
    assert_eq!(run("list.new 1 2 3\nlist.len $_"), (Status::Ok, "3".to_owned()));
}

/// `${name}` is the braced variable form.
#[test]
fn braced_variable_names_resolve() {
    assert_eq!(run("set a 7\necho ${a}"), (Status::Ok, "7".to_owned()));
}

/// An unknown variable is a `BadName` error naming the variable.
#[test]
fn unknown_variable_reports_its_name() {
    let (status, last) = run("echo $missing");
    assert_eq!(status, Status::Error);
    assert_eq!(last, "no such obj: missing");
}

/// `global` binds in the global frame so later procedures see it.
#[test]
fn global_binding_is_visible_in_procedures() {
    assert_eq!(
        run("global q 9\nproc g {} {echo $q}\ng"),
        (Status::Ok, "9".to_owned())
    );
}

// =============================================================================
// 2. Procedures
// =============================================================================

/// Defining and calling a procedure with a parameter and a quoted format
/// string.
#[test]
fn procedures_bind_parameters() {
    let code = "proc greet {n} {format \"hello, {}\" $n}\ngreet world";
    assert_eq!(run(code), (Status::Ok, "hello, world".to_owned()));
}

/// `return` stops the body early and carries a value.
#[test]
fn return_stops_the_body() {
    assert_eq!(
        run("proc f {} {return 7\necho 8}\nf"),
        (Status::Ok, "7".to_owned())
    );
}

/// Locals die with the procedure's activation.
#[test]
fn procedure_locals_do_not_leak_out() {
    let (status, last) = run("proc f {} {set x 1\nset x}\nf\nset x");
    assert_eq!(status, Status::Error);
    assert_eq!(last, "no such obj: x");
}

/// Calling a procedure with the wrong number of arguments is a usage error.
#[test]
fn procedure_arity_mismatch_is_usage_error() {
    let (status, last) = run("proc one {a} {echo $a}\none");
    assert_eq!(status, Status::Error);
    assert!(last.starts_with("bad usage"), "got: {last}");
}

// =============================================================================
// 3. Flow control
// =============================================================================

/// `break` leaves the loop with plain success and an empty result.
#[test]
fn while_loop_break() {
    assert_eq!(run("while {< 0 1} {break}"), (Status::Ok, String::new()));
}

/// A computed condition terminates the loop; `set` carries loop state
/// between iterations through the loop command's frame.
#[test]
fn while_loop_with_computed_condition_terminates() {
    let (status, _) = run("set i 0\nwhile {[< $i 3]} {set i [+ $i 1]}");
    assert_eq!(status, Status::Ok);
}

/// `if` with an evaluated condition takes the right branch.
#[test]
fn if_else_branches() {
    assert_eq!(
        run("if [< 2 1] {echo yes} else {echo no}"),
        (Status::Ok, "no".to_owned())
    );
    assert_eq!(
        run("if [< 1 2] {echo yes} else {echo no}"),
        (Status::Ok, "yes".to_owned())
    );
}

/// `map` collects body results; `for` does not.
#[test]
fn map_collects_results() {
    assert_eq!(
        run("map {i} {1 2 3} {+ $i 1}"),
        (Status::Ok, "2 3 4".to_owned())
    );
}

/// `continue` skips an iteration of `map`.
#[test]
fn continue_skips_an_iteration() {
    assert_eq!(
        run("map {i} {1 2 3} {if [== $i 2] {continue}\necho $i}"),
        (Status::Ok, "1 3".to_owned())
    );
}

/// `exit` stops the script immediately with the `Exit` status.
#[test]
fn exit_stops_the_script() {
    let (status, last) = run("exit 3\necho never");
    assert_eq!(status, Status::Exit);
    assert_eq!(last, "3");
}

/// `range` produces a half-open integer interval.
#[test]
fn range_builds_integer_lists() {
    assert_eq!(run("range 2 5"), (Status::Ok, "2 3 4".to_owned()));
}

// =============================================================================
// 4. Errors and try/except
// =============================================================================

/// A head that resolves to nothing callable is "not a proc".
#[test]
fn unresolvable_head_is_not_a_proc() {
    let (status, last) = run("nosuch 1 2");
    assert_eq!(status, Status::Error);
    assert_eq!(last, "not a proc: nosuch");
}

/// Arity violations format the registered help text.
#[test]
fn arity_violation_formats_help() {
    let (status, last) = run("echo");
    assert_eq!(status, Status::Error);
    assert_eq!(last, "bad usage, should be 'echo obj'");
}

/// `try`/`except` traps an error and binds the diagnostic under `ex`.
#[test]
fn try_except_traps_errors() {
    assert_eq!(
        run("try {throw boom} except {echo $ex}"),
        (Status::Ok, "boom".to_owned())
    );
}

/// An untrapped `throw` aborts the script with its message.
#[test]
fn untrapped_throw_aborts() {
    assert_eq!(run("throw boom\necho after"), (Status::Error, "boom".to_owned()));
}

/// `finally` always runs and its result wins.
#[test]
fn finally_always_runs() {
    assert_eq!(
        run("try {throw x} except {echo y} finally {echo z}"),
        (Status::Ok, "z".to_owned())
    );
}

/// Division by zero is reported, not propagated as a float.
#[test]
fn division_by_zero_is_an_error() {
    assert_eq!(run("/ 1 0"), (Status::Error, "division by 0".to_owned()));
}

/// The failing statement's diagnostic is visible as `_` inside the frame
/// that trapped it.
#[test]
fn diagnostic_lands_in_underscore() {
    assert_eq!(
        run("try {/ 1 0} except {set _}"),
        (Status::Ok, "division by 0".to_owned())
    );
}

// =============================================================================
// 5. Parser boundaries
// =============================================================================

/// An empty script runs zero statements and leaves an empty result.
#[test]
fn empty_script_is_ok() {
    assert_eq!(run(""), (Status::Ok, String::new()));
}

/// Whitespace and comments alone also run zero statements.
#[test]
fn comments_and_whitespace_are_ok() {
    assert_eq!(run("  \n# hello\n   \n"), (Status::Ok, String::new()));
}

/// Each unbalanced delimiter fails with the matching message.
#[test]
fn unbalanced_delimiters_fail() {
    for input in ["{", "}"] {
        let (status, last) = run(input);
        assert_eq!(status, Status::Error);
        assert!(last.starts_with("unbalanced {}"), "got: {last}");
    }
    for input in ["[", "]"] {
        let (status, last) = run(input);
        assert_eq!(status, Status::Error);
        assert!(last.starts_with("unbalanced []"), "got: {last}");
    }
}

/// Statements may span lines inside braces.
#[test]
fn braced_bodies_span_lines() {
    let code = "proc f {} {\n  set x 1\n  + $x 1\n}\nf";
    assert_eq!(run(code), (Status::Ok, "2".to_owned()));
}

/// Recursion depth is bounded.
#[test]
fn recursion_hits_the_nesting_limit() {
    let (status, last) = run("proc r {} {r}\nr");
    assert_eq!(status, Status::Error);
    assert_eq!(last, "reached nesting limit");
}

// =============================================================================
// 6. Values, numbers, and round trips
// =============================================================================

/// Integer arithmetic stays integral; mixed operands go float; float
/// formatting strips trailing zeros.
#[test]
fn numeric_tower() {
    assert_eq!(run("+ 1 2").1, "3");
    assert_eq!(run("+ 1.5 2").1, "3.5");
    assert_eq!(run("/ 4 2").1, "2");
    assert_eq!(run("* 2.5 2").1, "5");
    assert_eq!(run("% 7 3").1, "1");
}

/// Comparison commands answer in `0`/`1`.
#[test]
fn comparisons_and_booleans() {
    assert_eq!(run("< 1 2").1, "1");
    assert_eq!(run(">= 1 2").1, "0");
    assert_eq!(run("== a a").1, "1");
    assert_eq!(run("!= a b").1, "1");
    assert_eq!(run("&& 1 0").1, "0");
    assert_eq!(run("|| 1 0").1, "1");
    assert_eq!(run("not 0").1, "1");
}

/// A brace group passes its content verbatim, including inner whitespace.
#[test]
fn brace_groups_are_verbatim() {
    assert_eq!(run("echo {a  b}").1, "a  b");
}

/// String-to-list conversion splits on whitespace runs; joining wraps items
/// that need it.
#[test]
fn list_string_round_trip() {
    assert_eq!(run("list.len {a  b {c d}}").1, "3");
    assert_eq!(run("list.new a {b c}").1, "a {b c}");
}

/// List commands: index, range, reverse, membership, join.
#[test]
fn list_operations() {
    assert_eq!(run("list.index {a b c} 1").1, "b");
    assert_eq!(run("list.range {a b c d} 1 2").1, "b c");
    assert_eq!(run("list.reverse {a b c}").1, "c b a");
    assert_eq!(run("list.in {a b c} b").1, "1");
    assert_eq!(run("list.in {a b c} z").1, "0");
    assert_eq!(run("list.join {a b c} -").1, "a-b-c");
}

/// In-place list mutation via a variable.
#[test]
fn list_mutation_through_variable() {
    assert_eq!(
        run("set l [list.new a b]\nlist.append $l c\nlist.len $l").1,
        "3"
    );
    assert_eq!(run("set l [list.new a b]\nlist.set $l 0 z\necho $l").1, "z b");
}

/// Out-of-range list indexing is a `BadIndex` error.
#[test]
fn bad_list_index_is_reported() {
    let (status, last) = run("list.index {a b} 5");
    assert_eq!(status, Status::Error);
    assert_eq!(last, "bad index: 5");
}

/// String commands: length in characters, bytes, ranges, containment.
#[test]
fn string_operations() {
    assert_eq!(run("str.len héllo").1, "5");
    assert_eq!(run("byte.len héllo").1, "6");
    assert_eq!(run("str.range abcdef 1 3").1, "bcd");
    assert_eq!(run("str.in abcdef cde").1, "1");
    assert_eq!(run("str.split a-b-c -").1, "a b c");
    assert_eq!(run("str.join - a b c").1, "a-b-c");
    assert_eq!(run("ltrim {  x}").1, "x");
    assert_eq!(run("format {a {} c} b").1, "a b c");
}

/// `format` arity mismatches are reported.
#[test]
fn format_argument_mismatch() {
    let (status, last) = run("format {no holes} extra");
    assert_eq!(status, Status::Error);
    assert!(last.starts_with("extra args for fmt"), "got: {last}");
    let (status, last) = run("format {a {} {}} only");
    assert_eq!(status, Status::Error);
    assert!(last.starts_with("missing args for fmt"), "got: {last}");
}

/// `hex` prints lowercase hexadecimal.
#[test]
fn hex_formats_integers() {
    assert_eq!(run("hex 255").1, "ff");
}

// =============================================================================
// 7. Dictionaries
// =============================================================================

/// Building a dict in a substitution and reading a key back.
#[test]
fn dict_build_and_get() {
    assert_eq!(
        run("set d [dict.new k v]\ndict.get $d k"),
        (Status::Ok, "v".to_owned())
    );
}

/// A missing key errors without a fallback and yields the fallback with one.
#[test]
fn dict_missing_keys() {
    let (status, last) = run("dict.get [dict.new a 1] b");
    assert_eq!(status, Status::Error);
    assert_eq!(last, "bad key: b");
    assert_eq!(run("dict.get [dict.new a 1] b fallback").1, "fallback");
}

/// `dict.set` overwrites in place without growing the pair list.
#[test]
fn dict_overwrite() {
    let code = "set d [dict.new a 1 b 2]\ndict.set $d a 9\ndict.get $d a";
    assert_eq!(run(code).1, "9");
    let code = "set d [dict.new a 1 b 2]\ndict.set $d a 9\nlist.len $d";
    assert_eq!(run(code).1, "4");
}

/// Lookups survive many keys (exercising the sort-and-binary-search path).
#[test]
fn dict_scales_past_the_sort_threshold() {
    let mut code = String::from("set d [dict.new]\n");
    for i in 0..32 {
        code.push_str(&format!("dict.set $d k{i} v{i}\n"));
    }
    code.push_str("dict.get $d k17");
    assert_eq!(run(&code).1, "v17");
}

// =============================================================================
// 8. Misc surfaces
// =============================================================================

/// `eval` runs a value as a script, `call` as a single statement.
#[test]
fn eval_and_call() {
    assert_eq!(run("eval {+ 1 2}").1, "3");
    assert_eq!(run("call {+ 2 3}").1, "5");
}

/// `is` is object identity, not value equality.
#[test]
fn is_compares_identity() {
    assert_eq!(run("set a x\nis $a $a").1, "1");
    assert_eq!(run("set a x\nset b x\nis $a $b").1, "0");
}

/// Appending to a read-only constant fails.
#[test]
fn constants_are_read_only() {
    let mut interp = Interp::new();
    interp
        .register_extension(
            "vers",
            &[szl::ExtExport::ConstStr {
                name: "version",
                value: "3",
            }],
        )
        .unwrap();
    assert_eq!(interp.run("echo $version"), Status::Ok);
    assert_eq!(interp.last_string().unwrap(), "3");
    let status = interp.run("str.append $version x");
    assert_eq!(status, Status::Error);
    assert_eq!(interp.last_string().unwrap(), "append to ro str");
}

/// The built-in packages are recorded in the extension registry.
#[test]
fn builtin_extensions_are_registered() {
    let interp = Interp::new();
    let exts: Vec<&str> = interp.extensions().collect();
    for expected in ["obj", "proc", "exc", "loop", "logic", "math", "str", "list", "dict", "io"] {
        assert!(exts.contains(&expected), "missing extension {expected}");
    }
}

/// Script arguments surface as `$0`, `$1`, … and `$@`.
#[test]
fn script_arguments_are_bound() {
    let mut interp = Interp::with_limits(szl::Limits::default(), &["prog", "alpha"]);
    assert_eq!(interp.run("echo $1"), Status::Ok);
    assert_eq!(interp.last_string().unwrap(), "alpha");
    assert_eq!(interp.run("list.len $@"), Status::Ok);
    assert_eq!(interp.last_string().unwrap(), "2");
}

/// The tracer observes every statement, including substituted ones.
#[test]
fn tracer_sees_statements() {
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SharedTracer(Rc<RefCell<Vec<String>>>);

    impl szl::ExecTracer for SharedTracer {
        fn wants_statements(&self) -> bool {
            true
        }

        fn on_statement(&mut self, _depth: usize, statement: &str) {
            self.0.borrow_mut().push(statement.to_owned());
        }
    }

    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut interp = Interp::new();
    interp.set_tracer(Box::new(SharedTracer(Rc::clone(&seen))));
    interp.run("set a [+ 1 2]\nset a");
    assert_eq!(interp.last_string().unwrap(), "3");
    let seen = seen.borrow();
    assert_eq!(*seen, vec!["set a [+ 1 2]", "+ 1 2", "set a"]);
}

/// Transient values are reclaimed: running the same script twice leaves the
/// heap at the same size.
#[test]
fn transient_values_are_reclaimed() {
    let mut interp = Interp::new();
    interp.run("echo ok");
    let baseline = interp.heap_stats().live_objects;
    interp.run("echo [list.new 1 2 3]");
    interp.run("echo ok");
    assert_eq!(interp.heap_stats().live_objects, baseline);
}
