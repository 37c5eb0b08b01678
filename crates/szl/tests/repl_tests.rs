//! Behavioural tests for `ReplSession`.

use pretty_assertions::assert_eq;
use szl::{ReplProgress, ReplSession, Status};

fn done(progress: ReplProgress) -> (Status, String) {
    match progress {
        ReplProgress::Done { status, output } => (status, output),
        ReplProgress::NeedMore => panic!("expected a completed chunk"),
    }
}

/// A single balanced line runs immediately.
#[test]
fn single_line_runs() {
    let mut session = ReplSession::new();
    assert_eq!(done(session.feed("+ 1 2")), (Status::Ok, "3".to_owned()));
}

/// State persists across lines.
#[test]
fn state_persists_between_lines() {
    let mut session = ReplSession::new();
    session.feed("set a 5");
    assert_eq!(done(session.feed("set a")), (Status::Ok, "5".to_owned()));
}

/// Open braces buffer input until the definition closes.
#[test]
fn unbalanced_input_buffers() {
    let mut session = ReplSession::new();
    assert_eq!(session.feed("proc f {} {"), ReplProgress::NeedMore);
    assert!(session.is_continuing());
    assert_eq!(session.feed("  return 5"), ReplProgress::NeedMore);
    assert_eq!(done(session.feed("}")).0, Status::Ok);
    assert!(!session.is_continuing());
    assert_eq!(done(session.feed("f")), (Status::Ok, "5".to_owned()));
}

/// A stray closer runs immediately and surfaces the parse error instead of
/// wedging the session.
#[test]
fn stray_closer_reports_an_error() {
    let mut session = ReplSession::new();
    let (status, output) = done(session.feed("}"));
    assert_eq!(status, Status::Error);
    assert!(output.starts_with("unbalanced {}"), "got: {output}");
    // The session is usable afterwards.
    assert_eq!(done(session.feed("+ 1 1")), (Status::Ok, "2".to_owned()));
}

/// Errors report through the status without ending the session.
#[test]
fn errors_do_not_end_the_session() {
    let mut session = ReplSession::new();
    let (status, output) = done(session.feed("nosuch"));
    assert_eq!(status, Status::Error);
    assert_eq!(output, "not a proc: nosuch");
    assert_eq!(done(session.feed("echo ok")), (Status::Ok, "ok".to_owned()));
}

/// Host registration through the session's interpreter is visible to
/// scripts.
#[test]
fn host_extensions_reach_the_session() {
    use szl::{ExtExport, Flow, Interp, ObjId, SzlResult};

    fn cmd_answer(interp: &mut Interp, _argv: &[ObjId]) -> SzlResult {
        interp.set_last_int(42);
        Ok(Flow::Ok)
    }

    let mut session = ReplSession::new();
    session
        .interp()
        .register_extension(
            "answers",
            &[ExtExport::Proc {
                name: "answer",
                min_args: Some(1),
                max_args: Some(1),
                help: None,
                handler: cmd_answer,
            }],
        )
        .unwrap();
    assert_eq!(done(session.feed("answer")), (Status::Ok, "42".to_owned()));
}
