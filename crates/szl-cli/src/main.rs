use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use szl::{Interp, ReplProgress, ReplSession, Status};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => repl(),
        2 if args[1] == "-c" => usage(),
        _ if args[1] == "-c" => {
            let mut interp = Interp::new();
            let status = interp.run(&args[2]);
            finish(&mut interp, status)
        }
        _ => {
            let script_args: Vec<&str> = args[1..].iter().map(String::as_str).collect();
            let mut interp = Interp::with_limits(szl::Limits::default(), &script_args);
            let status = interp.source(Path::new(&args[1]));
            finish(&mut interp, status)
        }
    }
}

fn usage() -> ExitCode {
    eprintln!("usage: szl [SCRIPT.szl ?arg?... | -c TEXT]");
    ExitCode::FAILURE
}

/// Prints the final value the way the shell always has: stderr on error,
/// stdout otherwise, nothing after `exit`.
fn finish(interp: &mut Interp, status: Status) -> ExitCode {
    if status == Status::Exit {
        let code = interp
            .last_string()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(0);
        return ExitCode::from((code & 0xff) as u8);
    }
    let output = interp.last_string().unwrap_or_default();
    if !output.is_empty() {
        if status == Status::Error {
            eprintln!("{output}");
        } else {
            println!("{output}");
        }
    }
    if status == Status::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn repl() -> ExitCode {
    let mut session = ReplSession::new();
    let stdin = io::stdin();
    loop {
        let prompt = if session.is_continuing() { "....> " } else { "szl> " };
        print!("{prompt}");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return ExitCode::SUCCESS,
            Ok(_) => {}
        }
        match session.feed(line.trim_end_matches('\n')) {
            ReplProgress::NeedMore => {}
            ReplProgress::Done { status, output } => match status {
                Status::Exit => {
                    let code = output.trim().parse::<i64>().unwrap_or(0);
                    return ExitCode::from((code & 0xff) as u8);
                }
                Status::Error => eprintln!("error: {output}"),
                _ => {
                    if !output.is_empty() {
                        println!("{output}");
                    }
                }
            },
        }
    }
}
