use std::{env, fs, process::ExitCode};

use ozk::{NoLimitTracker, NoopTracer, Runner, StderrTracer};

const USAGE: &str = "usage: ozk run <testcase.json> [--trace] [--stats]";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut trace = false;
    let mut stats = false;
    let mut positional: Vec<&str> = Vec::new();
    for arg in &args {
        match arg.as_str() {
            "--trace" | "-t" => trace = true,
            "--stats" | "-s" => stats = true,
            other if other.starts_with('-') => {
                eprintln!("unknown flag: {other}\n{USAGE}");
                return ExitCode::FAILURE;
            }
            other => positional.push(other),
        }
    }
    let &[verb, path] = positional.as_slice() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };
    if verb != "run" {
        eprintln!("unknown command: {verb}\n{USAGE}");
        return ExitCode::FAILURE;
    }

    let code = match read_file(path) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let program = match serde_json::from_str::<ozk::ast::Stmt>(&code) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("error: {path} is not a valid test case: {err}");
            return ExitCode::FAILURE;
        }
    };
    let runner = match Runner::new(&program) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = if trace {
        runner.run(NoLimitTracker, &mut StderrTracer::new())
    } else {
        runner.run(NoLimitTracker, &mut NoopTracer)
    };
    match outcome {
        Ok(output) => {
            for (name, value) in output.final_bindings() {
                println!("{name} = {value}");
            }
            if stats {
                let counters = output.stats();
                eprintln!(
                    "dispatches={} reductions={} suspensions={} threads_spawned={} store_slots={}",
                    counters.dispatches,
                    counters.reductions,
                    counters.suspensions,
                    counters.threads_spawned,
                    output.store().len()
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(path: &str) -> Result<String, String> {
    match fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("cannot read {path}: {err}"));
        }
    }
    fs::read_to_string(path).map_err(|err| format!("cannot read {path}: {err}"))
}
