use std::io::Read;
use std::process;

use clap::Parser;
use seanode::cli::CliArgs;
use seanode::diagnostics::render_error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 64 MB stack: parsing and data evaluation recurse on the host stack, and
/// deeply nested expressions overflow the default.
const STACK_SIZE: usize = 64 * 1024 * 1024;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seanode=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = CliArgs::parse();

    let builder = std::thread::Builder::new().stack_size(STACK_SIZE);
    let handler = match builder.spawn(move || run(cli)) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: failed to spawn compiler thread: {}", e);
            process::exit(1);
        }
    };
    match handler.join() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {:?}", e);
            process::exit(1);
        }
    }
}

fn run(cli: CliArgs) -> i32 {
    let source = match read_source(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprint!("{}", render_error("", &seanode::Error::from(e)));
            return 1;
        }
    };

    let output = match seanode::compile(&source, &cli.compile_options()) {
        Ok(output) => output,
        Err(e) => {
            eprint!("{}", render_error(&source, &e));
            return 1;
        }
    };

    if let Some(out_path) = &cli.output {
        if let Err(e) = std::fs::write(out_path, &output) {
            eprintln!("error: cannot write '{}': {}", out_path.display(), e);
            return 1;
        }
    } else {
        print!("{}", output);
    }
    0
}

fn read_source(cli: &CliArgs) -> std::io::Result<String> {
    match &cli.path {
        Some(path) if !cli.reads_stdin() => std::fs::read_to_string(path),
        _ => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}
