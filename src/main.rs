//! Calcbook - run dependent, cached calculations from a book file

mod args;
mod default_functions;
mod error;

use anyhow::{Context, Result};
use calcbook_core::store::{parse_function_items, read_functions_file};
use calcbook_core::{Book, Calculator, ExecuteOptions, MemoryStore};
use serde_json::Value;
use std::env;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use args::{Args, parse_args, print_usage};
use default_functions::prepend_default_functions_if_present;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_functions(store: &MemoryStore, path: &Path) -> Result<usize> {
    let source = read_functions_file(path)
        .with_context(|| format!("reading functions file {}", path.display()))?;
    let defs = parse_function_items(&source)
        .with_context(|| format!("loading functions from {}", path.display()))?;
    let count = defs.len();
    for def in defs {
        store.insert_function(def);
    }
    Ok(count)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn run(mut args: Args) -> Result<()> {
    let Some(book_path) = args.book.take() else {
        print_usage();
        return Ok(());
    };
    let book = Book::load(&book_path)
        .with_context(|| format!("loading book {}", book_path.display()))?;

    let store = book.to_store()?;
    prepend_default_functions_if_present(&mut args.functions_files, args.no_default_functions);
    for path in &args.functions_files {
        let count = load_functions(&store, path)?;
        tracing::debug!("Loaded {} functions from {}", count, path.display());
    }

    if args.list || args.calculation.is_none() {
        for calc in &book.calculations {
            println!("{}\t{}\t{}", calc.id, calc.calc_type, calc.display_name());
        }
        return Ok(());
    }

    let calculator = Calculator::with_memory_store(store, book.engine.clone());
    calculator.init().await?;

    let Some(id) = args.calculation.as_deref() else {
        return Ok(());
    };

    if args.dependents {
        for dependent in calculator.dependents(id).await? {
            println!("{}", dependent);
        }
        return Ok(());
    }

    let mut options: ExecuteOptions = calculator.default_options();
    if args.no_cache {
        options = options.without_cache();
    }

    let calc = book
        .calculations
        .iter()
        .find(|c| c.id == id)
        .with_context(|| format!("Calculation not found: {}", id))?;

    if args.detailed {
        let details = calculator
            .execute_detailed(calc, args.params, options)
            .await?;
        println!("{}", serde_json::to_string_pretty(&details)?);
    } else {
        let result = calculator.execute(calc, args.params, options).await?;
        match &calc.result_unit {
            Some(unit) => println!("{} {}", render(&result), unit),
            None => println!("{}", render(&result)),
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli_args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&cli_args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    if args.help {
        print_usage();
        return ExitCode::SUCCESS;
    }

    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
