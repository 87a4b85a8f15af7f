use std::fs;
use std::io::{self, Read};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};

use minipy::interpreter::Interpreter;
use minipy::{lexer, parser};

const USAGE: &str = "Usage: minipy [--dump tokens|ast] <file | ->";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dump {
    Tokens,
    Ast,
}

impl FromStr for Dump {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "tokens" => Ok(Self::Tokens),
            "ast" => Ok(Self::Ast),
            other => bail!("Unknown dump target '{other}', expected 'tokens' or 'ast'"),
        }
    }
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut dump = None;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump" | "-d" => {
                let target = args
                    .next()
                    .ok_or_else(|| anyhow!("Missing dump target after {arg}"))?;
                dump = Some(target.parse::<Dump>()?);
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported\n{USAGE}");
                }
                break;
            }
        }
    }

    let Some(path) = input_path else {
        bail!("{USAGE}");
    };

    let source = if path == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    } else {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    };

    let tokens = lexer::tokenize(&source).with_context(|| format!("Tokenizing {path}"))?;
    if dump == Some(Dump::Tokens) {
        for token in &tokens {
            println!("{token:?}");
        }
        return Ok(());
    }

    let program = match parser::parse_tokens_recovering(tokens) {
        Ok(program) => program,
        Err(errors) => {
            for error in &errors {
                eprintln!("{path}: {error}");
            }
            bail!("Parsing {path} failed with {} error(s)", errors.len());
        }
    };
    if dump == Some(Dump::Ast) {
        println!("{program:#?}");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut interpreter = Interpreter::new(stdout.lock());
    interpreter
        .interpret(&program)
        .with_context(|| format!("Running {path}"))?;
    Ok(())
}
