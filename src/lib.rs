use std::io::Write;

use anyhow::{Context, Result};

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;

use interpreter::Interpreter;

/// Tokenizes, parses and runs `source`, writing program output to `out`.
pub fn run_source<W: Write>(source: &str, out: W) -> Result<()> {
    let tokens = lexer::tokenize(source).context("Tokenizing")?;
    let program = parser::parse_tokens(tokens).context("Parsing")?;
    Interpreter::new(out)
        .interpret(&program)
        .context("Running")?;
    Ok(())
}

/// Runs `source` and returns everything it printed.
pub fn run_to_string(source: &str) -> Result<String> {
    let mut output = Vec::new();
    run_source(source, &mut output)?;
    Ok(String::from_utf8(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn runs_whole_pipeline() {
        let output = run_to_string(indoc! {r#"
            # greet and add
            def add(a, b):
                return a + b
            print "sum", add(2, 3)
        "#})
        .expect("run failed");
        assert_eq!(output, "sum 5\n");
    }

    #[test]
    fn reports_stage_context() {
        let error = run_to_string("print \"open").expect_err("expected lex failure");
        assert_eq!(error.to_string(), "Tokenizing");
        assert!(format!("{error:#}").contains("Unterminated string literal"));

        let error = run_to_string("print (").expect_err("expected parse failure");
        assert_eq!(error.to_string(), "Parsing");

        let error = run_to_string("print 1 / 0").expect_err("expected runtime failure");
        assert_eq!(error.to_string(), "Running");
        assert!(format!("{error:#}").contains("Division by zero"));
    }

    #[test]
    fn malformed_lines_never_run() {
        for source in [
            "print 1 2\nx = 5 y = 6\nprint x, y",
            "if 0: print 1 print 2",
            "print 1,\nx = 3\nprint x",
        ] {
            let error = run_to_string(source).expect_err("expected parse failure");
            assert_eq!(error.to_string(), "Parsing", "{source:?}");
        }
    }
}
