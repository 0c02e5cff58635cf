use log::debug;
use std::io::Write;

use crate::{
    config::Settings,
    environment::Environment,
    error::{Error, Result},
    parser::parse,
    runtime::{Evaluator, Outcome},
    tokenizer::tokenize_at,
};

/// One interpreter session: a variable environment that outlives each statement,
/// plus the sink that receives printed results and diagnostics.
pub struct Session<W: Write> {
    env: Environment,
    settings: Settings,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(settings: Settings, out: W) -> Self {
        Session {
            env: Environment::new(),
            settings,
            out,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Tokenizes, parses and evaluates a single statement, printing its result.
    ///
    /// Errors abort only this statement. Whatever the statement assigned before
    /// failing stays in the environment.
    pub fn run_statement(&mut self, line: &str) -> Result<Outcome> {
        self.run_line(line, 1)
    }

    /// Same as `run_statement`, with errors reporting `line_number` as the line.
    fn run_line(&mut self, line: &str, line_number: usize) -> Result<Outcome> {
        let tokens = tokenize_at(line.as_bytes(), line_number)?;
        debug!("tokens: {}", tokens.len());

        let statement = parse(&tokens)?;
        debug!("statement: {:?}", statement);

        let outcome =
            Evaluator::new(&mut self.env, &self.settings, &mut self.out).execute(&statement)?;
        debug!("outcome: {:?}", outcome);

        if let Some(text) = outcome.display() {
            writeln!(self.out, "{}", text)?;
        }

        Ok(outcome)
    }

    /// Runs every line of `source` as its own statement. Failing lines are
    /// reported to the output and skipped; returns how many failed.
    pub fn run_source(&mut self, source: &str) -> Result<usize> {
        let mut failures = 0;

        for (index, line) in source.lines().enumerate() {
            match self.run_line(line, index + 1) {
                Ok(_) => {}
                Err(err) if err.is_statement_error() => {
                    writeln!(self.out, "error on line {}: {}", index + 1, err)?;
                    failures += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(failures)
    }
}

/// Tokenizes and parses every line without evaluating anything.
pub fn check_source(source: &str) -> Vec<(usize, Error)> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            tokenize_at(line.as_bytes(), index + 1)
                .and_then(|tokens| parse(&tokens))
                .err()
                .map(|err| (index + 1, err))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Value;

    fn session() -> Session<Vec<u8>> {
        Session::new(Settings::default(), Vec::new())
    }

    fn printed<W: Write + AsRef<[u8]>>(session: &Session<W>) -> String {
        String::from_utf8_lossy(session.output().as_ref()).into_owned()
    }

    #[test]
    fn test_prints_only_values() -> Result<()> {
        let mut s = session();

        s.run_statement("x = 5")?;
        s.run_statement("x")?;
        s.run_statement("x < 10")?;
        s.run_statement("")?;
        s.run_statement("greeting = \"hi\"")?;
        s.run_statement("greeting")?;
        s.run_statement("x / 2")?;

        assert_eq!(printed(&s), "5\n\"hi\"\n5/2\n");
        Ok(())
    }

    #[test]
    fn test_read_only_statement_is_repeatable() -> Result<()> {
        let mut s = session();

        s.run_statement("x = 3 * 3")?;
        let first = s.run_statement("x")?;
        let second = s.run_statement("x")?;

        assert_eq!(first, second);
        assert_eq!(printed(&s), "9\n9\n");
        Ok(())
    }

    #[test]
    fn test_errors_leave_environment_unchanged() -> Result<()> {
        let mut s = session();

        s.run_statement("x = 1")?;
        assert!(matches!(s.run_statement("x = 2 @"), Err(Error::Tokenizer { .. })));
        assert!(matches!(s.run_statement("x = 2 +"), Err(Error::Parser { .. })));
        assert!(matches!(s.run_statement("x = 2 / 0"), Err(Error::Arithmetic { .. })));

        assert_eq!(s.environment().get("x"), Some(&Value::Integer(1)));
        assert_eq!(s.environment().len(), 1);
        Ok(())
    }

    #[test]
    fn test_run_source_continues_after_errors() -> Result<()> {
        let mut s = session();

        let failures = s.run_source("x = 4\nx / 0\ny = x +\n\nx * 2\n")?;

        assert_eq!(failures, 2);
        let output = printed(&s);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("error on line 2: arithmetic error"));
        assert!(lines[1].starts_with("error on line 3: parser error"));
        assert_eq!(lines[2], "8");
        Ok(())
    }

    #[test]
    fn test_sessions_are_independent() -> Result<()> {
        let mut first = session();
        let mut second = session();

        first.run_statement("x = 1")?;
        second.run_statement("x")?;

        assert_eq!(printed(&second), "Undefined variable 'x' found!\n0\n");
        assert!(second.environment().is_empty());
        Ok(())
    }

    #[test]
    fn test_check_source() {
        let errors = check_source("x = 1\nif x then\nwhile x do x endwhile\nz = $\n");
        let lines: Vec<usize> = errors.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![2, 4]);
        assert!(matches!(errors[1].1, Error::Tokenizer { .. }));
    }

    #[test]
    fn test_errors_carry_source_line() -> Result<()> {
        let mut s = session();

        let failures = s.run_source("a = 1\nb = 2\nc = 3\nd = 4\nx = 1 +\ny = $\n")?;

        assert_eq!(failures, 2);
        let output = printed(&s);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("error on line 5: parser error"));
        assert!(lines[0].ends_with("(line 5)"));
        assert!(lines[1].starts_with("error on line 6: tokenizer error"));
        assert!(lines[1].ends_with("(line 6)"));

        for (line, err) in check_source("a = 1\n\nif a then\nb = (1\n") {
            match err {
                Error::Parser { line: reported, .. } => assert_eq!(reported, line),
                other => panic!("Expected parser error, got {:?}", other),
            }
        }
        Ok(())
    }
}
