use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("tokenizer error: {message} (line {line})")]
    Tokenizer { message: String, line: usize },
    #[error("parser error: {message} (line {line})")]
    Parser { message: String, line: usize },
    #[error("arithmetic error: {message}")]
    Arithmetic { message: String },
    #[error("type error: {message}")]
    Type { message: String },
    #[error("runtime error: while loop exceeded {limit} iterations")]
    IterationLimit { limit: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn tokenizer_error<T>(message: &str, line: usize) -> Result<T> {
    Err(Error::Tokenizer {
        message: message.to_string(),
        line,
    })
}

pub fn parser_error<T>(message: &str, line: usize) -> Result<T> {
    Err(Error::Parser {
        message: message.to_string(),
        line,
    })
}

pub fn arithmetic_error<T>(message: &str) -> Result<T> {
    Err(Error::Arithmetic {
        message: message.to_string(),
    })
}

pub fn type_error<T>(message: &str) -> Result<T> {
    Err(Error::Type {
        message: message.to_string(),
    })
}

impl Error {
    /// Errors a REPL or file runner can report and move past.
    pub fn is_statement_error(&self) -> bool {
        !matches!(self, Error::IO(_))
    }
}
