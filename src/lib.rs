pub mod ast;
pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod extensions;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod session;
pub mod tokenizer;
