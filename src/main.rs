use clap::Parser;
use dirs::home_dir;
use log::{debug, info};
use minibasic::{
    cli::{Args, Commands},
    config::Settings,
    error::Result,
    extensions::ResultExtensions,
    repl::{banner, REPLPrompt, REPLValidator, SyntaxHighlighter},
    session::{check_source, Session},
};
use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Reedline, Signal};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

fn run_file<W: Write>(file: &Path, settings: &Settings, out: &mut W) -> Result<usize> {
    let source = fs::read_to_string(file)?;

    let mut session = Session::new(settings.clone(), &mut *out);
    let failures = session.run_source(&source)?;
    out.flush()?;

    debug!("{} failing lines in {:?}", failures, file);
    Ok(failures)
}

fn check_file(file: &Path) -> Result<usize> {
    let source = fs::read_to_string(file)?;

    let errors = check_source(&source);
    for (line, err) in &errors {
        eprintln!("{}:{}: {}", file.display(), line, err);
    }

    Ok(errors.len())
}

fn test_dir<W: Write>(dir: &Path, settings: &Settings, out: &mut W) -> Result<usize> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        writeln!(out, "No input files found in {}", dir.display())?;
        return Ok(0);
    }

    let mut failures = 0;
    for file in files {
        writeln!(out, "Running on: {}", file.display())?;
        failures += run_file(&file, settings, out).report().unwrap_or(1);
    }

    Ok(failures)
}

fn run_repl(settings: &Settings) -> Result<()> {
    let mut line_editor = Reedline::create()
        .with_hinter(Box::new(
            DefaultHinter::default().with_style(Style::new().italic().fg(Color::LightGray)),
        ))
        .with_highlighter(Box::new(SyntaxHighlighter))
        .with_validator(Box::new(REPLValidator));

    // Add file-backed history if possible
    if let Some(history) = home_dir()
        .map(|home| home.join(".minibasic_history"))
        .and_then(|path| FileBackedHistory::with_file(100, path).ok())
        .map(Box::new)
    {
        line_editor = line_editor.with_history(history);
    } else {
        eprintln!("NOTE: Failed to load history. Persistence is now disabled.")
    }

    println!("{}", banner());

    let prompt = REPLPrompt;
    let mut session = Session::new(settings.clone(), io::stdout());

    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => {
                session.run_statement(&buffer).report();
            }
            Signal::CtrlD | Signal::CtrlC => {
                break Ok(());
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let settings = Settings::from(&args.eval);
    debug!("settings: {:?}", settings);

    let failures = match args.command {
        Commands::Run { file } => {
            info!("FILE MODE");
            debug!("file: {:?}", file);

            run_file(&file, &settings, &mut io::stdout().lock())
                .report()
                .unwrap_or(1)
        }
        Commands::Check { file } => {
            info!("CHECK MODE");
            debug!("file: {:?}", file);

            check_file(&file).report().unwrap_or(1)
        }
        Commands::Test { dir } => {
            info!("TEST MODE");
            debug!("dir: {:?}", dir);

            test_dir(&dir, &settings, &mut io::stdout().lock())
                .report()
                .unwrap_or(1)
        }
        Commands::Repl => {
            info!("REPL MODE");

            run_repl(&settings).report().map_or(1, |_| 0)
        }
    };

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
