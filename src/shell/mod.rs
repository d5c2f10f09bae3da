use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use log::debug;

use crate::{
    core::{
        commands::{CommandExecutor, Flow},
        config::{Config, ConfigPaths},
        state::ShellState,
    },
    error::ShellError,
    flags::Flags,
    highlight::DiagnosticStyle,
    input::{EditorSource, LineSource, Parser, PidExpander, PlainSource},
    process::{JobTable, ProcessLauncher, SignalMediator},
};

pub struct Shell {
    source: Box<dyn LineSource>,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    style: DiagnosticStyle,
    prompt: String,
    parser: Parser,
    executor: CommandExecutor,
    state: ShellState,
    jobs: JobTable,
}

impl Shell {
    /// Interactive shell on the process's standard streams, with the
    /// SIGINT/SIGTSTP handlers installed.
    pub fn new(flags: Flags) -> Result<Self, ShellError> {
        let expander = PidExpander::new();

        let paths = match flags.get_value("config") {
            Some(path) => ConfigPaths::explicit(PathBuf::from(path)),
            None => ConfigPaths::new()?,
        };
        let mut config = Config::new(paths);
        let warnings = config.load(expander.clone())?;
        config.apply_exports();

        let style = DiagnosticStyle::new();
        if !flags.is_set("quiet") {
            for warning in &warnings {
                eprintln!(
                    "{}",
                    style.highlight_warning(&format!(
                        "smallsh: {}: {}",
                        config.paths().rc_path.display(),
                        warning
                    ))
                );
            }
        }

        let source: Box<dyn LineSource> = if !flags.is_set("plain") && io::stdin().is_terminal() {
            Box::new(EditorSource::new()?)
        } else {
            Box::new(PlainSource::new(io::stdin().lock(), io::stdout()))
        };

        let mut shell = Self::with_io(source, Box::new(io::stdout()), Box::new(io::stderr()), &config);
        shell.parser = Parser::new(expander);
        shell.style = style;

        SignalMediator::new(shell.state.foreground_only_flag()).install()?;
        debug!("signal handlers installed");

        Ok(shell)
    }

    /// Shell over arbitrary streams. Signal handlers are left untouched.
    pub fn with_io(
        source: Box<dyn LineSource>,
        out: Box<dyn Write>,
        err: Box<dyn Write>,
        config: &Config,
    ) -> Self {
        Shell {
            source,
            out,
            err,
            style: DiagnosticStyle::plain(),
            prompt: config.prompt().to_string(),
            parser: Parser::default(),
            executor: CommandExecutor::new(ProcessLauncher::new(config.background_null_io())),
            state: ShellState::new(),
            jobs: JobTable::new(),
        }
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Reads and runs lines until `exit` or end of input.
    pub fn run(&mut self) -> Result<(), ShellError> {
        while let Some(line) = self.source.read_line(&self.prompt)? {
            if self.process_line(&line)? == Flow::Exit {
                debug!("exit requested");
                return Ok(());
            }
        }
        debug!("end of input");
        Ok(())
    }

    /// Runs one command line, then reaps finished background jobs.
    pub fn process_line(&mut self, line: &str) -> Result<Flow, ShellError> {
        match self.parser.parse(line) {
            Ok(Some(command)) => {
                debug!("dispatching {:?}", command);
                match self
                    .executor
                    .execute(&command, &mut self.state, &mut self.jobs, &mut self.out)
                {
                    Ok(Flow::Exit) => return Ok(Flow::Exit),
                    Ok(Flow::Continue) => {}
                    Err(e) => self.report(&ShellError::from(e))?,
                }
            }
            Ok(None) => {}
            Err(e) => self.report(&ShellError::from(e))?,
        }

        self.reap_jobs()?;
        Ok(Flow::Continue)
    }

    fn reap_jobs(&mut self) -> Result<(), ShellError> {
        for job in self.jobs.reap() {
            writeln!(self.out, "{}", job)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn report(&mut self, error: &ShellError) -> Result<(), ShellError> {
        writeln!(
            self.err,
            "{}",
            self.style.highlight_error(&format!("smallsh: {}", error))
        )?;
        self.err.flush()?;
        Ok(())
    }
}
