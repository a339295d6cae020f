use std::{fmt, path::Path};

use tracing::{debug, debug_span, error, info};

use crate::{
    changes::ChangeSet,
    dispatcher::InstructionDispatcher,
    error::{Result, SimError},
    registers::RegisterFile,
    verify::{ExpectedState, FinalReport, FinalState, Mismatch},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatorOptions {
    /// Log the full register dump after every executed line.
    pub dump_each: bool,
}

#[derive(Debug)]
pub enum Issue {
    /// The instruction did not execute.
    Failed(SimError),
    /// The annotation could not be read, so the line was not verified.
    Malformed(SimError),
    Mismatch(Mismatch),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::Failed(err) => write!(f, "{err}"),
            Issue::Malformed(err) => write!(f, "{err}"),
            Issue::Mismatch(mismatch) => write!(f, "MISMATCH: {mismatch}"),
        }
    }
}

/// Something that went wrong on one line of the trace.
#[derive(Debug)]
pub struct Diagnostic {
    pub line_number: usize,
    pub text: String,
    pub issue: Issue,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} `{}`: {}", self.line_number, self.text, self.issue)
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub executed: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub final_report: Option<FinalReport>,
    /// Unreadable lines inside the final block.
    pub final_errors: Vec<SimError>,
}

impl RunReport {
    pub fn failed_lines(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.issue, Issue::Failed(_)))
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.issue, Issue::Mismatch(_)))
    }

    pub fn final_matches(&self) -> bool {
        self.final_report.as_ref().is_none_or(FinalReport::is_match)
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.final_errors.is_empty() && self.final_matches()
    }
}

/// Runs a trace against one [`RegisterFile`].
pub struct Simulator {
    regs: RegisterFile,
    dispatcher: InstructionDispatcher,
    options: SimulatorOptions,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorOptions::default())
    }
}

impl Simulator {
    pub fn new(options: SimulatorOptions) -> Simulator {
        Simulator {
            regs: RegisterFile::new(),
            dispatcher: InstructionDispatcher::new(),
            options,
        }
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    pub fn reset(&mut self) {
        self.regs.reset();
    }

    pub fn dump(&self) -> String {
        self.regs.dump()
    }

    /// Executes one instruction with no annotation, leaving its changes to be
    /// collected with [`Simulator::take_changes`].
    pub fn execute(&mut self, line: &str) -> Result<String> {
        self.regs.capture_flags();
        let result = self.dispatcher.execute(&mut self.regs, line);
        self.regs.check_flag_changes();
        result
    }

    pub fn take_changes(&mut self) -> ChangeSet {
        self.regs.take_changes()
    }

    pub fn run_file(&mut self, path: &Path) -> Result<RunReport> {
        let text = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("--- Simulation Started : {} ---", path.display());
        Ok(self.run_lines(text.lines()))
    }

    pub fn run_lines<I, S>(&mut self, lines: I) -> RunReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = RunReport::default();
        let mut final_block: Vec<String> = Vec::new();

        for (index, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            let number = index + 1;

            if !final_block.is_empty() || line.starts_with("Final") {
                if final_block.is_empty() {
                    debug!("found final state block at line {}", number);
                }
                final_block.push(line.to_string());
                continue;
            }
            if is_skipped(line) {
                continue;
            }

            let _span = debug_span!("line", number).entered();
            self.step(number, line, &mut report);
        }

        info!("--- Simulation Ended ---");
        info!("{}", self.regs.dump());

        if !final_block.is_empty() {
            self.check_final_block(&final_block, &mut report);
        }
        report
    }

    fn step(&mut self, number: usize, line: &str, report: &mut RunReport) {
        let (command, annotation) = match line.split_once(';') {
            Some((command, annotation)) => (command.trim_end(), Some(annotation)),
            None => (line.trim_end(), None),
        };
        let mut diagnose = |issue: Issue| {
            report.diagnostics.push(Diagnostic {
                line_number: number,
                text: line.to_string(),
                issue,
            })
        };

        let expected = match annotation.map(ExpectedState::parse).transpose() {
            Ok(expected) => expected,
            Err(err) => {
                error!("bad annotation on line {} `{}`: {}", number, line, err);
                diagnose(Issue::Malformed(err));
                None
            }
        };

        debug!("running command: {}", command);
        let result = self.execute(command);
        let changes = self.take_changes();
        match result {
            Ok(outcome) => {
                report.executed += 1;
                debug!("{}", outcome);
            }
            Err(err) => {
                error!("error processing line {} `{}`: {}", number, line, err);
                diagnose(Issue::Failed(err));
                return;
            }
        }

        if changes.is_empty() {
            info!("{}", command);
        } else {
            info!("{} ; {}", command, changes);
        }
        if self.options.dump_each {
            info!("{}", self.regs.dump());
        }

        let Some(expected) = expected else {
            return;
        };
        let mismatches = expected.compare(&self.regs);
        if mismatches.is_empty() {
            if !expected.is_empty() {
                debug!("all expected changes match");
            }
            return;
        }
        for mismatch in mismatches {
            error!("MISMATCH on line {} `{}`: {}", number, line, mismatch);
            diagnose(Issue::Mismatch(mismatch));
        }
    }

    fn check_final_block(&self, lines: &[String], report: &mut RunReport) {
        info!("Final state comparison:");
        for line in lines {
            info!("{}", line);
        }

        let state = FinalState::parse(lines.iter().map(String::as_str));
        let final_report = state.compare(&self.regs);
        info!("Actual final state:\n{}", final_report);
        for mismatch in final_report.mismatches() {
            error!("MISMATCH in final state: {}", mismatch);
        }
        for err in &state.malformed {
            error!("{}", err);
        }

        report.final_errors = state.malformed;
        report.final_report = Some(final_report);
    }
}

/// Blank lines, `---` headers, and indented lines never reach the dispatcher.
fn is_skipped(line: &str) -> bool {
    match line.chars().next() {
        None => true,
        Some(first) => first == '-' || first.is_whitespace(),
    }
}
