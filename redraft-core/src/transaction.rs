use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::backup::{self, BackupSet};
use crate::config::{Config, STDIN_INPUT};
use crate::confirm::Prompter;
use crate::diff;
use crate::fsio;
use crate::metadata::{self, Metadata, MetadataError};
use crate::service::{GenerateError, GenerateRequest, Generator};

/// How a run ended when it did not fail. `Skipped` and `Rejected` are
/// deliberate no-ops: no file was created, modified, or deleted.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    Skipped,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Backup,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Backup => write!(f, "backup"),
            Phase::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug)]
pub enum TransactionError {
    /// A `.bak` left by an earlier unclean run blocks this one.
    StaleBackup(PathBuf),
    Io {
        context: String,
        source: io::Error,
    },
    Metadata {
        path: PathBuf,
        source: MetadataError,
    },
    Generate(GenerateError),
    /// Metadata-only mode was requested but no output exists to describe.
    MissingPreviousOutput,
    /// A backup or write failed, and every file was returned to its pre-run
    /// state: backups restored, files created by this run deleted.
    RolledBack {
        phase: Phase,
        cause: String,
    },
    /// A backup or write failed AND the rollback sweep also failed for the
    /// listed paths; recovery is manual.
    RecoveryFailed {
        phase: Phase,
        cause: String,
        failures: Vec<RecoveryFailure>,
    },
}

/// One path the rollback sweep could not return to its pre-run state.
#[derive(Debug)]
pub enum RecoveryFailure {
    /// Copying `path.bak` back onto `path` failed; the backup still holds
    /// the last known-good content.
    Restore { path: PathBuf, source: io::Error },
    /// Deleting a file first created by this run failed; remove it by hand
    /// so the next run does not mistake it for a prior consistent state.
    Cleanup { path: PathBuf, source: io::Error },
}

impl fmt::Display for RecoveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryFailure::Restore { path, source } => write!(
                f,
                "{}: restore from {}.bak failed: {}",
                path.display(),
                path.display(),
                source
            ),
            RecoveryFailure::Cleanup { path, source } => write!(
                f,
                "{}: removing partially written file failed: {}",
                path.display(),
                source
            ),
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::StaleBackup(path) => {
                write!(
                    f,
                    "backup file for {} exists; an earlier run did not finish cleanly. \
                     Inspect and remove {}.bak to proceed",
                    path.display(),
                    path.display()
                )
            }
            TransactionError::Io { context, source } => write!(f, "{}: {}", context, source),
            TransactionError::Metadata { path, source } => {
                write!(f, "error reading metadata file {}: {}", path.display(), source)
            }
            TransactionError::Generate(e) => write!(f, "error generating output: {}", e),
            TransactionError::MissingPreviousOutput => {
                write!(f, "previous output doesn't exist")
            }
            TransactionError::RolledBack { phase, cause } => {
                write!(f, "{} error: {}; backups restored", phase, cause)
            }
            TransactionError::RecoveryFailed {
                phase,
                cause,
                failures,
            } => {
                write!(
                    f,
                    "{} error: {}; then rollback also failed, manual recovery required:",
                    phase, cause
                )?;
                for failure in failures {
                    write!(f, "\n  {}", failure)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for TransactionError {}

impl From<GenerateError> for TransactionError {
    fn from(e: GenerateError) -> Self {
        TransactionError::Generate(e)
    }
}

/// The skip/regenerate/commit state machine for one invocation. Borrows the
/// immutable run configuration; generation and confirmation come in as
/// injected ports.
pub struct Transaction<'a> {
    config: &'a Config,
}

impl<'a> Transaction<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        generator: &dyn Generator,
        prompter: &mut dyn Prompter,
    ) -> Result<Outcome, TransactionError> {
        let cfg = self.config;

        // Preflight: a stale backup means the last run died between backup
        // and commit. Refuse before any side effect.
        for path in [&cfg.output, &cfg.metadata] {
            let stale = backup::check_backup_exists(path).map_err(|e| TransactionError::Io {
                context: format!("error checking backup for {}", path.display()),
                source: e,
            })?;
            if stale {
                return Err(TransactionError::StaleBackup(path.clone()));
            }
        }

        let output_exists = fsio::check_exists(&cfg.output).map_err(|e| TransactionError::Io {
            context: "error checking output file".to_string(),
            source: e,
        })?;
        let meta_exists = fsio::check_exists(&cfg.metadata).map_err(|e| TransactionError::Io {
            context: "error checking metadata file".to_string(),
            source: e,
        })?;

        let current_input = assemble_input(&cfg.inputs)?;

        let previous_output_bytes = if output_exists {
            Some(
                std::fs::read(&cfg.output).map_err(|e| TransactionError::Io {
                    context: "error reading output file".to_string(),
                    source: e,
                })?,
            )
        } else {
            None
        };

        let previous_md = if meta_exists {
            let md =
                metadata::read(&cfg.metadata).map_err(|e| TransactionError::Metadata {
                    path: cfg.metadata.clone(),
                    source: e,
                })?;

            if let Some(output_bytes) = &previous_output_bytes {
                if metadata::checksum(output_bytes) != md.output_checksum {
                    eprintln!(
                        "Warning: output file's SHA-256 differs from metadata; \
                         {} was modified outside this tool.",
                        cfg.output.display()
                    );
                }
            }

            Some(md)
        } else {
            None
        };

        let previous_input = previous_md.as_ref().map(|md| md.previous_input_content.clone());
        let previous_output = previous_output_bytes
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned());

        if !cfg.force {
            if let Some(previous_input) = &previous_input {
                if *previous_input == current_input {
                    return Ok(Outcome::Skipped);
                }
            }
        }

        // Meta-only runs checksum the output file's actual bytes; the lossy
        // string conversion above exists only for diff and prompt display.
        let (current_output, output_checksum) = if cfg.meta_only {
            let bytes = previous_output_bytes
                .as_deref()
                .ok_or(TransactionError::MissingPreviousOutput)?;
            (None, metadata::checksum(bytes))
        } else {
            let generated = loop {
                let generated = generator.generate(&GenerateRequest {
                    current_input: current_input.clone(),
                    prompt: cfg.prompt.clone(),
                    previous_input: previous_input.clone(),
                    previous_output: previous_output.clone(),
                    output_path: cfg.output.clone(),
                })?;

                if let (Some(previous), false) = (&previous_output, cfg.auto_confirm) {
                    println!("{}", diff::render(previous, &generated));

                    let key = prompter
                        .ask("Continue? (Y/n/r) ", &['y', 'n', 'r'], 'y')
                        .map_err(|e| TransactionError::Io {
                            context: "error reading confirmation key".to_string(),
                            source: e,
                        })?;

                    match key {
                        'n' => return Ok(Outcome::Rejected),
                        'r' => continue,
                        _ => {}
                    }
                }

                break generated;
            };

            let checksum = metadata::checksum(generated.as_bytes());
            (Some(generated), checksum)
        };

        let new_md = Metadata {
            previous_input_content: current_input,
            previous_prompt: cfg.prompt.clone(),
            output_checksum,
        };

        // From here on the two files move as one logical transaction: the
        // ledger is what upgrades single-file writes to all-or-nothing.
        // Files this run creates from nothing have no backup; rolling them
        // back means deleting them, tracked separately from the ledger.
        let mut backups = BackupSet::new();
        let mut fresh: Vec<PathBuf> = Vec::new();

        if output_exists {
            if let Err(e) = backups.create_backup(&cfg.output) {
                return Err(fail_with_rollback(
                    &mut backups,
                    &fresh,
                    Phase::Backup,
                    format!("error backing up output file: {}", e),
                ));
            }
        }

        if meta_exists {
            if let Err(e) = backups.create_backup(&cfg.metadata) {
                return Err(fail_with_rollback(
                    &mut backups,
                    &fresh,
                    Phase::Backup,
                    format!("error backing up metadata file: {}", e),
                ));
            }
        } else {
            fresh.push(cfg.metadata.clone());
        }

        if let Err(e) = metadata::write(&cfg.metadata, &new_md) {
            return Err(fail_with_rollback(
                &mut backups,
                &fresh,
                Phase::Write,
                format!("error writing metadata file: {}", e),
            ));
        }

        if let Some(generated) = &current_output {
            if !output_exists {
                fresh.push(cfg.output.clone());
            }
            if let Err(e) = fsio::atomic_write(&cfg.output, generated.as_bytes()) {
                return Err(fail_with_rollback(
                    &mut backups,
                    &fresh,
                    Phase::Write,
                    format!("error writing output file: {}", e),
                ));
            }
        }

        for (path, err) in backups.remove_backups() {
            eprintln!(
                "Warning: could not remove backup {}.bak: {}",
                path.display(),
                err
            );
        }

        Ok(Outcome::Committed)
    }
}

/// Rollback sweep after a failed backup or write: restore every backed-up
/// path and delete every file this run created from nothing. A clean sweep
/// downgrades the failure to `RolledBack`; any path the sweep could not
/// return to its pre-run state escalates to `RecoveryFailed`, naming it.
fn fail_with_rollback(
    backups: &mut BackupSet,
    fresh: &[PathBuf],
    phase: Phase,
    cause: String,
) -> TransactionError {
    let recorded: Vec<PathBuf> = backups.paths().to_vec();

    let mut failures: Vec<RecoveryFailure> = backups
        .restore_backups()
        .into_iter()
        .map(|(path, source)| RecoveryFailure::Restore { path, source })
        .collect();

    for path in fresh {
        if let Err(source) = std::fs::remove_file(path) {
            // A fresh path that was never actually written is already in
            // its pre-run state.
            if source.kind() != io::ErrorKind::NotFound {
                failures.push(RecoveryFailure::Cleanup {
                    path: path.clone(),
                    source,
                });
            }
        }
    }

    if failures.is_empty() {
        // Restored copies are intact; the .bak files are no longer needed
        // and would block the next run's preflight. The ledger is already
        // empty after a clean sweep, so delete from the pre-restore record.
        for src in recorded {
            let bak = backup::backup_path(&src);
            if let Err(err) = std::fs::remove_file(&bak) {
                eprintln!("Warning: could not remove backup {}: {}", bak.display(), err);
            }
        }
        TransactionError::RolledBack { phase, cause }
    } else {
        TransactionError::RecoveryFailed {
            phase,
            cause,
            failures,
        }
    }
}

/// Concatenates the configured inputs (already sorted) with blank-line
/// separators; `-` pulls from stdin.
fn assemble_input(inputs: &[String]) -> Result<String, TransactionError> {
    let mut assembled = String::new();

    for (i, input) in inputs.iter().enumerate() {
        if i > 0 {
            assembled.push_str("\n\n");
        }

        if input == STDIN_INPUT {
            io::stdin()
                .read_to_string(&mut assembled)
                .map_err(|e| TransactionError::Io {
                    context: "error reading input from stdin".to_string(),
                    source: e,
                })?;
        } else {
            let content =
                std::fs::read_to_string(input).map_err(|e| TransactionError::Io {
                    context: format!("error reading input file {}", input),
                    source: e,
                })?;
            assembled.push_str(&content);
        }
    }

    Ok(assembled)
}
