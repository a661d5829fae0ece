use super::error::PipelineError;
use super::strategies::StrategyTask;
use crate::shared::logging::PipelineLog;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FitnessReading {
    Usable { value: f64 },
    Missing,
    Malformed { raw: String, reason: String },
    Unreadable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub reading: FitnessReading,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub winner: String,
    pub fitness: f64,
    pub output_dir: PathBuf,
    pub candidates: Vec<Candidate>,
}

/// Parses a fitness marker. Surrounding whitespace is ignored; NaN and infinities are
/// rejected because they cannot be ranked.
pub fn parse_fitness(raw: &str) -> Result<f64, String> {
    let trimmed = raw.trim();
    let value = trimmed
        .parse::<f64>()
        .map_err(|err| format!("`{trimmed}` is not a number: {err}"))?;
    if !value.is_finite() {
        return Err(format!("`{trimmed}` is not a finite number"));
    }
    Ok(value)
}

pub fn read_fitness(path: &Path) -> FitnessReading {
    if !path.is_file() {
        return FitnessReading::Missing;
    }
    match fs::read_to_string(path) {
        Ok(raw) => match parse_fitness(&raw) {
            Ok(value) => FitnessReading::Usable { value },
            Err(reason) => FitnessReading::Malformed { raw, reason },
        },
        Err(err) => FitnessReading::Unreadable {
            reason: err.to_string(),
        },
    }
}

/// Running-maximum scan in examination order. A value greater than or equal to the
/// current best replaces it, so ties go to the candidate examined last.
pub fn pick_winner<'a, I>(scores: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for (name, value) in scores {
        match best {
            Some((_, current)) if value < current => {}
            _ => best = Some((name, value)),
        }
    }
    best
}

/// Reads every task's fitness marker, in task order, and picks the winner.
/// Missing or malformed markers exclude that task; only an empty field is fatal.
pub fn select_winner(
    tasks: &[StrategyTask],
    strategy_dir: &Path,
    log: &PipelineLog,
) -> Result<Selection, PipelineError> {
    log.info("selection.start", "reading fitness markers");
    let mut candidates = Vec::with_capacity(tasks.len());
    for task in tasks {
        let reading = read_fitness(&task.fitness_file);
        match &reading {
            FitnessReading::Usable { value } => log.info(
                "selection.candidate",
                &format!("strategy {} reported fitness {value}", task.name),
            ),
            FitnessReading::Missing => log.warn(
                "selection.skip.missing",
                &format!(
                    "fitness marker not found for strategy {}; ignoring it: {}",
                    task.name,
                    task.fitness_file.display()
                ),
            ),
            FitnessReading::Malformed { reason, .. } => log.warn(
                "selection.skip.malformed",
                &format!("fitness marker of strategy {} rejected: {reason}", task.name),
            ),
            FitnessReading::Unreadable { reason } => log.warn(
                "selection.skip.unreadable",
                &format!("fitness marker of strategy {} unreadable: {reason}", task.name),
            ),
        }
        candidates.push(Candidate {
            name: task.name.clone(),
            reading,
        });
    }

    let usable = candidates.iter().filter_map(|c| match c.reading {
        FitnessReading::Usable { value } => Some((c.name.as_str(), value)),
        _ => None,
    });
    let Some((winner, fitness)) = pick_winner(usable) else {
        log.error("selection.failed", "no strategy produced a usable fitness value");
        return Err(PipelineError::NoUsableFitness {
            strategy_dir: strategy_dir.display().to_string(),
        });
    };
    let winner = winner.to_string();

    let output_dir = tasks
        .iter()
        .find(|task| task.name == winner)
        .map(|task| task.output_dir.clone())
        .unwrap_or_else(|| strategy_dir.join(&winner));
    log.info(
        "selection.winner",
        &format!("winning strategy {winner} with fitness {fitness}"),
    );
    Ok(Selection {
        winner,
        fitness,
        output_dir,
        candidates,
    })
}
