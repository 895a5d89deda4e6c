//! Scoring fragments against the exercise catalogue.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use ct_core::{ExerciseId, ExerciseMatcher, Language, TestScore};
use rayon::prelude::*;
use uuid::Uuid;

use crate::config::JudgeConfig;
use crate::fixtures::{Catalogue, Exercise, TestCase};
use crate::process::run_with_timeout;
use crate::runner::{LanguageRunner, RunnerRegistry};
use crate::workspace::{self, Workdir};
use crate::JudgeError;

/// Scores of one fragment against every exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub scores: BTreeMap<ExerciseId, TestScore>,
    /// Exercises sharing the highest pass rate. All of them when nothing passed.
    pub best: Vec<ExerciseId>,
    pub best_score: TestScore,
}

impl Classification {
    /// Picks the best exercises from a full set of scores.
    pub fn from_scores(scores: BTreeMap<ExerciseId, TestScore>) -> Self {
        let best_score = scores
            .values()
            .copied()
            .max_by(TestScore::cmp_rate)
            .unwrap_or_default();
        let best = scores
            .iter()
            .filter(|(_, score)| score.cmp_rate(&best_score).is_eq())
            .map(|(exercise, _)| exercise.clone())
            .collect();
        Self {
            scores,
            best,
            best_score,
        }
    }
}

/// Compiles and runs fragments against a fixed catalogue.
///
/// Exercises are evaluated in parallel on a dedicated pool. Every judge has
/// its own run id, used to tag cached verdicts.
#[derive(Debug)]
pub struct Judge {
    config: JudgeConfig,
    catalogue: Catalogue,
    registry: RunnerRegistry,
    workdirs: Vec<Workdir>,
    pool: rayon::ThreadPool,
    run_id: Uuid,
}

impl Judge {
    /// Creates a judge. A relative `work_dir` is resolved against the
    /// current directory, since runners also use it as the child's cwd.
    pub fn new(catalogue: Catalogue, mut config: JudgeConfig) -> Result<Self, JudgeError> {
        config.work_dir = std::path::absolute(&config.work_dir)
            .map_err(|source| JudgeError::io(&config.work_dir, source))?;
        let registry = RunnerRegistry::new(&config.toolchain);
        let workdirs = catalogue
            .ids()
            .map(|id| Workdir::new(config.work_dir.join(id.as_str())))
            .collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|index| format!("ct-judge-{index}"))
            .build()?;
        let run_id = Uuid::new_v4();
        tracing::info!(
            %run_id,
            exercises = catalogue.exercises().len(),
            work_dir = %config.work_dir.display(),
            "judge ready"
        );
        Ok(Self {
            config,
            catalogue,
            registry,
            workdirs,
            pool,
            run_id,
        })
    }

    /// Replaces the runners, e.g. to point a language at another toolchain.
    #[must_use]
    pub fn with_registry(mut self, registry: RunnerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub const fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Scores `source` against a single exercise.
    pub fn score_against(
        &self,
        source: &str,
        language: Language,
        exercise: &ExerciseId,
    ) -> Result<TestScore, JudgeError> {
        let runner = self.registry.get(language)?;
        let index = self
            .catalogue
            .position(exercise)
            .ok_or_else(|| JudgeError::UnknownExercise(exercise.clone()))?;
        self.evaluate(index, source, runner, None)
    }

    /// Scores `source` against every exercise.
    pub fn classify(&self, source: &str, language: Language) -> Result<Classification, JudgeError> {
        let runner = self.registry.get(language)?;
        let scores: Vec<TestScore> = self.pool.install(|| {
            (0..self.catalogue.exercises().len())
                .into_par_iter()
                .map(|index| self.evaluate(index, source, runner, None))
                .collect::<Result<_, _>>()
        })?;
        let scores = self.catalogue.ids().cloned().zip(scores).collect();
        let classification = Classification::from_scores(scores);
        tracing::debug!(
            %language,
            best = ?classification.best,
            best_score = %classification.best_score,
            "classified fragment"
        );
        Ok(classification)
    }

    /// Returns true as soon as one exercise passes at least one test and
    /// reaches `min_rate`.
    ///
    /// Remaining exercises are not started once a match is found, and those
    /// already running stop at their next test.
    pub fn any_match(
        &self,
        source: &str,
        language: Language,
        min_rate: f64,
    ) -> Result<bool, JudgeError> {
        let runner = self.registry.get(language)?;
        let found = AtomicBool::new(false);
        self.pool.install(|| {
            (0..self.catalogue.exercises().len())
                .into_par_iter()
                .try_for_each(|index| -> Result<(), JudgeError> {
                    if found.load(Ordering::Relaxed) {
                        return Ok(());
                    }
                    let score = self.evaluate(index, source, runner, Some(&found))?;
                    if score.passed > 0 && score.rate() >= min_rate {
                        found.store(true, Ordering::Relaxed);
                    }
                    Ok(())
                })
        })?;
        Ok(found.load(Ordering::Relaxed))
    }

    fn evaluate(
        &self,
        index: usize,
        source: &str,
        runner: &dyn LanguageRunner,
        cancel: Option<&AtomicBool>,
    ) -> Result<TestScore, JudgeError> {
        let exercise = &self.catalogue.exercises()[index];
        let total = u32::try_from(exercise.tests().len()).unwrap_or(u32::MAX);
        if self.config.precheck && !runner.is_plausible(source) {
            tracing::trace!(exercise = %exercise.id(), "fragment failed precheck");
            return Ok(TestScore::failed(total));
        }

        let workdir = &self.workdirs[index];
        let guard = workdir
            .lock()
            .map_err(|source| JudgeError::io(workdir.path(), source))?;
        let language = runner.language();
        let dir = guard
            .language_dir(language)
            .map_err(|source| JudgeError::io(guard.path(), source))?;

        let source_file = runner.source_file_name(source)?;
        workspace::write_atomic(&dir, &source_file, source)
            .map_err(|err| JudgeError::io(&dir, err))?;

        if !self.build(runner, &dir, &source_file, source, exercise)? {
            return Ok(TestScore::failed(total));
        }

        let mut passed = 0;
        for test in exercise.tests() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                tracing::trace!(exercise = %exercise.id(), "evaluation cancelled");
                break;
            }
            if self.run_test(runner, &dir, source, test)? {
                passed += 1;
            } else if self.config.stop_after_first_failure {
                break;
            }
        }

        let score = TestScore::new(total, passed);
        tracing::debug!(exercise = %exercise.id(), %language, %score, "scored exercise");
        Ok(score)
    }

    /// Builds the source unless an up-to-date build exists. Returns false on
    /// a compile failure.
    fn build(
        &self,
        runner: &dyn LanguageRunner,
        dir: &Path,
        source_file: &str,
        source: &str,
        exercise: &Exercise,
    ) -> Result<bool, JudgeError> {
        let Some(mut command) = runner.compile_command(dir, source_file) else {
            return Ok(true);
        };
        let fingerprint = workspace::fingerprint(runner.language(), source);
        if workspace::is_built(dir, source_file, &fingerprint) {
            return Ok(true);
        }
        workspace::clear_built(dir, source_file).map_err(|err| JudgeError::io(dir, err))?;

        let output = run_with_timeout(&mut command, &[], self.config.compile_timeout())
            .map_err(|source| JudgeError::toolchain(&command, source))?;
        if !output.success() {
            tracing::debug!(
                exercise = %exercise.id(),
                timed_out = output.timed_out,
                stderr = %output.stderr.trim_end(),
                "compilation failed"
            );
            return Ok(false);
        }
        workspace::mark_built(dir, source_file, &fingerprint)
            .map_err(|err| JudgeError::io(dir, err))?;
        Ok(true)
    }

    fn run_test(
        &self,
        runner: &dyn LanguageRunner,
        dir: &Path,
        source: &str,
        test: &TestCase,
    ) -> Result<bool, JudgeError> {
        let timeout = self.config.run_timeout();
        let stdin = match runner.input_feeder(dir, &test.input) {
            Some(mut feeder) => {
                workspace::write_atomic(dir, feeder.file_name, &feeder.program)
                    .map_err(|err| JudgeError::io(dir, err))?;
                let fed = run_with_timeout(&mut feeder.command, &[], timeout)
                    .map_err(|source| JudgeError::toolchain(&feeder.command, source))?;
                if !fed.success() {
                    tracing::warn!(test = test.number, "input feeder failed");
                    return Ok(false);
                }
                fed.stdout.into_bytes()
            }
            None => test.input.clone().into_bytes(),
        };

        let mut command = runner.run_command(dir, source)?;
        let output = run_with_timeout(&mut command, &stdin, timeout)
            .map_err(|source| JudgeError::toolchain(&command, source))?;
        let passed = output.success() && outputs_match(&output.stdout, &test.expected);
        tracing::trace!(
            test = test.number,
            passed,
            code = ?output.code,
            timed_out = output.timed_out,
            "ran test"
        );
        Ok(passed)
    }
}

/// Compares program output with the expected text, ignoring one trailing
/// line break on each side.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
    strip_line_break(actual) == strip_line_break(expected)
}

fn strip_line_break(text: &str) -> &str {
    text.strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .unwrap_or(text)
}

impl ExerciseMatcher for Judge {
    type Error = JudgeError;

    fn solves_any(&self, fragment: &str, language: Language) -> Result<bool, Self::Error> {
        self.any_match(fragment, language, 0.0)
    }
}
