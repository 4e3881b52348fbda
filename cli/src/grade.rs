use std::io::Write;
use std::path::Path;

use anyhow::Context as _;
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::NoColor;
use tracing::{info, warn};

use dodona::{
    Annotation, AnnotationSeverity, Context, ErrorType, Failure, Judgement, Message, MessageFormat,
    MessagePermission, Reporter, Scope, Tab, Test, TestCase,
};
use turtle::{ErrorClass, ParseError, Parser, Raster, RunError};

use crate::config::JudgeConfig;
use crate::translator::{Text, Translator};

/// Grade the submission described by the run configuration `raw_config`,
/// writing the whole report to `reporter`.
///
/// Failures of the submission end up in the report; only errors writing the
/// report itself are returned.
pub fn grade<W: Write>(reporter: &mut Reporter<W>, raw_config: &str) -> dodona::Result<()> {
    reporter
        .open(Judgement, |judgement| {
            let config = match JudgeConfig::from_json(raw_config) {
                Ok(config) => config,
                Err(error) => {
                    warn!("invalid configuration: {error:#}");
                    let translator = Translator::default();
                    judgement.message(Message::new(
                        translator.translate(Text::InvalidConfiguration),
                    ))?;
                    return Err(internal_error(format!("{error:#}")));
                }
            };
            let grader = Grader {
                translator: Translator::new(&config.natural_language),
                config: &config,
            };

            let submission = grader.read(judgement, &config.source)?;
            let solution = grader.read(judgement, &config.solution)?;

            let title = grader.translator.translate(Text::ComparingDrawings);
            judgement.open(Tab::new(title), |tab| {
                tab.open(Context, |context| {
                    let case = TestCase::formatted(MessageFormat::Code, submission.clone());
                    context.open(case, |testcase| {
                        grader.compare(testcase, &submission, &solution)?;
                        testcase.conclude(ErrorType::Correct);
                        Ok(())
                    })?;
                    context.conclude(ErrorType::Correct);
                    Ok(())
                })
            })?;

            judgement.conclude(ErrorType::CorrectAnswer);
            info!("submission accepted");
            Ok(())
        })
        .map(drop)
}

/// Failure only the exercise author can do something about.
fn internal_error(detail: String) -> dodona::Error {
    Failure::new(ErrorType::InternalError)
        .with_message(
            Message::formatted(MessageFormat::Code, detail).permission(MessagePermission::Staff),
        )
        .into()
}

struct Grader<'a> {
    config: &'a JudgeConfig,
    translator: Translator,
}

impl Grader<'_> {
    fn read<W: Write>(&self, scope: &mut Scope<'_, W>, path: &Path) -> dodona::Result<String> {
        match std::fs::read_to_string(path) {
            Ok(source) => Ok(source),
            Err(error) => {
                warn!(path = %path.display(), %error, "cannot read script");
                scope.message(Message::new(
                    self.translator.translate(Text::InvalidConfiguration),
                ))?;
                Err(internal_error(format!(
                    "cannot read {}: {}",
                    path.display(),
                    error
                )))
            }
        }
    }

    fn compare<W: Write>(
        &self,
        testcase: &mut Scope<'_, W>,
        submission: &str,
        solution: &str,
    ) -> dodona::Result<()> {
        let submitted = self.run_submission(testcase, submission)?;
        let expected = self.run_solution(testcase, solution)?;

        let differing = Raster::render(&submitted.drawing)
            .difference(&Raster::render(&expected.drawing))
            .context("cannot compare the drawings")?;
        let allowed = self.config.diff_threshold;
        info!(differing, allowed, "compared drawings");

        let description = self.translator.translate(Text::PixelDifference { differing });
        testcase.open(Test::new(description, expected.drawing.to_svg()), |test| {
            test.set("generated", submitted.drawing.to_svg());
            if differing > allowed {
                let note = self
                    .translator
                    .translate(Text::DrawingsDiffer { differing, allowed });
                return Err(Failure::new(ErrorType::WrongAnswer)
                    .with_message(Message::new(note))
                    .into());
            }
            Ok(())
        })?;
        Ok(())
    }

    fn run_submission<W: Write>(
        &self,
        scope: &mut Scope<'_, W>,
        source: &str,
    ) -> dodona::Result<turtle::Run> {
        let mut files = SimpleFiles::new();
        let file_id = files.add("submission".to_string(), source.to_string());

        let program = match Parser::new(source.to_string(), file_id).parse() {
            Ok(program) => program,
            Err(errors) => {
                info!(errors = errors.len(), "submission does not parse");
                for error in &errors {
                    let (row, column) = turtle::line_column(source, error.span.start);
                    scope.annotate(
                        Annotation::new(row, error.message.clone())
                            .column(column)
                            .severity(AnnotationSeverity::Error),
                    )?;
                }
                scope.message(Message::new(self.translator.translate(
                    Text::CompilationFailed {
                        errors: errors.len(),
                    },
                )))?;
                let diagnostics: Vec<_> = errors.iter().map(ParseError::to_diagnostic).collect();
                return Err(Failure::new(ErrorType::CompilationError)
                    .with_message(Message::formatted(
                        MessageFormat::Code,
                        render(&files, &diagnostics),
                    ))
                    .into());
            }
        };

        match turtle::execute(&program, self.config.canvas, &self.config.limits) {
            Ok(run) => {
                if !run.output.is_empty() {
                    scope.message(Message::new(self.translator.translate(Text::PrintedOutput)))?;
                    scope.message(Message::formatted(MessageFormat::Code, run.output.clone()))?;
                }
                Ok(run)
            }
            Err(error) => Err(self.runtime_failure(scope, source, &files, &error)?),
        }
    }

    fn runtime_failure<W: Write>(
        &self,
        scope: &mut Scope<'_, W>,
        source: &str,
        files: &SimpleFiles<String, String>,
        error: &RunError,
    ) -> dodona::Result<dodona::Error> {
        let (status, text) = match error.error.class() {
            ErrorClass::Crash => (ErrorType::RuntimeError, Text::RuntimeFailed),
            ErrorClass::Time => (ErrorType::TimeLimitExceeded, Text::TimeLimit),
            ErrorClass::Memory => (ErrorType::MemoryLimitExceeded, Text::MemoryLimit),
            ErrorClass::Output => (ErrorType::OutputLimitExceeded, Text::OutputLimit),
        };
        info!(%error, %status, "submission failed");

        if status == ErrorType::RuntimeError {
            if let Some(span) = &error.span {
                let (row, column) = turtle::line_column(source, span.start);
                scope.annotate(
                    Annotation::new(row, error.to_string())
                        .column(column)
                        .severity(AnnotationSeverity::Error),
                )?;
            }
        }
        scope.message(Message::new(self.translator.translate(text)))?;

        Ok(Failure::new(status)
            .with_message(Message::formatted(
                MessageFormat::Code,
                render(files, &[error.to_diagnostic()]),
            ))
            .into())
    }

    /// The model solution has to run cleanly; anything else is the exercise's fault.
    fn run_solution<W: Write>(
        &self,
        scope: &mut Scope<'_, W>,
        source: &str,
    ) -> dodona::Result<turtle::Run> {
        let mut files = SimpleFiles::new();
        let file_id = files.add(self.config.solution.display().to_string(), source.to_string());

        let diagnostics = match Parser::new(source.to_string(), file_id).parse() {
            Ok(program) => {
                match turtle::execute(&program, self.config.canvas, &self.config.limits) {
                    Ok(run) => return Ok(run),
                    Err(error) => vec![error.to_diagnostic()],
                }
            }
            Err(errors) => errors.iter().map(ParseError::to_diagnostic).collect(),
        };

        warn!(solution = %self.config.solution.display(), "model solution failed");
        scope.message(Message::new(self.translator.translate(Text::SolutionFailed)))?;
        Err(internal_error(render(&files, &diagnostics)))
    }
}

/// Render diagnostics as plain text, the way they would appear in a terminal.
fn render(files: &SimpleFiles<String, String>, diagnostics: &[Diagnostic<usize>]) -> String {
    let config = term::Config::default();
    let mut buffer = NoColor::new(Vec::new());
    for diagnostic in diagnostics {
        if let Err(error) = term::emit_to_write_style(&mut buffer, &config, files, diagnostic) {
            warn!(%error, "cannot render diagnostic");
        }
    }
    String::from_utf8_lossy(&buffer.into_inner()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;

    const SQUARE: &str = "repeat 4 [ fd 100 rt 90 ]\n";

    struct Exercise {
        dir: tempfile::TempDir,
    }

    impl Exercise {
        fn new(solution: &str) -> Self {
            let dir = tempfile::tempdir().expect("failed to create temp dir");
            fs::write(dir.path().join("solution.turtle"), solution).unwrap();
            Exercise { dir }
        }

        fn config(&self, submission: &str, extra: &str) -> String {
            let source = self.dir.path().join("submission.turtle");
            fs::write(&source, submission).unwrap();
            format!(
                r#"{{"resources": {:?}, "source": {:?}, "natural_language": "en"{}}}"#,
                self.dir.path().display().to_string(),
                source.display().to_string(),
                extra
            )
        }

        fn grade(&self, submission: &str) -> Vec<Value> {
            self.grade_with(submission, "")
        }

        fn grade_with(&self, submission: &str, extra: &str) -> Vec<Value> {
            events(&self.config(submission, extra))
        }
    }

    fn events(raw_config: &str) -> Vec<Value> {
        let mut reporter = Reporter::new(Vec::new());
        grade(&mut reporter, raw_config).expect("grading failed");
        String::from_utf8(reporter.into_inner())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn commands(events: &[Value]) -> Vec<&str> {
        events
            .iter()
            .map(|event| event["command"].as_str().unwrap())
            .collect()
    }

    fn find<'a>(events: &'a [Value], command: &str) -> &'a Value {
        events
            .iter()
            .find(|event| event["command"] == command)
            .unwrap_or_else(|| panic!("no {command} event"))
    }

    #[test]
    fn identical_drawing_is_accepted() {
        let exercise = Exercise::new(SQUARE);
        let events = exercise.grade("fd 100 rt 90 fd 100 rt 90 fd 100 rt 90 fd 100");

        assert_eq!(
            commands(&events),
            vec![
                "start-judgement",
                "start-tab",
                "start-context",
                "start-testcase",
                "start-test",
                "close-test",
                "close-testcase",
                "close-context",
                "close-tab",
                "close-judgement",
            ]
        );
        assert_eq!(find(&events, "start-tab")["title"], "Comparing PNGs");
        assert_eq!(find(&events, "start-testcase")["description"]["format"], "code");

        let start_test = find(&events, "start-test");
        assert_eq!(
            start_test["description"],
            "0 pixels differ from the expected drawing"
        );
        let close_test = find(&events, "close-test");
        assert_eq!(close_test["generated"], start_test["expected"]);
        assert!(close_test.get("status").is_none());

        assert_eq!(find(&events, "close-testcase")["accepted"], true);
        assert_eq!(find(&events, "close-context")["accepted"], true);
        let judgement = find(&events, "close-judgement");
        assert_eq!(judgement["accepted"], true);
        assert_eq!(judgement["status"], "correct answer");
    }

    #[test]
    fn different_drawing_is_a_wrong_answer() {
        let exercise = Exercise::new(SQUARE);
        let events = exercise.grade("repeat 3 [ fd 100 rt 120 ]");

        let close_test = find(&events, "close-test");
        assert_eq!(close_test["status"], "wrong answer");
        assert_eq!(close_test["accepted"], false);

        let commands = commands(&events);
        let note = commands.iter().position(|c| *c == "append-message").unwrap();
        assert_eq!(commands[note + 1], "close-test");
        assert!(!commands.contains(&"escalate-status"));

        assert_eq!(find(&events, "close-testcase")["accepted"], false);
        assert_eq!(find(&events, "close-context")["accepted"], false);
        let judgement = find(&events, "close-judgement");
        assert_eq!(judgement["accepted"], false);
        assert_eq!(judgement["status"], "wrong answer");
    }

    #[test]
    fn threshold_tolerates_small_differences() {
        let exercise = Exercise::new(SQUARE);
        let events = exercise.grade_with("repeat 4 [ fd 99 rt 90 ]", r#", "diff_threshold": 100000"#);
        assert_eq!(find(&events, "close-judgement")["status"], "correct answer");
    }

    #[test]
    fn syntax_errors_are_annotated() {
        let exercise = Exercise::new(SQUARE);
        let events = exercise.grade("fd 10\njump 5\n");

        let annotation = find(&events, "annotate-code");
        assert_eq!(annotation["row"], 1);
        assert_eq!(annotation["column"], 0);
        assert_eq!(annotation["type"], "error");
        assert_eq!(annotation["text"], "unknown command 'jump'");

        assert!(!commands(&events).contains(&"start-test"));
        assert_eq!(find(&events, "close-testcase")["accepted"], false);
        assert_eq!(find(&events, "close-judgement")["status"], "compilation error");
    }

    #[test]
    fn runtime_errors_are_annotated() {
        let exercise = Exercise::new(SQUARE);
        let events = exercise.grade("fd 10\n  pencolor \"octarine\"\n");

        let annotation = find(&events, "annotate-code");
        assert_eq!(annotation["row"], 1);
        assert_eq!(annotation["column"], 2);
        assert_eq!(find(&events, "close-judgement")["status"], "runtime error");
    }

    #[test]
    fn endless_loops_exceed_the_time_limit() {
        let exercise = Exercise::new(SQUARE);
        let events = exercise.grade("repeat 100000000 [ rt 1 ]");
        assert_eq!(find(&events, "close-judgement")["status"], "time limit exceeded");
        assert!(!commands(&events).contains(&"annotate-code"));
    }

    #[test]
    fn drawings_too_costly_to_render_exceed_the_time_limit() {
        let exercise = Exercise::new(SQUARE);
        let events = exercise.grade("pensize 100000 repeat 2000 [ fd 1 ]");
        assert!(!commands(&events).contains(&"start-test"));
        assert_eq!(find(&events, "close-judgement")["status"], "time limit exceeded");
    }

    #[test]
    fn deep_nesting_is_a_compilation_error() {
        let exercise = Exercise::new(SQUARE);
        let submission = format!("fd {}1{}", "(".repeat(50_000), ")".repeat(50_000));
        let events = exercise.grade(&submission);
        assert_eq!(find(&events, "annotate-code")["text"], "expression nested too deeply");
        assert_eq!(commands(&events).last(), Some(&"close-judgement"));
        assert_eq!(find(&events, "close-judgement")["status"], "compilation error");
    }

    #[test]
    fn printed_output_is_shown() {
        let exercise = Exercise::new(SQUARE);
        let events = exercise.grade("print \"hello\"\nrepeat 4 [ fd 100 rt 90 ]");
        let shown = events
            .iter()
            .filter(|event| event["command"] == "append-message")
            .any(|event| event["message"]["description"] == "hello\n");
        assert!(shown);
        assert_eq!(find(&events, "close-judgement")["status"], "correct answer");
    }

    #[test]
    fn broken_solution_is_an_internal_error() {
        let exercise = Exercise::new("fd \"far\"");
        let events = exercise.grade(SQUARE);
        let judgement = find(&events, "close-judgement");
        assert_eq!(judgement["status"], "internal error");
        assert!(!commands(&events).contains(&"start-test"));
    }

    #[test]
    fn invalid_configuration_still_closes_the_judgement() {
        let events = events("{}");
        assert_eq!(
            commands(&events),
            vec![
                "start-judgement",
                "append-message",
                "append-message",
                "close-judgement"
            ]
        );
        let staff_note = &events[2]["message"];
        assert_eq!(staff_note["permission"], "staff");
        let judgement = &events[3];
        assert_eq!(judgement["status"], "internal error");
        assert_eq!(judgement["accepted"], false);
    }

    #[test]
    fn dutch_feedback() {
        let exercise = Exercise::new(SQUARE);
        let config = exercise
            .config(SQUARE, "")
            .replace(r#""natural_language": "en""#, r#""natural_language": "nl""#);
        let events = events(&config);
        assert_eq!(find(&events, "start-tab")["title"], "PNG's vergelijken");
    }
}
