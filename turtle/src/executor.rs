use std::collections::HashMap;
use std::ops::Range;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::drawing::{Canvas, Color, Drawing, Point, Stroke};
use crate::environment::{Environment, Value};
use crate::error::{RunError, RuntimeError};
use crate::program::{BinaryOperator, Command, Expr, Program, Statement, UnaryOperator};
use crate::raster::stroke_cost;

/// How often, in steps, the wall clock is consulted.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Procedure calls, repeats and ifs active at once.
const MAX_ACTIVE_BLOCKS: usize = 2048;

/// Resource budget of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct Limits {
    /// Statements executed, counting every repeat iteration and call.
    pub max_steps: u64,
    /// Wall-clock budget; `None` disables the deadline.
    pub timeout: Option<Duration>,
    pub max_strokes: usize,
    /// Bytes of captured `print` output.
    pub max_output: usize,
    /// Nested procedure calls.
    pub max_depth: usize,
    /// Pixels the rasterizer may visit, summed over all strokes.
    pub max_render_cost: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_steps: 1_000_000,
            timeout: Some(Duration::from_secs(10)),
            max_strokes: 100_000,
            max_output: 64 * 1024,
            max_depth: 256,
            max_render_cost: 100_000_000,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Run {
    pub drawing: Drawing,
    /// Everything the program printed.
    pub output: String,
}

/// Execute `program` on a fresh turtle.
///
/// The script has no way to reach the file system, other processes or the
/// clock; its only effects are the drawing and the captured output.
pub fn execute(program: &Program, canvas: Canvas, limits: &Limits) -> Result<Run, RunError> {
    let mut executor = Executor {
        program,
        limits,
        env: Environment::new(),
        turtle: Turtle::default(),
        drawing: Drawing::new(canvas),
        output: String::new(),
        steps: 0,
        render_cost: 0,
        active_blocks: 0,
        started: Instant::now(),
        repcounts: Vec::new(),
    };
    executor.run_block(&program.statements)?;
    debug!(
        steps = executor.steps,
        strokes = executor.drawing.strokes.len(),
        render_cost = executor.render_cost,
        "program finished"
    );
    Ok(Run {
        drawing: executor.drawing,
        output: executor.output,
    })
}

#[derive(Debug, Clone)]
struct Turtle {
    position: Point,
    /// Degrees, counter-clockwise from east.
    heading: f64,
    pen_down: bool,
    color: Color,
    width: f64,
}

impl Default for Turtle {
    fn default() -> Self {
        Turtle {
            position: Point::ORIGIN,
            heading: 0.0,
            pen_down: true,
            color: Color::BLACK,
            width: 1.0,
        }
    }
}

struct Executor<'a> {
    program: &'a Program,
    limits: &'a Limits,
    env: Environment,
    turtle: Turtle,
    drawing: Drawing,
    output: String,
    steps: u64,
    render_cost: u64,
    active_blocks: usize,
    started: Instant,
    repcounts: Vec<u64>,
}

impl Executor<'_> {
    fn fail(&self, error: RuntimeError, span: &Range<usize>) -> RunError {
        RunError::at(error, span.clone(), self.program.source_id)
    }

    fn tick(&mut self, span: &Range<usize>) -> Result<(), RunError> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(self.fail(RuntimeError::StepLimit(self.limits.max_steps), span));
        }
        if let Some(timeout) = self.limits.timeout {
            if self.steps % DEADLINE_CHECK_INTERVAL == 0 && self.started.elapsed() > timeout {
                return Err(self.fail(RuntimeError::Deadline(timeout), span));
            }
        }
        Ok(())
    }

    fn run_block(&mut self, statements: &[Statement]) -> Result<(), RunError> {
        for statement in statements {
            self.run_statement(statement)?;
        }
        Ok(())
    }

    fn run_statement(&mut self, statement: &Statement) -> Result<(), RunError> {
        self.tick(statement.span())?;

        let nests = matches!(
            statement,
            Statement::Call { .. } | Statement::Repeat { .. } | Statement::If { .. }
        );
        if !nests {
            return self.dispatch(statement);
        }
        if self.active_blocks >= MAX_ACTIVE_BLOCKS {
            return Err(self.fail(
                RuntimeError::NestingLimit(MAX_ACTIVE_BLOCKS),
                statement.span(),
            ));
        }
        self.active_blocks += 1;
        let result = self.dispatch(statement);
        self.active_blocks -= 1;
        result
    }

    fn dispatch(&mut self, statement: &Statement) -> Result<(), RunError> {
        match statement {
            Statement::Command {
                command,
                arguments,
                span,
            } => {
                let values = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument, span))
                    .collect::<Result<Vec<_>, _>>()?;
                self.run_command(*command, &values, span)
            }

            Statement::Call {
                name,
                arguments,
                span,
            } => {
                let program = self.program;
                let Some(procedure) = program.procedures.get(name) else {
                    return Err(self.fail(
                        RuntimeError::InvalidArgument {
                            command: "call",
                            reason: format!("no procedure named '{}'", name),
                        },
                        span,
                    ));
                };
                if self.env.call_depth() >= self.limits.max_depth {
                    return Err(self.fail(RuntimeError::StackOverflow(self.limits.max_depth), span));
                }
                let mut frame = HashMap::new();
                for (parameter, argument) in procedure.parameters.iter().zip(arguments) {
                    frame.insert(parameter.clone(), self.evaluate(argument, span)?);
                }
                self.env.push_frame(frame);
                let result = self.run_block(&procedure.body);
                self.env.pop_frame();
                result
            }

            Statement::Repeat { count, body, span } => {
                let count = self.number(count, span)?;
                if count < 0.0 {
                    return Err(self.fail(
                        RuntimeError::InvalidArgument {
                            command: "repeat",
                            reason: format!("cannot repeat {} times", count),
                        },
                        span,
                    ));
                }
                let count = count.floor() as u64;
                self.repcounts.push(0);
                let mut result = Ok(());
                for i in 1..=count {
                    if let Some(current) = self.repcounts.last_mut() {
                        *current = i;
                    }
                    result = self.run_block(body);
                    if result.is_err() {
                        break;
                    }
                }
                self.repcounts.pop();
                result
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
                span,
            } => {
                if self.evaluate(condition, span)?.is_truthy() {
                    self.run_block(then_branch)
                } else {
                    self.run_block(else_branch)
                }
            }

            Statement::Make {
                variable,
                value,
                span,
            } => {
                let value = self.evaluate(value, span)?;
                self.env.set(variable, value);
                Ok(())
            }
        }
    }

    fn run_command(
        &mut self,
        command: Command,
        values: &[Value],
        span: &Range<usize>,
    ) -> Result<(), RunError> {
        match command {
            Command::Forward => {
                let distance = self.argument(command, values, 0, span)?;
                self.forward(distance, span)
            }
            Command::Back => {
                let distance = self.argument(command, values, 0, span)?;
                self.forward(-distance, span)
            }
            Command::Left => {
                let angle = self.argument(command, values, 0, span)?;
                self.rotate(angle);
                Ok(())
            }
            Command::Right => {
                let angle = self.argument(command, values, 0, span)?;
                self.rotate(-angle);
                Ok(())
            }
            Command::PenUp => {
                self.turtle.pen_down = false;
                Ok(())
            }
            Command::PenDown => {
                self.turtle.pen_down = true;
                Ok(())
            }
            Command::Goto => {
                let target = Point::new(self.argument(command, values, 0, span)?, self.argument(command, values, 1, span)?);
                self.move_to(target, span)
            }
            Command::SetHeading => {
                let heading = self.argument(command, values, 0, span)?;
                self.turtle.heading = heading.rem_euclid(360.0);
                Ok(())
            }
            Command::Home => {
                self.move_to(Point::ORIGIN, span)?;
                self.turtle.heading = 0.0;
                Ok(())
            }
            Command::PenColor => {
                let name = match values.first() {
                    Some(Value::Text(name)) => name,
                    other => {
                        return Err(self.fail(
                            RuntimeError::TypeError {
                                expected: "string",
                                got: other.map_or("nothing", Value::type_name),
                            },
                            span,
                        ));
                    }
                };
                let Some(color) = Color::parse(name) else {
                    return Err(self.fail(RuntimeError::UnknownColor(name.clone()), span));
                };
                self.turtle.color = color;
                Ok(())
            }
            Command::PenSize => {
                let width = self.argument(command, values, 0, span)?;
                if !(width > 0.0) {
                    return Err(self.fail(
                        RuntimeError::InvalidArgument {
                            command: "pensize",
                            reason: format!("width must be positive, got {}", width),
                        },
                        span,
                    ));
                }
                self.turtle.width = width;
                Ok(())
            }
            Command::Circle => {
                let radius = self.argument(command, values, 0, span)?;
                self.circle(radius, span)
            }
            Command::Print => {
                let text = values.first().map(Value::to_string).unwrap_or_default();
                if self.output.len() + text.len() + 1 > self.limits.max_output {
                    return Err(self.fail(RuntimeError::OutputLimit(self.limits.max_output), span));
                }
                self.output.push_str(&text);
                self.output.push('\n');
                Ok(())
            }
        }
    }

    fn argument(
        &self,
        command: Command,
        values: &[Value],
        index: usize,
        span: &Range<usize>,
    ) -> Result<f64, RunError> {
        match values.get(index) {
            Some(Value::Number(n)) => Ok(*n),
            Some(other) => Err(self.fail(
                RuntimeError::TypeError {
                    expected: "number",
                    got: other.type_name(),
                },
                span,
            )),
            None => Err(self.fail(
                RuntimeError::InvalidArgument {
                    command: command.name(),
                    reason: "missing argument".into(),
                },
                span,
            )),
        }
    }

    fn rotate(&mut self, degrees: f64) {
        self.turtle.heading = (self.turtle.heading + degrees).rem_euclid(360.0);
    }

    fn forward(&mut self, distance: f64, span: &Range<usize>) -> Result<(), RunError> {
        let radians = self.turtle.heading.to_radians();
        let target = Point::new(
            self.turtle.position.x + distance * radians.cos(),
            self.turtle.position.y + distance * radians.sin(),
        );
        self.move_to(target, span)
    }

    fn move_to(&mut self, target: Point, span: &Range<usize>) -> Result<(), RunError> {
        if !target.x.is_finite() || !target.y.is_finite() {
            return Err(self.fail(
                RuntimeError::InvalidArgument {
                    command: "move",
                    reason: "coordinates must be finite".into(),
                },
                span,
            ));
        }
        if self.turtle.pen_down {
            if self.drawing.strokes.len() >= self.limits.max_strokes {
                return Err(self.fail(RuntimeError::StrokeLimit(self.limits.max_strokes), span));
            }
            let stroke = Stroke {
                from: self.turtle.position,
                to: target,
                color: self.turtle.color,
                width: self.turtle.width,
            };
            self.render_cost = self
                .render_cost
                .saturating_add(stroke_cost(&self.drawing.canvas, &stroke));
            if self.render_cost > self.limits.max_render_cost {
                return Err(self.fail(
                    RuntimeError::RenderLimit(self.limits.max_render_cost),
                    span,
                ));
            }
            self.drawing.strokes.push(stroke);
        }
        self.turtle.position = target;
        Ok(())
    }

    /// Full circle approximated by a regular polygon, drawn counter-clockwise
    /// for a positive radius and clockwise for a negative one.
    fn circle(&mut self, radius: f64, span: &Range<usize>) -> Result<(), RunError> {
        let steps = 1 + (11.0 + radius.abs() / 6.0).min(59.0) as u32;
        let mut angle = 360.0 / f64::from(steps);
        let mut side = 2.0 * radius * (angle / 2.0).to_radians().sin();
        if radius < 0.0 {
            side = -side;
            angle = -angle;
        }

        self.rotate(angle / 2.0);
        for _ in 0..steps {
            self.forward(side, span)?;
            self.rotate(angle);
        }
        self.rotate(-angle / 2.0);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn number(&self, expr: &Expr, span: &Range<usize>) -> Result<f64, RunError> {
        match self.evaluate(expr, span)? {
            Value::Number(n) => Ok(n),
            other => Err(self.fail(
                RuntimeError::TypeError {
                    expected: "number",
                    got: other.type_name(),
                },
                span,
            )),
        }
    }

    fn evaluate(&self, expr: &Expr, span: &Range<usize>) -> Result<Value, RunError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::Text(s.clone())),
            Expr::Variable(name, var_span) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| self.fail(RuntimeError::UndefinedVariable(name.clone()), var_span)),
            Expr::RepCount(rep_span) => match self.repcounts.last() {
                Some(&count) => Ok(Value::Number(count as f64)),
                None => Err(self.fail(RuntimeError::RepCountOutsideRepeat, rep_span)),
            },
            Expr::Unary {
                operator: UnaryOperator::Negate,
                operand,
            } => {
                let value = self.number(operand, span)?;
                Ok(Value::Number(-value))
            }
            Expr::Binary {
                operator,
                left,
                right,
                span: expr_span,
            } => {
                let left = self.evaluate(left, expr_span)?;
                let right = self.evaluate(right, expr_span)?;
                self.binary(*operator, left, right, expr_span)
            }
        }
    }

    fn binary(
        &self,
        operator: BinaryOperator,
        left: Value,
        right: Value,
        span: &Range<usize>,
    ) -> Result<Value, RunError> {
        match operator {
            BinaryOperator::Equal => return Ok(Value::Boolean(left == right)),
            BinaryOperator::NotEqual => return Ok(Value::Boolean(left != right)),
            _ => {}
        }

        let (a, b) = match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => (*a, *b),
            (Value::Number(_), other) | (other, _) => {
                return Err(self.fail(
                    RuntimeError::TypeError {
                        expected: "number",
                        got: other.type_name(),
                    },
                    span,
                ));
            }
        };

        let value = match operator {
            BinaryOperator::Add => Value::Number(a + b),
            BinaryOperator::Subtract => Value::Number(a - b),
            BinaryOperator::Multiply => Value::Number(a * b),
            BinaryOperator::Divide | BinaryOperator::Modulo if b == 0.0 => {
                return Err(self.fail(RuntimeError::DivisionByZero, span));
            }
            BinaryOperator::Divide => Value::Number(a / b),
            BinaryOperator::Modulo => Value::Number(a % b),
            BinaryOperator::Less => Value::Boolean(a < b),
            BinaryOperator::Greater => Value::Boolean(a > b),
            BinaryOperator::LessEqual => Value::Boolean(a <= b),
            BinaryOperator::GreaterEqual => Value::Boolean(a >= b),
            BinaryOperator::Equal | BinaryOperator::NotEqual => unreachable!(),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run_with(source: &str, limits: &Limits) -> Result<Run, RunError> {
        let program = Parser::new(source.to_string(), 0)
            .parse()
            .expect("parse failed");
        execute(&program, Canvas::default(), limits)
    }

    fn run(source: &str) -> Run {
        run_with(source, &Limits::default()).expect("run failed")
    }

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn forward_draws_along_the_heading() {
        let run = run("fd 100 lt 90 fd 50");
        assert_eq!(run.drawing.strokes.len(), 2);
        assert!(close(run.drawing.strokes[0].to, Point::new(100.0, 0.0)));
        assert!(close(run.drawing.strokes[1].to, Point::new(100.0, 50.0)));
    }

    #[test]
    fn pen_up_moves_without_drawing() {
        let run = run("pu fd 10 pd fd 10");
        assert_eq!(run.drawing.strokes.len(), 1);
        assert!(close(run.drawing.strokes[0].from, Point::new(10.0, 0.0)));
    }

    #[test]
    fn circle_is_a_closed_polygon() {
        // 11 + 50/6 = 19.33, so 20 sides.
        let run = run("circle 50");
        let strokes = &run.drawing.strokes;
        assert_eq!(strokes.len(), 20);
        assert!(close(strokes[0].from, Point::ORIGIN));
        assert!((strokes[19].to.x).abs() < 1e-6 && (strokes[19].to.y).abs() < 1e-6);
        // Counter-clockwise: the centre lies to the left of the start.
        assert!(strokes.iter().all(|s| s.to.y >= -1e-9));
    }

    #[test]
    fn negative_radius_turns_clockwise() {
        let run = run("circle -50");
        assert!(run.drawing.strokes.iter().all(|s| s.to.y <= 1e-9));
    }

    #[test]
    fn circle_keeps_the_heading() {
        let run = run("circle 30 fd 10");
        let last = run.drawing.strokes.last().unwrap();
        assert!((last.to.x - 10.0).abs() < 1e-6 && last.to.y.abs() < 1e-6);
    }

    #[test]
    fn repcount_counts_from_one() {
        let run = run("repeat 3 [ print repcount ]");
        assert_eq!(run.output, "1\n2\n3\n");
    }

    #[test]
    fn nested_repeats_see_their_own_counter() {
        let run = run("repeat 2 [ repeat 2 [ print repcount ] print repcount ]");
        assert_eq!(run.output, "1\n2\n1\n1\n2\n2\n");
    }

    #[test]
    fn procedures_bind_parameters() {
        let run = run("to square :size repeat 4 [ fd :size rt 90 ] end square 30");
        let strokes = &run.drawing.strokes;
        assert_eq!(strokes.len(), 4);
        assert!(close(strokes[0].to, Point::new(30.0, 0.0)));
        assert!(strokes[3].to.x.abs() < 1e-9 && strokes[3].to.y.abs() < 1e-9);
    }

    #[test]
    fn parameters_are_not_visible_after_the_call() {
        let error = run_with("to dot :size fd :size end dot 1 print :size", &Limits::default())
            .unwrap_err();
        assert_eq!(error.error, RuntimeError::UndefinedVariable("size".into()));
        assert!(error.span.is_some());
    }

    #[test]
    fn make_and_if() {
        let run = run("make :n 5 if :n > 3 [ print \"big\" ] else [ print \"small\" ]");
        assert_eq!(run.output, "big\n");
    }

    #[test]
    fn pencolor_and_pensize_apply_to_later_strokes() {
        let run = run("fd 1 pencolor \"red\" pensize 4 fd 1");
        let strokes = &run.drawing.strokes;
        assert_eq!(strokes[0].color, Color::BLACK);
        assert_eq!(strokes[1].color, Color { r: 255, g: 0, b: 0 });
        assert_eq!(strokes[1].width, 4.0);
    }

    #[test]
    fn unknown_colour_is_an_error() {
        let error = run_with("pencolor \"octarine\"", &Limits::default()).unwrap_err();
        assert_eq!(error.error, RuntimeError::UnknownColor("octarine".into()));
    }

    #[test]
    fn type_errors_are_reported() {
        let error = run_with("fd \"far\"", &Limits::default()).unwrap_err();
        assert_eq!(
            error.error,
            RuntimeError::TypeError {
                expected: "number",
                got: "string"
            }
        );
    }

    #[test]
    fn division_by_zero() {
        let error = run_with("fd 1 / 0", &Limits::default()).unwrap_err();
        assert_eq!(error.error, RuntimeError::DivisionByZero);
    }

    #[test]
    fn repcount_outside_repeat() {
        let error = run_with("fd repcount", &Limits::default()).unwrap_err();
        assert_eq!(error.error, RuntimeError::RepCountOutsideRepeat);
    }

    #[test]
    fn runaway_loops_hit_the_step_limit() {
        let limits = Limits {
            max_steps: 100,
            ..Limits::default()
        };
        let error = run_with("repeat 1000 [ lt 1 ]", &limits).unwrap_err();
        assert_eq!(error.error, RuntimeError::StepLimit(100));
        assert_eq!(error.error.class(), crate::error::ErrorClass::Time);
    }

    #[test]
    fn unbounded_recursion_overflows() {
        let error = run_with("to spin lt 1 spin end spin", &Limits::default()).unwrap_err();
        assert_eq!(error.error, RuntimeError::StackOverflow(256));
    }

    #[test]
    fn deeply_nested_blocks_are_cut_off() {
        let source = format!(
            "to dive {}dive{} end dive",
            "repeat 1 [ ".repeat(10),
            " ]".repeat(10)
        );
        let error = run_with(&source, &Limits::default()).unwrap_err();
        assert_eq!(error.error, RuntimeError::NestingLimit(MAX_ACTIVE_BLOCKS));
        assert_eq!(error.error.class(), crate::error::ErrorClass::Crash);
    }

    #[test]
    fn wide_pens_use_up_the_render_budget() {
        let limits = Limits {
            max_render_cost: 1_000_000,
            ..Limits::default()
        };
        // Each stroke covers the whole 1000x500 canvas.
        assert!(run_with("pensize 5000 fd 1 fd 1", &limits).is_ok());
        let error = run_with("pensize 5000 fd 1 fd 1 fd 1", &limits).unwrap_err();
        assert_eq!(error.error, RuntimeError::RenderLimit(1_000_000));
        assert_eq!(error.error.class(), crate::error::ErrorClass::Time);
    }

    #[test]
    fn pen_up_moves_cost_nothing_to_render() {
        let limits = Limits {
            max_render_cost: 1,
            ..Limits::default()
        };
        assert!(run_with("pensize 5000 pu repeat 100 [ fd 1 ]", &limits).is_ok());
    }

    #[test]
    fn stroke_limit() {
        let limits = Limits {
            max_strokes: 3,
            ..Limits::default()
        };
        let error = run_with("repeat 4 [ fd 1 ]", &limits).unwrap_err();
        assert_eq!(error.error, RuntimeError::StrokeLimit(3));
    }

    #[test]
    fn output_limit() {
        let limits = Limits {
            max_output: 8,
            ..Limits::default()
        };
        let error = run_with("repeat 10 [ print \"abc\" ]", &limits).unwrap_err();
        assert_eq!(error.error, RuntimeError::OutputLimit(8));
    }

    #[test]
    fn home_resets_position_and_heading() {
        let run = run("fd 10 lt 45 home fd 5");
        let last = run.drawing.strokes.last().unwrap();
        assert!(close(last.from, Point::ORIGIN));
        assert!(close(last.to, Point::new(5.0, 0.0)));
    }
}
