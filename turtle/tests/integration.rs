use turtle::{Canvas, Limits, Point, Raster, RuntimeError};

fn run(source: &str) -> turtle::Run {
    let parser = turtle::Parser::new(source.to_string(), 0);
    let program = parser.parse().expect("parse failed");
    turtle::execute(&program, Canvas::default(), &Limits::default()).expect("execution failed")
}

fn run_error(source: &str) -> RuntimeError {
    let parser = turtle::Parser::new(source.to_string(), 0);
    let program = parser.parse().expect("parse failed");
    turtle::execute(&program, Canvas::default(), &Limits::default())
        .expect_err("expected a runtime error")
        .error
}

fn parse_errors(source: &str) -> Vec<String> {
    turtle::Parser::new(source.to_string(), 0)
        .parse()
        .expect_err("expected parse errors")
        .into_iter()
        .map(|e| e.message)
        .collect()
}

fn raster(source: &str) -> Raster {
    Raster::render(&run(source).drawing)
}

fn near(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
}

#[test]
fn square_returns_to_the_origin() {
    let run = run("repeat 4 [ fd 100 rt 90 ]");
    assert_eq!(run.drawing.strokes.len(), 4);
    assert!(near(run.drawing.strokes[3].to, Point::ORIGIN));
}

#[test]
fn aliases_and_case_are_interchangeable() {
    let long = run("FORWARD 50 LEFT 90 Back 20 PenUp Home");
    let short = run("fd 50 lt 90 bk 20 pu home");
    assert_eq!(long.drawing, short.drawing);
}

#[test]
fn goto_and_setheading_are_absolute() {
    let run = run("goto 30 40 seth 90 fd 10");
    let strokes = &run.drawing.strokes;
    assert!(near(strokes[0].to, Point::new(30.0, 40.0)));
    assert!(near(strokes[1].to, Point::new(30.0, 50.0)));
}

#[test]
fn small_circles_have_fewer_sides() {
    // 1 + int(min(11 + r/6, 59))
    assert_eq!(run("circle 6").drawing.strokes.len(), 13);
    assert_eq!(run("circle 100").drawing.strokes.len(), 28);
    assert_eq!(run("circle 1000").drawing.strokes.len(), 60);
}

#[test]
fn procedures_may_be_called_before_their_definition() {
    let source = "
        triangle 60
        to triangle :side
          repeat 3 [ fd :side lt 120 ]
        end
    ";
    let run = run(source);
    assert_eq!(run.drawing.strokes.len(), 3);
    assert!(near(run.drawing.strokes[2].to, Point::ORIGIN));
}

#[test]
fn recursion_with_a_base_case() {
    let source = "
        to spiral :n
          if :n > 0 [ fd :n rt 90 spiral :n - 10 ]
        end
        spiral 50
    ";
    assert_eq!(run(source).drawing.strokes.len(), 5);
}

#[test]
fn print_output_is_captured() {
    let run = run("make :x 6 print :x * 7 print \"done\"");
    assert_eq!(run.output, "42\ndone\n");
}

#[test]
fn comments_are_ignored() {
    let run = run("# a square\nrepeat 4 [ fd 10 rt 90 ] ; trailing\n");
    assert_eq!(run.drawing.strokes.len(), 4);
}

#[test]
fn runtime_errors() {
    assert_eq!(
        run_error("print :missing"),
        RuntimeError::UndefinedVariable("missing".into())
    );
    assert_eq!(run_error("pensize 0").to_string(), "invalid argument for 'pensize': width must be positive, got 0");
    assert_eq!(run_error("to loop loop end loop"), RuntimeError::StackOverflow(256));
}

#[test]
fn parse_errors_are_collected() {
    let errors = parse_errors("fd\nrt 90 jump 10\nrepeat 2 [ fd 1");
    assert_eq!(
        errors,
        vec![
            "'forward' expects 1 argument, found 0".to_string(),
            "unknown command 'jump'".to_string(),
            "unclosed '[' in 'repeat'".to_string(),
        ]
    );
}

#[test]
fn equivalent_programs_render_identically() {
    let a = raster("repeat 4 [ fd 100 rt 90 ]");
    let b = raster("fd 100 rt 90 fd 100 rt 90 fd 100 rt 90 fd 100");
    assert_eq!(a.difference(&b), Ok(0));
}

#[test]
fn different_drawings_differ() {
    let square = raster("repeat 4 [ fd 100 rt 90 ]");
    let open = raster("repeat 3 [ fd 100 rt 90 ]");
    let red = raster("pencolor \"red\" repeat 4 [ fd 100 rt 90 ]");
    let missing_side = square.difference(&open).unwrap();
    assert!(missing_side > 0);
    assert!(square.difference(&red).unwrap() > missing_side);
}

#[test]
fn svg_contains_one_line_per_stroke() {
    let svg = run("repeat 5 [ fd 20 rt 72 ]").drawing.to_svg();
    assert_eq!(svg.matches("<line ").count(), 5);
    assert!(svg.contains(r#"width="1000" height="500""#));
}

#[test]
fn step_limit_stops_endless_loops() {
    let program = turtle::Parser::new("repeat 1000000 [ rt 1 ]".to_string(), 0)
        .parse()
        .unwrap();
    let limits = Limits {
        max_steps: 10_000,
        ..Limits::default()
    };
    let error = turtle::execute(&program, Canvas::default(), &limits).unwrap_err();
    assert_eq!(error.error, RuntimeError::StepLimit(10_000));
    assert_eq!(error.error.class(), turtle::ErrorClass::Time);
}

#[test]
fn absurdly_nested_parentheses_are_a_syntax_error() {
    let source = format!("fd {}1{}", "(".repeat(200_000), ")".repeat(200_000));
    assert_eq!(parse_errors(&source), vec!["expression nested too deeply"]);
}

#[test]
fn absurdly_nested_blocks_are_a_syntax_error() {
    let source = format!("{}fd 1{}", "repeat 1 [ ".repeat(100_000), " ]".repeat(100_000));
    assert_eq!(parse_errors(&source), vec!["blocks nested too deeply"]);
}

#[test]
fn moderate_nesting_still_parses() {
    let source = format!("fd {}1{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(run(&source).drawing.strokes.len(), 1);
}

#[test]
fn canvas_filling_pens_hit_the_render_budget() {
    let error = run_error("pensize 100000 repeat 2000 [ fd 1 ]");
    assert_eq!(error, RuntimeError::RenderLimit(Limits::default().max_render_cost));
    assert_eq!(error.class(), turtle::ErrorClass::Time);
}
