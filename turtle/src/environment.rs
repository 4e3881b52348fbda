use std::collections::HashMap;
use std::fmt;

/// A value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Boolean(_) => "boolean",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Boolean(b) => *b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.is_finite() && *n == n.floor() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Variables live in a stack of frames: the global frame at the bottom and
/// one frame per active procedure call. Lookups search from the innermost
/// frame outwards (dynamic scoping).
#[derive(Debug)]
pub struct Environment {
    frames: Vec<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push_frame(&mut self, parameters: HashMap<String, Value>) {
        self.frames.push(parameters);
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of procedure frames above the global one.
    pub fn call_depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Update the innermost existing binding of `name`; a new variable goes
    /// into the current frame.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(frame) = self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.contains_key(name))
        {
            frame.insert(name.to_string(), value);
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let mut env = Environment::new();
        env.set("size", Value::Number(10.0));
        env.push_frame(HashMap::from([("size".to_string(), Value::Number(3.0))]));
        assert_eq!(env.get("size"), Some(&Value::Number(3.0)));
        env.pop_frame();
        assert_eq!(env.get("size"), Some(&Value::Number(10.0)));
    }

    #[test]
    fn assignment_updates_existing_binding() {
        let mut env = Environment::new();
        env.set("count", Value::Number(1.0));
        env.push_frame(HashMap::new());
        env.set("count", Value::Number(2.0));
        env.set("local", Value::Boolean(true));
        env.pop_frame();
        assert_eq!(env.get("count"), Some(&Value::Number(2.0)));
        assert_eq!(env.get("local"), None);
    }

    #[test]
    fn global_frame_is_never_popped() {
        let mut env = Environment::new();
        env.pop_frame();
        assert_eq!(env.call_depth(), 0);
    }

    #[test]
    fn display_integers_without_fraction() {
        assert_eq!(Value::Number(4.0).to_string(), "4");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Text("hi".into()).to_string(), "hi");
    }
}
