//! Minimal PromQL instant-vector selector model.

use std::fmt;

/// Label matching operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchOp {
    Equal,
    NotEqual,
    Regex,
    NotRegex,
}

impl MatchOp {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchOp::Equal => "=",
            MatchOp::NotEqual => "!=",
            MatchOp::Regex => "=~",
            MatchOp::NotRegex => "!~",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Matcher {
    pub name: String,
    pub op: MatchOp,
    pub value: String,
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}\"{}\"", self.name, self.op.as_str(), escape(&self.value))
    }
}

/// Metric name plus label matchers, e.g. `pg_up{datname!~"template.*"}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selector {
    pub metric: String,
    pub matchers: Vec<Matcher>,
}

impl Selector {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            matchers: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        self.matchers.push(Matcher {
            name: name.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, MatchOp::Equal, value)
    }

    pub fn ne(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, MatchOp::NotEqual, value)
    }

    pub fn re(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, MatchOp::Regex, value)
    }

    pub fn not_re(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(name, MatchOp::NotRegex, value)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.metric)?;
        if self.matchers.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, matcher) in self.matchers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{matcher}")?;
        }
        f.write_str("}")
    }
}

/// Escape a label value for a double-quoted PromQL string.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
