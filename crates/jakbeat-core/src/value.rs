use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Scalar(String),
    List(Vec<Value>),
    Option(OptionNode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionNode {
    pub name: String,
    pub value: Box<Value>,
}

impl OptionNode {
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Box::new(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub options: Vec<OptionNode>,
}

impl Section {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: Value) -> Self {
        self.options.push(OptionNode::new(name, value));
        self
    }
}

impl Value {
    #[must_use]
    pub fn scalar(text: impl Into<String>) -> Self {
        Self::Scalar(text.into())
    }

    #[must_use]
    pub fn option(name: impl Into<String>, value: Value) -> Self {
        Self::Option(OptionNode::new(name, value))
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::List(_) => "list",
            Self::Option(_) => "option",
        }
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(text) => Some(text),
            Self::List(_) | Self::Option(_) => None,
        }
    }

    /// Visits every scalar reachable from this node. Options rebind the key for
    /// their subtree; lists pass the inherited key to each child.
    pub fn walk<'a, F>(&'a self, key: Option<&'a str>, visitor: &mut F)
    where
        F: FnMut(Option<&'a str>, &'a str),
    {
        match self {
            Self::Scalar(text) => visitor(key, text),
            Self::List(values) => {
                for value in values {
                    value.walk(key, visitor);
                }
            }
            Self::Option(option) => option.value.walk(Some(option.name.as_str()), visitor),
        }
    }
}

/// Best-effort integer parse with `atoi` semantics: leading whitespace, an
/// optional sign and the longest digit prefix. Anything else yields 0.
#[must_use]
pub fn parse_int_lenient(text: &str) -> i32 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value = 0_i64;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(byte - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }

    i32::try_from(value.clamp(i64::from(i32::MIN), i64::from(i32::MAX))).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_parse_matches_atoi() {
        assert_eq!(parse_int_lenient("100"), 100);
        assert_eq!(parse_int_lenient("  -42"), -42);
        assert_eq!(parse_int_lenient("+7bpm"), 7);
        assert_eq!(parse_int_lenient("loud"), 0);
        assert_eq!(parse_int_lenient(""), 0);
        assert_eq!(parse_int_lenient("99999999999"), i32::MAX);
        assert_eq!(parse_int_lenient("-99999999999"), i32::MIN);
    }

    #[test]
    fn walk_rebinds_keys_through_options() {
        let params = Value::List(vec![
            Value::option("pan", Value::scalar("-30")),
            Value::option(
                "nested",
                Value::List(vec![Value::scalar("a"), Value::option("depth", Value::scalar("5"))]),
            ),
            Value::scalar("bare"),
        ]);

        let mut seen = Vec::new();
        params.walk(None, &mut |key, text| seen.push((key, text)));

        assert_eq!(
            seen,
            vec![
                (Some("pan"), "-30"),
                (Some("nested"), "a"),
                (Some("depth"), "5"),
                (None, "bare"),
            ]
        );
    }

    #[test]
    fn clone_is_deep() {
        let original = Value::List(vec![Value::option("pan", Value::scalar("10"))]);
        let mut copy = original.clone();
        if let Value::List(values) = &mut copy {
            values.push(Value::scalar("extra"));
        }
        assert_ne!(original, copy);
    }
}
