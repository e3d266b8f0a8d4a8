use crate::schema::AttributeType;
use crate::types::Dynamic;
use regex::Regex;
use std::fmt;

/// Declarative check attached to a single attribute
#[derive(Debug, Clone)]
pub enum ValidationRule {
    /// Full-string match
    Regex(Pattern),
    /// Case-sensitive membership
    Enum(Vec<String>),
    /// Inclusive bounds, either side optional
    Range { min: Option<i64>, max: Option<i64> },
    /// Character count for strings, element count for lists
    MinLength(usize),
}

/// A regex compiled for whole-value matching that remembers its source
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    anchored: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            anchored,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_full_match(&self, value: &str) -> bool {
        self.anchored.is_match(value)
    }
}

impl ValidationRule {
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Pattern::new(pattern).map(ValidationRule::Regex)
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValidationRule::Enum(values.into_iter().map(Into::into).collect())
    }

    pub fn range(min: i64, max: i64) -> Self {
        ValidationRule::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: i64) -> Self {
        ValidationRule::Range {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: i64) -> Self {
        ValidationRule::Range {
            min: None,
            max: Some(max),
        }
    }

    pub fn min_length(n: usize) -> Self {
        ValidationRule::MinLength(n)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValidationRule::Regex(_) => "regex",
            ValidationRule::Enum(_) => "enum",
            ValidationRule::Range { .. } => "range",
            ValidationRule::MinLength(_) => "min_length",
        }
    }

    /// Whether the rule can be evaluated against values of `kind`
    pub fn applies_to(&self, kind: &AttributeType) -> bool {
        match self {
            ValidationRule::Regex(_) | ValidationRule::Enum(_) => {
                matches!(kind, AttributeType::String)
            }
            ValidationRule::Range { .. } => matches!(kind, AttributeType::Int),
            ValidationRule::MinLength(_) => {
                matches!(kind, AttributeType::String | AttributeType::List(_))
            }
        }
    }

    /// Evaluate the rule. Null and unknown values always pass; values of a
    /// kind the rule does not cover are left to type checking.
    pub fn check(&self, value: &Dynamic) -> Result<(), String> {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => Ok(()),
            (ValidationRule::Regex(pattern), Dynamic::String(s)) => {
                if pattern.is_full_match(s) {
                    Ok(())
                } else {
                    Err(format!(
                        "value {:?} does not match pattern {}",
                        s,
                        pattern.as_str()
                    ))
                }
            }
            (ValidationRule::Enum(allowed), Dynamic::String(s)) => {
                if allowed.iter().any(|a| a == s) {
                    Ok(())
                } else {
                    Err(format!(
                        "value {:?} must be one of: {}",
                        s,
                        allowed.join(", ")
                    ))
                }
            }
            (ValidationRule::Range { min, max }, Dynamic::Int(n)) => {
                let below = min.is_some_and(|min| *n < min);
                let above = max.is_some_and(|max| *n > max);
                if !below && !above {
                    return Ok(());
                }
                Err(match (min, max) {
                    (Some(min), Some(max)) => {
                        format!("must be between {} and {}, got {}", min, max, n)
                    }
                    (Some(min), None) => format!("must be at least {}, got {}", min, n),
                    (None, Some(max)) => format!("must be at most {}, got {}", max, n),
                    (None, None) => format!("out of range, got {}", n),
                })
            }
            (ValidationRule::MinLength(min), Dynamic::String(s)) => {
                let len = s.chars().count();
                if len >= *min {
                    Ok(())
                } else {
                    Err(format!(
                        "must have at least {} characters, got {}",
                        min, len
                    ))
                }
            }
            (ValidationRule::MinLength(min), Dynamic::List(items)) => {
                if items.len() >= *min {
                    Ok(())
                } else {
                    Err(format!(
                        "must have at least {} elements, got {}",
                        min,
                        items.len()
                    ))
                }
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationRule::Regex(p) => write!(f, "matches {}", p.as_str()),
            ValidationRule::Enum(values) => write!(f, "one of: {}", values.join(", ")),
            ValidationRule::Range { min, max } => match (min, max) {
                (Some(min), Some(max)) => write!(f, "between {} and {}", min, max),
                (Some(min), None) => write!(f, "at least {}", min),
                (None, Some(max)) => write!(f, "at most {}", max),
                (None, None) => write!(f, "any integer"),
            },
            ValidationRule::MinLength(n) => write!(f, "length at least {}", n),
        }
    }
}
