use std::fmt;

/// Which schema keyword rejected the data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    Type { expected: Vec<String> },
    Required { property: String },
    AdditionalProperties { property: String },
    Pattern { pattern: String },
    Enum,
    Minimum,
    Maximum,
    MinLength,
    MaxLength,
    MinItems,
    MaxItems,
    FalseSchema,
}

/// One failed check, located by a dotted data path (`""` is the root,
/// `.status`, `.friends[0]`, `['odd-key']`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub data_path: String,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub(crate) fn new(data_path: &str, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            data_path: data_path.to_string(),
            kind,
            message: message.into(),
        }
    }

    /// True when the data was rejected only because an array was required.
    pub fn expects_array(&self) -> bool {
        matches!(&self.kind, ViolationKind::Type { expected } if expected.iter().any(|t| t == "array"))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.data_path, self.message)
    }
}

pub(crate) fn child_property_path(base: &str, property: &str) -> String {
    let mut chars = property.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if identifier {
        format!("{base}.{property}")
    } else {
        format!("{base}['{}']", property.replace('\'', "\\'"))
    }
}

pub(crate) fn child_index_path(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}
