use serde::Serialize;

pub type Result<T> = std::result::Result<T, DiagramError>;

/// Everything that can go wrong while building, laying out or routing a diagram.
///
/// Only [`DiagramError::DuplicateId`] is fatal, and only at build time (see
/// [`BuildError`]). Everything else is recorded as a diagnostic and the pass
/// continues with a documented fallback.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagramError {
    #[error("node `{id}` has unrecognized type `{kind}`; substituted a rect leaf")]
    InvalidNodeKind { id: String, kind: String },

    #[error("edge `{edge}` references unknown node `{id}`")]
    UnresolvedEndpoint { edge: String, id: String },

    #[error("edge `{edge}` is invalid: {reason}")]
    InvalidEdge { edge: String, reason: String },

    #[error("could not measure content of `{id}`; using the default size")]
    MeasurementFailure { id: String },

    #[error("duplicate node id `{id}`")]
    DuplicateId { id: String },

    #[error("child `{child}` of `{parent}` has no usable role")]
    InvalidRole { parent: String, child: String },

    #[error("node `{id}`: invalid {option} `{value}`, using `{fallback}`")]
    InvalidLayoutOption {
        id: String,
        option: String,
        value: String,
        fallback: String,
    },

    #[error("node `{id}` generates its own children; ignored {count} explicit child(ren)")]
    IgnoredChildren { id: String, count: usize },

    #[error("setting `{name}` must not be negative (got {value}); clamped to 0")]
    InvalidSetting { name: String, value: f32 },

    #[error("unknown node `{0}`")]
    UnknownNode(String),

    #[error("node `{0}` is not a container")]
    NotAContainer(String),

    #[error("node `{0}` has a fixed layout and cannot take this child")]
    FixedLayout(String),

    #[error("node `{0}` is not a top-level node")]
    NotTopLevel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl DiagramError {
    /// Stable machine-readable name, used in layout dumps.
    pub fn code(&self) -> &'static str {
        match self {
            DiagramError::InvalidNodeKind { .. } => "InvalidNodeKind",
            DiagramError::UnresolvedEndpoint { .. } => "UnresolvedEndpoint",
            DiagramError::InvalidEdge { .. } => "InvalidEdge",
            DiagramError::MeasurementFailure { .. } => "MeasurementFailure",
            DiagramError::DuplicateId { .. } => "DuplicateId",
            DiagramError::InvalidRole { .. } => "InvalidRole",
            DiagramError::InvalidLayoutOption { .. } => "InvalidLayoutOption",
            DiagramError::IgnoredChildren { .. } => "IgnoredChildren",
            DiagramError::InvalidSetting { .. } => "InvalidSetting",
            DiagramError::UnknownNode(_) => "UnknownNode",
            DiagramError::NotAContainer(_) => "NotAContainer",
            DiagramError::FixedLayout(_) => "FixedLayout",
            DiagramError::NotTopLevel(_) => "NotTopLevel",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagramError::InvalidNodeKind { .. }
            | DiagramError::DuplicateId { .. }
            | DiagramError::UnresolvedEndpoint { .. }
            | DiagramError::InvalidEdge { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

/// Fatal ingestion failure: the id index cannot be trusted, or a grafted
/// subtree was rejected as a whole.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("{} duplicate node id(s): {}", .0.len(), format_ids(.0))]
    DuplicateIds(Vec<DiagramError>),

    /// A mutation refused before touching the tree.
    #[error(transparent)]
    Rejected(#[from] DiagramError),
}

fn format_ids(errors: &[DiagramError]) -> String {
    errors
        .iter()
        .filter_map(|err| match err {
            DiagramError::DuplicateId { id } => Some(id.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered, de-duplicated collection of non-fatal diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<DiagramError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic once; repeated passes report the same condition again.
    pub fn push(&mut self, error: DiagramError) {
        if self.entries.contains(&error) {
            return;
        }
        tracing::warn!(code = error.code(), "{error}");
        self.entries.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = DiagramError>) {
        for error in errors {
            self.push(error);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagramError> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|err| err.severity() == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<DiagramError> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagramError;
    type IntoIter = std::slice::Iter<'a, DiagramError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_are_deduplicated() {
        let mut diagnostics = Diagnostics::new();
        let err = DiagramError::MeasurementFailure { id: "a".into() };
        diagnostics.push(err.clone());
        diagnostics.push(err);
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn build_error_lists_ids() {
        let err = BuildError::DuplicateIds(vec![
            DiagramError::DuplicateId { id: "a".into() },
            DiagramError::DuplicateId { id: "b".into() },
        ]);
        assert_eq!(err.to_string(), "2 duplicate node id(s): a, b");
    }

    #[test]
    fn severity_split() {
        assert_eq!(
            DiagramError::UnresolvedEndpoint {
                edge: "e".into(),
                id: "x".into()
            }
            .severity(),
            Severity::Error
        );
        assert_eq!(
            DiagramError::InvalidSetting {
                name: "nodeSpacing.vertical".into(),
                value: -1.0
            }
            .severity(),
            Severity::Warning
        );
    }
}
