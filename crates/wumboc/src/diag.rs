use std::fmt;
use std::path::PathBuf;

use crate::span::Span;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

#[derive(Clone, Debug)]
pub struct Diag {
    pub level: Level,
    pub message: String,
    pub span: Span,
    pub path: Option<PathBuf>,
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            Level::Error => "error",
            Level::Warning => "warning",
        };
        match &self.path {
            Some(path) => write!(
                f,
                "{level}: {} ({}:{}:{})",
                self.message,
                path.display(),
                self.span.line,
                self.span.col
            ),
            None => write!(
                f,
                "{level}: {} ({}:{})",
                self.message, self.span.line, self.span.col
            ),
        }
    }
}

/// Sink for user-facing semantic errors. Reporting never aborts the caller;
/// it records the problem and the walk continues.
pub trait Reporter {
    fn report_error(&mut self, span: Span, message: &str);
    fn has_errors(&self) -> bool;
}

#[derive(Default, Debug)]
pub struct Diagnostics {
    diags: Vec<Diag>,
}

impl Diagnostics {
    pub fn error<S: Into<String>>(&mut self, span: Span, message: S) {
        self.diags.push(Diag {
            level: Level::Error,
            message: message.into(),
            span,
            path: None,
        });
    }

    pub fn warning<S: Into<String>>(&mut self, span: Span, message: S) {
        self.diags.push(Diag {
            level: Level::Warning,
            message: message.into(),
            span,
            path: None,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(|d| matches!(d.level, Level::Error))
    }

    pub fn len(&self) -> usize {
        self.diags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diag> {
        self.diags
    }

    pub fn extend(&mut self, other: Vec<Diag>) {
        self.diags.extend(other);
    }
}

impl Reporter for Diagnostics {
    fn report_error(&mut self, span: Span, message: &str) {
        self.error(span, message);
    }

    fn has_errors(&self) -> bool {
        Diagnostics::has_errors(self)
    }
}

/// Attaches `path` to every diagnostic that doesn't carry one yet.
pub fn with_path<P: Into<PathBuf>>(diags: Vec<Diag>, path: P) -> Vec<Diag> {
    let path = path.into();
    diags
        .into_iter()
        .map(|mut diag| {
            if diag.path.is_none() {
                diag.path = Some(path.clone());
            }
            diag
        })
        .collect()
}
