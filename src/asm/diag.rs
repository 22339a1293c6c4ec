use thiserror::Error;

use super::line::LineError;

/// A problem found in one source line. `line` is 0-based.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum AsmError {
    #[error("syntax error in line {}: {reason}", .line + 1)]
    Syntax { line: usize, reason: LineError },
    #[error("duplicate label `{label}` in line {}, first defined at address {first}", .line + 1)]
    DuplicateLabel {
        line: usize,
        label: String,
        first: u32,
    },
    #[error("use of undefined label `{symbol}` in line {}", .line + 1)]
    UndefinedSymbol { line: usize, symbol: String },
    #[error("label `{symbol}` in line {} is {distance} words away, too far for an offset", .line + 1)]
    OutOfReach {
        line: usize,
        symbol: String,
        distance: i64,
    },
}

impl AsmError {
    pub fn line(&self) -> usize {
        match self {
            AsmError::Syntax { line, .. }
            | AsmError::DuplicateLabel { line, .. }
            | AsmError::UndefinedSymbol { line, .. }
            | AsmError::OutOfReach { line, .. } => *line,
        }
    }
}

/// Raised once more errors were reported than the configured limit allows.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
#[error("too many errors ({count}, limit is {limit}); abandoning assembly")]
pub struct ErrorLimitExceeded {
    pub count: usize,
    pub limit: usize,
}

/// Error sink for one assembly run.
///
/// Processing continues after each error, so several problems can be reported at once, until
/// the count exceeds `limit`.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    limit: usize,
    errors: Vec<AsmError>,
}

impl Diagnostics {
    pub fn new(limit: usize) -> Self {
        Diagnostics {
            limit,
            errors: Vec::new(),
        }
    }

    pub fn report(&mut self, err: AsmError) -> Result<(), ErrorLimitExceeded> {
        self.errors.push(err);
        if self.errors.len() > self.limit {
            return Err(ErrorLimitExceeded {
                count: self.errors.len(),
                limit: self.limit,
            });
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn errors(&self) -> &[AsmError] {
        &self.errors
    }
}
