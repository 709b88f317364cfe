//! Markup diagnostics and parse errors.

use core::fmt;

/// How a diagnostic affects the running parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The offending construct was skipped; parsing continued.
    Warning,
    /// Parsing stopped; lines built so far were kept.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Fatal => f.write_str("fatal"),
        }
    }
}

/// Typed classification of markup problems.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkupErrorKind {
    /// `<>` or `</>` with no name.
    EmptyTagName,
    /// Quoted attribute value without a closing quote.
    UnterminatedQuote,
    /// Closing tag does not match the innermost open tag.
    MismatchedClosingTag,
    /// Tag name outside the recognized vocabulary.
    UnknownTag,
    /// Style property outside the recognized set.
    UnknownProperty,
    /// Recognized property with a value that could not be interpreted.
    InvalidPropertyValue,
    /// Tag nesting exceeded the tag stack capacity.
    NestingTooDeep,
    /// Tag start delimiter without a matching tag end delimiter.
    UnterminatedTag,
    /// Escape sequence name not present in the escape table.
    UnknownEscape,
    /// Tag still open at end of input (auto-closed).
    UnclosedTag,
}

impl MarkupErrorKind {
    /// Stable machine-readable code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::EmptyTagName => "MARKUP_EMPTY_TAG_NAME",
            Self::UnterminatedQuote => "MARKUP_UNTERMINATED_QUOTE",
            Self::MismatchedClosingTag => "MARKUP_MISMATCHED_CLOSING_TAG",
            Self::UnknownTag => "MARKUP_UNKNOWN_TAG",
            Self::UnknownProperty => "MARKUP_UNKNOWN_PROPERTY",
            Self::InvalidPropertyValue => "MARKUP_INVALID_PROPERTY_VALUE",
            Self::NestingTooDeep => "MARKUP_NESTING_TOO_DEEP",
            Self::UnterminatedTag => "MARKUP_UNTERMINATED_TAG",
            Self::UnknownEscape => "MARKUP_UNKNOWN_ESCAPE",
            Self::UnclosedTag => "MARKUP_UNCLOSED_TAG",
        }
    }

    /// Default severity when this problem is met during a parse.
    pub const fn severity(self) -> Severity {
        match self {
            Self::MismatchedClosingTag | Self::NestingTooDeep | Self::UnterminatedTag => {
                Severity::Fatal
            }
            Self::EmptyTagName
            | Self::UnterminatedQuote
            | Self::UnknownTag
            | Self::UnknownProperty
            | Self::InvalidPropertyValue
            | Self::UnknownEscape
            | Self::UnclosedTag => Severity::Warning,
        }
    }
}

/// Structured markup error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupError {
    /// Typed error kind.
    pub kind: MarkupErrorKind,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional byte offset into the source text.
    pub offset: Option<usize>,
    /// Optional tag or property name context.
    pub tag: Option<Box<str>>,
}

impl MarkupError {
    pub(crate) fn new(kind: MarkupErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: message.into().into_boxed_str(),
            offset: None,
            tag: None,
        }
    }

    pub(crate) fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into().into_boxed_str());
        self
    }

    /// Severity implied by the error kind.
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(tag) = self.tag.as_deref() {
            write!(f, " [tag={}]", tag)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " [offset={}]", offset)?;
        }
        Ok(())
    }
}

impl std::error::Error for MarkupError {}

/// Diagnostic delivered to the sink and recorded on the layout outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupDiagnostic {
    /// Effect on the running parse.
    pub severity: Severity,
    /// Underlying error.
    pub error: MarkupError,
}

impl MarkupDiagnostic {
    pub(crate) fn from_error(error: MarkupError) -> Self {
        Self {
            severity: error.severity(),
            error,
        }
    }
}

impl fmt::Display for MarkupDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_tag_and_offset() {
        let err = MarkupError::new(MarkupErrorKind::MismatchedClosingTag, "expected </b>")
            .with_tag("i")
            .with_offset(12);
        assert_eq!(
            err.to_string(),
            "MARKUP_MISMATCHED_CLOSING_TAG: expected </b> [tag=i] [offset=12]"
        );
        assert_eq!(err.severity(), Severity::Fatal);
    }

    #[test]
    fn unknown_constructs_are_warnings() {
        for kind in [
            MarkupErrorKind::UnknownTag,
            MarkupErrorKind::UnknownProperty,
            MarkupErrorKind::UnknownEscape,
            MarkupErrorKind::EmptyTagName,
            MarkupErrorKind::UnterminatedQuote,
            MarkupErrorKind::UnclosedTag,
        ] {
            assert_eq!(kind.severity(), Severity::Warning, "{:?}", kind);
        }
    }

    #[test]
    fn diagnostic_inherits_kind_severity() {
        let diag = MarkupDiagnostic::from_error(MarkupError::new(
            MarkupErrorKind::NestingTooDeep,
            "too deep",
        ));
        assert_eq!(diag.severity, Severity::Fatal);
        assert!(diag.to_string().starts_with("fatal: MARKUP_NESTING_TOO_DEEP"));
    }
}
