use std::fmt;

/// Separator between menu lines on the gateway wire format.
pub const LINE_SEPARATOR: &str = "\r\n";

/// Shown for every internal failure; USSD screens have no room for diagnostics.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Whether the gateway keeps the dialog open after rendering the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// `CON`: await more input
    Continue,
    /// `END`: close the dialog
    End,
}

impl ResponseKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ResponseKind::Continue => "CON ",
            ResponseKind::End => "END ",
        }
    }
}

/// Text returned to the gateway. `Display` renders the wire form, e.g.
/// `CON Welcome to Be.Well\r\n1. ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UssdResponse {
    pub kind: ResponseKind,
    pub body: String,
}

impl UssdResponse {
    pub fn con(body: impl Into<String>) -> Self {
        UssdResponse { kind: ResponseKind::Continue, body: body.into() }
    }

    pub fn end(body: impl Into<String>) -> Self {
        UssdResponse { kind: ResponseKind::End, body: body.into() }
    }

    /// A `CON` response made of menu lines.
    pub fn con_lines(lines: &[&str]) -> Self {
        Self::con(lines.join(LINE_SEPARATOR))
    }

    pub fn end_lines(lines: &[&str]) -> Self {
        Self::end(lines.join(LINE_SEPARATOR))
    }

    pub fn generic_failure() -> Self {
        Self::end(GENERIC_FAILURE)
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == ResponseKind::End
    }
}

impl fmt::Display for UssdResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.body)
    }
}
