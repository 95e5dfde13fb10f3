//! Transfer type selection (TYPE command).

/// Representation type negotiated with TYPE. Content is streamed verbatim in
/// both modes; the setting is tracked per session for protocol compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    Ascii,
    #[default]
    Image,
}

impl TransferType {
    pub fn code(self) -> char {
        match self {
            TransferType::Ascii => 'A',
            TransferType::Image => 'I',
        }
    }

    /// Parse a TYPE argument; only `A` and `I` are supported.
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg.to_ascii_uppercase().as_str() {
            "A" => Some(TransferType::Ascii),
            "I" => Some(TransferType::Image),
            _ => None,
        }
    }
}
