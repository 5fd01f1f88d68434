use std::fmt;

/// Status flag of one asynchronous operation.
///
/// Views expose `Option<FetchStatus>`: `None` means idle or settled
/// successfully, which lets the renderer tell "loading", "errored" and
/// "successfully empty" apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Loading,
    Error,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
