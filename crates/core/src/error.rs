/// Coarse classification shared by every layer's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input such as topic text or a missing section.
    Validation,
    /// The caller lacks the admin role.
    Permission,
    /// A remote read or write failed.
    Store,
    /// A referenced topic, section or user does not exist.
    NotFound,
    /// No user is signed in.
    Unauthenticated,
}

impl ErrorKind {
    /// Store failures may succeed on a later attempt; the rest need new input.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Store)
    }
}
