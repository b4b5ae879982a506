#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The active strategy could not satisfy an allocation request.
    OutOfMemory,
    /// A caller-provided backing buffer is too small to be usable.
    InvalidBuffer,
    /// A custom-hooks strategy was constructed without both hook functions.
    MissingHook,
    /// The schema is empty or binds an unnamed leaf where a key is required.
    InvalidSchema,
    /// The input text is not syntactically valid JSON.
    Malformed,
    /// A named field was absent from the document under strict mode.
    MissingField,
    /// A document array holds more elements than the schema declares,
    /// under strict mode.
    TooManyElements,
    /// The output buffer cannot hold the printed document.
    BufferTooSmall,
}
