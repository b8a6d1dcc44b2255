use std::fmt::{Display, Formatter};

/// The error type returned by [`ProvisioningEngine`](super::ProvisioningEngine) implementations.
#[derive(Debug)]
pub struct EngineError {
    /// A message included in the formatted display before `inner`.
    context: Option<String>,

    /// The error that caused this error.
    inner: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn new_with_source_and_context<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            context: Some(context.into()),
            inner: Some(source.into()),
        }
    }

    pub fn new_with_context<S>(context: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            context: Some(context.into()),
            inner: None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn inner(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.inner.as_ref().map(|some| some.as_ref())
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.context(), self.inner()) {
            (Some(context), Some(inner)) => write!(f, "{}: {}", context, inner),
            (Some(context), None) => write!(f, "{}", context),
            (None, Some(inner)) => write!(f, "{}", inner),
            (None, None) => write!(f, "Unknown engine error"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Converts errors and options to `EngineError` with a familiar `context` function.
pub trait IntoEngineError<T> {
    fn context<S>(self, message: S) -> EngineResult<T>
    where
        S: Into<String>;
}

impl<T, E> IntoEngineError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S>(self, message: S) -> EngineResult<T>
    where
        S: Into<String>,
    {
        self.map_err(|e| EngineError::new_with_source_and_context(message, e))
    }
}

// `None` becomes an error.
impl<T> IntoEngineError<T> for std::option::Option<T> {
    fn context<S>(self, message: S) -> EngineResult<T>
    where
        S: Into<String>,
    {
        self.ok_or_else(|| EngineError::new_with_context(message))
    }
}
