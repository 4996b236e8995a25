//! Error types for dispatch and the `TaskFailure` contract for work errors.

use turul_task_registry::{FailureDescriptor, RegistryError};

/// A failure a unit of work can raise.
///
/// The dispatcher records failures of asynchronous work as a
/// [`FailureDescriptor`]; implementors only need to say which kind they are
/// when the type name is not descriptive enough.
pub trait TaskFailure: std::error::Error + Send + 'static {
    /// The failure's kind. Defaults to the type name without its module path.
    fn kind(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }

    /// Optional numeric code (e.g. an HTTP or JSON-RPC status).
    fn code(&self) -> Option<i64> {
        None
    }

    /// Build the descriptor stored for a failed task.
    fn describe(&self) -> FailureDescriptor {
        FailureDescriptor {
            kind: self.kind(),
            message: self.to_string(),
            code: self.code(),
        }
    }
}

impl TaskFailure for std::io::Error {
    fn kind(&self) -> String {
        format!("io::{:?}", std::io::Error::kind(self))
    }
}

/// `a::b::Foo<c::Bar>` -> `Foo<c::Bar>`
fn short_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Errors surfaced to the caller of `Dispatcher::dispatch`.
///
/// `E` is the work's own failure type. On the synchronous path it comes back
/// untouched as `Work(e)`; on the asynchronous path it never reaches the
/// caller and is only visible as a `Failed` task in the registry.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError<E> {
    /// The dispatcher has no execution environment. Nothing was touched.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The task id is already tracked in some state. Nothing was touched.
    #[error("Duplicate request with the same task id found: {0}")]
    DuplicateTask(String),

    #[error("Task registry error: {0}")]
    Registry(RegistryError),

    #[error("{0}")]
    Work(E),
}

impl<E> DispatchError<E> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DispatchError::DuplicateTask(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DispatchError::Configuration(_))
    }

    /// The work's own failure, if that is what this error carries.
    pub fn into_work(self) -> Option<E> {
        match self {
            DispatchError::Work(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<RegistryError> for DispatchError<E> {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateTask(id) => DispatchError::DuplicateTask(id),
            other => DispatchError::Registry(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("custom failure: {0}")]
    struct CustomError(String);

    impl TaskFailure for CustomError {}

    #[derive(Debug, thiserror::Error)]
    #[error("not allowed")]
    struct Forbidden;

    impl TaskFailure for Forbidden {
        fn kind(&self) -> String {
            "Forbidden".to_string()
        }
        fn code(&self) -> Option<i64> {
            Some(403)
        }
    }

    #[test]
    fn test_default_kind_is_short_type_name() {
        let descriptor = CustomError("x".to_string()).describe();
        assert_eq!(descriptor.kind, "CustomError");
        assert_eq!(descriptor.message, "custom failure: x");
        assert_eq!(descriptor.code, None);
    }

    #[test]
    fn test_overridden_kind_and_code() {
        let descriptor = Forbidden.describe();
        assert_eq!(descriptor, FailureDescriptor::new("Forbidden", "not allowed").with_code(403));
    }

    #[test]
    fn test_io_error_kind() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing index");
        let descriptor = err.describe();
        assert_eq!(descriptor.kind, "io::NotFound");
        assert_eq!(descriptor.message, "missing index");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::Foo"), "Foo");
        assert_eq!(short_type_name("Foo"), "Foo");
        assert_eq!(short_type_name("a::Wrap<b::Inner>"), "Wrap<b::Inner>");
    }

    #[test]
    fn test_registry_error_conversion() {
        let dup: DispatchError<CustomError> = RegistryError::DuplicateTask("t3".to_string()).into();
        assert!(dup.is_duplicate());

        let other: DispatchError<CustomError> = RegistryError::CapacityReached(4).into();
        assert!(matches!(other, DispatchError::Registry(RegistryError::CapacityReached(4))));
    }

    #[test]
    fn test_into_work_preserves_original() {
        let err: DispatchError<CustomError> = DispatchError::Work(CustomError("x".to_string()));
        assert_eq!(err.to_string(), "custom failure: x");
        assert_eq!(err.into_work().unwrap().0, "x");

        let config: DispatchError<CustomError> = DispatchError::Configuration("gone".to_string());
        assert!(config.is_configuration());
        assert!(config.into_work().is_none());
    }
}
