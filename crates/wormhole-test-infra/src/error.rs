use thiserror::Error;

/// Errors that can occur while starting test containers.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("{service} did not become ready after {attempts} attempts")]
    NotReady { service: &'static str, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
