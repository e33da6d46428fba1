use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("container runtime error: {0}")]
    Runtime(String),
    #[error("image pull failed: {image}: {message}")]
    ImagePull { image: String, message: String },
    #[error("dispatcher is not running")]
    DispatcherUnavailable,
    #[error("internal error: {0}")]
    Internal(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl SchedulerError {
    pub fn runtime_error<S: Into<String>>(msg: S) -> Self {
        Self::Runtime(msg.into())
    }
    pub fn image_pull<I: Into<String>, S: Into<String>>(image: I, msg: S) -> Self {
        Self::ImagePull {
            image: image.into(),
            message: msg.into(),
        }
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests;
