use super::ValidationError;

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        Self::Expectation(message.to_owned())
    }
}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        Self::Expectation(message)
    }
}
