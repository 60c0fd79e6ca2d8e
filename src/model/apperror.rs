use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    /**
     * Failure while starting the application.
     */
    Initialization,
    /**
     * Malformed or out of range input, including non-positive ids.
     */
    Validation,
    /**
     * The id is valid, but no ship exists with it.
     */
    NotFound,
    /**
     * Unclassified failure in the store.
     */
    DatabaseError,
    /**
     * The store did something it should never do.
     */
    Application,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message }
    }

    /**
     * Shorthand for a validation error.
     */
    pub fn validation(message: &str) -> Self {
        ApplicationError::new(ErrorType::Validation, message.to_string())
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
