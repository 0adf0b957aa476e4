//! Structured task logging utilities.
//!
//! Provides consistent, structured logging for task processing with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use vod_models::TaskId;

/// Task logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task_id: String,
    operation: String,
}

impl TaskLogger {
    /// Create a new task logger for a specific task and operation.
    pub fn new(task_id: &TaskId, operation: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Create a new task logger from a string task ID.
    pub fn from_string(task_id: &str, operation: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            operation = %self.operation,
            "task started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            operation = %self.operation,
            "task progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            task_id = %self.task_id,
            operation = %self.operation,
            "task warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            task_id = %self.task_id,
            operation = %self.operation,
            "task error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            operation = %self.operation,
            "task completed: {}", message
        );
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Creates a tracing span for this task, for attaching further
    /// structured fields at pipeline stage boundaries.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "task",
            task_id = %self.task_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_logger_creation() {
        let task_id = TaskId::new();
        let logger = TaskLogger::new(&task_id, "test_operation");

        assert_eq!(logger.task_id(), task_id.to_string());
        assert_eq!(logger.operation(), "test_operation");
    }

    #[test]
    fn test_task_logger_from_string() {
        let logger = TaskLogger::from_string("test-task-123", "pipeline");

        assert_eq!(logger.task_id(), "test-task-123");
        assert_eq!(logger.operation(), "pipeline");
    }
}
