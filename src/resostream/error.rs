/*!
# Stream Error Handling

Error types for the streaming core. All fallible operations return
well-structured errors with enough context to log and act on.

## Error Categories

- **Configuration Errors**: invalid specs or engine settings, rejected
  synchronously at call time
- **Window Errors**: windowing operations on invalid or closed windows
- **Handler Errors**: failures raised by subscription handlers, contained
  inside the dispatch loop
- **Checkpoint Errors**: snapshot persistence failures
- **Recovery Errors**: no valid checkpoint found, or validation failed
- **Queue Errors**: operations against a closed work or delivery queue

Failures inside a single event handler, a single processing item, or a
single checkpoint save are contained by the owning worker loop and
surface only through logs and counters. Only configuration errors
propagate to the caller synchronously.
*/

use std::fmt;

/// Error type for all streaming core operations.
#[derive(Debug, Clone)]
pub enum StreamError {
    /// Invalid configuration, rejected before any processing starts.
    Configuration {
        /// Description of the invalid setting
        message: String,
    },

    /// Windowing operation failures.
    Window {
        /// Description of the failure
        message: String,
        /// Window kind involved, if known (TUMBLING_TIME, SESSION, ...)
        window_kind: Option<String>,
    },

    /// A subscription handler reported a failure.
    ///
    /// Produced by handlers and routed to the subscription's error
    /// handler; never escapes the dispatch worker.
    Handler {
        /// Description of the handler failure
        message: String,
        /// Id of the subscription whose handler failed, if known
        subscription_id: Option<String>,
    },

    /// A unit of work exceeded its processing deadline.
    ProcessingTimeout {
        /// Deadline that was exceeded, in milliseconds
        timeout_ms: u64,
    },

    /// Checkpoint persistence failure.
    Checkpoint {
        /// Description of the failure
        message: String,
        /// Storage key involved, if known
        key: Option<String>,
    },

    /// Recovery could not produce a usable checkpoint.
    Recovery {
        /// Why recovery failed ("no checkpoint found", validation details)
        reason: String,
    },

    /// Operation against a queue that has been closed for shutdown.
    QueueClosed {
        /// Name of the closed queue
        queue: String,
    },
}

impl StreamError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        StreamError::Configuration {
            message: message.into(),
        }
    }

    /// Create a window error with an optional window kind.
    pub fn window(message: impl Into<String>, window_kind: Option<String>) -> Self {
        StreamError::Window {
            message: message.into(),
            window_kind,
        }
    }

    /// Create a handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        StreamError::Handler {
            message: message.into(),
            subscription_id: None,
        }
    }

    /// Create a checkpoint error with an optional storage key.
    pub fn checkpoint(message: impl Into<String>, key: Option<String>) -> Self {
        StreamError::Checkpoint {
            message: message.into(),
            key,
        }
    }

    /// Create a recovery error.
    pub fn recovery(reason: impl Into<String>) -> Self {
        StreamError::Recovery {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            StreamError::Window {
                message,
                window_kind,
            } => {
                if let Some(kind) = window_kind {
                    write!(f, "Window error ({}): {}", kind, message)
                } else {
                    write!(f, "Window error: {}", message)
                }
            }
            StreamError::Handler {
                message,
                subscription_id,
            } => {
                if let Some(id) = subscription_id {
                    write!(f, "Handler error for subscription '{}': {}", id, message)
                } else {
                    write!(f, "Handler error: {}", message)
                }
            }
            StreamError::ProcessingTimeout { timeout_ms } => {
                write!(f, "Processing timed out after {}ms", timeout_ms)
            }
            StreamError::Checkpoint { message, key } => {
                if let Some(key) = key {
                    write!(f, "Checkpoint error for '{}': {}", key, message)
                } else {
                    write!(f, "Checkpoint error: {}", message)
                }
            }
            StreamError::Recovery { reason } => {
                write!(f, "Recovery failed: {}", reason)
            }
            StreamError::QueueClosed { queue } => {
                write!(f, "Queue '{}' is closed", queue)
            }
        }
    }
}

impl std::error::Error for StreamError {}

/// Result type alias for streaming core operations.
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::configuration("window size must be positive");
        assert_eq!(
            format!("{}", err),
            "Configuration error: window size must be positive"
        );

        let err = StreamError::window("window already expired", Some("SESSION".to_string()));
        assert_eq!(
            format!("{}", err),
            "Window error (SESSION): window already expired"
        );

        let err = StreamError::ProcessingTimeout { timeout_ms: 5000 };
        assert_eq!(format!("{}", err), "Processing timed out after 5000ms");
    }

    #[test]
    fn test_recovery_reason() {
        let err = StreamError::recovery("no checkpoint found for instance 'engine-1'");
        assert!(format!("{}", err).contains("no checkpoint found"));
    }

    #[test]
    fn test_error_is_std_error() {
        fn takes_error(_e: &dyn std::error::Error) {}
        let err = StreamError::checkpoint("disk full", Some("a-checkpoint-3".to_string()));
        takes_error(&err);
    }
}
