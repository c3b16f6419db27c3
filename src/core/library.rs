use std::fmt;
use std::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum QueueError {
    // A patron already has a Waiting or Ready hold for the same title.
    DuplicateHold {
        message: String,
    },
    // The catalog reports the title does not take holds.
    TitleNotEligible {
        message: String,
    },
    NotFound {
        message: String,
    },
    // Fulfill requires a Ready hold.
    HoldNotReady {
        message: String,
    },
    // The pickup window elapsed before the hold was fulfilled.
    HoldExpired {
        message: String,
    },
    HoldAlreadyTerminal {
        message: String,
    },
    // Hold store I/O failure. When retryable the caller may retry with
    // backoff after releasing any per-title critical section.
    StoreUnavailable {
        message: String,
        reason_code: Option<String>,
        retryable: bool,
    },
    Serialization {
        message: String,
    },
    Runtime {
        message: String,
        reason_code: Option<String>,
    },
}

impl QueueError {
    pub fn duplicate_hold(message: &str) -> QueueError {
        QueueError::DuplicateHold { message: message.to_string() }
    }

    pub fn title_not_eligible(message: &str) -> QueueError {
        QueueError::TitleNotEligible { message: message.to_string() }
    }

    pub fn not_found(message: &str) -> QueueError {
        QueueError::NotFound { message: message.to_string() }
    }

    pub fn not_ready(message: &str) -> QueueError {
        QueueError::HoldNotReady { message: message.to_string() }
    }

    pub fn expired(message: &str) -> QueueError {
        QueueError::HoldExpired { message: message.to_string() }
    }

    pub fn already_terminal(message: &str) -> QueueError {
        QueueError::HoldAlreadyTerminal { message: message.to_string() }
    }

    pub fn store_unavailable(message: &str, reason_code: Option<String>, retryable: bool) -> QueueError {
        QueueError::StoreUnavailable { message: message.to_string(), reason_code, retryable }
    }

    pub fn serialization(message: &str) -> QueueError {
        QueueError::Serialization { message: message.to_string() }
    }

    pub fn runtime(message: &str, reason_code: Option<String>) -> QueueError {
        QueueError::Runtime { message: message.to_string(), reason_code }
    }

    pub fn retryable(&self) -> bool {
        match self {
            QueueError::DuplicateHold { .. } => { false }
            QueueError::TitleNotEligible { .. } => { false }
            QueueError::NotFound { .. } => { false }
            QueueError::HoldNotReady { .. } => { false }
            QueueError::HoldExpired { .. } => { false }
            QueueError::HoldAlreadyTerminal { .. } => { false }
            QueueError::StoreUnavailable { retryable, .. } => { *retryable }
            QueueError::Serialization { .. } => { false }
            QueueError::Runtime { .. } => { false }
        }
    }
}

impl From<std::io::Error> for QueueError {
    fn from(err: std::io::Error) -> Self {
        QueueError::store_unavailable(
            format!("store io {:?}", err).as_str(), None, true)
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::serialization(
            format!("serde json parsing {:?}", err).as_str())
    }
}

impl Display for QueueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::DuplicateHold { message } => {
                write!(f, "{}", message)
            }
            QueueError::TitleNotEligible { message } => {
                write!(f, "{}", message)
            }
            QueueError::NotFound { message } => {
                write!(f, "{}", message)
            }
            QueueError::HoldNotReady { message } => {
                write!(f, "{}", message)
            }
            QueueError::HoldExpired { message } => {
                write!(f, "{}", message)
            }
            QueueError::HoldAlreadyTerminal { message } => {
                write!(f, "{}", message)
            }
            QueueError::StoreUnavailable { message, reason_code, retryable } => {
                write!(f, "{} {:?} {}", message, reason_code, retryable)
            }
            QueueError::Serialization { message } => {
                write!(f, "{}", message)
            }
            QueueError::Runtime { message, reason_code } => {
                write!(f, "{} {:?}", message, reason_code)
            }
        }
    }
}

/// A specialized Result type for queue-engine operations.
pub type QueueResult<T> = Result<T, QueueError>;

// It defines abstraction for paginated result
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    // The page number or token
    pub page: Option<String>,
    // page size
    pub page_size: usize,
    // Next page if available
    pub next_page: Option<String>,
    // list of records
    pub records: Vec<T>,
}

impl<T> PaginatedResult<T> {
    pub fn new(page: Option<&str>, page_size: usize,
               next_page: Option<String>, records: Vec<T>) -> Self {
        PaginatedResult {
            page: page.map(str::to_string),
            page_size,
            next_page,
            records,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum HoldStatus {
    Waiting,
    Ready,
    Fulfilled,
    CancelledByPatron,
    CancelledByTimeout,
}

impl HoldStatus {
    // Fulfilled and both cancellations are terminal; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self,
            HoldStatus::Fulfilled | HoldStatus::CancelledByPatron | HoldStatus::CancelledByTimeout)
    }

    // Waiting and Ready holds count against the one-active-hold-per-patron rule.
    pub fn is_active(&self) -> bool {
        matches!(self, HoldStatus::Waiting | HoldStatus::Ready)
    }
}

impl From<String> for HoldStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Waiting" => HoldStatus::Waiting,
            "Ready" => HoldStatus::Ready,
            "Fulfilled" => HoldStatus::Fulfilled,
            "CancelledByPatron" => HoldStatus::CancelledByPatron,
            "CancelledByTimeout" => HoldStatus::CancelledByTimeout,
            _ => HoldStatus::Waiting,
        }
    }
}

impl Display for HoldStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            HoldStatus::Waiting => write!(f, "Waiting"),
            HoldStatus::Ready => write!(f, "Ready"),
            HoldStatus::Fulfilled => write!(f, "Fulfilled"),
            HoldStatus::CancelledByPatron => write!(f, "CancelledByPatron"),
            HoldStatus::CancelledByTimeout => write!(f, "CancelledByTimeout"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum CancelActor {
    Patron,
    Staff,
}

impl Display for CancelActor {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            CancelActor::Patron => write!(f, "patron"),
            CancelActor::Staff => write!(f, "staff"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::library::{CancelActor, HoldStatus, QueueError};

    #[tokio::test]
    async fn test_should_create_duplicate_hold_error() {
        assert!(matches!(QueueError::duplicate_hold("test"), QueueError::DuplicateHold { message: _ }));
    }

    #[tokio::test]
    async fn test_should_create_title_not_eligible_error() {
        assert!(matches!(QueueError::title_not_eligible("test"), QueueError::TitleNotEligible { message: _ }));
    }

    #[tokio::test]
    async fn test_should_create_not_found_error() {
        assert!(matches!(QueueError::not_found("test"), QueueError::NotFound { message: _ }));
    }

    #[tokio::test]
    async fn test_should_create_not_ready_error() {
        assert!(matches!(QueueError::not_ready("test"), QueueError::HoldNotReady { message: _ }));
    }

    #[tokio::test]
    async fn test_should_create_expired_error() {
        assert!(matches!(QueueError::expired("test"), QueueError::HoldExpired { message: _ }));
    }

    #[tokio::test]
    async fn test_should_create_already_terminal_error() {
        assert!(matches!(QueueError::already_terminal("test"), QueueError::HoldAlreadyTerminal { message: _ }));
    }

    #[tokio::test]
    async fn test_should_create_store_unavailable_error() {
        assert!(matches!(QueueError::store_unavailable("test", None, false),
            QueueError::StoreUnavailable { message: _, reason_code: _, retryable: _ }));
    }

    #[tokio::test]
    async fn test_should_create_retryable_error() {
        assert_eq!(false, QueueError::duplicate_hold("test").retryable());
        assert_eq!(false, QueueError::title_not_eligible("test").retryable());
        assert_eq!(false, QueueError::not_found("test").retryable());
        assert_eq!(false, QueueError::not_ready("test").retryable());
        assert_eq!(false, QueueError::expired("test").retryable());
        assert_eq!(false, QueueError::already_terminal("test").retryable());
        assert_eq!(false, QueueError::store_unavailable("test", None, false).retryable());
        assert_eq!(true, QueueError::store_unavailable("test", None, true).retryable());
        assert_eq!(false, QueueError::serialization("test").retryable());
        assert_eq!(false, QueueError::runtime("test", None).retryable());
    }

    #[tokio::test]
    async fn test_should_format_hold_status() {
        let statuses = vec![
            HoldStatus::Waiting,
            HoldStatus::Ready,
            HoldStatus::Fulfilled,
            HoldStatus::CancelledByPatron,
            HoldStatus::CancelledByTimeout,
        ];
        for status in statuses {
            let str = status.to_string();
            let str_status = HoldStatus::from(str);
            assert_eq!(status, str_status);
        }
    }

    #[tokio::test]
    async fn test_should_classify_terminal_statuses() {
        assert!(!HoldStatus::Waiting.is_terminal());
        assert!(!HoldStatus::Ready.is_terminal());
        assert!(HoldStatus::Fulfilled.is_terminal());
        assert!(HoldStatus::CancelledByPatron.is_terminal());
        assert!(HoldStatus::CancelledByTimeout.is_terminal());
        assert!(HoldStatus::Waiting.is_active());
        assert!(HoldStatus::Ready.is_active());
        assert!(!HoldStatus::Fulfilled.is_active());
    }

    #[tokio::test]
    async fn test_should_format_cancel_actor() {
        assert_eq!("patron", CancelActor::Patron.to_string());
        assert_eq!("staff", CancelActor::Staff.to_string());
    }
}
