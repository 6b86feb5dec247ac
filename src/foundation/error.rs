use crate::foundation::core::NodeId;

pub type StagecraftResult<T> = Result<T, StagecraftError>;

#[derive(thiserror::Error, Debug)]
pub enum StagecraftError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("node locked: {0}")]
    NodeLocked(NodeId),

    #[error("cycle detected: cannot reparent {node} under {new_parent}")]
    CycleDetected { node: NodeId, new_parent: NodeId },

    #[error("stale reference: {0}")]
    StaleReference(String),

    #[error("invalid transaction state: {0}")]
    InvalidTransactionState(String),

    #[error("duplicate name: {0}")]
    DuplicateName(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagecraftError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn stale(msg: impl Into<String>) -> Self {
        Self::StaleReference(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::InvalidTransactionState(msg.into())
    }

    pub fn duplicate_name(msg: impl Into<String>) -> Self {
        Self::DuplicateName(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            StagecraftError::not_found("x")
                .to_string()
                .contains("not found:")
        );
        assert!(
            StagecraftError::stale("x")
                .to_string()
                .contains("stale reference:")
        );
        assert!(
            StagecraftError::transaction("x")
                .to_string()
                .contains("invalid transaction state:")
        );
        assert!(
            StagecraftError::duplicate_name("x")
                .to_string()
                .contains("duplicate name:")
        );
        assert!(
            StagecraftError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            StagecraftError::NodeLocked(NodeId(7))
                .to_string()
                .contains("node locked:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = StagecraftError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
