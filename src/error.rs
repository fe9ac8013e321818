use crate::graph::PortSide;

pub type RouteResult<T> = std::result::Result<T, RouteError>;

/// Per-edge routing failures. Every variant is recovered inside the
/// strategies: a failed candidate is skipped, a failed edge falls back to
/// an elbow, and a malformed edge is left unrouted with a warning.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("{node} has no port on side {side:?}")]
    PortUnavailable { node: String, side: PortSide },

    #[error("no clear entry outside {node} on side {side:?}")]
    EntryPointBlocked { node: String, side: PortSide },

    #[error("no route found for edge {edge}")]
    PathNotFound { edge: String },

    #[error("edge {edge} references missing node {node}")]
    MalformedReference { edge: String, node: String },
}
