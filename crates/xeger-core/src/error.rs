use thiserror::Error;

use crate::arena::ElementId;

/// Core error type for element-tree construction.
///
/// These only surface when a parse walk drives the arena into a state the
/// element model cannot represent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Children were added to an element that cannot hold them.
    #[error("element {0} is not a container")]
    NotAContainer(ElementId),
    /// A quantifier arrived before anything it could repeat.
    #[error("nothing to bound in container {0}")]
    NothingToBound(ElementId),
    /// The node belongs to a frozen parent layer and cannot be mutated.
    #[error("element {0} belongs to a parent layer")]
    ForeignNode(ElementId),
    #[error("element {0} does not exist")]
    UnknownNode(ElementId),
}

/// Convenience alias for results returned by the core crate.
pub type Result<T> = std::result::Result<T, Error>;
