//! Errors reported by hierarchy construction, volume propagation and the consistency checks.

/// Indicates invalid input to a builder or query, or a violated hierarchy invariant.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq)]
pub enum BvhError {
    /// A flat coordinate array does not hold a whole number of points.
    #[error("flat coordinate array of length {len} is not a multiple of the dimension {dim}")]
    RaggedCoordinates {
        /// Length of the flat array.
        len: usize,
        /// Number of coordinates per point.
        dim: usize,
    },
    /// A flat element array does not hold a whole number of elements.
    #[error("element array of length {len} is not a multiple of {nodes_per_element} nodes per element")]
    RaggedElements {
        /// Length of the element-to-vertex array.
        len: usize,
        /// Number of vertices per element.
        nodes_per_element: usize,
    },
    /// An index refers past the end of the array it addresses.
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the addressed array.
        len: usize,
    },
    /// Two arrays that must be parallel have different lengths.
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        /// The required length.
        expected: usize,
        /// The length that was passed.
        found: usize,
    },
    /// The offsets of an adjacency table are not a monotonic cover of its neighbour list.
    #[error("adjacency offsets are malformed at element {element}")]
    MalformedAdjacency {
        /// The element whose offset range is invalid.
        element: usize,
    },
    /// The volume array handed to a query does not match the node array.
    #[error("{volumes} bounding volumes given for {nodes} nodes")]
    VolumeCountMismatch {
        /// Number of volumes.
        volumes: usize,
        /// Number of nodes.
        nodes: usize,
    },
    /// A strict Morton coding was asked for a coordinate outside `[0, 1]`.
    #[error("coordinate {value} is outside the unit range")]
    CoordinateOutOfRange {
        /// The offending coordinate.
        value: f64,
    },
    /// A distance window with `min > max` (or a NaN bound).
    #[error("invalid distance window [{min}, {max}]")]
    InvalidDistanceRange {
        /// Lower bound of the window.
        min: f64,
        /// Upper bound of the window.
        max: f64,
    },
    /// Morton codes are not sorted in non-decreasing order.
    #[error("morton code at position {position} is smaller than its predecessor")]
    UnsortedCodes {
        /// Position of the first out-of-order code.
        position: usize,
    },
    /// A stored Morton code does not match the code of its point.
    #[error("morton code at position {position} does not match element {element}")]
    CodeMismatch {
        /// Position in the sorted arrays.
        position: usize,
        /// Element referenced at that position.
        element: usize,
    },
    /// The leaf range computed for an internal node is inconsistent.
    #[error("range [{first}, {last}] of internal node {node} is inconsistent")]
    BadRange {
        /// The internal node.
        node: usize,
        /// First leaf covered.
        first: usize,
        /// Last leaf covered.
        last: usize,
    },
    /// The node array has the wrong size for the number of elements.
    #[error("{nodes} nodes cannot hold {elements} elements")]
    NodeCountMismatch {
        /// Number of nodes.
        nodes: usize,
        /// Number of elements.
        elements: usize,
    },
    /// A child does not point back to its parent, or the root has a parent.
    #[error("node {node} has parent {found:?}, expected {expected:?}")]
    ParentMismatch {
        /// The node with the wrong parent.
        node: usize,
        /// The expected parent.
        expected: Option<usize>,
        /// The stored parent.
        found: Option<usize>,
    },
    /// A node is reached twice, or not at all, from the root.
    #[error("node {node} is not reachable exactly once from the root")]
    DetachedNode {
        /// The node.
        node: usize,
    },
    /// An element appears in more than one leaf.
    #[error("element {element} is stored in more than one leaf")]
    DuplicateElement {
        /// The element.
        element: usize,
    },
    /// An element does not appear in any leaf.
    #[error("element {element} is not stored in any leaf")]
    MissingElement {
        /// The element.
        element: usize,
    },
    /// A branch volume does not contain the volume of one of its children.
    #[error("volume of node {child} is not contained in its parent {parent}")]
    VolumeNotContained {
        /// The parent node.
        parent: usize,
        /// The child node.
        child: usize,
    },
}
