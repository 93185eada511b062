//! Error handling for the surf2mesh pipeline
//!
//! Precondition violations (bad dimensions, out-of-range indices, mismatched
//! array sizes) and allocation failures are fatal and carry the surface name
//! plus the offending numbers. Geometric degeneracy and agglomeration
//! exhaustion are not errors, unless a grid collapses so far that no
//! triangle survives.

use thiserror::Error;

/// Result type alias for surf2mesh operations
pub type MeshResult<T> = Result<T, MeshError>;

/// Error types for surface meshing operations
#[derive(Error, Debug)]
pub enum MeshError {
    /// Invalid input data or parameters
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Structured grid smaller than one quad cell
    #[error("Surface '{surface}': grid dimensions {num_i}x{num_j} are invalid (need at least 2x2)")]
    InvalidDimensions {
        surface: String,
        num_i: usize,
        num_j: usize,
    },

    /// 1-based node access outside the allocated grid
    #[error("Surface '{surface}': node ({i}, {j}) outside grid {num_i}x{num_j}")]
    IndexOutOfRange {
        surface: String,
        i: usize,
        j: usize,
        num_i: usize,
        num_j: usize,
    },

    /// Sampled arrays do not match the declared grid size
    #[error("Surface '{surface}': {array} has {actual} entries, expected {expected}")]
    SizeMismatch {
        surface: String,
        array: String,
        expected: usize,
        actual: usize,
    },

    /// Grid storage could not be allocated
    #[error("Surface '{surface}': failed to allocate {num_i}x{num_j} grid: {message}")]
    Memory {
        surface: String,
        num_i: usize,
        num_j: usize,
        message: String,
    },

    /// A stage ran before the stage it depends on
    #[error("Surface '{surface}': {operation} requires a triangulated mesh")]
    NotMeshed { surface: String, operation: String },

    /// Mesh generation errors
    #[error("Surface '{surface}': mesh generation failed: {message}")]
    MeshGeneration { surface: String, message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    /// JSON parsing errors
    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },
}

impl MeshError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a mesh generation error
    pub fn mesh_generation(surface: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MeshGeneration {
            surface: surface.into(),
            message: message.into(),
        }
    }

    /// Attribute a mesh generation error to the named surface
    #[must_use]
    pub fn in_surface(self, name: &str) -> Self {
        match self {
            Self::MeshGeneration { message, .. } => Self::mesh_generation(name, message),
            other => other,
        }
    }

    /// Create an invalid dimensions error
    pub fn invalid_dimensions(surface: impl Into<String>, num_i: usize, num_j: usize) -> Self {
        Self::InvalidDimensions {
            surface: surface.into(),
            num_i,
            num_j,
        }
    }

    /// Create a not-meshed error
    pub fn not_meshed(surface: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::NotMeshed {
            surface: surface.into(),
            operation: operation.into(),
        }
    }

    /// Create a size mismatch error
    pub fn size_mismatch(
        surface: impl Into<String>,
        array: impl Into<String>,
        expected: usize,
        actual: usize,
    ) -> Self {
        Self::SizeMismatch {
            surface: surface.into(),
            array: array.into(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_surface_context() {
        let err = MeshError::invalid_dimensions("WingGeom", 1, 7);
        let msg = err.to_string();
        assert!(msg.contains("WingGeom"));
        assert!(msg.contains("1x7"));

        let err = MeshError::IndexOutOfRange {
            surface: "Fuselage".into(),
            i: 9,
            j: 2,
            num_i: 8,
            num_j: 5,
        };
        assert!(err.to_string().contains("(9, 2)"));
    }

    #[test]
    fn mesh_generation_names_the_surface() {
        let err = MeshError::mesh_generation("3", "triangle 0 references node 1 of 1");
        assert!(err.to_string().contains("Surface '3'"));

        let msg = err.in_surface("Canard").to_string();
        assert!(msg.contains("Surface 'Canard'"));
        assert!(msg.contains("triangle 0 references node 1 of 1"));

        let other = MeshError::invalid_input("bad").in_surface("Canard");
        assert!(matches!(other, MeshError::InvalidInput { .. }));
    }
}
