//! Axis frame used to write direction-parameterized stencils once instead of
//! three times.
//!
//! A [`Direction`] is the primary axis of an operation. Its two tangential
//! axes follow the cyclic order i -> j -> k, so the frame of `J` is
//! `(J, K, I)` and the frame of `K` is `(K, I, J)`.

use serde::Serialize;

use crate::error::SolverError;

/// Signed cell/face index triple `(i, j, k)`. Ghost cells have negative
/// indices or indices past the physical extent.
pub type Ijk = (i32, i32, i32);

/// Logical block direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    I = 0,
    J = 1,
    K = 2,
}

impl Direction {
    pub fn all() -> [Self; 3] {
        [Self::I, Self::J, Self::K]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Self {
        match idx % 3 {
            0 => Self::I,
            1 => Self::J,
            _ => Self::K,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I => "i",
            Self::J => "j",
            Self::K => "k",
        }
    }

    /// Parse `"i"`, `"j"` or `"k"`.
    pub fn from_name(name: &str) -> Result<Self, SolverError> {
        match name {
            "i" | "I" => Ok(Self::I),
            "j" | "J" => Ok(Self::J),
            "k" | "K" => Ok(Self::K),
            other => Err(SolverError::InvalidDirection(other.to_string())),
        }
    }

    /// The two tangential directions in cyclic order.
    #[inline]
    pub fn tangents(self) -> (Self, Self) {
        (
            Self::from_index(self.index() + 1),
            Self::from_index(self.index() + 2),
        )
    }

    /// Map frame coordinates (normal, first tangent, second tangent) to `(i, j, k)`.
    #[inline]
    pub fn to_ijk(self, n: i32, t1: i32, t2: i32) -> Ijk {
        match self {
            Self::I => (n, t1, t2),
            Self::J => (t2, n, t1),
            Self::K => (t1, t2, n),
        }
    }

    /// Component of `ijk` along this direction.
    #[inline]
    pub fn component(self, ijk: Ijk) -> i32 {
        match self {
            Self::I => ijk.0,
            Self::J => ijk.1,
            Self::K => ijk.2,
        }
    }

    /// `ijk` moved by `delta` along this direction.
    #[inline]
    pub fn shift(self, ijk: Ijk, delta: i32) -> Ijk {
        match self {
            Self::I => (ijk.0 + delta, ijk.1, ijk.2),
            Self::J => (ijk.0, ijk.1 + delta, ijk.2),
            Self::K => (ijk.0, ijk.1, ijk.2 + delta),
        }
    }

    /// `ijk` with its component along this direction replaced.
    #[inline]
    pub fn with(self, ijk: Ijk, value: i32) -> Ijk {
        match self {
            Self::I => (value, ijk.1, ijk.2),
            Self::J => (ijk.0, value, ijk.2),
            Self::K => (ijk.0, ijk.1, value),
        }
    }

    /// The remaining direction given two distinct ones.
    pub fn third(a: Self, b: Self) -> Self {
        Self::from_index(3 - a.index() - b.index())
    }
}

/// One of the six faces of a block, with the boundary codes 1..=6
/// (i-lower, i-upper, j-lower, j-upper, k-lower, k-upper).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryFace {
    IMin,
    IMax,
    JMin,
    JMax,
    KMin,
    KMax,
}

impl BoundaryFace {
    pub fn all() -> [Self; 6] {
        [
            Self::IMin,
            Self::IMax,
            Self::JMin,
            Self::JMax,
            Self::KMin,
            Self::KMax,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::IMin => "imin",
            Self::IMax => "imax",
            Self::JMin => "jmin",
            Self::JMax => "jmax",
            Self::KMin => "kmin",
            Self::KMax => "kmax",
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::IMin => 1,
            Self::IMax => 2,
            Self::JMin => 3,
            Self::JMax => 4,
            Self::KMin => 5,
            Self::KMax => 6,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, SolverError> {
        match code {
            1 => Ok(Self::IMin),
            2 => Ok(Self::IMax),
            3 => Ok(Self::JMin),
            4 => Ok(Self::JMax),
            5 => Ok(Self::KMin),
            6 => Ok(Self::KMax),
            other => Err(SolverError::InvalidBoundaryFace(other)),
        }
    }

    pub fn new(direction: Direction, upper: bool) -> Self {
        match (direction, upper) {
            (Direction::I, false) => Self::IMin,
            (Direction::I, true) => Self::IMax,
            (Direction::J, false) => Self::JMin,
            (Direction::J, true) => Self::JMax,
            (Direction::K, false) => Self::KMin,
            (Direction::K, true) => Self::KMax,
        }
    }

    /// Direction normal to the face.
    pub fn direction(self) -> Direction {
        match self {
            Self::IMin | Self::IMax => Direction::I,
            Self::JMin | Self::JMax => Direction::J,
            Self::KMin | Self::KMax => Direction::K,
        }
    }

    pub fn is_upper(self) -> bool {
        matches!(self, Self::IMax | Self::JMax | Self::KMax)
    }

    pub fn opposite(self) -> Self {
        Self::new(self.direction(), !self.is_upper())
    }

    /// `+1` for upper faces and `-1` for lower faces. Multiplying a face
    /// area by this gives the outward normal of the block.
    pub fn outward_sign(self) -> f64 {
        if self.is_upper() {
            1.0
        } else {
            -1.0
        }
    }

    /// Ghost-cell index along the normal direction for ghost layer `layer`
    /// (1-based) of a block with `extent` physical cells.
    pub fn ghost_index(self, layer: i32, extent: i32) -> i32 {
        if self.is_upper() {
            extent - 1 + layer
        } else {
            -layer
        }
    }

    /// Physical-cell index along the normal direction for interior layer
    /// `layer` (0-based, counted from the face).
    pub fn interior_index(self, layer: i32, extent: i32) -> i32 {
        if self.is_upper() {
            extent - 1 - layer
        } else {
            layer
        }
    }

    /// Index of the face plane itself in the face arrays of the normal direction.
    pub fn face_index(self, extent: i32) -> i32 {
        if self.is_upper() {
            extent
        } else {
            0
        }
    }
}
