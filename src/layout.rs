use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("Expected a layout of rank {expected}, got rank {got}")]
    RankMismatch { expected: usize, got: usize },
    #[error("Index {index} is out of bounds for dimension {dim} of extent {extent}")]
    IndexOutOfBounds { dim: usize, index: u64, extent: u64 },
    #[error("Dimension {0} does not exist in a layout of rank {1}")]
    NoSuchDimension(usize, usize),
    #[error("{0} extents were given with {1} increments")]
    IncrementCountMismatch(usize, usize),
}

/// Shape of a value: per-dimension extents, plus the increment (in elements)
/// between neighbouring entries of each dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layout {
    extents: Vec<u64>,
    increments: Vec<u64>,
}

impl Layout {
    pub fn scalar() -> Self {
        Self {
            extents: vec![],
            increments: vec![],
        }
    }

    /// Row-major, densely packed layout.
    pub fn new(extents: impl Into<Vec<u64>>) -> Self {
        let extents = extents.into();
        let mut increments = vec![0; extents.len()];
        let mut running = 1;
        for dim in (0..extents.len()).rev() {
            increments[dim] = running;
            running *= extents[dim];
        }
        Self {
            extents,
            increments,
        }
    }

    pub fn with_increments(
        extents: impl Into<Vec<u64>>,
        increments: impl Into<Vec<u64>>,
    ) -> Result<Self, LayoutError> {
        let extents = extents.into();
        let increments = increments.into();
        if extents.len() != increments.len() {
            return Err(LayoutError::IncrementCountMismatch(
                extents.len(),
                increments.len(),
            ));
        }
        Ok(Self {
            extents,
            increments,
        })
    }

    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    pub fn extents(&self) -> &[u64] {
        &self.extents
    }

    pub fn extent(&self, dim: usize) -> Result<u64, LayoutError> {
        self.extents
            .get(dim)
            .copied()
            .ok_or(LayoutError::NoSuchDimension(dim, self.rank()))
    }

    /// Distance in elements between consecutive entries along `dim`.
    pub fn cumulative_increment(&self, dim: usize) -> Result<u64, LayoutError> {
        self.increments
            .get(dim)
            .copied()
            .ok_or(LayoutError::NoSuchDimension(dim, self.rank()))
    }

    pub fn num_elements(&self) -> u64 {
        self.extents.iter().product()
    }

    /// Number of elements of backing storage the layout spans.
    pub fn memory_size(&self) -> u64 {
        if self.extents.contains(&0) {
            return 0;
        }
        1 + self
            .extents
            .iter()
            .zip(&self.increments)
            .map(|(e, i)| (e - 1) * i)
            .sum::<u64>()
    }

    pub fn contiguous(&self) -> Self {
        Self::new(self.extents.clone())
    }

    pub fn ensure_rank(&self, expected: usize) -> Result<(), LayoutError> {
        if self.rank() != expected {
            return Err(LayoutError::RankMismatch {
                expected,
                got: self.rank(),
            });
        }
        Ok(())
    }

    pub fn offset(&self, coordinates: &[u64]) -> Result<u64, LayoutError> {
        self.ensure_rank(coordinates.len())?;
        let mut offset = 0;
        for (dim, &index) in coordinates.iter().enumerate() {
            let extent = self.extents[dim];
            if index >= extent {
                return Err(LayoutError::IndexOutOfBounds { dim, index, extent });
            }
            offset += index * self.increments[dim];
        }
        Ok(offset)
    }

    /// Every coordinate of the layout in row-major order, last dimension fastest.
    pub fn coordinates(&self) -> LayoutCoordinates {
        LayoutCoordinates {
            extents: self.extents.clone(),
            next: if self.extents.contains(&0) {
                None
            } else {
                Some(vec![0; self.extents.len()])
            },
        }
    }
}

pub struct LayoutCoordinates {
    extents: Vec<u64>,
    next: Option<Vec<u64>>,
}

impl Iterator for LayoutCoordinates {
    type Item = Vec<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut following = current.clone();
        let mut dim = following.len();
        loop {
            if dim == 0 {
                // Wrapped past the outermost dimension
                break;
            }
            dim -= 1;
            following[dim] += 1;
            if following[dim] < self.extents[dim] {
                self.next = Some(following);
                break;
            }
            following[dim] = 0;
        }
        Some(current)
    }
}
