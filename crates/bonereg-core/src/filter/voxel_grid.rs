//! Flat indexing helpers for CPU-side 3D filters.

/// Raster layout of a 3D volume, x fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VoxelGrid {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl VoxelGrid {
    pub fn new(size: [usize; 3]) -> Self {
        Self {
            nx: size[0],
            ny: size[1],
            nz: size[2],
        }
    }

    pub fn size(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    #[inline]
    pub fn flat(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.nx * (y + self.ny * z)
    }

    #[inline]
    pub fn coords(&self, flat: usize) -> [usize; 3] {
        [flat % self.nx, (flat / self.nx) % self.ny, flat / (self.nx * self.ny)]
    }

    pub fn on_boundary(&self, flat: usize) -> bool {
        let [x, y, z] = self.coords(flat);
        x == 0 || y == 0 || z == 0 || x + 1 == self.nx || y + 1 == self.ny || z + 1 == self.nz
    }

    /// Face-adjacent (6-connected) neighbours that lie inside the grid.
    pub fn face_neighbors(&self, flat: usize) -> impl Iterator<Item = usize> {
        let [x, y, z] = self.coords(flat);
        let row = self.nx;
        let slice = self.nx * self.ny;
        [
            (x > 0).then(|| flat - 1),
            (x + 1 < self.nx).then(|| flat + 1),
            (y > 0).then(|| flat - row),
            (y + 1 < self.ny).then(|| flat + row),
            (z > 0).then(|| flat - slice),
            (z + 1 < self.nz).then(|| flat + slice),
        ]
        .into_iter()
        .flatten()
    }

    /// Lines running along `axis`: (length, stride, start offset of every line).
    pub fn lines(&self, axis: usize) -> (usize, usize, Vec<usize>) {
        let size = self.size();
        let strides = [1, self.nx, self.nx * self.ny];
        let (a, b) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let mut bases = Vec::with_capacity(size[a] * size[b]);
        for j in 0..size[b] {
            for i in 0..size[a] {
                bases.push(i * strides[a] + j * strides[b]);
            }
        }
        (size[axis], strides[axis], bases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_roundtrip() {
        let grid = VoxelGrid::new([4, 3, 2]);
        for flat in 0..grid.len() {
            let [x, y, z] = grid.coords(flat);
            assert_eq!(grid.flat(x, y, z), flat);
        }
    }

    #[test]
    fn test_face_neighbors() {
        let grid = VoxelGrid::new([3, 3, 3]);
        assert_eq!(grid.face_neighbors(grid.flat(1, 1, 1)).count(), 6);
        assert_eq!(grid.face_neighbors(0).count(), 3);
        assert!(grid.on_boundary(0));
        assert!(!grid.on_boundary(grid.flat(1, 1, 1)));
    }

    #[test]
    fn test_lines_cover_grid() {
        let grid = VoxelGrid::new([4, 3, 2]);
        for axis in 0..3 {
            let (len, stride, bases) = grid.lines(axis);
            let mut seen = vec![false; grid.len()];
            for base in bases {
                for i in 0..len {
                    seen[base + i * stride] = true;
                }
            }
            assert!(seen.into_iter().all(|s| s));
        }
    }
}
