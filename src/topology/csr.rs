//! Compact variable-length adjacency (CSR): `offsets[i]..offsets[i + 1]` indexes
//! the entries of row `i` in `values`.

use crate::mesh_error::MeshError;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Csr {
    offsets: Vec<usize>,
    values: Vec<usize>,
}

impl Default for Csr {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            values: Vec::new(),
        }
    }
}

impl Csr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checked construction from raw arrays.
    pub fn from_parts(offsets: Vec<usize>, values: Vec<usize>) -> Result<Self, MeshError> {
        if offsets.first() != Some(&0) {
            return Err(MeshError::InvalidConnectivity(
                "CSR offsets must start at 0".into(),
            ));
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(MeshError::InvalidConnectivity(
                "CSR offsets must be non-decreasing".into(),
            ));
        }
        if offsets.last() != Some(&values.len()) {
            return Err(MeshError::InvalidConnectivity(format!(
                "CSR offsets end at {:?} but {} values are stored",
                offsets.last(),
                values.len()
            )));
        }
        Ok(Self { offsets, values })
    }

    /// Build offsets as the prefix sum of `strides`.
    pub fn from_strides(strides: &[usize], values: Vec<usize>) -> Result<Self, MeshError> {
        let mut offsets = Vec::with_capacity(strides.len() + 1);
        offsets.push(0);
        let mut acc = 0;
        for &s in strides {
            acc += s;
            offsets.push(acc);
        }
        Self::from_parts(offsets, values)
    }

    pub fn from_rows<R, I>(rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = usize>,
    {
        let mut csr = Self::new();
        for row in rows {
            csr.values.extend(row);
            csr.offsets.push(csr.values.len());
        }
        csr
    }

    pub fn push_row(&mut self, row: &[usize]) -> usize {
        self.values.extend_from_slice(row);
        self.offsets.push(self.values.len());
        self.offsets.len() - 2
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.values[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn stride(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    pub fn strides(&self) -> impl Iterator<Item = usize> + '_ {
        self.offsets.windows(2).map(|w| w[1] - w[0])
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn values(&self) -> &[usize] {
        &self.values
    }

    pub fn rows(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }
}
