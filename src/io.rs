// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;

use ndarray::Array1;

use crate::error::{Result, SolverError};

/// Supported file formats for potential fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some(ext) => Err(SolverError::UnsupportedFileFormat(ext.to_string())),
        None => Err(SolverError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Save one potential per vertex as a 1-D f64 array.
pub fn save_potentials(path: &Path, potentials: &[f64]) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => {
            let arr = Array1::from(potentials.to_vec());
            ndarray_npy::write_npy(path, &arr)
                .map_err(|e| SolverError::Npy(format!("write {}: {}", path.display(), e)))
        }
    }
}

/// Load a potential field written by [`save_potentials`].
///
/// # Errors
/// `ShapeMismatch` if the stored array does not hold exactly `num_vertices` values.
pub fn load_potentials(path: &Path, num_vertices: usize) -> Result<Vec<f64>> {
    let arr: Array1<f64> = match infer_format(path)? {
        FileFormat::Npy => ndarray_npy::read_npy(path)
            .map_err(|e| SolverError::Npy(format!("read {}: {}", path.display(), e)))?,
    };

    if arr.len() != num_vertices {
        return Err(SolverError::ShapeMismatch {
            expected: vec![num_vertices],
            got: arr.shape().to_vec(),
        });
    }
    Ok(arr.to_vec())
}
