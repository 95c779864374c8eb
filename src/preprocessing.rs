use crate::error::{Error, Result};
use crate::record::BuildingRecord;
use crate::{Matrix, Vector};
use ndarray::Axis;

/// Standardizes each column to zero mean and unit variance.
///
/// Columns with zero variance are only centered, so a single building or a
/// row of buildings along one meridian still scales to finite values.
#[derive(Clone, Debug, Default)]
pub struct StandardScaler {
    mean: Option<Vector>,
    std: Option<Vector>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
        }
    }

    pub fn fit(&mut self, data: &Matrix) -> Result<()> {
        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::empty("cannot fit scaler on zero rows"))?;
        let std = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| Error::parameter("Scaler not fitted. Call fit() first."))?;
        let std = self
            .std
            .as_ref()
            .ok_or_else(|| Error::parameter("Scaler not fitted. Call fit() first."))?;

        if data.ncols() != mean.len() {
            return Err(Error::parameter(format!(
                "expected {} columns, got {}",
                mean.len(),
                data.ncols()
            )));
        }

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            row -= mean;
            row /= std;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, data: &Matrix) -> Result<Matrix> {
        self.fit(data)?;
        self.transform(data)
    }
}

/// `[longitude, latitude]` per record, one row each.
pub fn coordinate_matrix(records: &[BuildingRecord]) -> Matrix {
    let mut coords = Matrix::zeros((records.len(), 2));
    for (mut row, record) in coords.rows_mut().into_iter().zip(records) {
        row[0] = record.longitude();
        row[1] = record.latitude();
    }
    coords
}
