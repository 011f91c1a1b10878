//! Weight and piece totals across package lines.

use serde::Serialize;

use super::types::Package;

/// Aggregated package totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ShipmentTotals {
    /// Σ(weight × packagingQuantity)
    pub weight: f64,
    /// Σ(packagingQuantity)
    pub pieces: f64,
}

impl ShipmentTotals {
    /// Missing quantities count as 1 and missing weights as 0.
    pub fn from_packages(packages: &[Package]) -> Self {
        packages
            .iter()
            .fold(ShipmentTotals::default(), |totals, package| {
                let quantity = package.packaging_quantity.unwrap_or(1.0);
                let weight = package.weight.unwrap_or(0.0);
                ShipmentTotals {
                    weight: totals.weight + weight * quantity,
                    pieces: totals.pieces + quantity,
                }
            })
    }
}

/// Render a quantity without a trailing `.0` for whole numbers.
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(weight: Option<f64>, quantity: Option<f64>) -> Package {
        Package {
            weight,
            packaging_quantity: quantity,
            ..Default::default()
        }
    }

    #[test]
    fn test_totals() {
        let packages = vec![package(Some(10.0), Some(2.0)), package(Some(5.0), Some(1.0))];
        let totals = ShipmentTotals::from_packages(&packages);
        assert_eq!(totals.weight, 25.0);
        assert_eq!(totals.pieces, 3.0);
    }

    #[test]
    fn test_totals_defaults() {
        let packages = vec![package(None, Some(4.0)), package(Some(7.5), None)];
        let totals = ShipmentTotals::from_packages(&packages);
        assert_eq!(totals.weight, 7.5);
        assert_eq!(totals.pieces, 5.0);
    }

    #[test]
    fn test_totals_empty() {
        assert_eq!(ShipmentTotals::from_packages(&[]), ShipmentTotals::default());
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(25.0), "25");
        assert_eq!(format_quantity(7.5), "7.50");
    }
}
