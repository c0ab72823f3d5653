//! Cube inspection
//!
//! Structured summaries of a finished cube and the terminal listing the binary
//! prints instead of writing the cube to a file.

use crate::model::{Cube, Dim};

/// Quick statistics over the finite cells of one cube variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSummary {
    pub name: String,
    pub total_cells: usize,
    pub finite_cells: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Axis lengths and per-variable statistics of a cube
#[derive(Debug, Clone, PartialEq)]
pub struct CubeSummary {
    pub axes: Vec<(Dim, usize)>,
    pub crs: Option<String>,
    pub variables: Vec<VariableSummary>,
}

/// Summarize every variable of `cube`, sorted by name
#[must_use]
pub fn summarize_cube(cube: &Cube) -> CubeSummary {
    let axes = cube.dims().into_iter().zip(cube.shape()).collect();

    let variables = cube
        .variables()
        .iter()
        .map(|(name, data)| {
            let finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
            let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
            let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = if finite.is_empty() {
                f64::NAN
            } else {
                finite.iter().sum::<f64>() / finite.len() as f64
            };

            VariableSummary {
                name: name.clone(),
                total_cells: data.len(),
                finite_cells: finite.len(),
                min: if finite.is_empty() { f64::NAN } else { min },
                max: if finite.is_empty() { f64::NAN } else { max },
                mean,
            }
        })
        .collect();

    CubeSummary {
        axes,
        crs: cube.crs().map(|c| c.to_string()),
        variables,
    }
}

/// Prints axes and variables of a cube in a clean, organized format.
pub fn print_summary(summary: &CubeSummary) {
    println!("\n Axes");
    println!("========");
    if summary.axes.is_empty() {
        println!("   (No axes found)");
    }
    for (dim, len) in &summary.axes {
        println!("    {} = {}", dim, len);
    }
    println!(
        "    crs = {}",
        summary.crs.as_deref().unwrap_or("(none)")
    );

    println!("\n Variables");
    println!("=============");
    if summary.variables.is_empty() {
        println!("   (No variables found)");
    }
    for var in &summary.variables {
        println!(
            "    {}: {}/{} cells filled",
            var.name, var.finite_cells, var.total_cells
        );
        if var.finite_cells > 0 {
            println!(
                "      └─ min: {}, max: {}, mean: {:.2}",
                var.min, var.max, var.mean
            );
        }
    }
}
