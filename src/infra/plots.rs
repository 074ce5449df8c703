// ============================================================
// Layer 6 — Plot Rendering
// ============================================================
// PNG artifacts drawn with plotters' BitMapBackend:
//
//   render_scatter          — 2-D t-SNE coordinates coloured by label
//   render_silhouette_curve — score per sweep configuration
//   render_loss_silhouette  — cross-run plot, loss on the left
//                             axis and silhouette on the right
//   render_volume_slice     — middle depth slice of an input view
//
// Rendering is a side artifact: callers log failures and keep
// going.

use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::{ops::Range, path::Path};

use crate::domain::sample::Volume;

const SIZE: (u32, u32) = (800, 600);

/// One point of the cross-run comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatePoint {
    pub run_id:            String,
    pub latent_space_size: usize,
    pub val_loss:          f64,
    /// NaN when the run recorded no defined score.
    pub silhouette:        f64,
}

/// Padded [min, max] range over the finite values; a fallback for empty
/// or constant input.
pub fn axis_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.05 };
    (lo - pad)..(hi + pad)
}

pub fn render_scatter(path: &Path, title: &str, points: &[[f32; 2]], labels: &[usize]) -> Result<()> {
    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("backend error: {e}"))?;

    let x_range = axis_range(points.iter().map(|p| f64::from(p[0])));
    let y_range = axis_range(points.iter().map(|p| f64::from(p[1])));
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(title, ("sans-serif", 22.0))
        .set_label_area_size(LabelAreaPosition::Left, 50)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| anyhow!("chart build error: {e}"))?;
    chart
        .configure_mesh()
        .disable_mesh()
        .draw()
        .map_err(|e| anyhow!("mesh error: {e}"))?;

    chart
        .draw_series(points.iter().zip(labels).map(|(p, &label)| {
            let color = Palette99::pick(label).filled();
            Circle::new((f64::from(p[0]), f64::from(p[1])), 3, color)
        }))
        .map_err(|e| anyhow!("draw error: {e}"))?;

    root.present().map_err(|e| anyhow!("render error: {e}"))?;
    Ok(())
}

/// Undefined scores are left out of the line.
pub fn render_silhouette_curve(path: &Path, method: &str, curve: &[(f64, Option<f64>)]) -> Result<()> {
    let defined: Vec<(f64, f64)> = curve.iter().filter_map(|&(x, s)| s.map(|s| (x, s))).collect();

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("backend error: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(format!("Silhouette: {method}"), ("sans-serif", 22.0))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(axis_range(curve.iter().map(|c| c.0)), -1.0f64..1.0f64)
        .map_err(|e| anyhow!("chart build error: {e}"))?;
    chart
        .configure_mesh()
        .x_desc("configuration")
        .y_desc("silhouette score")
        .draw()
        .map_err(|e| anyhow!("mesh error: {e}"))?;

    chart
        .draw_series(LineSeries::new(defined.iter().copied(), &BLUE))
        .map_err(|e| anyhow!("draw error: {e}"))?;
    chart
        .draw_series(defined.iter().map(|&(x, s)| Circle::new((x, s), 4, BLUE.filled())))
        .map_err(|e| anyhow!("draw error: {e}"))?;

    root.present().map_err(|e| anyhow!("render error: {e}"))?;
    Ok(())
}

/// Points are drawn in the given order; callers sort by latent size.
pub fn render_loss_silhouette(path: &Path, points: &[AggregatePoint]) -> Result<()> {
    let xs = || points.iter().map(|p| p.latent_space_size as f64);
    let loss: Vec<(f64, f64)> = points.iter().map(|p| (p.latent_space_size as f64, p.val_loss)).collect();
    let silhouette: Vec<(f64, f64)> = points
        .iter()
        .filter(|p| p.silhouette.is_finite())
        .map(|p| (p.latent_space_size as f64, p.silhouette))
        .collect();

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("backend error: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption("Loss and silhouette vs latent space size", ("sans-serif", 22.0))
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Right, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(axis_range(xs()), axis_range(points.iter().map(|p| p.val_loss)))
        .map_err(|e| anyhow!("chart build error: {e}"))?
        .set_secondary_coord(axis_range(xs()), axis_range(silhouette.iter().map(|p| p.1)));

    chart
        .configure_mesh()
        .x_desc("latent space size")
        .y_desc("val_loss")
        .draw()
        .map_err(|e| anyhow!("mesh error: {e}"))?;
    chart
        .configure_secondary_axes()
        .y_desc("silhouette score")
        .draw()
        .map_err(|e| anyhow!("mesh error: {e}"))?;

    chart
        .draw_series(LineSeries::new(loss.iter().copied(), &RED))
        .map_err(|e| anyhow!("draw error: {e}"))?
        .label("val_loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    chart
        .draw_secondary_series(LineSeries::new(silhouette.iter().copied(), &BLUE))
        .map_err(|e| anyhow!("draw error: {e}"))?
        .label("silhouette")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    chart
        .draw_secondary_series(silhouette.iter().map(|&(x, s)| Circle::new((x, s), 4, BLUE.filled())))
        .map_err(|e| anyhow!("draw error: {e}"))?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| anyhow!("legend error: {e}"))?;

    root.present().map_err(|e| anyhow!("render error: {e}"))?;
    Ok(())
}

/// Grayscale image of the middle depth slice of channel 0, one pixel
/// block per voxel.
pub fn render_volume_slice(path: &Path, volume: &Volume) -> Result<()> {
    let [_, d, h, w] = volume.shape;
    if volume.is_empty() {
        return Err(anyhow!("cannot render an empty volume"));
    }
    let scale = (512 / h.max(w)).max(1) as u32;
    let z = d / 2;
    let max = volume.voxels.iter().cloned().fold(0.0f32, f32::max).max(f32::EPSILON);

    let root = BitMapBackend::new(path, (w as u32 * scale, h as u32 * scale)).into_drawing_area();
    root.fill(&BLACK).map_err(|e| anyhow!("backend error: {e}"))?;
    for y in 0..h {
        for x in 0..w {
            let v = volume.voxels[volume.index(0, z, y, x)] / max;
            let level = (v.clamp(0.0, 1.0) * 255.0) as u8;
            let (x0, y0) = (x as i32 * scale as i32, y as i32 * scale as i32);
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + scale as i32, y0 + scale as i32)],
                RGBColor(level, level, level).filled(),
            ))
            .map_err(|e| anyhow!("draw error: {e}"))?;
        }
    }
    root.present().map_err(|e| anyhow!("render error: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_axis_range_pads_and_ignores_nan() {
        let r = axis_range([1.0, f64::NAN, 3.0]);
        assert!(r.start < 1.0 && r.start > 0.8);
        assert!(r.end > 3.0 && r.end < 3.2);
    }

    #[test]
    fn test_axis_range_fallbacks() {
        assert_eq!(axis_range(std::iter::empty()), 0.0..1.0);
        let r = axis_range([2.0, 2.0]);
        assert!(r.start < 2.0 && r.end > 2.0);
    }

    #[test]
    fn test_volume_slice_writes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slice.png");
        let mut volume = Volume::zeros([1, 3, 4, 4]);
        let i = volume.index(0, 1, 2, 2);
        volume.voxels[i] = 1.0;
        render_volume_slice(&path, &volume).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
