//! Output-shape selection and histogram rendering
//!
//! The summarizer emits either a JSON bounds record or a rendered histogram
//! of the normalised depth distribution; which one is decided once at
//! startup from the requested output path's extension.

use crate::{DepthBounds, DepthObs, StrQcError, StrQcResult};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Margin added around the fitted bounds for the display window.
pub const DISPLAY_MARGIN: f64 = 15.0;

const DIMENSIONS: (u32, u32) = (1200, 900);

/// Image container formats the histogram can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Bmp,
    Svg,
}

/// What kind of artifact a summarizer run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// JSON record with the fitted bounds.
    Bounds,
    /// Rendered histogram of the depth distribution.
    Image(ImageFormat),
}

impl OutputKind {
    /// Select the output kind from the requested path's extension. Called
    /// before any VCF record is read so that unsupported formats fail fast.
    pub fn from_path<P: AsRef<Path>>(path: P) -> StrQcResult<Self> {
        let extension = crate::utils::get_extension(&path).ok_or_else(|| {
            StrQcError::UnsupportedFormat(path.as_ref().to_string_lossy().to_string())
        })?;

        match extension.as_str() {
            "json" => Ok(OutputKind::Bounds),
            "png" => Ok(OutputKind::Image(ImageFormat::Png)),
            "jpg" | "jpeg" => Ok(OutputKind::Image(ImageFormat::Jpeg)),
            "bmp" => Ok(OutputKind::Image(ImageFormat::Bmp)),
            "svg" => Ok(OutputKind::Image(ImageFormat::Svg)),
            other => Err(StrQcError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Display window around the fitted bounds, clamped at zero on the left.
pub fn display_window(bounds: &DepthBounds) -> (f64, f64) {
    (
        (bounds.lower - DISPLAY_MARGIN).max(0.0),
        bounds.upper + DISPLAY_MARGIN,
    )
}

/// Discrete histogram: values bucketed to the nearest integer, each bucket
/// holding its proportion of the input population.
pub fn histogram_proportions(values: &[f64]) -> BTreeMap<i64, f64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value.round() as i64).or_insert(0) += 1;
    }

    let total = values.len() as f64;
    counts
        .into_iter()
        .map(|(bucket, count)| (bucket, count as f64 / total))
        .collect()
}

struct HistogramSpec {
    xmin: f64,
    xmax: f64,
    bins: BTreeMap<i64, f64>,
    lower: f64,
    upper: f64,
    title: String,
}

impl HistogramSpec {
    fn new(observations: &[DepthObs], bounds: &DepthBounds) -> Self {
        let (xmin, xmax) = display_window(bounds);
        let window: Vec<f64> = observations
            .iter()
            .map(|obs| obs.depth_norm)
            .filter(|value| *value >= xmin && *value <= xmax)
            .collect();

        let title = format!(
            "Lower bound: {}, upper bound: {} - loci in range: {}/{} ({:.2}%)",
            bounds.lower,
            bounds.upper,
            bounds.n_within,
            bounds.n_total,
            bounds.percent_within()
        );

        HistogramSpec {
            xmin,
            xmax,
            bins: histogram_proportions(&window),
            lower: bounds.lower,
            upper: bounds.upper,
            title,
        }
    }
}

/// Render the depth distribution of the full cleaned population, restricted
/// to the display window, with the fitted bounds drawn as vertical lines.
pub fn render_histogram(
    observations: &[DepthObs],
    bounds: &DepthBounds,
    path: &Path,
    format: ImageFormat,
) -> StrQcResult<()> {
    crate::utils::ensure_parent_dirs(path)?;
    let spec = HistogramSpec::new(observations, bounds);

    match format {
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, DIMENSIONS).into_drawing_area();
            draw_histogram(&root, &spec)
        }
        // BitMapBackend picks the encoder from the file extension
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp => {
            let root = BitMapBackend::new(path, DIMENSIONS).into_drawing_area();
            draw_histogram(&root, &spec)
        }
    }
}

fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &HistogramSpec,
) -> StrQcResult<()> {
    let plot_err = |e: DrawingAreaErrorKind<DB::ErrorType>| StrQcError::Plot(e.to_string());

    root.fill(&WHITE).map_err(plot_err)?;

    let max_proportion = spec.bins.values().copied().fold(0.0_f64, f64::max);
    let y_max = if max_proportion > 0.0 {
        max_proportion * 1.1
    } else {
        1.0
    };

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(spec.xmin..spec.xmax, 0.0..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Depth / CN")
        .y_desc("Proportion of STR loci")
        .draw()
        .map_err(plot_err)?;

    let grey = RGBColor(128, 128, 128);
    chart
        .draw_series(spec.bins.iter().map(|(&bucket, &proportion)| {
            Rectangle::new(
                [
                    (bucket as f64 - 0.5, 0.0),
                    (bucket as f64 + 0.5, proportion),
                ],
                grey.filled(),
            )
        }))
        .map_err(plot_err)?;

    for x in [spec.lower, spec.upper] {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, 0.0), (x, y_max)],
                BLACK.stroke_width(2),
            )))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_kind_from_path() {
        assert_eq!(OutputKind::from_path("out.json").unwrap(), OutputKind::Bounds);
        assert_eq!(
            OutputKind::from_path("out.png").unwrap(),
            OutputKind::Image(ImageFormat::Png)
        );
        assert_eq!(
            OutputKind::from_path("out.JPG").unwrap(),
            OutputKind::Image(ImageFormat::Jpeg)
        );
        assert_eq!(
            OutputKind::from_path("dir/out.svg").unwrap(),
            OutputKind::Image(ImageFormat::Svg)
        );
    }

    #[test]
    fn test_output_kind_rejects_unsupported() {
        assert!(matches!(
            OutputKind::from_path("out.txt"),
            Err(StrQcError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            OutputKind::from_path("no_extension"),
            Err(StrQcError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_display_window() {
        let bounds = DepthBounds {
            lower: 5.0,
            upper: 40.0,
            n_within: 0,
            n_total: 0,
        };
        assert_eq!(display_window(&bounds), (0.0, 55.0));

        let bounds = DepthBounds {
            lower: 20.0,
            upper: 40.0,
            n_within: 0,
            n_total: 0,
        };
        assert_eq!(display_window(&bounds), (5.0, 55.0));
    }

    #[test]
    fn test_histogram_proportions() {
        let bins = histogram_proportions(&[1.0, 1.2, 2.0, 2.0]);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[&1], 0.5);
        assert_eq!(bins[&2], 0.5);

        assert!(histogram_proportions(&[]).is_empty());
    }
}
