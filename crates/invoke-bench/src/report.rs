use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::suite::{ScenarioReport, SuiteResult};
use crate::{BenchError, Result};

#[derive(Clone, Debug)]
pub struct ReportArtifacts {
    pub markdown: PathBuf,
    pub charts: Vec<PathBuf>,
}

fn ensure_report_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn cdf_points(mut values: Vec<f64>) -> Vec<(f64, f64)> {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len().max(1) as f64;
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| (value, ((i + 1) as f64 / n) * 100.0))
        .collect()
}

const SERIES_COLORS: [RGBColor; 4] = [BLUE, RED, GREEN, MAGENTA];

fn write_elapsed_svg(result: &SuiteResult, path: &Path) -> Result<()> {
    let bars = result
        .scenarios
        .iter()
        .map(|report| {
            let elapsed_ms = report
                .run()
                .map(|run| run.elapsed.as_secs_f64() * 1000.0)
                .unwrap_or_default();
            (report.scenario().to_string(), elapsed_ms)
        })
        .collect::<Vec<_>>();
    let y_max = bars.iter().map(|(_, v)| *v).fold(1.0f64, f64::max) * 1.2;
    let labels = bars.iter().map(|(label, _)| label.clone()).collect::<Vec<_>>();

    let root = SVGBackend::new(path, (1200, 640)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Elapsed per run ({} iterations)", result.iterations),
            ("sans-serif", 32),
        )
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0i32..bars.len().max(1) as i32, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&|v| {
            let idx = (*v as usize).min(labels.len().saturating_sub(1));
            labels.get(idx).cloned().unwrap_or_default()
        })
        .y_desc("Elapsed (ms)")
        .draw()?;

    for (idx, (_, value)) in bars.iter().enumerate() {
        let x0 = idx as i32;
        let x1 = x0 + 1;
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, 0.0), (x1, *value)],
            color.mix(0.6).filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

fn write_latency_cdf_svg(result: &SuiteResult, path: &Path) -> Result<()> {
    let series = result
        .scenarios
        .iter()
        .filter_map(ScenarioReport::run)
        .map(|run| {
            let latencies = run
                .calls
                .iter()
                .filter(|call| call.success)
                .map(|call| call.latency_ms)
                .collect::<Vec<_>>();
            (run.scenario.to_string(), cdf_points(latencies))
        })
        .collect::<Vec<_>>();

    let x_max = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|(x, _)| *x))
        .fold(1.0, f64::max)
        * 1.05;

    let root = SVGBackend::new(path, (1200, 720)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Per-call latency CDF", ("sans-serif", 36))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0f64..x_max, 0.0f64..100.0f64)?;

    chart
        .configure_mesh()
        .x_desc("Latency (ms)")
        .y_desc("Percentile (%)")
        .draw()?;

    for (idx, (label, points)) in series.into_iter().enumerate() {
        if points.is_empty() {
            continue;
        }
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(3)))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
            });
    }

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.8))
        .draw()?;

    root.present()?;
    Ok(())
}

fn markdown_body(result: &SuiteResult, charts: &[PathBuf]) -> String {
    let mut body = String::new();
    body.push_str("# Invocation Benchmark Report\n\n");
    body.push_str(&format!("- Started: {}\n", result.started_at_utc));
    body.push_str(&format!("- Finished: {}\n", result.finished_at_utc));
    body.push_str(&format!("- Endpoint: {}\n", result.endpoint));
    body.push_str(&format!("- Iterations per run: {}\n", result.iterations));
    match result.inline_payload_bytes {
        Some(bytes) => body.push_str(&format!(
            "- Inline payload: {} ({} bytes)\n\n",
            result.media_type, bytes
        )),
        None => body.push_str("- Inline payload: unavailable\n\n"),
    }

    body.push_str("## Runs\n\n");
    body.push_str(
        "| run | elapsed (ms) | succeeded | failed | req/s | p50 (ms) | p95 (ms) | p99 (ms) |\n",
    );
    body.push_str("|---|---:|---:|---:|---:|---:|---:|---:|\n");
    for report in &result.scenarios {
        match report {
            ScenarioReport::Completed(run) => body.push_str(&format!(
                "| {} | {} | {} | {} | {:.3} | {:.3} | {:.3} | {:.3} |\n",
                run.description,
                run.elapsed_ms(),
                run.summary.completed,
                run.summary.failed,
                run.summary.request_throughput,
                run.summary.latency_ms.p50,
                run.summary.latency_ms.p95,
                run.summary.latency_ms.p99,
            )),
            ScenarioReport::Skipped {
                description,
                reason,
                ..
            } => body.push_str(&format!(
                "| {description} | skipped: {reason} | - | - | - | - | - | - |\n"
            )),
        }
    }

    body.push_str("\n## Artifacts\n");
    for chart in charts {
        if let Some(name) = chart.file_name().and_then(|n| n.to_str()) {
            body.push_str(&format!("- {}\n", name));
        }
    }
    body
}

pub fn generate_suite_report(result: &SuiteResult, report_dir: &Path) -> Result<ReportArtifacts> {
    ensure_report_dir(report_dir)?;

    let elapsed = report_dir.join("elapsed.svg");
    let latency_cdf = report_dir.join("latency_cdf.svg");
    let markdown = report_dir.join("report.md");

    write_elapsed_svg(result, &elapsed)?;
    write_latency_cdf_svg(result, &latency_cdf)?;

    let charts = vec![elapsed, latency_cdf];
    std::fs::write(&markdown, markdown_body(result, &charts))?;

    Ok(ReportArtifacts { markdown, charts })
}

pub fn load_suite_result(path: &Path) -> Result<SuiteResult> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(BenchError::from)
}
