//! Visualization suite
//!
//! **Views, in order:**
//! 1. Sample size overview (one bar per attribute)
//! 2. General per-attribute charts (histogram or donut)
//! 3. Event-specific charts for fixed posting windows
//! 4. Nested relationship sunbursts
//!
//! Chart planning is pure: every view yields [`ChartPlan`]s which the run then
//! uploads one at a time. A chart that cannot be drawn or uploaded is recorded
//! and the suite moves on.

use chrono::{NaiveDate, NaiveDateTime};
use eews_common::outcome::{FailureKind, UnitFailure};
use eews_common::record::fields;
use eews_common::results::load_results;
use eews_common::{Error, ObjectStore, PipelineConfig};
use serde::Serialize;
use tracing::info;

use crate::breakdown::{sample_sizes, title_case, value_counts, Hierarchy};
use crate::dataset::{Dataset, LOCATION_COMBINED, WARNING_TIME_BINNED};
use crate::diagnostics::{run_diagnostics, Finding};
use crate::publish::{Artifact, ArtifactKind, Publisher};
use crate::render::{
    bar_chart_svg, donut_svg, histogram_svg, sunburst_html, BarChart, ChartError, DonutChart,
    Histogram, LeafPercent, Sunburst,
};

const HISTOGRAM_BINS: usize = 20;
const TOP_CATEGORIES: usize = 10;

/// Columns without a general chart
const GENERAL_EXCLUDED: [&str; 7] = [
    fields::USERNAME,
    fields::ALERT_LANGUAGE,
    fields::REASONING,
    fields::POST_DATETIME,
    fields::MAGNITUDE,
    fields::WARNING_TIME_SECONDS,
    fields::DISTANCE,
];

/// Columns charted as histograms rather than category shares
const NUMERIC_ATTRIBUTES: [&str; 1] = [fields::SHAKING_INTENSITY_MMI];

const EVENT_HISTOGRAMS: [&str; 3] = [fields::MAGNITUDE, fields::WARNING_TIME_SECONDS, fields::DISTANCE];

const EVENT_SUNBURSTS: [(&str, &[&str]); 4] = [
    ("Location and Alert Type", &[LOCATION_COMBINED, "alert_type"]),
    ("Location and User Sentiment", &[LOCATION_COMBINED, "users_sentiment"]),
    ("Shaking Level and Warning Time", &[fields::SHAKING_LEVEL, WARNING_TIME_BINNED]),
    ("Location and Warning Time", &[LOCATION_COMBINED, WARNING_TIME_BINNED]),
];

pub const NESTED_RELATIONSHIPS: [(&str, &[&str]); 15] = [
    ("Shaking Level and Alert Arrival", &[fields::SHAKING_LEVEL, fields::ALERT_ARRIVAL]),
    ("User Sentiment and Gender", &["users_sentiment", "user's_gender"]),
    ("Action Taken and Gender", &["post_alert_action", "user's_gender"]),
    ("Alert Type and Mode", &["alert_type", "alert_mode"]),
    ("Screenshot with Contour", &["with_alert_screenshot", "alert_screenshot_with_contour"]),
    ("Gender and Helpfulness", &["user's_gender", "helpfulness"]),
    ("Gender and Alert Info Recall", &["user's_gender", fields::ALERT_INFO_RECALL]),
    ("Gender and Post Alert Action", &["user's_gender", "post_alert_action"]),
    ("Location and Alert Type", &[LOCATION_COMBINED, "alert_type"]),
    ("Location and User Sentiment", &[LOCATION_COMBINED, "users_sentiment"]),
    ("Shaking Level and Warning Time", &[fields::SHAKING_LEVEL, WARNING_TIME_BINNED]),
    ("Location and Warning Time", &[LOCATION_COMBINED, WARNING_TIME_BINNED]),
    (
        "Shaking Experience and MMI",
        &["felt_shaking", fields::SHAKING_LEVEL, fields::SHAKING_INTENSITY_MMI],
    ),
    ("Location and MMI", &[LOCATION_COMBINED, fields::SHAKING_INTENSITY_MMI]),
    ("Location and Alert Arrival", &[LOCATION_COMBINED, fields::ALERT_ARRIVAL]),
];

const HELPFULNESS_REASON: (&str, &[&str]) = ("Helpfulness and Reason", &["helpfulness", "helpfulness_reason"]);

/// Posting window charted on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
    pub name: String,
    /// Inclusive
    pub start: NaiveDateTime,
    /// Inclusive
    pub end: NaiveDateTime,
}

/// The windows charted by the event-specific view
pub fn event_windows() -> Vec<EventWindow> {
    let at = |d: u32, h: u32, m: u32, s: u32| {
        NaiveDate::from_ymd_opt(2025, 4, d).and_then(|date| date.and_hms_opt(h, m, s))
    };
    match (at(23, 0, 0, 0), at(24, 23, 59, 59)) {
        (Some(start), Some(end)) => vec![EventWindow {
            name: "april_23_to_24".to_string(),
            start,
            end,
        }],
        _ => Vec::new(),
    }
}

/// One chart the suite intends to produce
#[derive(Debug)]
pub enum ChartPlan {
    Ready(Artifact),
    Skipped { title: String, reason: String },
    Failed { title: String, error: ChartError },
}

impl ChartPlan {
    fn rendered(title: &str, stem: &str, kind: ArtifactKind, body: Result<String, ChartError>) -> Self {
        match body {
            Ok(body) => ChartPlan::Ready(Artifact::new(stem, kind, body)),
            Err(error) => ChartPlan::Failed {
                title: title.to_string(),
                error,
            },
        }
    }

    fn skipped(title: impl Into<String>, reason: impl Into<String>) -> Self {
        ChartPlan::Skipped {
            title: title.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Views
// ============================================================================

pub fn sample_size_charts(dataset: &Dataset) -> Vec<ChartPlan> {
    let title = "Available Samples per Question";
    let chart = BarChart {
        title: title.to_string(),
        x_label: "Sample Size (n)".to_string(),
        bars: sample_sizes(dataset),
    };
    vec![ChartPlan::rendered(
        title,
        "sample_size_overview",
        ArtifactKind::Svg,
        bar_chart_svg(&chart),
    )]
}

pub fn general_charts(dataset: &Dataset) -> Vec<ChartPlan> {
    let mut plans = Vec::new();

    for attribute in dataset.columns() {
        if GENERAL_EXCLUDED.contains(&attribute.as_str()) {
            continue;
        }
        let label = title_case(attribute);

        if NUMERIC_ATTRIBUTES.contains(&attribute.as_str()) {
            let values = dataset.numbers(attribute);
            if values.is_empty() {
                plans.push(ChartPlan::skipped(&label, "no numeric values"));
                continue;
            }
            let title = format!("{} (n={})", label, values.len());
            let chart = Histogram {
                title: title.clone(),
                x_label: label,
                values,
                bins: HISTOGRAM_BINS,
            };
            plans.push(ChartPlan::rendered(&title, attribute, ArtifactKind::Svg, histogram_svg(&chart)));
            continue;
        }

        let observations = dataset.valid_observations(attribute);
        if observations.is_empty() {
            plans.push(ChartPlan::skipped(&label, "no valid values"));
            continue;
        }
        let title = format!("{} (n={})", label, dataset.valid_row_count(attribute));
        let chart = DonutChart {
            title: title.clone(),
            slices: value_counts(&observations, TOP_CATEGORIES),
            centre_label: format!("n={}", observations.len()),
        };
        plans.push(ChartPlan::rendered(&title, attribute, ArtifactKind::Svg, donut_svg(&chart)));
    }

    plans
}

pub fn event_charts(dataset: &Dataset, windows: &[EventWindow]) -> Vec<ChartPlan> {
    let mut plans = Vec::new();

    for window in windows {
        let event = dataset.posted_between(window.start, window.end);
        let prefix = title_case(&window.name);
        if event.is_empty() {
            plans.push(ChartPlan::skipped(&prefix, "no posts in window"));
            continue;
        }
        info!(window = %window.name, rows = event.len(), "Event window selected");

        for attribute in EVENT_HISTOGRAMS {
            let label = title_case(attribute);
            let title = format!("{}: {}", prefix, label);
            let values = event.numbers(attribute);
            if values.is_empty() {
                plans.push(ChartPlan::skipped(title, "no numeric values"));
                continue;
            }
            let chart = Histogram {
                title: format!("{} (n={})", title, values.len()),
                x_label: label,
                values,
                bins: HISTOGRAM_BINS,
            };
            plans.push(ChartPlan::rendered(
                &title,
                &format!("{}_{}", window.name, attribute),
                ArtifactKind::Svg,
                histogram_svg(&chart),
            ));
        }

        for (title, path) in EVENT_SUNBURSTS {
            let title = format!("{}: {}", prefix, title);
            plans.push(sunburst_plan(&event, path, &title, LeafPercent::OfRoot));
        }
    }

    plans
}

pub fn nested_charts(dataset: &Dataset) -> Vec<ChartPlan> {
    let (reason_title, reason_path) = HELPFULNESS_REASON;
    NESTED_RELATIONSHIPS
        .iter()
        .map(|(title, path)| (*title, *path, LeafPercent::OfRoot))
        .chain(std::iter::once((reason_title, reason_path, LeafPercent::OfParent)))
        .map(|(title, path, leaf_percent)| {
            match path.iter().find(|column| !dataset.has_column(column)) {
                Some(missing) => ChartPlan::skipped(title, format!("column {} absent", missing)),
                None => sunburst_plan(dataset, path, title, leaf_percent),
            }
        })
        .collect()
}

/// Sunburst of `path`, or a skip when there are too few valid observations
pub fn sunburst_plan(dataset: &Dataset, path: &[&str], title: &str, leaf_percent: LeafPercent) -> ChartPlan {
    let hierarchy = Hierarchy::build(dataset, path);
    if !hierarchy.is_renderable() {
        return ChartPlan::skipped(
            title,
            format!("not enough valid data (n={} rows)", hierarchy.rows),
        );
    }
    let chart = Sunburst {
        title: title.to_string(),
        hierarchy: &hierarchy,
        leaf_percent,
    };
    ChartPlan::rendered(title, title, ArtifactKind::Html, sunburst_html(&chart))
}

// ============================================================================
// Run
// ============================================================================

/// Outcome of one visualization run
#[derive(Debug, Default, Serialize)]
pub struct VisualizationReport {
    /// Rows left after preprocessing
    pub rows: usize,
    /// Object paths written
    pub uploaded: Vec<String>,
    /// Titles not rendered for lack of data
    pub skipped: Vec<String>,
    pub failures: Vec<UnitFailure>,
    pub diagnostics: Vec<Finding>,
}

impl VisualizationReport {
    pub fn display_string(&self) -> String {
        format!(
            "{} rows charted, {} charts uploaded, {} skipped, {} failed, {} diagnostic findings",
            self.rows,
            self.uploaded.len(),
            self.skipped.len(),
            self.failures.len(),
            self.diagnostics.len()
        )
    }
}

pub struct Visualizer<'a> {
    config: &'a PipelineConfig,
    store: &'a dyn ObjectStore,
}

impl<'a> Visualizer<'a> {
    pub fn new(config: &'a PipelineConfig, store: &'a dyn ObjectStore) -> Self {
        Self { config, store }
    }

    pub async fn run(&self) -> eews_common::Result<VisualizationReport> {
        let layout = &self.config.storage;
        let mapping = load_results(self.store, layout).await?.ok_or_else(|| {
            Error::NotFound(format!("Results file {}", self.store.uri(&layout.results_path())))
        })?;

        let dataset = Dataset::prepare(mapping);
        let mut report = VisualizationReport {
            rows: dataset.len(),
            ..Default::default()
        };
        let publisher = Publisher::new(self.store, layout);

        let views: [(&str, Vec<ChartPlan>); 4] = [
            ("sample sizes", sample_size_charts(&dataset)),
            ("general", general_charts(&dataset)),
            ("event-specific", event_charts(&dataset, &event_windows())),
            ("nested relationships", nested_charts(&dataset)),
        ];
        for (view, plans) in views {
            info!(view, charts = plans.len(), "Producing view");
            for plan in plans {
                self.deliver(plan, &publisher, &mut report).await;
            }
        }

        report.diagnostics = run_diagnostics(&dataset);

        info!("{}", report.display_string());
        Ok(report)
    }

    async fn deliver(&self, plan: ChartPlan, publisher: &Publisher<'_>, report: &mut VisualizationReport) {
        match plan {
            ChartPlan::Ready(artifact) => match publisher.publish(&artifact).await {
                Ok(path) => report.uploaded.push(path),
                Err(e) => report.failures.push(UnitFailure::record(
                    &artifact.file_name,
                    FailureKind::Remote,
                    e.to_string(),
                )),
            },
            ChartPlan::Skipped { title, reason } => {
                info!("Skipping chart '{}': {}", title, reason);
                report.skipped.push(title);
            }
            ChartPlan::Failed { title, error } => {
                report
                    .failures
                    .push(UnitFailure::record(title, FailureKind::Render, error.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eews_common::{AnnotationRecord, FieldValue, ResultsMapping};

    fn dataset(rows: Vec<Vec<(&str, FieldValue)>>) -> Dataset {
        let mapping: ResultsMapping = rows
            .into_iter()
            .enumerate()
            .map(|(i, pairs)| {
                let record: AnnotationRecord = pairs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect();
                (format!("{:03}.png", i), record)
            })
            .collect();
        Dataset::prepare(mapping)
    }

    fn ready_names(plans: &[ChartPlan]) -> Vec<String> {
        plans
            .iter()
            .filter_map(|p| match p {
                ChartPlan::Ready(a) => Some(a.file_name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_event_window_bounds() {
        let windows = event_windows();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].name, "april_23_to_24");
        assert_eq!(windows[0].start.to_string(), "2025-04-23 00:00:00");
        assert_eq!(windows[0].end.to_string(), "2025-04-24 23:59:59");
    }

    #[test]
    fn test_general_charts_choose_chart_type() {
        let data = dataset(vec![
            vec![
                ("username", "@a".into()),
                ("alert_type", "BE_AWARE_NOTIFICATION".into()),
                ("shaking_intensity_mmi", "4".into()),
                ("magnitude_on_alert_screenshot", "5.0".into()),
                ("helpfulness", "UNKNOWN".into()),
            ],
            vec![
                ("alert_type", "TAKE_ACTION_ALERT".into()),
                ("shaking_intensity_mmi", "5".into()),
            ],
        ]);

        let plans = general_charts(&data);

        assert_eq!(
            ready_names(&plans),
            vec!["alert_type.svg", "shaking_intensity_mmi.svg"]
        );
        assert!(plans
            .iter()
            .any(|p| matches!(p, ChartPlan::Skipped { title, .. } if title == "Helpfulness")));
    }

    #[test]
    fn test_sunburst_skipped_below_threshold() {
        let rows = (0..19)
            .map(|_| vec![("alert_type", "BE_AWARE_NOTIFICATION".into()), ("alert_mode", "SOUND".into())])
            .collect();

        let plan = sunburst_plan(
            &dataset(rows),
            &["alert_type", "alert_mode"],
            "Alert Type and Mode",
            LeafPercent::OfRoot,
        );

        match plan {
            ChartPlan::Skipped { title, reason } => {
                assert_eq!(title, "Alert Type and Mode");
                assert!(reason.contains("n=19"));
            }
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_sunburst_threshold_counts_rows_not_tags() {
        let rows = (0..10)
            .map(|_| {
                vec![
                    ("user's_gender", "FEMALE".into()),
                    ("alert_info_recall", vec!["ALERT_SOURCE", "ESTIMATED_MAGNITUDE"].into()),
                ]
            })
            .collect();

        let plan = sunburst_plan(
            &dataset(rows),
            &["user's_gender", "alert_info_recall"],
            "Gender and Alert Info Recall",
            LeafPercent::OfRoot,
        );

        match plan {
            ChartPlan::Skipped { reason, .. } => assert!(reason.contains("n=10 rows")),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_charts_require_columns() {
        let rows = (0..25)
            .map(|_| vec![("alert_type", "BE_AWARE_NOTIFICATION".into()), ("alert_mode", "SOUND".into())])
            .collect();

        let plans = nested_charts(&dataset(rows));

        assert_eq!(plans.len(), 16);
        assert_eq!(ready_names(&plans), vec!["alert_type_and_mode.html"]);
    }

    #[test]
    fn test_event_charts_use_window_prefix() {
        let rows = (0..20)
            .map(|i| {
                vec![
                    ("post_datetime", "2025-04-23T13:10".into()),
                    ("magnitude_on_alert_screenshot", (if i % 2 == 0 { "6.2" } else { "5.9" }).into()),
                    ("shaking_level", "MODERATE".into()),
                    ("warning_time_seconds", "21".into()),
                ]
            })
            .chain(std::iter::once(vec![
                ("post_datetime", "2025-05-01T10:00".into()),
                ("magnitude_on_alert_screenshot", "5.0".into()),
            ]))
            .collect();

        let plans = event_charts(&dataset(rows), &event_windows());

        assert_eq!(
            ready_names(&plans),
            vec![
                "april_23_to_24_magnitude_on_alert_screenshot.svg",
                "april_23_to_24_warning_time_seconds.svg",
                "april_23_to_24_shaking_level_and_warning_time.html",
            ]
        );
    }
}
