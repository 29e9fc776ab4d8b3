//! Aggregations behind the charts

use eews_common::record::fields;
use std::collections::HashMap;

use crate::dataset::{Dataset, Row};

/// Sunbursts with fewer contributing rows are not rendered
pub const MIN_SUNBURST_ROWS: usize = 20;

/// Columns left out of the sample size overview
const SAMPLE_SIZE_EXCLUDED: [&str; 3] = [fields::USERNAME, fields::POST_DATETIME, fields::REASONING];

/// `shaking_intensity_mmi` → `Shaking Intensity Mmi`
pub fn title_case(column: &str) -> String {
    column
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Tag frequencies, most frequent first (ties alphabetical), at most `limit`
pub fn value_counts(observations: &[String], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in observations {
        *counts.entry(tag.as_str()).or_default() += 1;
    }
    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(tag, count)| (tag.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(limit);
    sorted
}

/// Valid observation count per column, labelled with the title-cased name
///
/// Sorted ascending by count.
pub fn sample_sizes(dataset: &Dataset) -> Vec<(String, usize)> {
    let mut sizes: Vec<(String, usize)> = dataset
        .columns()
        .iter()
        .filter(|column| !SAMPLE_SIZE_EXCLUDED.contains(&column.as_str()))
        .map(|column| (title_case(column), dataset.valid_observations(column).len()))
        .collect();
    sizes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    sizes
}

/// One ring segment of a sunburst
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub label: String,
    pub count: usize,
    /// Ordered by count descending, ties by label
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            count: 0,
            children: Vec::new(),
        }
    }

    fn add_path(&mut self, path: &[String]) {
        self.count += 1;
        if let Some((head, rest)) = path.split_first() {
            let child = match self.children.iter().position(|c| &c.label == head) {
                Some(index) => &mut self.children[index],
                None => {
                    self.children.push(HierarchyNode::new(head));
                    let last = self.children.len() - 1;
                    &mut self.children[last]
                }
            };
            child.add_path(rest);
        }
    }

    fn sort(&mut self) {
        self.children
            .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        for child in &mut self.children {
            child.sort();
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Joint distribution of 2–3 columns as a tree
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub path: Vec<String>,
    /// Top-level categories; their counts sum to [`Hierarchy::total`]
    pub roots: Vec<HierarchyNode>,
    /// Expanded observations
    pub total: usize,
    /// Rows with a valid tag at every level
    pub rows: usize,
}

impl Hierarchy {
    /// Build from every row whose path columns all hold valid tags
    ///
    /// List values expand to the cartesian product of their tags, so one row
    /// can contribute several observations.
    pub fn build(dataset: &Dataset, path: &[&str]) -> Self {
        let mut root = HierarchyNode::new("");
        let mut rows = 0;
        for row in dataset.rows() {
            let observations = row_paths(row, path);
            if !observations.is_empty() {
                rows += 1;
            }
            for observation in observations {
                root.add_path(&observation);
            }
        }
        root.sort();

        Self {
            path: path.iter().map(|c| c.to_string()).collect(),
            total: root.count,
            rows,
            roots: root.children,
        }
    }

    /// At least twenty contributing rows, however many tags they expand to
    pub fn is_renderable(&self) -> bool {
        self.rows >= MIN_SUNBURST_ROWS
    }
}

/// Cartesian product of one row's valid tags along `path`; empty when any level has none
fn row_paths(row: &Row, path: &[&str]) -> Vec<Vec<String>> {
    let mut combos: Vec<Vec<String>> = vec![Vec::new()];
    for column in path {
        let tags = row.valid_tags(column);
        if tags.is_empty() {
            return Vec::new();
        }
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                tags.iter().map(move |tag| {
                    let mut next = prefix.clone();
                    next.push(tag.clone());
                    next
                })
            })
            .collect();
    }
    combos
}
