use std::collections::BTreeMap;

use serde::Serialize;

/// Structured plot or table data a module hands to the HTML report.
///
/// Plots serialize as a list of Plotly trace objects plus axis titles, so
/// the page can pass them to `Plotly.newPlot` unchanged.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Fragment {
    Plot {
        series: Vec<Series>,
        x_title: String,
        y_title: String,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Empty {
        message: String,
    },
}

impl Fragment {
    pub fn plot(series: Vec<Series>, x_title: &str, y_title: &str) -> Self {
        Fragment::Plot {
            series,
            x_title: x_title.to_string(),
            y_title: y_title.to_string(),
        }
    }

    pub fn empty(message: &str) -> Self {
        Fragment::Empty {
            message: message.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coord {
    Num(f64),
    Label(String),
}

impl From<f64> for Coord {
    fn from(v: f64) -> Self {
        Coord::Num(v)
    }
}

impl From<u64> for Coord {
    fn from(v: u64) -> Self {
        Coord::Num(v as f64)
    }
}

impl From<String> for Coord {
    fn from(v: String) -> Self {
        Coord::Label(v)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Color {
    pub color: String,
}

/// One Plotly trace.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub x: Vec<Coord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<Coord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub z: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Color>,
    /// Extra numeric arrays, e.g. precomputed box statistics.
    #[serde(flatten)]
    pub extra: BTreeMap<&'static str, Vec<f64>>,
}

impl Series {
    pub fn new(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            mode: None,
            line: None,
            marker: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn line(name: impl Into<String>, x: Vec<Coord>, y: Vec<Coord>, color: &str) -> Self {
        Self {
            x,
            y,
            mode: Some("lines"),
            line: Some(Color {
                color: color.to_string(),
            }),
            ..Self::new("scatter", name)
        }
    }

    pub fn bar(name: impl Into<String>, x: Vec<Coord>, y: Vec<Coord>, color: &str) -> Self {
        Self {
            x,
            y,
            marker: Some(Color {
                color: color.to_string(),
            }),
            ..Self::new("bar", name)
        }
    }
}

pub fn coords<T: Into<Coord>>(values: impl IntoIterator<Item = T>) -> Vec<Coord> {
    values.into_iter().map(Into::into).collect()
}
