//! Adapter for carriers that answer with an HTML scan table.
//!
//! The latest scan is the first table row painted with the highlight colour
//! that has at least four cells: location, status text, date, time.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use trackfill_shared::{Outcome, Result};
use url::Url;

use super::CarrierAdapter;
use crate::endpoint::EndpointTemplate;

/// Background colour of highlighted scan rows.
pub const DEFAULT_ROW_MARKER: &str = "WHITE";

/// Cells needed before a row is read: location, status, date, time.
const MIN_CELLS: usize = 4;

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("static selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("static selector"));

/// Markup adapter (Bluedart-style HTML tracking pages).
pub struct MarkupAdapter {
    family: String,
    endpoint: EndpointTemplate,
    row_marker: String,
}

impl MarkupAdapter {
    pub fn new(family: &str, endpoint: EndpointTemplate, row_marker: &str) -> Self {
        Self {
            family: family.to_string(),
            endpoint,
            row_marker: row_marker.to_string(),
        }
    }
}

impl CarrierAdapter for MarkupAdapter {
    fn family(&self) -> &str {
        &self.family
    }

    fn request_url(&self, tracking_id: &str) -> Result<Url> {
        self.endpoint.url_for(tracking_id)
    }

    fn parse(&self, body: &str) -> Outcome {
        parse_highlighted_row(body, &self.row_marker)
    }
}

/// Read the status from the first highlighted row with enough cells.
///
/// Row counts differ between shipments, so rows that are too short are
/// skipped rather than indexed.
pub fn parse_highlighted_row(body: &str, marker: &str) -> Outcome {
    let doc = Html::parse_document(body);

    for row in doc.select(&ROW_SELECTOR) {
        let highlighted = row
            .value()
            .attr("bgcolor")
            .is_some_and(|colour| colour.trim().eq_ignore_ascii_case(marker));
        if !highlighted {
            continue;
        }

        let cells: Vec<String> = row
            .select(&CELL_SELECTOR)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < MIN_CELLS {
            continue;
        }

        let timestamp = format!("{} {}", cells[2], cells[3]);
        return Outcome::from_parts(&cells[1], &timestamp);
    }

    Outcome::NotFound
}
