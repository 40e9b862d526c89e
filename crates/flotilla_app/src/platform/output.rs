use std::collections::BTreeMap;
use std::io::{self, Write};

use flotilla_engine::Outcome;
use serde::Serialize;

/// One line of `--json` output.
#[derive(Debug, Serialize, PartialEq)]
pub struct OutcomeRecord {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Every value of a repeated header is kept, in arrival order.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Outcome> for OutcomeRecord {
    fn from(outcome: &Outcome) -> Self {
        let mut record = OutcomeRecord {
            name: outcome.target.name.clone(),
            address: outcome.target.address.clone(),
            status: None,
            headers: BTreeMap::new(),
            body: None,
            error: None,
        };
        match &outcome.result {
            Ok(response) => {
                record.status = Some(response.status.as_u16());
                for (name, value) in &response.headers {
                    record
                        .headers
                        .entry(name.as_str().to_string())
                        .or_default()
                        .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
                }
                record.body = Some(response.body_text());
            }
            Err(failure) => record.error = Some(failure.to_string()),
        }
        record
    }
}

/// Writes one JSON object per outcome, one per line, in target order.
pub fn write_json_lines(out: &mut impl Write, outcomes: &[Outcome]) -> io::Result<()> {
    for outcome in outcomes {
        serde_json::to_writer(&mut *out, &OutcomeRecord::from(outcome))?;
        writeln!(out)?;
    }
    out.flush()
}
