//! Artifact encoding for generated reports.

use super::{MetricReport, ReportError};
use crate::schema::ReportFormat;

const CSV_HEADER: [&str; 6] = ["channel", "publisher", "name", "unit", "time", "value"];

pub fn encode(reports: &[MetricReport], format: ReportFormat) -> Result<Vec<u8>, ReportError> {
    match format {
        ReportFormat::Csv => encode_csv(reports),
        ReportFormat::Json => {
            serde_json::to_vec_pretty(reports).map_err(|e| ReportError::Format(e.to_string()))
        }
    }
}

fn value_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn encode_csv(reports: &[MetricReport]) -> Result<Vec<u8>, ReportError> {
    let mut w = csv::Writer::from_writer(Vec::new());
    w.write_record(CSV_HEADER)
        .map_err(|e| ReportError::Format(e.to_string()))?;
    for report in reports {
        for m in &report.messages {
            let time = m.time.to_rfc3339();
            let value = value_cell(&m.value);
            w.write_record([
                m.channel.as_str(),
                m.publisher.as_str(),
                m.name.as_str(),
                m.unit.as_deref().unwrap_or(""),
                time.as_str(),
                value.as_str(),
            ])
            .map_err(|e| ReportError::Format(e.to_string()))?;
        }
    }
    w.into_inner()
        .map_err(|e| ReportError::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::reader::StoredMessage;
    use crate::schema::MetricSelector;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn sample() -> Vec<MetricReport> {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        vec![MetricReport {
            metric: MetricSelector {
                channel_id: "temp".into(),
                client_id: None,
                name: None,
            },
            messages: vec![
                StoredMessage {
                    channel: "temp".into(),
                    publisher: "s1".into(),
                    name: "t".into(),
                    unit: Some("C".into()),
                    time: t,
                    value: json!(21.5),
                },
                StoredMessage {
                    channel: "temp".into(),
                    publisher: "s1".into(),
                    name: "state".into(),
                    unit: None,
                    time: t,
                    value: json!("ok, fine"),
                },
            ],
        }]
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let out = String::from_utf8(encode(&sample(), ReportFormat::Csv).unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "channel,publisher,name,unit,time,value");
        assert_eq!(lines[1], "temp,s1,t,C,2024-01-01T00:00:00+00:00,21.5");
        assert_eq!(lines[2], "temp,s1,state,,2024-01-01T00:00:00+00:00,\"ok, fine\"");
    }

    #[test]
    fn json_keeps_metric_grouping() {
        let out = encode(&sample(), ReportFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v[0]["metric"]["channel_id"], "temp");
        assert_eq!(v[0]["messages"].as_array().unwrap().len(), 2);
    }
}
