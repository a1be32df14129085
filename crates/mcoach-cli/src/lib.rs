//! NDJSON front end for the feedback engine.
//!
//! Each input line is one [`FeedbackRequest`], with skeletons either
//! structured or as raw tracker rows; each output line is the matching
//! [`mcoach_models::FeedbackReport`] or an `{"error": ...}` object.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use anyhow::Context;
use mcoach_engine::{FeedbackPipeline, SessionRegistry};
use mcoach_models::FeedbackRequest;
use tracing::{debug, warn};

/// Counts for one input stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: usize,
    pub failed: usize,
}

/// Open a file argument, or stdin for `None` and `"-"`.
pub fn open_input(path: Option<&str>) -> anyhow::Result<Box<dyn BufRead>> {
    match path {
        Some(path) if path != "-" => {
            let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

/// Analyze every request line of `input`, writing one line per request.
///
/// Malformed or rejected requests produce an error line and do not stop the
/// stream; only I/O failures are returned as errors.
pub fn run<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    pipeline: &FeedbackPipeline,
    registry: &mut SessionRegistry,
) -> anyhow::Result<RunStats> {
    let mut stats = RunStats::default();
    let mut buf = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).context("failed to read input")? == 0 {
            break;
        }
        line_number += 1;

        let outcome = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => serde_json::from_str::<FeedbackRequest>(line)
                .map_err(|e| format!("invalid request: {e}"))
                .and_then(|request| {
                    pipeline
                        .analyze_in(&request, registry)
                        .map_err(|e| e.to_string())
                }),
            Err(e) => Err(format!("invalid request: {e}")),
        };
        stats.processed += 1;

        let value = match outcome {
            Ok(report) => {
                debug!(line = line_number, score = report.score.overall_score, "Request analyzed");
                serde_json::to_value(&report).context("failed to encode report")?
            }
            Err(message) => {
                warn!(line = line_number, error = %message, "Request failed");
                stats.failed += 1;
                serde_json::json!({ "error": message, "line": line_number })
            }
        };

        serde_json::to_writer(&mut output, &value).context("failed to write output")?;
        output.write_all(b"\n").context("failed to write output")?;
    }

    output.flush().context("failed to flush output")?;
    Ok(stats)
}

/// Pretty JSON Schema of [`FeedbackRequest`].
pub fn request_schema() -> anyhow::Result<String> {
    let schema = schemars::schema_for!(FeedbackRequest);
    serde_json::to_string_pretty(&schema).context("failed to encode schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcoach_engine::fixtures::{hand_points, hand_skeleton};
    use mcoach_engine::EngineConfig;
    use mcoach_models::FeedbackReport;
    use std::io::Cursor;

    fn request_line(session: Option<&str>) -> String {
        let hand = hand_skeleton();
        let mut request = FeedbackRequest::new(hand.clone(), hand);
        if let Some(session) = session {
            request = request.with_session(session);
        }
        serde_json::to_string(&request).unwrap()
    }

    fn run_lines(input: &str, registry: &mut SessionRegistry) -> (RunStats, Vec<serde_json::Value>) {
        let pipeline = FeedbackPipeline::default();
        let mut output = Vec::new();
        let stats = run(Cursor::new(input.to_string()), &mut output, &pipeline, registry).unwrap();
        let values = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (stats, values)
    }

    #[test]
    fn test_one_line_per_request() {
        let input = format!("{}\n\nnot json\n{}\n", request_line(None), request_line(Some("s1")));
        let mut registry = EngineConfig::default().session_registry();
        let (stats, values) = run_lines(&input, &mut registry);

        assert_eq!(stats, RunStats { processed: 3, failed: 1 });
        assert_eq!(values.len(), 3);

        let report: FeedbackReport = serde_json::from_value(values[0].clone()).unwrap();
        assert_eq!(report.cues[0].text, "Perfect! Keep it up!");
        assert!(values[1]["error"].as_str().unwrap().starts_with("invalid request"));
        assert_eq!(values[1]["line"], 3);
        assert!(values[2]["score"].is_object());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_engine_errors_reported_inline() {
        let mut request: serde_json::Value = serde_json::from_str(&request_line(None)).unwrap();
        request["confidence_threshold"] = serde_json::json!(2.0);
        let mut registry = SessionRegistry::default();
        let (stats, values) = run_lines(&format!("{request}\n"), &mut registry);

        assert_eq!(stats.failed, 1);
        assert!(values[0]["error"]
            .as_str()
            .unwrap()
            .contains("confidence_threshold"));
    }

    #[test]
    fn test_invalid_utf8_reported_inline() {
        let mut input = b"\xff\xfe{}\n".to_vec();
        input.extend_from_slice(request_line(None).as_bytes());
        input.push(b'\n');

        let pipeline = FeedbackPipeline::default();
        let mut output = Vec::new();
        let stats = run(
            Cursor::new(input),
            &mut output,
            &pipeline,
            &mut SessionRegistry::default(),
        )
        .unwrap();
        assert_eq!(stats, RunStats { processed: 2, failed: 1 });

        let values: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert!(values[0]["error"].as_str().unwrap().contains("utf-8"));
        assert_eq!(values[0]["line"], 1);
        assert!(values[1]["score"].is_object());
    }

    #[test]
    fn test_raw_row_requests() {
        let rows: Vec<[f64; 3]> = hand_points().iter().map(|p| [p.x, p.y, 0.9]).collect();
        let line = serde_json::json!({
            "user": rows,
            "expert": rows,
            "keypoint_type": "hand",
            "session_id": "rows",
        });
        let short = serde_json::json!({ "user": [[0.1, 0.2, 0.9]], "expert": rows });
        let mut registry = SessionRegistry::default();
        let (stats, values) = run_lines(&format!("{line}\n{short}\n"), &mut registry);

        assert_eq!(stats, RunStats { processed: 2, failed: 1 });
        let report: FeedbackReport = serde_json::from_value(values[0].clone()).unwrap();
        assert!((report.score.overall_score - 100.0).abs() < 1e-6);
        assert_eq!(report.cues[0].text, "Perfect! Keep it up!");
        assert!(values[1]["error"].as_str().unwrap().contains("21 joints"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_open_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", request_line(None)).unwrap();

        let input = open_input(Some(file.path().to_str().unwrap())).unwrap();
        let mut output = Vec::new();
        let stats = run(
            input,
            &mut output,
            &FeedbackPipeline::default(),
            &mut SessionRegistry::default(),
        )
        .unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_open_missing_file() {
        let err = open_input(Some("/nonexistent/requests.ndjson")).err().unwrap();
        assert!(err.to_string().contains("failed to open"));
    }

    #[test]
    fn test_schema_names_request_fields() {
        let schema = request_schema().unwrap();
        assert!(schema.contains("confidence_threshold"));
        assert!(schema.contains("session_id"));
        assert!(schema.contains("row_layout"));
    }
}
