use anyhow::{Context, Result};
use rankface_engine::clock::format_millis;
use rankface_engine::{ComparisonMethod, Protocol, RecognitionTally, ScoreRecord, ScoreSink};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

pub const RATES_FILE: &str = "recognition-rates-and-runtime.txt";
const COLUMN: usize = 20;

/// Aggregate outcome of one (method, protocol) run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolResult {
    pub method: ComparisonMethod,
    pub protocol: Protocol,
    /// Percentage, two decimals.
    pub recognition_rate: String,
    /// Mean CPU runtime of the method's completed phases, four decimals.
    pub runtime: String,
    /// CPU runtime of this phase alone.
    pub phase_runtime: Duration,
    pub preprocessing_method: Option<&'static str>,
    pub preprocessing_time: Option<String>,
}

/// Rates and runtimes of one method across its protocol phases. A fresh
/// summary is used for every method so nothing carries over between runs.
#[derive(Debug, Default, Clone)]
pub struct MethodSummary {
    rates: [Option<String>; 3],
    runtimes: Vec<Duration>,
}

impl MethodSummary {
    fn slot(protocol: Protocol) -> usize {
        match protocol {
            Protocol::Close => 0,
            Protocol::Medium => 1,
            Protocol::Far => 2,
        }
    }

    pub fn add(&mut self, protocol: Protocol, tally: &RecognitionTally) {
        self.rates[Self::slot(protocol)] = Some(tally.rate_percent());
        self.runtimes.push(tally.runtime);
    }

    pub fn rate(&self, protocol: Protocol) -> Option<&str> {
        self.rates[Self::slot(protocol)].as_deref()
    }

    /// Arithmetic mean over completed phases.
    pub fn mean_runtime(&self) -> Option<Duration> {
        if self.runtimes.is_empty() {
            return None;
        }
        let total: Duration = self.runtimes.iter().sum();
        Some(total / self.runtimes.len() as u32)
    }

    pub fn result(
        &self,
        method: ComparisonMethod,
        protocol: Protocol,
        tally: &RecognitionTally,
    ) -> ProtocolResult {
        ProtocolResult {
            method,
            protocol,
            recognition_rate: tally.rate_percent(),
            runtime: format_millis(self.mean_runtime().unwrap_or(tally.runtime)),
            phase_runtime: tally.runtime,
            preprocessing_method: tally.preprocessing.as_ref().map(|p| p.method),
            preprocessing_time: tally.preprocessing.as_ref().map(|p| format_millis(p.time)),
        }
    }
}

/// Shortest round-trip decimal form; NaN and infinities spelled lowercase.
pub fn format_score(score: f64) -> String {
    if score.is_nan() {
        "nan".to_string()
    } else if score == f64::INFINITY {
        "inf".to_string()
    } else if score == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:?}", score)
    }
}

/// Writes score records as CSV rows.
pub struct CsvScoreWriter<W: Write> {
    out: W,
}

impl<W: Write> CsvScoreWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(
            out,
            "probe_reference_id,probe_subject_id,bio_ref_reference_id,bio_ref_subject_id,score"
        )?;
        Ok(Self { out })
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> ScoreSink for CsvScoreWriter<W> {
    fn record(&mut self, r: &ScoreRecord<'_>) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{}",
            csv_field(r.probe_reference_id),
            csv_field(r.probe_subject_id),
            csv_field(r.candidate_reference_id),
            csv_field(r.candidate_subject_id),
            format_score(r.score)
        )
    }
}

fn csv_field(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", s.replace('"', "\"\"")).into()
    } else {
        s.into()
    }
}

/// Persists per-pair scores and per-phase aggregate rows under one directory.
#[derive(Debug, Clone)]
pub struct Recorder {
    dir: PathBuf,
}

impl Recorder {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// `<protocol>-<method>.csv`, truncated if it already exists.
    pub fn score_writer(
        &self,
        method: ComparisonMethod,
        protocol: Protocol,
    ) -> Result<CsvScoreWriter<BufWriter<File>>> {
        let path = self.dir.join(format!("{}-{}.csv", protocol, method));
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        Ok(CsvScoreWriter::new(BufWriter::new(file))?)
    }

    /// Appends one row carrying every rate the method has so far.
    pub fn append_rates(&self, summary: &MethodSummary, result: &ProtocolResult) -> Result<()> {
        let path = self.dir.join(RATES_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;

        let is_new = file.metadata()?.len() == 0;
        if is_new {
            writeln!(
                file,
                "{}",
                table_row([
                    "comparison_method",
                    "close_recog_rate",
                    "medium_recog_rate",
                    "far_recog_rate",
                    "runtime",
                    "preprocessing",
                ])
            )?;
        }

        let preprocessing = match (&result.preprocessing_method, &result.preprocessing_time) {
            (Some(m), Some(t)) => format!("{} {}", m, t),
            _ => String::new(),
        };
        writeln!(
            file,
            "{}",
            table_row([
                result.method.as_str(),
                summary.rate(Protocol::Close).unwrap_or(""),
                summary.rate(Protocol::Medium).unwrap_or(""),
                summary.rate(Protocol::Far).unwrap_or(""),
                &result.runtime,
                &preprocessing,
            ])
        )
        .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

fn table_row(cells: [&str; 6]) -> String {
    let mut row = String::new();
    for cell in &cells[..5] {
        row.push_str(&format!("{:<width$} ", cell, width = COLUMN));
    }
    row.push_str(cells[5]);
    row.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankface_engine::evaluator::Preprocessing;

    fn tally(matches: usize, total: usize, ms: u64) -> RecognitionTally {
        RecognitionTally {
            positive_matches: matches,
            total_probes: total,
            runtime: Duration::from_millis(ms),
            preprocessing: None,
        }
    }

    #[test]
    fn test_runtime_is_mean_of_completed_phases() {
        let mut summary = MethodSummary::default();
        summary.add(Protocol::Close, &tally(1, 2, 10));
        assert_eq!(summary.mean_runtime(), Some(Duration::from_millis(10)));
        summary.add(Protocol::Medium, &tally(2, 2, 20));
        assert_eq!(summary.mean_runtime(), Some(Duration::from_millis(15)));
        summary.add(Protocol::Far, &tally(0, 2, 30));
        assert_eq!(summary.mean_runtime(), Some(Duration::from_millis(20)));
        assert_eq!(summary.rate(Protocol::Close), Some("50.00"));
        assert_eq!(summary.rate(Protocol::Far), Some("0.00"));
    }

    #[test]
    fn test_result_strings() {
        let mut summary = MethodSummary::default();
        let mut t = tally(1, 3, 2);
        t.preprocessing = Some(Preprocessing {
            method: "rank-list",
            time: Duration::from_micros(250),
        });
        summary.add(Protocol::Medium, &t);
        let r = summary.result(ComparisonMethod::Schroff, Protocol::Medium, &t);
        assert_eq!(r.recognition_rate, "33.33");
        assert_eq!(r.runtime, "2.0000 ms");
        assert_eq!(r.phase_runtime, Duration::from_millis(2));
        assert_eq!(r.preprocessing_method, Some("rank-list"));
        assert_eq!(r.preprocessing_time.as_deref(), Some("0.2500 ms"));
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(-0.25), "-0.25");
        assert_eq!(format_score(3.0), "3.0");
        assert_eq!(format_score(f64::NAN), "nan");
        assert_eq!(format_score(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_csv_writer() -> Result<()> {
        let mut w = CsvScoreWriter::new(Vec::new())?;
        w.record(&ScoreRecord {
            probe_reference_id: "001_cam1",
            probe_subject_id: "001",
            candidate_reference_id: "a,b",
            candidate_subject_id: "002",
            score: -0.5,
        })?;
        let out = String::from_utf8(w.finish()?)?;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("probe_reference_id,"));
        assert_eq!(lines[1], "001_cam1,001,\"a,b\",002,-0.5");
        Ok(())
    }

    #[test]
    fn test_rates_file_accumulates_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let recorder = Recorder::new(dir.path())?;
        let mut summary = MethodSummary::default();
        let phases = [
            (Protocol::Close, tally(1, 1, 4)),
            (Protocol::Medium, tally(0, 1, 8)),
        ];
        for (protocol, t) in phases {
            summary.add(protocol, &t);
            let result = summary.result(ComparisonMethod::Baseline, protocol, &t);
            recorder.append_rates(&summary, &result)?;
        }
        // a second recorder on the same directory must not repeat the header
        let again = Recorder::new(dir.path())?;
        let mut fresh = MethodSummary::default();
        let t = tally(1, 1, 1);
        fresh.add(Protocol::Close, &t);
        let result = fresh.result(ComparisonMethod::Cosine, Protocol::Close, &t);
        again.append_rates(&fresh, &result)?;

        let text = std::fs::read_to_string(dir.path().join(RATES_FILE))?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("comparison_method"));
        let cols: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(cols, ["baseline", "100.00", "0.00", "6.0000", "ms"]);
        let cols: Vec<&str> = lines[3].split_whitespace().collect();
        assert_eq!(cols, ["cosine", "100.00", "1.0000", "ms"]);
        Ok(())
    }
}
