//! Result stream of training and inference runs.
//!
//! The network reports progress through a [`LogSink`] and never formats
//! anything itself. [`TsvSink`] renders events as the tab-separated lines the
//! `nnet` binary prints and `infview` reads back.

use crate::error::{NetError, Result};
use std::io::Write;

/// End of one training epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    pub epoch_index: usize,
    pub train_correct: usize,
    pub train_cost: f64,
    pub eval_correct: usize,
    pub eval_cost: f64,
}

/// End of a whole training run, aggregated over every epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReport {
    pub total_train_correct: usize,
    pub train_cost_average: f64,
    pub total_eval_correct: usize,
    pub eval_cost_average: f64,
}

/// One inferred image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferImageReport {
    /// Position within this inference run.
    pub infer_index: usize,
    /// Position within the source dataset.
    pub image_index: usize,
    pub label: usize,
    pub answer: usize,
}

/// End of an inference run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferReport {
    pub correct: usize,
    pub cost: f64,
}

/// Observer of training and inference events. Every method defaults to a no-op.
pub trait LogSink {
    fn done_train_epoch(&mut self, _report: &EpochReport) -> Result<()> {
        Ok(())
    }

    fn done_train(&mut self, _report: &TrainingReport) -> Result<()> {
        Ok(())
    }

    fn done_infer_image(&mut self, _report: &InferImageReport) -> Result<()> {
        Ok(())
    }

    fn done_infer(&mut self, _report: &InferReport) -> Result<()> {
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {}

/// Writes one tab-separated line per event.
pub struct TsvSink<W: Write> {
    writer: W,
}

impl<W: Write> TsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LogSink for TsvSink<W> {
    fn done_train_epoch(&mut self, r: &EpochReport) -> Result<()> {
        writeln!(
            self.writer,
            "doneTrainEpoch\t{}\t{}\t{}\t{}\t{}",
            r.epoch_index, r.train_correct, r.train_cost, r.eval_correct, r.eval_cost
        )?;
        Ok(())
    }

    fn done_train(&mut self, r: &TrainingReport) -> Result<()> {
        writeln!(
            self.writer,
            "doneTrain\t{}\t{}\t{}\t{}",
            r.total_train_correct, r.train_cost_average, r.total_eval_correct, r.eval_cost_average
        )?;
        self.writer.flush()?;
        Ok(())
    }

    fn done_infer_image(&mut self, r: &InferImageReport) -> Result<()> {
        writeln!(
            self.writer,
            "doneInferImage\t{}\t{}\t{}\t{}",
            r.infer_index, r.image_index, r.label, r.answer
        )?;
        Ok(())
    }

    fn done_infer(&mut self, r: &InferReport) -> Result<()> {
        writeln!(self.writer, "doneInfer\t{}\t{}", r.correct, r.cost)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl InferImageReport {
    /// Parse a `doneInferImage` line.
    ///
    /// Lines of any other kind yield `Ok(None)`; a `doneInferImage` line with
    /// the wrong field count or a non-numeric field is an error.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let tokens: Vec<&str> = line.split([' ', '\t']).filter(|t| !t.is_empty()).collect();
        if tokens.first() != Some(&"doneInferImage") {
            return Ok(None);
        }
        if tokens.len() != 5 {
            return Err(NetError::Log(format!(
                "expected 5 fields, found {}: '{}'",
                tokens.len(),
                line
            )));
        }
        let field = |i: usize| -> Result<usize> {
            tokens[i]
                .parse()
                .map_err(|_| NetError::Log(format!("'{}' is not an unsigned integer", tokens[i])))
        };
        Ok(Some(Self {
            infer_index: field(1)?,
            image_index: field(2)?,
            label: field(3)?,
            answer: field(4)?,
        }))
    }

    pub fn is_mistake(&self) -> bool {
        self.label != self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsv_lines() {
        let mut sink = TsvSink::new(Vec::new());
        sink.done_train_epoch(&EpochReport {
            epoch_index: 0,
            train_correct: 7,
            train_cost: 0.5,
            eval_correct: 3,
            eval_cost: 0.25,
        })
        .unwrap();
        sink.done_infer(&InferReport {
            correct: 9,
            cost: 1.5,
        })
        .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "doneTrainEpoch\t0\t7\t0.5\t3\t0.25\ndoneInfer\t9\t1.5\n");
    }

    #[test]
    fn test_infer_image_line_round_trip() {
        let report = InferImageReport {
            infer_index: 2,
            image_index: 12,
            label: 4,
            answer: 9,
        };
        let mut sink = TsvSink::new(Vec::new());
        sink.done_infer_image(&report).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();

        let parsed = InferImageReport::parse_line(text.trim_end()).unwrap();
        assert_eq!(parsed, Some(report));
        assert!(report.is_mistake());
    }

    #[test]
    fn test_parse_ignores_other_kinds() {
        assert_eq!(InferImageReport::parse_line("doneInfer\t9\t1.5").unwrap(), None);
        assert_eq!(InferImageReport::parse_line("").unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_bad_field_count() {
        let err = InferImageReport::parse_line("doneInferImage\t1\t2\t3").unwrap_err();
        assert!(matches!(err, NetError::Log(_)));
        assert!(InferImageReport::parse_line("doneInferImage\t1\t2\tx\t4").is_err());
    }
}
