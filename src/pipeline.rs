use anyhow::{Context, Result};
use log::info;
use rankface_engine::clock::{format_millis, CpuTimer};
use rankface_engine::evaluator::{Discard, Preprocessing};
use rankface_engine::{
    Category, CohortSample, ComparisonMethod, EngineError, Evaluator, MethodScorer, Preprocessor,
    Protocol, RecognitionTally, Sample,
};
use std::str::FromStr;

use crate::config::Config;
use crate::dataset::{self, Manifest};
use crate::recorder::{MethodSummary, ProtocolResult, Recorder};
use crate::storage::FeatureStore;

/// Methods chosen on the command line: one name or `all`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSelection(pub Vec<ComparisonMethod>);

impl FromStr for MethodSelection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self(ComparisonMethod::ALL.to_vec()));
        }
        Ok(Self(vec![s.parse()?]))
    }
}

/// Protocols chosen on the command line: one name or `all` (close, medium, far).
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolSelection(pub Vec<Protocol>);

impl FromStr for ProtocolSelection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self(Protocol::ALL.to_vec()));
        }
        Ok(Self(vec![s.parse()?]))
    }
}

/// Samples of one protocol with their features loaded.
struct Loaded {
    protocol: Protocol,
    probes: Vec<Sample>,
    references: Vec<Sample>,
    cohort: Vec<CohortSample>,
}

/// Evaluates methods over protocols against one dataset.
pub struct Pipeline<'a> {
    cfg: &'a Config,
    manifest: &'a Manifest,
    store: &'a dyn FeatureStore,
    recorder: Option<Recorder>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        cfg: &'a Config,
        manifest: &'a Manifest,
        store: &'a dyn FeatureStore,
    ) -> Result<Self> {
        let recorder = if cfg.record_output {
            Some(Recorder::new(&cfg.output_dir)?)
        } else {
            None
        };
        Ok(Self {
            cfg,
            manifest,
            store,
            recorder,
        })
    }

    /// Runs every method over every protocol, methods outermost.
    ///
    /// Features for all selected protocols are loaded before the first
    /// evaluation, so a missing vector aborts the run before anything is
    /// recorded.
    pub fn run(
        &self,
        methods: &[ComparisonMethod],
        protocols: &[Protocol],
    ) -> Result<Vec<ProtocolResult>> {
        let with_cohort = methods.iter().any(|m| m.category() != Category::Baseline);
        let loaded = protocols
            .iter()
            .map(|&protocol| self.load(protocol, with_cohort))
            .collect::<Result<Vec<_>>>()?;

        let mut results = Vec::with_capacity(methods.len() * protocols.len());
        for &method in methods {
            let mut summary = MethodSummary::default();
            for data in &loaded {
                results.push(self.run_protocol(method, data, &mut summary)?);
            }
        }
        Ok(results)
    }

    fn load(&self, protocol: Protocol, with_cohort: bool) -> Result<Loaded> {
        let extraction = self.manifest.extract(protocol);
        if extraction.probes.is_empty() {
            anyhow::bail!("manifest has no probes captured at distance {}", protocol);
        }
        Ok(Loaded {
            protocol,
            probes: dataset::load_samples(&extraction.probes, self.store)?,
            references: dataset::load_samples(&extraction.references, self.store)?,
            cohort: if with_cohort {
                dataset::load_cohort(&extraction.cohort, self.store)?
            } else {
                Vec::new()
            },
        })
    }

    fn run_protocol(
        &self,
        method: ComparisonMethod,
        data: &Loaded,
        summary: &mut MethodSummary,
    ) -> Result<ProtocolResult> {
        let protocol = data.protocol;
        info!(
            "Running [{}] {} with protocol {}",
            method.category(),
            method,
            protocol
        );

        let preprocessor = Preprocessor::new(method.category(), self.cfg.standardization);
        let (probes, references) = (data.probes.clone(), data.references.clone());
        let timer = CpuTimer::start();
        let prepared = preprocessor
            .prepare(probes, references, &data.cohort, protocol)
            .with_context(|| format!("preprocessing for {} ({})", method, protocol))?;
        let preprocessing_time = timer.elapsed();

        let scorer = MethodScorer::new(method, self.cfg.params_for(prepared.cohort_size));
        let evaluator = Evaluator::new(scorer);
        let mut tally = self
            .evaluate(&evaluator, &prepared, method, protocol)
            .with_context(|| format!("evaluating {} ({})", method, protocol))?;
        tally.preprocessing = preprocessor.method_name().map(|name| Preprocessing {
            method: name,
            time: preprocessing_time,
        });

        summary.add(protocol, &tally);
        let result = summary.result(method, protocol, &tally);
        if let Some(recorder) = &self.recorder {
            recorder.append_rates(summary, &result)?;
        }

        info!(
            "done: rate={}% runtime={} ({} of {} probes)",
            result.recognition_rate,
            format_millis(tally.runtime),
            tally.positive_matches,
            tally.total_probes
        );
        Ok(result)
    }

    fn evaluate(
        &self,
        evaluator: &Evaluator<MethodScorer>,
        prepared: &rankface_engine::Prepared,
        method: ComparisonMethod,
        protocol: Protocol,
    ) -> Result<RecognitionTally> {
        match &self.recorder {
            Some(recorder) => {
                let mut writer = recorder.score_writer(method, protocol)?;
                let tally =
                    evaluator.evaluate(&prepared.probes, &prepared.references, &mut writer)?;
                writer.finish()?;
                Ok(tally)
            }
            None => Ok(evaluator.evaluate(&prepared.probes, &prepared.references, &mut Discard)?),
        }
    }
}
