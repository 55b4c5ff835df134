//! Stage runner: every pipeline stage as a function from envelope to envelope.
//!
//! An external orchestrator calls [`Stages::ingest`], [`Stages::compliance`],
//! [`Stages::risk`] and [`Stages::decide`] one at a time, feeding each the
//! previous output. [`Stages::run`] chains them locally for the CLI and tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use covenant_ai::{AnalysisInput, ComplianceAnalyzer, Inference, RiskAnalyzer};
use covenant_core::{
    AnalyzerSettings, CaseEnvelope, CoreError, DocumentLocation, ExtractorSettings,
    TenantProfile, TenantSource, Thresholds, decide,
};
use covenant_extract::{ExtractionError, Ocr, TextExtractor};
use covenant_store::BlobStore;
use thiserror::Error;
use tracing::{info, warn};

/// Hard failures surfaced to the orchestrator. Only extraction can fail.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Envelope(#[from] CoreError),
}

/// Pipeline stage names, as recorded in a run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Compliance,
    Risk,
    Decide,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Compliance => "compliance",
            Self::Risk => "risk",
            Self::Decide => "decide",
        }
    }
}

/// One completed stage of a local run, stamped by the runner.
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: Stage,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of [`Stages::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_name: String,
    pub envelope: CaseEnvelope,
    pub stages: Vec<StageRecord>,
}

/// Capabilities shared by every stage.
pub struct Stages {
    extractor: TextExtractor,
    compliance: ComplianceAnalyzer,
    risk: RiskAnalyzer,
    tenants: TenantSource,
}

impl Stages {
    pub fn new(
        store: Arc<dyn BlobStore>,
        ocr: Arc<dyn Ocr>,
        inference: Arc<dyn Inference>,
        tenants: TenantSource,
    ) -> Self {
        Self::with_settings(
            store,
            ocr,
            inference,
            tenants,
            ExtractorSettings::default(),
            AnalyzerSettings::default(),
        )
    }

    pub fn with_settings(
        store: Arc<dyn BlobStore>,
        ocr: Arc<dyn Ocr>,
        inference: Arc<dyn Inference>,
        tenants: TenantSource,
        extractor: ExtractorSettings,
        analyzer: AnalyzerSettings,
    ) -> Self {
        Self {
            extractor: TextExtractor::new(store, ocr).with_settings(extractor),
            compliance: ComplianceAnalyzer::with_settings(inference.clone(), analyzer),
            risk: RiskAnalyzer::with_settings(inference, analyzer),
            tenants,
        }
    }

    /// Extraction stage. Opens the case (generating an id when none is
    /// supplied) and returns a fresh envelope carrying the text.
    pub async fn ingest(&self, envelope: CaseEnvelope) -> Result<CaseEnvelope, StageError> {
        let result = self
            .extractor
            .extract(envelope.case_id(), envelope.document.as_ref())
            .await?;

        info!(
            case_id = %result.case.case_id,
            tenant_id = ?result.case.tenant_id,
            method = ?result.method,
            chars = result.text.chars().count(),
            "document ingested"
        );

        Ok(CaseEnvelope {
            case_id: Some(result.case.case_id.clone()),
            document: Some(DocumentLocation::from(&result.case.document)),
            document_uri: Some(result.case.document.uri()),
            extracted_text: Some(result.text),
            extraction_method: Some(result.method),
            ..Default::default()
        })
    }

    /// Compliance stage. Never fails.
    pub async fn compliance(&self, mut envelope: CaseEnvelope) -> CaseEnvelope {
        let profile = self.profile(&envelope);
        let uri = envelope.document_uri();
        let findings = self
            .compliance
            .analyze(&AnalysisInput {
                text: envelope.text(),
                case_id: envelope.case_id(),
                document_uri: &uri,
                profile: &profile,
            })
            .await;
        envelope.compliance_findings = Some(findings);
        envelope
    }

    /// Risk stage. Never fails.
    pub async fn risk(&self, mut envelope: CaseEnvelope) -> CaseEnvelope {
        let profile = self.profile(&envelope);
        let uri = envelope.document_uri();
        let findings = self
            .risk
            .analyze(&AnalysisInput {
                text: envelope.text(),
                case_id: envelope.case_id(),
                document_uri: &uri,
                profile: &profile,
            })
            .await;
        envelope.risk_analysis_findings = Some(findings);
        envelope
    }

    /// Decision stage. Never fails; absent findings read as empty.
    ///
    /// A top-level `compliance_status` on the envelope overrides the one in
    /// the compliance findings.
    pub fn decide(&self, mut envelope: CaseEnvelope) -> CaseEnvelope {
        let profile = self.profile(&envelope);
        let thresholds = Thresholds::from_profile(&profile);

        let mut compliance = envelope.compliance_findings.clone().unwrap_or_default();
        if let Some(status) = envelope
            .compliance_status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            compliance.compliance_status = Some(status.to_string());
        }
        let risk = envelope.risk_analysis_findings.clone().unwrap_or_default();

        let decision = decide(&compliance, &risk, &thresholds)
            .for_case(envelope.case_id().map(str::to_string), envelope.tenant_id());

        info!(
            case_id = ?decision.case_id,
            tenant_id = ?decision.tenant_id,
            decision = %decision.decision,
            reason = %decision.reason,
            "case decided"
        );
        envelope.decision = Some(decision);
        envelope
    }

    /// Run all four stages. Compliance and risk run concurrently on the
    /// ingested envelope and are merged before the decision.
    pub async fn run(&self, envelope: CaseEnvelope) -> Result<RunReport, StageError> {
        let run_name = run_name(Utc::now());
        let mut stages = Vec::with_capacity(4);

        let ingested = self.ingest(envelope).await?;
        let method = ingested.extraction_method.map(|m| m.as_str()).unwrap_or("none");
        stages.push(record(Stage::Ingest, method.to_string()));

        let (with_compliance, with_risk) = futures::join!(
            self.compliance(ingested.clone()),
            self.risk(ingested.clone())
        );
        stages.push(record(
            Stage::Compliance,
            source_detail(
                with_compliance
                    .compliance_findings
                    .as_ref()
                    .and_then(|f| f.source),
            ),
        ));
        stages.push(record(
            Stage::Risk,
            source_detail(
                with_risk
                    .risk_analysis_findings
                    .as_ref()
                    .and_then(|f| f.source),
            ),
        ));

        let merged = CaseEnvelope {
            compliance_findings: with_compliance.compliance_findings,
            risk_analysis_findings: with_risk.risk_analysis_findings,
            ..ingested
        };
        let decided = self.decide(merged);
        let detail = decided
            .decision
            .as_ref()
            .map(|d| d.decision.to_string())
            .unwrap_or_default();
        stages.push(record(Stage::Decide, detail));

        info!(run = %run_name, case_id = ?decided.case_id, "run complete");
        Ok(RunReport {
            run_name,
            envelope: decided,
            stages,
        })
    }

    /// Tenant profile for the envelope's document, loaded fresh each call.
    fn profile(&self, envelope: &CaseEnvelope) -> TenantProfile {
        let tenant_id = envelope.tenant_id();
        if tenant_id.is_none() {
            warn!(case_id = ?envelope.case_id(), "no tenant id, using default profile");
        }
        self.tenants.load().load_profile(tenant_id.as_deref())
    }
}

fn record(stage: Stage, detail: String) -> StageRecord {
    info!(stage = stage.as_str(), detail = %detail, "stage complete");
    StageRecord {
        stage,
        detail,
        timestamp: Utc::now(),
    }
}

fn source_detail(source: Option<covenant_core::FindingSource>) -> String {
    source.map(|s| s.as_str()).unwrap_or("none").to_string()
}

/// Unique name for a local run: `run-<UTC timestamp>-<8 hex chars>`.
pub fn run_name(now: DateTime<Utc>) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}-{}", now.format("%Y%m%dT%H%M%SZ"), &id[..8])
}
