//! Execution orchestrator.
//!
//! Drives one synchronization run:
//!
//! ```text
//! connect -> extract -> compare -> [empty? done] -> plan -> validate
//!         -> (dry run? report : execute statements) -> done
//! ```
//!
//! Every external call goes through the configured [`RetryPolicy`], and both
//! connections are closed before [`SyncOrchestrator::run`] returns, whatever
//! the outcome.
//!
//! [`RetryPolicy`]: crate::retry::RetryPolicy

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use schemasync_core::diff::{compare_schemas, SchemaDiff};
use schemasync_core::error::{Result, SyncError};
use schemasync_core::plan::{MigrationPlan, MigrationStatement};
use schemasync_core::planner::Planner;

use crate::config::{DatabaseConfig, SyncConfig};
use crate::database::{Database, Role, SchemaExtractor};
use crate::progress::{ProgressReporter, SyncPhase};

/// Outcome of a run.
///
/// The diff, plan, executed statements and warnings are kept on failure as
/// well, so a partially applied plan can be inspected.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Whether the run completed without error.
    pub success: bool,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// The computed diff, once comparison succeeded.
    pub diff: Option<SchemaDiff>,
    /// The computed plan, once planning succeeded.
    pub plan: Option<MigrationPlan>,
    /// Statements that were executed, in order.
    pub executed_statements: Vec<MigrationStatement>,
    /// Plan warnings.
    pub warnings: Vec<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration: Duration,
    /// The error that stopped the run.
    pub error: Option<SyncError>,
}

impl ExecutionResult {
    fn started(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            success: false,
            dry_run,
            diff: None,
            plan: None,
            executed_statements: Vec::new(),
            warnings: Vec::new(),
            started_at: now,
            finished_at: now,
            duration: Duration::ZERO,
            error: None,
        }
    }

    fn finish(mut self, outcome: Result<()>, clock: Instant) -> Self {
        self.finished_at = Utc::now();
        self.duration = clock.elapsed();
        match outcome {
            Ok(()) => self.success = true,
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Whether the schemas already matched.
    #[must_use]
    pub fn already_synchronized(&self) -> bool {
        self.success && self.diff.as_ref().is_some_and(SchemaDiff::is_empty)
    }
}

/// Runs the synchronization pipeline.
pub struct SyncOrchestrator<D, E> {
    config: SyncConfig,
    database: D,
    extractor: E,
    planner: Planner,
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl<D, E> SyncOrchestrator<D, E>
where
    D: Database,
    E: SchemaExtractor<D::Connection>,
{
    /// Creates an orchestrator.
    pub fn new(config: SyncConfig, database: D, extractor: E) -> Self {
        Self {
            config,
            database,
            extractor,
            planner: Planner::new(),
            reporter: None,
        }
    }

    /// Sets the progress reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the database backend.
    #[must_use]
    pub fn database(&self) -> &D {
        &self.database
    }

    /// Runs the pipeline once.
    ///
    /// Cancelling `cancel` stops the run at the next suspension point with an
    /// interruption error; statements already executed stay executed.
    pub async fn run(&self, cancel: &CancellationToken) -> ExecutionResult {
        let clock = Instant::now();
        let mut result = ExecutionResult::started(self.config.dry_run);

        info!(
            source = %self.config.source.database,
            target = %self.config.target.database,
            dry_run = self.config.dry_run,
            "Starting schema synchronization"
        );

        self.report(SyncPhase::Connecting);
        let outcome = match self.connect(&self.config.source, Role::Source, cancel).await {
            Ok(source) => {
                let outcome = match self.connect(&self.config.target, Role::Target, cancel).await {
                    Ok(target) => {
                        let outcome = self.synchronize(&source, &target, cancel, &mut result).await;
                        self.close(&target, Role::Target).await;
                        outcome
                    }
                    Err(err) => Err(err),
                };
                self.close(&source, Role::Source).await;
                outcome
            }
            Err(err) => Err(err),
        };

        self.report(SyncPhase::Done);
        let result = result.finish(outcome, clock);
        match &result.error {
            None => info!(
                executed = result.executed_statements.len(),
                duration = ?result.duration,
                "Synchronization finished"
            ),
            Some(err) => error!(
                kind = %err.kind(),
                executed = result.executed_statements.len(),
                error = %err,
                "Synchronization failed"
            ),
        }
        result
    }

    async fn synchronize(
        &self,
        source: &D::Connection,
        target: &D::Connection,
        cancel: &CancellationToken,
        result: &mut ExecutionResult,
    ) -> Result<()> {
        let retry = &self.config.retry;

        self.report(SyncPhase::Extracting);
        let source_db = self.config.source.database.as_str();
        let desired = retry
            .run("extract source schema", cancel, || {
                self.extractor.extract_role_schema(source, Role::Source, source_db)
            })
            .await?;
        let target_db = self.config.target.database.as_str();
        let current = retry
            .run("extract target schema", cancel, || {
                self.extractor.extract_role_schema(target, Role::Target, target_db)
            })
            .await?;
        debug!(
            source_tables = desired.tables.len(),
            target_tables = current.tables.len(),
            "Schemas extracted"
        );

        self.report(SyncPhase::Comparing);
        let diff = compare_schemas(&desired, &current)?;
        if diff.is_empty() {
            info!("Schemas are already synchronized");
            result.diff = Some(diff);
            return Ok(());
        }

        self.report(SyncPhase::Planning);
        let planned = self.planner.plan(&diff);
        result.diff = Some(diff);
        let plan = planned?;
        result.warnings = plan.warnings().to_vec();
        for warning in plan.warnings() {
            warn!(warning = %warning, "Plan warning");
        }

        self.report(SyncPhase::Validating);
        let validated = self.planner.validate(&plan);
        let plan = result.plan.insert(plan);
        validated?;

        let summary = plan.summary();
        info!(
            statements = summary.total_statements,
            destructive = summary.destructive_statements,
            "Migration plan ready"
        );

        if self.config.dry_run {
            info!("Dry run, no statements executed");
            return Ok(());
        }

        let total = plan.len();
        for (i, statement) in plan.statements().iter().enumerate() {
            let index = i + 1;
            self.report(SyncPhase::Executing { index, total });
            debug!(index, sql = %statement.sql, "Executing statement");

            let batch = [statement.sql.clone()];
            retry
                .run(&format!("execute statement {index}"), cancel, || {
                    self.database.execute_sql(target, &batch)
                })
                .await
                .map_err(|err| {
                    err.with_context("statement_index", index)
                        .with_context("sql", &statement.sql)
                })?;

            result.executed_statements.push(statement.clone());
        }

        Ok(())
    }

    async fn connect(
        &self,
        config: &DatabaseConfig,
        role: Role,
        cancel: &CancellationToken,
    ) -> Result<D::Connection> {
        info!(role = %role, database = %config.database, "Connecting");
        let retry = &self.config.retry;

        let connection = retry
            .run(&format!("connect to {role}"), cancel, || {
                self.database.connect(config)
            })
            .await
            .map_err(|err| err.with_context("role", role))?;

        if let Err(err) = retry
            .run(&format!("check {role} connection"), cancel, || {
                self.database.test_connection(&connection)
            })
            .await
        {
            self.close(&connection, role).await;
            return Err(err.with_context("role", role));
        }
        Ok(connection)
    }

    async fn close(&self, connection: &D::Connection, role: Role) {
        match self.database.close(connection).await {
            Ok(()) => debug!(role = %role, "Connection closed"),
            Err(err) => warn!(role = %role, error = %err, "Failed to close connection"),
        }
    }

    fn report(&self, phase: SyncPhase) {
        if let Some(reporter) = &self.reporter {
            reporter.report(phase);
        }
    }
}
