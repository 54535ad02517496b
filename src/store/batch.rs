use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T> {
    pub summary: T,
    pub committed: bool,
}

/// Runs `job` inside one transaction. Writes issued by the job are visible to its
/// own later reads. With `simulate` the transaction is rolled back explicitly once
/// the job finishes, so nothing from the run persists; otherwise it commits.
/// A job error drops the transaction, which rolls it back, and is returned as-is.
pub fn run_in_transaction<T, F>(
    connection: &mut Connection,
    simulate: bool,
    job: F,
) -> Result<BatchOutcome<T>>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let tx = connection
        .transaction()
        .context("failed to begin batch transaction")?;

    let summary = job(&tx)?;

    if simulate {
        tx.rollback()
            .context("failed to roll back preview transaction")?;
        info!("preview run complete; transaction rolled back");
        return Ok(BatchOutcome {
            summary,
            committed: false,
        });
    }

    tx.commit().context("failed to commit batch transaction")?;
    info!("batch transaction committed");
    Ok(BatchOutcome {
        summary,
        committed: true,
    })
}
