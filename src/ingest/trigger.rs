use std::time::Duration;
use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};

use crate::ingest::{IngestError, IngestOutcome, Ingestor};

/// Starts ingest runs in the background.
pub struct IngestTrigger;

impl IngestTrigger {
    /// Spawn one run that stops starting new sources once `budget` has elapsed.
    pub fn spawn(ingestor: Ingestor, budget: Duration) -> IngestHandle {
        let token = CancellationToken::new();
        let deadline = Instant::now() + budget;
        let run_token = token.clone();

        info!("Triggering ingest run with a budget of {:?}", budget);
        let task = tokio::spawn(
            async move { ingestor.ingest_all_with_cancel(deadline, run_token).await }
                .instrument(info_span!("ingest_run")),
        );

        IngestHandle { token, task }
    }
}

/// Handle to a spawned run. Dropping it leaves the run going.
pub struct IngestHandle {
    token: CancellationToken,
    task: JoinHandle<Result<IngestOutcome, IngestError>>,
}

impl IngestHandle {
    /// Stop starting new sources. Sources already running finish normally.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<IngestOutcome, IngestError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(IngestError::Aborted(e.to_string())),
        }
    }
}
