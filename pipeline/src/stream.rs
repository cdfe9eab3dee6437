use repurpose_core::progress::{Cancelled, ProgressEvent, ProgressSink};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Render one event as a server-sent-events frame: `data: <json>\n\n`.
pub fn frame_event(event: &ProgressEvent) -> Result<String, serde_json::Error> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}

/// Sink side of a [`ProgressStream`]. Fails once the stream is gone.
pub(crate) struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) -> Result<(), Cancelled> {
        self.tx.send(event).map_err(|_| Cancelled)
    }
}

/// Ordered progress events of one spawned analysis. Yields at most one
/// terminal event. Dropping the stream aborts the analysis.
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
    task: JoinHandle<()>,
    finished: bool,
}

impl ProgressStream {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<ProgressEvent>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task,
            finished: false,
        }
    }

    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        match self.rx.recv().await {
            Some(event) => {
                if event.stage.is_terminal() {
                    self.finished = true;
                    self.rx.close();
                }
                Some(event)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    /// Drain the stream to its end.
    pub async fn collect(mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }

    /// Next event rendered as a frame.
    pub async fn next_frame(&mut self) -> Option<Result<String, serde_json::Error>> {
        let event = self.next().await?;
        Some(frame_event(&event))
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
