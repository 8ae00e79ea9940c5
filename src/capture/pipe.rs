//! Child process output readers.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Pipe reader whose bytes survive the task being aborted.
pub(crate) struct PipeDrain {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl PipeDrain {
    fn text(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

pub(crate) fn drain<R>(mut pipe: R) -> PipeDrain
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let sink = buf.clone();
    let task = tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => match sink.lock() {
                    Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                    Err(_) => break,
                },
                Err(e) => {
                    debug!("Pipe read error: {}", e);
                    break;
                }
            }
        }
    });
    PipeDrain { buf, task }
}

/// Waits for both pipes to close, together, for at most `budget`.
/// Whatever was read before the budget ran out is kept.
pub(crate) async fn collect(
    mut stdout: Option<PipeDrain>,
    mut stderr: Option<PipeDrain>,
    budget: Duration,
) -> (String, String) {
    let closed = async {
        let out = async {
            if let Some(drain) = stdout.as_mut() {
                if let Err(e) = (&mut drain.task).await {
                    debug!("stdout drain task failed: {}", e);
                }
            }
        };
        let err = async {
            if let Some(drain) = stderr.as_mut() {
                if let Err(e) = (&mut drain.task).await {
                    debug!("stderr drain task failed: {}", e);
                }
            }
        };
        tokio::join!(out, err);
    };

    if timeout(budget, closed).await.is_err() {
        warn!(
            "Output still open after {}ms, keeping what was read",
            budget.as_millis()
        );
        for drain in stdout.iter().chain(stderr.iter()) {
            drain.task.abort();
        }
    }

    let text = |drain: &Option<PipeDrain>| drain.as_ref().map(PipeDrain::text).unwrap_or_default();
    (text(&stdout), text(&stderr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_collect_reads_closed_pipes() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let stderr = drain(reader);
        writer.write_all(b"device busy\n").await.unwrap();
        drop(writer);

        let (out, err) = collect(None, Some(stderr), Duration::from_secs(1)).await;
        assert_eq!(out, "");
        assert_eq!(err, "device busy\n");
    }

    #[tokio::test]
    async fn test_open_pipes_share_one_budget_and_keep_partial_output() {
        let (mut out_writer, out_reader) = tokio::io::duplex(64);
        let (mut err_writer, err_reader) = tokio::io::duplex(64);
        let stdout = drain(out_reader);
        let stderr = drain(err_reader);
        out_writer.write_all(b"size=8kB").await.unwrap();
        err_writer.write_all(b"still open").await.unwrap();

        let budget = Duration::from_millis(300);
        let started = std::time::Instant::now();
        let (out, err) = collect(Some(stdout), Some(stderr), budget).await;
        let took = started.elapsed();

        assert!(took >= budget, "took {took:?}");
        assert!(took < budget * 2, "took {took:?}");
        assert_eq!(out, "size=8kB");
        assert_eq!(err, "still open");
        drop((out_writer, err_writer));
    }
}
