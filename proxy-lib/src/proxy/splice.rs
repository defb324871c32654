use std::sync::Arc;

use tokio::io::{split, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Semaphore;

/// Copy bytes in both directions between `client` and `upstream` until
/// either side closes or errors, then shut both halves down (spec §4.5).
///
/// Each direction runs as its own task so that whichever side finishes (or
/// fails) first can immediately shut down both streams, unblocking the other
/// direction's pending read. The controller then waits on a two-permit
/// semaphore released once per task, rather than racing on the first task to
/// finish: a single-slot notification can return before the *other*
/// direction has observed the shutdown and actually exited, closing over the
/// sockets while a copy is still in flight. Waiting for both permits makes
/// "the splice is done" mean both tasks have actually returned.
///
/// Each task only shuts down the write half it copies into, so a peer that
/// half-closes (EOF on one direction) but keeps reading on the other leaves
/// its own copy task pinned until that peer also closes. A full close on
/// first EOF would free that task sooner at the cost of truncating any
/// still-in-flight reverse-direction bytes.
pub async fn splice<C, U>(client: C, upstream: U) -> std::io::Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    U: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut client_rd, mut client_wr) = split(client);
    let (mut upstream_rd, mut upstream_wr) = split(upstream);

    let done = Arc::new(Semaphore::new(0));
    let result = Arc::new(std::sync::Mutex::new(None::<std::io::Error>));

    let done_a = Arc::clone(&done);
    let result_a = Arc::clone(&result);
    let client_to_upstream = tokio::spawn(async move {
        let outcome = tokio::io::copy(&mut client_rd, &mut upstream_wr).await;
        let _ = upstream_wr.shutdown().await;
        if let Err(e) = outcome {
            let mut slot = result_a.lock().expect("splice result mutex poisoned");
            if slot.is_none() {
                *slot = Some(e);
            }
        }
        done_a.add_permits(1);
    });

    let done_b = Arc::clone(&done);
    let result_b = Arc::clone(&result);
    let upstream_to_client = tokio::spawn(async move {
        let outcome = tokio::io::copy(&mut upstream_rd, &mut client_wr).await;
        let _ = client_wr.shutdown().await;
        if let Err(e) = outcome {
            let mut slot = result_b.lock().expect("splice result mutex poisoned");
            if slot.is_none() {
                *slot = Some(e);
            }
        }
        done_b.add_permits(1);
    });

    let _ = done.acquire_many(2).await;
    let _ = tokio::join!(client_to_upstream, upstream_to_client);

    match Arc::try_unwrap(result) {
        Ok(mutex) => match mutex.into_inner().expect("splice result mutex poisoned") {
            Some(e) => Err(e),
            None => Ok(()),
        },
        Err(_) => Ok(()),
    }
}
