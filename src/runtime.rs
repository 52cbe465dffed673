//! Generic component runtime, shared scaffolding for long-running units.
//!
//! A [`Component`] is any independently-runnable unit of the service: the
//! HTTP listener, the background sync ticker. Components are constructed
//! with their shared state already captured inside them, then handed to
//! [`spawn_components`], which runs each one as its own Tokio task.
//!
//! Any component error cancels the shared [`CancellationToken`] so sibling
//! components shut down cleanly; the first error is reported to the caller
//! through [`SubsystemHandle::join`].

use std::future::Future;
use std::pin::Pin;

use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::AppError;

// ── Component ─────────────────────────────────────────────────────────────────

/// A boxed, owned future returned by [`Component::run`].
pub type ComponentFuture =
    Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A self-contained, concurrently-runnable unit of the service.
///
/// [`Component::run`] is called once by [`spawn_components`] and should run
/// until `shutdown` is cancelled or the component's own work is done.
pub trait Component: Send + 'static {
    /// Stable identifier used in log messages.
    fn id(&self) -> &str;

    /// Consume the component and return its async run-loop as a boxed
    /// future. Capture the `CancellationToken` inside it to respect
    /// cooperative shutdown.
    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture;
}

// ── SubsystemHandle ───────────────────────────────────────────────────────────

/// An opaque handle to the running component set, returned by
/// [`spawn_components`]. Await [`SubsystemHandle::join`] to block until all
/// components have exited.
pub struct SubsystemHandle {
    inner: JoinHandle<Result<(), AppError>>,
}

impl SubsystemHandle {
    /// Await all components and return the first error, if any.
    pub async fn join(self) -> Result<(), AppError> {
        match self.inner.await {
            Ok(r) => r,
            Err(e) => Err(AppError::Service(format!("component task panicked: {e}"))),
        }
    }
}

// ── spawn_components ──────────────────────────────────────────────────────────

/// Spawn each [`Component`] as an independent Tokio task.
///
/// Behaviour on error:
/// - If any component returns `Err`, `shutdown` is cancelled so all siblings
///   receive the cancellation signal and stop cooperatively.
/// - The manager task then drains the remaining components and returns the
///   first error encountered.
pub fn spawn_components(
    components: Vec<Box<dyn Component>>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let handle = tokio::spawn(async move {
        let mut set: JoinSet<Result<(), AppError>> = JoinSet::new();

        for component in components {
            let id = component.id().to_string();
            let shutdown = shutdown.clone();
            debug!(component = %id, "spawning component");
            set.spawn(component.run(shutdown));
        }

        let mut first_err: Option<AppError> = None;

        while let Some(res) = set.join_next().await {
            match res {
                // Component panicked.
                Err(e) => {
                    error!("component panicked: {e}");
                    shutdown.cancel();
                    first_err
                        .get_or_insert_with(|| AppError::Service(format!("component panicked: {e}")));
                }
                // Component returned an error.
                Ok(Err(e)) => {
                    error!("component failed: {e}");
                    shutdown.cancel();
                    first_err.get_or_insert(e);
                }
                Ok(Ok(())) => {}
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    });

    SubsystemHandle { inner: handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quick {
        id: String,
        fail: bool,
    }

    impl Component for Quick {
        fn id(&self) -> &str {
            &self.id
        }

        fn run(self: Box<Self>, _shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                if self.fail {
                    Err(AppError::Service(format!("{} exploded", self.id)))
                } else {
                    Ok(())
                }
            })
        }
    }

    struct WaitsForShutdown;

    impl Component for WaitsForShutdown {
        fn id(&self) -> &str {
            "waiter"
        }

        fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
            Box::pin(async move {
                shutdown.cancelled().await;
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn all_ok_joins_clean() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(
            vec![
                Box::new(Quick { id: "a".into(), fail: false }),
                Box::new(Quick { id: "b".into(), fail: false }),
            ],
            shutdown,
        );
        assert!(handle.join().await.is_ok());
    }

    #[tokio::test]
    async fn failure_cancels_siblings_and_surfaces() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(
            vec![
                Box::new(WaitsForShutdown),
                Box::new(Quick { id: "boom".into(), fail: true }),
            ],
            shutdown.clone(),
        );
        let err = handle.join().await.unwrap_err();
        assert!(err.to_string().contains("boom exploded"));
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn external_cancel_stops_waiters() {
        let shutdown = CancellationToken::new();
        let handle = spawn_components(vec![Box::new(WaitsForShutdown)], shutdown.clone());
        shutdown.cancel();
        assert!(handle.join().await.is_ok());
    }
}
