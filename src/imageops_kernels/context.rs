//! Execution contexts and ordered streams.
//!
//! An [`ExecutionContext`] owns the data-parallel worker pool. Kernels are not
//! run on the calling thread: they are enqueued on a [`Stream`], an ordered
//! command queue drained by its own sequencer thread, which hands each kernel
//! to the pool in submission order. Enqueueing returns immediately.
//!
//! Streams live inside a [`std::thread::scope`], and every view enqueued on
//! a stream borrows its buffer for that scope. All enqueued work has finished
//! when the scope returns, so a destination can only be inspected afterwards.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{KernelError, Result};

/// Configuration of an [`ExecutionContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Worker threads in the pool, `None` for the rayon default
    pub num_threads: Option<usize>,
    /// Name prefix for pool workers and stream sequencers
    pub thread_name: String,
    /// Partial accumulators used by two-phase reductions
    pub partial_groups: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: String::from("imageops-kernels"),
            partial_groups: 256,
        }
    }
}

impl ContextConfig {
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    #[must_use]
    pub fn with_partial_groups(mut self, partial_groups: usize) -> Self {
        self.partial_groups = partial_groups;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(KernelError::InvalidConfig(
                "num_threads must be non-zero".to_string(),
            ));
        }
        if self.partial_groups == 0 {
            return Err(KernelError::InvalidConfig(
                "partial_groups must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Owner of the worker pool that kernels execute on.
pub struct ExecutionContext {
    pool: Arc<ThreadPool>,
    config: ContextConfig,
    next_stream: AtomicUsize,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("num_threads", &self.pool.current_num_threads())
            .field("config", &self.config)
            .finish()
    }
}

impl ExecutionContext {
    /// Creates a context with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ContextConfig::default())
    }

    /// Creates a context from `config`.
    ///
    /// # Errors
    ///
    /// * `InvalidConfig` - zero threads or zero partial groups
    /// * `ContextCreation` - the pool could not be spawned
    pub fn with_config(config: ContextConfig) -> Result<Self> {
        config.validate()?;

        let prefix = config.thread_name.clone();
        let mut builder =
            ThreadPoolBuilder::new().thread_name(move |index| format!("{prefix}-worker-{index}"));
        if let Some(num_threads) = config.num_threads {
            builder = builder.num_threads(num_threads);
        }
        let pool = builder
            .build()
            .map_err(|err| KernelError::ContextCreation(err.to_string()))?;

        tracing::debug!(
            num_threads = pool.current_num_threads(),
            partial_groups = config.partial_groups,
            "created execution context"
        );

        Ok(Self {
            pool: Arc::new(pool),
            config,
            next_stream: AtomicUsize::new(0),
        })
    }

    /// Process-wide context with the default configuration, built on first use.
    pub fn global() -> Result<&'static Self> {
        static GLOBAL: OnceLock<Result<ExecutionContext>> = OnceLock::new();
        GLOBAL.get_or_init(Self::new).as_ref().map_err(Clone::clone)
    }

    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Opens a stream inside a caller-managed thread scope.
    ///
    /// Several streams opened on the same scope run concurrently with no
    /// ordering between them.
    ///
    /// ```no_run
    /// use imageops_kernels::ExecutionContext;
    ///
    /// # fn example() -> imageops_kernels::Result<()> {
    /// let context = ExecutionContext::new()?;
    /// std::thread::scope(|scope| -> imageops_kernels::Result<()> {
    ///     let first = context.stream(scope)?;
    ///     let second = context.stream(scope)?;
    ///     // enqueue independent work on each ...
    ///     first.synchronize()?;
    ///     second.synchronize()
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn stream<'scope, 'env>(
        &self,
        scope: &'scope thread::Scope<'scope, 'env>,
    ) -> Result<Stream<'scope, 'env>> {
        let id = self.next_stream.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel::<Command<'scope>>();
        let pool = Arc::clone(&self.pool);

        thread::Builder::new()
            .name(format!("{}-stream-{id}", self.config.thread_name))
            .spawn_scoped(scope, move || drain(&pool, id, receiver))
            .map_err(|err| KernelError::ContextCreation(err.to_string()))?;

        tracing::debug!(stream = id, "opened stream");

        Ok(Stream {
            id,
            sender,
            partial_groups: self.config.partial_groups,
            _env: PhantomData,
        })
    }

    /// Runs `f` with a fresh stream and waits for everything it enqueued.
    ///
    /// Buffers borrowed by views must outlive the call; they are free again
    /// once `scope` returns.
    ///
    /// A view borrows its buffer for the whole scope, so a kernel cannot read
    /// what an earlier kernel of the same scope writes. Run dependent work in
    /// a second `scope` after this one returns, which blocks the calling
    /// thread until the first batch is done.
    ///
    /// ```compile_fail
    /// use imageops_kernels::{box_filter, BorderType, ExecutionContext, ImageView, ImageViewMut};
    ///
    /// let context = ExecutionContext::new().unwrap();
    /// let src = vec![0u8; 16];
    /// let mut tmp = vec![0u8; 16];
    /// let mut dst = vec![0u8; 16];
    /// context
    ///     .scope(|stream| {
    ///         let a = ImageView::<u8, 1>::packed(4, 4, &src).unwrap();
    ///         let t = ImageViewMut::<u8, 1>::packed(4, 4, &mut tmp).unwrap();
    ///         box_filter(stream, a, t, 3, 3, BorderType::Default, true).unwrap();
    ///
    ///         // `tmp` stays mutably borrowed by the first launch
    ///         let t = ImageView::<u8, 1>::packed(4, 4, &tmp).unwrap();
    ///         let d = ImageViewMut::<u8, 1>::packed(4, 4, &mut dst).unwrap();
    ///         box_filter(stream, t, d, 3, 3, BorderType::Default, true).unwrap();
    ///     })
    ///     .unwrap();
    /// ```
    pub fn scope<'env, F, T>(&self, f: F) -> Result<T>
    where
        F: for<'scope> FnOnce(&Stream<'scope, 'env>) -> T,
    {
        thread::scope(|scope| {
            let stream = self.stream(scope)?;
            Ok(f(&stream))
        })
    }
}

type Job<'scope> = Box<dyn FnOnce() + Send + 'scope>;

enum Command<'scope> {
    Launch { kernel: &'static str, job: Job<'scope> },
    Fence(mpsc::SyncSender<()>),
}

fn drain(pool: &ThreadPool, stream: usize, receiver: mpsc::Receiver<Command<'_>>) {
    for command in receiver {
        match command {
            Command::Launch { kernel, job } => {
                let started = Instant::now();
                pool.install(job);
                tracing::trace!(
                    stream,
                    kernel,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "kernel finished"
                );
            }
            Command::Fence(done) => {
                // the waiter may have given up; nothing to report then
                let _ = done.send(());
            }
        }
    }
    tracing::debug!(stream, "stream drained");
}

/// Ordered command queue.
///
/// Kernels enqueued on one stream run one after another in submission
/// order; each kernel is itself spread across the worker pool.
///
/// Ordering does not make one kernel's output available as another's input
/// within the same [`ExecutionContext::scope`]: the output buffer stays
/// mutably borrowed until the scope ends. Chains of dependent kernels take
/// one scope per step.
pub struct Stream<'scope, 'env: 'scope> {
    id: usize,
    sender: mpsc::Sender<Command<'scope>>,
    partial_groups: usize,
    _env: PhantomData<&'env mut &'env ()>,
}

impl std::fmt::Debug for Stream<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream").field("id", &self.id).finish()
    }
}

impl<'scope> Stream<'scope, '_> {
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    pub(crate) const fn partial_groups(&self) -> usize {
        self.partial_groups
    }

    /// Enqueues a validated kernel body. Never blocks.
    pub(crate) fn launch<F>(&self, kernel: &'static str, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'scope,
    {
        self.sender
            .send(Command::Launch {
                kernel,
                job: Box::new(job),
            })
            .map_err(|_| KernelError::StreamTerminated)
    }

    /// Blocks until every kernel enqueued before this call has finished.
    pub fn synchronize(&self) -> Result<()> {
        let (done, wait) = mpsc::sync_channel(1);
        self.sender
            .send(Command::Fence(done))
            .map_err(|_| KernelError::StreamTerminated)?;
        wait.recv().map_err(|_| KernelError::StreamTerminated)
    }
}

/// Logs a rejected launch and passes the error through.
pub(crate) fn rejected(kernel: &'static str, err: KernelError) -> KernelError {
    tracing::warn!(kernel, error = %err, "kernel launch rejected");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn config_validation_rejects_zero_sizes() {
        assert!(matches!(
            ExecutionContext::with_config(ContextConfig::default().with_num_threads(0)),
            Err(KernelError::InvalidConfig(_))
        ));
        assert!(matches!(
            ExecutionContext::with_config(ContextConfig::default().with_partial_groups(0)),
            Err(KernelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn context_uses_requested_thread_count() {
        let context =
            ExecutionContext::with_config(ContextConfig::default().with_num_threads(3)).unwrap();
        assert_eq!(context.num_threads(), 3);
        assert_eq!(context.config().partial_groups, 256);
    }

    #[test]
    fn launches_on_one_stream_run_in_submission_order() {
        let context = ExecutionContext::new().unwrap();
        let order = Mutex::new(Vec::new());

        context
            .scope(|stream| {
                for i in 0..32 {
                    let order = &order;
                    stream
                        .launch("record", move || order.lock().unwrap().push(i))
                        .unwrap();
                }
                stream.synchronize().unwrap();
                assert_eq!(order.lock().unwrap().len(), 32);
            })
            .unwrap();

        assert_eq!(order.into_inner().unwrap(), (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn scope_waits_for_outstanding_work() {
        let context = ExecutionContext::new().unwrap();
        let mut value = 0u32;

        context
            .scope(|stream| {
                let value = &mut value;
                stream
                    .launch("write", move || {
                        thread::sleep(std::time::Duration::from_millis(20));
                        *value = 7;
                    })
                    .unwrap();
            })
            .unwrap();

        assert_eq!(value, 7);
    }

    #[test]
    fn streams_get_distinct_ids() {
        let context = ExecutionContext::new().unwrap();
        thread::scope(|scope| {
            let a = context.stream(scope).unwrap();
            let b = context.stream(scope).unwrap();
            assert_ne!(a.id(), b.id());
            a.synchronize().unwrap();
            b.synchronize().unwrap();
        });
    }

    #[test]
    fn global_context_is_shared() {
        let a = ExecutionContext::global().unwrap();
        let b = ExecutionContext::global().unwrap();
        assert!(std::ptr::eq(a, b));
    }
}
