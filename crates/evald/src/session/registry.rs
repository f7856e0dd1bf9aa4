//! Lookup-or-create registry of session contexts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::evaluator::EvaluatorProvider;

use super::{Context, SESSION_TARGET, SessionError};

/// Context shared between the registry and the request currently using it.
pub type SharedContext<E> = Arc<Mutex<Context<E>>>;

/// Per-key cell that is empty until the key's evaluator has started.
type Slot<E> = Arc<Mutex<Option<SharedContext<E>>>>;

/// Process-lifetime map from session key to context.
///
/// Sessions are never evicted.
pub struct SessionRegistry<P: EvaluatorProvider> {
    provider: P,
    sessions: Mutex<HashMap<String, Slot<P::Evaluator>>>,
}

impl<P: EvaluatorProvider> SessionRegistry<P> {
    /// Creates an empty registry that builds evaluators with `provider`.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the context for `session_key`, creating it on first use.
    ///
    /// The map lock is held only to find or insert the key's slot. A new
    /// evaluator is constructed under the slot's own lock, so racing requests
    /// for one key observe exactly one context while other keys stay
    /// reachable. A context whose lock was poisoned by a panicking evaluator
    /// is replaced with a fresh one.
    pub fn lookup_or_create(
        &self,
        session_key: &str,
    ) -> Result<SharedContext<P::Evaluator>, SessionError> {
        let slot = self.slot(session_key)?;
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(context) = slot.as_ref() {
            if !context.is_poisoned() {
                return Ok(Arc::clone(context));
            }
            let discarded = context
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pending_source
                .len();
            warn!(
                target: SESSION_TARGET,
                session = session_key,
                discarded_pending_bytes = discarded,
                "replacing session after evaluator panic; bindings are lost"
            );
        }

        let evaluator = self
            .provider
            .create(session_key)
            .map_err(SessionError::EvaluatorStartup)?;
        let context = Arc::new(Mutex::new(Context::new(evaluator)));
        *slot = Some(Arc::clone(&context));
        debug!(target: SESSION_TARGET, session = session_key, "session created");
        Ok(context)
    }

    fn slot(&self, session_key: &str) -> Result<Slot<P::Evaluator>, SessionError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| SessionError::RegistryPoisoned)?;
        Ok(Arc::clone(sessions.entry(session_key.to_owned()).or_default()))
    }

    /// Runs `f` with exclusive access to the session's context.
    ///
    /// Requests for the same key are serialised here; the registry lock is
    /// released before `f` runs.
    pub fn with_context<F, R>(&self, session_key: &str, f: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut Context<P::Evaluator>) -> R,
    {
        let context = self.lookup_or_create(session_key)?;
        let mut guard = context
            .lock()
            .map_err(|_| SessionError::ContextPoisoned {
                session_key: session_key.to_owned(),
            })?;
        Ok(f(&mut guard))
    }

    /// Number of sessions whose evaluator has started.
    ///
    /// Waits for any evaluator that is still starting.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots: Vec<_> = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }

    /// Returns `true` when no session has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The provider used to build evaluators.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, mpsc};
    use std::thread;
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::evaluator::{
        CompletionInfo, Evaluator, EvaluatorStartupError, OutputSink, SnippetEvent,
    };

    #[derive(Debug)]
    struct InertEvaluator;

    impl Evaluator for InertEvaluator {
        fn classify(&mut self, _source: &str) -> CompletionInfo {
            CompletionInfo::empty()
        }

        fn execute(&mut self, _source: &str, _output: &mut OutputSink) -> Vec<SnippetEvent> {
            Vec::new()
        }
    }

    #[derive(Debug, Default)]
    struct CountingProvider {
        created: AtomicUsize,
        failing_key: Option<String>,
    }

    impl EvaluatorProvider for CountingProvider {
        type Evaluator = InertEvaluator;

        fn create(&self, session_key: &str) -> Result<InertEvaluator, EvaluatorStartupError> {
            if self.failing_key.as_deref() == Some(session_key) {
                return Err(EvaluatorStartupError::new(session_key, "refused"));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(InertEvaluator)
        }
    }

    /// Provider whose construction of the `slow` key waits to be released.
    struct GatedProvider {
        entered: Barrier,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl EvaluatorProvider for GatedProvider {
        type Evaluator = InertEvaluator;

        fn create(&self, session_key: &str) -> Result<InertEvaluator, EvaluatorStartupError> {
            if session_key == "slow" {
                self.entered.wait();
                self.release
                    .lock()
                    .expect("release lock")
                    .recv()
                    .expect("release signal");
            }
            Ok(InertEvaluator)
        }
    }

    fn panic_while_locked(context: &SharedContext<InertEvaluator>) {
        let _guard = context.lock().expect("lock context");
        panic!("evaluator blew up");
    }

    #[fixture]
    fn registry() -> SessionRegistry<CountingProvider> {
        SessionRegistry::new(CountingProvider::default())
    }

    #[rstest]
    fn same_key_returns_the_same_context(registry: SessionRegistry<CountingProvider>) {
        let first = registry.lookup_or_create("s").expect("create session");
        let second = registry.lookup_or_create("s").expect("lookup session");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.provider().created.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn distinct_keys_get_distinct_contexts(registry: SessionRegistry<CountingProvider>) {
        let named = registry.lookup_or_create("s").expect("create named session");
        let empty = registry.lookup_or_create("").expect("create empty-key session");
        assert!(!Arc::ptr_eq(&named, &empty));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn racing_requests_create_one_context() {
        let registry = Arc::new(SessionRegistry::new(CountingProvider::default()));
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.lookup_or_create("shared").expect("lookup")
                })
            })
            .collect();

        let contexts: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("join worker"))
            .collect();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.provider().created.load(Ordering::SeqCst), 1);
        assert!(contexts.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn other_keys_are_served_while_an_evaluator_starts() {
        let (release, gate) = mpsc::channel();
        let registry = Arc::new(SessionRegistry::new(GatedProvider {
            entered: Barrier::new(2),
            release: Mutex::new(gate),
        }));
        registry.lookup_or_create("fast").expect("create fast session");

        let starting = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.lookup_or_create("slow").map(drop))
        };
        registry.provider().entered.wait();

        let (done, served) = mpsc::channel();
        let other = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let existing =
                    registry.with_context("fast", |context| context.pending_source().len());
                let created = registry.lookup_or_create("new").map(drop);
                done.send((existing.is_ok(), created.is_ok()))
                    .expect("report result");
            })
        };

        let outcome = served.recv_timeout(Duration::from_secs(5));
        release.send(()).expect("release slow evaluator");
        assert_eq!(outcome, Ok((true, true)));

        other.join().expect("join other worker");
        starting
            .join()
            .expect("join starting worker")
            .expect("create slow session");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn startup_failures_are_not_cached() {
        let registry = SessionRegistry::new(CountingProvider {
            failing_key: Some("broken".to_owned()),
            ..CountingProvider::default()
        });
        let error = registry
            .lookup_or_create("broken")
            .expect_err("provider refuses this key");
        assert!(matches!(error, SessionError::EvaluatorStartup(_)));
        assert!(registry.is_empty());
    }

    #[rstest]
    fn poisoned_contexts_are_replaced(registry: SessionRegistry<CountingProvider>) {
        registry
            .with_context("s", |context| context.pending_source.push_str("{ let x = 1;"))
            .expect("buffer input");
        let original = registry.lookup_or_create("s").expect("create session");
        let poisoner = Arc::clone(&original);
        let outcome = thread::spawn(move || panic_while_locked(&poisoner)).join();
        assert!(outcome.is_err());
        assert!(original.is_poisoned());

        let replacement = registry.lookup_or_create("s").expect("replace session");
        assert!(!Arc::ptr_eq(&original, &replacement));
        let pending = replacement
            .lock()
            .expect("lock replacement")
            .pending_source()
            .to_owned();
        assert_eq!(pending, "", "buffered input is discarded with the session");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.provider().created.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    fn with_context_grants_exclusive_access(registry: SessionRegistry<CountingProvider>) {
        registry
            .with_context("s", |context| context.pending_source.push_str("{"))
            .expect("first access");
        let pending = registry
            .with_context("s", |context| context.pending_source().to_owned())
            .expect("second access");
        assert_eq!(pending, "{");
    }
}
