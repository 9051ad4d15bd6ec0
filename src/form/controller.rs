use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::model::{FieldKey, FieldType, FieldValue, FormModel, ValueSnapshot};
use super::registry::FieldRegistry;
use super::transform::{TransformError, ensure_fits, read_value, write_value};
use super::validation::{ErrorMap, RulePolicy, ValidationError, Validators, validate_form};
use super::watch::{WatchOptions, watch_value};
use crate::element::{ChangeOrigin, ElementRef};
use crate::reactive::{ReadSignal, Signal, Subscription};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("invalid submit state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    #[error("form submit is already in progress")]
    AlreadySubmitting,
    #[error("field `{0}` is missing from the snapshot")]
    MissingField(FieldKey),
    #[error("submit handler failed: {0}")]
    SubmitHandler(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SubmitHandler =
    Arc<dyn Fn(ValueSnapshot) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

pub struct FormOptions<E> {
    pub validators: Validators<E>,
    pub rule_policy: RulePolicy,
    on_submit: Option<SubmitHandler>,
}

impl<E> Default for FormOptions<E> {
    fn default() -> Self {
        Self {
            validators: Validators::default(),
            rule_policy: RulePolicy::default(),
            on_submit: None,
        }
    }
}

impl<E> FormOptions<E>
where
    E: ValidationError,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validators(mut self, validators: Validators<E>) -> Self {
        self.validators = validators;
        self
    }

    pub fn rule_policy(mut self, policy: RulePolicy) -> Self {
        self.rule_policy = policy;
        self
    }

    /// Sets the handler invoked with the full snapshot once validation passes.
    pub fn on_submit<F, Fut, Er>(mut self, handler: F) -> Self
    where
        F: Fn(ValueSnapshot) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Er>> + Send + 'static,
        Er: Into<BoxError> + 'static,
    {
        let boxed: SubmitHandler = Arc::new(move |values: ValueSnapshot| {
            handler(values)
                .map(|result| result.map_err(Into::<BoxError>::into))
                .boxed()
        });
        self.on_submit = Some(boxed);
        self
    }
}

struct FormState {
    submit_state: SubmitState,
    submit_count: u32,
}

/// Handle returned by [`FormController::register`].
pub struct FieldBinding {
    pub name: FieldKey,
    binder: ElementBinder,
}

impl FieldBinding {
    pub fn bind(&self, element: ElementRef) -> FormResult<()> {
        self.binder.bind(element)
    }

    pub fn binder(&self) -> ElementBinder {
        self.binder.clone()
    }
}

/// Records the element the UI layer mounted for one field.
#[derive(Clone)]
pub struct ElementBinder {
    key: FieldKey,
    registry: Arc<RwLock<FieldRegistry>>,
}

impl ElementBinder {
    pub fn key(&self) -> FieldKey {
        self.key
    }

    pub fn bind(&self, element: ElementRef) -> FormResult<()> {
        let replaced =
            write_lock(&self.registry, "binding element")?.insert(self.key, &element);
        debug!(field = %self.key, kind = %element.kind(), replaced, "element bound");
        Ok(())
    }
}

#[derive(Clone)]
pub struct FormController<E>
where
    E: ValidationError,
{
    registry: Arc<RwLock<FieldRegistry>>,
    validators: Arc<Validators<E>>,
    rule_policy: RulePolicy,
    on_submit: Option<SubmitHandler>,
    errors: Signal<ErrorMap<E>>,
    loading: Signal<bool>,
    state: Arc<RwLock<FormState>>,
}

pub fn create_form<E>(options: FormOptions<E>) -> FormController<E>
where
    E: ValidationError,
{
    FormController::new(options)
}

impl<E> FormController<E>
where
    E: ValidationError,
{
    pub fn new(options: FormOptions<E>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(FieldRegistry::default())),
            validators: Arc::new(options.validators),
            rule_policy: options.rule_policy,
            on_submit: options.on_submit,
            errors: Signal::new(ErrorMap::new()),
            loading: Signal::new(false),
            state: Arc::new(RwLock::new(FormState {
                submit_state: SubmitState::Idle,
                submit_count: 0,
            })),
        }
    }

    pub fn register(&self, key: impl Into<FieldKey>) -> FieldBinding {
        let key = key.into();
        FieldBinding {
            name: key,
            binder: ElementBinder {
                key,
                registry: self.registry.clone(),
            },
        }
    }

    pub fn registered_keys(&self) -> FormResult<Vec<FieldKey>> {
        Ok(read_lock(&self.registry, "listing registered fields")?
            .keys()
            .collect())
    }

    pub fn get_value(&self, key: impl Into<FieldKey>) -> FormResult<FieldValue> {
        let element = self.resolve(key.into())?;
        Ok(read_value(element.as_ref())?)
    }

    pub fn get_value_as<T: FieldType>(&self, key: impl Into<FieldKey>) -> FormResult<T> {
        let key = key.into();
        let value = self.get_value(key)?;
        T::from_field_value(value).ok_or_else(|| {
            TransformError::TypeMismatch {
                key,
                expected: T::EXPECTED,
            }
            .into()
        })
    }

    /// Writes `value` into the bound element and notifies watchers with
    /// [`ChangeOrigin::Manual`].
    pub fn set_value(
        &self,
        key: impl Into<FieldKey>,
        value: impl Into<FieldValue>,
    ) -> FormResult<()> {
        let element = self.resolve(key.into())?;
        write_value(element.as_ref(), value.into(), ChangeOrigin::Manual)?;
        Ok(())
    }

    pub fn set_value_as<T: FieldType>(&self, key: impl Into<FieldKey>, value: T) -> FormResult<()> {
        self.set_value(key, value.into_field_value())
    }

    pub fn watch<F>(
        &self,
        key: impl Into<FieldKey>,
        on_change: F,
        options: WatchOptions,
    ) -> FormResult<Subscription>
    where
        F: Fn(FieldValue) + Send + Sync + 'static,
    {
        let element = self.resolve(key.into())?;
        Ok(watch_value(&element, on_change, options)?)
    }

    /// Reads every registered field. Fields whose element is gone or unmounted
    /// are left out of the snapshot.
    pub fn get_all_values(&self) -> FormResult<ValueSnapshot> {
        let entries = read_lock(&self.registry, "snapshotting field values")?.entries();
        let mut snapshot = ValueSnapshot::new();
        for (key, weak) in entries {
            let read = weak
                .upgrade()
                .ok_or(TransformError::Detached)
                .and_then(|element| read_value(element.as_ref()));
            match read {
                Ok(value) => {
                    snapshot.insert(key, value);
                }
                Err(error) => debug!(field = %key, %error, "field left out of snapshot"),
            }
        }
        Ok(snapshot)
    }

    /// Like [`Self::get_all_values`] but fails on the first unreadable field.
    pub fn try_get_all_values(&self) -> FormResult<ValueSnapshot> {
        let keys = self.registered_keys()?;
        let mut snapshot = ValueSnapshot::new();
        for key in keys {
            snapshot.insert(key, self.get_value(key)?);
        }
        Ok(snapshot)
    }

    pub fn get_model<T: FormModel>(&self) -> FormResult<T> {
        T::from_snapshot(&self.get_all_values()?)
    }

    /// Writes every field of `model`. All elements are resolved and checked
    /// against their values first, so a failing field leaves every element
    /// untouched.
    pub fn set_model<T: FormModel>(&self, model: T) -> FormResult<()> {
        let snapshot = model.into_snapshot();
        let mut writes = Vec::with_capacity(snapshot.len());
        for (key, value) in snapshot {
            let element = self.resolve(key)?;
            ensure_fits(element.kind(), &value)?;
            writes.push((element, value));
        }
        for (element, value) in writes {
            write_value(element.as_ref(), value, ChangeOrigin::Manual)?;
        }
        Ok(())
    }

    /// Validates the current values and publishes the error map.
    pub fn validate(&self) -> FormResult<bool> {
        let values = self.get_all_values()?;
        Ok(validate_form(
            &values,
            &self.validators,
            self.rule_policy,
            &self.errors,
        ))
    }

    pub fn clear_errors(&self) {
        self.errors.set(ErrorMap::new());
    }

    pub fn errors(&self) -> ReadSignal<ErrorMap<E>> {
        self.errors.read_only()
    }

    pub fn field_error(&self, key: impl Into<FieldKey>) -> Option<String> {
        let key = key.into();
        self.errors.with(|errors| {
            errors
                .get(&key)
                .and_then(|failures| failures.first())
                .map(ValidationError::message)
        })
    }

    pub fn loading(&self) -> ReadSignal<bool> {
        self.loading.read_only()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state)
    }

    pub fn submit_count(&self) -> FormResult<u32> {
        Ok(read_lock(&self.state, "reading submit count")?.submit_count)
    }

    /// Snapshots, validates and, when valid, awaits the submit handler.
    ///
    /// The loading flag is true only while the handler runs and is reset on
    /// every exit path, including handler errors and the returned future
    /// being dropped. A submit started while another is in flight fails with
    /// [`FormError::AlreadySubmitting`].
    pub async fn submit(&self) -> FormResult<()> {
        let mut flight = self.begin_submit()?;

        let values = self.get_all_values()?;
        let is_valid = validate_form(&values, &self.validators, self.rule_policy, &self.errors);
        if !is_valid {
            debug!("submit stopped by validation");
            return Ok(());
        }
        let Some(handler) = self.on_submit.clone() else {
            debug!("form is valid but no submit handler is configured");
            return Ok(());
        };

        flight.enter_handler()?;
        let result = handler(values).await;
        drop(flight);

        result.map_err(|error| {
            warn!(%error, "submit handler failed");
            FormError::SubmitHandler(Arc::from(error))
        })
    }

    fn begin_submit(&self) -> FormResult<SubmitFlight> {
        let mut state = write_lock(&self.state, "preparing submit")?;
        if state.submit_state != SubmitState::Idle {
            return Err(FormError::AlreadySubmitting);
        }
        transition_submit_state(&mut state, SubmitState::Validating)?;
        state.submit_count = state.submit_count.saturating_add(1);
        debug!(submit_count = state.submit_count, "submit started");
        Ok(SubmitFlight {
            state: self.state.clone(),
            loading: self.loading.clone(),
            holds_loading: false,
        })
    }

    fn resolve(&self, key: FieldKey) -> FormResult<ElementRef> {
        Ok(read_lock(&self.registry, "resolving field element")?.resolve(key)?)
    }
}

/// Scoped ownership of one submit run. Dropping it returns the form to
/// `Idle` and releases the loading flag.
struct SubmitFlight {
    state: Arc<RwLock<FormState>>,
    loading: Signal<bool>,
    holds_loading: bool,
}

impl SubmitFlight {
    fn enter_handler(&mut self) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "moving submit state to submitting")?;
            transition_submit_state(&mut state, SubmitState::Submitting)?;
        }
        self.holds_loading = true;
        self.loading.set(true);
        Ok(())
    }
}

impl Drop for SubmitFlight {
    fn drop(&mut self) {
        {
            let mut state = match self.state.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.submit_state = SubmitState::Idle;
        }
        if self.holds_loading {
            self.loading.set(false);
        }
        debug!("submit settled");
    }
}

fn transition_submit_state(state: &mut FormState, next: SubmitState) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
