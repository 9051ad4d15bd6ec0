use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::model::{FieldKey, FieldValue, ValueSnapshot};
use crate::reactive::Signal;

/// Error payload produced by a failing rule.
pub trait ValidationError: Clone + PartialEq + Send + Sync + 'static {
    fn message(&self) -> String;
}

impl ValidationError for String {
    fn message(&self) -> String {
        self.clone()
    }
}

impl ValidationError for &'static str {
    fn message(&self) -> String {
        (*self).to_string()
    }
}

/// Field key to failures. Present entries are never empty.
pub type ErrorMap<E> = BTreeMap<FieldKey, Vec<E>>;

static MISSING: FieldValue = FieldValue::Missing;

pub(super) type FieldRuleFn<E> = Arc<dyn Fn(&FieldValue) -> Result<(), E> + Send + Sync>;
pub(super) type FormRuleFn<E> = Arc<dyn Fn(&ValueSnapshot) -> Vec<(FieldKey, E)> + Send + Sync>;

/// How many failures a single field reports per validation pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RulePolicy {
    /// Stop at the first failing rule of each field.
    #[default]
    FirstFailure,
    CollectAll,
}

/// Per-field rule lists plus whole-form rules.
pub struct Validators<E> {
    fields: BTreeMap<FieldKey, Vec<FieldRuleFn<E>>>,
    form: Vec<FormRuleFn<E>>,
}

impl<E> Clone for Validators<E> {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            form: self.form.clone(),
        }
    }
}

impl<E> Default for Validators<E> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            form: Vec::new(),
        }
    }
}

impl<E> Validators<E>
where
    E: ValidationError,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule for `key`; rules run in the order they were added.
    pub fn rule(
        mut self,
        key: FieldKey,
        rule: impl Fn(&FieldValue) -> Result<(), E> + Send + Sync + 'static,
    ) -> Self {
        self.fields.entry(key).or_default().push(Arc::new(rule));
        self
    }

    /// Adds a rule that fails with `error` whenever `predicate` is false.
    pub fn check(
        self,
        key: FieldKey,
        predicate: impl Fn(&FieldValue) -> bool + Send + Sync + 'static,
        error: E,
    ) -> Self {
        self.rule(key, move |value| {
            if predicate(value) {
                Ok(())
            } else {
                Err(error.clone())
            }
        })
    }

    /// Adds a cross-field rule over the whole snapshot.
    pub fn form_rule(
        mut self,
        rule: impl Fn(&ValueSnapshot) -> Vec<(FieldKey, E)> + Send + Sync + 'static,
    ) -> Self {
        self.form.push(Arc::new(rule));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    pub fn rule_count(&self, key: FieldKey) -> usize {
        self.fields.get(&key).map_or(0, Vec::len)
    }

    /// Runs every rule against `values` without publishing anything.
    ///
    /// Fields with rules that are absent from `values` are checked against
    /// [`FieldValue::Missing`], so a required rule still fails for them.
    pub fn evaluate(&self, values: &ValueSnapshot, policy: RulePolicy) -> ErrorMap<E> {
        let mut errors = ErrorMap::<E>::new();
        for (key, rules) in &self.fields {
            let value = values.get(*key).unwrap_or_else(|| {
                debug!(field = %key, "field not in snapshot, rules see a missing value");
                &MISSING
            });
            let mut failures = Vec::new();
            for rule in rules {
                if let Err(error) = rule(value) {
                    failures.push(error);
                    if policy == RulePolicy::FirstFailure {
                        break;
                    }
                }
            }
            if !failures.is_empty() {
                errors.insert(*key, failures);
            }
        }

        for rule in &self.form {
            for (key, error) in rule(values) {
                let failures = errors.entry(key).or_default();
                if policy == RulePolicy::FirstFailure && !failures.is_empty() {
                    continue;
                }
                failures.push(error);
            }
        }
        errors
    }
}

/// Validates `values`, publishes the full error map in one update and
/// returns whether the form is valid.
pub fn validate_form<E>(
    values: &ValueSnapshot,
    validators: &Validators<E>,
    policy: RulePolicy,
    errors: &Signal<ErrorMap<E>>,
) -> bool
where
    E: ValidationError,
{
    let next = validators.evaluate(values, policy);
    let is_valid = next.is_empty();
    debug!(
        fields = values.len(),
        failing = next.len(),
        "form validation finished"
    );
    errors.set(next);
    is_valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const EMAIL: FieldKey = FieldKey::new("email");
    const PASSWORD: FieldKey = FieldKey::new("password");
    const CONFIRM: FieldKey = FieldKey::new("confirm");

    fn contains_at(value: &FieldValue) -> bool {
        value.as_text().is_some_and(|text| text.contains('@'))
    }

    fn email_rules() -> Validators<&'static str> {
        Validators::new()
            .check(EMAIL, |value| !value.is_blank(), "required")
            .check(EMAIL, contains_at, "must contain @")
            .check(
                EMAIL,
                |value| value.as_text().is_some_and(|text| text.len() > 5),
                "too short",
            )
    }

    #[test]
    fn no_rules_is_valid_and_clears_errors() {
        let errors = Signal::new(ErrorMap::from([(EMAIL, vec!["stale"])]));
        let values = ValueSnapshot::new().with(EMAIL, "anything");

        assert!(validate_form(
            &values,
            &Validators::new(),
            RulePolicy::default(),
            &errors
        ));
        assert!(errors.get().is_empty());
    }

    #[test]
    fn first_failure_wins_by_default() {
        let errors = Signal::new(ErrorMap::new());
        let values = ValueSnapshot::new().with(EMAIL, "bad");

        assert!(!validate_form(
            &values,
            &email_rules(),
            RulePolicy::FirstFailure,
            &errors
        ));
        assert_eq!(errors.get().get(&EMAIL), Some(&vec!["must contain @"]));
    }

    #[test]
    fn collect_all_records_every_failure() {
        let errors = Signal::new(ErrorMap::new());
        let values = ValueSnapshot::new().with(EMAIL, "bad");

        assert!(!validate_form(
            &values,
            &email_rules(),
            RulePolicy::CollectAll,
            &errors
        ));
        assert_eq!(
            errors.get().get(&EMAIL),
            Some(&vec!["must contain @", "too short"])
        );
    }

    #[test]
    fn passing_fields_have_no_entry() {
        let rules = email_rules().check(PASSWORD, |value| !value.is_blank(), "required");
        let values = ValueSnapshot::new()
            .with(EMAIL, "a@b.com")
            .with(PASSWORD, "");

        let map = rules.evaluate(&values, RulePolicy::FirstFailure);
        assert!(!map.contains_key(&EMAIL));
        assert_eq!(map.get(&PASSWORD), Some(&vec!["required"]));
    }

    #[test]
    fn fields_missing_from_snapshot_still_run_their_rules() {
        let values = ValueSnapshot::new();
        let map = email_rules().evaluate(&values, RulePolicy::CollectAll);
        assert_eq!(
            map.get(&EMAIL),
            Some(&vec!["required", "must contain @", "too short"])
        );

        let first = email_rules().evaluate(&values, RulePolicy::FirstFailure);
        assert_eq!(first.get(&EMAIL), Some(&vec!["required"]));
    }

    #[test]
    fn fields_without_rules_need_not_be_in_snapshot() {
        let values = ValueSnapshot::new().with(EMAIL, "ada@calm.dev");
        let map = email_rules().evaluate(&values, RulePolicy::CollectAll);
        assert!(map.is_empty());
    }

    #[test]
    fn form_rules_attach_errors_to_named_fields() {
        let rules = Validators::<String>::new().form_rule(|values| {
            let password = values.get(PASSWORD).and_then(FieldValue::as_text);
            let confirm = values.get(CONFIRM).and_then(FieldValue::as_text);
            if password == confirm {
                Vec::new()
            } else {
                vec![(CONFIRM, "passwords differ".to_string())]
            }
        });
        let values = ValueSnapshot::new()
            .with(PASSWORD, "hunter2")
            .with(CONFIRM, "hunter3");

        let map = rules.evaluate(&values, RulePolicy::FirstFailure);
        assert_eq!(map.get(&CONFIRM), Some(&vec!["passwords differ".to_string()]));
        assert!(!map.contains_key(&PASSWORD));
    }

    #[test]
    fn error_map_is_published_once_per_run() {
        let errors = Signal::new(ErrorMap::new());
        let notifications = Arc::new(Mutex::new(0_usize));
        let counter = notifications.clone();
        let _subscription = errors.subscribe(move |_| *counter.lock().expect("counter") += 1);
        let rules = email_rules().check(PASSWORD, |value| !value.is_blank(), "required");
        let values = ValueSnapshot::new()
            .with(EMAIL, "bad")
            .with(PASSWORD, "");

        validate_form(&values, &rules, RulePolicy::FirstFailure, &errors);
        assert_eq!(*notifications.lock().expect("notifications"), 1);
        assert_eq!(errors.get().len(), 2);
    }
}
