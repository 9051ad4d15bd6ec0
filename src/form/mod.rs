mod controller;
mod model;
mod registry;
mod transform;
mod validation;
mod watch;


pub use calmform_derive::FormModel;
pub use controller::{
    BoxError, ElementBinder, FieldBinding, FormController, FormError, FormOptions, FormResult,
    SubmitState, create_form,
};
pub use model::{FieldKey, FieldType, FieldValue, FormModel, ValueSnapshot};
pub use transform::{TransformError, read_value, write_value};
pub use validation::{ErrorMap, RulePolicy, ValidationError, Validators, validate_form};
pub use watch::{WatchOptions, watch_value};
