pub use crate::element::{
    ChangeEvent, ChangeOrigin, ElementKind, ElementRef, FormElement, InputElement, NativeState,
};
pub use crate::form::{
    FieldKey, FieldType, FieldValue, FormController, FormError, FormModel, FormOptions,
    FormResult, RulePolicy, ValidationError, Validators, ValueSnapshot, WatchOptions,
    create_form,
};
pub use crate::reactive::{ReadSignal, Subscription, WatchScope};
