use calmform::form::{FieldValue, FormModel, ValueSnapshot};

#[derive(Clone, Debug, PartialEq, calmform::form::FormModel)]
struct DemoForm {
    email: String,
    subscribed: bool,
}

fn main() {
    let fields = DemoForm::fields();
    assert_eq!(fields.email().as_str(), "email");
    assert_eq!(DemoForm::field_keys(), &[fields.email(), fields.subscribed()]);

    let snapshot = ValueSnapshot::new()
        .with(fields.email(), "a@calm.ui")
        .with(fields.subscribed(), FieldValue::Bool(true));
    let model = DemoForm::from_snapshot(&snapshot).expect("snapshot decodes");
    assert_eq!(model.email, "a@calm.ui");
    assert!(model.subscribed);
    assert_eq!(model.into_snapshot(), snapshot);
}
