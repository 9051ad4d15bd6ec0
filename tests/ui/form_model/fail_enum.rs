use calmform::form::FormModel;

#[allow(dead_code)]
#[derive(FormModel)]
enum DemoForm {
    Email(String),
}

fn main() {}
