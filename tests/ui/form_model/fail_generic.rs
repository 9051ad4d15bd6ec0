use calmform::form::FormModel;

#[allow(dead_code)]
#[derive(FormModel)]
struct DemoForm<T> {
    value: T,
}

fn main() {}
