use std::sync::Arc;

use tracing::warn;

use super::model::FieldValue;
use super::transform::{TransformError, read_value};
use crate::element::{ChangeEvent, ChangeOrigin, ElementRef};
use crate::reactive::Subscription;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WatchOptions {
    /// Deliver the current value once, synchronously, before returning.
    pub call_immediately: bool,
    /// Ignore notifications caused by `set_value`.
    pub skip_manual: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            call_immediately: true,
            skip_manual: false,
        }
    }
}

impl WatchOptions {
    pub fn deferred() -> Self {
        Self {
            call_immediately: false,
            ..Self::default()
        }
    }
}

/// Subscribes `on_change` to the element's change notifications.
///
/// Each notification re-reads the element, so callbacks always see the
/// transformed value rather than the raw native state. The listener is removed
/// when the returned subscription is dropped.
pub fn watch_value<F>(
    element: &ElementRef,
    on_change: F,
    options: WatchOptions,
) -> Result<Subscription, TransformError>
where
    F: Fn(FieldValue) + Send + Sync + 'static,
{
    let initial = read_value(element.as_ref())?;
    let on_change = Arc::new(on_change);
    if options.call_immediately {
        on_change(initial);
    }

    let weak = Arc::downgrade(element);
    let listener = {
        let weak = weak.clone();
        let on_change = on_change.clone();
        move |event: ChangeEvent| {
            if options.skip_manual && event.origin == ChangeOrigin::Manual {
                return;
            }
            let Some(element) = weak.upgrade() else {
                return;
            };
            match read_value(element.as_ref()) {
                Ok(value) => on_change(value),
                Err(error) => warn!(%error, "skipping watcher notification"),
            }
        }
    };
    let id = element.add_listener(Arc::new(listener));

    Ok(Subscription::new(move || {
        if let Some(element) = weak.upgrade() {
            element.remove_listener(id);
        }
    }))
}
