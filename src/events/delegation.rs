//! Event delegation between targets
//!
//! A delegation listens on one target and re-fires every matching event on
//! another, possibly under a different type. The re-fired event is derived
//! with [`Event::derive`], so [`DeriveOptions`] decide whether data is copied
//! and whether cancelling the re-fired event also cancels the source event.

use log::warn;

use super::error::EventError;
use super::event::{DeriveOptions, Event, WILDCARD};
use super::queue::Handler;
use super::target::Observable;

/// Re-fire `event_type` from `from` on `to` under the same type
pub fn delegate_same_type(
    from: &dyn Observable,
    to: &dyn Observable,
    event_type: &str,
    options: DeriveOptions,
) -> Result<Handler, EventError> {
    delegate_remap(from, event_type, to, event_type, options)
}

/// Re-fire `from_type` from `from` on `to` as `to_type`
///
/// Returns the listener installed on `from` so the delegation can be undone
/// with `un`. `to` is held weakly: once it is dropped the delegation does
/// nothing.
pub fn delegate_remap(
    from: &dyn Observable,
    from_type: &str,
    to: &dyn Observable,
    to_type: &str,
    options: DeriveOptions,
) -> Result<Handler, EventError> {
    if from_type.is_empty() || to_type.is_empty() {
        return Err(EventError::MissingEventType);
    }
    if to_type == WILDCARD {
        return Err(EventError::ReservedEventType(to_type.to_string()));
    }

    let destination = to.event_target().downgrade();
    let to_type = to_type.to_string();
    let handler = Handler::new(move |event: &mut Event| {
        let Some(destination) = destination.upgrade() else {
            return;
        };
        let mut delegated = Event::derive(event, options.clone());
        delegated.set_event_type(to_type.as_str());
        if let Err(err) = destination.fire(delegated) {
            warn!(
                "delegating `{}` as `{}` failed: {}",
                event.event_type(),
                to_type,
                err
            );
        }
    });

    from.event_target().on(from_type, &handler)?;
    Ok(handler)
}
