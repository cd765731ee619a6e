//! Bridge between host (DOM) events and [`Event`](super::Event)
//!
//! A host event exposes the modern cancellation methods when it has them and
//! falls back to the legacy `returnValue` / `cancelBubble` flags otherwise.
//! Each modern method reports whether the host actually supports it.

/// A host event that an [`Event`](super::Event) can be derived from
pub trait NativeEvent {
    /// The host's name for this event, e.g. `"click"`
    fn event_type(&self) -> String;

    /// Call the host's `preventDefault`, returning `false` if unsupported
    fn prevent_default(&self) -> bool {
        false
    }

    /// Call the host's `stopPropagation`, returning `false` if unsupported
    fn stop_propagation(&self) -> bool {
        false
    }

    /// Call the host's `stopImmediatePropagation`, returning `false` if unsupported
    fn stop_immediate_propagation(&self) -> bool {
        false
    }

    /// Legacy default prevention flag
    fn set_return_value(&self, _value: bool) {}

    /// Legacy propagation flag
    fn set_cancel_bubble(&self, _value: bool) {}
}

/// Prevent the host default, using the legacy flag when needed
pub(crate) fn prevent_default(native: &dyn NativeEvent) {
    if !native.prevent_default() {
        native.set_return_value(false);
    }
}

/// Stop host propagation, using the legacy flag when needed
pub(crate) fn stop_propagation(native: &dyn NativeEvent) {
    if !native.stop_propagation() {
        native.set_cancel_bubble(true);
    }
}

/// Stop immediate host propagation; legacy hosts only know `cancelBubble`
pub(crate) fn stop_immediate_propagation(native: &dyn NativeEvent) {
    if !native.stop_immediate_propagation() {
        native.set_cancel_bubble(true);
    }
}

#[cfg(feature = "web")]
impl NativeEvent for web_sys::Event {
    fn event_type(&self) -> String {
        self.type_()
    }

    fn prevent_default(&self) -> bool {
        web_sys::Event::prevent_default(self);
        true
    }

    fn stop_propagation(&self) -> bool {
        web_sys::Event::stop_propagation(self);
        true
    }

    fn stop_immediate_propagation(&self) -> bool {
        web_sys::Event::stop_immediate_propagation(self);
        true
    }

    fn set_return_value(&self, value: bool) {
        web_sys::Event::set_return_value(self, value);
    }

    fn set_cancel_bubble(&self, value: bool) {
        web_sys::Event::set_cancel_bubble(self, value);
    }
}
