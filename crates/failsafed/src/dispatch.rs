//! Component manager dispatch.
//!
//! Whenever a component's logical status flips, its external manager gets an
//! on/off instruction. Dispatch is fire-and-forget: the controller never
//! waits for an acknowledgment.

use tracing::info;

/// Logical on/off instruction for one component manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDirective {
    pub component: String,
    pub active: bool,
}

/// Receives directives for external component managers.
pub trait DirectiveSink: Send + Sync {
    fn dispatch(&self, directive: ComponentDirective);
}

/// Production sink: emits the instruction on the log stream, where the
/// component-manager bridge picks it up.
pub struct LoggingSink;

impl DirectiveSink for LoggingSink {
    fn dispatch(&self, directive: ComponentDirective) {
        info!(
            component = %directive.component,
            active = directive.active,
            "Component manager instructed"
        );
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every directive for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        pub directives: Mutex<Vec<ComponentDirective>>,
    }

    impl DirectiveSink for RecordingSink {
        fn dispatch(&self, directive: ComponentDirective) {
            self.directives.lock().unwrap().push(directive);
        }
    }
}
