//! Write interceptors.
//!
//! Interceptors run around database writes: before the operation, after it
//! succeeds, or after it fails. They are registered per operation
//! (`Create`, `Update`, `Delete`) and per resource type, with `*` matching
//! every type. The list is configured at startup and read-only afterwards.

use std::collections::HashMap;

use meridian_model::Resource;

/// Database operations interceptors can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Create,
    Update,
    Delete,
}

/// Hook invoked around a write to a matching resource type.
pub trait InterceptorHandler: Send + Sync {
    fn before(&self, resource: Option<&Resource>);
    fn after(&self, resource: Option<&Resource>);
    fn on_error(&self, error: &str, resource: Option<&Resource>);
}

/// One registered interceptor.
pub struct Interceptor {
    /// Resource type to match, or `*` for all.
    pub resource_type: String,
    pub handler: Box<dyn InterceptorHandler>,
}

/// All interceptors, keyed by operation.
#[derive(Default)]
pub struct InterceptorRegistry {
    by_op: HashMap<Op, Vec<Interceptor>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        op: Op,
        resource_type: impl Into<String>,
        handler: Box<dyn InterceptorHandler>,
    ) {
        self.by_op.entry(op).or_default().push(Interceptor {
            resource_type: resource_type.into(),
            handler,
        });
    }

    fn matching<'a>(
        &'a self,
        op: Op,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Interceptor> {
        self.by_op.get(&op).into_iter().flatten().filter(move |i| {
            i.resource_type == resource_type || i.resource_type == "*"
        })
    }

    pub fn has_any(&self, op: Op, resource_type: &str) -> bool {
        self.matching(op, resource_type).next().is_some()
    }

    pub fn before(&self, op: Op, resource_type: &str, resource: Option<&Resource>) {
        for interceptor in self.matching(op, resource_type) {
            interceptor.handler.before(resource);
        }
    }

    pub fn after(&self, op: Op, resource_type: &str, resource: Option<&Resource>) {
        for interceptor in self.matching(op, resource_type) {
            interceptor.handler.after(resource);
        }
    }

    pub fn on_error(&self, op: Op, resource_type: &str, error: &str, resource: Option<&Resource>) {
        for interceptor in self.matching(op, resource_type) {
            interceptor.handler.on_error(error, resource);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);
    impl InterceptorHandler for Counting {
        fn before(&self, _resource: Option<&Resource>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn after(&self, _resource: Option<&Resource>) {}
        fn on_error(&self, _error: &str, _resource: Option<&Resource>) {}
    }

    #[test]
    fn wildcard_and_typed_matching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = InterceptorRegistry::new();
        registry.register(Op::Create, "Patient", Box::new(Counting(calls.clone())));
        registry.register(Op::Create, "*", Box::new(Counting(calls.clone())));
        registry.register(Op::Delete, "Patient", Box::new(Counting(calls.clone())));

        assert!(registry.has_any(Op::Create, "Patient"));
        assert!(registry.has_any(Op::Create, "Observation"));
        assert!(!registry.has_any(Op::Update, "Patient"));

        registry.before(Op::Create, "Patient", None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        registry.before(Op::Create, "Observation", None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
