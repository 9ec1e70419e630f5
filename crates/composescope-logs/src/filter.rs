use std::collections::HashSet;

use crate::consumer::LogConsumer;

/// Forwards only the lines of selected services to an inner consumer
///
/// An empty selection forwards everything. Rejected lines are dropped
/// silently; accepted lines are forwarded immediately, in arrival order.
#[derive(Clone, Debug)]
pub struct FilteredLogConsumer<C> {
    inner: C,

    /// Services to forward (empty = all)
    services: HashSet<String>,
}

impl<C: LogConsumer> FilteredLogConsumer<C> {
    pub fn new<I, S>(inner: C, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            services: services.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if lines from a service pass the filter
    pub fn accepts(&self, service: &str) -> bool {
        self.services.is_empty() || self.services.contains(service)
    }
}

impl<C: LogConsumer> LogConsumer for FilteredLogConsumer<C> {
    fn log(&self, service: &str, line: &str) {
        if self.accepts(service) {
            self.inner.log(service, line);
        }
    }
}
