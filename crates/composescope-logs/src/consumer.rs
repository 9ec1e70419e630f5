use std::sync::Arc;

/// Receives log lines tagged with the service that produced them
///
/// `log` is called once per line, in the order the backend delivers them.
/// It takes `&self` so one consumer can be shared between the caller and a
/// running backend; implementations synchronise internally.
pub trait LogConsumer: Send + Sync {
    fn log(&self, service: &str, line: &str);
}

impl<C: LogConsumer + ?Sized> LogConsumer for &C {
    fn log(&self, service: &str, line: &str) {
        (**self).log(service, line);
    }
}

impl<C: LogConsumer + ?Sized> LogConsumer for Box<C> {
    fn log(&self, service: &str, line: &str) {
        (**self).log(service, line);
    }
}

impl<C: LogConsumer + ?Sized> LogConsumer for Arc<C> {
    fn log(&self, service: &str, line: &str) {
        (**self).log(service, line);
    }
}
