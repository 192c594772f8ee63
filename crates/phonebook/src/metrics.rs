use prometheus::{
    register_counter_with_registry, register_gauge_with_registry, register_histogram_with_registry,
    Counter, Encoder, Gauge, Histogram, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct DirectoryMetrics {
    pub contacts: Gauge,
    pub contacts_created: Counter,
    pub contacts_deleted: Counter,
    pub requests_rejected: Counter,
    pub request_latency: Histogram,
    pub registry: Arc<Registry>,
}

impl DirectoryMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Arc::new(Registry::new());

        let contacts = register_gauge_with_registry!(
            "phonebook_contacts",
            "Number of live contacts in the directory",
            registry
        )?;

        let contacts_created = register_counter_with_registry!(
            "phonebook_contacts_created_total",
            "Total number of contacts created",
            registry
        )?;

        let contacts_deleted = register_counter_with_registry!(
            "phonebook_contacts_deleted_total",
            "Total number of contacts deleted",
            registry
        )?;

        let requests_rejected = register_counter_with_registry!(
            "phonebook_requests_rejected_total",
            "Total number of requests answered with an error status",
            registry
        )?;

        let request_latency = register_histogram_with_registry!(
            "phonebook_request_latency_seconds",
            "Request latency in seconds",
            registry
        )?;

        Ok(Self {
            contacts,
            contacts_created,
            contacts_deleted,
            requests_rejected,
            request_latency,
            registry,
        })
    }

    pub fn set_contacts(&self, count: usize) {
        self.contacts.set(count as f64);
    }

    pub fn export_prometheus(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
