//! Bookkeeping shared by every collider.

use std::ops::ControlFlow;

use sim_types::{ColliderConfig, ContactStats};

/// Per-query state: settings, touched primitives and counters.
///
/// Each collider owns one and resets it at the start of every query, so the
/// touched list and stats always describe the most recent call.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    config: ColliderConfig,
    touched: Vec<u32>,
    stats: ContactStats,
}

impl QueryState {
    /// Create with a configuration.
    #[must_use]
    pub fn new(config: ColliderConfig) -> Self {
        Self {
            config,
            touched: Vec::new(),
            stats: ContactStats::default(),
        }
    }

    /// Collider settings.
    #[must_use]
    pub fn config(&self) -> &ColliderConfig {
        &self.config
    }

    /// Replace the settings.
    pub fn set_config(&mut self, config: ColliderConfig) {
        self.config = config;
    }

    /// Triangles that produced a hit in the last query, in visit order.
    #[must_use]
    pub fn touched(&self) -> &[u32] {
        &self.touched
    }

    /// Counters for the last query.
    #[must_use]
    pub fn stats(&self) -> &ContactStats {
        &self.stats
    }

    /// Whether the last query found anything.
    #[must_use]
    pub fn contact_found(&self) -> bool {
        !self.touched.is_empty()
    }

    /// Clear results before a new query.
    pub fn begin(&mut self) {
        self.touched.clear();
        self.stats = ContactStats::default();
    }

    pub(crate) fn record_node(&mut self) {
        self.stats.nodes_visited += 1;
    }

    pub(crate) fn record_test(&mut self) {
        self.stats.primitive_tests += 1;
    }

    /// Note a hit on `primitive` that emitted `contacts` contacts. Breaks in
    /// first-contact mode.
    pub(crate) fn record_hit(&mut self, primitive: u32, contacts: usize) -> ControlFlow<()> {
        self.touched.push(primitive);
        self.stats.contacts_emitted += contacts;
        if self.config.first_contact {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
