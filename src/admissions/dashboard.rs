//! Admin dashboard state, rebuilt from the college's application list.
//!
//! The dashboard owns the authoritative list and feeds it into the in-memory
//! collections each view needs. All changes go through [`AdminDashboard::apply`]
//! so a UI layer (or the HTTP router) can drive it with plain events.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::domain::{Application, ApplicationId, Stage, StageError};
use crate::collections::{
    AuditTrail, DateOrderedIndex, HistoryEntry, KeyedLookup, NameSearchIndex, RecentViewCache,
    StatusFlowGraph, Transition, UrgencyQueue,
};

/// Which stage the listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StageFilter {
    #[default]
    All,
    Only(Stage),
}

impl StageFilter {
    pub fn admits(self, stage: Stage) -> bool {
        match self {
            StageFilter::All => true,
            StageFilter::Only(only) => only == stage,
        }
    }
}

impl fmt::Display for StageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageFilter::All => f.write_str("all"),
            StageFilter::Only(stage) => fmt::Display::fmt(stage, f),
        }
    }
}

impl FromStr for StageFilter {
    type Err = StageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("all") {
            return Ok(StageFilter::All);
        }
        value.parse().map(StageFilter::Only)
    }
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// Replace the list with a fresh fetch from the store.
    Loaded(Vec<Application>),
    FilterChanged(StageFilter),
    Opened(ApplicationId),
    /// A single record changed, e.g. after a stage move or fee assignment.
    Updated(Application),
}

/// Per-stage totals shown on the stage cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub stage1: usize,
    pub stage2: usize,
    pub stage3: usize,
}

impl StageCounts {
    pub fn get(&self, stage: Stage) -> usize {
        match stage {
            Stage::Stage1 => self.stage1,
            Stage::Stage2 => self.stage2,
            Stage::Stage3 => self.stage3,
        }
    }
}

/// Sizing knobs for dashboard views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSettings {
    pub recent_capacity: usize,
    pub search_limit: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            recent_capacity: 10,
            search_limit: 5,
        }
    }
}

pub struct AdminDashboard {
    college: String,
    applications: Vec<Application>,
    positions: KeyedLookup<usize>,
    names: NameSearchIndex<Application>,
    recent: RecentViewCache<ApplicationId, Application>,
    flows: HashMap<ApplicationId, StatusFlowGraph>,
    status_flows: HashMap<ApplicationId, StatusFlowGraph>,
    trails: HashMap<ApplicationId, AuditTrail<Application>>,
    filter: StageFilter,
    search_limit: usize,
}

impl AdminDashboard {
    pub fn new(college: impl Into<String>, recent_capacity: usize, search_limit: usize) -> Self {
        Self {
            college: college.into(),
            applications: Vec::new(),
            positions: KeyedLookup::new(),
            names: NameSearchIndex::new(),
            recent: RecentViewCache::new(recent_capacity),
            flows: HashMap::new(),
            status_flows: HashMap::new(),
            trails: HashMap::new(),
            filter: StageFilter::All,
            search_limit,
        }
    }

    pub fn with_settings(college: impl Into<String>, settings: DashboardSettings) -> Self {
        Self::new(college, settings.recent_capacity, settings.search_limit)
    }

    pub fn college(&self) -> &str {
        &self.college
    }

    pub fn apply(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Loaded(applications) => self.load(applications),
            DashboardEvent::FilterChanged(filter) => {
                debug!(%filter, "stage filter changed");
                self.filter = filter;
            }
            DashboardEvent::Opened(id) => {
                self.open(&id);
            }
            DashboardEvent::Updated(application) => self.update(application),
        }
    }

    fn load(&mut self, applications: Vec<Application>) {
        self.applications.clear();
        self.positions = KeyedLookup::new();
        self.names.clear();

        for application in applications {
            if application.college_name() != self.college {
                continue;
            }
            self.track(&application);
            self.refresh_recent(&application);
            self.index(application);
        }
        debug!(
            college = %self.college,
            count = self.applications.len(),
            "dashboard loaded"
        );
    }

    fn update(&mut self, application: Application) {
        if application.college_name() != self.college {
            return;
        }
        self.track(&application);
        self.refresh_recent(&application);
        self.index(application);
    }

    // Keep cached views current without counting as a view.
    fn refresh_recent(&mut self, application: &Application) {
        if self.recent.contains(&application.id) {
            self.recent.refresh(&application.id, application.clone());
        }
    }

    fn index(&mut self, application: Application) {
        let search_text = format!("{} {}", application.full_name(), application.email());
        self.names.insert(&search_text, application.clone());

        match self.positions.get(&application.id.0).copied() {
            Some(position) => self.applications[position] = application,
            None => {
                self.positions
                    .set(application.id.0.clone(), self.applications.len());
                self.applications.push(application);
            }
        }
    }

    // Snapshot on change. Graphs are seeded with the first stage and status
    // seen, then gain an edge whenever either one moves.
    fn track(&mut self, application: &Application) {
        let trail = self.trails.entry(application.id.clone()).or_default();
        let previous = trail
            .latest()
            .map(|entry| (entry.snapshot.stage, entry.snapshot.status.clone()));
        if trail.latest().map(|entry| &entry.snapshot) == Some(application) {
            return;
        }
        trail.add_to_history_at(application, application.last_updated);

        let stages = self.flows.entry(application.id.clone()).or_default();
        let statuses = self.status_flows.entry(application.id.clone()).or_default();
        let at = application.last_updated;
        match previous {
            None => {
                stages.add_status(application.stage.label());
                statuses.add_status(&application.status);
            }
            Some((stage, status)) => {
                if stage != application.stage {
                    stages.add_edge(stage.label(), application.stage.label(), at);
                }
                if status != application.status {
                    statuses.add_edge(&status, &application.status, at);
                }
            }
        }
    }

    pub fn filter(&self) -> StageFilter {
        self.filter
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    pub fn get(&self, id: &ApplicationId) -> Option<&Application> {
        self.positions
            .get(&id.0)
            .map(|&position| &self.applications[position])
    }

    pub fn stage_counts(&self) -> StageCounts {
        let mut counts = StageCounts::default();
        for application in &self.applications {
            match application.stage {
                Stage::Stage1 => counts.stage1 += 1,
                Stage::Stage2 => counts.stage2 += 1,
                Stage::Stage3 => counts.stage3 += 1,
            }
        }
        counts
    }

    /// Applications passing the current filter, in load order.
    pub fn visible(&self) -> Vec<&Application> {
        self.applications
            .iter()
            .filter(|application| self.filter.admits(application.stage))
            .collect()
    }

    /// Visible applications, oldest application first.
    pub fn by_applied_date(&self) -> Vec<&Application> {
        let index = DateOrderedIndex::from_records(self.visible(), |application| {
            application.applied_at
        });
        index.in_order().into_iter().copied().collect()
    }

    /// Up to `limit` unreviewed (`stage1`) applications, longest waiting first.
    pub fn urgent(&self, limit: usize) -> Vec<&Application> {
        let mut queue = UrgencyQueue::new();
        for application in &self.applications {
            if application.stage == Stage::Stage1 {
                // earlier submissions get the larger priority
                queue.enqueue(application, -application.applied_at.timestamp_millis());
            }
        }

        let mut urgent = Vec::with_capacity(limit.min(queue.len()));
        while urgent.len() < limit {
            match queue.dequeue() {
                Some(application) => urgent.push(application),
                None => break,
            }
        }
        urgent
    }

    /// Name or e-mail prefix search, capped at the configured limit.
    pub fn search(&self, prefix: &str) -> Vec<&Application> {
        self.names.search_limited(prefix, self.search_limit)
    }

    /// Open an application, remembering it as recently viewed.
    pub fn open(&mut self, id: &ApplicationId) -> Option<&Application> {
        let position = *self.positions.get(&id.0)?;
        if self.recent.get(id).is_none() {
            self.recent
                .put(id.clone(), self.applications[position].clone());
        }
        Some(&self.applications[position])
    }

    /// Recently opened applications, least recently viewed first.
    pub fn recently_viewed(&self) -> Vec<&Application> {
        self.recent.recent()
    }

    /// Stage moves observed for an application, ordered by time.
    ///
    /// The walk starts at the first stage the dashboard saw, which is not
    /// `stage1` when the application was already reviewed before loading.
    pub fn stage_history(&self, id: &ApplicationId) -> Vec<Transition> {
        self.flows
            .get(id)
            .zip(self.first_snapshot(id))
            .map(|(graph, first)| graph.status_history(first.stage.label()))
            .unwrap_or_default()
    }

    /// Status label moves, e.g. `under_review` to `rejected`, ordered by time.
    pub fn status_changes(&self, id: &ApplicationId) -> Vec<Transition> {
        self.status_flows
            .get(id)
            .zip(self.first_snapshot(id))
            .map(|(graph, first)| graph.status_history(&first.status))
            .unwrap_or_default()
    }

    fn first_snapshot(&self, id: &ApplicationId) -> Option<&Application> {
        self.trails
            .get(id)
            .and_then(AuditTrail::earliest)
            .map(|entry| &entry.snapshot)
    }

    pub fn audit_history(&self, id: &ApplicationId) -> Vec<&HistoryEntry<Application>> {
        self.trails
            .get(id)
            .map(AuditTrail::history)
            .unwrap_or_default()
    }

    pub fn last_change(&self, id: &ApplicationId) -> Option<DateTime<Utc>> {
        self.trails
            .get(id)
            .and_then(AuditTrail::latest)
            .map(|entry| entry.captured_at)
    }
}
