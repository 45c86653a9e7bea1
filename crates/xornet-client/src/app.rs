// crates/xornet-client/src/app.rs

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::cmp::Ordering;
use xornet_core::{ConnectionState, EntityId, Machine, User};
use xornet_client::SyncStatus;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SortColumn {
    Name,
    Cpu,
    Ram,
    Network,
}

impl SortColumn {
    pub fn next(self) -> Self {
        match self {
            SortColumn::Name => SortColumn::Cpu,
            SortColumn::Cpu => SortColumn::Ram,
            SortColumn::Ram => SortColumn::Network,
            SortColumn::Network => SortColumn::Name,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortColumn::Name => "name",
            SortColumn::Cpu => "cpu",
            SortColumn::Ram => "ram",
            SortColumn::Network => "network",
        }
    }
}

pub struct App {
    // Connection state
    pub status: SyncStatus,
    pub me: Option<User>,

    // UI state
    pub should_quit: bool,
    pub show_help: bool,
    pub show_details: bool,
    pub sort: SortColumn,
    pub selected: usize,

    // Machines, in display order
    pub machines: IndexMap<EntityId, Machine>,
    pub last_refresh: Option<DateTime<Local>>,
    pub status_message: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            status: SyncStatus::default(),
            me: None,
            should_quit: false,
            show_help: false,
            show_details: true,
            sort: SortColumn::Cpu,
            selected: 0,
            machines: IndexMap::new(),
            last_refresh: None,
            status_message: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.status.state == ConnectionState::Live
    }

    /// Replace the machine list, keeping the selection on the same
    /// machine when it is still there.
    pub fn refresh(&mut self, machines: Vec<Machine>, status: SyncStatus) {
        let selected_id = self.selected_machine().map(|m| m.uuid.clone());

        self.machines = machines.into_iter().map(|m| (m.uuid.clone(), m)).collect();
        self.apply_sort();

        self.selected = selected_id
            .and_then(|id| self.machines.get_index_of(&id))
            .unwrap_or(0)
            .min(self.machines.len().saturating_sub(1));
        self.status = status;
        self.last_refresh = Some(Local::now());
    }

    pub fn selected_machine(&self) -> Option<&Machine> {
        self.machines.get_index(self.selected).map(|(_, m)| m)
    }

    pub fn move_selection_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_selection_down(&mut self) {
        if self.selected + 1 < self.machines.len() {
            self.selected += 1;
        }
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.next();
        self.apply_sort();
        self.status_message = Some(format!("Sorted by {}", self.sort.label()));
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn toggle_details(&mut self) {
        self.show_details = !self.show_details;
    }

    pub fn total_download(&self) -> f64 {
        self.machines
            .values()
            .filter_map(|m| m.dynamic_data.as_ref().and_then(|d| d.td))
            .sum()
    }

    pub fn total_upload(&self) -> f64 {
        self.machines
            .values()
            .filter_map(|m| m.dynamic_data.as_ref().and_then(|d| d.tu))
            .sum()
    }

    fn apply_sort(&mut self) {
        match self.sort {
            SortColumn::Name => self
                .machines
                .sort_by(|_, a, _, b| a.display_name().to_lowercase().cmp(&b.display_name().to_lowercase())),
            SortColumn::Cpu => self.machines.sort_by(|_, a, _, b| desc(cpu(a), cpu(b))),
            SortColumn::Ram => self.machines.sort_by(|_, a, _, b| desc(ram(a), ram(b))),
            SortColumn::Network => self.machines.sort_by(|_, a, _, b| desc(network(a), network(b))),
        }
    }
}

fn cpu(machine: &Machine) -> Option<f64> {
    machine.dynamic_data.as_ref()?.cau
}

fn ram(machine: &Machine) -> Option<f64> {
    machine.dynamic_data.as_ref()?.ram.as_ref()?.usage_percent()
}

fn network(machine: &Machine) -> Option<f64> {
    let data = machine.dynamic_data.as_ref()?;
    Some(data.td.unwrap_or(0.0) + data.tu.unwrap_or(0.0))
}

// Highest first, unknown values last.
fn desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
