/// Fully decoded hourly control schedule.
///
/// Arrays are indexed by absolute hour and cover the whole forecast horizon.
/// Factors are fractions in `[0, 1]`; values outside are clamped by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    /// Grid (AC) charging of the storage battery, relative to the inverter's
    /// AC charge ceiling.
    pub ac_charge: Vec<f64>,
    /// PV (DC) charging of the storage battery; any value above zero allows it.
    pub dc_charge: Vec<f64>,
    /// Whether the storage battery may discharge.
    pub discharge_allowed: Vec<bool>,
    /// EV charge power relative to its max charge power.
    pub ev_charge: Vec<f64>,
    /// Requested appliance start hour.
    pub appliance_start: Option<usize>,
}

impl Schedule {
    /// An idle schedule: no AC, DC, or EV charging, discharge allowed.
    pub fn new(hours: usize) -> Self {
        Self {
            ac_charge: vec![0.0; hours],
            dc_charge: vec![0.0; hours],
            discharge_allowed: vec![true; hours],
            ev_charge: vec![0.0; hours],
            appliance_start: None,
        }
    }

    /// Length of the shortest control array.
    pub fn hours(&self) -> usize {
        self.ac_charge
            .len()
            .min(self.dc_charge.len())
            .min(self.discharge_allowed.len())
            .min(self.ev_charge.len())
    }

    /// True if all control arrays have exactly `hours` entries.
    pub fn covers(&self, hours: usize) -> bool {
        [
            self.ac_charge.len(),
            self.dc_charge.len(),
            self.discharge_allowed.len(),
            self.ev_charge.len(),
        ]
        .iter()
        .all(|&len| len == hours)
    }
}
